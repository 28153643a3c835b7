//! Fixed-point math utilities for deterministic simulation.
//!
//! All simulation state uses fixed-point arithmetic so that two runs fed
//! the same commands and tick deltas produce bit-identical results.
//!
//! Coordinates follow the usual engine convention: `y` is vertical and the
//! ground plane is spanned by `x` and `z`.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Fixed-point 3D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec3Fixed {
    /// X coordinate (ground plane).
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate (vertical).
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
    /// Z coordinate (ground plane).
    #[serde(with = "fixed_serde")]
    pub z: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for authored decimal values.
///
/// Data files are written by hand, so values such as `0.5` or `12` are
/// accepted and converted to [`Fixed`] exactly once, at load time.
/// Serialization writes the nearest decimal back out.
pub mod decimal_serde {
    use super::Fixed;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| D::Error::custom(format!("value {value} out of fixed-point range")))
    }
}

impl Vec3Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// Create a vector from integer components.
    #[must_use]
    pub fn from_ints(x: i32, y: i32, z: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y), Fixed::from_num(z))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
        z: Fixed::ZERO,
    };

    /// Unit vector along +Z, the rest facing.
    pub const FORWARD: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
        z: Fixed::ONE,
    };

    /// Unit vector along +Y.
    pub const UP: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ONE,
        z: Fixed::ZERO,
    };

    /// Project onto the ground plane (drop the vertical component).
    #[must_use]
    pub const fn ground(self) -> Self {
        Self {
            x: self.x,
            y: Fixed::ZERO,
            z: self.z,
        }
    }

    /// Check whether every component is zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x.saturating_mul(other.x) + self.y.saturating_mul(other.y)
            + self.z.saturating_mul(other.z)
    }

    /// Squared length (avoids sqrt for comparisons).
    #[must_use]
    pub fn length_squared(self) -> Fixed {
        self.dot(self)
    }

    /// Length of the vector.
    ///
    /// Axis-aligned vectors are measured exactly; everything else goes
    /// through [`fixed_sqrt`].
    #[must_use]
    pub fn length(self) -> Fixed {
        match (self.x == Fixed::ZERO, self.y == Fixed::ZERO, self.z == Fixed::ZERO) {
            (true, true, _) => self.z.abs(),
            (true, _, true) => self.y.abs(),
            (_, true, true) => self.x.abs(),
            _ => fixed_sqrt(self.length_squared()),
        }
    }

    /// Calculate squared distance.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        (self - other).length_squared()
    }

    /// Calculate distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        (self - other).length()
    }

    /// Scale by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        self + (other - self).scale(t)
    }

    /// Normalize the vector. Returns [`Vec3Fixed::ZERO`] for a zero vector.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }
        Self::new(self.x / len, self.y / len, self.z / len)
    }
}

/// Slack allowed when comparing accumulated tick time with a duration.
///
/// `1 / rate` rounds down for most tick rates, so a timer summed from tick
/// durations ends a few ulps short of the exact total. 2^-20 absorbs that
/// for about a million ticks.
pub const TIME_EPSILON: Fixed = Fixed::from_bits(1 << 12);

/// Whether `elapsed` has reached `duration`, within [`TIME_EPSILON`].
#[must_use]
pub fn time_reached(elapsed: Fixed, duration: Fixed) -> bool {
    elapsed >= duration.saturating_sub(TIME_EPSILON)
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        if mid == low {
            break;
        }
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec3Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl std::ops::Sub for Vec3Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl std::ops::Neg for Vec3Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

/// Facing of an entity, stored as a unit forward vector.
///
/// Roll is never needed in this game, so a forward vector is enough to
/// describe every orientation an entity or turret head can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Orientation {
    forward: Vec3Fixed,
}

impl Orientation {
    /// Rest orientation, facing +Z.
    pub const IDENTITY: Self = Self {
        forward: Vec3Fixed::FORWARD,
    };

    /// Orientation looking along `direction`.
    ///
    /// A zero direction yields [`Orientation::IDENTITY`].
    #[must_use]
    pub fn look_rotation(direction: Vec3Fixed) -> Self {
        let forward = direction.normalize();
        if forward.is_zero() {
            return Self::IDENTITY;
        }
        Self { forward }
    }

    /// Unit forward vector.
    #[must_use]
    pub const fn forward(self) -> Vec3Fixed {
        self.forward
    }

    /// Cosine of the angle between two orientations.
    #[must_use]
    pub fn alignment(self, other: Self) -> Fixed {
        self.forward.dot(other.forward)
    }

    /// Interpolate toward `target` by `t`, clamped to `[0, 1]`.
    ///
    /// Interpolates the forward vectors and renormalizes. When the two
    /// orientations are exactly opposite the midpoint is undefined, so the
    /// result snaps to whichever end `t` is closer to.
    #[must_use]
    pub fn lerp(self, target: Self, t: Fixed) -> Self {
        let t = t.clamp(Fixed::ZERO, Fixed::ONE);
        if t == Fixed::ONE {
            return target;
        }
        let blended = self.forward.lerp(target.forward, t).normalize();
        if blended.is_zero() {
            return if t >= Fixed::from_num(0.5) { target } else { self };
        }
        Self { forward: blended }
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64, z: f64) -> Vec3Fixed {
        Vec3Fixed::new(Fixed::from_num(x), Fixed::from_num(y), Fixed::from_num(z))
    }

    #[test]
    fn test_summed_tick_durations_reach_whole_seconds() {
        for rate in [16, 20, 30, 60] {
            let dt = Fixed::ONE / Fixed::from_num(rate);
            let mut elapsed = Fixed::ZERO;
            for _ in 0..rate {
                elapsed += dt;
            }
            assert!(time_reached(elapsed, Fixed::ONE), "rate {rate}");
            assert!(!time_reached(elapsed - dt, Fixed::ONE), "rate {rate}");
        }
    }

    #[test]
    fn test_axis_aligned_length_is_exact() {
        assert_eq!(v(-2.25, 0.0, 0.0).length(), Fixed::from_num(2.25));
        assert_eq!(v(0.0, 0.0, 7.5).length(), Fixed::from_num(7.5));
        assert_eq!(v(0.0, 3.0, 0.0).length(), Fixed::from_num(3));
    }

    #[test]
    fn test_diagonal_length() {
        let len = v(3.0, 0.0, 4.0).length();
        let epsilon = Fixed::ONE / Fixed::from_num(10000);
        assert!((len - Fixed::from_num(5)).abs() < epsilon, "got {len}");
    }

    #[test]
    fn test_ground_drops_vertical() {
        assert_eq!(v(1.0, 9.0, 2.0).ground(), v(1.0, 0.0, 2.0));
    }

    #[test]
    fn test_normalize_zero_is_zero() {
        assert_eq!(Vec3Fixed::ZERO.normalize(), Vec3Fixed::ZERO);
    }

    #[test]
    fn test_fixed_sqrt() {
        assert_eq!(fixed_sqrt(Fixed::from_num(16)), Fixed::from_num(4));
        assert_eq!(fixed_sqrt(Fixed::from_num(-1)), Fixed::ZERO);
    }

    #[test]
    fn test_look_rotation() {
        let east = Orientation::look_rotation(v(4.0, 0.0, 0.0));
        assert_eq!(east.forward(), v(1.0, 0.0, 0.0));
        assert_eq!(Orientation::look_rotation(Vec3Fixed::ZERO), Orientation::IDENTITY);
    }

    #[test]
    fn test_orientation_lerp_moves_partially() {
        let east = Orientation::look_rotation(v(1.0, 0.0, 0.0));
        let half = Orientation::IDENTITY.lerp(east, Fixed::from_num(0.5));

        assert!(half.alignment(east) > Orientation::IDENTITY.alignment(east));
        assert!(half.alignment(east) < Fixed::ONE);
    }

    #[test]
    fn test_orientation_lerp_clamps() {
        let east = Orientation::look_rotation(v(1.0, 0.0, 0.0));
        assert_eq!(Orientation::IDENTITY.lerp(east, Fixed::from_num(3)), east);
        assert_eq!(
            Orientation::IDENTITY.lerp(east, Fixed::from_num(-1)),
            Orientation::IDENTITY
        );
    }

    #[test]
    fn test_orientation_lerp_opposite() {
        let back = Orientation::look_rotation(v(0.0, 0.0, -1.0));
        assert_eq!(
            Orientation::IDENTITY.lerp(back, Fixed::from_num(0.25)),
            Orientation::IDENTITY
        );
        assert_eq!(Orientation::IDENTITY.lerp(back, Fixed::from_num(0.75)), back);
    }
}
