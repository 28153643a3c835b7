//! Health state with change and death notifications.

use crate::math::Fixed;
use crate::signal::{Property, Signal};

/// Health of a damageable entity.
///
/// `current` stays within `[0, max]`. The death signal fires at most once
/// per life-cycle: once health has hit zero, further damage only updates
/// the percentage until [`Health::reset`] is called.
#[derive(Debug)]
pub struct Health {
    max: Fixed,
    current: Fixed,
    percent: Fixed,
    dead: bool,
    /// Fired with the new health fraction after every damage or heal.
    pub on_health_changed: Signal<Fixed>,
    /// Fired once when health reaches zero.
    pub on_dead: Signal<()>,
}

impl Health {
    /// Create full health. A non-positive maximum is raised to one.
    #[must_use]
    pub fn new(max: Fixed) -> Self {
        let max = if max > Fixed::ZERO { max } else { Fixed::ONE };
        Self {
            max,
            current: max,
            percent: Fixed::ONE,
            dead: false,
            on_health_changed: Signal::new(),
            on_dead: Signal::new(),
        }
    }

    /// Maximum health.
    #[must_use]
    pub const fn max(&self) -> Fixed {
        self.max
    }

    /// Current health.
    #[must_use]
    pub const fn current(&self) -> Fixed {
        self.current
    }

    /// Current health as a fraction of maximum.
    #[must_use]
    pub const fn percent(&self) -> Fixed {
        self.percent
    }

    /// Whether health has reached zero this life-cycle.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// Subtract `amount`, clamping at zero.
    ///
    /// Returns true only for the call that kills. A negative amount acts
    /// as a heal and is still clamped to the maximum.
    pub fn apply_damage(&mut self, amount: Fixed) -> bool {
        self.current = (self.current - amount).min(self.max);
        let mut died = false;
        if self.current <= Fixed::ZERO {
            self.current = Fixed::ZERO;
            if !self.dead {
                self.dead = true;
                died = true;
                self.on_dead.emit(&());
            }
        }
        self.update_percent();
        died
    }

    /// Add `amount`, clamping at maximum. Never revives or kills.
    pub fn apply_heal(&mut self, amount: Fixed) {
        self.current = (self.current + amount).clamp(Fixed::ZERO, self.max);
        self.update_percent();
    }

    /// Restore full health and detach every observer.
    ///
    /// Must be called before the owning entity goes back to its pool.
    pub fn reset(&mut self) {
        self.reset_value();
        self.clear_observers();
    }

    fn update_percent(&mut self) {
        self.percent = self.current / self.max;
        self.on_health_changed.emit(&self.percent);
    }
}

impl Property for Health {
    fn reset_value(&mut self) {
        self.current = self.max;
        self.percent = Fixed::ONE;
        self.dead = false;
    }

    fn clear_observers(&mut self) {
        self.on_health_changed.clear();
        self.on_dead.clear();
    }
}
