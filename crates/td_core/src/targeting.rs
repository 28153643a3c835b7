//! Target selection.
//!
//! A turret scores every candidate within range by a single attribute and
//! picks the highest. Candidates are visited in registry order and only a
//! strictly higher score displaces the current best, so ties go to the
//! earliest registered candidate.

use serde::{Deserialize, Serialize};

use crate::enemy::EntityId;
use crate::math::{Fixed, Vec3Fixed};

/// Attribute a turret ranks candidates by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScoreAttribute {
    /// Distance travelled along the route.
    #[default]
    MoveProgress,
    /// Remaining health.
    HealthPoints,
    /// Movement speed.
    MoveSpeed,
}

/// Something a turret can aim at.
pub trait Scorable {
    /// Identifier reported back to the caller.
    fn entity_id(&self) -> EntityId;

    /// Position used for the range test.
    fn ground_position(&self) -> Vec3Fixed;

    /// Value of `attribute` for ranking.
    fn score(&self, attribute: ScoreAttribute) -> Fixed;
}

/// Pick the best candidate whose ground distance to `origin` is strictly
/// less than `range`.
///
/// Distances are compared on the ground plane, ignoring height.
pub fn select_target<'a, E, I>(
    origin: Vec3Fixed,
    range: Fixed,
    attribute: ScoreAttribute,
    candidates: I,
) -> Option<EntityId>
where
    E: Scorable + 'a,
    I: IntoIterator<Item = &'a E>,
{
    if range <= Fixed::ZERO {
        return None;
    }
    let origin = origin.ground();
    let range_squared = range.saturating_mul(range);

    let mut best: Option<(EntityId, Fixed)> = None;
    for candidate in candidates {
        let distance_squared = candidate.ground_position().ground().distance_squared(origin);
        if distance_squared >= range_squared {
            continue;
        }
        let score = candidate.score(attribute);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate.entity_id(), score)),
        }
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        id: EntityId,
        at: Vec3Fixed,
        progress: Fixed,
        health: Fixed,
    }

    impl Scorable for Dummy {
        fn entity_id(&self) -> EntityId {
            self.id
        }

        fn ground_position(&self) -> Vec3Fixed {
            self.at
        }

        fn score(&self, attribute: ScoreAttribute) -> Fixed {
            match attribute {
                ScoreAttribute::MoveProgress => self.progress,
                ScoreAttribute::HealthPoints => self.health,
                ScoreAttribute::MoveSpeed => Fixed::ONE,
            }
        }
    }

    fn dummy(id: EntityId, x: i32, progress: i32, health: i32) -> Dummy {
        Dummy {
            id,
            at: Vec3Fixed::from_ints(x, 0, 0),
            progress: Fixed::from_num(progress),
            health: Fixed::from_num(health),
        }
    }

    #[test]
    fn test_highest_score_wins() {
        let candidates = [dummy(1, 1, 2, 50), dummy(2, 2, 3, 10)];
        let range = Fixed::from_num(5);
        assert_eq!(
            select_target(Vec3Fixed::ZERO, range, ScoreAttribute::MoveProgress, &candidates),
            Some(2)
        );
        assert_eq!(
            select_target(Vec3Fixed::ZERO, range, ScoreAttribute::HealthPoints, &candidates),
            Some(1)
        );
    }

    #[test]
    fn test_tie_goes_to_first_candidate() {
        let candidates = [dummy(5, 1, 2, 0), dummy(3, 2, 2, 0)];
        let target = select_target(
            Vec3Fixed::ZERO,
            Fixed::from_num(5),
            ScoreAttribute::MoveProgress,
            &candidates,
        );
        assert_eq!(target, Some(5));
    }

    #[test]
    fn test_range_is_exclusive() {
        let candidates = [dummy(1, 3, 1, 1)];
        let origin = Vec3Fixed::ZERO;
        let attribute = ScoreAttribute::MoveProgress;
        assert_eq!(select_target(origin, Fixed::from_num(3), attribute, &candidates), None);
        assert_eq!(
            select_target(origin, Fixed::from_num(3.0625), attribute, &candidates),
            Some(1)
        );
    }

    #[test]
    fn test_height_is_ignored() {
        let mut high = dummy(1, 1, 0, 1);
        high.at.y = Fixed::from_num(100);
        let target = select_target(
            Vec3Fixed::new(Fixed::ZERO, Fixed::from_num(-4), Fixed::ZERO),
            Fixed::from_num(2),
            ScoreAttribute::MoveProgress,
            [&high],
        );
        assert_eq!(target, Some(1));
    }

    #[test]
    fn test_zero_score_is_still_a_target() {
        let candidates = [dummy(1, 1, 0, 0)];
        let target = select_target(
            Vec3Fixed::ZERO,
            Fixed::ONE + Fixed::ONE,
            ScoreAttribute::MoveProgress,
            &candidates,
        );
        assert_eq!(target, Some(1));
    }

    #[test]
    fn test_no_candidates_or_no_range() {
        let empty: [Dummy; 0] = [];
        assert_eq!(
            select_target(Vec3Fixed::ZERO, Fixed::ONE, ScoreAttribute::MoveSpeed, &empty),
            None
        );
        let candidates = [dummy(1, 0, 0, 0)];
        assert_eq!(
            select_target(Vec3Fixed::ZERO, Fixed::ZERO, ScoreAttribute::MoveSpeed, &candidates),
            None
        );
    }
}
