//! Path following along a fixed route.
//!
//! A [`PathFollower`] walks the segments of a [`Route`] at constant speed.
//! Each tick it advances along the current segment; when the step would
//! reach or overshoot the segment end it stops exactly on the end point
//! and, unless that was the final segment, switches to the next one.
//! Surplus distance past a corner is dropped.
//!
//! Progress is `segment_index + fraction_of_current_segment`, which makes
//! it comparable across entities on the same route.

use std::rc::Rc;

use crate::math::{Fixed, Orientation, Vec3Fixed};
use crate::route::Route;
use crate::signal::{Property, Signal};

/// Movement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveState {
    /// No route assigned.
    Idle,
    /// Advancing along the route.
    Moving,
    /// Final waypoint reached.
    Arrived,
}

/// Result of one [`PathFollower::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Not moving; nothing happened.
    Idle,
    /// Position advanced.
    Moved,
    /// Final waypoint reached this tick.
    Arrived,
    /// Current segment has zero length; step skipped.
    Skipped,
}

/// Route-following movement for one entity.
#[derive(Debug)]
pub struct PathFollower {
    speed: Fixed,
    route: Option<Rc<Route>>,
    state: MoveState,
    progress: Fixed,
    position: Vec3Fixed,
    orientation: Orientation,
    segment: usize,
    segment_start: Vec3Fixed,
    segment_end: Vec3Fixed,
    /// Fired with the new position after every step.
    pub on_move: Signal<Vec3Fixed>,
    /// Fired with the new facing after every step.
    pub on_rotate: Signal<Orientation>,
    /// Fired once when the final waypoint is reached.
    pub on_arrive: Signal<()>,
}

impl PathFollower {
    /// Create an idle follower moving at `speed` units per second.
    ///
    /// A negative speed is clamped to zero; followers never walk backwards.
    #[must_use]
    pub fn new(speed: Fixed) -> Self {
        Self {
            speed: speed.max(Fixed::ZERO),
            route: None,
            state: MoveState::Idle,
            progress: Fixed::ZERO,
            position: Vec3Fixed::ZERO,
            orientation: Orientation::IDENTITY,
            segment: 0,
            segment_start: Vec3Fixed::ZERO,
            segment_end: Vec3Fixed::ZERO,
            on_move: Signal::new(),
            on_rotate: Signal::new(),
            on_arrive: Signal::new(),
        }
    }

    /// Movement speed in units per second.
    #[must_use]
    pub const fn speed(&self) -> Fixed {
        self.speed
    }

    /// Change movement speed, clamped to zero or more.
    pub fn set_speed(&mut self, speed: Fixed) {
        self.speed = speed.max(Fixed::ZERO);
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> MoveState {
        self.state
    }

    /// Distance along the route, in segments.
    #[must_use]
    pub const fn progress(&self) -> Fixed {
        self.progress
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3Fixed {
        self.position
    }

    /// Current facing.
    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Index of the segment being walked.
    #[must_use]
    pub const fn segment_index(&self) -> usize {
        self.segment
    }

    /// Assigned route, if any.
    #[must_use]
    pub fn route(&self) -> Option<&Rc<Route>> {
        self.route.as_ref()
    }

    /// Start walking `route` from its first waypoint.
    ///
    /// Emits the starting pose immediately, facing the second waypoint.
    pub fn set_route(&mut self, route: Rc<Route>) {
        let first = route.first();
        let second = route.point(1);

        self.progress = Fixed::ZERO;
        self.segment = 0;
        self.position = first;
        self.segment_start = first;
        self.segment_end = second;
        self.orientation = Orientation::look_rotation(second - first);
        self.state = MoveState::Moving;
        self.route = Some(route);

        self.on_move.emit(&self.position);
        self.on_rotate.emit(&self.orientation);
    }

    /// Advance by `dt` seconds.
    pub fn update(&mut self, dt: Fixed) -> StepOutcome {
        if self.state != MoveState::Moving {
            return StepOutcome::Idle;
        }
        let Some(route) = self.route.clone() else {
            return StepOutcome::Idle;
        };

        let direction = (self.segment_end - self.segment_start).normalize();
        if direction.is_zero() {
            tracing::warn!(segment = self.segment, "Zero-length segment, skipping step");
            return StepOutcome::Skipped;
        }

        let mut next = self.position + direction.scale(self.speed * dt);
        let reached_end = (self.segment_end - next).dot(direction) <= Fixed::ZERO;

        if reached_end {
            next = self.segment_end;
            if self.segment + 2 >= route.len() {
                self.position = next;
                self.progress = Fixed::from_num(self.segment + 1);
                self.state = MoveState::Arrived;
                self.on_arrive.emit(&());
                return StepOutcome::Arrived;
            }

            self.segment += 1;
            self.segment_start = route.point(self.segment);
            self.segment_end = route.point(self.segment + 1);
        }

        self.position = next;
        self.orientation = Orientation::look_rotation(direction);
        self.on_move.emit(&self.position);
        self.on_rotate.emit(&self.orientation);
        self.update_progress();
        StepOutcome::Moved
    }

    /// Detach all movement observers.
    pub fn clear_observers(&mut self) {
        Property::clear_observers(self);
    }

    fn update_progress(&mut self) {
        let length = self.segment_start.distance(self.segment_end);
        let fraction = if length == Fixed::ZERO {
            Fixed::ZERO
        } else {
            self.position.distance(self.segment_start) / length
        };
        self.progress = Fixed::from_num(self.segment) + fraction;
    }
}

impl Property for PathFollower {
    fn reset_value(&mut self) {
        self.route = None;
        self.state = MoveState::Idle;
        self.progress = Fixed::ZERO;
        self.position = Vec3Fixed::ZERO;
        self.orientation = Orientation::IDENTITY;
        self.segment = 0;
        self.segment_start = Vec3Fixed::ZERO;
        self.segment_end = Vec3Fixed::ZERO;
    }

    fn clear_observers(&mut self) {
        self.on_move.clear();
        self.on_rotate.clear();
        self.on_arrive.clear();
    }
}
