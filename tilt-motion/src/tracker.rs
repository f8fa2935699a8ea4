//! Spring-damper position tracker
//!
//! Integrates smoothed acceleration into a position that behaves like a mass
//! on a damped, center-seeking track. Acceleration pushes the mass, friction
//! bleeds off velocity, a weak spring pulls it back to the middle, and the
//! rails at 0 and 1 bounce it back inelastically.

/// Resting position of every control axis
pub const CENTER_POSITION: f32 = 0.5;

/// Tuning for the integrator. These are "feel" values, not physical constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerParams {
    /// Gain from acceleration to velocity
    pub sensitivity: f32,
    /// Per-step velocity multiplier (friction)
    pub damping: f32,
    /// Spring constant pulling toward the center
    pub centering_force: f32,
    /// Fraction of velocity kept (and reversed) when hitting a rail
    pub restitution: f32,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            sensitivity: 0.08,
            damping: 0.85,
            centering_force: 0.05,
            restitution: 0.5,
        }
    }
}

/// Integrator state for one control axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionState {
    pub position: f32,
    pub velocity: f32,
    pub centering_force: f32,
}

/// Position tracker for a single axis
#[derive(Debug, Clone)]
pub struct PositionTracker {
    state: PositionState,
    params: TrackerParams,
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new(TrackerParams::default())
    }
}

impl PositionTracker {
    pub fn new(params: TrackerParams) -> Self {
        Self {
            state: PositionState {
                position: CENTER_POSITION,
                velocity: 0.0,
                centering_force: params.centering_force,
            },
            params,
        }
    }

    /// Advance one step with the given acceleration over the nominal interval `dt`
    ///
    /// Returns the new position, always within [0, 1].
    pub fn integrate(&mut self, acceleration: f32, dt: f32) -> f32 {
        let state = &mut self.state;

        state.velocity += acceleration * self.params.sensitivity * dt;
        state.velocity *= self.params.damping;
        state.velocity += (CENTER_POSITION - state.position) * state.centering_force;

        // Overflow from absurd inputs would otherwise poison the position with NaN
        if !state.velocity.is_finite() {
            state.velocity = 0.0;
        }

        state.position += state.velocity;

        if state.position > 1.0 {
            state.position = 1.0;
            state.velocity *= -self.params.restitution;
        } else if state.position < 0.0 {
            state.position = 0.0;
            state.velocity *= -self.params.restitution;
        }

        state.position
    }

    pub fn position(&self) -> f32 {
        self.state.position
    }

    pub fn velocity(&self) -> f32 {
        self.state.velocity
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn params(&self) -> TrackerParams {
        self.params
    }

    /// Return to rest at the center
    pub fn reset(&mut self) {
        self.state.position = CENTER_POSITION;
        self.state.velocity = 0.0;
    }
}
