//! Exponential moving average (one-pole low-pass) per scalar channel

/// One-pole smoother: `y = alpha * x + (1 - alpha) * y_prev`
///
/// Lower alpha smooths harder at the cost of latency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingFilter {
    alpha: f32,
    previous_output: f32,
}

impl SmoothingFilter {
    /// Smallest usable coefficient; zero would freeze the output forever
    const MIN_ALPHA: f32 = 1e-4;

    /// Create a filter; alpha is clamped into (0, 1]
    pub fn new(alpha: f32) -> Self {
        let alpha = if alpha.is_finite() { alpha } else { 1.0 };
        Self {
            alpha: alpha.clamp(Self::MIN_ALPHA, 1.0),
            previous_output: 0.0,
        }
    }

    /// Feed one input and return the smoothed value
    #[inline]
    pub fn apply(&mut self, input: f32) -> f32 {
        let output = self.alpha * input + (1.0 - self.alpha) * self.previous_output;
        self.previous_output = output;
        output
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Last output (0.0 before the first input)
    pub fn previous_output(&self) -> f32 {
        self.previous_output
    }

    pub fn reset(&mut self) {
        self.previous_output = 0.0;
    }
}
