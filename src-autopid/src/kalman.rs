/// One-dimensional Kalman filter with adaptive estimate error
///
/// Smooths the raw distance readings before they reach the PID loop. The
/// estimate error grows with how much the estimate moved, scaled by the
/// process noise `q`, so the filter follows real motion faster than a fixed
/// gain would.
#[derive(Debug, Clone)]
pub struct SimpleKalmanFilter {
    err_measure: f64,
    err_estimate: f64,
    q: f64,
    current_estimate: f64,
    last_estimate: f64,
    kalman_gain: f64,
}

impl SimpleKalmanFilter {
    pub fn new(measurement_error: f64, estimate_error: f64, process_noise: f64) -> Self {
        Self {
            err_measure: measurement_error,
            err_estimate: estimate_error,
            q: process_noise,
            current_estimate: 0.0,
            last_estimate: 0.0,
            kalman_gain: 0.0,
        }
    }

    /// Fold in one measurement and return the new estimate
    pub fn update_estimate(&mut self, measurement: f64) -> f64 {
        self.kalman_gain = self.err_estimate / (self.err_estimate + self.err_measure);
        self.current_estimate =
            self.last_estimate + self.kalman_gain * (measurement - self.last_estimate);
        self.err_estimate = (1.0 - self.kalman_gain) * self.err_estimate
            + (self.last_estimate - self.current_estimate).abs() * self.q;
        self.last_estimate = self.current_estimate;
        self.current_estimate
    }

    /// Start from a known value instead of 0
    pub fn set_estimate(&mut self, value: f64) {
        self.current_estimate = value;
        self.last_estimate = value;
    }

    pub fn estimate(&self) -> f64 {
        self.current_estimate
    }

    pub fn gain(&self) -> f64 {
        self.kalman_gain
    }
}
