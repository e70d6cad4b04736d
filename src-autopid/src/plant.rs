//! Simulated cart and its PID loop
//!
//! The cart drives along a line in front of a wall and reports its distance
//! to it. A positive command moves it away from the wall. The motor is a
//! first-order lag towards a speed proportional to the PWM command.

use autopid_optim::Candidate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Saturation of the motor command
pub const PWM_LIMIT: f64 = 255.0;

/// Bound on the integral term, in cm*s
pub const INTEGRAL_LIMIT: f64 = 200.0;

#[derive(Debug, Clone)]
pub struct SimulatedPlant {
    distance_cm: f64,
    velocity_cm_s: f64,
    /// Steady-state speed at full command
    max_speed_cm_s: f64,
    time_constant_s: f64,
    /// Half-width of the uniform sensor noise
    noise_cm: f64,
    rng: StdRng,
}

impl SimulatedPlant {
    pub fn new(distance_cm: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self {
            distance_cm,
            velocity_cm_s: 0.0,
            max_speed_cm_s: 60.0,
            time_constant_s: 0.25,
            noise_cm: 0.5,
            rng,
        }
    }

    pub fn with_dynamics(mut self, max_speed_cm_s: f64, time_constant_s: f64, noise_cm: f64) -> Self {
        self.max_speed_cm_s = max_speed_cm_s;
        self.time_constant_s = time_constant_s;
        self.noise_cm = noise_cm.abs();
        self
    }

    /// Put the cart back at rest at `distance_cm`
    pub fn reset(&mut self, distance_cm: f64) {
        self.distance_cm = distance_cm;
        self.velocity_cm_s = 0.0;
    }

    /// Apply `pwm` (saturated to +-255) for `dt_s` seconds
    pub fn step(&mut self, pwm: f64, dt_s: f64) {
        let command = pwm.clamp(-PWM_LIMIT, PWM_LIMIT);
        let target = command / PWM_LIMIT * self.max_speed_cm_s;
        let alpha = if self.time_constant_s > 0.0 { (dt_s / self.time_constant_s).min(1.0) } else { 1.0 };
        self.velocity_cm_s += (target - self.velocity_cm_s) * alpha;
        self.distance_cm = (self.distance_cm + self.velocity_cm_s * dt_s).max(0.0);
        if self.distance_cm == 0.0 {
            // bumped into the wall
            self.velocity_cm_s = self.velocity_cm_s.max(0.0);
        }
    }

    /// Noisy distance reading, never negative
    pub fn measure(&mut self) -> f64 {
        let noise = if self.noise_cm > 0.0 {
            self.rng.random_range(-self.noise_cm..=self.noise_cm)
        } else {
            0.0
        };
        (self.distance_cm + noise).max(0.0)
    }

    pub fn distance(&self) -> f64 {
        self.distance_cm
    }

    pub fn velocity(&self) -> f64 {
        self.velocity_cm_s
    }
}

/// Textbook PID with a clamped integral and saturated output
#[derive(Debug, Clone)]
pub struct PidController {
    gains: Candidate,
    integral: f64,
    previous_error: Option<f64>,
}

impl PidController {
    pub fn new(gains: Candidate) -> Self {
        Self { gains, integral: 0.0, previous_error: None }
    }

    pub fn gains(&self) -> Candidate {
        self.gains
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = None;
    }

    /// PWM command for `error` (setpoint - measurement) after `dt_s` seconds
    pub fn update(&mut self, error: f64, dt_s: f64) -> f64 {
        if dt_s <= 0.0 {
            return (self.gains.kp * error).clamp(-PWM_LIMIT, PWM_LIMIT);
        }
        self.integral = (self.integral + error * dt_s).clamp(-INTEGRAL_LIMIT, INTEGRAL_LIMIT);
        let derivative = self.previous_error.map_or(0.0, |prev| (error - prev) / dt_s);
        self.previous_error = Some(error);
        let u = self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative;
        u.clamp(-PWM_LIMIT, PWM_LIMIT)
    }
}
