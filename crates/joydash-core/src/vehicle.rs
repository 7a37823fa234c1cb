use serde::Serialize;

use crate::frame::OutputFrame;

pub const MIN_SPEED: f64 = 0.0;
pub const MAX_SPEED: f64 = 100.0;
pub const MIN_FUEL: f64 = 0.0;
pub const MAX_FUEL: f64 = 100.0;

/// Constants of the joystick-driven vehicle model.
///
/// The defaults reproduce the dashboard behaviour of the handheld controller:
/// a dead band of +/-4 on the throttle axis, 2% coast-down per update, and a
/// temperature that tracks speed linearly from 20 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleModel {
    /// Throttle values strictly inside `(-dead_band, dead_band)` count as zero.
    pub dead_band: i64,
    /// Multiplier applied to speed on every coasting update.
    pub coast_decay: f64,
    pub accel_divisor: f64,
    pub turn_divisor: f64,
    pub ambient_temp_c: f64,
    pub temp_speed_divisor: f64,
    /// Speed divided by this gives fuel burn in percent per second.
    pub fuel_rate_divisor: f64,
    pub max_speed: f64,
    pub max_fuel: f64,
}

impl Default for VehicleModel {
    fn default() -> Self {
        Self {
            dead_band: 4,
            coast_decay: 0.98,
            accel_divisor: 10.0,
            turn_divisor: 16.0,
            ambient_temp_c: 20.0,
            temp_speed_divisor: 2.0,
            fuel_rate_divisor: 10.0,
            max_speed: MAX_SPEED,
            max_fuel: MAX_FUEL,
        }
    }
}

/// Persistent vehicle accumulators, owned by whoever drives the updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    speed: f64,
    fuel: f64,
    last_update_us: u64,
}

/// Result of a single update, before truncation for the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub speed: f64,
    pub fuel: f64,
    pub temperature: f64,
}

impl VehicleState {
    /// Stationary vehicle with a full tank, clocked from `now_us`.
    pub fn new(now_us: u64) -> Self {
        Self {
            speed: MIN_SPEED,
            fuel: MAX_FUEL,
            last_update_us: now_us,
        }
    }

    /// State with explicit levels; out-of-range values are clamped.
    pub fn with_levels(speed: f64, fuel: f64, now_us: u64) -> Self {
        Self {
            speed: speed.clamp(MIN_SPEED, MAX_SPEED),
            fuel: fuel.clamp(MIN_FUEL, MAX_FUEL),
            last_update_us: now_us,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn fuel(&self) -> f64 {
        self.fuel
    }

    pub fn last_update_us(&self) -> u64 {
        self.last_update_us
    }
}

impl VehicleModel {
    /// Collapse throttle jitter around the centre to zero.
    pub fn apply_dead_band(&self, y: i64) -> i64 {
        if y > -self.dead_band && y < self.dead_band {
            0
        } else {
            y
        }
    }

    pub fn temperature(&self, speed: f64) -> f64 {
        self.ambient_temp_c + speed / self.temp_speed_divisor
    }

    /// Advance `state` by one input sample taken at `now_us`.
    ///
    /// Speed decay is applied per call while fuel burn is scaled by the
    /// elapsed time, so the coast-down rate depends on the frame rate.
    pub fn update(&self, state: &mut VehicleState, x: i64, y: i64, now_us: u64) -> Reading {
        let y = self.apply_dead_band(y);

        let mut speed = if y == 0 {
            state.speed * self.coast_decay
        } else {
            state.speed + y as f64 / self.accel_divisor
        };
        speed = speed.clamp(MIN_SPEED, self.max_speed);

        if x != 0 {
            speed -= x.unsigned_abs() as f64 / self.turn_divisor;
            speed = speed.clamp(MIN_SPEED, self.max_speed);
        }

        let temperature = self.temperature(speed);

        let burn_rate = if y != 0 {
            speed / self.fuel_rate_divisor
        } else {
            0.0
        };
        let elapsed_s = now_us.saturating_sub(state.last_update_us) as f64 / 1_000_000.0;
        let fuel = (state.fuel - burn_rate * elapsed_s).clamp(MIN_FUEL, self.max_fuel);

        state.speed = speed;
        state.fuel = fuel;
        state.last_update_us = now_us;

        Reading {
            speed,
            fuel,
            temperature,
        }
    }
}

impl Reading {
    /// Truncate toward zero for the dashboard line.
    pub fn to_frame(&self) -> OutputFrame {
        OutputFrame {
            temperature: self.temperature as i64,
            speed: self.speed as i64,
            fuel: self.fuel as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SECOND_US: u64 = 1_000_000;

    #[test]
    fn forward_throttle_from_rest() {
        let model = VehicleModel::default();
        let mut state = VehicleState::new(0);

        let reading = model.update(&mut state, 0, 50, SECOND_US);

        assert_relative_eq!(reading.speed, 5.0);
        assert_relative_eq!(reading.fuel, 99.5);
        assert_relative_eq!(reading.temperature, 22.5);
        assert_eq!(state.last_update_us(), SECOND_US);
    }

    #[test]
    fn dead_band_is_open_interval() {
        let model = VehicleModel::default();
        assert_eq!(model.apply_dead_band(3), 0);
        assert_eq!(model.apply_dead_band(-3), 0);
        assert_eq!(model.apply_dead_band(4), 4);
        assert_eq!(model.apply_dead_band(-4), -4);
    }

    #[test]
    fn coasting_decays_without_burning_fuel() {
        let model = VehicleModel::default();
        let mut state = VehicleState::with_levels(50.0, 80.0, 0);

        let reading = model.update(&mut state, 0, 2, 10 * SECOND_US);

        assert_relative_eq!(reading.speed, 49.0);
        assert_relative_eq!(reading.fuel, 80.0);
    }

    #[test]
    fn turning_costs_speed_regardless_of_direction() {
        let model = VehicleModel::default();
        let mut left = VehicleState::with_levels(50.0, 100.0, 0);
        let mut right = left;

        let l = model.update(&mut left, -32, 10, 0);
        let r = model.update(&mut right, 32, 10, 0);

        assert_relative_eq!(l.speed, 49.0);
        assert_relative_eq!(r.speed, l.speed);
    }

    #[test]
    fn speed_clamps_before_turn_penalty() {
        let model = VehicleModel::default();
        let mut state = VehicleState::with_levels(99.0, 100.0, 0);

        // 99 + 20 clamps to 100 first, then the turn takes 1.
        let reading = model.update(&mut state, 16, 200, 0);

        assert_relative_eq!(reading.speed, 99.0);
    }

    #[test]
    fn reverse_throttle_bottoms_out_at_zero() {
        let model = VehicleModel::default();
        let mut state = VehicleState::with_levels(3.0, 100.0, 0);

        let reading = model.update(&mut state, 0, -100, SECOND_US);

        assert_eq!(reading.speed, 0.0);
        assert_eq!(reading.fuel, 100.0);
        assert_eq!(reading.temperature, 20.0);
    }

    #[test]
    fn fuel_never_goes_negative() {
        let model = VehicleModel::default();
        let mut state = VehicleState::with_levels(100.0, 1.0, 0);

        let reading = model.update(&mut state, 0, 10, 60 * SECOND_US);

        assert_eq!(reading.fuel, 0.0);
    }

    #[test]
    fn clock_going_backwards_burns_nothing() {
        let model = VehicleModel::default();
        let mut state = VehicleState::with_levels(50.0, 60.0, 5 * SECOND_US);

        let reading = model.update(&mut state, 0, 10, SECOND_US);

        assert_relative_eq!(reading.fuel, 60.0);
        assert_eq!(state.last_update_us(), SECOND_US);
    }

    #[test]
    fn extreme_axes_do_not_overflow() {
        let model = VehicleModel::default();
        let mut state = VehicleState::new(0);

        let reading = model.update(&mut state, i64::MIN, i64::MAX, SECOND_US);

        assert!((MIN_SPEED..=MAX_SPEED).contains(&reading.speed));
    }

    #[test]
    fn reading_truncates_for_the_wire() {
        let reading = Reading {
            speed: 5.9,
            fuel: 99.5,
            temperature: 22.95,
        };
        let frame = reading.to_frame();
        assert_eq!(frame.temperature, 22);
        assert_eq!(frame.speed, 5);
        assert_eq!(frame.fuel, 99);
    }
}
