// Speed ramp: click count -> target duty cycle magnitude

use crate::config::MAX_STEPS;

/// Number of points a ramp can hold (index 0..=MAX_STEPS+1)
pub const RAMP_CAPACITY: usize = MAX_STEPS as usize + 2;

/// Number of points in the calibration ramp (identity 0..50)
pub const CALIBRATION_RAMP_LEN: usize = 50;

/// Ramp construction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RampMode {
    /// Threshold floor followed by a linear climb to the forward maximum
    Run,
    /// Identity ramp used while the crawl threshold is being calibrated
    Calibrate,
}

/// Mapping from click count magnitude to target duty cycle [%]
///
/// Invariants: non-decreasing, `f(0) = 0`, `f(1) = crawl threshold` in run mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampProfile {
    points: [f32; RAMP_CAPACITY],
    len: usize,
}

impl RampProfile {
    /// Build a ramp
    ///
    /// # Arguments
    /// * `mode` - Run or calibrate
    /// * `crawl_threshold` - Minimum duty cycle that moves the train [%]
    /// * `forward_max` - Duty cycle at full click count [%]
    /// * `steps` - Number of clicks from crawl to full speed (capped at MAX_STEPS)
    pub fn build(mode: RampMode, crawl_threshold: u8, forward_max: u8, steps: u8) -> Self {
        let mut points = [0.0f32; RAMP_CAPACITY];

        let len = match mode {
            RampMode::Calibrate => {
                for (x, point) in points.iter_mut().take(CALIBRATION_RAMP_LEN).enumerate() {
                    *point = x as f32;
                }
                CALIBRATION_RAMP_LEN
            }
            RampMode::Run => {
                let steps = steps.clamp(1, MAX_STEPS) as usize;
                let crawl = crawl_threshold as f32;
                let span = forward_max as f32 - crawl;

                points[0] = 0.0;
                points[1] = crawl;
                for x in 1..=steps {
                    let value = crawl + span * x as f32 / steps as f32;
                    points[x + 1] = round_tenth(value);
                }
                steps + 2
            }
        };

        Self { points, len }
    }

    /// Target magnitude at a ramp index (indices past the end hold the last point)
    pub fn get(&self, index: usize) -> f32 {
        self.points[index.min(self.len - 1)]
    }

    /// Signed target duty cycle for a click count
    pub fn target(&self, clicks: i16) -> i16 {
        let magnitude = libm::roundf(self.get(clicks.unsigned_abs() as usize)) as i16;
        if clicks < 0 {
            -magnitude
        } else {
            magnitude
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn points(&self) -> &[f32] {
        &self.points[..self.len]
    }
}

/// Round to one decimal place
fn round_tenth(value: f32) -> f32 {
    libm::roundf(value * 10.0) / 10.0
}
