// Duty cycle convergence with simulated inertia and hard safety limits

use crate::config::HARD_DUTY_LIMIT;

/// Result of one convergence tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriveStep {
    /// New duty cycle [%]
    pub duty: i16,
    /// Reverse limit was hit: the click count must move one step back toward zero
    pub windup: bool,
}

/// Moves the actual duty cycle toward the ramp target
///
/// Acceleration and deceleration use separate step divisors so that the train
/// speeds up gently but stops promptly. A kick floor of half the crawl
/// threshold avoids stalling on start and long tail-offs on stop.
#[derive(Debug, Clone, Copy)]
pub struct DriveConvergence {
    /// Acceleration divisor (higher is steadier)
    smooth_accel: u8,
    /// Deceleration divisor (lower is more responsive)
    smooth_decel: u8,
    /// Maximum reverse duty cycle magnitude [%]
    reverse_max: u8,
}

impl DriveConvergence {
    /// Create a new convergence stepper
    ///
    /// # Arguments
    /// * `smooth_accel` - Acceleration divisor (clamped to >= 1)
    /// * `smooth_decel` - Deceleration divisor (clamped to >= 1)
    /// * `reverse_max` - Reverse duty cycle limit [%]
    pub fn new(smooth_accel: u8, smooth_decel: u8, reverse_max: u8) -> Self {
        Self {
            smooth_accel: smooth_accel.max(1),
            smooth_decel: smooth_decel.max(1),
            reverse_max,
        }
    }

    /// Advance one tick
    ///
    /// # Arguments
    /// * `target` - Signed target duty cycle [%]
    /// * `duty` - Current duty cycle [%]
    /// * `crawl_threshold` - Crawl threshold [%] (0 while calibrating)
    ///
    /// # Returns
    /// New duty cycle, limited to ±HARD_DUTY_LIMIT and >= -reverse_max
    pub fn step(&self, target: i16, duty: i16, crawl_threshold: u8) -> DriveStep {
        if target == duty {
            return DriveStep {
                duty,
                windup: false,
            };
        }

        let gap = (target - duty).abs();
        let accel = step_size(gap, self.smooth_accel);
        let decel = step_size(gap, self.smooth_decel);
        let kick = kick(crawl_threshold);

        let next = if target > duty {
            if duty >= 0 {
                // forward accel
                (duty + accel).max(kick)
            } else if duty < -kick {
                // reverse decel
                duty + decel
            } else {
                0
            }
        } else if duty <= 0 {
            // reverse accel
            (duty - accel).min(-kick)
        } else if duty > kick {
            // forward decel
            duty - decel
        } else {
            0
        };

        let next = next.clamp(-HARD_DUTY_LIMIT, HARD_DUTY_LIMIT);

        // anti-windup: the target behind the click count is out of reach
        let reverse_limit = -(self.reverse_max as i16);
        if next < reverse_limit {
            return DriveStep {
                duty: reverse_limit,
                windup: true,
            };
        }

        DriveStep {
            duty: next,
            windup: false,
        }
    }
}

/// Kickstart / kickstop floor: half the crawl threshold, rounded half away from zero
pub fn kick(crawl_threshold: u8) -> i16 {
    libm::roundf(crawl_threshold as f32 / 2.0) as i16
}

fn step_size(gap: i16, smooth: u8) -> i16 {
    (libm::roundf(gap as f32 / smooth as f32) as i16).max(1)
}
