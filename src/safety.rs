//! Condensation interlock.
//!
//! The interlock runs **every tick after the chamber and auxiliary sensors
//! have been read**. It compares the chamber temperature against each
//! available auxiliary dewpoint and uses the smallest margin.
//!
//! ## Lifecycle
//!
//! 1. `margin < threshold` while **Nominal**: if warm-up on interlock is
//!    enabled, the chamber is told to force a warm-up and the interlock
//!    latches **ForcedWarmUp**; otherwise the risk is only reported.
//! 2. While **ForcedWarmUp** no further writes are issued.
//! 3. The first tick with `margin >= threshold` returns to **Nominal**.
//!    The chamber keeps warming; stopping it is left to the operator.
//!
//! A tick with no auxiliary reading is skipped and leaves the state as is.
//! If the warm-up request fails the interlock stays **Nominal**, so the
//! next violating tick tries again.

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::app::ports::ChamberControl;
use crate::config::InterlockConfig;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InterlockState {
    Nominal,
    ForcedWarmUp,
}

/// What one evaluation did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum InterlockOutcome {
    /// No auxiliary dewpoint was available.
    Skipped,
    Nominal { margin: f64 },
    /// Margin violated, warm-up on interlock disabled.
    RiskReported { margin: f64 },
    /// Margin violated, warm-up requested this tick.
    WarmUpTriggered { margin: f64 },
    /// Margin still violated, warm-up already requested.
    WarmUpHeld { margin: f64 },
    /// Margin restored after a forced warm-up.
    Recovered { margin: f64 },
}

impl InterlockOutcome {
    pub fn margin(&self) -> Option<f64> {
        match *self {
            Self::Skipped => None,
            Self::Nominal { margin }
            | Self::RiskReported { margin }
            | Self::WarmUpTriggered { margin }
            | Self::WarmUpHeld { margin }
            | Self::Recovered { margin } => Some(margin),
        }
    }

    /// The margin is below threshold this tick.
    pub fn at_risk(&self) -> bool {
        matches!(
            self,
            Self::RiskReported { .. } | Self::WarmUpTriggered { .. } | Self::WarmUpHeld { .. }
        )
    }
}

/// Smallest `temperature − dewpoint` over the available readings.
/// NaN anywhere yields NaN, which never passes the threshold.
pub fn margin(temperature_c: f64, dewpoints: &[Option<f64>]) -> Option<f64> {
    dewpoints
        .iter()
        .flatten()
        .map(|d| temperature_c - d)
        .reduce(|a, b| if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) })
}

/// Condensation interlock state machine.
pub struct Interlock {
    threshold_c: f64,
    warm_up_on_interlock: bool,
    target_c: f64,
    gradient: f64,
    state: InterlockState,
}

impl Interlock {
    pub fn new(config: &InterlockConfig) -> Self {
        Self {
            threshold_c: config.threshold_c,
            warm_up_on_interlock: config.warm_up_on_interlock,
            target_c: config.target_c,
            gradient: config.gradient_k_per_min,
            state: InterlockState::Nominal,
        }
    }

    pub fn state(&self) -> InterlockState {
        self.state
    }

    pub fn threshold_c(&self) -> f64 {
        self.threshold_c
    }

    /// Evaluate one tick's readings. `dewpoints` holds one slot per
    /// auxiliary sensor; `None` means that sensor gave no reading.
    pub fn evaluate(
        &mut self,
        chamber: &mut impl ChamberControl,
        temperature_c: f64,
        dewpoints: &[Option<f64>],
    ) -> Result<InterlockOutcome> {
        let Some(margin) = margin(temperature_c, dewpoints) else {
            debug!("Interlock skipped: no auxiliary dewpoint");
            return Ok(InterlockOutcome::Skipped);
        };

        if margin >= self.threshold_c {
            return Ok(match self.state {
                InterlockState::ForcedWarmUp => {
                    info!(
                        "INTERLOCK CLEARED: margin {:.2} K >= {:.2} K",
                        margin, self.threshold_c
                    );
                    self.state = InterlockState::Nominal;
                    InterlockOutcome::Recovered { margin }
                }
                InterlockState::Nominal => InterlockOutcome::Nominal { margin },
            });
        }

        match self.state {
            InterlockState::ForcedWarmUp => Ok(InterlockOutcome::WarmUpHeld { margin }),
            InterlockState::Nominal if !self.warm_up_on_interlock => {
                warn!(
                    "CONDENSATION RISK: margin {:.2} K < {:.2} K (warm-up on interlock disabled)",
                    margin, self.threshold_c
                );
                Ok(InterlockOutcome::RiskReported { margin })
            }
            InterlockState::Nominal => {
                error!(
                    "CONDENSATION RISK: margin {:.2} K < {:.2} K, forcing warm-up to {:.1} \u{00b0}C",
                    margin, self.threshold_c, self.target_c
                );
                chamber.force_warm_up(self.target_c, self.gradient)?;
                self.state = InterlockState::ForcedWarmUp;
                Ok(InterlockOutcome::WarmUpTriggered { margin })
            }
        }
    }
}
