//! Polling loop, the synchronous core of the client.
//!
//! [`Monitor`] owns the chamber session, the auxiliary sensors and the
//! interlock. Each tick reads everything, evaluates the interlock and only
//! then emits the tick record, so the warm-up decision always uses the
//! freshest reading.
//!
//! ```text
//!  Connector ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!                │          Monitor             │
//!  Sensors   ──▶ │  session · sensors · safety  │
//!                └─────────────────────────────┘
//! ```
//!
//! Per-tick failures are logged and the tick is dropped. A transport
//! failure also drops the session; the next tick reconnects. Only command
//! table failures end the run.

use std::io;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::chamber::Utility;
use crate::config::{ConfigError, InterlockConfig};
use crate::error::{Error, Result};
use crate::safety::{self, Interlock, InterlockOutcome, InterlockState};
use crate::sensors::{AmbientReading, AmbientSensor, MAX_AUX_SENSORS};

use super::events::{MonitorEvent, TickRecord};
use super::ports::{Connector, EventSink};

// ───────────────────────────────────────────────────────────────
// Run budget
// ───────────────────────────────────────────────────────────────

/// When the loop stops on its own. Both limits unset means run forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunBudget {
    pub max_samples: Option<u64>,
    pub max_duration: Option<Duration>,
}

impl RunBudget {
    /// A sample count without a duration also bounds the duration to
    /// `step * samples`. Zero for either limit means no limit.
    pub fn new(max_samples: Option<u64>, max_duration: Option<Duration>, step: Duration) -> Self {
        let max_samples = max_samples.filter(|&n| n > 0);
        let max_duration = max_duration.filter(|d| !d.is_zero());
        let max_duration = match (max_samples, max_duration) {
            (Some(n), None) => Some(step.saturating_mul(u32::try_from(n).unwrap_or(u32::MAX))),
            (_, d) => d,
        };
        Self {
            max_samples,
            max_duration,
        }
    }

    pub fn exhausted(&self, ticks: u64, elapsed: Duration) -> bool {
        self.max_samples.is_some_and(|n| ticks >= n)
            || self.max_duration.is_some_and(|d| elapsed >= d)
    }
}

/// Counters returned when the loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSummary {
    pub ticks: u64,
    pub failed_ticks: u64,
}

// ───────────────────────────────────────────────────────────────
// Monitor
// ───────────────────────────────────────────────────────────────

pub struct Monitor<K: Connector> {
    connector: K,
    session: Option<crate::chamber::ChamberSession<K::Transport>>,
    sensors: heapless::Vec<Box<dyn AmbientSensor>, MAX_AUX_SENSORS>,
    interlock: Interlock,
    ticks: u64,
    failed_ticks: u64,
}

impl<K: Connector> Monitor<K> {
    /// Build a monitor. Does not connect; the first tick does.
    pub fn new(
        connector: K,
        sensors: Vec<Box<dyn AmbientSensor>>,
        interlock: &InterlockConfig,
    ) -> Result<Self> {
        let mut slots = heapless::Vec::new();
        for sensor in sensors {
            slots
                .push(sensor)
                .map_err(|_| ConfigError::ValidationFailed("at most two auxiliary sensors"))?;
        }
        if slots.is_empty() {
            warn!("No auxiliary sensors configured: condensation interlock is inactive");
        }
        Ok(Self {
            connector,
            session: None,
            sensors: slots,
            interlock: Interlock::new(interlock),
            ticks: 0,
            failed_ticks: 0,
        })
    }

    pub fn interlock_state(&self) -> InterlockState {
        self.interlock.state()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn summary(&self) -> MonitorSummary {
        MonitorSummary {
            ticks: self.ticks,
            failed_ticks: self.failed_ticks,
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one tick: chamber reads → sensor reads → interlock → emit.
    ///
    /// Returns `Ok(None)` when the tick was abandoned; `Err` only for
    /// failures that must end the run.
    pub fn tick(&mut self, sink: &mut impl EventSink) -> Result<Option<TickRecord>> {
        self.ticks += 1;
        let tick = self.ticks;
        match self.try_tick(tick, sink) {
            Ok(record) => {
                sink.emit(&MonitorEvent::Tick(record.clone()));
                Ok(Some(record))
            }
            Err(e) if e.is_fatal() => {
                error!("Tick {tick}: {e}");
                Err(e)
            }
            Err(e) => {
                self.failed_ticks += 1;
                warn!("Tick {tick} abandoned: {e}");
                if e.is_transport() {
                    self.drop_session(&e, sink);
                }
                sink.emit(&MonitorEvent::TickFailed {
                    tick,
                    reason: e.to_string(),
                });
                Ok(None)
            }
        }
    }

    fn try_tick(&mut self, tick: u64, sink: &mut impl EventSink) -> Result<TickRecord> {
        if self.session.is_none() {
            let session = self.connector.connect()?;
            info!("Connected to chamber {}", session.chamber());
            sink.emit(&MonitorEvent::Connected);
            self.session = Some(session);
        }
        let Some(session) = self.session.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "no chamber session").into());
        };

        // 1. Chamber
        let temperature_c = session.temperature()?;
        let setpoint_c = session.setpoint()?;
        let compressed_air = session.utility(Utility::CompressedAir)?;
        let dryer = session.utility(Utility::Dryer)?;
        let run_state = session.run_state()?;
        let active_warnings = session.active_warning_count()?;

        // 2. Auxiliary sensors
        let mut ambient: [Option<AmbientReading>; MAX_AUX_SENSORS] = [None; MAX_AUX_SENSORS];
        for (slot, sensor) in self.sensors.iter_mut().enumerate() {
            match sensor.read() {
                Ok(r) => ambient[slot] = Some(r),
                Err(e) => warn!("Sensor '{}' unavailable this tick: {e}", sensor.name()),
            }
        }
        let dewpoints: heapless::Vec<Option<f64>, MAX_AUX_SENSORS> = ambient[..self.sensors.len()]
            .iter()
            .map(|r| r.map(|r| r.dewpoint_c))
            .collect();

        // 3. Interlock
        let interlock = match self.interlock.evaluate(session, temperature_c, &dewpoints) {
            Ok(outcome) => outcome,
            Err(e) if e.is_fatal() || e.is_transport() => return Err(e),
            Err(e) => {
                error!("Interlock could not force warm-up: {e}");
                sink.emit(&MonitorEvent::InterlockFailed {
                    reason: e.to_string(),
                });
                let margin = safety::margin(temperature_c, &dewpoints).unwrap_or(f64::NAN);
                InterlockOutcome::RiskReported { margin }
            }
        };

        Ok(TickRecord {
            tick,
            timestamp: chrono::Local::now().naive_local(),
            temperature_c,
            setpoint_c,
            ambient,
            compressed_air,
            dryer,
            run_state,
            active_warnings,
            interlock,
            interlock_state: self.interlock.state(),
        })
    }

    fn drop_session(&mut self, reason: &Error, sink: &mut impl EventSink) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.disconnect() {
                warn!("Disconnect after failure: {e}");
            }
            sink.emit(&MonitorEvent::Disconnected {
                reason: reason.to_string(),
            });
        }
    }

    // ── Loop ──────────────────────────────────────────────────

    /// Tick every `step` until the budget is exhausted.
    ///
    /// `sleep` is called between ticks; the stop condition is only
    /// checked between ticks, never during a round trip.
    pub fn run(
        &mut self,
        budget: RunBudget,
        step: Duration,
        sink: &mut impl EventSink,
        mut sleep: impl FnMut(Duration),
    ) -> Result<MonitorSummary> {
        let started = Instant::now();
        let first_tick = self.ticks;
        info!("Monitoring climate chamber...");
        while !budget.exhausted(self.ticks - first_tick, started.elapsed()) {
            self.tick(sink)?;
            if budget.exhausted(self.ticks - first_tick, started.elapsed()) {
                break;
            }
            sleep(step);
        }
        info!(
            "Monitoring finished: {} ticks, {} abandoned",
            self.ticks, self.failed_ticks
        );
        Ok(self.summary())
    }

    /// Close the chamber session if one is open.
    pub fn shutdown(mut self) -> Result<()> {
        match self.session.take() {
            Some(session) => session.disconnect(),
            None => Ok(()),
        }
    }
}
