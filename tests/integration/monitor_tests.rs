//! Integration tests: Monitor → session → interlock → event sinks.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use climatebox::adapters::tick_log::TickLogWriter;
use climatebox::app::events::MonitorEvent;
use climatebox::app::monitor::{Monitor, RunBudget};
use climatebox::config::InterlockConfig;
use climatebox::safety::{InterlockOutcome, InterlockState};
use climatebox::sensors::iio::{HUMIDITY_CHANNEL, TEMPERATURE_CHANNEL};
use climatebox::sensors::{AmbientReading, AmbientSensor, FixedDewpoint, IioHygrometer};
use climatebox::Error;

use crate::mock_chamber::{ChamberState, FakeConnector, RecordingSink};

/// Setpoint write; issued exactly once per forced warm-up.
const SET_SETPOINT: u32 = 11001;
const PRGM_STATUS: u32 = 19210;

struct BrokenSensor;

impl AmbientSensor for BrokenSensor {
    fn name(&self) -> &str {
        "broken"
    }

    fn read(&mut self) -> climatebox::Result<AmbientReading> {
        Err(Error::Sensor {
            name: "broken".into(),
            reason: "no response".into(),
        })
    }
}

fn monitor_with(
    temperature: f64,
    sensors: Vec<Box<dyn AmbientSensor>>,
) -> (Rc<RefCell<ChamberState>>, Monitor<FakeConnector>) {
    let state = Rc::new(RefCell::new(ChamberState {
        temperature,
        ..ChamberState::default()
    }));
    let connector = FakeConnector {
        state: Rc::clone(&state),
    };
    let monitor = Monitor::new(connector, sensors, &InterlockConfig::default()).unwrap();
    (state, monitor)
}

fn dewpoint(d: f64) -> Vec<Box<dyn AmbientSensor>> {
    vec![Box::new(FixedDewpoint::new("bench", d))]
}

#[test]
fn margin_violation_forces_exactly_one_warm_up() {
    let (state, mut monitor) = monitor_with(22.0, dewpoint(18.0));
    let mut sink = RecordingSink::default();

    let first = monitor.tick(&mut sink).unwrap().unwrap();
    assert_eq!(first.interlock, InterlockOutcome::WarmUpTriggered { margin: 4.0 });
    assert_eq!(first.interlock_state, InterlockState::ForcedWarmUp);

    for _ in 0..3 {
        let rec = monitor.tick(&mut sink).unwrap().unwrap();
        assert_eq!(rec.interlock, InterlockOutcome::WarmUpHeld { margin: 4.0 });
    }

    let st = state.borrow();
    assert_eq!(st.count(SET_SETPOINT), 1);
    assert!((st.setpoint - 24.0).abs() < 1e-9);
    assert!(st.output(1) && st.output(7) && st.output(8));
}

#[test]
fn sufficient_margin_issues_no_writes() {
    let (state, mut monitor) = monitor_with(25.0, dewpoint(18.0));
    let mut sink = RecordingSink::default();
    for _ in 0..3 {
        let rec = monitor.tick(&mut sink).unwrap().unwrap();
        assert_eq!(rec.interlock, InterlockOutcome::Nominal { margin: 7.0 });
    }
    let st = state.borrow();
    assert_eq!(st.count(SET_SETPOINT), 0);
    assert_eq!(st.count(PRGM_STATUS), 0);
    assert_eq!(monitor.interlock_state(), InterlockState::Nominal);
}

#[test]
fn tick_record_carries_chamber_readings() {
    let (state, mut monitor) = monitor_with(25.0, dewpoint(18.0));
    {
        let mut st = state.borrow_mut();
        st.setpoint = 30.0;
        st.outputs.insert(7, true);
        st.outputs.insert(1, true);
    }
    let mut sink = RecordingSink::default();
    let rec = monitor.tick(&mut sink).unwrap().unwrap();
    assert!((rec.setpoint_c - 30.0).abs() < 1e-9);
    assert!(rec.compressed_air && !rec.dryer);
    assert_eq!(rec.run_state.to_string(), "Manual run");
    assert_eq!(rec.dewpoint_c(0), Some(18.0));
    assert_eq!(rec.dewpoint_c(1), None);
    assert_eq!(sink.count(|e| matches!(e, MonitorEvent::Connected)), 1);
    assert_eq!(sink.count(|e| matches!(e, MonitorEvent::Tick(_))), 1);
}

#[test]
fn program_blocks_warm_up_and_next_tick_retries() {
    let (state, mut monitor) = monitor_with(22.0, dewpoint(18.0));
    state.borrow_mut().run_program(1, "Cycle");
    let mut sink = RecordingSink::default();

    let rec = monitor.tick(&mut sink).unwrap().unwrap();
    assert_eq!(rec.interlock, InterlockOutcome::RiskReported { margin: 4.0 });
    assert_eq!(rec.interlock_state, InterlockState::Nominal);
    assert_eq!(sink.count(|e| matches!(e, MonitorEvent::InterlockFailed { .. })), 1);

    monitor.tick(&mut sink).unwrap().unwrap();
    let st = state.borrow();
    assert_eq!(st.count(PRGM_STATUS), 2, "each violating tick retries");
    assert_eq!(st.count(SET_SETPOINT), 0);
}

#[test]
fn transport_failure_reconnects_on_next_tick() {
    let (state, mut monitor) = monitor_with(25.0, dewpoint(18.0));
    let mut sink = RecordingSink::default();

    assert!(monitor.tick(&mut sink).unwrap().is_some());
    state.borrow_mut().fail_next_receive = Some(io::ErrorKind::ConnectionReset);

    assert!(monitor.tick(&mut sink).unwrap().is_none());
    assert!(!monitor.is_connected());
    assert_eq!(sink.count(|e| matches!(e, MonitorEvent::Disconnected { .. })), 1);
    assert_eq!(sink.count(|e| matches!(e, MonitorEvent::TickFailed { tick: 2, .. })), 1);

    assert!(monitor.tick(&mut sink).unwrap().is_some());
    assert_eq!(state.borrow().connects, 2);

    let summary = monitor.summary();
    assert_eq!((summary.ticks, summary.failed_ticks), (3, 1));
}

#[test]
fn refused_connection_skips_the_tick() {
    let (state, mut monitor) = monitor_with(25.0, dewpoint(18.0));
    state.borrow_mut().refuse_connect = true;
    let mut sink = RecordingSink::default();

    assert!(monitor.tick(&mut sink).unwrap().is_none());
    assert!(state.borrow().requests.is_empty());

    state.borrow_mut().refuse_connect = false;
    assert!(monitor.tick(&mut sink).unwrap().is_some());
}

#[test]
fn device_error_mid_tick_keeps_the_session() {
    let (state, mut monitor) = monitor_with(25.0, dewpoint(18.0));
    let mut sink = RecordingSink::default();
    monitor.tick(&mut sink).unwrap();

    state.borrow_mut().reject_next = Some(-8);
    assert!(monitor.tick(&mut sink).unwrap().is_none());
    assert!(monitor.is_connected());
    assert_eq!(sink.count(|e| matches!(e, MonitorEvent::Disconnected { .. })), 0);

    assert!(monitor.tick(&mut sink).unwrap().is_some());
    assert_eq!(state.borrow().connects, 1);
}

#[test]
fn unreadable_sensor_skips_the_interlock() {
    let (state, mut monitor) = monitor_with(10.0, vec![Box::new(BrokenSensor)]);
    let mut sink = RecordingSink::default();
    let rec = monitor.tick(&mut sink).unwrap().unwrap();
    assert_eq!(rec.interlock, InterlockOutcome::Skipped);
    assert_eq!(rec.dewpoint_c(0), None);
    assert_eq!(state.borrow().count(SET_SETPOINT), 0);
}

#[test]
fn second_sensor_can_trip_the_interlock() {
    let sensors: Vec<Box<dyn AmbientSensor>> = vec![
        Box::new(FixedDewpoint::new("a", 5.0)),
        Box::new(FixedDewpoint::new("b", 19.0)),
    ];
    let (state, mut monitor) = monitor_with(22.0, sensors);
    let mut sink = RecordingSink::default();
    let rec = monitor.tick(&mut sink).unwrap().unwrap();
    assert_eq!(rec.interlock, InterlockOutcome::WarmUpTriggered { margin: 3.0 });
    assert_eq!(state.borrow().count(SET_SETPOINT), 1);
}

#[test]
fn humid_air_from_iio_sensor_trips_the_interlock() {
    let dir = std::env::temp_dir().join(format!("climatebox-monitor-iio-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    // 25 °C at 80 %RH: dewpoint about 21.3 °C
    std::fs::write(dir.join(TEMPERATURE_CHANNEL), "25000\n").unwrap();
    std::fs::write(dir.join(HUMIDITY_CHANNEL), "80000\n").unwrap();

    let (state, mut monitor) = monitor_with(22.0, vec![Box::new(IioHygrometer::new("hall", &dir))]);
    let mut sink = RecordingSink::default();
    let rec = monitor.tick(&mut sink).unwrap().unwrap();

    assert!(matches!(rec.interlock, InterlockOutcome::WarmUpTriggered { .. }));
    let reading = rec.ambient[0].unwrap();
    assert_eq!(reading.humidity_pct, Some(80.0));
    assert!((reading.dewpoint_c - 21.3).abs() < 0.1);
    assert_eq!(state.borrow().count(SET_SETPOINT), 1);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn more_than_two_sensors_is_rejected() {
    let state = Rc::new(RefCell::new(ChamberState::default()));
    let sensors: Vec<Box<dyn AmbientSensor>> = (0..3)
        .map(|i| Box::new(FixedDewpoint::new(format!("s{i}"), 0.0)) as Box<dyn AmbientSensor>)
        .collect();
    let result = Monitor::new(FakeConnector { state }, sensors, &InterlockConfig::default());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn run_stops_after_sample_budget() {
    let (_state, mut monitor) = monitor_with(25.0, dewpoint(18.0));
    let mut sink = RecordingSink::default();
    let mut sleeps = Vec::new();
    let step = Duration::from_secs(3600);

    let budget = RunBudget::new(Some(3), None, step);
    let summary = monitor
        .run(budget, step, &mut sink, |d| sleeps.push(d))
        .unwrap();

    assert_eq!(summary.ticks, 3);
    assert_eq!(sleeps, vec![step, step]);
    assert_eq!(sink.count(|e| matches!(e, MonitorEvent::Tick(_))), 3);
    monitor.shutdown().unwrap();
}

#[test]
fn run_writes_tick_log_lines() {
    let (_state, mut monitor) = monitor_with(22.0, dewpoint(18.0));
    let mut sink = (RecordingSink::default(), TickLogWriter::new(Vec::new()));
    let budget = RunBudget::new(Some(2), None, Duration::from_secs(1));
    monitor
        .run(budget, Duration::from_secs(1), &mut sink, |_| {})
        .unwrap();

    let text = String::from_utf8(sink.1.into_inner()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 8, "{line}");
        assert_eq!(fields[1], "22.00000");
        assert_eq!(fields[3], "18.0");
        assert_eq!(fields[4], "");
    }
}
