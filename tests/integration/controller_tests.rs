//! Integration tests for the channel → LockController → actuator pipeline.
//!
//! A line goes in through a mock transport; the tests check the exact pin
//! sequence, the sleep between HIGH and LOW, and the reply bytes.

use super::mock_hw::{HwEvent, MockTransport, Rig, pin_writes, trace_since};

use esplock::app::commands::LockCommand;
use esplock::app::events::LockEvent;
use esplock::app::service::{DispatchState, LockController};
use esplock::channel::LineChannel;
use esplock::config::{LockConfig, PulseMode};
use esplock::drivers::lock::{LockActuator, LockState};
use esplock::error::{ActuatorError, ChannelError};

use super::mock_hw::{MockPin, RecordingSink, new_trace};

fn blocking() -> LockConfig {
    LockConfig {
        pulse_mode: PulseMode::Blocking,
        ..LockConfig::default()
    }
}

fn deadline() -> LockConfig {
    LockConfig {
        pulse_mode: PulseMode::Deadline,
        ..LockConfig::default()
    }
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_locks_and_advertises_device_name() {
    let mut rig = Rig::new(blocking(), MockTransport::default());
    rig.start();

    assert_eq!(
        rig.channel.transport().opened_as.as_deref(),
        Some("ESP32_LOCK")
    );
    assert_eq!(rig.controller.actuator().state(), LockState::Locked);
    assert!(rig.trace.borrow().iter().all(|e| *e == HwEvent::Low));
    assert_eq!(
        rig.sink.events,
        vec![LockEvent::ChannelStarted {
            device_name: LockConfig::default().device_name
        }]
    );
}

#[test]
fn failed_channel_leaves_controller_inert() {
    let transport = MockTransport {
        fail_open: true,
        ..MockTransport::with_input(b"1\n")
    };
    let mut rig = Rig::new(blocking(), transport);

    assert!(!rig.controller.start(&mut rig.channel, &mut rig.sink));
    assert!(!rig.controller.is_online());
    assert_eq!(
        rig.sink.events.last(),
        Some(&LockEvent::ChannelFailed(ChannelError::InitFailed(-1)))
    );

    let mark = rig.trace.borrow().len();
    for _ in 0..3 {
        assert_eq!(rig.poll(), None);
    }
    assert!(trace_since(&rig.trace, mark).is_empty());
    assert_eq!(rig.sent(), "");
    assert_eq!(rig.controller.actuator().state(), LockState::Locked);
}

#[test]
fn no_input_means_no_activity() {
    let mut rig = Rig::new(blocking(), MockTransport::default());
    let mark = rig.start();

    for _ in 0..10 {
        assert_eq!(rig.poll(), None);
    }
    assert!(trace_since(&rig.trace, mark).is_empty());
    assert_eq!(rig.sent(), "");
    assert_eq!(rig.controller.state(), DispatchState::Idle);
}

// ── Blocking dispatch ─────────────────────────────────────────

#[test]
fn every_unlock_spelling_pulses_for_three_seconds() {
    for cmd in ["1", "OPEN", "open", "Open", "oPeN", "opEN"] {
        let input = format!("{}\n", cmd);
        let mut rig = Rig::new(blocking(), MockTransport::with_input(input.as_bytes()));
        let mark = rig.start();

        assert_eq!(rig.poll(), Some(LockCommand::Unlock), "command {:?}", cmd);
        assert_eq!(
            trace_since(&rig.trace, mark),
            vec![HwEvent::High, HwEvent::Delay(3000), HwEvent::Low],
            "command {:?}",
            cmd
        );
        assert_eq!(rig.sent(), "OK\n", "command {:?}", cmd);
        assert_eq!(rig.controller.actuator().state(), LockState::Locked);
    }
}

#[test]
fn anything_else_is_rejected_without_touching_the_pin() {
    for cmd in ["", "2", "0", "11", "lock", "opened", "OPEN NOW", "o pen", "1 1"] {
        let input = format!("{}\n", cmd);
        let mut rig = Rig::new(blocking(), MockTransport::with_input(input.as_bytes()));
        let mark = rig.start();

        assert_eq!(rig.poll(), Some(LockCommand::Unknown), "command {:?}", cmd);
        assert!(trace_since(&rig.trace, mark).is_empty(), "command {:?}", cmd);
        assert_eq!(rig.sent(), "ERR\n", "command {:?}", cmd);
    }
}

#[test]
fn surrounding_whitespace_and_crlf_are_ignored() {
    let mut rig = Rig::new(blocking(), MockTransport::with_input(b"  open \r\n\t1\r\n"));
    let mark = rig.start();

    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    assert_eq!(rig.sent(), "OK\nOK\n");
    assert_eq!(
        pin_writes(&rig.trace, mark),
        vec![HwEvent::High, HwEvent::Low, HwEvent::High, HwEvent::Low]
    );
}

#[test]
fn back_to_back_unlocks_each_get_a_pulse_and_reply() {
    let mut rig = Rig::new(blocking(), MockTransport::with_input(b"1\n1\n"));
    let mark = rig.start();

    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    assert_eq!(rig.sent(), "OK\n");
    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    assert_eq!(rig.sent(), "OK\nOK\n");
    assert_eq!(rig.poll(), None);

    assert_eq!(
        trace_since(&rig.trace, mark),
        vec![
            HwEvent::High,
            HwEvent::Delay(3000),
            HwEvent::Low,
            HwEvent::High,
            HwEvent::Delay(3000),
            HwEvent::Low,
        ]
    );
    assert_eq!(rig.controller.actuator().pulse_count(), 2);
}

#[test]
fn mixed_session_replies_in_order() {
    let mut rig = Rig::new(blocking(), MockTransport::with_input(b"hello\n1\nlock\n"));
    rig.start();

    while rig.poll().is_some() {}

    assert_eq!(rig.sent(), "ERR\nOK\nERR\n");
    let stats = rig.controller.stats();
    assert_eq!(stats.lines, 3);
    assert_eq!(stats.unlocks, 1);
    assert_eq!(stats.rejected, 2);
}

#[test]
fn overlong_line_is_rejected_as_a_whole() {
    let mut input = vec![b'1'; 100];
    input.push(b'\n');
    input.extend_from_slice(b"1\n");
    let mut rig = Rig::new(blocking(), MockTransport::with_input(&input));
    let mark = rig.start();

    assert_eq!(rig.poll(), Some(LockCommand::Unknown));
    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    assert_eq!(rig.sent(), "ERR\nOK\n");
    assert_eq!(
        pin_writes(&rig.trace, mark),
        vec![HwEvent::High, HwEvent::Low]
    );
}

#[test]
fn heavily_padded_command_still_unlocks() {
    let mut input = vec![b' '; 70];
    input.extend_from_slice(b"OPEN");
    input.extend_from_slice(&[b' '; 70]);
    input.extend_from_slice(b"\r\n");
    let mut rig = Rig::new(blocking(), MockTransport::with_input(&input));
    rig.start();

    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    assert_eq!(rig.sent(), "OK\n");
}

#[test]
fn line_split_across_polls_is_handled_once_complete() {
    let mut rig = Rig::new(blocking(), MockTransport::with_input(b"OP"));
    rig.start();

    assert_eq!(rig.poll(), None);
    rig.channel.transport_mut().feed(b"EN\n");
    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    assert_eq!(rig.sent(), "OK\n");
}

#[test]
fn unlock_emits_the_full_event_sequence() {
    let mut rig = Rig::new(blocking(), MockTransport::with_input(b"1\n"));
    rig.start();
    rig.sink.events.clear();

    rig.poll();

    let mut line = esplock::channel::Line::new();
    line.push_str("1").unwrap();
    assert_eq!(
        rig.sink.events,
        vec![
            LockEvent::CommandReceived(line),
            LockEvent::CommandClassified(LockCommand::Unlock),
            LockEvent::PulseStarted { duration_ms: 3000 },
            LockEvent::PulseEnded,
        ]
    );
}

#[test]
fn zero_duration_pulse_still_goes_high_then_low() {
    let config = LockConfig {
        unlock_duration_ms: 0,
        ..blocking()
    };
    let mut rig = Rig::new(config, MockTransport::with_input(b"1\n"));
    let mark = rig.start();

    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    assert_eq!(
        pin_writes(&rig.trace, mark),
        vec![HwEvent::High, HwEvent::Low]
    );
    assert_eq!(rig.sent(), "OK\n");
}

// ── Failures ──────────────────────────────────────────────────

#[test]
fn energize_failure_replies_err_and_stays_locked() {
    let mut rig = Rig::new(blocking(), MockTransport::with_input(b"1\n"));
    let mark = rig.start();
    rig.fail_high.set(true);

    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    assert_eq!(rig.sent(), "ERR\n");
    assert_eq!(trace_since(&rig.trace, mark), vec![HwEvent::Low]);
    assert!(
        rig.sink
            .events
            .contains(&LockEvent::ActuatorFault(ActuatorError::EnergizeFailed))
    );
    assert_eq!(rig.controller.stats().actuator_faults, 1);
    assert_eq!(rig.controller.actuator().state(), LockState::Locked);
}

#[test]
fn reply_failure_is_reported_but_pulse_still_runs() {
    let transport = MockTransport {
        fail_write: true,
        ..MockTransport::with_input(b"1\n")
    };
    let mut rig = Rig::new(blocking(), transport);
    let mark = rig.start();

    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    assert_eq!(
        pin_writes(&rig.trace, mark),
        vec![HwEvent::High, HwEvent::Low]
    );
    assert_eq!(
        rig.sink.events.last(),
        Some(&LockEvent::ReplyFailed {
            reply: "OK",
            error: ChannelError::WriteFailed,
        })
    );
    assert_eq!(rig.controller.stats().reply_failures, 1);
    assert_eq!(rig.controller.state(), DispatchState::Idle);
}

// ── Deadline dispatch ─────────────────────────────────────────

#[test]
fn deadline_pulse_releases_on_time_and_then_replies() {
    let mut rig = Rig::new(deadline(), MockTransport::with_input(b"OPEN\n"));
    let mark = rig.start();

    rig.clock.set(100);
    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    assert_eq!(trace_since(&rig.trace, mark), vec![HwEvent::High]);
    assert_eq!(rig.sent(), "");

    rig.clock.set(3099);
    assert_eq!(rig.poll(), None);
    assert!(rig.controller.actuator().is_energized());

    rig.clock.set(3100);
    assert_eq!(rig.poll(), None);
    assert_eq!(
        trace_since(&rig.trace, mark),
        vec![HwEvent::High, HwEvent::Low]
    );
    assert_eq!(rig.sent(), "OK\n");
    assert_eq!(rig.controller.state(), DispatchState::Idle);
}

#[test]
fn lines_arriving_mid_pulse_wait_their_turn() {
    let mut rig = Rig::new(deadline(), MockTransport::with_input(b"1\n"));
    let mark = rig.start();

    rig.clock.set(0);
    rig.poll();
    rig.channel.transport_mut().feed(b"nope\n1\n");

    rig.clock.set(1500);
    assert_eq!(rig.poll(), None);
    assert_eq!(rig.sent(), "");

    // Release, then the queued reject in the same call.
    rig.clock.set(3000);
    assert_eq!(rig.poll(), Some(LockCommand::Unknown));
    assert_eq!(rig.sent(), "OK\nERR\n");

    rig.clock.set(3010);
    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    rig.clock.set(6010);
    rig.poll();

    assert_eq!(rig.sent(), "OK\nERR\nOK\n");
    assert_eq!(
        pin_writes(&rig.trace, mark),
        vec![HwEvent::High, HwEvent::Low, HwEvent::High, HwEvent::Low]
    );
}

#[test]
fn failed_release_is_retried_next_poll() {
    let mut rig = Rig::new(deadline(), MockTransport::with_input(b"1\n"));
    let mark = rig.start();

    rig.clock.set(0);
    rig.poll();
    rig.fail_low.set(true);

    rig.clock.set(3000);
    rig.poll();
    assert!(rig.controller.actuator().is_energized());
    assert_eq!(rig.sent(), "");

    rig.fail_low.set(false);
    rig.clock.set(3010);
    rig.poll();
    assert_eq!(
        trace_since(&rig.trace, mark),
        vec![HwEvent::High, HwEvent::Low]
    );
    assert_eq!(rig.sent(), "OK\n");
    assert_eq!(rig.controller.stats().actuator_faults, 1);
}

#[test]
fn blocking_release_failure_is_retried_before_the_next_line() {
    let mut rig = Rig::new(blocking(), MockTransport::with_input(b"1\nOPEN\n"));
    let mark = rig.start();
    rig.fail_low.set(true);

    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    assert!(rig.controller.actuator().is_energized());
    assert_eq!(rig.sent(), "");
    assert_eq!(
        rig.controller.state(),
        DispatchState::Dispatching(LockCommand::Unlock)
    );

    // Still failing: nothing else is read.
    assert_eq!(rig.poll(), None);
    assert_eq!(rig.channel.transport().rx.len(), 5);

    rig.fail_low.set(false);
    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    for _ in 0..3 {
        rig.poll();
    }

    assert!(!rig.controller.actuator().is_energized());
    assert_eq!(rig.sent(), "OK\nOK\n");
    assert_eq!(
        trace_since(&rig.trace, mark),
        vec![
            HwEvent::High,
            HwEvent::Delay(3000),
            HwEvent::Low,
            HwEvent::High,
            HwEvent::Delay(3000),
            HwEvent::Low,
        ]
    );
    assert_eq!(rig.controller.stats().actuator_faults, 2);
    assert_eq!(rig.controller.state(), DispatchState::Idle);
}

#[test]
fn zero_length_deadline_release_failure_is_retried() {
    let config = LockConfig {
        unlock_duration_ms: 0,
        ..deadline()
    };
    let mut rig = Rig::new(config, MockTransport::with_input(b"1\n"));
    let mark = rig.start();
    rig.fail_low.set(true);

    rig.clock.set(0);
    assert_eq!(rig.poll(), Some(LockCommand::Unlock));
    assert!(rig.controller.actuator().is_energized());
    assert_eq!(rig.sent(), "");

    rig.fail_low.set(false);
    for t in [10, 20, 30, 40] {
        rig.clock.set(t);
        assert_eq!(rig.poll(), None);
    }

    assert!(!rig.controller.actuator().is_energized());
    assert_eq!(rig.sent(), "OK\n");
    assert_eq!(
        trace_since(&rig.trace, mark),
        vec![HwEvent::High, HwEvent::Low]
    );
    assert!(
        rig.sink
            .events
            .contains(&LockEvent::ActuatorFault(ActuatorError::DeEnergizeFailed))
    );
}

#[test]
fn dropping_the_controller_mid_pulse_locks() {
    let trace = new_trace();
    let actuator = LockActuator::new(MockPin::new(trace.clone())).unwrap();
    let mut controller = LockController::new(deadline(), actuator);
    let mut channel = LineChannel::new(MockTransport::with_input(b"1\n"));
    let mut sink = RecordingSink::new();

    controller.start(&mut channel, &mut sink);
    controller.poll_deadline(0, &mut channel, &mut sink);
    assert_eq!(trace.borrow().last(), Some(&HwEvent::High));

    drop(controller);
    assert_eq!(trace.borrow().last(), Some(&HwEvent::Low));
}
