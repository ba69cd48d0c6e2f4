mod common;

mod concurrent;
mod connect;
mod stack;

use crate::common::{
    connect_session, next_event, running_session, wait_event, FakeDebugee, TestProcess,
    CLOSE_CONNECTION, NO_REPLY,
};
use serial_test::serial;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use xsltdbg::debugger::protocol::{ResumeReason, SuspendReason};
use xsltdbg::debugger::{
    BreakpointRegistry, ChannelHook, DebugTarget, Error, SessionEvent, Status,
};

#[test]
#[serial]
fn test_session_lifecycle() {
    let debugee = FakeDebugee::start();
    let registry = Arc::new(BreakpointRegistry::new());
    let (target, rx) = connect_session(&debugee, &registry);

    assert_eq!(target.status(), Status::Connecting);
    assert_eq!(target.name(), "XSLT [default]");
    assert!(target.has_threads());
    assert!(!target.can_disconnect());
    assert!(!target.supports_storage_retrieval());

    debugee.emit("ready");
    assert_eq!(next_event(&rx), SessionEvent::Created);
    debugee.wait_request("START");
    assert_eq!(target.status(), Status::Running);
    assert!(target.can_suspend());
    assert!(!target.can_resume());

    target.suspend().unwrap();
    debugee.emit("suspended client");
    assert_eq!(
        next_event(&rx),
        SessionEvent::Suspended(SuspendReason::Client)
    );
    assert!(target.is_suspended());
    assert!(target.can_resume());
    assert!(!target.can_suspend());

    target.resume().unwrap();
    debugee.emit("resumed client");
    assert_eq!(next_event(&rx), SessionEvent::Resumed(ResumeReason::Client));
    assert_eq!(target.status(), Status::Running);
    assert!(!target.thread().unwrap().is_stepping());

    target.step_over().unwrap();
    debugee.emit("resumed step");
    assert_eq!(next_event(&rx), SessionEvent::Resumed(ResumeReason::Step));
    assert!(target.thread().unwrap().is_stepping());
    debugee.emit("suspended step");
    assert_eq!(next_event(&rx), SessionEvent::Suspended(SuspendReason::Step));
    assert!(!target.thread().unwrap().is_stepping());

    target.step_into().unwrap();
    target.step_return().unwrap();

    debugee.emit("terminated");
    assert_eq!(next_event(&rx), SessionEvent::Terminated);
    assert!(target.is_terminated());
    assert!(!target.has_threads());
    assert!(!target.can_resume());
    assert!(!target.can_suspend());

    assert_eq!(
        debugee.requests(),
        vec![
            "START",
            "SUSPEND",
            "RESUME",
            "STEP_OVER",
            "STEP_INTO",
            "STEP_RETURN"
        ]
    );
}

#[test]
#[serial]
fn test_termination_notified_once() {
    let debugee = FakeDebugee::start();
    let registry = Arc::new(BreakpointRegistry::new());
    let (target, rx) = running_session(&debugee, &registry);

    debugee.emit("terminated");
    wait_event(&rx, SessionEvent::Terminated);

    // events after termination are ignored
    debugee.emit("suspended client");
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    assert!(target.is_terminated());

    target.terminate().unwrap();
    target.terminate().unwrap();
    assert!(matches!(target.resume(), Err(Error::NotConnected)));
    assert!(matches!(target.stack_frames(), Err(Error::NotConnected)));
}

#[test]
#[serial]
fn test_stopped_terminates_debugee() {
    let debugee = FakeDebugee::start();
    let registry = Arc::new(BreakpointRegistry::new());
    let process = Arc::new(TestProcess::new());
    let (hook, rx) = ChannelHook::new();
    let target = DebugTarget::connect(
        &debugee.config(),
        process.clone(),
        registry.clone(),
        Arc::new(hook),
    )
    .unwrap();

    debugee.emit("ready");
    wait_event(&rx, SessionEvent::Created);
    debugee.emit("stopped");

    // closed channels end the event dispatch
    wait_event(&rx, SessionEvent::Terminated);
    assert!(target.is_terminated());
    assert_eq!(process.terminate_calls.load(Ordering::SeqCst), 1);

    target.terminate().unwrap();
    assert_eq!(process.terminate_calls.load(Ordering::SeqCst), 1);
}

#[test]
#[serial]
fn test_event_channel_closed() {
    let debugee = FakeDebugee::start();
    let registry = Arc::new(BreakpointRegistry::new());
    let (target, rx) = running_session(&debugee, &registry);

    debugee.close_events();
    wait_event(&rx, SessionEvent::Terminated);
    assert!(target.is_terminated());
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
#[serial]
fn test_unrecognized_events_ignored() {
    let debugee = FakeDebugee::start();
    let registry = Arc::new(BreakpointRegistry::new());
    let (target, rx) = running_session(&debugee, &registry);

    debugee.emit("garbage");
    debugee.emit("ready");
    debugee.emit("suspended client");
    assert_eq!(
        next_event(&rx),
        SessionEvent::Suspended(SuspendReason::Client)
    );
    assert!(target.is_suspended());
    // second `ready` must not restart the transformation
    assert_eq!(debugee.count_requests("START"), 1);
}

#[test]
#[serial]
fn test_response_timeout_aborts_session() {
    let debugee = FakeDebugee::start();
    debugee.respond("SUSPEND", NO_REPLY);
    let registry = Arc::new(BreakpointRegistry::new());
    let process = Arc::new(TestProcess::new());
    let (hook, rx) = ChannelHook::new();
    let mut config = debugee.config();
    config.response_timeout_ms = 200;
    let target =
        DebugTarget::connect(&config, process.clone(), registry.clone(), Arc::new(hook)).unwrap();

    debugee.emit("ready");
    wait_event(&rx, SessionEvent::Created);
    debugee.wait_request("START");

    let err = target.suspend().unwrap_err();
    assert!(matches!(err, Error::ResponseTimeout(ref req, _) if req == "SUSPEND"));
    assert!(err.is_fatal());

    // termination is reported once, together with the failure
    match next_event(&rx) {
        SessionEvent::Aborted(cause) => assert!(cause.contains("SUSPEND"), "{cause}"),
        event => panic!("unexpected notification: {event:?}"),
    }
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    assert!(target.is_terminated());
    assert_eq!(process.terminate_calls.load(Ordering::SeqCst), 1);
    assert!(matches!(target.resume(), Err(Error::NotConnected)));
}

#[test]
#[serial]
fn test_request_channel_closed_aborts_session() {
    let debugee = FakeDebugee::start();
    debugee.respond("STEP_OVER", CLOSE_CONNECTION);
    let registry = Arc::new(BreakpointRegistry::new());
    let process = Arc::new(TestProcess::new());
    let (hook, rx) = ChannelHook::new();
    let target = DebugTarget::connect(
        &debugee.config(),
        process.clone(),
        registry.clone(),
        Arc::new(hook),
    )
    .unwrap();

    debugee.emit("ready");
    wait_event(&rx, SessionEvent::Created);
    debugee.wait_request("START");
    debugee.emit("suspended client");
    wait_event(&rx, SessionEvent::Suspended(SuspendReason::Client));

    let err = target.step_over().unwrap_err();
    assert!(matches!(err, Error::ChannelClosed(ref req) if req == "STEP_OVER"));
    match next_event(&rx) {
        SessionEvent::Aborted(cause) => assert!(cause.contains("STEP_OVER"), "{cause}"),
        event => panic!("unexpected notification: {event:?}"),
    }
    assert!(target.is_terminated());
    assert_eq!(process.terminate_calls.load(Ordering::SeqCst), 1);
}

#[test]
#[serial]
fn test_drop_terminates_debugee() {
    let debugee = FakeDebugee::start();
    let registry = Arc::new(BreakpointRegistry::new());
    let process = Arc::new(TestProcess::new());
    let (hook, rx) = ChannelHook::new();
    let target = DebugTarget::connect(
        &debugee.config(),
        process.clone(),
        registry.clone(),
        Arc::new(hook),
    )
    .unwrap();

    debugee.emit("ready");
    wait_event(&rx, SessionEvent::Created);
    drop(target);

    assert_eq!(process.terminate_calls.load(Ordering::SeqCst), 1);
    wait_event(&rx, SessionEvent::Terminated);
}
