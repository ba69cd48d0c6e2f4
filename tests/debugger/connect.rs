use crate::common::{free_port, next_event, TestProcess};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use xsltdbg::debugger::{
    AttachedProcess, BreakpointRegistry, ChannelHook, DebugTarget, Error, NopHook,
    SessionConfig, SessionEvent, Status,
};

fn config() -> SessionConfig {
    SessionConfig {
        host: "127.0.0.1".to_string(),
        request_port: Some(free_port()),
        event_port: Some(free_port()),
        connect_wait_ms: 10,
        ..Default::default()
    }
}

#[test]
#[serial]
fn test_connection_attempts_exhausted() {
    let config = config();
    let result = DebugTarget::connect(
        &config,
        Arc::new(AttachedProcess::new()),
        Arc::new(BreakpointRegistry::new()),
        Arc::new(NopHook),
    );

    match result {
        Err(Error::ConnectionTimeout { port, attempts }) => {
            assert_eq!(Some(port), config.request_port);
            assert_eq!(attempts, 10);
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("connection must fail"),
    }
}

#[test]
#[serial]
fn test_debugee_died_before_connect() {
    let process = Arc::new(TestProcess::dying_at_check(5));
    let (hook, rx) = ChannelHook::new();
    let target = DebugTarget::connect(
        &config(),
        process.clone(),
        Arc::new(BreakpointRegistry::new()),
        Arc::new(hook),
    )
    .unwrap();

    assert!(process.checks() >= 5);
    assert!(target.is_terminated());
    assert_eq!(target.status(), Status::Terminated);
    assert!(!target.has_threads());
    assert!(!target.can_terminate());

    assert_eq!(next_event(&rx), SessionEvent::Terminated);
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    assert!(matches!(target.resume(), Err(Error::NotConnected)));
    drop(target);
    assert_eq!(
        process
            .terminate_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[test]
#[serial]
fn test_missing_ports() {
    let config = SessionConfig {
        request_port: None,
        ..config()
    };
    let result = DebugTarget::connect(
        &config,
        Arc::new(AttachedProcess::new()),
        Arc::new(BreakpointRegistry::new()),
        Arc::new(NopHook),
    );
    assert!(matches!(result, Err(Error::MissingConfig("request_port"))));
}
