use crate::common::{running_session, wait_event, FakeDebugee};
use serial_test::serial;
use std::sync::Arc;
use xsltdbg::debugger::protocol::{FrameKey, ResumeReason, SuspendReason, VariableId};
use xsltdbg::debugger::{BreakpointRegistry, DebugTarget, Error, Scope, SessionEvent};

fn suspend(debugee: &FakeDebugee, rx: &std::sync::mpsc::Receiver<SessionEvent>) {
    debugee.emit("suspended client");
    wait_event(rx, SessionEvent::Suspended(SuspendReason::Client));
}

fn resume(debugee: &FakeDebugee, rx: &std::sync::mpsc::Receiver<SessionEvent>) {
    debugee.emit("resumed client");
    wait_event(rx, SessionEvent::Resumed(ResumeReason::Client));
}

fn frame_names(target: &DebugTarget) -> Vec<(String, u32, usize)> {
    target
        .stack_frames()
        .unwrap()
        .iter()
        .map(|f| (f.name().to_string(), f.line_number(), f.index()))
        .collect()
}

#[test]
#[serial]
fn test_stack_frames_cached() {
    let debugee = FakeDebugee::start();
    debugee.respond("STACK", "10::a$$$20::b");
    let registry = Arc::new(BreakpointRegistry::new());
    let (target, rx) = running_session(&debugee, &registry);

    // no stack before the first suspension
    assert!(target.stack_frames().unwrap().is_empty());
    assert_eq!(debugee.count_requests("STACK"), 0);

    suspend(&debugee, &rx);
    assert_eq!(
        frame_names(&target),
        vec![("b".to_string(), 20, 0), ("a".to_string(), 10, 1)]
    );
    assert_eq!(frame_names(&target).len(), 2);
    assert_eq!(debugee.count_requests("STACK"), 1);

    let frames = target.stack_frames().unwrap();
    assert_eq!(
        frames[0].key(),
        &FrameKey::Position {
            name: "b".to_string(),
            index: 0
        }
    );
    assert_eq!(frames[0].file(), None);
    assert_eq!(frames[0].display_name(), "b");
}

#[test]
#[serial]
fn test_stack_frames_identity() {
    let debugee = FakeDebugee::start();
    debugee.respond("STACK", "10::a$$$20::b");
    let registry = Arc::new(BreakpointRegistry::new());
    let (target, rx) = running_session(&debugee, &registry);

    suspend(&debugee, &rx);
    let first = target.stack_frames().unwrap();

    resume(&debugee, &rx);
    debugee.respond("STACK", "11::a$$$25::b");
    suspend(&debugee, &rx);
    let second = target.stack_frames().unwrap();

    assert_eq!(debugee.count_requests("STACK"), 2);
    assert_eq!(second.len(), 2);
    assert!(Arc::ptr_eq(&first[0], &second[0]));
    assert!(Arc::ptr_eq(&first[1], &second[1]));
    // reused frames see the new positions
    assert_eq!(first[0].line_number(), 25);
    assert_eq!(first[1].line_number(), 11);

    // deeper stack: frame `b` moved, so it is a new frame
    resume(&debugee, &rx);
    debugee.respond("STACK", "11::a$$$25::b$$$3::c");
    suspend(&debugee, &rx);
    let third = target.stack_frames().unwrap();
    assert_eq!(third.len(), 3);
    assert_eq!(third[0].name(), "c");
    assert!(!Arc::ptr_eq(&third[1], &second[0]));
}

#[test]
#[serial]
fn test_structured_stack() {
    let debugee = FakeDebugee::start();
    debugee.respond(
        "STACK",
        "file:/home/user/style.xsl|1|5|root|G&doc&1$$$file:/home/user/style.xsl|2|17|item|G&doc&1|L&count&3",
    );
    debugee.respond("VARIABLE 1", "G&doc");
    debugee.respond("VARIABLE 3", "L&count");
    let registry = Arc::new(BreakpointRegistry::new());
    let (target, rx) = running_session(&debugee, &registry);

    suspend(&debugee, &rx);
    let frames = target.stack_frames().unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].name(), "item");
    assert_eq!(frames[0].line_number(), 17);
    assert_eq!(frames[0].file(), Some("file:/home/user/style.xsl"));
    assert_eq!(frames[0].display_name(), "style.xsl item");
    assert_eq!(frames[0].variables(), vec![VariableId(1), VariableId(3)]);
    assert_eq!(frames[1].name(), "root");
    assert_eq!(frames[1].variables(), vec![VariableId(1)]);

    let count = target.variable(VariableId(3)).unwrap();
    assert_eq!(count.name, "count");
    assert_eq!(count.scope, Scope::Local);
    let doc = target.variable(VariableId(1)).unwrap();
    assert_eq!(doc.scope, Scope::Global);
}

#[test]
#[serial]
fn test_variable_metadata_cached() {
    let debugee = FakeDebugee::start();
    debugee.respond("VARIABLE 3", "L&count");
    let registry = Arc::new(BreakpointRegistry::new());
    let (target, rx) = running_session(&debugee, &registry);
    suspend(&debugee, &rx);

    let first = target.variable(VariableId(3)).unwrap();
    resume(&debugee, &rx);
    suspend(&debugee, &rx);
    let second = target.variable(VariableId(3)).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(debugee.count_requests("VARIABLE 3"), 1);
}

#[test]
#[serial]
fn test_malformed_variable() {
    let debugee = FakeDebugee::start();
    debugee.respond("VARIABLE 4", "nameless");
    let registry = Arc::new(BreakpointRegistry::new());
    let (target, rx) = running_session(&debugee, &registry);
    suspend(&debugee, &rx);

    let err = target.variable(VariableId(4)).unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { .. }));
    assert!(!err.is_fatal());
    assert!(!target.is_terminated());
}

#[test]
#[serial]
fn test_variable_values() {
    let debugee = FakeDebugee::start();
    debugee.respond("VARIABLE 3", "L&count");
    debugee.respond("VALUE 3", "number&42");
    let registry = Arc::new(BreakpointRegistry::new());
    let (target, rx) = running_session(&debugee, &registry);

    let count = target.variable(VariableId(3)).unwrap();

    // running debugee has no values
    let value = target.variable_value(&count).unwrap();
    assert!(value.is_placeholder());
    assert_eq!(debugee.count_requests("VALUE 3"), 0);

    suspend(&debugee, &rx);
    let first = target.variable_value(&count).unwrap();
    assert!(!first.is_placeholder());
    assert_eq!(first.type_tag, "number");
    assert_eq!(first.text, "42");
    let again = target.variable_value(&count).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(debugee.count_requests("VALUE 3"), 1);

    // every suspension is a new suspend point
    resume(&debugee, &rx);
    assert!(target.variable_value(&count).unwrap().is_placeholder());
    debugee.respond("VALUE 3", "string&a & b");
    suspend(&debugee, &rx);
    let second = target.variable_value(&count).unwrap();
    assert_eq!(second.text, "a & b");
    assert_eq!(debugee.count_requests("VALUE 3"), 2);
}

#[test]
#[serial]
fn test_malformed_stack() {
    let debugee = FakeDebugee::start();
    debugee.respond("STACK", "10::a$$$garbage");
    let registry = Arc::new(BreakpointRegistry::new());
    let (target, rx) = running_session(&debugee, &registry);
    suspend(&debugee, &rx);

    let err = target.stack_frames().unwrap_err();
    assert!(matches!(err, Error::MalformedFrame(_)));
    assert!(!err.is_fatal());
    assert!(target.is_suspended());

    // failed fetch keeps the stack stale
    debugee.respond("STACK", "10::a");
    let frames = target.stack_frames().unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].name(), "a");
    assert_eq!(debugee.count_requests("STACK"), 2);
}

#[test]
#[serial]
fn test_no_stack_after_termination() {
    let debugee = FakeDebugee::start();
    debugee.respond("STACK", "10::a$$$20::b");
    let registry = Arc::new(BreakpointRegistry::new());
    let (target, rx) = running_session(&debugee, &registry);

    suspend(&debugee, &rx);
    assert_eq!(target.stack_frames().unwrap().len(), 2);

    // the stack was fetched at the last suspension, still no frames after termination
    debugee.emit("terminated");
    wait_event(&rx, SessionEvent::Terminated);
    assert!(matches!(target.stack_frames(), Err(Error::NotConnected)));
    assert_eq!(debugee.count_requests("STACK"), 1);
}
