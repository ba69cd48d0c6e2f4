use crate::common::{connect_session, wait_event, FakeDebugee};
use serial_test::serial;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use xsltdbg::debugger::protocol::{SuspendReason, VariableId};
use xsltdbg::debugger::{Breakpoint, BreakpointRegistry, Scope, SessionEvent};

const SLOW: Duration = Duration::from_millis(100);

#[test]
#[serial]
fn test_requests_during_breakpoint_replay() {
    let debugee = FakeDebugee::start();
    let registry = Arc::new(BreakpointRegistry::new());
    for line in 1..=3 {
        registry.add(Breakpoint::line("/tmp/a.xsl", line));
        debugee.delay(&format!("ADD_BREAKPOINT file:///tmp/a.xsl {line}"), SLOW);
    }
    debugee.respond("VARIABLE 1", "G&doc");
    debugee.respond("VARIABLE 2", "L&count");
    debugee.respond("VARIABLE 3", "L&item");
    debugee.respond("STACK", "10::a$$$20::b");
    debugee.delay("STACK", SLOW);
    debugee.respond("VALUE 2", "number&42");
    debugee.delay("ADD_BREAKPOINT file:///tmp/b.xsl 9", SLOW);
    debugee.delay("ADD_BREAKPOINT file:///tmp/b.xsl 10", SLOW);

    let (target, rx) = connect_session(&debugee, &registry);

    // the dispatcher replays breakpoints while other threads fetch variables
    debugee.emit("ready");
    debugee.wait_request("ADD_BREAKPOINT file:///tmp/a.xsl 1");
    let variables = thread::scope(|s| {
        let handles: Vec<_> = (1..=3)
            .map(|id| {
                let target = &target;
                s.spawn(move || target.variable(VariableId(id)).unwrap())
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });
    assert_eq!(variables[0].name, "doc");
    assert_eq!(variables[0].scope, Scope::Global);
    assert_eq!(variables[1].name, "count");
    assert_eq!(variables[2].name, "item");

    wait_event(&rx, SessionEvent::Created);
    debugee.wait_request("START");
    debugee.emit("suspended client");
    wait_event(&rx, SessionEvent::Suspended(SuspendReason::Client));

    // breakpoint changes race with stack and value fetches
    let (frames, value) = thread::scope(|s| {
        let registry = &registry;
        s.spawn(move || {
            registry.add(Breakpoint::line("/tmp/b.xsl", 9));
            registry.add(Breakpoint::line("/tmp/b.xsl", 10));
        });
        let frames = s.spawn(|| target.stack_frames().unwrap());
        let value = s.spawn(|| target.variable_value(&variables[1]).unwrap());
        (frames.join().unwrap(), value.join().unwrap())
    });
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].name(), "b");
    assert_eq!(frames[1].name(), "a");
    assert_eq!(value.type_tag, "number");
    assert_eq!(value.text, "42");
    assert!(!target.is_terminated());

    // every request is sent once and answered before the next one is written
    let requests = debugee.requests();
    for line in [
        "ADD_BREAKPOINT file:///tmp/a.xsl 1",
        "ADD_BREAKPOINT file:///tmp/a.xsl 2",
        "ADD_BREAKPOINT file:///tmp/a.xsl 3",
        "VARIABLE 1",
        "VARIABLE 2",
        "VARIABLE 3",
        "START",
        "STACK",
        "VALUE 2",
        "ADD_BREAKPOINT file:///tmp/b.xsl 9",
        "ADD_BREAKPOINT file:///tmp/b.xsl 10",
    ] {
        assert_eq!(debugee.count_requests(line), 1, "{line} in {requests:?}");
    }
    assert_eq!(requests.len(), 11);
    let position = |line: &str| requests.iter().position(|r| r == line).unwrap();
    assert!(position("START") > position("ADD_BREAKPOINT file:///tmp/a.xsl 3"));
    assert!(
        position("ADD_BREAKPOINT file:///tmp/b.xsl 10")
            > position("ADD_BREAKPOINT file:///tmp/b.xsl 9")
    );
}
