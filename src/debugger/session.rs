//! Debug session state machine.
//!
//! State changes only on debugee events, requests never change the state by themselves.
//! [`SessionState::apply`] returns a list of effects that the debug target must perform
//! after applying an event, in order.

use crate::debugger::breakpoint::Breakpoint;
use crate::debugger::protocol::{Event, ResumeReason, SuspendReason};
use log::{debug, warn};
use std::sync::Arc;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Status {
    Connecting,
    Running,
    Suspended,
    Terminated,
}

/// The single execution thread of a debugee.
#[derive(Debug, Clone, Default)]
pub struct Thread {
    stepping: bool,
    breakpoints: Vec<Arc<Breakpoint>>,
}

impl Thread {
    pub fn is_stepping(&self) -> bool {
        self.stepping
    }

    /// Breakpoints that caused the current suspension.
    pub fn breakpoints(&self) -> &[Arc<Breakpoint>] {
        &self.breakpoints
    }

    fn reset(&mut self) {
        self.stepping = false;
        self.breakpoints.clear();
    }
}

/// Action that must follow a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Notify about session creation.
    NotifyCreated,
    /// Send all registered breakpoints to the debugee.
    InstallBreakpoints,
    /// Send a start request.
    Start,
    /// Mark stack frames stale and drop all cached values.
    InvalidateStack,
    /// Find a breakpoint at line and attach it to the thread.
    ResolveBreakpoint(u32),
    NotifyResumed(ResumeReason),
    NotifySuspended(SuspendReason),
    /// Terminate the debugee process.
    TerminateProcess,
    /// Stop listening for breakpoint changes.
    Unsubscribe,
    NotifyTerminated,
}

#[derive(Debug)]
pub struct SessionState {
    status: Status,
    thread: Option<Thread>,
}

impl SessionState {
    /// State of a freshly connected session.
    pub fn connecting() -> Self {
        Self {
            status: Status::Connecting,
            thread: Some(Thread::default()),
        }
    }

    /// State of a session whose debugee died before connection.
    pub fn terminated() -> Self {
        Self {
            status: Status::Terminated,
            thread: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn thread(&self) -> Option<&Thread> {
        self.thread.as_ref()
    }

    pub fn is_suspended(&self) -> bool {
        self.status == Status::Suspended
    }

    pub fn is_terminated(&self) -> bool {
        self.status == Status::Terminated
    }

    /// Attach a hit breakpoint to the thread.
    pub fn attach_breakpoint(&mut self, breakpoint: Arc<Breakpoint>) {
        if let Some(thread) = self.thread.as_mut() {
            thread.breakpoints = vec![breakpoint];
        }
    }

    /// Apply an event to the session. Events are ignored after termination.
    pub fn apply(&mut self, event: &Event) -> Vec<Effect> {
        if self.is_terminated() {
            debug!(target: "debugger", "session terminated, ignore event {event:?}");
            return vec![];
        }

        if let Some(thread) = self.thread.as_mut() {
            thread.reset();
        }

        match event {
            Event::Ready => {
                if self.status != Status::Connecting {
                    warn!(target: "debugger", "unexpected `ready` event in {} state", self.status);
                    return vec![];
                }
                self.status = Status::Running;
                vec![Effect::NotifyCreated, Effect::InstallBreakpoints, Effect::Start]
            }
            Event::Stopped => vec![Effect::TerminateProcess],
            Event::Terminated => {
                self.status = Status::Terminated;
                self.thread = None;
                vec![Effect::Unsubscribe, Effect::NotifyTerminated]
            }
            Event::Resumed(reason) => {
                if *reason == ResumeReason::Step {
                    if let Some(thread) = self.thread.as_mut() {
                        thread.stepping = true;
                    }
                }
                self.status = Status::Running;
                vec![Effect::NotifyResumed(*reason)]
            }
            Event::Suspended(reason) => {
                self.status = Status::Suspended;
                let mut effects = vec![Effect::InvalidateStack];
                if let SuspendReason::Breakpoint { line: Some(line) } = reason {
                    effects.push(Effect::ResolveBreakpoint(*line));
                }
                effects.push(Effect::NotifySuspended(*reason));
                effects
            }
            Event::Unrecognized(line) => {
                warn!(target: "debugger", "did not understand event: {line:?}");
                vec![]
            }
        }
    }
}
