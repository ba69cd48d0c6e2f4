use crate::debugger::error::Error;
use crate::debugger::protocol::{ResumeReason, SuspendReason};
use std::sync::mpsc;
use std::sync::Mutex;

/// Session lifecycle observer. Hooks are called from the event dispatch thread.
pub trait SessionHook: Send + Sync {
    /// Called once, when debugee reports readiness.
    fn on_created(&self);

    fn on_resumed(&self, reason: ResumeReason);

    /// Called after stack invalidation and breakpoint resolution.
    fn on_suspended(&self, reason: SuspendReason);

    /// Called exactly once per session. `cause` is set when the session ends because
    /// a debugee channel failed, not because the debugee reported termination.
    fn on_terminated(&self, cause: Option<&Error>);
}

/// Session lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Created,
    Resumed(ResumeReason),
    Suspended(SuspendReason),
    Terminated,
    /// Session ended by a channel failure, holds the failure description.
    Aborted(String),
}

/// Hook that forwards notifications into a message channel.
pub struct ChannelHook {
    sender: Mutex<mpsc::Sender<SessionEvent>>,
}

impl ChannelHook {
    pub fn new() -> (Self, mpsc::Receiver<SessionEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender: Mutex::new(sender),
            },
            receiver,
        )
    }

    fn send(&self, event: SessionEvent) {
        // receiver may be gone, notifications are not delivered anymore in this case
        _ = self.sender.lock().unwrap().send(event);
    }
}

impl SessionHook for ChannelHook {
    fn on_created(&self) {
        self.send(SessionEvent::Created)
    }

    fn on_resumed(&self, reason: ResumeReason) {
        self.send(SessionEvent::Resumed(reason))
    }

    fn on_suspended(&self, reason: SuspendReason) {
        self.send(SessionEvent::Suspended(reason))
    }

    fn on_terminated(&self, cause: Option<&Error>) {
        match cause {
            None => self.send(SessionEvent::Terminated),
            Some(e) => self.send(SessionEvent::Aborted(e.to_string())),
        }
    }
}

/// Hook that ignores all notifications.
pub struct NopHook;

impl SessionHook for NopHook {
    fn on_created(&self) {}
    fn on_resumed(&self, _: ResumeReason) {}
    fn on_suspended(&self, _: SuspendReason) {}
    fn on_terminated(&self, _: Option<&Error>) {}
}
