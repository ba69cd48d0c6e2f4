use crate::debugger::protocol::{ResumeReason, SuspendReason};
use crate::debugger::{Error, SessionHook};
use crate::ui::console::print::{ExternalPrinter, Style};
use std::sync::Mutex;

/// Print session notifications into the console.
pub struct TerminalHook {
    printer: Mutex<ExternalPrinter>,
}

impl TerminalHook {
    pub fn new(printer: ExternalPrinter) -> Self {
        Self {
            printer: Mutex::new(printer),
        }
    }

    fn print(&self, msg: impl std::fmt::Display) {
        self.printer.lock().unwrap().print(msg)
    }
}

impl SessionHook for TerminalHook {
    fn on_created(&self) {
        self.print("Debugee is ready, start transformation");
    }

    fn on_resumed(&self, reason: ResumeReason) {
        // step resumes are followed by a suspension almost immediately
        if reason != ResumeReason::Step {
            self.print("Running");
        }
    }

    fn on_suspended(&self, reason: SuspendReason) {
        let msg = match reason {
            SuspendReason::Breakpoint { line: Some(line) } => {
                format!("Hit breakpoint at line {}", Style::Keyword.of(line))
            }
            SuspendReason::Breakpoint { line: None } => "Hit breakpoint".to_string(),
            SuspendReason::Step => "Step done".to_string(),
            SuspendReason::Client => "Suspended".to_string(),
            SuspendReason::Unspecified => "Suspended".to_string(),
        };
        self.print(msg);
    }

    fn on_terminated(&self, cause: Option<&Error>) {
        if let Some(cause) = cause {
            self.print(Style::Error.of(format!("debugee connection lost: {cause:#}")));
        }
        self.print("Debug session terminated, type `q` to exit");
    }
}
