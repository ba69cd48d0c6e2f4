use crate::debugger::DebugTarget;
use crate::ui::command;

pub struct Handler<'a> {
    target: &'a DebugTarget,
}

impl<'a> Handler<'a> {
    pub fn new(target: &'a DebugTarget) -> Self {
        Self { target }
    }

    /// Resume debugee execution.
    pub fn handle(&self) -> command::CommandResult<()> {
        self.target.resume()?;
        Ok(())
    }
}
