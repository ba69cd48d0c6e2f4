use crate::debugger::DebugTarget;
use crate::ui::command;

pub struct Handler<'a> {
    target: &'a DebugTarget,
}

impl<'a> Handler<'a> {
    pub fn new(target: &'a DebugTarget) -> Self {
        Self { target }
    }

    /// Run until the current template returns.
    pub fn handle(&self) -> command::CommandResult<()> {
        self.target.step_return()?;
        Ok(())
    }
}
