use crate::debugger::{DebugTarget, StackFrame};
use crate::ui::command;
use std::sync::Arc;

pub struct Handler<'a> {
    target: &'a DebugTarget,
}

impl<'a> Handler<'a> {
    pub fn new(target: &'a DebugTarget) -> Self {
        Self { target }
    }

    pub fn handle(&self) -> command::CommandResult<Vec<Arc<StackFrame>>> {
        Ok(self.target.stack_frames()?)
    }
}
