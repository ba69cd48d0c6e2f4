use crate::debugger::{DebugTarget, StackFrame, Value, Variable};
use crate::ui::command::{CommandError, CommandResult};
use std::sync::Arc;

pub struct FrameInfo {
    pub frame: Arc<StackFrame>,
    /// Frame variables with values at the current suspend point.
    pub variables: Vec<(Arc<Variable>, Arc<Value>)>,
}

pub struct Handler<'a> {
    target: &'a DebugTarget,
}

impl<'a> Handler<'a> {
    pub fn new(target: &'a DebugTarget) -> Self {
        Self { target }
    }

    pub fn handle(&self, num: u32) -> CommandResult<FrameInfo> {
        let frame = self
            .target
            .stack_frames()?
            .into_iter()
            .nth(num as usize)
            .ok_or_else(|| CommandError::InvalidArgument(format!("frame #{num} not found")))?;

        let variables = frame
            .variables()
            .into_iter()
            .map(|id| -> CommandResult<_> {
                let var = self.target.variable(id)?;
                let value = self.target.variable_value(&var)?;
                Ok((var, value))
            })
            .collect::<CommandResult<Vec<_>>>()?;

        Ok(FrameInfo { frame, variables })
    }
}
