use crate::debugger::protocol::VariableId;
use crate::debugger::{DebugTarget, Value, Variable};
use crate::ui::command;
use std::sync::Arc;

pub struct Handler<'a> {
    target: &'a DebugTarget,
}

impl<'a> Handler<'a> {
    pub fn new(target: &'a DebugTarget) -> Self {
        Self { target }
    }

    pub fn handle(&self, id: VariableId) -> command::CommandResult<(Arc<Variable>, Arc<Value>)> {
        let var = self.target.variable(id)?;
        let value = self.target.variable_value(&var)?;
        Ok((var, value))
    }
}
