//! An interface to a debug target.
//! This is the most preferred way to use a debug session from UI layer.
//!
//! Contains commands and corresponding command handlers. Command is a some sort of request to
//! debug target that define an action and a list of input arguments. Command handler validate
//! command, define what exactly debug target must to do and return result of it.

pub mod backtrace;
pub mod r#break;
pub mod r#continue;
pub mod frame;
pub mod parser;
pub mod step_into;
pub mod step_out;
pub mod step_over;
pub mod suspend;
pub mod variables;

use crate::debugger::protocol::VariableId;
use crate::debugger::Error;

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("malformed command: {0}")]
    Parsing(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Handle(#[from] Error),
}

pub type CommandResult<T> = Result<T, CommandError>;

/// External commands that can be processed by the debug target.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Continue,
    Suspend,
    StepOver,
    StepInto,
    StepOut,
    Breakpoint(r#break::Command),
    PrintBacktrace,
    Frame(u32),
    PrintVariable(VariableId),
    Status,
    SkipInput,
    Help(Option<String>),
}
