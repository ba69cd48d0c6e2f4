use crate::debugger::{Breakpoint, BreakpointRegistry};
use crate::ui::command::{CommandError, CommandResult};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum BreakpointIdentity {
    Line(PathBuf, u32),
    Number(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add(BreakpointIdentity),
    Remove(BreakpointIdentity),
    Enable(BreakpointIdentity),
    Disable(BreakpointIdentity),
    Info,
}

/// Breakpoint with its ordinal number in the registry.
pub struct BreakpointView {
    pub number: u32,
    pub breakpoint: Arc<Breakpoint>,
}

pub enum ExecutionResult {
    New(BreakpointView),
    Removed(BreakpointView),
    Changed(BreakpointView),
    Dump(Vec<BreakpointView>),
}

pub struct Handler<'a> {
    registry: &'a BreakpointRegistry,
}

impl<'a> Handler<'a> {
    pub fn new(registry: &'a BreakpointRegistry) -> Self {
        Self { registry }
    }

    pub fn handle(&self, cmd: &Command) -> CommandResult<ExecutionResult> {
        let result = match cmd {
            Command::Add(BreakpointIdentity::Line(file, line)) => {
                let file = absolute(file)?;
                if let Some(existed) = self.find(&BreakpointIdentity::Line(file.clone(), *line)) {
                    return Err(CommandError::InvalidArgument(format!(
                        "breakpoint {} already set at this line",
                        existed.number
                    )));
                }
                self.registry.add(Breakpoint::line(file, *line));
                let view = self
                    .snapshot()
                    .pop()
                    .ok_or_else(|| CommandError::InvalidArgument("breakpoint lost".into()))?;
                ExecutionResult::New(view)
            }
            Command::Add(BreakpointIdentity::Number(_)) => {
                return Err(CommandError::InvalidArgument(
                    "breakpoint location must be in <file>:<line> form".into(),
                ))
            }
            Command::Remove(identity) => {
                let view = self.find_or_err(identity)?;
                self.registry.remove(view.breakpoint.id());
                ExecutionResult::Removed(view)
            }
            Command::Enable(identity) => {
                let view = self.find_or_err(identity)?;
                self.registry.set_enabled(view.breakpoint.id(), true);
                ExecutionResult::Changed(view)
            }
            Command::Disable(identity) => {
                let view = self.find_or_err(identity)?;
                self.registry.set_enabled(view.breakpoint.id(), false);
                ExecutionResult::Changed(view)
            }
            Command::Info => ExecutionResult::Dump(self.snapshot()),
        };
        Ok(result)
    }

    fn snapshot(&self) -> Vec<BreakpointView> {
        self.registry
            .all()
            .into_iter()
            .zip(1..)
            .map(|(breakpoint, number)| BreakpointView { number, breakpoint })
            .collect()
    }

    fn find(&self, identity: &BreakpointIdentity) -> Option<BreakpointView> {
        self.snapshot().into_iter().find(|view| match identity {
            BreakpointIdentity::Line(file, line) => absolute(file)
                .map(|file| view.breakpoint.is_placed_at(&file, *line))
                .unwrap_or(false),
            BreakpointIdentity::Number(number) => view.number == *number,
        })
    }

    fn find_or_err(&self, identity: &BreakpointIdentity) -> CommandResult<BreakpointView> {
        self.find(identity)
            .ok_or_else(|| CommandError::InvalidArgument("breakpoint not found".into()))
    }
}

/// Breakpoint resources are stored as absolute paths, they are sent to the debugee as file urls.
fn absolute(file: &std::path::Path) -> CommandResult<PathBuf> {
    if file.is_absolute() {
        return Ok(file.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    Ok(cwd.join(file))
}
