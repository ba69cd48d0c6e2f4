use crate::debugger::{
    BreakpointRegistry, DebugTarget, DebugeeProcess, SessionConfig, Value, Variable,
};
use crate::ui::command::r#break::{BreakpointView, ExecutionResult};
use crate::ui::command::{
    backtrace, frame, r#break, r#continue, step_into, step_out, step_over, suspend, variables,
    Command, CommandError,
};
use crate::ui::console::editor::{create_editor, RLHelper};
use crate::ui::console::help::help_for_command;
use crate::ui::console::hook::TerminalHook;
use crate::ui::console::print::{ExternalPrinter, Style};
use crate::{muted_error, weak_error};
use crossterm::style::Stylize;
use itertools::Itertools;
use rustyline::error::ReadlineError;
use rustyline::history::MemHistory;
use rustyline::Editor;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::{mpsc, Arc};
use std::thread;

mod editor;
mod help;
pub mod hook;
pub mod print;

const WELCOME_TEXT: &str = r#"
xsltdbg greets, type `help` for list of commands
"#;
const PROMT: &str = "(xsltdbg) ";

type DbgEditor = Editor<RLHelper, MemHistory>;

pub struct AppBuilder {
    config: SessionConfig,
    breakpoints: Arc<BreakpointRegistry>,
}

impl AppBuilder {
    pub fn new(config: SessionConfig, breakpoints: Arc<BreakpointRegistry>) -> Self {
        Self {
            config,
            breakpoints,
        }
    }

    /// Connect to the debugee and prepare console application.
    pub fn build(self, process: Arc<dyn DebugeeProcess>) -> anyhow::Result<TerminalApplication> {
        let (control_tx, control_rx) = mpsc::sync_channel::<Control>(0);
        let mut editor = create_editor(PROMT)?;

        if let Some(h) = editor.helper_mut() {
            h.completer
                .replace_file_hints(stylesheet_files(&self.breakpoints));
        }

        let hook = TerminalHook::new(ExternalPrinter::new(&mut editor)?);
        let target = DebugTarget::connect(
            &self.config,
            process,
            self.breakpoints.clone(),
            Arc::new(hook),
        )?;

        Ok(TerminalApplication {
            printer: ExternalPrinter::new(&mut editor)?,
            target,
            breakpoints: self.breakpoints,
            editor,
            control_tx,
            control_rx,
        })
    }
}

/// Stylesheets from the current directory and from registered breakpoints.
fn stylesheet_files(breakpoints: &BreakpointRegistry) -> Vec<PathBuf> {
    let in_cwd = std::fs::read_dir(".")
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("xsl" | "xslt")
            )
        });
    let in_breakpoints = breakpoints
        .all()
        .into_iter()
        .filter_map(|bp| bp.marker().map(|m| m.resource));

    in_cwd.chain(in_breakpoints).collect()
}

enum Control {
    /// New command from user received
    Cmd(String),
    /// Terminate application
    Terminate,
}

pub struct TerminalApplication {
    target: DebugTarget,
    breakpoints: Arc<BreakpointRegistry>,
    printer: ExternalPrinter,
    editor: DbgEditor,
    control_tx: SyncSender<Control>,
    control_rx: Receiver<Control>,
}

impl TerminalApplication {
    pub fn run(self) -> anyhow::Result<()> {
        let mut editor = self.editor;
        {
            let control_tx = self.control_tx.clone();
            thread::spawn(move || {
                println!("{WELCOME_TEXT}");

                loop {
                    let line = editor.readline(PROMT);
                    match line {
                        Ok(input) => {
                            if input == "q" || input == "quit" {
                                _ = control_tx.send(Control::Terminate);
                                break;
                            } else {
                                muted_error!(editor.add_history_entry(&input), "history:");
                                _ = control_tx.send(Control::Cmd(input));
                            }
                        }
                        Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                            _ = control_tx.send(Control::Terminate);
                            break;
                        }
                        Err(err) => {
                            println!("error: {:#}", err);
                            _ = control_tx.send(Control::Terminate);
                            break;
                        }
                    }
                }
            });
        }

        let app_loop = AppLoop {
            target: self.target,
            breakpoints: self.breakpoints,
            printer: self.printer,
            control_rx: self.control_rx,
        };
        app_loop.run();

        Ok(())
    }
}

struct AppLoop {
    target: DebugTarget,
    breakpoints: Arc<BreakpointRegistry>,
    printer: ExternalPrinter,
    control_rx: Receiver<Control>,
}

impl AppLoop {
    fn print_breakpoint(&self, action: &str, view: &BreakpointView) {
        let bp = &view.breakpoint;
        let place = match bp.marker() {
            Some(marker) => format!(
                "{}:{}",
                Style::FilePath.of(marker.resource.display()),
                marker.line
            ),
            None => "deleted location".to_string(),
        };
        let state = if bp.is_enabled() { "" } else { " (disabled)" };
        self.printer
            .print(format!("{action} {} at {place}{state}", view.number));
    }

    fn print_variables(&self, vars: &[(Arc<Variable>, Arc<Value>)]) {
        for (var, value) in vars {
            let value = if value.is_placeholder() {
                Style::Value.of("<not available>").to_string()
            } else {
                format!("({}) {}", value.type_tag, Style::Value.of(value.as_ref()))
            };
            self.printer.print(format!(
                "{} {} {} = {value}",
                var.id,
                var.scope,
                Style::Keyword.of(&var.name),
            ));
        }
    }

    fn handle_command(&mut self, cmd: &str) -> Result<(), CommandError> {
        match Command::parse(cmd)? {
            Command::Continue => r#continue::Handler::new(&self.target).handle()?,
            Command::Suspend => suspend::Handler::new(&self.target).handle()?,
            Command::StepInto => step_into::Handler::new(&self.target).handle()?,
            Command::StepOut => step_out::Handler::new(&self.target).handle()?,
            Command::StepOver => step_over::Handler::new(&self.target).handle()?,
            Command::Breakpoint(cmd) => {
                match r#break::Handler::new(&self.breakpoints).handle(&cmd)? {
                    ExecutionResult::New(view) => self.print_breakpoint("New breakpoint", &view),
                    ExecutionResult::Removed(view) => {
                        self.print_breakpoint("Remove breakpoint", &view)
                    }
                    ExecutionResult::Changed(view) => self.print_breakpoint("Breakpoint", &view),
                    ExecutionResult::Dump(views) => views
                        .iter()
                        .for_each(|view| self.print_breakpoint("- Breakpoint", view)),
                }
            }
            Command::PrintBacktrace => {
                let frames = backtrace::Handler::new(&self.target).handle()?;
                if frames.is_empty() {
                    self.printer.print("no stack frames");
                }
                self.printer.print_lines(frames.iter().map(|frame| {
                    format!(
                        "#{} {}:{}",
                        frame.index(),
                        Style::TemplateName.of(frame.display_name()),
                        frame.line_number()
                    )
                }));
            }
            Command::Frame(num) => {
                let info = frame::Handler::new(&self.target).handle(num)?;
                let file = info
                    .frame
                    .file()
                    .map(|file| format!(" ({})", Style::FilePath.of(file)))
                    .unwrap_or_default();
                self.printer.print(format!(
                    "frame #{} {}{file}",
                    info.frame.index(),
                    Style::TemplateName.of(info.frame.name()),
                ));
                self.print_variables(&info.variables);
            }
            Command::PrintVariable(id) => {
                let var = variables::Handler::new(&self.target).handle(id)?;
                self.print_variables(&[var]);
            }
            Command::Status => {
                self.printer.print(format!(
                    "{}: {}",
                    Style::Keyword.of(self.target.name()),
                    self.target.status()
                ));
                if let Some(thread) = self.target.thread() {
                    if thread.is_stepping() {
                        self.printer.print("stepping");
                    }
                    let hit = thread
                        .breakpoints()
                        .iter()
                        .filter_map(|bp| bp.line_number())
                        .join(", ");
                    if !hit.is_empty() {
                        self.printer.print(format!("suspended at breakpoint line {hit}"));
                    }
                }
            }
            Command::Help(command) => {
                self.printer.print(help_for_command(command.as_deref()));
            }
            Command::SkipInput => {}
        }

        Ok(())
    }

    fn run(mut self) {
        loop {
            let Ok(action) = self.control_rx.recv() else {
                break;
            };

            match action {
                Control::Cmd(command) => {
                    if let Err(e) = self.handle_command(&command) {
                        match e {
                            CommandError::Parsing(_) | CommandError::InvalidArgument(_) => {
                                self.printer.print(Style::Error.of(e));
                            }
                            CommandError::Handle(ref err) if err.is_fatal() => {
                                self.printer
                                    .print(Style::Error.of(format!("fatal debugger error: {e:#}")));
                                self.printer.print("debug session is over".bold());
                                break;
                            }
                            CommandError::Handle(_) => {
                                self.printer
                                    .print(Style::Error.of(format!("debugger error: {e:#}")));
                            }
                        }
                    }
                }
                Control::Terminate => {
                    break;
                }
            }
        }

        if !self.target.is_terminated() {
            weak_error!(self.target.terminate(), "terminate debugee:");
        }
    }
}
