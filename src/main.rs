use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use xsltdbg::debugger::{
    AttachedProcess, BreakpointRegistry, ChildProcess, DebugeeProcess, SessionConfig,
};
use xsltdbg::ui::command::parser::BREAK_COMMAND;
use xsltdbg::ui::command::{r#break, Command};
use xsltdbg::ui::console::AppBuilder;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file [default: ~/.config/xsltdbg/config.toml]
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Host where the debugee listens
    #[clap(long)]
    host: Option<String>,

    /// Port of the debugee request channel
    #[clap(long)]
    request_port: Option<u16>,

    /// Port of the debugee event channel
    #[clap(long)]
    event_port: Option<u16>,

    /// Response timeout in milliseconds, 0 means wait forever
    #[clap(long)]
    response_timeout: Option<u64>,

    /// Set breakpoint before the transformation starts (<file>:<line>, maybe more than one)
    #[clap(short, long = "break")]
    breakpoints: Vec<String>,

    /// Write logs into a file instead of stderr
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// Transform processor command, started in debug mode. Attach to an already running
    /// debugee if empty.
    #[arg(last = true)]
    debugee: Vec<String>,
}

impl Args {
    fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let mut config = SessionConfig::from_file(self.config.as_deref())?;
        if let Some(ref host) = self.host {
            config.host = host.clone();
        }
        if self.request_port.is_some() {
            config.request_port = self.request_port;
        }
        if self.event_port.is_some() {
            config.event_port = self.event_port;
        }
        if let Some(timeout) = self.response_timeout {
            config.response_timeout_ms = timeout;
        }
        Ok(config)
    }
}

fn init_logger(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn add_breakpoint(registry: &BreakpointRegistry, location: &str) -> anyhow::Result<()> {
    let cmd = match Command::parse(&format!("{BREAK_COMMAND} {location}"))? {
        Command::Breakpoint(cmd @ r#break::Command::Add(_)) => cmd,
        _ => bail!("invalid breakpoint location `{location}`, expected <file>:<line>"),
    };
    r#break::Handler::new(registry).handle(&cmd)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(args.log_file.as_ref())?;

    let config = args.session_config()?;
    let breakpoints = Arc::new(BreakpointRegistry::new());
    for location in &args.breakpoints {
        add_breakpoint(&breakpoints, location)?;
    }

    let process: Arc<dyn DebugeeProcess> = match args.debugee.split_first() {
        Some((program, program_args)) => {
            let child = ChildProcess::spawn(program, program_args)
                .with_context(|| format!("start debugee `{program}`"))?;
            info!(target: "debugger", "debugee started, pid: {}", child.pid());
            Arc::new(child)
        }
        None => Arc::new(AttachedProcess::new()),
    };

    let app = AppBuilder::new(config, breakpoints).build(process)?;
    app.run()
}
