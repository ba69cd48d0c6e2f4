use crate::weak_error;
use crossterm::style::{Color, Stylize};
use itertools::Itertools;
use rustyline::history::History;
use rustyline::{Editor, ExternalPrinter as RLExternalPrinter, Helper};
use std::cell::RefCell;
use std::fmt::{Display, Formatter};

enum Sink {
    Stdout,
    /// Prints above the prompt while the editor waits for input.
    Editor(RefCell<Box<dyn RLExternalPrinter>>),
}

/// Console output usable from both the readline thread and session hooks.
pub struct ExternalPrinter {
    sink: Sink,
}

// the editor printer is used by a single thread at a time, hooks wrap it in a mutex
unsafe impl Send for ExternalPrinter {}

impl ExternalPrinter {
    /// Printer bound to the editor. With the `int_test` feature output goes
    /// straight to stdout, see https://github.com/kkawakam/rustyline/issues/703.
    pub fn new<H: Helper, I: History>(editor: &mut Editor<H, I>) -> rustyline::Result<Self> {
        if cfg!(feature = "int_test") {
            return Ok(Self::stdout());
        }
        let printer = editor.create_external_printer()?;
        Ok(Self {
            sink: Sink::Editor(RefCell::new(Box::new(printer))),
        })
    }

    pub fn stdout() -> Self {
        Self { sink: Sink::Stdout }
    }

    pub fn print(&self, msg: impl Display) {
        match &self.sink {
            Sink::Stdout => println!("{msg}"),
            Sink::Editor(printer) => {
                weak_error!(printer.borrow_mut().print(msg.to_string()), "console print:");
            }
        }
    }

    /// Print lines as a single message, so that hook output can't get between them.
    pub fn print_lines<T: Display>(&self, lines: impl IntoIterator<Item = T>) {
        let text = lines.into_iter().join("\n");
        if !text.is_empty() {
            self.print(text);
        }
    }
}

/// Kinds of highlighted console output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Style {
    FilePath,
    TemplateName,
    Keyword,
    Value,
    Error,
}

impl Style {
    fn color(self) -> Color {
        match self {
            Style::FilePath => Color::Green,
            Style::TemplateName => Color::Yellow,
            Style::Keyword => Color::Magenta,
            Style::Value => Color::Cyan,
            Style::Error => Color::Red,
        }
    }

    pub fn of<T: Display>(self, value: T) -> Styled<T> {
        Styled { style: self, value }
    }
}

/// Value displayed with a [`Style`]. Plain text with the `int_test` feature.
pub struct Styled<T> {
    style: Style,
    value: T,
}

impl<T: Display> Display for Styled<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if cfg!(feature = "int_test") {
            self.value.fmt(f)
        } else {
            let text = self.value.to_string();
            write!(f, "{}", text.with(self.style.color()))
        }
    }
}
