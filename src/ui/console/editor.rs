use crate::ui::command::parser::{
    BACKTRACE_COMMAND, BACKTRACE_COMMAND_SHORT, BREAK_COMMAND, BREAK_COMMAND_SHORT,
    BREAK_DISABLE_SUBCOMMAND, BREAK_ENABLE_SUBCOMMAND, BREAK_INFO_SUBCOMMAND,
    BREAK_REMOVE_SUBCOMMAND, CONTINUE_COMMAND, CONTINUE_COMMAND_SHORT, FRAME_COMMAND,
    FRAME_COMMAND_SHORT, HELP_COMMAND, HELP_COMMAND_SHORT, STATUS_COMMAND, STEP_INTO_COMMAND,
    STEP_INTO_COMMAND_SHORT, STEP_OUT_COMMAND, STEP_OUT_COMMAND_SHORT, STEP_OVER_COMMAND,
    STEP_OVER_COMMAND_SHORT, SUSPEND_COMMAND, VAR_COMMAND,
};
use chumsky::prelude::{any, choice, end, just};
use chumsky::text::whitespace;
use chumsky::Parser;
use crossterm::style::{Color, Stylize};
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::HistoryHinter;
use rustyline::history::MemHistory;
use rustyline::{CompletionType, Config, Context, Editor};
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::path::PathBuf;
use trie_rs::{Trie, TrieBuilder};

/// Console commands as (name, alias) pairs.
const COMMANDS: &[(&str, Option<&str>)] = &[
    (CONTINUE_COMMAND, Some(CONTINUE_COMMAND_SHORT)),
    (SUSPEND_COMMAND, None),
    (STEP_INTO_COMMAND, Some(STEP_INTO_COMMAND_SHORT)),
    (STEP_OUT_COMMAND, Some(STEP_OUT_COMMAND_SHORT)),
    (STEP_OVER_COMMAND, Some(STEP_OVER_COMMAND_SHORT)),
    (BREAK_COMMAND, Some(BREAK_COMMAND_SHORT)),
    (BACKTRACE_COMMAND, Some(BACKTRACE_COMMAND_SHORT)),
    (FRAME_COMMAND, Some(FRAME_COMMAND_SHORT)),
    (VAR_COMMAND, None),
    (STATUS_COMMAND, None),
    (HELP_COMMAND, Some(HELP_COMMAND_SHORT)),
    ("quit", Some("q")),
];

const BREAK_SUBCOMMANDS: &[&str] = &[
    BREAK_REMOVE_SUBCOMMAND,
    BREAK_ENABLE_SUBCOMMAND,
    BREAK_DISABLE_SUBCOMMAND,
    BREAK_INFO_SUBCOMMAND,
];

/// Set of words searchable by prefix.
struct Words {
    trie: Trie<u8>,
    all: Vec<String>,
}

impl Words {
    fn new<S: AsRef<str>>(words: impl IntoIterator<Item = S>) -> Self {
        let mut all: Vec<String> = words.into_iter().map(|w| w.as_ref().to_string()).collect();
        all.sort_unstable();
        all.dedup();

        let mut builder = TrieBuilder::new();
        all.iter().for_each(|word| builder.push(word));
        Self {
            trie: builder.build(),
            all,
        }
    }

    fn with_prefix(&self, prefix: &str) -> Vec<String> {
        if prefix.is_empty() {
            return self.all.clone();
        }
        let mut found: Vec<String> = self
            .trie
            .predictive_search(prefix)
            .into_iter()
            .filter_map(|word| String::from_utf8(word).ok())
            .collect();
        found.sort_unstable();
        found
    }
}

/// Position of the cursor in terms of what may be completed there.
#[derive(Debug, PartialEq)]
enum Completion<'a> {
    /// First word of the line.
    Command(&'a str),
    /// Argument of `break`, optionally after a subcommand.
    Breakpoint {
        subcommand: Option<&'a str>,
        arg: &'a str,
    },
    /// Argument of `help`.
    HelpTopic(&'a str),
}

impl<'a> Completion<'a> {
    fn parser() -> impl Parser<'a, &'a str, Completion<'a>> {
        let word = any()
            .filter(|c: &char| !c.is_whitespace())
            .repeated()
            .to_slice()
            .then_ignore(end());
        let sep = whitespace().at_least(1);

        let brkpt_subcommand = choice((
            just(BREAK_REMOVE_SUBCOMMAND),
            just(BREAK_ENABLE_SUBCOMMAND),
            just(BREAK_DISABLE_SUBCOMMAND),
        ))
        .then_ignore(sep.clone());
        let brkpt = choice((just(BREAK_COMMAND), just(BREAK_COMMAND_SHORT)))
            .then_ignore(sep.clone())
            .ignore_then(brkpt_subcommand.or_not())
            .then(word.clone())
            .map(|(subcommand, arg)| Completion::Breakpoint { subcommand, arg });

        let help = choice((just(HELP_COMMAND), just(HELP_COMMAND_SHORT)))
            .then_ignore(sep)
            .ignore_then(word.clone())
            .map(Completion::HelpTopic);

        whitespace().ignore_then(choice((brkpt, help, word.map(Completion::Command))))
    }

    fn recognize(line: &'a str) -> Option<Self> {
        Self::parser().parse(line).into_result().ok()
    }
}

pub struct CommandCompleter {
    commands: Words,
    break_subcommands: Words,
    stylesheets: Words,
}

impl CommandCompleter {
    fn new() -> Self {
        Self {
            commands: Words::new(COMMANDS.iter().map(|(name, _)| name)),
            break_subcommands: Words::new(BREAK_SUBCOMMANDS),
            stylesheets: Words::new(Vec::<String>::new()),
        }
    }

    /// Replace stylesheet file names used for breakpoint location completion.
    pub fn replace_file_hints(&mut self, files: impl IntoIterator<Item = PathBuf>) {
        self.stylesheets = Words::new(
            files
                .into_iter()
                .filter_map(|path| path.file_name()?.to_str().map(ToOwned::to_owned)),
        );
    }

    fn command_pair(name: String) -> Pair {
        let alias = COMMANDS
            .iter()
            .find_map(|(cmd, alias)| (*cmd == name).then_some(*alias).flatten());
        Pair {
            display: match alias {
                Some(alias) => format!("{name} ({})", alias.bold()),
                None => name.clone(),
            },
            replacement: name,
        }
    }

    fn stylesheet_pairs(&self, prefix: &str) -> Vec<Pair> {
        self.stylesheets
            .with_prefix(prefix)
            .into_iter()
            .map(|file| Pair {
                replacement: format!("{file}:"),
                display: file,
            })
            .collect()
    }

    /// Completion candidates for the text before the cursor and the position they start at.
    fn candidates(&self, line: &str) -> (usize, Vec<Pair>) {
        let start_of = |word: &str| line.len() - word.len();

        match Completion::recognize(line) {
            Some(Completion::Command(prefix)) => (
                start_of(prefix),
                self.commands
                    .with_prefix(prefix)
                    .into_iter()
                    .map(Self::command_pair)
                    .collect(),
            ),
            // location already has a line part
            Some(Completion::Breakpoint { arg, .. }) if arg.contains(':') => (0, vec![]),
            Some(Completion::Breakpoint {
                subcommand: Some(_),
                arg,
            }) => (start_of(arg), self.stylesheet_pairs(arg)),
            Some(Completion::Breakpoint {
                subcommand: None,
                arg,
            }) => {
                let subcommands = self
                    .break_subcommands
                    .with_prefix(arg)
                    .into_iter()
                    .map(|subcmd| Pair {
                        display: subcmd.clone(),
                        replacement: subcmd,
                    });
                let pairs = if arg.is_empty() {
                    subcommands.collect()
                } else {
                    subcommands.chain(self.stylesheet_pairs(arg)).collect()
                };
                (start_of(arg), pairs)
            }
            Some(Completion::HelpTopic(prefix)) => (
                start_of(prefix),
                self.commands
                    .with_prefix(prefix)
                    .into_iter()
                    .map(Self::command_pair)
                    .collect(),
            ),
            None => (0, vec![]),
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let before_cursor = line.get(..pos).unwrap_or(line);
        Ok(self.candidates(before_cursor))
    }
}

#[derive(Helper, Completer, Hinter, Validator)]
pub struct RLHelper {
    #[rustyline(Completer)]
    pub completer: CommandCompleter,
    #[rustyline(Hinter)]
    hinter: HistoryHinter,
    colored_prompt: String,
}

impl Highlighter for RLHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        default: bool,
    ) -> Cow<'b, str> {
        if default {
            Cow::Borrowed(&self.colored_prompt)
        } else {
            Cow::Borrowed(prompt)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.with(Color::Grey).to_string())
    }
}

pub fn create_editor(prompt: &str) -> anyhow::Result<Editor<RLHelper, MemHistory>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let helper = RLHelper {
        completer: CommandCompleter::new(),
        hinter: HistoryHinter {},
        colored_prompt: prompt.with(Color::DarkGreen).to_string(),
    };

    let mut editor = Editor::with_history(config, MemHistory::new())?;
    editor.set_helper(Some(helper));
    Ok(editor)
}
