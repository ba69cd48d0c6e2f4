use super::r#break::BreakpointIdentity;
use super::{r#break, Command, CommandError, CommandResult};
use crate::debugger::protocol::VariableId;

pub const CONTINUE_COMMAND: &str = "continue";
pub const CONTINUE_COMMAND_SHORT: &str = "c";
pub const SUSPEND_COMMAND: &str = "suspend";
pub const STEP_INTO_COMMAND: &str = "stepinto";
pub const STEP_INTO_COMMAND_SHORT: &str = "step";
pub const STEP_OUT_COMMAND: &str = "stepout";
pub const STEP_OUT_COMMAND_SHORT: &str = "finish";
pub const STEP_OVER_COMMAND: &str = "stepover";
pub const STEP_OVER_COMMAND_SHORT: &str = "next";
pub const BREAK_COMMAND: &str = "break";
pub const BREAK_COMMAND_SHORT: &str = "b";
pub const BREAK_REMOVE_SUBCOMMAND: &str = "remove";
pub const BREAK_REMOVE_SUBCOMMAND_SHORT: &str = "r";
pub const BREAK_ENABLE_SUBCOMMAND: &str = "enable";
pub const BREAK_DISABLE_SUBCOMMAND: &str = "disable";
pub const BREAK_INFO_SUBCOMMAND: &str = "info";
pub const BACKTRACE_COMMAND: &str = "backtrace";
pub const BACKTRACE_COMMAND_SHORT: &str = "bt";
pub const FRAME_COMMAND: &str = "frame";
pub const FRAME_COMMAND_SHORT: &str = "f";
pub const VAR_COMMAND: &str = "var";
pub const STATUS_COMMAND: &str = "status";
pub const HELP_COMMAND: &str = "help";
pub const HELP_COMMAND_SHORT: &str = "h";

use chumsky::error::Rich;
use chumsky::prelude::{any, choice, end, just};
use chumsky::text::Char;
use chumsky::{extra, text, Boxed, Parser};

type Err<'a> = extra::Err<Rich<'a, char>>;

/// Decimal number, out of range numbers are parsing errors.
fn number<'a, T>() -> impl chumsky::Parser<'a, &'a str, T, Err<'a>> + Clone
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    text::int(10).try_map(|s: &str, span| s.parse().map_err(|e| Rich::custom(span, e)))
}

pub fn brkpt_at_line_parser<'a>() -> impl chumsky::Parser<'a, &'a str, BreakpointIdentity, Err<'a>>
{
    any()
        .filter(|c: &char| c.to_char() != ':')
        .repeated()
        .at_least(1)
        .to_slice()
        .then_ignore(just(':'))
        .then(number())
        .map(|(file, line): (&str, u32)| BreakpointIdentity::Line(file.trim().into(), line))
        .padded()
        .labelled("<file>:<line>")
}

pub fn brkpt_number<'a>() -> impl chumsky::Parser<'a, &'a str, BreakpointIdentity, Err<'a>> {
    number()
        .map(BreakpointIdentity::Number)
        .padded()
        .labelled("breakpoint number")
}

fn command<'a, I>(ctx: &'static str, inner: I) -> Boxed<'a, 'a, &'a str, Command, Err<'a>>
where
    I: chumsky::Parser<'a, &'a str, Command, Err<'a>> + 'a,
{
    inner.then_ignore(end()).labelled(ctx).boxed()
}

impl Command {
    /// Parse input string into command.
    pub fn parse(input: &str) -> CommandResult<Command> {
        if input.trim().is_empty() {
            return Ok(Command::SkipInput);
        }

        Self::parser()
            .parse(input)
            .into_result()
            .map_err(|e| CommandError::Parsing(e[0].to_string()))
    }

    fn parser<'a>() -> impl chumsky::Parser<'a, &'a str, Command, Err<'a>> {
        let op = |sym| just(sym).padded();
        let op2 = |full, short| op(full).or(op(short));

        let r#continue = op2(CONTINUE_COMMAND, CONTINUE_COMMAND_SHORT).to(Command::Continue);
        let suspend = op(SUSPEND_COMMAND).to(Command::Suspend);
        let step_into = op2(STEP_INTO_COMMAND, STEP_INTO_COMMAND_SHORT).to(Command::StepInto);
        let step_out = op2(STEP_OUT_COMMAND, STEP_OUT_COMMAND_SHORT).to(Command::StepOut);
        let step_over = op2(STEP_OVER_COMMAND, STEP_OVER_COMMAND_SHORT).to(Command::StepOver);
        let backtrace = op2(BACKTRACE_COMMAND, BACKTRACE_COMMAND_SHORT).to(Command::PrintBacktrace);
        let status = op(STATUS_COMMAND).to(Command::Status);

        // subcommand must be separated from its argument, `b r.xsl:1` is not a removal
        let sub = |sym| just(sym).then_ignore(text::whitespace().at_least(1));
        let identity = || choice((brkpt_at_line_parser(), brkpt_number()));
        let r#break = op2(BREAK_COMMAND, BREAK_COMMAND_SHORT)
            .ignore_then(choice((
                sub(BREAK_REMOVE_SUBCOMMAND)
                    .or(sub(BREAK_REMOVE_SUBCOMMAND_SHORT))
                    .ignore_then(identity())
                    .map(|brkpt| Command::Breakpoint(r#break::Command::Remove(brkpt))),
                sub(BREAK_ENABLE_SUBCOMMAND)
                    .ignore_then(identity())
                    .map(|brkpt| Command::Breakpoint(r#break::Command::Enable(brkpt))),
                sub(BREAK_DISABLE_SUBCOMMAND)
                    .ignore_then(identity())
                    .map(|brkpt| Command::Breakpoint(r#break::Command::Disable(brkpt))),
                op(BREAK_INFO_SUBCOMMAND)
                    .then_ignore(end())
                    .to(Command::Breakpoint(r#break::Command::Info)),
                brkpt_at_line_parser()
                    .map(|brkpt| Command::Breakpoint(r#break::Command::Add(brkpt))),
            )))
            .boxed();

        let frame = op2(FRAME_COMMAND, FRAME_COMMAND_SHORT)
            .ignore_then(number().padded())
            .map(Command::Frame)
            .boxed();

        let var = op(VAR_COMMAND)
            .ignore_then(number().padded())
            .map(|id| Command::PrintVariable(VariableId(id)))
            .boxed();

        let help = op2(HELP_COMMAND, HELP_COMMAND_SHORT)
            .ignore_then(text::ident().or_not())
            .map(|s: Option<&str>| Command::Help(s.map(ToOwned::to_owned)))
            .padded()
            .boxed();

        choice((
            command(CONTINUE_COMMAND, r#continue),
            command(SUSPEND_COMMAND, suspend),
            command(STEP_INTO_COMMAND, step_into),
            command(STEP_OUT_COMMAND, step_out),
            command(STEP_OVER_COMMAND, step_over),
            command(BACKTRACE_COMMAND, backtrace),
            command(STATUS_COMMAND, status),
            command(BREAK_COMMAND, r#break),
            command(FRAME_COMMAND, frame),
            command(VAR_COMMAND, var),
            command(HELP_COMMAND, help),
        ))
        .map_err(|e| {
            let span = e.span();
            if span.start == 0 && span.end == 0 {
                Rich::custom(*e.span(), "type help for list of commands")
            } else {
                e
            }
        })
    }
}

#[test]
fn test_brkpt_at_line_parser() {
    struct TestCase {
        string: &'static str,
        result: Result<BreakpointIdentity, ()>,
    }
    let cases = vec![
        TestCase {
            string: "main.xsl:12",
            result: Ok(BreakpointIdentity::Line("main.xsl".into(), 12)),
        },
        TestCase {
            string: "  /home/user/style sheets/a.xsl:3 ",
            result: Ok(BreakpointIdentity::Line(
                "/home/user/style sheets/a.xsl".into(),
                3,
            )),
        },
        TestCase {
            string: "main.xsl",
            result: Err(()),
        },
        TestCase {
            string: ":12",
            result: Err(()),
        },
        TestCase {
            string: "main.xsl:line",
            result: Err(()),
        },
        TestCase {
            string: "main.xsl:4294967296",
            result: Err(()),
        },
    ];

    for tc in cases {
        let expr = brkpt_at_line_parser()
            .then_ignore(end())
            .parse(tc.string)
            .into_result();
        assert_eq!(expr.map_err(|_| ()), tc.result);
    }
}

#[test]
fn test_parser() {
    struct TestCase {
        inputs: Vec<&'static str>,
        command_matcher: fn(result: Result<Command, CommandError>),
    }
    let cases = vec![
        TestCase {
            inputs: vec!["c", "continue", "  continue "],
            command_matcher: |result| {
                assert_eq!(result.unwrap(), Command::Continue);
            },
        },
        TestCase {
            inputs: vec!["suspend"],
            command_matcher: |result| {
                assert_eq!(result.unwrap(), Command::Suspend);
            },
        },
        TestCase {
            inputs: vec!["next", "stepover"],
            command_matcher: |result| {
                assert_eq!(result.unwrap(), Command::StepOver);
            },
        },
        TestCase {
            inputs: vec!["step", "stepinto"],
            command_matcher: |result| {
                assert_eq!(result.unwrap(), Command::StepInto);
            },
        },
        TestCase {
            inputs: vec!["finish", "stepout"],
            command_matcher: |result| {
                assert_eq!(result.unwrap(), Command::StepOut);
            },
        },
        TestCase {
            inputs: vec!["bt", "backtrace"],
            command_matcher: |result| {
                assert_eq!(result.unwrap(), Command::PrintBacktrace);
            },
        },
        TestCase {
            inputs: vec!["b main.xsl:12", "break  main.xsl:12 "],
            command_matcher: |result| {
                assert_eq!(
                    result.unwrap(),
                    Command::Breakpoint(r#break::Command::Add(BreakpointIdentity::Line(
                        "main.xsl".into(),
                        12
                    )))
                );
            },
        },
        TestCase {
            inputs: vec!["break remove 2", "b r 2"],
            command_matcher: |result| {
                assert_eq!(
                    result.unwrap(),
                    Command::Breakpoint(r#break::Command::Remove(BreakpointIdentity::Number(2)))
                );
            },
        },
        TestCase {
            inputs: vec!["break remove main.xsl:12"],
            command_matcher: |result| {
                assert_eq!(
                    result.unwrap(),
                    Command::Breakpoint(r#break::Command::Remove(BreakpointIdentity::Line(
                        "main.xsl".into(),
                        12
                    )))
                );
            },
        },
        TestCase {
            inputs: vec!["break disable main.xsl:12"],
            command_matcher: |result| {
                assert!(matches!(
                    result.unwrap(),
                    Command::Breakpoint(r#break::Command::Disable(BreakpointIdentity::Line(
                        _,
                        12
                    )))
                ));
            },
        },
        TestCase {
            inputs: vec!["break enable 1"],
            command_matcher: |result| {
                assert_eq!(
                    result.unwrap(),
                    Command::Breakpoint(r#break::Command::Enable(BreakpointIdentity::Number(1)))
                );
            },
        },
        TestCase {
            inputs: vec!["break info", "b info"],
            command_matcher: |result| {
                assert_eq!(
                    result.unwrap(),
                    Command::Breakpoint(r#break::Command::Info)
                );
            },
        },
        TestCase {
            inputs: vec!["b r.xsl:4", "b info.xsl:4"],
            command_matcher: |result| {
                assert!(matches!(
                    result.unwrap(),
                    Command::Breakpoint(r#break::Command::Add(BreakpointIdentity::Line(_, 4)))
                ));
            },
        },
        TestCase {
            inputs: vec!["break 12"],
            command_matcher: |result| assert!(result.is_err()),
        },
        TestCase {
            inputs: vec!["frame 2", "f 2"],
            command_matcher: |result| {
                assert_eq!(result.unwrap(), Command::Frame(2));
            },
        },
        TestCase {
            inputs: vec!["frame", "frame x"],
            command_matcher: |result| assert!(result.is_err()),
        },
        TestCase {
            inputs: vec!["var 17"],
            command_matcher: |result| {
                assert_eq!(result.unwrap(), Command::PrintVariable(VariableId(17)));
            },
        },
        TestCase {
            inputs: vec!["status"],
            command_matcher: |result| {
                assert_eq!(result.unwrap(), Command::Status);
            },
        },
        TestCase {
            inputs: vec!["h", "help"],
            command_matcher: |result| {
                assert_eq!(result.unwrap(), Command::Help(None));
            },
        },
        TestCase {
            inputs: vec!["help break"],
            command_matcher: |result| {
                assert_eq!(result.unwrap(), Command::Help(Some("break".to_string())));
            },
        },
        TestCase {
            inputs: vec!["", "   "],
            command_matcher: |result| {
                assert_eq!(result.unwrap(), Command::SkipInput);
            },
        },
        TestCase {
            inputs: vec![
                "frame 99999999999",
                "var 99999999999",
                "break remove 99999999999",
                "b main.xsl:99999999999",
            ],
            command_matcher: |result| assert!(matches!(result, Err(CommandError::Parsing(_)))),
        },
        TestCase {
            inputs: vec!["voo", "continue now"],
            command_matcher: |result| assert!(result.is_err()),
        },
    ];

    for case in cases {
        for input in case.inputs {
            (case.command_matcher)(Command::parse(input));
        }
    }
}
