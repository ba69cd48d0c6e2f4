use crate::ui::command::parser;

pub const HELP: &str = r#"
Available debugger commands:

c, continue                                 -- resume the transformation
suspend                                     -- suspend the running transformation
next, stepover                              -- step over the current instruction
step, stepinto                              -- step into the current instruction
finish, stepout                             -- run until the current template returns
b, break <file:line>|remove|enable|disable  -- manage breakpoints
bt, backtrace                               -- print stack frames of the suspended transformation
f, frame <number>                           -- print variables of a stack frame
var <id>                                    -- print variable by id
status                                      -- print debug session status
h, help <>|<command>                        -- show help
q, quit                                     -- terminate debugee and exit
"#;

pub const HELP_CONTINUE: &str = "\
\x1b[32;1mc, continue\x1b[0m
Resume the transformation after a breakpoint, step or suspend.
";

pub const HELP_SUSPEND: &str = "\
\x1b[32;1msuspend\x1b[0m
Ask the debugee to suspend the running transformation.
";

pub const HELP_STEPINTO: &str = "\
\x1b[32;1mstep, stepinto\x1b[0m
Step into the current instruction, entering called templates.
";

pub const HELP_STEPOUT: &str = "\
\x1b[32;1mfinish, stepout\x1b[0m
Run until the current template returns.
";

pub const HELP_STEPOVER: &str = "\
\x1b[32;1mnext, stepover\x1b[0m
Step over the current instruction.
";

pub const HELP_BREAK: &str = "\
\x1b[32;1mb, break\x1b[0m
Manage breakpoints.

Available subcomands:
break <file>:<line> - set breakpoint at stylesheet line
break remove <file>:<line>|<number> - delete selected breakpoint
break enable <file>:<line>|<number> - enable selected breakpoint
break disable <file>:<line>|<number> - disable selected breakpoint, disabled breakpoint stay registered
break info - show all breakpoints

Breakpoints may be set before the debugee is ready, they are installed at transformation start.
Relative stylesheet paths are resolved against the current directory.
";

pub const HELP_BACKTRACE: &str = "\
\x1b[32;1mbt, backtrace\x1b[0m
Show stack frames of the suspended transformation, innermost frame first.

Output format:
#{frame number} {stylesheet} {template name}:{line}
";

pub const HELP_FRAME: &str = "\
\x1b[32;1mf, frame\x1b[0m
Show variables of stack frame <number> (see `backtrace` for frame numbers).

Output format:
{variable id} {scope} {name} = {value}
";

pub const HELP_VAR: &str = "\
\x1b[32;1mvar\x1b[0m
Show variable with given id. A value is available only while the transformation is suspended.
";

pub const HELP_STATUS: &str = "\
\x1b[32;1mstatus\x1b[0m
Show debug target name, session state and breakpoints that caused the current suspension.
";

pub const HELP_QUIT: &str = "\
\x1b[32;1mq, quit\x1b[0m
Terminate the debugee and exit.
";

pub fn help_for_command(command: Option<&str>) -> &str {
    match command {
        None => HELP,
        Some(parser::CONTINUE_COMMAND) | Some(parser::CONTINUE_COMMAND_SHORT) => HELP_CONTINUE,
        Some(parser::SUSPEND_COMMAND) => HELP_SUSPEND,
        Some(parser::STEP_INTO_COMMAND) | Some(parser::STEP_INTO_COMMAND_SHORT) => HELP_STEPINTO,
        Some(parser::STEP_OUT_COMMAND) | Some(parser::STEP_OUT_COMMAND_SHORT) => HELP_STEPOUT,
        Some(parser::STEP_OVER_COMMAND) | Some(parser::STEP_OVER_COMMAND_SHORT) => HELP_STEPOVER,
        Some(parser::BREAK_COMMAND) | Some(parser::BREAK_COMMAND_SHORT) => HELP_BREAK,
        Some(parser::BACKTRACE_COMMAND) | Some(parser::BACKTRACE_COMMAND_SHORT) => HELP_BACKTRACE,
        Some(parser::FRAME_COMMAND) | Some(parser::FRAME_COMMAND_SHORT) => HELP_FRAME,
        Some(parser::VAR_COMMAND) => HELP_VAR,
        Some(parser::STATUS_COMMAND) => HELP_STATUS,
        Some("q") | Some("quit") => HELP_QUIT,
        _ => "unknown command",
    }
}
