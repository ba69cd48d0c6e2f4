//! Text protocol spoken with the debugee.
//!
//! Every message is a single newline-terminated ASCII line. Requests and their responses travel over
//! the request channel, one exchange at a time; events arrive unsolicited on the event channel.

use crate::debugger::error::Error;
use log::warn;
use std::fmt::{Display, Formatter};
use strum_macros::Display as StrumDisplay;
use url::Url;

/// Separator between frames of a `STACK` response.
pub const FRAME_DELIMITER: &str = "$$$";
/// Separator between fields of `VARIABLE` and `VALUE` responses.
pub const FIELD_DELIMITER: char = '&';
/// Separator between fields of a single stack frame.
const FRAME_FIELD_DELIMITER: char = '|';
/// Escaped form of `|` inside template names.
const PIPE_ESCAPE: &str = "%@_PIPE_@%";
/// Separator of the compact `<line>::<name>` frame form.
const COMPACT_FRAME_DELIMITER: &str = "::";

/// Variable identifier assigned by the debugee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(pub u32);

impl Display for VariableId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Verb {
    Resume,
    Suspend,
    StepOver,
    StepInto,
    StepReturn,
    Start,
    Stack,
    Variable,
    Value,
    AddBreakpoint,
    RemoveBreakpoint,
}

/// Request sent over the request channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Resume,
    Suspend,
    StepOver,
    StepInto,
    StepReturn,
    Start,
    Stack,
    Variable(VariableId),
    Value(VariableId),
    AddBreakpoint { file: Url, line: u32 },
    RemoveBreakpoint { file: Url, line: u32 },
}

impl Request {
    pub fn verb(&self) -> Verb {
        match self {
            Request::Resume => Verb::Resume,
            Request::Suspend => Verb::Suspend,
            Request::StepOver => Verb::StepOver,
            Request::StepInto => Verb::StepInto,
            Request::StepReturn => Verb::StepReturn,
            Request::Start => Verb::Start,
            Request::Stack => Verb::Stack,
            Request::Variable(_) => Verb::Variable,
            Request::Value(_) => Verb::Value,
            Request::AddBreakpoint { .. } => Verb::AddBreakpoint,
            Request::RemoveBreakpoint { .. } => Verb::RemoveBreakpoint,
        }
    }

    /// Encode request as a protocol line (without the trailing newline).
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl Display for Request {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let verb = self.verb();
        match self {
            Request::Variable(id) | Request::Value(id) => write!(f, "{verb} {id}"),
            Request::AddBreakpoint { file, line } | Request::RemoveBreakpoint { file, line } => {
                write!(f, "{verb} {file} {line}")
            }
            _ => write!(f, "{verb}"),
        }
    }
}

/// Split a response line into its `&` delimited fields.
/// At most `max_fields` fields are produced, the last one keeps any remaining delimiters.
pub fn split_fields(line: &str, max_fields: usize) -> Vec<&str> {
    line.splitn(max_fields, FIELD_DELIMITER).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum ResumeReason {
    Step,
    Client,
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum SuspendReason {
    Client,
    Step,
    /// Breakpoint hit, `line` is [`None`] if the event carries a malformed line number.
    Breakpoint { line: Option<u32> },
    Unspecified,
}

/// Event received from the event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Ready,
    Stopped,
    Terminated,
    Resumed(ResumeReason),
    Suspended(SuspendReason),
    /// Line that is not a part of the event vocabulary.
    Unrecognized(String),
}

impl Event {
    /// Decode an event line. This never fails: unknown lines decode into [`Event::Unrecognized`].
    pub fn decode(line: &str) -> Event {
        let line = line.trim_end_matches(['\r', '\n']);
        match line {
            "ready" => return Event::Ready,
            "stopped" => return Event::Stopped,
            "terminated" => return Event::Terminated,
            _ => {}
        }

        if line.starts_with("resumed") {
            let reason = if line.ends_with("step") {
                ResumeReason::Step
            } else if line.ends_with("client") {
                ResumeReason::Client
            } else {
                ResumeReason::Unspecified
            };
            return Event::Resumed(reason);
        }

        if line.starts_with("suspended") {
            let reason = if line.ends_with("client") {
                SuspendReason::Client
            } else if line.ends_with("step") {
                SuspendReason::Step
            } else if line.contains("breakpoint") {
                SuspendReason::Breakpoint {
                    line: breakpoint_line(line),
                }
            } else {
                SuspendReason::Unspecified
            };
            return Event::Suspended(reason);
        }

        Event::Unrecognized(line.to_string())
    }
}

/// Line number is the last whitespace delimited token of a breakpoint hit event.
fn breakpoint_line(event: &str) -> Option<u32> {
    let (_, token) = event.rsplit_once(' ')?;
    match token.parse() {
        Ok(line) => Some(line),
        Err(e) => {
            warn!(target: "debugger", "malformed breakpoint line {token:?} in event {event:?}: {e}");
            None
        }
    }
}

/// Stable identity of a stack frame across stack refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameKey {
    /// Frame identified by the debugee.
    Id { file: String, id: u64 },
    /// Frame without debugee identity, identified by template name and position in the stack.
    Position { name: String, index: usize },
}

/// Decoded stack frame data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    pub key: FrameKey,
    pub file: Option<String>,
    pub line: u32,
    pub name: String,
    pub variables: Vec<VariableId>,
}

/// Decode a `STACK` response. Frames are returned in reverse wire order, the result is
/// either a complete stack or an error.
pub fn decode_stack(payload: &str) -> Result<Vec<FrameRecord>, Error> {
    // trailing delimiters carry no frames
    let payload = payload.trim_end_matches(FRAME_DELIMITER);
    if payload.is_empty() {
        return Ok(vec![]);
    }

    payload
        .rsplit(FRAME_DELIMITER)
        .enumerate()
        .map(|(index, data)| decode_frame(data, index))
        .collect()
}

fn decode_frame(data: &str, index: usize) -> Result<FrameRecord, Error> {
    let malformed = || Error::MalformedFrame(data.to_string());

    if !data.contains(FRAME_FIELD_DELIMITER) {
        let (line, name) = data
            .split_once(COMPACT_FRAME_DELIMITER)
            .ok_or_else(malformed)?;
        let line = line.trim().parse().map_err(|_| malformed())?;
        return Ok(FrameRecord {
            key: FrameKey::Position {
                name: name.to_string(),
                index,
            },
            file: None,
            line,
            name: name.to_string(),
            variables: vec![],
        });
    }

    let mut fields = data.split(FRAME_FIELD_DELIMITER);
    let mut next = || fields.next().ok_or_else(malformed);
    let file = next()?.to_string();
    let id: u64 = next()?.parse().map_err(|_| malformed())?;
    let line: u32 = next()?.parse().map_err(|_| malformed())?;
    let name = next()?.replace(PIPE_ESCAPE, "|");

    let variables = fields
        .filter(|v| !v.is_empty())
        .map(|v| {
            let slot = v.rsplit(FIELD_DELIMITER).next().unwrap_or(v);
            slot.parse().map(VariableId).map_err(|_| malformed())
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FrameRecord {
        key: FrameKey::Id {
            file: file.clone(),
            id,
        },
        file: Some(file),
        line,
        name,
        variables,
    })
}
