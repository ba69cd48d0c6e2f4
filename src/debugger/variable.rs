use crate::debugger::error::Error;
use crate::debugger::protocol::{split_fields, VariableId};
use std::fmt::{Display, Formatter};
use strum_macros::{Display as StrumDisplay, EnumString};

/// Variable scope tag reported by the debugee.
#[derive(Debug, Clone, PartialEq, Eq, EnumString, StrumDisplay)]
pub enum Scope {
    #[strum(serialize = "G")]
    Global,
    #[strum(serialize = "L")]
    Local,
    #[strum(default)]
    Other(String),
}

/// Stylesheet variable or parameter. Variable metadata never changes during a debug session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub id: VariableId,
    pub scope: Scope,
    pub name: String,
}

impl Variable {
    /// Decode `VARIABLE` response in `<scope>&<name>` form.
    pub(super) fn decode(id: VariableId, response: &str) -> Option<Self> {
        match split_fields(response, 2).as_slice() {
            [scope, name] => Some(Self {
                id,
                // `Scope` parsing is infallible because of the default variant
                scope: scope.parse().ok()?,
                name: name.to_string(),
            }),
            _ => None,
        }
    }
}

/// Variable value at a suspend point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub type_tag: String,
    pub text: String,
    placeholder: bool,
}

impl Value {
    pub fn new(type_tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            text: text.into(),
            placeholder: false,
        }
    }

    /// Value returned when debugee is not suspended and variable values are undefined.
    pub fn placeholder() -> Self {
        Self {
            type_tag: "G".to_string(),
            text: String::new(),
            placeholder: true,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Decode `VALUE` response in `<type>[&<literal>]` form.
    pub(super) fn decode(response: &str) -> Result<Self, Error> {
        let fields = split_fields(response, 2);
        let type_tag = fields[0];
        if type_tag.is_empty() {
            return Err(Error::MalformedResponse {
                request: "VALUE".to_string(),
                response: response.to_string(),
            });
        }
        Ok(Self::new(type_tag, fields.get(1).copied().unwrap_or_default()))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
