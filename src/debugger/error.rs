use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- generic errors --------------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),

    // --------------------------------- connection errors -----------------------------------------
    #[error("unable to connect to debugee on port {port} after {attempts} attempts")]
    ConnectionTimeout { port: u16, attempts: u32 },
    #[error("debug session is not connected")]
    NotConnected,
    #[error("request channel closed while waiting for `{0}` response")]
    ChannelClosed(String),
    #[error("no response to `{0}` within {1:?}")]
    ResponseTimeout(String, Duration),
    #[error("`{request}` failed: {source}")]
    Request {
        request: String,
        source: std::io::Error,
    },

    // --------------------------------- protocol errors -------------------------------------------
    #[error("malformed `{request}` response: {response:?}")]
    MalformedResponse { request: String, response: String },
    #[error("malformed stack frame: {0:?}")]
    MalformedFrame(String),

    // --------------------------------- breakpoint errors -----------------------------------------
    #[error("breakpoint location {0:?} can't be represented as a file url")]
    BreakpointLocation(PathBuf),

    // --------------------------------- debugee process errors ------------------------------------
    #[error("terminate debugee process: {0}")]
    Terminate(std::io::Error),

    // --------------------------------- configuration errors --------------------------------------
    #[error("configuration file {0:?}: {1}")]
    Config(PathBuf, String),
    #[error("missing configuration value `{0}`")]
    MissingConfig(&'static str),
}

impl Error {
    /// Return a hint to an interface - continue debugging after error or stop whole session.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::IO(_) => false,
            Error::MalformedResponse { .. } => false,
            Error::MalformedFrame(_) => false,
            Error::BreakpointLocation(_) => false,
            Error::Terminate(_) => false,

            // the session is gone after these
            Error::ConnectionTimeout { .. } => true,
            Error::NotConnected => true,
            Error::ChannelClosed(_) => true,
            Error::ResponseTimeout(_, _) => true,
            Error::Request { .. } => true,
            Error::Config(_, _) => true,
            Error::MissingConfig(_) => true,
        }
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "debugger", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "debugger", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}
