use crate::debugger::breakpoint::XSL_DEBUG_MODEL;
use crate::debugger::error::Error;
use log::debug;
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::Path;
use std::time::Duration;

/// Debug session configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Host where debugee listens.
    pub host: String,
    /// Port of the request/response channel.
    pub request_port: Option<u16>,
    /// Port of the event channel.
    pub event_port: Option<u16>,
    /// Connection attempts per port.
    pub connect_attempts: u32,
    /// Delay between connection attempts, in milliseconds.
    pub connect_wait_ms: u64,
    /// Maximum time to wait for a response, in milliseconds. Zero means no limit.
    pub response_timeout_ms: u64,
    /// Transform processor label, used in the debug target name.
    pub processor: String,
    /// Processor installation name, used in the debug target name.
    pub install: String,
    /// Debug model of breakpoints handled by the session.
    pub model_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            request_port: None,
            event_port: None,
            connect_attempts: 10,
            connect_wait_ms: 1000,
            response_timeout_ms: 30_000,
            processor: "XSLT".to_string(),
            install: "default".to_string(),
            model_id: XSL_DEBUG_MODEL.to_string(),
        }
    }
}

impl SessionConfig {
    const DEFAULT_PATH: &'static str = ".config/xsltdbg/config.toml";

    /// Load configuration from file. If `path` is [`None`] the default file in the home directory
    /// is used, a missing default file means the default configuration.
    pub fn from_file(path: Option<&Path>) -> Result<Self, Error> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match home::home_dir() {
                Some(home) => (home.join(Self::DEFAULT_PATH), false),
                None => return Ok(Self::default()),
            },
        };

        let data = match read_to_string(&path) {
            Ok(data) => data,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                debug!(target: "debugger", "no configuration file at {path:?}, use defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::Config(path, e.to_string())),
        };

        Self::parse(&data).map_err(|e| Error::Config(path, e))
    }

    /// Parse configuration from a TOML document.
    pub fn parse(data: &str) -> Result<Self, String> {
        toml::de::from_str(data).map_err(|e| e.to_string())
    }

    /// Return request and event ports.
    pub fn ports(&self) -> Result<(u16, u16), Error> {
        let request = self
            .request_port
            .ok_or(Error::MissingConfig("request_port"))?;
        let event = self.event_port.ok_or(Error::MissingConfig("event_port"))?;
        Ok((request, event))
    }

    pub fn connect_wait(&self) -> Duration {
        Duration::from_millis(self.connect_wait_ms)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        (self.response_timeout_ms > 0).then(|| Duration::from_millis(self.response_timeout_ms))
    }

    /// Debug target name in `<processor> [<install>]` form.
    pub fn target_name(&self) -> String {
        format!("{} [{}]", self.processor, self.install)
    }
}
