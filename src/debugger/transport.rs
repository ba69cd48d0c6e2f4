//! Socket connections to the debugee.
//! Debugee listens on two ports: one for request/response exchange and one for events.

use crate::debugger::config::SessionConfig;
use crate::debugger::error::Error;
use crate::debugger::process::DebugeeProcess;
use crate::debugger::protocol::Request;
use log::{debug, trace};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{Shutdown, TcpStream};
use std::thread;
use std::time::Duration;

/// Establish connections with a debugee, retrying while the debugee starts up.
pub struct Connector<'a> {
    host: &'a str,
    attempts: u32,
    wait: Duration,
    response_timeout: Option<Duration>,
    process: &'a dyn DebugeeProcess,
}

impl<'a> Connector<'a> {
    pub fn new(config: &'a SessionConfig, process: &'a dyn DebugeeProcess) -> Self {
        Self {
            host: &config.host,
            attempts: config.connect_attempts,
            wait: config.connect_wait(),
            response_timeout: config.response_timeout(),
            process,
        }
    }

    /// Try to connect to a port, at most `attempts` times.
    ///
    /// Return [`None`] if the debugee process terminated before a connection was established,
    /// and [`Error::ConnectionTimeout`] if all attempts failed while the debugee is still alive.
    pub fn attempt_connect(&self, port: u16) -> Result<Option<TcpStream>, Error> {
        for attempt in 1..=self.attempts {
            if self.process.is_terminated() {
                break;
            }

            match TcpStream::connect((self.host, port)) {
                Ok(stream) => {
                    debug!(target: "transport", "connected to {}:{port} (attempt {attempt})", self.host);
                    return Ok(Some(stream));
                }
                Err(e) => {
                    trace!(target: "transport", "connect to {}:{port} attempt {attempt}: {e}", self.host);
                }
            }

            if attempt < self.attempts {
                thread::sleep(self.wait);
            }
        }

        if self.process.is_terminated() {
            debug!(target: "transport", "debugee terminated before connection to port {port}");
            return Ok(None);
        }

        Err(Error::ConnectionTimeout {
            port,
            attempts: self.attempts,
        })
    }

    /// Connect both channels. Return [`None`] if the debugee process terminated meanwhile.
    pub fn connect(
        &self,
        request_port: u16,
        event_port: u16,
    ) -> Result<Option<(RequestChannel, EventChannel)>, Error> {
        let Some(request) = self.attempt_connect(request_port)? else {
            return Ok(None);
        };
        let Some(event) = self.attempt_connect(event_port)? else {
            return Ok(None);
        };
        if self.process.is_terminated() {
            return Ok(None);
        }

        Ok(Some((
            RequestChannel::new(request, self.response_timeout)?,
            EventChannel::new(event)?,
        )))
    }
}

/// Request/response channel. A single exchange is in flight at a time: caller must own
/// the channel exclusively for the whole exchange.
pub struct RequestChannel {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
    timeout: Option<Duration>,
    broken: bool,
}

impl RequestChannel {
    pub fn new(stream: TcpStream, timeout: Option<Duration>) -> Result<Self, Error> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(timeout)?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            writer: stream,
            reader,
            timeout,
            broken: false,
        })
    }

    /// Send a request and wait for the response line.
    /// After the first failure the channel is out of sync with the debugee and rejects
    /// any further exchange.
    pub fn exchange(&mut self, request: &Request) -> Result<String, Error> {
        let line = request.encode();
        if self.broken {
            return Err(Error::ChannelClosed(line));
        }

        let result = self.exchange_line(&line);
        if result.is_err() {
            self.broken = true;
        }
        result
    }

    fn exchange_line(&mut self, line: &str) -> Result<String, Error> {
        trace!(target: "transport", "-> {line}");

        let request_err = |source| Error::Request {
            request: line.to_string(),
            source,
        };
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(request_err)?;

        let mut response = String::new();
        match self.reader.read_line(&mut response) {
            Ok(0) => Err(Error::ChannelClosed(line.to_string())),
            Ok(_) => {
                let response = response.trim_end_matches(['\r', '\n']).to_string();
                trace!(target: "transport", "<- {response}");
                Ok(response)
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Err(
                Error::ResponseTimeout(line.to_string(), self.timeout.unwrap_or_default()),
            ),
            Err(e) => Err(request_err(e)),
        }
    }

    /// Return a handle that can close the channel from another thread.
    pub fn closer(&self) -> Result<ChannelCloser, Error> {
        Ok(ChannelCloser(self.writer.try_clone()?))
    }
}

/// Read-only event channel.
pub struct EventChannel {
    stream: TcpStream,
}

impl EventChannel {
    pub fn new(stream: TcpStream) -> Result<Self, Error> {
        stream.set_read_timeout(None)?;
        Ok(Self { stream })
    }

    /// Return a handle that can close the channel from another thread.
    pub fn closer(&self) -> Result<ChannelCloser, Error> {
        Ok(ChannelCloser(self.stream.try_clone()?))
    }

    pub fn into_reader(self) -> BufReader<TcpStream> {
        BufReader::new(self.stream)
    }
}

/// Shut down a channel socket: blocked reads on the channel return end-of-stream,
/// blocked exchanges fail.
pub struct ChannelCloser(TcpStream);

impl ChannelCloser {
    pub fn close(&self) {
        _ = self.0.shutdown(Shutdown::Both);
    }
}
