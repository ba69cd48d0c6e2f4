use crate::debugger::error::Error;
use crate::debugger::protocol::Event;
use log::{debug, warn};
use std::io::BufRead;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Consumer of debugee events.
pub trait EventSink: Send + Sync {
    fn is_terminated(&self) -> bool;

    /// Apply a single event. Events are delivered one by one, in arrival order.
    fn handle_event(&self, event: &Event);

    /// Event channel is gone. `cause` is set if reading failed, [`None`] on end of stream.
    fn handle_disconnect(&self, _cause: Option<&Error>) {
        self.handle_event(&Event::Terminated)
    }
}

/// Event channel reader. Runs until the session terminates or the channel closes,
/// a closed channel is an unsolicited debugee termination.
pub struct EventDispatcher<S: EventSink> {
    sink: Arc<S>,
}

impl<S: EventSink + 'static> EventDispatcher<S> {
    pub fn new(sink: Arc<S>) -> Self {
        Self { sink }
    }

    /// Run dispatch loop in a dedicated thread.
    pub fn spawn(self, reader: impl BufRead + Send + 'static) -> Result<JoinHandle<()>, Error> {
        let handle = thread::Builder::new()
            .name("event-dispatch".to_string())
            .spawn(move || self.run(reader))?;
        Ok(handle)
    }

    pub fn run(&self, mut reader: impl BufRead) {
        let mut buf = Vec::new();
        let mut cause = None;
        while !self.sink.is_terminated() {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    debug!(target: "dispatch", "event channel closed");
                    break;
                }
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let event = Event::decode(&line);
                    debug!(target: "dispatch", "event: {event:?}");
                    self.sink.handle_event(&event);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(target: "dispatch", "event channel read: {e}");
                    cause = Some(Error::IO(e));
                    break;
                }
            }
        }

        self.sink.handle_disconnect(cause.as_ref());
    }
}
