use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use xsltdbg::debugger::{
    BreakpointRegistry, ChannelHook, DebugTarget, DebugeeProcess, Error, SessionConfig,
    SessionEvent,
};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Response marker: the request is read but never answered.
pub const NO_REPLY: &str = "<no reply>";

/// Response marker: the debugee closes the request channel instead of answering.
pub const CLOSE_CONNECTION: &str = "<close>";

/// Scripted debugee: listens on a request and an event port, records every request line and
/// answers with a preconfigured response (`ok` by default).
pub struct FakeDebugee {
    pub request_port: u16,
    pub event_port: u16,
    requests: Arc<Mutex<Vec<String>>>,
    responses: Arc<Mutex<HashMap<String, String>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    events_rx: Mutex<Receiver<TcpStream>>,
    events: Mutex<Option<TcpStream>>,
}

impl FakeDebugee {
    pub fn start() -> Self {
        let request_listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let event_listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let request_port = request_listener.local_addr().unwrap().port();
        let event_port = event_listener.local_addr().unwrap().port();

        let requests = Arc::new(Mutex::new(vec![]));
        let responses: Arc<Mutex<HashMap<String, String>>> = Arc::default();
        let delays: Arc<Mutex<HashMap<String, Duration>>> = Arc::default();

        {
            let requests = requests.clone();
            let responses = responses.clone();
            let delays = delays.clone();
            thread::spawn(move || {
                let Ok((stream, _)) = request_listener.accept() else {
                    return;
                };
                let mut writer = stream.try_clone().unwrap();
                for line in BufReader::new(stream).lines() {
                    let Ok(line) = line else {
                        return;
                    };
                    requests.lock().unwrap().push(line.clone());
                    let response = responses
                        .lock()
                        .unwrap()
                        .get(&line)
                        .cloned()
                        .unwrap_or_else(|| "ok".to_string());
                    let delay = delays.lock().unwrap().get(&line).copied();
                    if let Some(delay) = delay {
                        thread::sleep(delay);
                    }
                    if response == NO_REPLY {
                        continue;
                    }
                    if response == CLOSE_CONNECTION {
                        return;
                    }
                    if writeln!(writer, "{response}").is_err() {
                        return;
                    }
                }
            });
        }

        let (events_tx, events_rx) = mpsc::channel();
        thread::spawn(move || {
            if let Ok((stream, _)) = event_listener.accept() {
                _ = events_tx.send(stream);
            }
        });

        Self {
            request_port,
            event_port,
            requests,
            responses,
            delays,
            events_rx: Mutex::new(events_rx),
            events: Mutex::default(),
        }
    }

    pub fn config(&self) -> SessionConfig {
        SessionConfig {
            host: "127.0.0.1".to_string(),
            request_port: Some(self.request_port),
            event_port: Some(self.event_port),
            connect_wait_ms: 10,
            response_timeout_ms: 5_000,
            ..Default::default()
        }
    }

    /// Set response for an exact request line.
    pub fn respond(&self, request: &str, response: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(request.to_string(), response.to_string());
    }

    /// Answer an exact request line only after a pause.
    pub fn delay(&self, request: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(request.to_string(), delay);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Wait until at least `n` requests received.
    pub fn wait_requests(&self, n: usize) -> Vec<String> {
        let deadline = Instant::now() + TIMEOUT;
        loop {
            let requests = self.requests();
            if requests.len() >= n || Instant::now() > deadline {
                return requests;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Wait until a request line received.
    pub fn wait_request(&self, line: &str) {
        let deadline = Instant::now() + TIMEOUT;
        while self.count_requests(line) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    pub fn count_requests(&self, line: &str) -> usize {
        self.requests().iter().filter(|r| *r == line).count()
    }

    /// Send an event line to the connected debug session.
    pub fn emit(&self, event: &str) {
        let mut events = self.events.lock().unwrap();
        if events.is_none() {
            let stream = self.events_rx.lock().unwrap().recv_timeout(TIMEOUT).unwrap();
            *events = Some(stream);
        }
        let stream = events.as_mut().unwrap();
        writeln!(stream, "{event}").unwrap();
    }

    /// Close event channel from the debugee side.
    pub fn close_events(&self) {
        let mut events = self.events.lock().unwrap();
        if events.is_none() {
            *events = self.events_rx.lock().unwrap().recv_timeout(TIMEOUT).ok();
        }
        if let Some(stream) = events.take() {
            _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// Debugee process that dies after a given number of liveness checks.
#[derive(Default)]
pub struct TestProcess {
    checks: AtomicUsize,
    dies_at_check: Option<usize>,
    terminated: AtomicBool,
    pub terminate_calls: AtomicUsize,
}

impl TestProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dying_at_check(n: usize) -> Self {
        Self {
            dies_at_check: Some(n),
            ..Default::default()
        }
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl DebugeeProcess for TestProcess {
    fn is_terminated(&self) -> bool {
        let check = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
        if matches!(self.dies_at_check, Some(n) if check >= n) {
            self.terminated.store(true, Ordering::SeqCst);
        }
        self.terminated.load(Ordering::SeqCst)
    }

    fn terminate(&self) -> Result<(), Error> {
        self.terminate_calls.fetch_add(1, Ordering::SeqCst);
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Wait for the next session notification.
pub fn next_event(rx: &Receiver<SessionEvent>) -> SessionEvent {
    rx.recv_timeout(TIMEOUT)
        .expect("session notification expected")
}

/// Skip notifications until one matches.
pub fn wait_event(rx: &Receiver<SessionEvent>, expected: SessionEvent) {
    loop {
        if next_event(rx) == expected {
            return;
        }
    }
}

/// Return a port nobody listens on.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Connect a debug session to a fake debugee.
pub fn connect_session(
    debugee: &FakeDebugee,
    registry: &Arc<BreakpointRegistry>,
) -> (DebugTarget, Receiver<SessionEvent>) {
    let (hook, rx) = ChannelHook::new();
    let target = DebugTarget::connect(
        &debugee.config(),
        Arc::new(TestProcess::new()),
        registry.clone(),
        Arc::new(hook),
    )
    .unwrap();
    (target, rx)
}

/// Connect a debug session and bring it to the running state.
pub fn running_session(
    debugee: &FakeDebugee,
    registry: &Arc<BreakpointRegistry>,
) -> (DebugTarget, Receiver<SessionEvent>) {
    let (target, rx) = connect_session(debugee, registry);
    debugee.emit("ready");
    wait_event(&rx, SessionEvent::Created);
    debugee.wait_request("START");
    (target, rx)
}
