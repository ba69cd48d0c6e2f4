use crate::debugger::breakpoint::{
    Breakpoint, BreakpointKind, BreakpointListener, BreakpointManager, ListenerId,
};
use crate::debugger::config::SessionConfig;
use crate::debugger::dispatch::{EventDispatcher, EventSink};
use crate::debugger::error::Error;
use crate::debugger::frame::{FrameCache, StackFrame};
use crate::debugger::hook::SessionHook;
use crate::debugger::process::DebugeeProcess;
use crate::debugger::protocol::{decode_stack, Event, Request, VariableId};
use crate::debugger::session::{Effect, SessionState, Status, Thread};
use crate::debugger::transport::{ChannelCloser, Connector, RequestChannel};
use crate::debugger::variable::{Value, Variable};
use crate::weak_error;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Values cached at a single suspend point.
#[derive(Default)]
struct ValueCache {
    suspend_point: u64,
    values: HashMap<VariableId, Arc<Value>>,
}

struct State {
    session: SessionState,
    /// Incremented on every suspension.
    suspend_point: u64,
}

/// Shared part of a debug target, used by both the controller and the event dispatch thread.
pub(super) struct TargetInner {
    name: String,
    model_id: String,
    process: Arc<dyn DebugeeProcess>,
    breakpoint_manager: Arc<dyn BreakpointManager>,
    hook: Arc<dyn SessionHook>,

    state: Mutex<State>,
    /// Request channel, guards the whole write/flush/read exchange.
    request: Mutex<Option<RequestChannel>>,
    /// Stack frame cache, valid while `stale` is clear.
    stack: Mutex<FrameCache>,
    stale: AtomicBool,
    /// Variable metadata, never invalidated.
    variables: Mutex<HashMap<VariableId, Arc<Variable>>>,
    values: Mutex<ValueCache>,

    terminating: AtomicBool,
    listener_id: Mutex<Option<ListenerId>>,
    closers: Vec<ChannelCloser>,
}

impl TargetInner {
    fn new(
        config: &SessionConfig,
        process: Arc<dyn DebugeeProcess>,
        breakpoint_manager: Arc<dyn BreakpointManager>,
        hook: Arc<dyn SessionHook>,
        session: SessionState,
    ) -> Self {
        Self {
            name: config.target_name(),
            model_id: config.model_id.clone(),
            process,
            breakpoint_manager,
            hook,
            state: Mutex::new(State {
                session,
                suspend_point: 0,
            }),
            request: Mutex::new(None),
            stack: Mutex::default(),
            stale: AtomicBool::new(false),
            variables: Mutex::default(),
            values: Mutex::default(),
            terminating: AtomicBool::new(false),
            listener_id: Mutex::new(None),
            closers: vec![],
        }
    }

    fn status(&self) -> Status {
        self.state.lock().unwrap().session.status()
    }

    fn is_suspended(&self) -> bool {
        self.status() == Status::Suspended
    }

    fn send_request(&self, request: Request) -> Result<String, Error> {
        if self.status() == Status::Terminated {
            return Err(Error::NotConnected);
        }

        let result = {
            let mut channel = self.request.lock().unwrap();
            let channel = channel.as_mut().ok_or(Error::NotConnected)?;
            channel.exchange(&request)
        };

        if let Err(ref e) = result {
            self.abort(e);
        }
        result
    }

    /// Request channel is broken, the session can't continue.
    fn abort(&self, cause: &Error) {
        warn!(target: "debugger", "debug session aborted: {cause:#}");
        // notify first, closed channels make the dispatcher report a plain end of stream
        self.apply(&Event::Terminated, Some(cause));
        weak_error!(self.terminate(), "terminate debugee:");
    }

    /// Apply an event and execute the resulting effects. `cause` is the failure
    /// that ended the session, if any.
    fn apply(&self, event: &Event, cause: Option<&Error>) {
        let effects = {
            let mut state = self.state.lock().unwrap();
            let effects = state.session.apply(event);
            if effects.contains(&Effect::InvalidateStack) {
                state.suspend_point += 1;
            }
            effects
        };
        effects
            .into_iter()
            .for_each(|effect| self.perform(effect, cause));
    }

    fn terminate(&self) -> Result<(), Error> {
        if self.terminating.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        debug!(target: "debugger", "terminate debugee");
        if let Err(e) = self.process.terminate() {
            self.terminating.store(false, Ordering::SeqCst);
            return Err(e);
        }
        // wake up a blocked dispatcher and a blocked exchange
        self.closers.iter().for_each(ChannelCloser::close);
        Ok(())
    }

    fn perform(&self, effect: Effect, cause: Option<&Error>) {
        match effect {
            Effect::NotifyCreated => self.hook.on_created(),
            Effect::InstallBreakpoints => self.install_deferred_breakpoints(),
            Effect::Start => {
                weak_error!(self.send_request(Request::Start), "start debugee:");
            }
            Effect::InvalidateStack => self.reset_stack_frames_cache(),
            Effect::ResolveBreakpoint(line) => self.breakpoint_hit(line),
            Effect::NotifyResumed(reason) => self.hook.on_resumed(reason),
            Effect::NotifySuspended(reason) => self.hook.on_suspended(reason),
            Effect::TerminateProcess => {
                weak_error!(self.terminate(), "terminate debugee:");
            }
            Effect::Unsubscribe => {
                if let Some(id) = self.listener_id.lock().unwrap().take() {
                    self.breakpoint_manager.remove_listener(id);
                }
            }
            Effect::NotifyTerminated => {
                info!(target: "debugger", "debug session terminated");
                self.hook.on_terminated(cause)
            }
        }
    }

    /// Send breakpoints that already registered in the breakpoint manager.
    fn install_deferred_breakpoints(&self) {
        for breakpoint in self.breakpoint_manager.breakpoints(&self.model_id) {
            self.breakpoint_added(&breakpoint);
        }
    }

    fn reset_stack_frames_cache(&self) {
        self.stale.store(true, Ordering::SeqCst);
        self.values.lock().unwrap().values.clear();
    }

    /// Determine which breakpoint was hit and attach it to the thread.
    fn breakpoint_hit(&self, line: u32) {
        let hit = self
            .breakpoint_manager
            .breakpoints(&self.model_id)
            .into_iter()
            .find(|bp| self.supports_breakpoint(bp) && bp.line_number() == Some(line));

        match hit {
            Some(bp) => self.state.lock().unwrap().session.attach_breakpoint(bp),
            None => debug!(target: "debugger", "no registered breakpoint at line {line}"),
        }
    }

    fn supports_breakpoint(&self, breakpoint: &Breakpoint) -> bool {
        breakpoint.model_id() == self.model_id && breakpoint.kind() == BreakpointKind::Line
    }

    fn stack_frames(&self) -> Result<Vec<Arc<StackFrame>>, Error> {
        // a terminated debugee has no stack, cached frames included
        if self.is_terminated() {
            return Err(Error::NotConnected);
        }

        let mut cache = self.stack.lock().unwrap();
        if self.stale.swap(false, Ordering::SeqCst) {
            let fetched = self
                .send_request(Request::Stack)
                .and_then(|payload| decode_stack(&payload));
            return match fetched {
                Ok(records) => Ok(cache.refresh(records)),
                Err(e) => {
                    self.stale.store(true, Ordering::SeqCst);
                    Err(e)
                }
            };
        }
        Ok(cache.frames().to_vec())
    }

    fn variable(&self, id: VariableId) -> Result<Arc<Variable>, Error> {
        let mut variables = self.variables.lock().unwrap();
        if let Some(var) = variables.get(&id) {
            return Ok(var.clone());
        }

        let request = Request::Variable(id);
        let response = self.send_request(request.clone())?;
        let var = Variable::decode(id, &response).ok_or_else(|| Error::MalformedResponse {
            request: request.encode(),
            response,
        })?;
        let var = Arc::new(var);
        variables.insert(id, var.clone());
        Ok(var)
    }

    fn variable_value(&self, variable: &Variable) -> Result<Arc<Value>, Error> {
        let mut cache = self.values.lock().unwrap();
        let suspend_point = {
            let state = self.state.lock().unwrap();
            if !state.session.is_suspended() {
                return Ok(Arc::new(Value::placeholder()));
            }
            state.suspend_point
        };

        if cache.suspend_point != suspend_point {
            cache.values.clear();
            cache.suspend_point = suspend_point;
        }
        if let Some(value) = cache.values.get(&variable.id) {
            return Ok(value.clone());
        }

        let response = self.send_request(Request::Value(variable.id))?;
        let value = Arc::new(Value::decode(&response)?);
        cache.values.insert(variable.id, value.clone());
        Ok(value)
    }

    fn send_breakpoint_request(&self, request: Request) {
        let desc = request.encode();
        match self.send_request(request) {
            Ok(_) => debug!(target: "debugger", "{desc}: done"),
            Err(Error::NotConnected) => debug!(target: "debugger", "{desc}: not connected"),
            Err(e) => warn!(target: "debugger", "{desc}: {e:#}"),
        }
    }
}

impl EventSink for TargetInner {
    fn is_terminated(&self) -> bool {
        self.status() == Status::Terminated
    }

    fn handle_event(&self, event: &Event) {
        self.apply(event, None)
    }

    fn handle_disconnect(&self, cause: Option<&Error>) {
        self.apply(&Event::Terminated, cause)
    }
}

impl BreakpointListener for TargetInner {
    fn breakpoint_added(&self, breakpoint: &Breakpoint) {
        if !self.supports_breakpoint(breakpoint) || !breakpoint.is_enabled() {
            return;
        }
        // marker may be deleted concurrently
        let Some(marker) = breakpoint.marker() else {
            debug!(target: "debugger", "breakpoint {} has no marker", breakpoint.id());
            return;
        };
        if let Some(file) = weak_error!(marker.file_url()) {
            self.send_breakpoint_request(Request::AddBreakpoint {
                file,
                line: marker.line,
            });
        }
    }

    fn breakpoint_removed(&self, breakpoint: &Breakpoint) {
        if !self.supports_breakpoint(breakpoint) {
            return;
        }
        let Some(marker) = breakpoint.marker() else {
            debug!(target: "debugger", "breakpoint {} has no marker", breakpoint.id());
            return;
        };
        if let Some(file) = weak_error!(marker.file_url()) {
            self.send_breakpoint_request(Request::RemoveBreakpoint {
                file,
                line: marker.line,
            });
        }
    }

    fn breakpoint_changed(&self, breakpoint: &Breakpoint) {
        if !self.supports_breakpoint(breakpoint) {
            return;
        }
        if breakpoint.is_enabled() {
            self.breakpoint_added(breakpoint);
        } else {
            self.breakpoint_removed(breakpoint);
        }
    }
}

/// Debug target: a single debug session with a remote XSLT debugee.
///
/// All operations are synchronous, each request blocks until the debugee response is read.
/// State changes caused by requests (resume, suspend, steps) arrive later as debugee events,
/// use [`SessionHook`] to observe them.
pub struct DebugTarget {
    inner: Arc<TargetInner>,
}

impl DebugTarget {
    /// Connect to a debugee and start event dispatching.
    ///
    /// If the debugee process terminates before the connection is established, the target
    /// is created in the terminated state.
    ///
    /// # Arguments
    ///
    /// * `config`: session configuration, request and event ports must be set
    /// * `process`: debugee process handle
    /// * `breakpoint_manager`: source of user breakpoints
    /// * `hook`: session lifecycle observer
    pub fn connect(
        config: &SessionConfig,
        process: Arc<dyn DebugeeProcess>,
        breakpoint_manager: Arc<dyn BreakpointManager>,
        hook: Arc<dyn SessionHook>,
    ) -> Result<Self, Error> {
        let (request_port, event_port) = config.ports()?;
        let channels = Connector::new(config, process.as_ref()).connect(request_port, event_port)?;

        let Some((request, events)) = channels else {
            warn!(target: "debugger", "debugee terminated before connection established");
            let inner = TargetInner::new(
                config,
                process,
                breakpoint_manager,
                hook,
                SessionState::terminated(),
            );
            inner.hook.on_terminated(None);
            return Ok(Self {
                inner: Arc::new(inner),
            });
        };

        let closers = match request.closer().and_then(|r| Ok(vec![r, events.closer()?])) {
            Ok(closers) => closers,
            Err(e) => {
                weak_error!(process.terminate(), "terminate debugee:");
                return Err(e);
            }
        };

        let mut inner = TargetInner::new(
            config,
            process,
            breakpoint_manager.clone(),
            hook,
            SessionState::connecting(),
        );
        inner.request = Mutex::new(Some(request));
        inner.closers = closers;
        let inner = Arc::new(inner);

        let weak = Arc::downgrade(&inner);
        let listener: Weak<dyn BreakpointListener> = weak;
        *inner.listener_id.lock().unwrap() = Some(breakpoint_manager.add_listener(listener));

        if let Err(e) = EventDispatcher::new(inner.clone()).spawn(events.into_reader()) {
            weak_error!(inner.terminate(), "terminate debugee:");
            return Err(e);
        }

        info!(target: "debugger", "connected to debugee, request port: {request_port}, event port: {event_port}");
        Ok(Self { inner })
    }

    /// Debug target name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn process(&self) -> &Arc<dyn DebugeeProcess> {
        &self.inner.process
    }

    pub fn status(&self) -> Status {
        self.inner.status()
    }

    pub fn is_suspended(&self) -> bool {
        self.inner.is_suspended()
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }

    pub fn can_resume(&self) -> bool {
        !self.is_terminated() && self.is_suspended()
    }

    pub fn can_suspend(&self) -> bool {
        !self.is_terminated() && !self.is_suspended()
    }

    pub fn can_terminate(&self) -> bool {
        self.inner.process.can_terminate()
    }

    /// Disconnect without terminating the debugee is not supported by the protocol.
    pub fn can_disconnect(&self) -> bool {
        false
    }

    pub fn supports_storage_retrieval(&self) -> bool {
        false
    }

    pub fn has_threads(&self) -> bool {
        self.thread().is_some()
    }

    /// Return a snapshot of the debugee thread, [`None`] if session is terminated.
    pub fn thread(&self) -> Option<Thread> {
        self.inner.state.lock().unwrap().session.thread().cloned()
    }

    pub fn resume(&self) -> Result<(), Error> {
        self.inner.send_request(Request::Resume).map(|_| ())
    }

    pub fn suspend(&self) -> Result<(), Error> {
        self.inner.send_request(Request::Suspend).map(|_| ())
    }

    pub fn step_over(&self) -> Result<(), Error> {
        self.inner.send_request(Request::StepOver).map(|_| ())
    }

    pub fn step_into(&self) -> Result<(), Error> {
        self.inner.send_request(Request::StepInto).map(|_| ())
    }

    pub fn step_return(&self) -> Result<(), Error> {
        self.inner.send_request(Request::StepReturn).map(|_| ())
    }

    /// Terminate debugee process. May be called any number of times.
    pub fn terminate(&self) -> Result<(), Error> {
        self.inner.terminate()
    }

    /// Return current stack frames, fetching them from the debugee if the cached stack is stale.
    /// Frames are ordered in reverse of the debugee reporting order.
    /// Return [`Error::NotConnected`] after session termination.
    pub fn stack_frames(&self) -> Result<Vec<Arc<StackFrame>>, Error> {
        self.inner.stack_frames()
    }

    /// Return variable metadata by id.
    pub fn variable(&self, id: VariableId) -> Result<Arc<Variable>, Error> {
        self.inner.variable(id)
    }

    /// Return variable value at the current suspend point. If the debugee is not suspended
    /// a placeholder value returned.
    pub fn variable_value(&self, variable: &Variable) -> Result<Arc<Value>, Error> {
        self.inner.variable_value(variable)
    }

    pub fn supports_breakpoint(&self, breakpoint: &Breakpoint) -> bool {
        self.inner.supports_breakpoint(breakpoint)
    }

    pub fn breakpoint_added(&self, breakpoint: &Breakpoint) {
        self.inner.breakpoint_added(breakpoint)
    }

    pub fn breakpoint_removed(&self, breakpoint: &Breakpoint) {
        self.inner.breakpoint_removed(breakpoint)
    }

    pub fn breakpoint_changed(&self, breakpoint: &Breakpoint) {
        self.inner.breakpoint_changed(breakpoint)
    }
}

impl Drop for DebugTarget {
    fn drop(&mut self) {
        if !self.inner.is_terminated() {
            weak_error!(self.inner.terminate(), "terminate debugee:");
        }
    }
}
