use crate::debugger::error::Error;
use log::debug;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Handle of a debugee process.
pub trait DebugeeProcess: Send + Sync {
    /// True if the process is not running anymore.
    fn is_terminated(&self) -> bool;

    /// True if the process may be terminated by this handle.
    fn can_terminate(&self) -> bool {
        !self.is_terminated()
    }

    /// Terminate the process. Terminating an already terminated process is not an error.
    fn terminate(&self) -> Result<(), Error>;
}

/// Debugee process spawned by the debugger.
pub struct ChildProcess {
    child: Mutex<Child>,
    exited: AtomicBool,
}

impl ChildProcess {
    /// Spawn a new process.
    ///
    /// # Arguments
    ///
    /// * `program`: program name
    /// * `args`: program arguments
    pub fn spawn<ARGS: IntoIterator<Item = I>, I: AsRef<std::ffi::OsStr>>(
        program: impl AsRef<std::ffi::OsStr>,
        args: ARGS,
    ) -> Result<Self, Error> {
        let child = Command::new(program).args(args).spawn()?;
        debug!(target: "debugger", "debugee process spawned, pid: {}", child.id());
        Ok(Self::from_child(child))
    }

    pub fn from_child(child: Child) -> Self {
        Self {
            child: Mutex::new(child),
            exited: AtomicBool::new(false),
        }
    }

    pub fn pid(&self) -> u32 {
        self.child.lock().unwrap().id()
    }
}

impl DebugeeProcess for ChildProcess {
    fn is_terminated(&self) -> bool {
        if self.exited.load(Ordering::Acquire) {
            return true;
        }
        let exited = match self.child.lock().unwrap().try_wait() {
            Ok(status) => status.is_some(),
            Err(e) => {
                debug!(target: "debugger", "debugee status unknown: {e}");
                true
            }
        };
        if exited {
            self.exited.store(true, Ordering::Release);
        }
        exited
    }

    fn terminate(&self) -> Result<(), Error> {
        if self.is_terminated() {
            return Ok(());
        }
        let mut child = self.child.lock().unwrap();
        if let Err(e) = child.kill() {
            // process may exit between the status check and the kill call
            if child.try_wait().ok().flatten().is_none() {
                return Err(Error::Terminate(e));
            }
        }
        child.wait().map_err(Error::Terminate)?;
        self.exited.store(true, Ordering::Release);
        Ok(())
    }
}

/// Debugee process started outside the debugger. The process can't be observed directly,
/// it is considered terminated after [`DebugeeProcess::terminate`] call.
#[derive(Default)]
pub struct AttachedProcess {
    terminated: AtomicBool,
}

impl AttachedProcess {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DebugeeProcess for AttachedProcess {
    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    fn terminate(&self) -> Result<(), Error> {
        self.terminated.store(true, Ordering::Release);
        Ok(())
    }
}
