pub mod breakpoint;
pub mod config;
mod dispatch;
pub mod error;
pub mod frame;
pub mod hook;
pub mod process;
pub mod protocol;
pub mod session;
mod target;
mod transport;
pub mod variable;

pub use breakpoint::{Breakpoint, BreakpointManager, BreakpointRegistry, XSL_DEBUG_MODEL};
pub use config::SessionConfig;
pub use dispatch::{EventDispatcher, EventSink};
pub use error::Error;
pub use frame::StackFrame;
pub use hook::{ChannelHook, NopHook, SessionEvent, SessionHook};
pub use process::{AttachedProcess, ChildProcess, DebugeeProcess};
pub use session::{Status, Thread};
pub use target::DebugTarget;
pub use variable::{Scope, Value, Variable};
