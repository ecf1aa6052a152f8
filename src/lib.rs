//! Run closures on one owner thread from any thread.
//!
//! Some resources may only be touched from the thread that created them. A [`Dispatcher`]
//! lets other threads call into such a thread, either blocking for the result
//! ([`Dispatcher::invoke`]) or just queueing work ([`Dispatcher::fire_and_forget`]). The owner
//! thread drains that work through an [`EventLoop`]; [`Runtime`] is a ready-made one.

pub mod task;

pub(crate) mod sys;

pub mod rt;

pub mod dispatcher;

pub mod error;

pub mod host;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use host::EventLoop;
pub use rt::{Builder, Handle, PanicPolicy, Runtime, Tick};
pub use task::{Task, TaskState};
