//! The contract between a [`Dispatcher`](crate::Dispatcher) and the event loop that owns
//! the target thread.

use crate::error::DispatchError;
use crate::task::Task;
use std::sync::Arc;
use std::thread::ThreadId;

/// An event loop that drains tasks on one owner thread.
///
/// [`Runtime`](crate::Runtime) is the bundled implementation; hosts with their own message
/// loop implement this trait to let a [`Dispatcher`](crate::Dispatcher) marshal calls onto it.
///
/// # Safety
///
/// [`post_and_wait`](EventLoop::post_and_wait) receives a task that may borrow the caller's
/// stack. Implementations must guarantee that when it returns `Ok(())` the task has been run
/// on the owner thread, and that whatever the result, the task is never touched again after
/// the call returns. Completion must happen-before the return, so the caller observes every
/// write the task made. It must not unwind or return early while the task is still queued.
///
/// [`post`](EventLoop::post) must run each accepted task exactly once on the owner thread,
/// in the order tasks were posted from any single thread. [`owner`](EventLoop::owner) must
/// name that thread and never change.
pub unsafe trait EventLoop: Send + Sync {
    /// Thread that drains the queue.
    fn owner(&self) -> ThreadId;

    /// Queues a task and returns without waiting for it.
    fn post(&self, task: Task<'static>) -> Result<(), DispatchError>;

    /// Runs `task` on the owner thread, blocking the caller until it has finished.
    ///
    /// Must not be called from the owner thread, which cannot both wait and run the task.
    fn post_and_wait(&self, task: &mut Task<'_>) -> Result<(), DispatchError>;
}

unsafe impl<L> EventLoop for Arc<L>
where
    L: EventLoop + ?Sized,
{
    fn owner(&self) -> ThreadId {
        (**self).owner()
    }

    fn post(&self, task: Task<'static>) -> Result<(), DispatchError> {
        (**self).post(task)
    }

    fn post_and_wait(&self, task: &mut Task<'_>) -> Result<(), DispatchError> {
        (**self).post_and_wait(task)
    }
}
