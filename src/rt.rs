//! A ready-made owner-thread event loop.
//!
//! A [`Runtime`] is created on the thread that owns some resource and then driven there,
//! either with [`Runtime::run`] or piecemeal with [`Runtime::tick`]. Other threads reach it
//! through a [`Handle`] or, more usually, a [`Dispatcher`].

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::host::EventLoop;
use crate::sys::{self, Envelope, Shared, TaskRef, ThreadContext, Worker};
use crate::task::Task;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, ThreadId};

const DEFAULT_NAME: &str = "owner";
const DEFAULT_CAPACITY: usize = 4096;

/// What the loop does when a fire-and-forget task panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PanicPolicy {
    /// Let the panic unwind out of [`Runtime::tick`] / [`Runtime::run`].
    #[default]
    Propagate,
    /// Log the panic and keep draining the queue.
    Catch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Ran,
    QueueEmpty,
    /// Nothing queued and the loop has been shut down.
    Closed,
}

#[derive(Debug, Clone)]
pub struct Builder {
    name: String,
    capacity: usize,
    panic_policy: PanicPolicy,
}

/// The owner side of the loop. Bound to the thread that built it.
pub struct Runtime {
    worker: Worker,
    name: String,
    // the loop must be driven from the thread it was built on
    _owner_only: PhantomData<*const ()>,
}

/// Cheap, cloneable access to a [`Runtime`] from any thread.
#[derive(Clone)]
pub struct Handle {
    shared: Arc<Shared>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_owned(),
            capacity: DEFAULT_CAPACITY,
            panic_policy: PanicPolicy::default(),
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of queued tasks to allocate room for up front.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn panic_policy(mut self, panic_policy: PanicPolicy) -> Self {
        self.panic_policy = panic_policy;
        self
    }

    /// Builds a runtime owned by the calling thread.
    pub fn build(self) -> Runtime {
        let owner = thread::current().id();
        let shared = Arc::new(Shared::new(owner, self.capacity));

        tracing::debug!(name = %self.name, ?owner, "owner loop created");

        Runtime {
            worker: Worker::new(shared, self.panic_policy),
            name: self.name,
            _owner_only: PhantomData,
        }
    }
}

impl Runtime {
    pub fn new() -> Self {
        Builder::new().build()
    }

    pub fn builder() -> Builder {
        Builder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> Handle {
        Handle {
            shared: self.worker.shared(),
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.handle().dispatcher()
    }

    /// Runs at most one queued task.
    ///
    /// # Panics
    ///
    /// Panics when a fire-and-forget task panics under [`PanicPolicy::Propagate`].
    pub fn tick(&mut self) -> Tick {
        let _context = self.enter();

        self.worker.tick()
    }

    pub fn run_until_idle(&mut self) -> usize {
        let _context = self.enter();

        self.worker.run_until_idle()
    }

    /// Drives the loop, parking while the queue is empty, until [`Handle::shutdown`] has
    /// been called and everything accepted before it has run.
    pub fn run(&mut self) {
        let span = tracing::debug_span!("owner_loop", name = %self.name);
        let _span = span.enter();
        let _context = self.enter();

        tracing::debug!("owner loop running");
        self.worker.run();
        tracing::debug!("owner loop stopped");
    }

    fn enter(&self) -> sys::ContextGuard {
        sys::enter(ThreadContext {
            handle: self.handle(),
        })
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("name", &self.name)
            .field("handle", &self.handle())
            .finish()
    }
}

impl Handle {
    /// Thread the loop belongs to.
    pub fn owner(&self) -> ThreadId {
        self.shared.owner()
    }

    /// Stops accepting tasks. Work already queued still runs, after which
    /// [`Runtime::run`] returns.
    pub fn shutdown(&self) {
        if self.shared.close() {
            tracing::debug!(owner = ?self.owner(), "owner loop shutting down");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    pub fn pending(&self) -> usize {
        self.shared.pending()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.clone())
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("owner", &self.owner())
            .field("closed", &self.is_closed())
            .field("pending", &self.pending())
            .finish()
    }
}

unsafe impl EventLoop for Handle {
    fn owner(&self) -> ThreadId {
        self.shared.owner()
    }

    fn post(&self, task: Task<'static>) -> Result<(), DispatchError> {
        tracing::trace!("posting task");

        self.shared.push(Envelope::Owned(task))
    }

    fn post_and_wait(&self, task: &mut Task<'_>) -> Result<(), DispatchError> {
        if thread::current().id() == self.owner() {
            return Err(DispatchError::WouldDeadlock);
        }

        let (done, finished) = sys::completion();

        // `finished.wait` cannot unwind, so we stay here until the loop is done with the task
        let task = unsafe { TaskRef::new(task) };

        tracing::trace!("posting blocking task");
        self.shared.push(Envelope::Blocking { task, done })?;

        finished.wait()
    }
}
