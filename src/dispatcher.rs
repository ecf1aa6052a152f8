use crate::error::DispatchError;
use crate::host::EventLoop;
use crate::rt::Handle;
use crate::sys::CONTEXT;
use crate::task::Task;
use std::thread::{self, ThreadId};

/// Runs closures on one owner thread on behalf of any other thread.
///
/// `invoke` blocks until the closure has run and re-raises its panics on the caller. On the
/// owner thread itself the closure runs in-line.
///
/// ```
/// use affinity::Runtime;
/// use std::thread;
///
/// let mut runtime = Runtime::new();
/// let dispatcher = runtime.dispatcher();
/// let handle = runtime.handle();
///
/// let caller = thread::spawn(move || {
///     let answer = dispatcher.invoke(|| 6 * 7);
///     handle.shutdown();
///     answer
/// });
///
/// runtime.run();
/// assert_eq!(caller.join().unwrap(), 42);
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher<L = Handle> {
    owner: ThreadId,
    host: L,
}

impl<L: EventLoop> Dispatcher<L> {
    pub fn new(host: L) -> Self {
        Self {
            owner: host.owner(),
            host,
        }
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    pub fn host(&self) -> &L {
        &self.host
    }

    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Runs `f` on the owner thread and returns its result.
    ///
    /// # Panics
    ///
    /// Re-raises any panic from `f`, and panics if the loop refuses or drops the task.
    pub fn invoke<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.try_invoke(f).unwrap_or_else(|err| host_failure(err))
    }

    pub fn try_invoke<F, R>(&self, f: F) -> Result<R, DispatchError>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        let mut task = Task::value(f);
        self.execute(&mut task)?;

        Ok(unsafe { task.into_value::<R>() })
    }

    /// The reference is handed back as is, nothing is copied.
    pub fn invoke_ref<'r, F, T>(&self, f: F) -> &'r T
    where
        F: FnOnce() -> &'r T + Send,
        T: Sync + 'r,
    {
        self.try_invoke_ref(f).unwrap_or_else(|err| host_failure(err))
    }

    pub fn try_invoke_ref<'r, F, T>(&self, f: F) -> Result<&'r T, DispatchError>
    where
        F: FnOnce() -> &'r T + Send,
        T: Sync + 'r,
    {
        let mut task = Task::borrowed(f);
        self.execute(&mut task)?;

        Ok(unsafe { task.into_ref::<T>() })
    }

    pub fn invoke_mut<'r, F, T>(&self, f: F) -> &'r mut T
    where
        F: FnOnce() -> &'r mut T + Send,
        T: Send + 'r,
    {
        self.try_invoke_mut(f).unwrap_or_else(|err| host_failure(err))
    }

    pub fn try_invoke_mut<'r, F, T>(&self, f: F) -> Result<&'r mut T, DispatchError>
    where
        F: FnOnce() -> &'r mut T + Send,
        T: Send + 'r,
    {
        let mut task = Task::borrowed_mut(f);
        self.execute(&mut task)?;

        Ok(unsafe { task.into_mut::<T>() })
    }

    pub fn invoke_unit<F>(&self, f: F)
    where
        F: FnOnce() + Send,
    {
        self.try_invoke_unit(f).unwrap_or_else(|err| host_failure(err))
    }

    pub fn try_invoke_unit<F>(&self, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send,
    {
        let mut task = Task::unit(f);
        self.execute(&mut task)?;

        task.into_unit();
        Ok(())
    }

    /// Queues `f` for the owner thread, even when called from it. A panic in `f` is left
    /// to the owner loop.
    pub fn fire_and_forget<F>(&self, f: F) -> Result<(), DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.host
            .post(Task::fire_and_forget(f))
            .inspect_err(|err| tracing::warn!(%err, "fire-and-forget task rejected"))
    }

    fn execute(&self, task: &mut Task<'_>) -> Result<(), DispatchError> {
        if self.is_owner_thread() {
            tracing::trace!("running task in-line on the owner thread");
            task.run();

            Ok(())
        } else {
            tracing::trace!(owner = ?self.owner, "marshaling task to the owner thread");
            self.host.post_and_wait(task)
        }
    }
}

impl Dispatcher<Handle> {
    /// Dispatcher for the [`Runtime`](crate::Runtime) being driven on this thread, if any.
    pub fn current() -> Option<Self> {
        CONTEXT.with(|x| x.borrow().as_ref().map(|context| context.handle.dispatcher()))
    }
}

fn host_failure(err: DispatchError) -> ! {
    panic!("dispatch failed: {err}")
}
