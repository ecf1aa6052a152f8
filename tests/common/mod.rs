#![allow(dead_code)]

use affinity::{Builder, DispatchError, Dispatcher, EventLoop, Handle, Task};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};

/// A runtime driven on its own thread for the duration of a test.
pub struct OwnerThread {
    pub dispatcher: Dispatcher,
    pub handle: Handle,
    join: Option<JoinHandle<()>>,
}

impl OwnerThread {
    pub fn spawn() -> Self {
        Self::with_builder(Builder::new().name("test-owner"))
    }

    pub fn with_builder(builder: Builder) -> Self {
        let (tx, rx) = mpsc::channel();

        let join = thread::spawn(move || {
            let mut runtime = builder.build();
            tx.send(runtime.handle()).unwrap();
            runtime.run();
        });

        let handle = rx.recv().unwrap();

        Self {
            dispatcher: handle.dispatcher(),
            handle,
            join: Some(join),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.handle.owner()
    }

    /// Waits for the owner thread to exit without asking it to.
    pub fn join(mut self) -> thread::Result<()> {
        self.join.take().unwrap().join()
    }

    pub fn stop(mut self) -> thread::Result<()> {
        self.handle.shutdown();
        self.join.take().unwrap().join()
    }
}

impl Drop for OwnerThread {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            self.handle.shutdown();
            let _ = join.join();
        }
    }
}

/// Forwards to a real loop while counting how often each primitive is used.
pub struct CountingLoop {
    inner: Handle,
    posts: AtomicUsize,
    hops: AtomicUsize,
}

impl CountingLoop {
    pub fn new(inner: Handle) -> Self {
        Self {
            inner,
            posts: AtomicUsize::new(0),
            hops: AtomicUsize::new(0),
        }
    }

    pub fn posts(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }

    pub fn hops(&self) -> usize {
        self.hops.load(Ordering::SeqCst)
    }
}

unsafe impl EventLoop for CountingLoop {
    fn owner(&self) -> ThreadId {
        self.inner.owner()
    }

    fn post(&self, task: Task<'static>) -> Result<(), DispatchError> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        self.inner.post(task)
    }

    fn post_and_wait(&self, task: &mut Task<'_>) -> Result<(), DispatchError> {
        self.hops.fetch_add(1, Ordering::SeqCst);
        self.inner.post_and_wait(task)
    }
}

pub fn panic_text(payload: &(dyn std::any::Any + Send)) -> Option<String> {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
}
