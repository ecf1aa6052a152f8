use crate::error::DispatchError;
use crate::rt::{PanicPolicy, Tick};
use crate::sys::{panic_message, Envelope, Scheduler};

use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// State shared between the owner loop and every thread posting to it.
pub(crate) struct Shared {
    scheduler: Mutex<Scheduler>,
    unparked: Condvar,
    owner: ThreadId,
}

/// Owner-thread side of the loop: pulls envelopes off the queue and runs them.
pub(crate) struct Worker {
    shared: Arc<Shared>,
    panic_policy: PanicPolicy,
}

impl Shared {
    pub(crate) fn new(owner: ThreadId, capacity: usize) -> Self {
        Self {
            scheduler: Mutex::new(Scheduler::with_capacity(capacity)),
            unparked: Condvar::new(),
            owner,
        }
    }

    pub(crate) fn owner(&self) -> ThreadId {
        self.owner
    }

    pub(crate) fn push(&self, envelope: Envelope) -> Result<(), DispatchError> {
        let rejected = self.scheduler.lock().spawn(envelope);

        match rejected {
            Ok(()) => {
                self.unparked.notify_one();
                Ok(())
            }
            // dropped here, outside the lock, in case the closure's captures post again
            Err(_envelope) => Err(DispatchError::Closed),
        }
    }

    pub(crate) fn close(&self) -> bool {
        let closed = self.scheduler.lock().close();

        self.unparked.notify_all();
        closed
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.scheduler.lock().is_closed()
    }

    pub(crate) fn pending(&self) -> usize {
        self.scheduler.lock().len()
    }

    fn park(&self) {
        let mut guard = self.scheduler.lock();

        while guard.is_empty() && !guard.is_closed() {
            self.unparked.wait(&mut guard);
        }
    }
}

impl Worker {
    pub(crate) fn new(shared: Arc<Shared>, panic_policy: PanicPolicy) -> Self {
        Self {
            shared,
            panic_policy,
        }
    }

    pub(crate) fn shared(&self) -> Arc<Shared> {
        self.shared.clone()
    }

    pub(crate) fn run(&mut self) {
        loop {
            match self.tick() {
                Tick::Ran => {}
                Tick::QueueEmpty => self.shared.park(),
                Tick::Closed => return,
            }
        }
    }

    pub(crate) fn run_until_idle(&mut self) -> usize {
        let mut ran = 0;

        while let Tick::Ran = self.tick() {
            ran += 1;
        }

        ran
    }

    pub(crate) fn tick(&mut self) -> Tick {
        assert_eq!(
            thread::current().id(),
            self.shared.owner,
            "owner loop driven from a thread other than its owner"
        );

        let (next, closed) = {
            let mut guard = self.shared.scheduler.lock();
            (guard.fetch_next_task_for_tick(), guard.is_closed())
        };

        match next {
            Some(envelope) => {
                self.execute(envelope);
                Tick::Ran
            }
            None if closed => Tick::Closed,
            None => Tick::QueueEmpty,
        }
    }

    fn execute(&self, envelope: Envelope) {
        match envelope {
            Envelope::Owned(mut task) => match self.panic_policy {
                PanicPolicy::Propagate => task.run(),
                PanicPolicy::Catch => {
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
                        tracing::error!(
                            panic = panic_message(&*payload),
                            "fire-and-forget task panicked"
                        );
                    }
                }
            },
            Envelope::Blocking { task, done } => {
                tracing::trace!("running blocking task");
                task.run();

                done.complete();
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        let pending: Vec<Envelope> = {
            let mut guard = self.shared.scheduler.lock();
            guard.close();
            guard.drain().collect()
        };

        self.shared.unparked.notify_all();

        if !pending.is_empty() {
            let blocking = pending.iter().filter(|e| e.is_blocking()).count();

            tracing::warn!(
                discarded = pending.len() - blocking,
                abandoned = blocking,
                "owner loop dropped with queued tasks"
            );
        }
    }
}
