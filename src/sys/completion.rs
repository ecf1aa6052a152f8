use crate::error::DispatchError;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Waiting,
    Done,
    Dropped,
}

struct Slot {
    signal: Mutex<Signal>,
    changed: Condvar,
}

/// Caller side of a blocking post. Waiting never unwinds.
pub(crate) struct Completion {
    slot: Arc<Slot>,
}

/// Loop side of a blocking post. Dropping it unfired abandons the caller.
pub(crate) struct Notifier {
    slot: Arc<Slot>,
}

pub(crate) fn completion() -> (Notifier, Completion) {
    let slot = Arc::new(Slot {
        signal: Mutex::new(Signal::Waiting),
        changed: Condvar::new(),
    });

    (Notifier { slot: slot.clone() }, Completion { slot })
}

impl Completion {
    /// Parks until the loop has run the task or let go of it.
    pub(crate) fn wait(self) -> Result<(), DispatchError> {
        let mut guard = self.slot.signal.lock();

        while *guard == Signal::Waiting {
            self.slot.changed.wait(&mut guard);
        }

        match *guard {
            Signal::Done => Ok(()),
            _ => Err(DispatchError::Abandoned),
        }
    }
}

impl Notifier {
    pub(crate) fn complete(self) {
        self.set(Signal::Done);
    }

    fn set(&self, signal: Signal) {
        let mut guard = self.slot.signal.lock();

        if *guard == Signal::Waiting {
            *guard = signal;
            self.slot.changed.notify_all();
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.set(Signal::Dropped);
    }
}
