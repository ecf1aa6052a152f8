use crate::rt::Handle;
use std::cell::RefCell;

mod completion;

mod erased;

mod payload;

mod rt;

mod scheduler;

mod task;

thread_local!(pub(crate) static CONTEXT: RefCell<Option<ThreadContext>> = const { RefCell::new(None) });

#[derive(Clone)]
pub(crate) struct ThreadContext {
    pub(crate) handle: Handle,
}

/// Installs `context` for the current thread until the guard is dropped, restoring
/// whatever was there before.
pub(crate) fn enter(context: ThreadContext) -> ContextGuard {
    let previous = CONTEXT.with(|x| x.borrow_mut().replace(context));

    ContextGuard { previous }
}

pub(crate) struct ContextGuard {
    previous: Option<ThreadContext>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CONTEXT.with(|x| {
            let mut guard = x.borrow_mut();

            *guard = self.previous.take();
        });
    }
}

pub(crate) use completion::*;
pub(crate) use erased::*;
pub(crate) use payload::*;
pub(crate) use rt::*;
pub(crate) use scheduler::*;
pub(crate) use task::*;
