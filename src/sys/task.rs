use crate::sys::Notifier;
use crate::task::Task;
use std::ptr::NonNull;

pub(crate) enum Envelope {
    Owned(Task<'static>),
    /// Task still owned by a caller parked in `post_and_wait`.
    Blocking { task: TaskRef, done: Notifier },
}

/// Address of a task living on a blocked caller's stack.
pub(crate) struct TaskRef {
    ptr: NonNull<Task<'static>>,
}

// The caller stays parked until `done` fires or is dropped.
unsafe impl Send for TaskRef {}

impl TaskRef {
    /// # Safety
    ///
    /// The task must stay alive and untouched by its owner until the matching
    /// notifier has fired or been dropped.
    pub(crate) unsafe fn new(task: &mut Task<'_>) -> Self {
        let ptr = NonNull::from(task).cast::<Task<'static>>();

        Self { ptr }
    }

    pub(crate) fn run(self) {
        let task = unsafe { &mut *self.ptr.as_ptr() };

        task.run();
    }
}

impl Envelope {
    pub(crate) fn is_blocking(&self) -> bool {
        matches!(self, Envelope::Blocking { .. })
    }
}
