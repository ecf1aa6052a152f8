use crate::sys::ErasedBox;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;

type Body<'a> = Box<dyn FnOnce(&mut Outcome) + Send + 'a>;

/// A single-shot unit of work bound for an owner thread, plus the slot its outcome lands in.
///
/// An event loop only ever needs [`Task::run`].
pub struct Task<'a> {
    body: Option<Body<'a>>,
    outcome: Outcome,
    kind: Kind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Default-constructed, there is nothing to run.
    Empty,
    Unexecuted,
    Completed,
    /// The closure panicked and the payload was captured.
    Failed,
    /// A fire-and-forget closure panicked out of `run`.
    Unwound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Empty,
    Value,
    Borrowed,
    Unit,
    FireAndForget,
}

pub(crate) enum Outcome {
    Pending,
    Unit,
    Value(ErasedBox),
    Borrowed(NonNull<()>),
    Panicked(Box<dyn Any + Send + 'static>),
}

// Every constructor requires a `Send` closure, and the values it can leave behind are
// `Send` results or references to `Sync`/`Send` referents.
unsafe impl Send for Task<'_> {}

impl<'a> Task<'a> {
    fn with_body<B>(kind: Kind, body: B) -> Self
    where
        B: FnOnce(&mut Outcome) + Send + 'a,
    {
        Self {
            body: Some(Box::new(body)),
            outcome: Outcome::Pending,
            kind,
        }
    }

    pub(crate) fn value<F, R>(f: F) -> Self
    where
        F: FnOnce() -> R + Send + 'a,
        R: Send + 'a,
    {
        Self::with_body(Kind::Value, move |outcome| {
            *outcome = match panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(value) => Outcome::Value(ErasedBox::new(value)),
                Err(payload) => Outcome::Panicked(payload),
            };
        })
    }

    /// Only the address of the referent is kept.
    pub(crate) fn borrowed<'r, F, T>(f: F) -> Self
    where
        F: FnOnce() -> &'r T + Send + 'a,
        T: Sync + 'r,
    {
        Self::with_body(Kind::Borrowed, move |outcome| {
            *outcome = match panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(referent) => Outcome::Borrowed(NonNull::from(referent).cast()),
                Err(payload) => Outcome::Panicked(payload),
            };
        })
    }

    pub(crate) fn borrowed_mut<'r, F, T>(f: F) -> Self
    where
        F: FnOnce() -> &'r mut T + Send + 'a,
        T: Send + 'r,
    {
        Self::with_body(Kind::Borrowed, move |outcome| {
            *outcome = match panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(referent) => Outcome::Borrowed(NonNull::from(referent).cast()),
                Err(payload) => Outcome::Panicked(payload),
            };
        })
    }

    pub(crate) fn unit<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'a,
    {
        Self::with_body(Kind::Unit, move |outcome| {
            *outcome = match panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(()) => Outcome::Unit,
                Err(payload) => Outcome::Panicked(payload),
            };
        })
    }

    /// Runs the closure exactly once. Only fire-and-forget tasks let a panic out.
    ///
    /// # Panics
    ///
    /// Panics when the task is a default (no-op) task or has already been run.
    pub fn run(&mut self) {
        let body = match self.body.take() {
            Some(body) => body,
            None if self.kind == Kind::Empty => panic!("attempted to run a no-op task"),
            None => panic!("task already executed"),
        };

        body(&mut self.outcome);
    }

    pub fn state(&self) -> TaskState {
        if self.kind == Kind::Empty {
            return TaskState::Empty;
        }

        match (&self.body, &self.outcome) {
            (Some(_), _) => TaskState::Unexecuted,
            (None, Outcome::Panicked(_)) => TaskState::Failed,
            (None, Outcome::Pending) => TaskState::Unwound,
            (None, _) => TaskState::Completed,
        }
    }

    pub fn is_fire_and_forget(&self) -> bool {
        self.kind == Kind::FireAndForget
    }

    /// Takes the boxed value out, or re-raises the captured panic.
    ///
    /// # Safety
    ///
    /// The task must have been built with [`Task::value`] for a closure returning `R`.
    pub(crate) unsafe fn into_value<R>(self) -> R {
        match self.outcome {
            Outcome::Value(value) => value.into_inner::<R>(),
            Outcome::Panicked(payload) => panic::resume_unwind(payload),
            other => misuse(other, "a value"),
        }
    }

    /// # Safety
    ///
    /// The task must have been built with [`Task::borrowed`] for a closure returning
    /// `&'r T`.
    pub(crate) unsafe fn into_ref<'r, T>(self) -> &'r T {
        match self.outcome {
            Outcome::Borrowed(ptr) => ptr.cast::<T>().as_ref(),
            Outcome::Panicked(payload) => panic::resume_unwind(payload),
            other => misuse(other, "a reference"),
        }
    }

    /// # Safety
    ///
    /// The task must have been built with [`Task::borrowed_mut`] for a closure returning
    /// `&'r mut T`.
    pub(crate) unsafe fn into_mut<'r, T>(self) -> &'r mut T {
        match self.outcome {
            Outcome::Borrowed(ptr) => ptr.cast::<T>().as_mut(),
            Outcome::Panicked(payload) => panic::resume_unwind(payload),
            other => misuse(other, "a reference"),
        }
    }

    pub(crate) fn into_unit(self) {
        match self.outcome {
            Outcome::Unit => {}
            Outcome::Panicked(payload) => panic::resume_unwind(payload),
            other => misuse(other, "unit"),
        }
    }
}

impl Task<'static> {
    /// Task for work nobody waits on. Panics in `f` are not caught.
    pub fn fire_and_forget<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::with_body(Kind::FireAndForget, move |outcome| {
            f();
            *outcome = Outcome::Unit;
        })
    }
}

impl Default for Task<'_> {
    fn default() -> Self {
        Self {
            body: None,
            outcome: Outcome::Pending,
            kind: Kind::Empty,
        }
    }
}

impl fmt::Debug for Task<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

fn misuse(outcome: Outcome, wanted: &str) -> ! {
    match outcome {
        Outcome::Pending => panic!("task has not been executed"),
        Outcome::Value(value) => panic!(
            "task holds a value of type `{}`, not {wanted}",
            value.type_name()
        ),
        Outcome::Borrowed(_) => panic!("task holds a reference, not {wanted}"),
        Outcome::Unit => panic!("task holds no result, not {wanted}"),
        Outcome::Panicked(_) => unreachable!("captured panics are re-raised before this"),
    }
}

#[cfg(test)]
mod tests {
    use super::{Task, TaskState};
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn value_task_yields_its_result() {
        let mut task = Task::value(|| vec![1, 2, 3]);
        assert_eq!(task.state(), TaskState::Unexecuted);

        task.run();
        assert_eq!(task.state(), TaskState::Completed);

        assert_eq!(unsafe { task.into_value::<Vec<i32>>() }, vec![1, 2, 3]);
    }

    #[test]
    fn value_task_can_borrow_from_the_stack() {
        let words = ["owner", "thread"];
        let mut task = Task::value(|| words.join(" "));

        task.run();

        assert_eq!(unsafe { task.into_value::<String>() }, "owner thread");
    }

    #[test]
    fn panic_is_captured_and_raised_on_retrieval() {
        let mut task = Task::value(|| -> u32 { panic!("boom") });

        task.run();
        assert_eq!(task.state(), TaskState::Failed);

        let payload = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
            task.into_value::<u32>()
        }))
        .unwrap_err();

        assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
    }

    #[test]
    fn custom_panic_payloads_survive_unchanged() {
        #[derive(Debug, PartialEq)]
        struct Fault(u8);

        let mut task = Task::unit(|| panic::panic_any(Fault(7)));
        task.run();

        let payload = panic::catch_unwind(AssertUnwindSafe(|| task.into_unit())).unwrap_err();

        assert_eq!(payload.downcast_ref::<Fault>(), Some(&Fault(7)));
    }

    #[test]
    fn mutable_reference_points_at_the_original() {
        let mut counter = 10u32;
        let slot = &mut counter;

        let mut task = Task::borrowed_mut(move || slot);
        task.run();

        let reference = unsafe { task.into_mut::<u32>() };
        *reference += 5;

        assert_eq!(counter, 15);
    }

    #[test]
    fn shared_reference_keeps_the_address() {
        let label = String::from("owner");
        let mut task = Task::borrowed(|| &label);
        task.run();

        let reference = unsafe { task.into_ref::<String>() };

        assert!(std::ptr::eq(reference, &label));
    }

    #[test]
    fn unit_task_runs_side_effects() {
        let mut hits = 0;
        let mut task = Task::unit(|| hits += 1);

        task.run();
        task.into_unit();

        assert_eq!(hits, 1);
    }

    #[test]
    fn fire_and_forget_panics_escape_run() {
        let mut task = Task::fire_and_forget(|| panic!("escaped"));
        assert!(task.is_fire_and_forget());

        let payload = panic::catch_unwind(AssertUnwindSafe(|| task.run())).unwrap_err();

        assert_eq!(payload.downcast_ref::<&str>(), Some(&"escaped"));
        assert_eq!(task.state(), TaskState::Unwound);
    }

    #[test]
    #[should_panic(expected = "no-op task")]
    fn default_task_refuses_to_run() {
        let mut task = Task::default();
        assert_eq!(task.state(), TaskState::Empty);

        task.run();
    }

    #[test]
    #[should_panic(expected = "already executed")]
    fn tasks_run_only_once() {
        let mut task = Task::unit(|| {});

        task.run();
        task.run();
    }

    #[test]
    #[should_panic(expected = "not been executed")]
    fn retrieval_before_running_fails() {
        let task = Task::unit(|| {});

        task.into_unit();
    }

    #[test]
    #[should_panic(expected = "not unit")]
    fn retrieving_the_wrong_shape_fails() {
        let mut task = Task::value(|| 1u8);
        task.run();

        task.into_unit();
    }
}
