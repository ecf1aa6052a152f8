use thiserror::Error;

/// Failures reported by an owner loop when it cannot take or finish a task.
///
/// Panics raised by the dispatched closures are never turned into a
/// `DispatchError`; they are re-raised on the calling thread instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The owner loop has been shut down and no longer accepts tasks.
    #[error("owner loop is closed")]
    Closed,

    /// The loop was torn down after accepting a blocking task but before running it.
    #[error("owner loop dropped the task before running it")]
    Abandoned,

    /// A blocking post was attempted from the owner thread itself.
    #[error("blocking post from the owner thread would deadlock")]
    WouldDeadlock,
}
