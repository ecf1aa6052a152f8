use crate::sys::Envelope;
use std::collections::vec_deque::Drain;
use std::collections::VecDeque;

/// FIFO of work waiting for the owner thread.
pub(crate) struct Scheduler {
    queue: VecDeque<Envelope>,
    closed: bool,
}

impl Scheduler {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let queue = VecDeque::with_capacity(capacity);

        Self {
            queue,
            closed: false,
        }
    }

    /// Queues `envelope`, handing it back if the loop no longer accepts work.
    #[inline]
    pub(crate) fn spawn(&mut self, envelope: Envelope) -> Result<(), Envelope> {
        if self.closed {
            return Err(envelope);
        }

        self.queue.push_back(envelope);
        Ok(())
    }

    #[inline]
    pub(crate) fn fetch_next_task_for_tick(&mut self) -> Option<Envelope> {
        self.queue.pop_front()
    }

    /// Stops accepting work. Returns `false` if the queue was already closed.
    pub(crate) fn close(&mut self) -> bool {
        !std::mem::replace(&mut self.closed, true)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn drain(&mut self) -> Drain<'_, Envelope> {
        self.queue.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::Scheduler;
    use crate::sys::Envelope;
    use crate::task::Task;
    use std::sync::{Arc, Mutex};

    fn recording(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> Envelope {
        let log = log.clone();

        Envelope::Owned(Task::fire_and_forget(move || log.lock().unwrap().push(value)))
    }

    #[test]
    fn hands_out_work_in_submission_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::with_capacity(4);

        for value in 0..3 {
            assert!(scheduler.spawn(recording(&log, value)).is_ok());
        }

        while let Some(Envelope::Owned(mut task)) = scheduler.fetch_next_task_for_tick() {
            task.run();
        }

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn closed_scheduler_rejects_new_work() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::with_capacity(1);

        assert!(scheduler.close());
        assert!(!scheduler.close());
        assert!(scheduler.is_closed());

        let rejected = scheduler.spawn(recording(&log, 1));

        assert!(matches!(rejected, Err(Envelope::Owned(_))));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn closing_keeps_already_queued_work() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = Scheduler::with_capacity(2);

        assert!(scheduler.spawn(recording(&log, 1)).is_ok());
        scheduler.close();

        assert_eq!(scheduler.drain().count(), 1);
    }
}
