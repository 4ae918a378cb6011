//! Pending actuation backlog.
//!
//! Strict FIFO, no reordering, no deduplication.  Only the supervisor pops;
//! only the controller's message intake enqueues; `Stop` clears.

use heapless::Deque;

use crate::error::QueueError;

use super::commands::Command;

/// Maximum number of commands waiting behind the running actuation.
pub const QUEUE_CAPACITY: usize = 16;

#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Deque<Command, QUEUE_CAPACITY>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail.  A full backlog rejects the new command and
    /// keeps everything already queued.
    pub fn enqueue(&mut self, cmd: Command) -> Result<(), QueueError> {
        self.pending.push_back(cmd).map_err(|_| QueueError::Full)
    }

    /// Remove and return the oldest command.
    pub fn pop_front(&mut self) -> Result<Command, QueueError> {
        self.pending.pop_front().ok_or(QueueError::Empty)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[cfg(test)]
    pub fn peek(&self) -> Option<&Command> {
        self.pending.front()
    }
}
