//! Outbound line queues and the flood controller that drains them.
//!
//! - [`queue`]: a single priority-tagged FIFO
//! - [`control`]: byte-budget pacing across several attached queues

mod control;
mod queue;

pub use control::{DECAY_PER_PULSE, FLOODBYTES, FloodControl, QueueId, penalty_amplifier};
pub use queue::Queue;

use crate::error::QueueError;

/// Common surface of anything lines can be queued on and drained from.
///
/// Both a plain [`Queue`] and the [`FloodControl`] in front of several of
/// them implement it, so the writer side only needs to know it is draining
/// an `OutputQueue`.
pub trait OutputQueue {
    /// Append a line.
    fn queue_item(&mut self, line: &str) -> Result<(), QueueError>;

    /// Queue a line ahead of everything already queued.
    fn queue_item_next(&mut self, line: &str) -> Result<(), QueueError>;

    /// The line [`OutputQueue::dequeue_item`] would return right now.
    fn peek_item(&self) -> Option<&str>;

    /// Remove and return the next line, if one may leave now.
    fn dequeue_item(&mut self) -> Option<String>;

    /// Number of lines available.
    fn queue_size(&self) -> usize;

    /// Drop all queued lines.
    fn flush(&mut self);
}

/// Queue classes a session attaches to its flood controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Housekeeping: PONG, keepalive PING, registration, auto-join.
    High = 0,
    /// Client traffic.
    Middle = 1,
    /// Bulk traffic that may wait behind everything else.
    Low = 2,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Middle, Priority::Low];

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}
