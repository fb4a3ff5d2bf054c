//! Byte-budget flood controller.
//!
//! Servers disconnect clients that send too much too fast. The controller
//! sits in front of the upstream socket, drains attached queues in priority
//! order, and refuses to release a line while the recent byte count is
//! close to [`FLOODBYTES`]. The count decays by [`DECAY_PER_PULSE`] every
//! second.

use tracing::trace;

use super::{OutputQueue, Queue};
use crate::error::QueueError;

/// Byte budget the controller paces against.
pub const FLOODBYTES: usize = 450;

/// Bytes forgiven per one-second pulse.
pub const DECAY_PER_PULSE: usize = 75;

/// Commands that cost more than their length.
const PENALTIES: &[(&str, usize)] = &[("MODE", 2), ("KICK", 2), ("WHO", 2)];

/// Cost multiplier for a line, keyed on its first token.
pub fn penalty_amplifier(line: &str) -> usize {
    let command = line.split(' ').next().unwrap_or("");
    PENALTIES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(command))
        .map_or(1, |(_, amplifier)| *amplifier)
}

/// Handle to a queue attached to a [`FloodControl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueId(usize);

#[derive(Debug)]
struct Attached {
    priority: u32,
    queue: Queue,
}

/// Drains attached queues subject to a decaying byte budget.
#[derive(Debug)]
pub struct FloodControl {
    queues: Vec<Attached>,
    bytes: usize,
    control: bool,
    /// Minimum seconds between releases while control is on.
    wait: i64,
    last_release: Option<i64>,
    /// Second of the last decay pulse, while the decay timer runs.
    decay_from: Option<i64>,
    now: i64,
}

impl FloodControl {
    pub fn new(now: i64) -> Self {
        Self {
            queues: Vec::new(),
            bytes: 0,
            control: true,
            wait: 0,
            last_release: None,
            decay_from: None,
            now,
        }
    }

    /// Require `secs` seconds between released lines.
    #[must_use]
    pub fn with_wait(mut self, secs: u64) -> Self {
        self.wait = i64::try_from(secs).unwrap_or(i64::MAX);
        self
    }

    /// Attach a new empty queue drained at `priority` (0 is drained first).
    pub fn attach_queue(&mut self, priority: u32) -> QueueId {
        self.queues.push(Attached {
            priority,
            queue: Queue::new(),
        });
        QueueId(self.queues.len() - 1)
    }

    /// Mutable access to an attached queue.
    pub fn queue_mut(&mut self, id: QueueId) -> &mut Queue {
        &mut self.queues[id.0].queue
    }

    pub fn queue(&self, id: QueueId) -> &Queue {
        &self.queues[id.0].queue
    }

    /// Recent byte count.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn is_enabled(&self) -> bool {
        self.control
    }

    pub fn enable(&mut self) {
        self.control = true;
    }

    /// Turn pacing off; lines are then released unconditionally.
    pub fn disable(&mut self) {
        self.control = false;
    }

    /// Total lines across attached queues.
    pub fn real_queue_size(&self) -> usize {
        self.queues.iter().map(|a| a.queue.len()).sum()
    }

    /// Whether the decay timer is running.
    pub fn is_decaying(&self) -> bool {
        self.decay_from.is_some()
    }

    /// Advance the clock, applying one decay pulse per elapsed second.
    pub fn tick(&mut self, now: i64) {
        self.now = now;
        while let Some(from) = self.decay_from {
            if now - from < 1 {
                break;
            }
            self.decay_from = Some(from + 1);
            if !self.pulse() {
                self.decay_from = None;
            }
        }
    }

    /// One decay step. Returns `false` once there is nothing left to decay
    /// or send, which stops the timer.
    pub fn pulse(&mut self) -> bool {
        self.bytes -= self.bytes.min(DECAY_PER_PULSE);
        self.real_queue_size() > 0 || self.bytes > 0
    }

    fn next_queue(&self) -> Option<usize> {
        self.queues
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.queue.is_empty())
            .min_by_key(|(index, a)| (a.priority, *index))
            .map(|(index, _)| index)
    }

    /// Whether the next line may go out now.
    fn releasable(&self) -> Option<usize> {
        if self.control {
            if self.bytes > FLOODBYTES - 100 {
                return None;
            }
            if let Some(last) = self.last_release
                && self.now - last < self.wait
            {
                return None;
            }
        }

        let index = self.next_queue()?;
        let line = self.queues[index].queue.peek()?;

        if self.control && line.len() + self.bytes > FLOODBYTES - 150 && self.bytes > FLOODBYTES / 4
        {
            return None;
        }

        Some(index)
    }

    /// Set the recent byte count directly (used when resuming a paced link).
    pub fn set_bytes(&mut self, bytes: usize) {
        self.bytes = bytes;
        if self.control && bytes > 0 && self.decay_from.is_none() {
            self.decay_from = Some(self.now);
        }
    }
}

impl OutputQueue for FloodControl {
    fn queue_item(&mut self, _line: &str) -> Result<(), QueueError> {
        Err(QueueError::Unsupported("FloodControl"))
    }

    fn queue_item_next(&mut self, _line: &str) -> Result<(), QueueError> {
        Err(QueueError::Unsupported("FloodControl"))
    }

    fn peek_item(&self) -> Option<&str> {
        let index = self.releasable()?;
        self.queues[index].queue.peek()
    }

    fn dequeue_item(&mut self) -> Option<String> {
        let index = self.releasable()?;
        let line = self.queues[index].queue.pop()?;

        if self.control {
            let cost = line.len() * penalty_amplifier(&line);
            self.bytes += cost;
            if self.decay_from.is_none() {
                self.decay_from = Some(self.now);
            }
            trace!(cost, bytes = self.bytes, "Released line under flood control");
        }
        self.last_release = Some(self.now);

        Some(line)
    }

    /// 1 when a line could be released now, else 0.
    fn queue_size(&self) -> usize {
        usize::from(self.releasable().is_some())
    }

    fn flush(&mut self) {
        for attached in &mut self.queues {
            attached.queue.clear();
        }
    }
}
