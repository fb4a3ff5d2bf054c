//! Priority-tagged line queue.

use super::OutputQueue;
use crate::error::QueueError;

/// Compact once at least this many dequeued slots have piled up.
const COMPACT_THRESHOLD: usize = 32;

#[derive(Debug, Clone)]
struct QueueItem {
    line: String,
    priority: u32,
    valid: bool,
}

/// A FIFO of outbound lines with per-item priority.
///
/// Items normally share priority 0 and leave in insertion order.
/// [`Queue::push_next`] demotes everything already queued so the new line
/// leaves first. Dequeued items are only marked invalid; the backing
/// vector is compacted lazily.
#[derive(Debug, Default, Clone)]
pub struct Queue {
    items: Vec<QueueItem>,
    dead: usize,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line.
    pub fn push(&mut self, line: impl Into<String>) {
        self.items.push(QueueItem {
            line: line.into(),
            priority: 0,
            valid: true,
        });
    }

    /// Queue a line ahead of everything currently queued.
    pub fn push_next(&mut self, line: impl Into<String>) {
        for item in self.items.iter_mut().filter(|i| i.valid) {
            item.priority += 1;
        }
        self.push(line);
    }

    fn next_index(&self) -> Option<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.valid)
            .min_by_key(|(index, item)| (item.priority, *index))
            .map(|(index, _)| index)
    }

    /// The line [`Queue::pop`] would return.
    pub fn peek(&self) -> Option<&str> {
        self.next_index().map(|i| self.items[i].line.as_str())
    }

    /// Remove and return the next line.
    pub fn pop(&mut self) -> Option<String> {
        let index = self.next_index()?;
        let item = &mut self.items[index];
        item.valid = false;
        let line = std::mem::take(&mut item.line);

        self.dead += 1;
        if self.dead == self.items.len() {
            self.items.clear();
            self.dead = 0;
        } else if self.dead >= COMPACT_THRESHOLD && self.dead * 2 > self.items.len() {
            self.items.retain(|i| i.valid);
            self.dead = 0;
        }

        Some(line)
    }

    /// Number of queued lines.
    pub fn len(&self) -> usize {
        self.items.len() - self.dead
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every queued line.
    pub fn clear(&mut self) {
        self.items.clear();
        self.dead = 0;
    }
}

impl OutputQueue for Queue {
    fn queue_item(&mut self, line: &str) -> Result<(), QueueError> {
        self.push(line);
        Ok(())
    }

    fn queue_item_next(&mut self, line: &str) -> Result<(), QueueError> {
        self.push_next(line);
        Ok(())
    }

    fn peek_item(&self) -> Option<&str> {
        self.peek()
    }

    fn dequeue_item(&mut self) -> Option<String> {
        self.pop()
    }

    fn queue_size(&self) -> usize {
        self.len()
    }

    fn flush(&mut self) {
        self.clear();
    }
}
