use std::collections::VecDeque;

pub const DEFAULT_RAW_BUFFER_CAPACITY: usize = 10_000;

/// Most recent received bytes, oldest dropped first.
#[derive(Debug)]
pub struct RawBuffer {
    bytes: VecDeque<u8>,
    capacity: usize,
}

impl Default for RawBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_RAW_BUFFER_CAPACITY)
    }
}

impl RawBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        if self.capacity == 0 {
            return;
        }
        let chunk = &chunk[chunk.len().saturating_sub(self.capacity)..];
        let overflow = (self.bytes.len() + chunk.len()).saturating_sub(self.capacity);
        self.bytes.drain(..overflow);
        self.bytes.extend(chunk);
    }

    // Up to `max` of the newest bytes, in arrival order.
    pub fn tail(&self, max: usize) -> Vec<u8> {
        let skip = self.bytes.len().saturating_sub(max);
        self.bytes.iter().skip(skip).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}
