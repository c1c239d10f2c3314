//! Round-robin slots for per-frame GPU uploads
//!
//! Frame k writes and draws from slot `k % len`, so a slot is not written
//! again until `len - 1` later frames have been submitted.

pub const POSITION_RING_SIZE: usize = 3;

pub struct Ring<T> {
    slots: Vec<T>,
    current: usize,
}

impl<T> Ring<T> {
    /// Panics if `slots` is empty.
    pub fn new(slots: Vec<T>) -> Self {
        assert!(!slots.is_empty(), "ring needs at least one slot");
        Self { slots, current: 0 }
    }

    pub fn current(&self) -> &T {
        &self.slots[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.slots.len();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }
}
