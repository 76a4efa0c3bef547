//! Specialized collection types

pub use slotmap::{new_key_type, Key, KeyData, SecondaryMap, SlotMap};

/// Recycling free list for object pooling
///
/// Released items are kept (up to `capacity`) and handed back out by
/// [`FreeList::acquire`] before anything new is allocated.
#[derive(Debug)]
pub struct FreeList<T> {
    items: Vec<T>,
    capacity: usize,
    reused: u64,
    allocated: u64,
}

impl<T> FreeList<T> {
    /// Create a new free list that keeps at most `capacity` released items
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
            reused: 0,
            allocated: 0,
        }
    }

    /// Take a pooled item, or build a fresh one with `make`
    pub fn acquire(&mut self, make: impl FnOnce() -> T) -> T {
        if let Some(item) = self.items.pop() {
            self.reused += 1;
            item
        } else {
            self.allocated += 1;
            make()
        }
    }

    /// Return an item to the pool; dropped if the pool is full
    pub fn release(&mut self, item: T) {
        if self.items.len() < self.capacity {
            self.items.push(item);
        }
    }

    /// Number of pooled items waiting for reuse
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing is pooled
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// How many acquisitions were served from the pool
    pub fn reused(&self) -> u64 {
        self.reused
    }

    /// How many acquisitions needed a fresh allocation
    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    /// Drop every pooled item
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T> Default for FreeList<T> {
    fn default() -> Self {
        Self::with_capacity(256)
    }
}
