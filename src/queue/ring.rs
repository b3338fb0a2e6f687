//! Fixed-size circular storage
//!
//! `RingBuffer` is the storage behind both queue kinds. It is never shared:
//! the owning queue only touches it while holding its lock, so the ring itself
//! carries no synchronisation.

/// Fixed-length ring of optional slots with head/tail cursors
#[derive(Debug)]
pub struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    count: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty ring with `len` slots
    pub fn new(len: usize) -> Self {
        debug_assert!(len > 0, "ring length must be positive");
        let slots = std::iter::repeat_with(|| None).take(len).collect::<Vec<_>>();
        Self {
            slots: slots.into_boxed_slice(),
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Number of items present
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    /// Insert at the tail. Hands the item back if every slot is occupied.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        debug_assert!(self.slots[self.tail].is_none(), "tail slot must be vacant");
        self.slots[self.tail] = Some(item);
        self.tail = (self.tail + 1) % self.slots.len();
        self.count += 1;
        Ok(())
    }

    /// Remove from the head, leaving the vacated slot empty
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.head].take();
        debug_assert!(item.is_some(), "head slot must be occupied when count > 0");
        self.head = (self.head + 1) % self.slots.len();
        self.count -= 1;
        item
    }

    /// Replace the storage with a fresh ring of `new_len` slots holding the
    /// live items in logical order from slot 0.
    pub fn resize(&mut self, new_len: usize) {
        assert!(
            new_len >= self.count,
            "cannot resize ring holding {} items to {} slots",
            self.count,
            new_len
        );
        let mut next = Self::new(new_len);
        while let Some(item) = self.pop() {
            if next.push(item).is_err() {
                unreachable!("resized ring has room for every live item");
            }
        }
        debug_assert_eq!(next.head, 0);
        debug_assert_eq!(next.tail, next.count % new_len);
        *self = next;
    }

    /// Iterate live items in take order without removing them
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.count).filter_map(move |i| self.slots[(self.head + i) % self.slots.len()].as_ref())
    }

    #[cfg(test)]
    pub(crate) fn cursors(&self) -> (usize, usize) {
        (self.head, self.tail)
    }

    #[cfg(test)]
    pub(crate) fn occupied_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
