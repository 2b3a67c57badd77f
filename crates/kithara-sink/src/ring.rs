//! Fixed-capacity FIFO used to hand payloads from the producer to the worker.

/// Bounded ring buffer of payloads.
///
/// Capacity is counted in items, not bytes. The buffer is not synchronized;
/// [`Sink`](crate::Sink) keeps it behind its state mutex.
#[derive(Debug)]
pub struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    count: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer. `capacity` is clamped to at least one slot.
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity.max(1)).map(|_| None).collect();
        Self {
            slots,
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of buffered items.
    pub fn available(&self) -> usize {
        self.count
    }

    pub fn free(&self) -> usize {
        self.capacity() - self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Append `item` at the tail.
    ///
    /// # Errors
    ///
    /// Hands `item` back untouched when the buffer is full.
    pub fn write(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.slots[self.tail] = Some(item);
        self.tail = (self.tail + 1) % self.capacity();
        self.count += 1;
        Ok(())
    }

    /// Take the oldest item, or `None` when empty.
    pub fn try_read(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.count -= 1;
        item
    }

    /// Drop every buffered item and return how many there were.
    pub fn clear(&mut self) -> usize {
        let dropped = self.count;
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.tail = 0;
        self.count = 0;
        dropped
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn fifo_order_across_wraparound() {
        let mut ring = RingBuffer::new(3);
        ring.write(1).unwrap();
        ring.write(2).unwrap();
        assert_eq!(ring.try_read(), Some(1));
        ring.write(3).unwrap();
        ring.write(4).unwrap();
        assert!(ring.is_full());

        let drained: Vec<_> = std::iter::from_fn(|| ring.try_read()).collect();
        assert_eq!(drained, vec![2, 3, 4]);
        assert!(ring.is_empty());
    }

    #[test]
    fn overrun_returns_item_and_keeps_state() {
        let mut ring = RingBuffer::new(2);
        ring.write("a").unwrap();
        ring.write("b").unwrap();

        assert_eq!(ring.write("c"), Err("c"));
        assert_eq!(ring.available(), 2);
        assert_eq!(ring.try_read(), Some("a"));
        assert_eq!(ring.try_read(), Some("b"));
        assert_eq!(ring.try_read(), None);
    }

    #[test]
    fn read_from_empty_does_not_block() {
        let mut ring: RingBuffer<u8> = RingBuffer::new(4);
        assert_eq!(ring.try_read(), None);
        assert_eq!(ring.available(), 0);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(8, 8)]
    fn capacity_is_at_least_one(#[case] requested: usize, #[case] expected: usize) {
        let ring: RingBuffer<()> = RingBuffer::new(requested);
        assert_eq!(ring.capacity(), expected);
        assert_eq!(ring.free(), expected);
    }

    #[test]
    fn clear_drops_everything() {
        let mut ring = RingBuffer::new(4);
        for i in 0..3 {
            ring.write(i).unwrap();
        }
        assert_eq!(ring.clear(), 3);
        assert!(ring.is_empty());
        assert_eq!(ring.free(), 4);
        ring.write(9).unwrap();
        assert_eq!(ring.try_read(), Some(9));
    }

    #[test]
    fn count_stays_within_bounds() {
        let mut ring = RingBuffer::new(3);
        for round in 0..10 {
            let _ = ring.write(round);
            assert!(ring.available() <= ring.capacity());
            if round % 3 == 0 {
                ring.try_read();
            }
        }
        assert_eq!(ring.available(), 2);
    }
}
