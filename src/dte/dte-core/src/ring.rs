use crate::constants::CHANNEL_SIZE;

/// Fixed-capacity circular buffer with one producer cursor and one consumer cursor
///
/// One slot is always left empty so that a full ring (`(tail + 1) % N == head`) can be told
/// apart from an empty one (`tail == head`); a ring of `N` slots holds at most `N - 1` items.
/// The slot at the tail can be filled in place over several activations and only published
/// with [`Ring::commit`], and the item at the head can be worked on in place before it is
/// released with [`Ring::retire`].
pub struct Ring<T, const N: usize> {
    slots: [T; N],
    head: usize, // Next slot to consume
    tail: usize, // Next slot to fill
}

/// Byte channel used for every character stream in the front end
pub type Channel = Ring<u8, CHANNEL_SIZE>;

impl<T: Default, const N: usize> Ring<T, N> {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| T::default()),
            head: 0,
            tail: 0,
        }
    }
}

impl<T: Default, const N: usize> Default for Ring<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Ring<T, N> {
    fn advance(idx: usize) -> usize {
        (idx + 1) % N
    }

    pub fn capacity(&self) -> usize {
        N - 1
    }

    pub fn len(&self) -> usize {
        (self.tail + N - self.head) % N
    }

    /// Free slots left before the ring reports full
    pub fn room(&self) -> usize {
        self.capacity() - self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        Self::advance(self.tail) == self.head
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Appends an item, handing it back if the ring is full
    pub fn push(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        self.slots[self.tail] = value;
        self.tail = Self::advance(self.tail);
        Ok(())
    }

    /// The unpublished slot at the tail, if there is room for it
    pub fn vacant_mut(&mut self) -> Option<&mut T> {
        if self.is_full() {
            None
        } else {
            Some(&mut self.slots[self.tail])
        }
    }

    /// Publishes the slot returned by [`Ring::vacant_mut`]
    pub fn commit(&mut self) {
        if !self.is_full() {
            self.tail = Self::advance(self.tail);
        }
    }

    pub fn front(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            Some(&self.slots[self.head])
        }
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            None
        } else {
            Some(&mut self.slots[self.head])
        }
    }

    /// Releases the item at the head
    pub fn retire(&mut self) {
        if !self.is_empty() {
            self.head = Self::advance(self.head);
        }
    }

    /// Resets both cursors; slot contents are left behind and overwritten later
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }
}

impl<T: Copy, const N: usize> Ring<T, N> {
    pub fn peek(&self) -> Option<T> {
        self.front().copied()
    }

    pub fn pop(&mut self) -> Option<T> {
        let value = self.peek()?;
        self.retire();
        Some(value)
    }
}

#[cfg(test)]
mod ring_tests {
    use super::*;

    #[test]
    fn test_one_slot_kept_empty() {
        let mut ring: Ring<u8, 4> = Ring::new();
        assert!(ring.push(1).is_ok());
        assert!(ring.push(2).is_ok());
        assert!(ring.push(3).is_ok());
        assert!(ring.is_full());
        assert_eq!(ring.push(4), Err(4));
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.room(), 0);
    }

    #[test]
    fn test_fifo_across_wraparound() {
        let mut ring: Ring<u8, 4> = Ring::new();
        let mut expected = 0u8;
        for value in 0..20u8 {
            ring.push(value).unwrap();
            if ring.len() == 2 {
                assert_eq!(ring.pop(), Some(expected));
                expected += 1;
            }
        }
        while let Some(value) = ring.pop() {
            assert_eq!(value, expected);
            expected += 1;
        }
        assert_eq!(expected, 20);
    }

    #[test]
    fn test_vacant_slot_published_on_commit() {
        let mut ring: Ring<[u16; 2], 4> = Ring::new();
        ring.vacant_mut().unwrap()[0] = 7;
        assert!(ring.is_empty());
        ring.vacant_mut().unwrap()[1] = 9;
        ring.commit();
        assert_eq!(ring.front(), Some(&[7, 9]));
    }

    #[test]
    fn test_head_worked_in_place() {
        let mut ring: Ring<u32, 8> = Ring::new();
        ring.push(1).unwrap();
        ring.push(2).unwrap();
        *ring.front_mut().unwrap() += 10;
        assert_eq!(ring.pop(), Some(11));
        ring.retire();
        ring.retire();
        assert!(ring.is_empty());
    }

    #[test]
    fn test_full_channel_holds_255_bytes() {
        let mut channel = Channel::new();
        let mut accepted = 0;
        for ch in 0..=255u8 {
            if channel.push(ch).is_ok() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 255);
        channel.clear();
        assert!(channel.is_empty());
        assert_eq!(channel.head(), 0);
    }
}
