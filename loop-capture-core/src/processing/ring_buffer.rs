/// Fixed-capacity circular buffer of `N` slots.
///
/// Not internally synchronized: exactly one writer and one reader, serialized
/// by the caller. The pipeline wraps it in `Arc<parking_lot::Mutex<..>>` so
/// the push path can write from an engine callback thread.
///
/// Overflow behavior: overwrite-oldest. Writing into a full buffer advances
/// `tail` together with `head`, discarding the oldest unread element.
///
/// Full and empty both have `head == tail`; an explicit live count tells them
/// apart, so all `N` slots are usable.
#[derive(Debug)]
pub struct RingBuffer<T, const N: usize> {
    buffer: Box<[T]>,
    head: usize,
    tail: usize,
    len: usize,
    total_written: u64,
    total_overwritten: u64,
}

impl<T: Copy + Default, const N: usize> RingBuffer<T, N> {
    const NON_EMPTY: () = assert!(N > 0, "ring buffer capacity must be non-zero");

    pub fn new() -> Self {
        let () = Self::NON_EMPTY;
        Self {
            buffer: vec![T::default(); N].into_boxed_slice(),
            head: 0,
            tail: 0,
            len: 0,
            total_written: 0,
            total_overwritten: 0,
        }
    }

    /// Copy every element of `samples`, in order, into successive slots.
    ///
    /// Returns how many unread elements were evicted to make room.
    pub fn write(&mut self, samples: &[T]) -> usize {
        let mut evicted = 0;
        for &sample in samples {
            self.buffer[self.head] = sample;
            self.head = (self.head + 1) % N;
            if self.len == N {
                self.tail = (self.tail + 1) % N;
                evicted += 1;
            } else {
                self.len += 1;
            }
        }
        self.total_written += samples.len() as u64;
        self.total_overwritten += evicted as u64;
        evicted
    }

    /// Fill `out` from the read cursor, advancing it once per element.
    ///
    /// There is no under-run check: once live data runs out the remaining
    /// elements are whatever the slots last held. Indexing stays in bounds
    /// and the buffer is left empty.
    pub fn read(&mut self, out: &mut [T]) {
        for slot in out.iter_mut() {
            *slot = self.buffer[self.tail];
            self.tail = (self.tail + 1) % N;
            if self.len > 0 {
                self.len -= 1;
            } else {
                self.head = self.tail;
            }
        }
    }

    /// Like [`read`](Self::read) but stops at the live count.
    ///
    /// Returns the number of elements copied into `out`.
    pub fn read_available(&mut self, out: &mut [T]) -> usize {
        let count = out.len().min(self.len);
        self.read(&mut out[..count]);
        count
    }

    /// Read and remove up to `count` live elements.
    pub fn drain(&mut self, count: usize) -> Vec<T> {
        let mut result = vec![T::default(); count.min(self.len)];
        self.read(&mut result);
        result
    }

    /// Number of unread elements.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Elements written since construction or the last reset.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Unread elements evicted since construction or the last reset.
    pub fn total_overwritten(&self) -> u64 {
        self.total_overwritten
    }

    /// Reset to the empty state. Slot contents are left in place.
    pub fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
        self.total_written = 0;
        self.total_overwritten = 0;
    }
}

impl<T: Copy + Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_write_read() {
        let mut buf = RingBuffer::<f32, 10>::new();
        buf.write(&[1.0, 2.0, 3.0]);

        assert_eq!(buf.len(), 3);
        assert_eq!(buf.drain(3), vec![1.0, 2.0, 3.0]);
        assert!(buf.is_empty());
    }

    #[test]
    fn fifo_under_capacity() {
        for count in 0..=8 {
            let mut buf = RingBuffer::<i32, 8>::new();
            let written: Vec<i32> = (100..100 + count).collect();
            assert_eq!(buf.write(&written), 0);

            let mut out = vec![0; written.len()];
            buf.read(&mut out);
            assert_eq!(out, written, "count {}", count);
        }
    }

    #[test]
    fn overwrite_keeps_last_n() {
        let mut buf = RingBuffer::<i32, 4>::new();
        let written: Vec<i32> = (1..=7).collect();

        let evicted = buf.write(&written);

        assert_eq!(evicted, 3);
        assert!(buf.is_full());
        let mut out = [0; 4];
        buf.read(&mut out);
        assert_eq!(out, [4, 5, 6, 7]);
        assert_eq!(buf.total_overwritten(), 3);
    }

    #[test]
    fn eviction_counts_live_elements_only() {
        let mut buf = RingBuffer::<i32, 5>::new();
        buf.write(&[1, 2, 3]);

        let mut first = [0; 2];
        buf.read(&mut first);
        assert_eq!(first, [1, 2]);

        // 3 is still live; 4, 5, 6 fit beside it
        assert_eq!(buf.write(&[4, 5, 6]), 0);
        assert_eq!(buf.len(), 4);

        // The sixth live element evicts 3
        assert_eq!(buf.write(&[7, 8]), 1);
        assert_eq!(buf.drain(5), vec![4, 5, 6, 7, 8]);
    }

    #[test]
    fn wraparound() {
        let mut buf = RingBuffer::<f32, 4>::new();

        buf.write(&[1.0, 2.0, 3.0]);
        buf.drain(2);

        buf.write(&[4.0, 5.0, 6.0]); // wraps around

        assert_eq!(buf.len(), 4);
        assert_eq!(buf.drain(4), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn write_larger_than_capacity() {
        let mut buf = RingBuffer::<f32, 3>::new();
        let evicted = buf.write(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(evicted, 2);
        assert_eq!(buf.drain(3), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn read_past_live_data_stays_in_bounds() {
        let mut buf = RingBuffer::<i32, 3>::new();
        buf.write(&[1, 2]);

        let mut out = [0; 7];
        buf.read(&mut out);

        // Two live, then stale slots cycling through the storage
        assert_eq!(&out[..2], &[1, 2]);
        assert!(buf.is_empty());

        // Still usable as a FIFO afterwards
        buf.write(&[9, 10]);
        assert_eq!(buf.drain(10), vec![9, 10]);
    }

    #[test]
    fn read_available_stops_at_live_count() {
        let mut buf = RingBuffer::<i32, 6>::new();
        buf.write(&[1, 2, 3]);

        let mut out = [0; 5];
        assert_eq!(buf.read_available(&mut out), 3);
        assert_eq!(&out[..3], &[1, 2, 3]);
        assert_eq!(buf.read_available(&mut out), 0);
    }

    #[test]
    fn reset_clears_buffer() {
        let mut buf = RingBuffer::<f32, 10>::new();
        buf.write(&[1.0, 2.0, 3.0]);
        buf.reset();

        assert!(buf.is_empty());
        assert_eq!(buf.total_written(), 0);
        assert!(buf.drain(10).is_empty());
    }

    #[test]
    fn empty_operations() {
        let mut buf = RingBuffer::<f32, 10>::new();

        assert!(buf.is_empty());
        assert!(buf.drain(5).is_empty());
        assert_eq!(buf.write(&[]), 0);
        assert_eq!(buf.capacity(), 10);
    }
}
