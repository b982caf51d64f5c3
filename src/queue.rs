//! Bounded byte FIFO shared between the serial receive path (producer) and
//! the parser (consumer).
//!
//! Every operation locks the whole queue for its duration via a
//! `critical-section` mutex, mirroring the "lock held for the entire op"
//! discipline of the structure this is grounded on. The queue never
//! allocates: capacity is a const generic and the backing array is part of
//! the struct.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// Default queue capacity: at least 3x a maximally-sized scan packet
/// (10 + 2*255 bytes), as recommended for tolerating bursty reads.
pub const DEFAULT_CAPACITY: usize = 360;

struct Inner<const N: usize> {
    buf: [u8; N],
    head: usize,
    tail: usize,
    count: usize,
}

impl<const N: usize> Inner<N> {
    const fn new() -> Self {
        Self {
            buf: [0u8; N],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    fn wrap(&self, index: usize) -> usize {
        index % N
    }
}

/// Bounded ring buffer of bytes, safe to share between one producer and one
/// consumer context (interrupt-safe via a `critical-section` mutex).
pub struct ByteQueue<const N: usize> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Inner<N>>>,
}

impl<const N: usize> ByteQueue<N> {
    /// Creates an empty queue of capacity `N`.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner::new())),
        }
    }

    /// Appends one byte. Returns `false` (byte dropped) when the queue is
    /// full.
    pub fn push(&self, byte: u8) -> bool {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            if inner.count < N {
                let tail = inner.tail;
                inner.buf[tail] = byte;
                inner.tail = inner.wrap(tail + 1);
                inner.count += 1;
                true
            } else {
                false
            }
        })
    }

    /// Appends a run of bytes atomically. Succeeds only if
    /// `count + bytes.len() < N` (strict, preserving a one-slot margin, as
    /// in the source this is grounded on); otherwise nothing is appended.
    pub fn push_slice(&self, bytes: &[u8]) -> bool {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            if inner.count + bytes.len() < N {
                for &b in bytes {
                    let tail = inner.tail;
                    inner.buf[tail] = b;
                    inner.tail = inner.wrap(tail + 1);
                }
                inner.count += bytes.len();
                true
            } else {
                false
            }
        })
    }

    /// Returns the byte at logical offset `index` from the head (0 =
    /// oldest). Callers must ensure `index < len()`; out of range is a
    /// caller bug, debug-asserted rather than silently defaulted.
    pub fn peek(&self, index: usize) -> u8 {
        self.inner.lock(|cell| {
            let inner = cell.borrow();
            debug_assert!(index < inner.count, "ByteQueue::peek index out of range");
            inner.buf[inner.wrap(inner.head + index)]
        })
    }

    /// Discards the `count` oldest bytes. No-op when `count` exceeds the
    /// queue's length.
    pub fn drop_front(&self, count: usize) {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            if count <= inner.count {
                inner.head = inner.wrap(inner.head + count);
                inner.count -= count;
            }
        });
    }

    /// Copies the `count` oldest bytes into `dst` in order and advances the
    /// head. Returns `false` and leaves the queue unchanged if
    /// `count > len()`.
    pub fn extract(&self, dst: &mut [u8], count: usize) -> bool {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            if count > inner.count {
                return false;
            }

            let head = inner.head;
            if head + count <= N {
                dst[..count].copy_from_slice(&inner.buf[head..head + count]);
            } else {
                let first_part = N - head;
                dst[..first_part].copy_from_slice(&inner.buf[head..N]);
                dst[first_part..count].copy_from_slice(&inner.buf[..count - first_part]);
            }

            inner.head = inner.wrap(head + count);
            inner.count -= count;
            true
        })
    }

    /// Discards all queued bytes.
    pub fn clear(&self) {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            inner.head = inner.tail;
            inner.count = 0;
        });
    }

    /// Number of bytes currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock(|cell| cell.borrow().count)
    }

    /// Fixed capacity of the queue.
    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == N
    }
}

impl<const N: usize> Default for ByteQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_peek_preserve_fifo_order() {
        let q: ByteQueue<8> = ByteQueue::new();
        assert!(q.push(1));
        assert!(q.push(2));
        assert!(q.push(3));
        assert_eq!(q.len(), 3);
        assert_eq!(q.peek(0), 1);
        assert_eq!(q.peek(1), 2);
        assert_eq!(q.peek(2), 3);
    }

    #[test]
    fn push_fails_when_full() {
        let q: ByteQueue<4> = ByteQueue::new();
        for b in 0..4 {
            assert!(q.push(b));
        }
        assert!(q.is_full());
        assert!(!q.push(99));
        assert_eq!(q.len(), 4);
    }

    #[test]
    fn push_slice_preserves_one_slot_margin() {
        let q: ByteQueue<4> = ByteQueue::new();
        // count(0) + 4 is not < 4, so this must be rejected entirely.
        assert!(!q.push_slice(&[1, 2, 3, 4]));
        assert_eq!(q.len(), 0);
        // count(0) + 3 < 4 succeeds.
        assert!(q.push_slice(&[1, 2, 3]));
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn extract_advances_head_and_reports_new_len() {
        let q: ByteQueue<8> = ByteQueue::new();
        q.push_slice(&[10, 20, 30, 40]);
        let mut dst = [0u8; 2];
        assert!(q.extract(&mut dst, 2));
        assert_eq!(dst, [10, 20]);
        assert_eq!(q.len(), 2);
        assert_eq!(q.peek(0), 30);
    }

    #[test]
    fn extract_rejects_when_not_enough_data() {
        let q: ByteQueue<8> = ByteQueue::new();
        q.push_slice(&[1, 2]);
        let mut dst = [0u8; 3];
        assert!(!q.extract(&mut dst, 3));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn wraparound_extract_matches_non_wrapping_contents() {
        let q: ByteQueue<4> = ByteQueue::new();
        // Push and drop to advance head/tail near the end of the ring.
        q.push_slice(&[1, 2, 3]);
        let mut scratch = [0u8; 3];
        q.extract(&mut scratch, 3);
        // head == tail == 3 now; next pushes wrap.
        q.push_slice(&[4, 5, 6]);
        let mut dst = [0u8; 3];
        assert!(q.extract(&mut dst, 3));
        assert_eq!(dst, [4, 5, 6]);
    }

    #[test]
    fn drop_front_is_noop_past_len() {
        let q: ByteQueue<8> = ByteQueue::new();
        q.push_slice(&[1, 2, 3]);
        q.drop_front(10);
        assert_eq!(q.len(), 3);
        q.drop_front(1);
        assert_eq!(q.len(), 2);
        assert_eq!(q.peek(0), 2);
    }

    #[test]
    fn clear_resets_to_empty() {
        let q: ByteQueue<8> = ByteQueue::new();
        q.push_slice(&[1, 2, 3]);
        q.clear();
        assert!(q.is_empty());
        assert!(q.push(42));
        assert_eq!(q.peek(0), 42);
    }
}
