//! Fixed-capacity single-producer, single-consumer byte queue.
//!
//! [`ByteChannel`] keeps one slot unused so that equal cursors always mean
//! empty; a channel of capacity `N` holds at most `N - 1` bytes. It is split
//! into a [`Producer`] and a [`Consumer`] handle, each of which is the only
//! writer of its own cursor:
//!
//! - the producer writes the slot at the write cursor, then publishes the
//!   advanced cursor with a single `Release` store
//! - the consumer reads the slot at the read cursor, then publishes the
//!   advanced cursor with a single `Release` store
//!
//! Each side only loads the other side's cursor (`Acquire`), so no cursor
//! update is ever observable half-done and no lock is needed. The handles may
//! live in different execution contexts (interrupt vs. main loop).
//!
//! No operation allocates or blocks.
//!
//! # Example
//!
//! ```
//! use tcd1304_core::ByteChannel;
//!
//! let mut channel = ByteChannel::<8>::new();
//! let (mut producer, mut consumer) = channel.split();
//!
//! assert_eq!(producer.write_bulk(b"STATUS\n"), 7);
//! assert!(producer.is_full());
//! assert_eq!(consumer.read(), Some(b'S'));
//! assert_eq!(consumer.available(), 6);
//! ```

use core::cell::UnsafeCell;
use core::marker::PhantomData;

use portable_atomic::{AtomicUsize, Ordering};

/// Circular byte queue with capacity `N` (usable space `N - 1`).
///
/// Any positive `N` works; powers of two keep the modulo cheap.
pub struct ByteChannel<const N: usize> {
    buffer: UnsafeCell<[u8; N]>,
    /// Write cursor, stored only by the producer.
    head: AtomicUsize,
    /// Read cursor, stored only by the consumer.
    tail: AtomicUsize,
}

// SAFETY: the producer only writes the slot at `head` before publishing it and
// the consumer only reads slots in `tail..head`, so the two handles never
// touch the same byte concurrently. `clear` and `split` need `&mut self`.
unsafe impl<const N: usize> Sync for ByteChannel<N> {}

impl<const N: usize> ByteChannel<N> {
    const NON_ZERO: () = assert!(N > 0, "ByteChannel capacity must be positive");

    /// Create an empty channel.
    #[must_use]
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_ZERO;
        Self {
            buffer: UnsafeCell::new([0; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Split into producer and consumer handles.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        let channel = &*self;
        (
            Producer {
                channel,
                _not_sync: PhantomData,
            },
            Consumer {
                channel,
                _not_sync: PhantomData,
            },
        )
    }

    /// Discard all contents.
    ///
    /// Requires exclusive access, so neither handle can be active.
    pub fn clear(&mut self) {
        *self.head.get_mut() = 0;
        *self.tail.get_mut() = 0;
    }

    /// Total slots, one of which always stays unused.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Bytes waiting to be read.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        used(head, tail, N)
    }

    /// Bytes that can still be written.
    #[inline]
    #[must_use]
    pub fn free_space(&self) -> usize {
        N - 1 - self.available()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        advance(self.head.load(Ordering::Acquire), 1, N) == self.tail.load(Ordering::Acquire)
    }

    #[inline]
    fn slot(&self, index: usize) -> *mut u8 {
        debug_assert!(index < N);
        // SAFETY: index < N keeps the pointer inside the array
        unsafe { self.buffer.get().cast::<u8>().add(index) }
    }
}

impl<const N: usize> Default for ByteChannel<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Occupied slots for the given cursors, wraparound included.
#[inline]
fn used(head: usize, tail: usize, capacity: usize) -> usize {
    (head + capacity - tail) % capacity
}

#[inline]
fn advance(cursor: usize, by: usize, capacity: usize) -> usize {
    (cursor + by) % capacity
}

/// Write side of a [`ByteChannel`].
pub struct Producer<'a, const N: usize> {
    channel: &'a ByteChannel<N>,
    // Movable to another context, but not shareable between two
    _not_sync: PhantomData<core::cell::Cell<()>>,
}

impl<const N: usize> Producer<'_, N> {
    /// Append one byte. Returns `false` if the channel is full.
    #[inline]
    pub fn write(&mut self, byte: u8) -> bool {
        let head = self.channel.head.load(Ordering::Relaxed);
        let next = advance(head, 1, N);
        if next == self.channel.tail.load(Ordering::Acquire) {
            return false;
        }
        // SAFETY: `head` is outside the consumer's readable range until the
        // store below publishes it
        unsafe { self.channel.slot(head).write(byte) };
        self.channel.head.store(next, Ordering::Release);
        true
    }

    /// Append bytes until the channel fills. Returns how many were written.
    pub fn write_bulk(&mut self, bytes: &[u8]) -> usize {
        let mut written = 0;
        for &byte in bytes {
            if !self.write(byte) {
                break;
            }
            written += 1;
        }
        written
    }

    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.channel.available()
    }

    #[inline]
    #[must_use]
    pub fn free_space(&self) -> usize {
        self.channel.free_space()
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.channel.is_full()
    }
}

/// Read side of a [`ByteChannel`].
pub struct Consumer<'a, const N: usize> {
    channel: &'a ByteChannel<N>,
    _not_sync: PhantomData<core::cell::Cell<()>>,
}

impl<const N: usize> Consumer<'_, N> {
    /// Remove and return the oldest byte.
    #[inline]
    pub fn read(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        let tail = self.channel.tail.load(Ordering::Relaxed);
        self.channel.tail.store(advance(tail, 1, N), Ordering::Release);
        Some(byte)
    }

    /// Return the oldest byte without removing it.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    /// Return the byte `offset` positions behind the oldest one.
    #[must_use]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        let tail = self.channel.tail.load(Ordering::Relaxed);
        let head = self.channel.head.load(Ordering::Acquire);
        if offset >= used(head, tail, N) {
            return None;
        }
        // SAFETY: the slot lies in the published range the producer won't touch
        Some(unsafe { self.channel.slot(advance(tail, offset, N)).read() })
    }

    /// Remove up to `buf.len()` bytes into `buf`. Returns how many were read.
    pub fn read_bulk(&mut self, buf: &mut [u8]) -> usize {
        let count = self.peek_bulk(buf);
        self.skip(count)
    }

    /// Copy up to `buf.len()` bytes into `buf` without removing them.
    pub fn peek_bulk(&self, buf: &mut [u8]) -> usize {
        let tail = self.channel.tail.load(Ordering::Relaxed);
        let head = self.channel.head.load(Ordering::Acquire);
        let count = used(head, tail, N).min(buf.len());
        for (offset, dst) in buf[..count].iter_mut().enumerate() {
            // SAFETY: offset < count <= published length
            *dst = unsafe { self.channel.slot(advance(tail, offset, N)).read() };
        }
        count
    }

    /// Drop up to `count` bytes. Returns how many were dropped.
    pub fn skip(&mut self, count: usize) -> usize {
        let tail = self.channel.tail.load(Ordering::Relaxed);
        let head = self.channel.head.load(Ordering::Acquire);
        let count = used(head, tail, N).min(count);
        self.channel
            .tail
            .store(advance(tail, count, N), Ordering::Release);
        count
    }

    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.channel.available()
    }

    #[inline]
    #[must_use]
    pub fn free_space(&self) -> usize {
        self.channel.free_space()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec;

    struct XorShift(u32);

    impl XorShift {
        fn next(&mut self) -> u32 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 17;
            self.0 ^= self.0 << 5;
            self.0
        }
    }

    #[test]
    fn test_new_channel_is_empty() {
        let channel = ByteChannel::<16>::new();
        assert!(channel.is_empty());
        assert!(!channel.is_full());
        assert_eq!(channel.available(), 0);
        assert_eq!(channel.free_space(), 15);
    }

    #[test]
    fn test_fifo_order() {
        let mut channel = ByteChannel::<16>::new();
        let (mut tx, mut rx) = channel.split();
        for b in b"abc" {
            assert!(tx.write(*b));
        }
        assert_eq!(rx.read(), Some(b'a'));
        assert_eq!(rx.read(), Some(b'b'));
        assert_eq!(rx.read(), Some(b'c'));
        assert_eq!(rx.read(), None);
    }

    #[test]
    fn test_one_slot_stays_unused() {
        let mut channel = ByteChannel::<4>::new();
        let (mut tx, _rx) = channel.split();
        assert!(tx.write(1));
        assert!(tx.write(2));
        assert!(tx.write(3));
        assert!(tx.is_full());
        assert!(!tx.write(4));
        assert_eq!(tx.available(), 3);
        assert_eq!(tx.free_space(), 0);
    }

    #[test]
    fn test_capacity_one_is_always_full() {
        let mut channel = ByteChannel::<1>::new();
        let (mut tx, rx) = channel.split();
        assert!(tx.is_full());
        assert!(!tx.write(0x55));
        assert!(rx.is_empty());
    }

    #[test]
    fn test_wraparound_with_odd_capacity() {
        let mut channel = ByteChannel::<5>::new();
        let (mut tx, mut rx) = channel.split();
        for round in 0..10u8 {
            assert_eq!(tx.write_bulk(&[round, round + 1, round + 2]), 3);
            assert_eq!(rx.available(), 3);
            let mut out = [0u8; 3];
            assert_eq!(rx.read_bulk(&mut out), 3);
            assert_eq!(out, [round, round + 1, round + 2]);
        }
    }

    #[test]
    fn test_write_bulk_stops_when_full() {
        let mut channel = ByteChannel::<8>::new();
        let (mut tx, mut rx) = channel.split();
        assert_eq!(tx.write_bulk(b"0123456789"), 7);
        let mut out = [0u8; 16];
        assert_eq!(rx.read_bulk(&mut out), 7);
        assert_eq!(&out[..7], b"0123456");
    }

    #[test]
    fn test_peek_is_non_destructive() {
        let mut channel = ByteChannel::<8>::new();
        let (mut tx, mut rx) = channel.split();
        assert_eq!(rx.peek(), None);
        tx.write_bulk(b"xy");
        assert_eq!(rx.peek(), Some(b'x'));
        assert_eq!(rx.peek_at(1), Some(b'y'));
        assert_eq!(rx.peek_at(2), None);
        assert_eq!(rx.available(), 2);

        let mut out = [0u8; 4];
        assert_eq!(rx.peek_bulk(&mut out), 2);
        assert_eq!(rx.available(), 2);
        assert_eq!(rx.skip(5), 2);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut channel = ByteChannel::<8>::new();
        {
            let (mut tx, _rx) = channel.split();
            tx.write_bulk(b"abc");
        }
        channel.clear();
        assert!(channel.is_empty());
        assert_eq!(channel.free_space(), 7);
    }

    #[test]
    fn test_random_ops_keep_invariants() {
        const N: usize = 32;
        let mut channel = ByteChannel::<N>::new();
        let (mut tx, mut rx) = channel.split();
        let mut rng = XorShift(0xDEAD_BEEF);
        let mut next_write = 0u8;
        let mut next_read = 0u8;

        for _ in 0..20_000 {
            let op = rng.next() % 4;
            let len = (rng.next() % 12) as usize;
            match op {
                0 => {
                    if tx.write(next_write) {
                        next_write = next_write.wrapping_add(1);
                    }
                }
                1 => {
                    let bytes: Vec<u8> =
                        (0..len).map(|i| next_write.wrapping_add(i as u8)).collect();
                    let written = tx.write_bulk(&bytes);
                    next_write = next_write.wrapping_add(written as u8);
                }
                2 => {
                    if let Some(b) = rx.read() {
                        assert_eq!(b, next_read);
                        next_read = next_read.wrapping_add(1);
                    }
                }
                _ => {
                    let mut out = [0u8; 12];
                    let read = rx.read_bulk(&mut out[..len]);
                    for &b in &out[..read] {
                        assert_eq!(b, next_read);
                        next_read = next_read.wrapping_add(1);
                    }
                }
            }
            assert_eq!(tx.available() + tx.free_space(), N - 1);
        }
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        const TOTAL: usize = 100_000;
        let mut channel = ByteChannel::<64>::new();
        let (mut tx, mut rx) = channel.split();

        std::thread::scope(|s| {
            s.spawn(move || {
                let mut sent = 0;
                while sent < TOTAL {
                    if tx.write(sent as u8) {
                        sent += 1;
                    } else {
                        std::thread::yield_now();
                    }
                }
            });

            let mut received = 0;
            while received < TOTAL {
                match rx.read() {
                    Some(b) => {
                        assert_eq!(b, received as u8);
                        received += 1;
                    }
                    None => std::thread::yield_now(),
                }
            }
        });
    }
}
