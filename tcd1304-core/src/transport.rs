//! Byte transport between the link layer and the polled loop.
//!
//! A [`TransportState`] owns an inbound and an outbound [`ByteChannel`], the
//! bulk-send flag and the traffic counters. Splitting it yields one handle per
//! execution context:
//!
//! | handle | context | touches |
//! |---|---|---|
//! | [`LinkReceiver`] | link event | inbound producer, rx counters |
//! | [`SendComplete`] | link event | bulk-send flag (clear only) |
//! | [`Transport`] | polled loop | inbound consumer, outbound channel, tx counters |
//!
//! Small responses are queued through the outbound channel and drained in
//! [`CHUNK_SIZE`] pieces by [`Transport::process`]. Frames bypass the queue
//! through [`Transport::send_bulk`]. At most one hand-off to the link is in
//! flight at any time, whichever path it came from.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::link::Link;
use crate::ring::{ByteChannel, Consumer, Producer};

/// Largest piece of queued output handed to the link in one call.
pub const CHUNK_SIZE: usize = 64;

/// Default inbound channel capacity.
pub const RX_BUFFER_SIZE: usize = 256;

/// Default outbound channel capacity.
pub const TX_BUFFER_SIZE: usize = 512;

/// Error type for transport operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Empty buffer or empty payload.
    InvalidInput,
    /// A hand-off to the link is still in flight.
    Busy,
    /// Line longer than the caller's buffer.
    Overflow,
    /// The link refused the payload.
    Rejected,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid input"),
            Self::Busy => write!(f, "link busy"),
            Self::Overflow => write!(f, "line too long"),
            Self::Rejected => write!(f, "rejected by link"),
        }
    }
}

/// Snapshot of the cumulative traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportStats {
    /// Bytes accepted into the inbound channel.
    pub rx_bytes: u32,
    /// Bytes queued for, or handed in bulk to, the link.
    pub tx_bytes: u32,
    /// Link deliveries that did not fit completely.
    pub rx_overflows: u32,
    /// Writes that did not fit completely.
    pub tx_overflows: u32,
}

struct Counters {
    rx_bytes: AtomicU32,
    tx_bytes: AtomicU32,
    rx_overflows: AtomicU32,
    tx_overflows: AtomicU32,
}

impl Counters {
    const fn new() -> Self {
        Self {
            rx_bytes: AtomicU32::new(0),
            tx_bytes: AtomicU32::new(0),
            rx_overflows: AtomicU32::new(0),
            tx_overflows: AtomicU32::new(0),
        }
    }

    fn snapshot(&self) -> TransportStats {
        TransportStats {
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            tx_bytes: self.tx_bytes.load(Ordering::Relaxed),
            rx_overflows: self.rx_overflows.load(Ordering::Relaxed),
            tx_overflows: self.tx_overflows.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.rx_bytes.store(0, Ordering::Relaxed);
        self.tx_bytes.store(0, Ordering::Relaxed);
        self.rx_overflows.store(0, Ordering::Relaxed);
        self.tx_overflows.store(0, Ordering::Relaxed);
    }
}

/// Counter increment for a byte count; counters wrap on overflow.
#[inline]
fn count(bytes: usize) -> u32 {
    bytes as u32
}

/// Backing storage for a transport, split into per-context handles.
///
/// Usually placed in a `static` (through `StaticCell`) so the handles are
/// `'static` and can be moved into tasks.
pub struct TransportState<const RX: usize = RX_BUFFER_SIZE, const TX: usize = TX_BUFFER_SIZE> {
    rx: ByteChannel<RX>,
    tx: ByteChannel<TX>,
    tx_busy: AtomicBool,
    counters: Counters,
}

impl<const RX: usize, const TX: usize> TransportState<RX, TX> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rx: ByteChannel::new(),
            tx: ByteChannel::new(),
            tx_busy: AtomicBool::new(false),
            counters: Counters::new(),
        }
    }

    /// Drop everything buffered in both directions and forget any in-flight
    /// hand-off. Counters are kept.
    pub fn clear(&mut self) {
        self.rx.clear();
        self.tx.clear();
        *self.tx_busy.get_mut() = false;
    }

    /// Split into the link-side handles and the polled-loop handle.
    pub fn split<L: Link>(
        &mut self,
        link: L,
    ) -> (LinkReceiver<'_, RX>, SendComplete<'_>, Transport<'_, L, RX, TX>) {
        let Self {
            rx,
            tx,
            tx_busy,
            counters,
        } = self;
        let tx_busy: &AtomicBool = tx_busy;
        let counters: &Counters = counters;
        let (rx_in, rx_out) = rx.split();
        let (tx_in, tx_out) = tx.split();

        (
            LinkReceiver {
                rx: rx_in,
                counters,
            },
            SendComplete { tx_busy },
            Transport {
                rx: rx_out,
                tx_in,
                tx_out,
                tx_busy,
                counters,
                link,
            },
        )
    }
}

impl<const RX: usize, const TX: usize> Default for TransportState<RX, TX> {
    fn default() -> Self {
        Self::new()
    }
}

/// Inbound side, driven by the link layer.
pub struct LinkReceiver<'a, const RX: usize = RX_BUFFER_SIZE> {
    rx: Producer<'a, RX>,
    counters: &'a Counters,
}

impl<const RX: usize> LinkReceiver<'_, RX> {
    /// Queue newly arrived bytes. Bytes that do not fit are dropped.
    ///
    /// Returns the number of bytes accepted.
    pub fn receive_from_link(&mut self, bytes: &[u8]) -> usize {
        let accepted = self.rx.write_bulk(bytes);
        self.counters
            .rx_bytes
            .fetch_add(count(accepted), Ordering::Relaxed);
        if accepted < bytes.len() {
            self.counters.rx_overflows.fetch_add(1, Ordering::Relaxed);
            warn!(
                "rx overflow: dropped {} of {} bytes",
                bytes.len() - accepted,
                bytes.len()
            );
        }
        accepted
    }

    /// Space left in the inbound channel.
    #[must_use]
    pub fn free_space(&self) -> usize {
        self.rx.free_space()
    }
}

/// Completion notifier handed to the link layer.
#[derive(Clone, Copy)]
pub struct SendComplete<'a> {
    tx_busy: &'a AtomicBool,
}

impl SendComplete<'_> {
    /// Mark the in-flight hand-off as finished.
    #[inline]
    pub fn on_link_send_complete(&self) {
        self.tx_busy.store(false, Ordering::Release);
    }
}

/// Polled-loop handle: reads commands, queues responses, drives the link.
pub struct Transport<'a, L, const RX: usize = RX_BUFFER_SIZE, const TX: usize = TX_BUFFER_SIZE>
{
    rx: Consumer<'a, RX>,
    tx_in: Producer<'a, TX>,
    tx_out: Consumer<'a, TX>,
    tx_busy: &'a AtomicBool,
    counters: &'a Counters,
    link: L,
}

impl<L: Link, const RX: usize, const TX: usize> Transport<'_, L, RX, TX> {
    /// Bytes waiting in the inbound channel.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.rx.available()
    }

    #[inline]
    pub fn read_byte(&mut self) -> Option<u8> {
        self.rx.read()
    }

    /// Read up to `buf.len()` inbound bytes.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        self.rx.read_bulk(buf)
    }

    /// Read one line terminated by `\n`, `\r` or `\r\n`.
    ///
    /// The content is copied into `buf` followed by a NUL byte, so at most
    /// `buf.len() - 1` content bytes fit. Returns `Ok(Some(len))` with the
    /// content length once a full line is buffered and `Ok(None)` if it has
    /// not arrived yet; nothing is consumed in the latter case.
    ///
    /// A `\r` that is the last buffered byte is taken as a complete
    /// terminator; a `\n` arriving after it reads back as an empty line.
    ///
    /// # Errors
    ///
    /// - [`TransportError::InvalidInput`] if `buf` is empty.
    /// - [`TransportError::Overflow`] if the line does not fit in `buf`, or
    ///   the inbound channel is full with no terminator in it. As many bytes
    ///   as fit are consumed into `buf`; the rest of the line stays buffered
    ///   and the caller has to resynchronize.
    pub fn read_line(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        let max = buf.len().checked_sub(1).ok_or(TransportError::InvalidInput)?;
        let available = self.rx.available();
        let scan = available.min(max + 1);
        let terminator =
            (0..scan).find(|&i| matches!(self.rx.peek_at(i), Some(b'\n' | b'\r')));

        match terminator {
            Some(len) => {
                let copied = self.rx.read_bulk(&mut buf[..len]);
                if self.rx.read() == Some(b'\r') && self.rx.peek() == Some(b'\n') {
                    self.rx.skip(1);
                }
                buf[copied] = 0;
                Ok(Some(copied))
            }
            None if available > max || self.rx.free_space() == 0 => {
                let take = available.min(max);
                let copied = self.rx.read_bulk(&mut buf[..take]);
                buf[copied] = 0;
                warn!("line exceeds {} bytes", max);
                Err(TransportError::Overflow)
            }
            None => Ok(None),
        }
    }

    /// Queue one byte. Returns `false` if the outbound channel is full.
    pub fn write_byte(&mut self, byte: u8) -> bool {
        self.write(&[byte]) == 1
    }

    /// Queue as many bytes as fit. Returns how many were accepted.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let accepted = self.tx_in.write_bulk(bytes);
        self.counters
            .tx_bytes
            .fetch_add(count(accepted), Ordering::Relaxed);
        if accepted < bytes.len() {
            self.counters.tx_overflows.fetch_add(1, Ordering::Relaxed);
            warn!(
                "tx overflow: dropped {} of {} bytes",
                bytes.len() - accepted,
                bytes.len()
            );
        }
        accepted
    }

    pub fn write_str(&mut self, text: &str) -> usize {
        self.write(text.as_bytes())
    }

    /// Hand `bytes` straight to the link, bypassing the outbound channel.
    ///
    /// The full length is added to `tx_bytes` as soon as the link accepts.
    ///
    /// # Errors
    ///
    /// - [`TransportError::InvalidInput`] if `bytes` is empty.
    /// - [`TransportError::Busy`] if a hand-off is still in flight.
    /// - [`TransportError::Rejected`] if the link refused; nothing was sent.
    pub fn send_bulk(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if bytes.is_empty() {
            return Err(TransportError::InvalidInput);
        }
        if self.tx_busy.swap(true, Ordering::AcqRel) {
            return Err(TransportError::Busy);
        }
        if !self.link.transmit(bytes) {
            self.tx_busy.store(false, Ordering::Release);
            debug!("link rejected {} byte bulk send", bytes.len());
            return Err(TransportError::Rejected);
        }
        self.counters
            .tx_bytes
            .fetch_add(count(bytes.len()), Ordering::Relaxed);
        Ok(())
    }

    /// Move up to [`CHUNK_SIZE`] queued bytes to the link.
    ///
    /// Does nothing while a hand-off is in flight. A rejected chunk stays at
    /// the front of the outbound channel and is retried on the next call.
    /// Returns the number of bytes the link accepted.
    pub fn process(&mut self) -> usize {
        if self.tx_busy.load(Ordering::Acquire) || self.tx_out.is_empty() {
            return 0;
        }

        let mut chunk = [0u8; CHUNK_SIZE];
        let len = self.tx_out.peek_bulk(&mut chunk);

        // Set before transmit: a synchronous link may complete inside the call.
        self.tx_busy.store(true, Ordering::Release);
        if self.link.transmit(&chunk[..len]) {
            self.tx_out.skip(len);
            trace!("sent {} byte chunk", len);
            len
        } else {
            self.tx_busy.store(false, Ordering::Release);
            debug!("link rejected {} byte chunk", len);
            0
        }
    }

    /// Whether a hand-off to the link is in flight.
    #[inline]
    #[must_use]
    pub fn is_tx_busy(&self) -> bool {
        self.tx_busy.load(Ordering::Acquire)
    }

    /// Bytes queued and not yet handed to the link.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tx_out.available()
    }

    #[must_use]
    pub fn stats(&self) -> TransportStats {
        self.counters.snapshot()
    }

    pub fn reset_stats(&mut self) {
        self.counters.reset();
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}
