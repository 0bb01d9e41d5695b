//! Outgoing link trait.

/// The physical send path behind a [`Transport`](crate::Transport).
///
/// This abstracts the USB (or other) endpoint that actually moves bytes to
/// the host, so the transport can be exercised on a host with a mock.
///
/// # Contract
///
/// - `transmit` either accepts the whole slice or rejects it. It never
///   accepts part of it.
/// - An accepted slice is copied (or fully sent) before `transmit` returns;
///   the caller may reuse the memory immediately.
/// - After accepting, the link signals completion exactly once through
///   [`SendComplete::on_link_send_complete`](crate::SendComplete::on_link_send_complete).
///   A synchronous link may do so before `transmit` returns.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait Link {
    /// Hand `bytes` to the link. Returns `false` if the link refused them.
    fn transmit(&mut self, bytes: &[u8]) -> bool;
}

impl<L: Link + ?Sized> Link for &mut L {
    #[inline]
    fn transmit(&mut self, bytes: &[u8]) -> bool {
        (**self).transmit(bytes)
    }
}
