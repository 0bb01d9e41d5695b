//! No-std decimal formatting for response lines.
//!
//! Writes numbers directly to byte buffers without heap allocation or
//! `core::fmt` machinery.

/// Maximum number of decimal digits in a `u32` ("4294967295").
pub const MAX_U32_DIGITS: usize = 10;

/// Write a u32 as an unsigned decimal string.
///
/// Returns the number of bytes written (1-10 bytes).
///
/// # Panics
///
/// Panics if `buf` is shorter than the number of digits.
#[inline]
pub fn write_u32(buf: &mut [u8], value: u32) -> usize {
    if value == 0 {
        buf[0] = b'0';
        return 1;
    }

    // Digits come out least significant first
    let mut temp = [0u8; MAX_U32_DIGITS];
    let mut n = value;
    let mut len = 0;
    while n > 0 {
        temp[len] = b'0' + (n % 10) as u8;
        n /= 10;
        len += 1;
    }

    for (dst, src) in buf[..len].iter_mut().zip(temp[..len].iter().rev()) {
        *dst = *src;
    }
    len
}

/// Parse the leading decimal digits of `text`.
///
/// Leading ASCII whitespace and a single `+` are skipped, digits are read
/// until the first non-digit, and the result saturates at `u32::MAX`. Text
/// without leading digits (including negative numbers) yields zero.
#[must_use]
pub fn parse_leading_u32(text: &[u8]) -> u32 {
    let mut rest = text;
    while let Some((first, tail)) = rest.split_first() {
        if !first.is_ascii_whitespace() {
            break;
        }
        rest = tail;
    }
    if let Some((b'+', tail)) = rest.split_first() {
        rest = tail;
    }

    rest.iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0u32, |acc, &b| {
            acc.saturating_mul(10).saturating_add(u32::from(b - b'0'))
        })
}
