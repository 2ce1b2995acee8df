//! Canonical hex dump rendering used by `Stream::dump`

use std::fmt::Write;

const BYTES_PER_ROW: usize = 16;

/// Render `data` as offset, hex column and printable-ASCII column rows
///
/// ```
/// use rust_stream_logger::core::hexdump::render;
///
/// assert_eq!(
///     render(b"Hello"),
///     "00000000  48 65 6c 6c 6f                                    |Hello|"
/// );
/// ```
#[must_use]
pub fn render(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(BYTES_PER_ROW) * 79);

    for (row, chunk) in data.chunks(BYTES_PER_ROW).enumerate() {
        if row > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{:08x}  ", row * BYTES_PER_ROW);
        for i in 0..BYTES_PER_ROW {
            match chunk.get(i) {
                Some(b) => {
                    let _ = write!(out, "{:02x} ", b);
                }
                None => out.push_str("   "),
            }
            if i == 7 {
                out.push(' ');
            }
        }
        out.push_str(" |");
        out.extend(chunk.iter().map(|&b| {
            if (32..=126).contains(&b) {
                b as char
            } else {
                '.'
            }
        }));
        out.push('|');
    }
    out
}
