//! Hex-dump formatting collaborator used by the demo CLI to print flash dumps and
//! captured buffers. Not part of the core control plane (§1 "out of scope").

use std::io::{self, Write};

/// Sixteen bytes per row: an offset column, a hex byte column, and an ASCII sidebar
/// (non-printable bytes shown as `.`), matching the vendor SDK's own dump format.
pub fn dump_hex<W: Write>(mut out: W, buf: &[u8]) -> io::Result<()> {
    writeln!(out, "Dumping {} bytes at {:p}", buf.len(), buf.as_ptr())?;
    for (row, chunk) in buf.chunks(16).enumerate() {
        write!(out, "{:16x}: ", row * 16)?;
        for j in 0..16 {
            match chunk.get(j) {
                Some(byte) => write!(out, "{:02x} ", byte)?,
                None => write!(out, "   ")?,
            }
        }
        write!(out, " |")?;
        for j in 0..16 {
            match chunk.get(j) {
                Some(&byte) if byte.is_ascii_graphic() || byte == b' ' => {
                    write!(out, "{}", byte as char)?
                }
                Some(_) => write!(out, ".")?,
                None => write!(out, " ")?,
            }
        }
        writeln!(out, "|")?;
    }
    Ok(())
}
