use std::io::{Read, Write};

use ndarray::Array2;

use crate::error::Result;

const SCALAR_BYTES: usize = std::mem::size_of::<f64>();

/// Write the raw row-major payload of `m` as little-endian `f64`s. No shape is
/// recorded; the reader has to know it.
pub fn write_matrix<W: Write + ?Sized>(m: &Array2<f64>, writer: &mut W) -> Result<()> {
    let mut buf = Vec::with_capacity(m.len() * SCALAR_BYTES);
    for v in m.iter() {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    writer.write_all(&buf)?;
    Ok(())
}

/// Fill `m` from a payload written by `write_matrix`.
pub fn read_matrix<R: Read + ?Sized>(m: &mut Array2<f64>, reader: &mut R) -> Result<()> {
    let mut buf = vec![0u8; m.len() * SCALAR_BYTES];
    reader.read_exact(&mut buf)?;
    for (v, bytes) in m.iter_mut().zip(buf.chunks_exact(SCALAR_BYTES)) {
        let mut raw = [0u8; SCALAR_BYTES];
        raw.copy_from_slice(bytes);
        *v = f64::from_le_bytes(raw);
    }
    Ok(())
}
