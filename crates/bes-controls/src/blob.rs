//! Fixed-size little-endian f64 restart blobs.

use crate::error::{ControlError, ControlResult};

pub(crate) const F64_BYTES: usize = 8;

pub(crate) fn write_f64s(buf: &mut Vec<u8>, values: &[f64]) {
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

pub(crate) fn read_f64s<const N: usize>(
    controller: &'static str,
    buf: &[u8],
) -> ControlResult<[f64; N]> {
    if buf.len() != N * F64_BYTES {
        return Err(ControlError::BlobSize {
            controller,
            expected: N * F64_BYTES,
            actual: buf.len(),
        });
    }
    let mut out = [0.0; N];
    for (value, chunk) in out.iter_mut().zip(buf.chunks_exact(F64_BYTES)) {
        let mut bytes = [0_u8; F64_BYTES];
        bytes.copy_from_slice(chunk);
        *value = f64::from_le_bytes(bytes);
    }
    Ok(out)
}
