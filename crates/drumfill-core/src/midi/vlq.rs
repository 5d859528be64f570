//! Variable-length quantities: 7 bits per byte, big-endian, MSB = continuation

use super::{DecodeError, EncodingError};

/// Largest value a 4-byte quantity can carry (2^28 - 1)
pub const VLQ_MAX: u32 = 0x0FFF_FFFF;

/// Append `value` to `out`
pub fn write_vlq(out: &mut Vec<u8>, value: u32) -> Result<(), EncodingError> {
    if value > VLQ_MAX {
        return Err(EncodingError::VarIntOverflow(value));
    }

    let mut groups = [0u8; 4];
    let mut len = 0;
    let mut rest = value;
    loop {
        groups[len] = (rest & 0x7F) as u8;
        len += 1;
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }

    for i in (0..len).rev() {
        let continuation = if i > 0 { 0x80 } else { 0 };
        out.push(groups[i] | continuation);
    }
    Ok(())
}

pub fn encode_vlq(value: u32) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::with_capacity(4);
    write_vlq(&mut out, value)?;
    Ok(out)
}

/// Decode one quantity from the front of `data`; returns (value, bytes read)
pub fn decode_vlq(data: &[u8]) -> Result<(u32, usize), DecodeError> {
    let mut value = 0u32;
    for (i, &byte) in data.iter().enumerate() {
        if i == 4 {
            return Err(DecodeError::VarIntTooLong);
        }
        value = (value << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if data.len() >= 4 {
        return Err(DecodeError::VarIntTooLong);
    }
    Err(DecodeError::UnexpectedEof)
}
