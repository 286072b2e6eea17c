use super::tables::{checksum, CodeSet, CODE_A, CODE_B, CODE_C, FNC1, FNC2, FNC3, SHIFT};
use crate::common::error::{BarcodeError, BarcodeResult};

// Group separator emitted for FNC1 past the leading position
const GS: u8 = 0x1d;

// Decoder
//------------------------------------------------------------------------------

/// Decodes codewords from start through checksum, stop excluded, into data
/// bytes. A leading FNC1 marks GS1 data and isn't emitted.
pub fn decode(values: &[u8]) -> BarcodeResult<(Vec<u8>, bool)> {
    let (&start, rest) = values.split_first().ok_or(BarcodeError::InvalidPayload)?;
    let (&check, data) = rest.split_last().ok_or(BarcodeError::InvalidPayload)?;
    let mut set = CodeSet::from_start(start).ok_or(BarcodeError::InvalidPayload)?;

    let expected = checksum(&values[..values.len() - 1]);
    if expected != check {
        log::debug!("Code128 checksum mismatch: Expected {expected}, Found {check}");
        return Err(BarcodeError::ChecksumMismatch);
    }

    let mut res = Vec::with_capacity(data.len() * 2);
    let mut gs1 = false;
    let mut shift = false;
    let mut extend = false;
    for (i, &v) in data.iter().enumerate() {
        let active = match shift {
            true if set == CodeSet::A => CodeSet::B,
            true => CodeSet::A,
            false => set,
        };
        shift = false;

        match (active, v) {
            (_, FNC1) if i == 0 => gs1 = true,
            (_, FNC1) => res.push(GS),
            (_, FNC2 | FNC3) if active != CodeSet::C => {}
            (CodeSet::C, 0..=99) => {
                res.push(b'0' + v / 10);
                res.push(b'0' + v % 10);
            }
            (_, 0..=95) => {
                let byte = active.byte(v);
                res.push(if extend { byte | 0x80 } else { byte });
                extend = false;
            }
            (CodeSet::A | CodeSet::B, SHIFT) => shift = true,
            (CodeSet::A, CODE_A) | (CodeSet::B, CODE_B) => extend = true,
            (_, CODE_A) => set = CodeSet::A,
            (_, CODE_B) => set = CodeSet::B,
            (_, CODE_C) => set = CodeSet::C,
            _ => return Err(BarcodeError::InvalidPayload),
        }
    }

    log::debug!("Decoded {} Code128 codewords into {} bytes", values.len(), res.len());
    Ok((res, gs1))
}
