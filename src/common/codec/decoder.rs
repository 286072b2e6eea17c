use encoding_rs::{Encoding, SHIFT_JIS, UTF_8, WINDOWS_1252};

use crate::common::{
    bit_utils::BitReader,
    codec::{Mode, MODE_INDICATOR_BITS},
    error::{BarcodeError, BarcodeResult},
    metadata::Version,
};

/// Raw bytes of a QR data stream and the ECI it announced, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Vec<u8>,
    pub eci: Option<u32>,
}

impl Payload {
    /// Text in the announced charset, or a best guess when none was announced
    /// or the charset isn't one we know.
    pub fn text(&self) -> String {
        match self.eci.and_then(eci_encoding) {
            Some(enc) => enc.decode_without_bom_handling(&self.bytes).0.into_owned(),
            None => decode_text(&self.bytes),
        }
    }
}

// Decoder
//------------------------------------------------------------------------------

/// Unpacks every segment up to the terminator. Bits left after the terminator
/// are padding and ignored.
pub fn decode(data: &[u8], ver: Version) -> BarcodeResult<Payload> {
    let mut inp = BitReader::new(data);
    let mut res = Payload { bytes: Vec::with_capacity(data.len()), eci: None };
    loop {
        match read_segment(&mut inp, ver, &mut res.bytes)? {
            Segmented::Data => {}
            Segmented::Eci(n) => {
                log::trace!("Data stream announces ECI {n}");
                // First designator wins; later ones would need per segment charsets
                res.eci.get_or_insert(n);
            }
            Segmented::End => return Ok(res),
        }
    }
}

/// Best effort text for a payload: UTF-8 when valid, then Shift JIS, then
/// Windows-1252 which maps every byte.
pub fn decode_text(payload: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(payload) {
        return text.to_string();
    }
    let (text, _, has_err) = SHIFT_JIS.decode(payload);
    if !has_err {
        return text.into_owned();
    }
    WINDOWS_1252.decode(payload).0.into_owned()
}

fn eci_encoding(eci: u32) -> Option<&'static Encoding> {
    match eci {
        // ISO-8859-1 is a subset of Windows-1252 for printable chars
        1 | 3 => Some(WINDOWS_1252),
        20 => Some(SHIFT_JIS),
        26 => Some(UTF_8),
        _ => None,
    }
}

// Segments
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segmented {
    Data,
    Eci(u32),
    End,
}

fn read_segment(inp: &mut BitReader, ver: Version, out: &mut Vec<u8>) -> BarcodeResult<Segmented> {
    // A terminator may be cut short when the symbol is full
    let Some(indicator) = inp.read(MODE_INDICATOR_BITS) else {
        return Ok(Segmented::End);
    };
    let mode = Mode::from_bits(indicator as u16)?;
    match mode {
        Mode::Terminator => return Ok(Segmented::End),
        Mode::Eci => return read_eci(inp).map(Segmented::Eci),
        _ => {}
    }

    let count = inp.read(ver.char_cnt_bits(mode)).ok_or(BarcodeError::InvalidPayload)? as usize;
    let per_chunk = match mode {
        Mode::Numeric => 3,
        Mode::Alphanumeric => 2,
        _ => 1,
    };
    let mut left = count;
    while left > 0 {
        let chars = left.min(per_chunk);
        let width = mode.encoded_len(chars);
        let chunk = inp.read(width).ok_or(BarcodeError::InvalidPayload)?;
        match mode {
            Mode::Byte => out.push(chunk as u8),
            _ => out.extend(mode.decode_chunk(chunk as u16, width)?),
        }
        left -= chars;
    }
    Ok(Segmented::Data)
}

// Designator width is flagged by its leading bits: 0, 10 or 110
fn read_eci(inp: &mut BitReader) -> BarcodeResult<u32> {
    let first = inp.read(8).ok_or(BarcodeError::InvalidPayload)?;
    let (extra, value) = match (first as u8).leading_ones() {
        0 => (0, first),
        1 => (8, first & 0x3f),
        2 => (16, first & 0x1f),
        _ => return Err(BarcodeError::InvalidPayload),
    };
    let rest = inp.read(extra).ok_or(BarcodeError::InvalidPayload)?;
    Ok((value << extra) | rest)
}
