use crate::common::{
    error::{BarcodeError, BarcodeResult},
    metadata::Version,
};

// Mode
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Mode {
    Numeric = 0b0001,
    Alphanumeric = 0b0010,
    Byte = 0b0100,
    Kanji = 0b1000,
    Eci = 0b0111,
    Terminator = 0b0000,
}

impl Mode {
    pub fn from_bits(bits: u16) -> BarcodeResult<Self> {
        match bits {
            0b0000 => Ok(Self::Terminator),
            0b0001 => Ok(Self::Numeric),
            0b0010 => Ok(Self::Alphanumeric),
            0b0100 => Ok(Self::Byte),
            0b0111 => Ok(Self::Eci),
            0b1000 => Ok(Self::Kanji),
            _ => Err(BarcodeError::InvalidPayload),
        }
    }

    #[inline]
    fn numeric_digit(char: u8) -> u16 {
        debug_assert!(Mode::Numeric.contains(char), "Invalid numeric data: {char}");
        (char - b'0') as u16
    }

    #[inline]
    fn alphanumeric_digit(char: u8) -> u16 {
        debug_assert!(Mode::Alphanumeric.contains(char), "Invalid alphanumeric data: {char}");
        match char {
            b'0'..=b'9' => (char - b'0') as u16,
            b'A'..=b'Z' => (char - b'A' + 10) as u16,
            _ => ALPHANUMERIC_SYMBOLS.iter().position(|&s| s == char).map_or(0, |p| p as u16 + 36),
        }
    }

    fn alphanumeric_byte(digit: u16) -> BarcodeResult<u8> {
        match digit {
            0..=9 => Ok(digit as u8 + b'0'),
            10..=35 => Ok(digit as u8 - 10 + b'A'),
            36..=44 => Ok(ALPHANUMERIC_SYMBOLS[digit as usize - 36]),
            _ => Err(BarcodeError::InvalidPayload),
        }
    }

    pub fn encode_chunk(&self, data: &[u8]) -> u16 {
        let len = data.len();
        match self {
            Self::Numeric => {
                debug_assert!(len <= 3, "Data is too long for numeric conversion: {len}");
                data.iter().fold(0_u16, |n, b| n * 10 + Self::numeric_digit(*b))
            }
            Self::Alphanumeric => {
                debug_assert!(len <= 2, "Data is too long for alphanumeric conversion: {len}");
                data.iter().fold(0_u16, |n, b| n * 45 + Self::alphanumeric_digit(*b))
            }
            Self::Byte => {
                debug_assert!(len == 1, "Data is too long for byte conversion: {len}");
                data[0] as u16
            }
            Self::Kanji => {
                debug_assert!(len == 2, "Kanji chars are two Shift JIS bytes: {len}");
                Self::kanji_value(data[0], data[1]).unwrap_or_default()
            }
            Self::Eci | Self::Terminator => unreachable!("Headers carry no chunked data"),
        }
    }

    /// 13 bit Kanji mode value of a Shift JIS double byte char, or None when
    /// the pair lies outside the two ranges Kanji mode covers.
    pub fn kanji_value(hi: u8, lo: u8) -> Option<u16> {
        if !(0x40..=0xfc).contains(&lo) || lo == 0x7f {
            return None;
        }
        let code = u16::from_be_bytes([hi, lo]);
        let offset = match code {
            0x8140..=0x9ffc => 0x8140,
            0xe040..=0xebbf => 0xc140,
            _ => return None,
        };
        let rel = code - offset;
        Some((rel >> 8) * 0xc0 + (rel & 0xff))
    }

    /// Unpacks one chunk of `bit_len` bits back into bytes. Kanji chunks unpack
    /// into a two byte Shift JIS character.
    pub fn decode_chunk(&self, data: u16, bit_len: usize) -> BarcodeResult<Vec<u8>> {
        match self {
            Self::Numeric => Self::decode_numeric_chunk(data, bit_len),
            Self::Alphanumeric => Self::decode_alphanumeric_chunk(data, bit_len),
            Self::Byte => Ok(vec![data as u8]),
            Self::Kanji => Ok(Self::decode_kanji_chunk(data)),
            Self::Eci | Self::Terminator => Err(BarcodeError::InvalidPayload),
        }
    }

    fn decode_numeric_chunk(mut data: u16, bit_len: usize) -> BarcodeResult<Vec<u8>> {
        let len = bit_len / 3;
        if data >= 10u16.pow(len as u32) {
            return Err(BarcodeError::InvalidPayload);
        }
        let mut res = vec![0; len];
        for i in 0..len {
            res[len - 1 - i] = (data % 10) as u8 + b'0';
            data /= 10;
        }
        Ok(res)
    }

    fn decode_alphanumeric_chunk(mut data: u16, bit_len: usize) -> BarcodeResult<Vec<u8>> {
        let len = bit_len / 5;
        let mut res = vec![0; len];
        for i in 0..len {
            res[len - 1 - i] = Self::alphanumeric_byte(data % 45)?;
            data /= 45;
        }
        if data > 0 {
            return Err(BarcodeError::InvalidPayload);
        }
        Ok(res)
    }

    fn decode_kanji_chunk(data: u16) -> Vec<u8> {
        let msbyte = data / 0xc0;
        let lsbyte = data % 0xc0;
        let temp = ((msbyte << 8) | lsbyte) + 0x8140;
        let sjw = if temp <= 0x9ffc { temp } else { temp + 0x4000 };

        vec![(sjw >> 8) as u8, (sjw & 0xff) as u8]
    }

    pub fn contains(&self, byte: u8) -> bool {
        match self {
            Self::Numeric => byte.is_ascii_digit(),
            Self::Alphanumeric => {
                byte.is_ascii_digit() || byte.is_ascii_uppercase() || ALPHANUMERIC_SYMBOLS.contains(&byte)
            }
            Self::Byte => true,
            Self::Kanji | Self::Eci | Self::Terminator => false,
        }
    }

    // Bits needed to encode `len` characters
    pub fn encoded_len(&self, len: usize) -> usize {
        match *self {
            Self::Numeric => (len * 10).div_ceil(3),
            Self::Alphanumeric => (len * 11).div_ceil(2),
            Self::Byte => len * 8,
            Self::Kanji => len * 13,
            Self::Eci | Self::Terminator => 0,
        }
    }
}


// Segment
//------------------------------------------------------------------------------

/// Run of payload bytes encoded in one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    pub mode: Mode,
    pub data: &'a [u8],
}

impl<'a> Segment<'a> {
    pub fn new(mode: Mode, data: &'a [u8]) -> Self {
        Self { mode, data }
    }

    /// Value of the char count field. Kanji chars span two bytes.
    pub fn char_count(&self) -> usize {
        match self.mode {
            Mode::Kanji => self.data.len() / 2,
            _ => self.data.len(),
        }
    }

    pub fn bit_len(&self, ver: Version) -> usize {
        MODE_INDICATOR_BITS + ver.char_cnt_bits(self.mode) + self.mode.encoded_len(self.char_count())
    }
}


// Global constants
//------------------------------------------------------------------------------

pub static MODE_INDICATOR_BITS: usize = 4;

pub static PADDING_CODEWORDS: [u8; 2] = [0b1110_1100, 0b0001_0001];

static ALPHANUMERIC_SYMBOLS: [u8; 9] = [b' ', b'$', b'%', b'*', b'+', b'-', b'.', b'/', b':'];
