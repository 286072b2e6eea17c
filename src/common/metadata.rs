use std::{
    fmt::{Display, Formatter},
    ops::{Deref, Not},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use super::{
    codec::Mode,
    error::{BarcodeError, BarcodeResult},
    mask::MaskPattern,
    version_db::{
        alignment_positions, format_info, num_raw_data_modules, ECC_CODEWORDS_PER_BLOCK,
        NUM_ERROR_CORRECTION_BLOCKS, VERSION_INFOS,
    },
};

// Color
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Color {
    Light,
    Dark,
}

impl Color {
    pub fn select<T>(&self, dark: T, light: T) -> T {
        match self {
            Self::Dark => dark,
            Self::Light => light,
        }
    }

    pub fn is_dark(&self) -> bool {
        matches!(self, Self::Dark)
    }
}

impl From<bool> for Color {
    fn from(dark: bool) -> Self {
        if dark {
            Self::Dark
        } else {
            Self::Light
        }
    }
}

impl Not for Color {
    type Output = Self;
    fn not(self) -> Self::Output {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

// Error correction level
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum ECLevel {
    L,
    M,
    Q,
    H,
}

impl ECLevel {
    pub const ALL: [ECLevel; 4] = [ECLevel::L, ECLevel::M, ECLevel::Q, ECLevel::H];

    // Index into the version tables
    pub(crate) fn index(self) -> usize {
        match self {
            Self::L => 0,
            Self::M => 1,
            Self::Q => 2,
            Self::H => 3,
        }
    }

    // 2 bit indicator stored in format info
    pub(crate) fn format_bits(self) -> u32 {
        match self {
            Self::L => 0b01,
            Self::M => 0b00,
            Self::Q => 0b11,
            Self::H => 0b10,
        }
    }

    pub(crate) fn from_format_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b01 => Self::L,
            0b00 => Self::M,
            0b11 => Self::Q,
            _ => Self::H,
        }
    }
}

impl FromStr for ECLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L" | "l" => Ok(Self::L),
            "M" | "m" => Ok(Self::M),
            "Q" | "q" => Ok(Self::Q),
            "H" | "h" => Ok(Self::H),
            _ => Err(format!("Unknown ec level {s}, expected one of L, M, Q, H")),
        }
    }
}

// Version
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Version(usize);

impl Deref for Version {
    type Target = usize;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<usize> for Version {
    type Error = BarcodeError;
    fn try_from(v: usize) -> BarcodeResult<Self> {
        Self::new(v)
    }
}

impl From<Version> for usize {
    fn from(v: Version) -> Self {
        v.0
    }
}

impl Version {
    pub const MIN: Version = Version(1);
    pub const MAX: Version = Version(40);

    pub fn new(v: usize) -> BarcodeResult<Self> {
        if !(1..=40).contains(&v) {
            return Err(BarcodeError::InvalidVersion);
        }
        Ok(Self(v))
    }

    pub fn all() -> impl Iterator<Item = Version> {
        (1..=40).map(Version)
    }

    pub fn from_width(w: usize) -> BarcodeResult<Self> {
        if w < 21 || (w - 17) % 4 != 0 {
            return Err(BarcodeError::InvalidVersion);
        }
        Self::new((w - 17) / 4)
    }

    pub const fn width(self) -> usize {
        self.0 * 4 + 17
    }

    pub fn alignment_pattern(self) -> &'static [i16] {
        alignment_positions(self.0)
    }

    pub fn total_codewords(self) -> usize {
        num_raw_data_modules(self.0) >> 3
    }

    pub fn remainder_bits(self) -> usize {
        num_raw_data_modules(self.0) & 7
    }

    pub fn ecc_per_block(self, ecl: ECLevel) -> usize {
        ECC_CODEWORDS_PER_BLOCK[ecl.index()][self.0] as usize
    }

    pub fn num_blocks(self, ecl: ECLevel) -> usize {
        NUM_ERROR_CORRECTION_BLOCKS[ecl.index()][self.0] as usize
    }

    pub fn data_codewords(self, ecl: ECLevel) -> usize {
        self.total_codewords() - self.ecc_per_block(ecl) * self.num_blocks(ecl)
    }

    pub fn data_bit_capacity(self, ecl: ECLevel) -> usize {
        self.data_codewords(ecl) << 3
    }

    /// Returns (block1_size, block1_count, block2_size, block2_count) in data codewords.
    /// Group 2 blocks hold one codeword more than group 1 blocks.
    pub fn data_codewords_per_block(self, ecl: ECLevel) -> (usize, usize, usize, usize) {
        let total = self.total_codewords();
        let blocks = self.num_blocks(ecl);
        let ecc = self.ecc_per_block(ecl);

        let block2_count = total % blocks;
        let block1_count = blocks - block2_count;
        let block1_size = total / blocks - ecc;
        let block2_size = if block2_count > 0 { block1_size + 1 } else { 0 };
        (block1_size, block1_count, block2_size, block2_count)
    }

    /// Codeword errors the symbol can repair. The smallest symbols hold back
    /// a few ecc codewords to guard against misdecodes.
    pub fn ec_capacity(self, ecl: ECLevel) -> usize {
        let held_back = match (self.0, ecl) {
            (1, ECLevel::L) => 3,
            (1, ECLevel::M) | (2, ECLevel::L) => 2,
            (1, _) | (3, ECLevel::L) => 1,
            _ => 0,
        };
        (self.num_blocks(ecl) * self.ecc_per_block(ecl) - held_back) / 2
    }

    pub fn char_cnt_bits(self, mode: Mode) -> usize {
        let v = self.0;
        match mode {
            Mode::Numeric => [10, 12, 14][Self::bracket(v)],
            Mode::Alphanumeric => [9, 11, 13][Self::bracket(v)],
            Mode::Byte => [8, 16, 16][Self::bracket(v)],
            Mode::Kanji => [8, 10, 12][Self::bracket(v)],
            Mode::Eci | Mode::Terminator => 0,
        }
    }

    fn bracket(v: usize) -> usize {
        match v {
            1..=9 => 0,
            10..=26 => 1,
            _ => 2,
        }
    }

    // 18 bit version info for versions 7 and above
    pub fn info(self) -> u32 {
        debug_assert!(self.0 >= 7, "Version info is only present for versions 7 and above");
        VERSION_INFOS[self.0 - 7]
    }
}


// Metadata
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Metadata {
    pub version: Version,
    pub ec_level: ECLevel,
    pub mask: MaskPattern,
}

impl Metadata {
    pub fn new(version: Version, ec_level: ECLevel, mask: MaskPattern) -> Self {
        Self { version, ec_level, mask }
    }

    pub fn format_info(&self) -> u32 {
        format_info(self.ec_level, self.mask)
    }
}

impl Display for Metadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ Version: {}, Ec level: {:?}, Mask: {} }}",
            *self.version, self.ec_level, *self.mask
        )
    }
}
