mod qr;

pub use qr::{Module, QR};

use crate::common::{
    codec::{encode, encode_with_version, EncodeHints},
    ec::Block,
    error::BarcodeResult,
    mask::MaskPattern,
    metadata::{ECLevel, Version},
};

/// Fluent QR symbol construction. Version and mask are picked automatically
/// unless set.
#[derive(Debug, Clone)]
pub struct QRBuilder<'a> {
    data: &'a [u8],
    version: Option<Version>,
    ec_level: ECLevel,
    mask: Option<MaskPattern>,
    hints: EncodeHints,
}

impl<'a> QRBuilder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, version: None, ec_level: ECLevel::M, mask: None, hints: EncodeHints::default() }
    }

    pub fn version(&mut self, version: Version) -> &mut Self {
        self.version = Some(version);
        self
    }

    pub fn ec_level(&mut self, ec_level: ECLevel) -> &mut Self {
        self.ec_level = ec_level;
        self
    }

    pub fn mask(&mut self, mask: MaskPattern) -> &mut Self {
        self.mask = Some(mask);
        self
    }

    /// Allows Kanji mode for Shift JIS double byte chars.
    pub fn kanji(&mut self, kanji: bool) -> &mut Self {
        self.hints.kanji = kanji;
        self
    }

    /// Announces the payload charset with an ECI header, e.g. 26 for UTF-8.
    pub fn eci(&mut self, eci: u32) -> &mut Self {
        self.hints.eci = Some(eci);
        self
    }

    pub fn build(&self) -> BarcodeResult<QR> {
        let (bits, version) = match self.version {
            Some(v) => (encode_with_version(self.data, v, self.ec_level, &self.hints)?, v),
            None => encode(self.data, self.ec_level, &self.hints)?,
        };
        log::debug!("Packed {} bytes into {} bits of version {}", self.data.len(), bits.len(), *version);

        let codewords = codeword_sequence(bits.as_bytes(), version, self.ec_level);
        let mut qr = QR::new(version, self.ec_level);
        qr.draw_all_function_patterns();
        qr.draw_encoding_region(&codewords);
        let mask = match self.mask {
            Some(m) => {
                qr.apply_mask(m);
                m
            }
            None => qr.apply_best_mask(),
        };

        log::debug!(
            "Built QR version {} level {:?} mask {}, repairs up to {} codewords",
            *version,
            self.ec_level,
            *mask,
            version.ec_capacity(self.ec_level)
        );
        Ok(qr)
    }
}

// Codeword assembly
//------------------------------------------------------------------------------

// Group 1 blocks come first; group 2 blocks hold one data codeword more
fn split_blocks(data: &[u8], ver: Version, ecl: ECLevel) -> Vec<Block> {
    let (size1, count1, size2, count2) = ver.data_codewords_per_block(ecl);
    let ec_len = ver.ecc_per_block(ecl);
    debug_assert!(
        data.len() == size1 * count1 + size2 * count2,
        "Data doesn't fill the blocks: Data {}, Version {}",
        data.len(),
        *ver
    );

    let (group1, group2) = data.split_at(size1 * count1);
    let group2 = group2.chunks(size2.max(1)).take(count2);
    group1.chunks(size1).chain(group2).map(|raw| Block::encode(raw, ec_len)).collect()
}

/// Data codewords column by column across blocks, then ecc codewords the same
/// way. This is the order codewords are placed in the symbol.
pub(crate) fn codeword_sequence(data: &[u8], ver: Version, ecl: ECLevel) -> Vec<u8> {
    let blocks = split_blocks(data, ver, ecl);
    let mut res = Vec::with_capacity(ver.total_codewords());
    let longest = blocks.iter().map(Block::data_len).max().unwrap_or(0);
    for i in 0..longest {
        res.extend(blocks.iter().filter_map(|b| b.data().get(i)));
    }
    for i in 0..ver.ecc_per_block(ecl) {
        res.extend(blocks.iter().filter_map(|b| b.ecc().get(i)));
    }
    res
}
