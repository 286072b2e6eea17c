use crate::common::{
    bit_utils::BitReader,
    grid::ModuleGrid,
    iter::EncRegionIter,
    mask::{compute_total_penalty, MaskPattern},
    metadata::{Color, ECLevel, Metadata, Version},
    version_db::{
        FORMAT_INFO_COORDS_MAIN, FORMAT_INFO_COORDS_SIDE, VERSION_INFO_COORDS_BL, VERSION_INFO_COORDS_TR,
    },
};

/// Module of a symbol under construction, tagged with the role that set it.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Module {
    Empty,
    Func(Color),
    Version(Color),
    Format(Color),
    Data(Color),
}

impl Module {
    pub fn is_dark(self) -> bool {
        match self {
            Self::Empty => false,
            Self::Func(c) | Self::Version(c) | Self::Format(c) | Self::Data(c) => c.is_dark(),
        }
    }
}

/// QR symbol in progress. Negative coordinates count from the far edge.
#[derive(Debug, Clone)]
pub struct QR {
    modules: Vec<Module>,
    ver: Version,
    ecl: ECLevel,
    mask: Option<MaskPattern>,
}

impl QR {
    pub fn new(ver: Version, ecl: ECLevel) -> Self {
        let w = ver.width();
        Self { modules: vec![Module::Empty; w * w], ver, ecl, mask: None }
    }

    /// Function patterns plus reserved format and version areas. Every module
    /// left empty belongs to the encoding region.
    pub fn skeleton(ver: Version, ecl: ECLevel) -> Self {
        let mut qr = Self::new(ver, ecl);
        qr.draw_all_function_patterns();
        qr.draw_format_info(0);
        qr.draw_version_info();
        qr
    }

    pub fn version(&self) -> Version {
        self.ver
    }

    pub fn width(&self) -> usize {
        self.ver.width()
    }

    pub fn ec_level(&self) -> ECLevel {
        self.ecl
    }

    pub fn mask(&self) -> Option<MaskPattern> {
        self.mask
    }

    pub fn metadata(&self) -> Option<Metadata> {
        self.mask.map(|m| Metadata::new(self.ver, self.ecl, m))
    }

    pub fn to_grid(&self) -> ModuleGrid {
        let w = self.width();
        ModuleGrid::from_modules(w, w, self.modules.iter().map(|m| m.is_dark()).collect())
    }

    fn index(&self, r: i16, c: i16) -> usize {
        let w = self.width() as i16;
        debug_assert!((-w..w).contains(&r) && (-w..w).contains(&c), "Module out of bounds: ({r}, {c})");
        r.rem_euclid(w) as usize * self.width() + c.rem_euclid(w) as usize
    }

    pub fn get(&self, r: i16, c: i16) -> Module {
        self.modules[self.index(r, c)]
    }

    pub fn set(&mut self, r: i16, c: i16, module: Module) {
        let i = self.index(r, c);
        self.modules[i] = module;
    }

    #[cfg(test)]
    pub fn to_debug_str(&self) -> String {
        let w = self.width();
        let mut res = String::with_capacity(w * (w + 1));
        for row in self.modules.chunks(w) {
            res.push('\n');
            res.extend(row.iter().map(|m| match m {
                Module::Empty => '.',
                Module::Func(c) => c.select('f', 'F'),
                Module::Version(c) => c.select('v', 'V'),
                Module::Format(c) => c.select('m', 'M'),
                Module::Data(c) => c.select('d', 'D'),
            }));
        }
        res
    }
}

#[cfg(test)]
mod qr_util_tests {
    use super::{Module, QR};
    use crate::common::metadata::{Color, ECLevel, Version};

    #[test]
    fn test_negative_coords() {
        let mut qr = QR::new(Version::new(1).unwrap(), ECLevel::L);
        qr.set(-1, -21, Module::Data(Color::Dark));
        assert_eq!(qr.get(20, 0), Module::Data(Color::Dark));
        assert!(qr.to_grid().is_dark(20, 0));
        assert!(!qr.to_grid().is_dark(0, 20));
    }

    #[test]
    fn test_metadata_after_mask() {
        let mut qr = QR::new(Version::new(2).unwrap(), ECLevel::Q);
        assert_eq!(qr.metadata(), None);
        let mask = qr.apply_best_mask();
        assert_eq!(qr.metadata().map(|m| m.mask), Some(mask));
    }
}

// Function patterns
// Finders and alignment patterns are concentric squares; the colour of a
// module depends only on its ring, the Chebyshev distance from the centre.
//------------------------------------------------------------------------------

impl QR {
    pub fn draw_all_function_patterns(&mut self) {
        let far = self.width() as i16 - 4;
        for (r, c) in [(3, 3), (3, far), (far, 3)] {
            // Ring 4 is the separator, cut off by the symbol edge
            self.stamp(r, c, 4, |ring| ring != 2 && ring != 4);
        }
        // Centres already covered by a finder are skipped
        let centres = self.ver.alignment_pattern();
        for &r in centres {
            for &c in centres {
                if self.get(r, c) == Module::Empty {
                    self.stamp(r, c, 2, |ring| ring != 1);
                }
            }
        }
        self.draw_timing_patterns();
    }

    fn stamp(&mut self, r: i16, c: i16, radius: i16, dark: fn(i16) -> bool) {
        let w = self.width() as i16;
        for i in (r - radius).max(0)..=(r + radius).min(w - 1) {
            for j in (c - radius).max(0)..=(c + radius).min(w - 1) {
                let ring = (i - r).abs().max((j - c).abs());
                self.set(i, j, Module::Func(Color::from(dark(ring))));
            }
        }
    }

    // Alternating row 6 and column 6 between the finders, around any
    // alignment pattern sitting on them
    fn draw_timing_patterns(&mut self) {
        for k in 8..self.width() as i16 - 8 {
            let clr = Color::from(k % 2 == 0);
            for (r, c) in [(6, k), (k, 6)] {
                if self.get(r, c) == Module::Empty {
                    self.set(r, c, Module::Func(clr));
                }
            }
        }
    }
}


// Format and version info
//------------------------------------------------------------------------------

impl QR {
    fn draw_format_info(&mut self, info: u32) {
        for coords in [&FORMAT_INFO_COORDS_MAIN, &FORMAT_INFO_COORDS_SIDE] {
            self.draw_info_bits(info, coords, Module::Format);
        }
        // Always dark module beside the bottom left finder
        self.set(-8, 8, Module::Format(Color::Dark));
    }

    fn draw_version_info(&mut self) {
        if *self.ver < 7 {
            return;
        }
        let info = self.ver.info();
        for coords in [&VERSION_INFO_COORDS_BL, &VERSION_INFO_COORDS_TR] {
            self.draw_info_bits(info, coords, Module::Version);
        }
    }

    // Most significant of `coords.len()` bits goes first
    fn draw_info_bits(&mut self, info: u32, coords: &[(i16, i16)], kind: fn(Color) -> Module) {
        let last = coords.len() - 1;
        for (i, &(r, c)) in coords.iter().enumerate() {
            self.set(r, c, kind(Color::from((info >> (last - i)) & 1 == 1)));
        }
    }
}

#[cfg(test)]
mod info_tests {
    use super::{Module, QR};
    use crate::common::metadata::{Color, ECLevel, Version};

    #[test]
    fn test_no_version_info_below_7() {
        let qr = QR::skeleton(Version::new(6).unwrap(), ECLevel::L);
        assert!(!qr.modules.iter().any(|m| matches!(m, Module::Version(_))));
    }

    #[test]
    fn test_version_info_7() {
        let qr = QR::skeleton(Version::new(7).unwrap(), ECLevel::L);
        let dbg = qr.to_debug_str();
        let rows = dbg.lines().skip(1).collect::<Vec<_>>();
        assert_eq!(&rows[0][34..37], "VVv");
        assert_eq!(&rows[4][34..37], "vvv");
        assert_eq!(&rows[5][34..37], "VVV");
        assert_eq!(&rows[34][..6], "VVVVvV");
        assert_eq!(&rows[36][..6], "vVVvvV");
    }

    #[test]
    fn test_format_info_both_copies() {
        let mut qr = QR::new(Version::new(1).unwrap(), ECLevel::L);
        // Top bit lands at (8, 0) and (-1, 8), bottom bit at (0, 8) and (8, -1)
        qr.draw_format_info(0b100_0000_0000_0001);
        assert_eq!(qr.get(8, 0), Module::Format(Color::Dark));
        assert_eq!(qr.get(-1, 8), Module::Format(Color::Dark));
        assert_eq!(qr.get(0, 8), Module::Format(Color::Dark));
        assert_eq!(qr.get(8, -1), Module::Format(Color::Dark));
        assert_eq!(qr.get(8, 1), Module::Format(Color::Light));
        assert_eq!(qr.get(-8, 8), Module::Format(Color::Dark));
    }
}

// Encoding region
//------------------------------------------------------------------------------

impl QR {
    /// Places codewords MSB first along the zigzag. Modules past the last
    /// codeword are remainder bits and stay light.
    pub fn draw_encoding_region(&mut self, codewords: &[u8]) {
        self.draw_format_info(0);
        self.draw_version_info();

        let mut bits = BitReader::new(codewords);
        for (r, c) in EncRegionIter::new(self.ver) {
            if self.get(r, c) == Module::Empty {
                let dark = bits.next().unwrap_or(false);
                self.set(r, c, Module::Data(Color::from(dark)));
            }
        }
        debug_assert!(bits.remaining() == 0, "Codewords overflow the encoding region");
    }

    // Copy with data modules flipped where the mask is set, and format info
    // for the mask drawn
    fn masked(&self, pattern: MaskPattern) -> Self {
        let mask_fn = pattern.mask_function();
        let w = self.width();
        let mut res = self.clone();
        for (i, m) in res.modules.iter_mut().enumerate() {
            if let Module::Data(clr) = *m {
                if mask_fn((i / w) as i32, (i % w) as i32) {
                    *m = Module::Data(!clr);
                }
            }
        }
        res.mask = Some(pattern);
        res.draw_format_info(Metadata::new(self.ver, self.ecl, pattern).format_info());
        res
    }

    pub fn apply_mask(&mut self, pattern: MaskPattern) {
        *self = self.masked(pattern);
    }

    /// Masks with the pattern of lowest penalty and returns it.
    pub fn apply_best_mask(&mut self) -> MaskPattern {
        let scored = MaskPattern::all().map(|m| {
            let qr = self.masked(m);
            let penalty = compute_total_penalty(&qr.to_grid());
            log::trace!("Mask {} scored penalty {penalty}", *m);
            (penalty, *m, qr)
        });
        // Lowest pattern number breaks ties
        if let Some((_, _, best)) = scored.min_by_key(|&(penalty, m, _)| (penalty, m)) {
            *self = best;
        }
        self.mask.unwrap_or_else(|| unreachable!("There are always 8 mask patterns"))
    }
}

#[cfg(test)]
mod encoding_region_tests {
    use super::{Module, QR};
    use crate::common::{
        iter::EncRegionIter,
        mask::{compute_total_penalty, MaskPattern},
        metadata::{Color, ECLevel, Version},
    };

    fn filled_qr(ver: Version, ecl: ECLevel) -> QR {
        let mut qr = QR::new(ver, ecl);
        qr.draw_all_function_patterns();
        let codewords = (0..ver.total_codewords()).map(|i| (i * 37 % 256) as u8).collect::<Vec<_>>();
        qr.draw_encoding_region(&codewords);
        qr
    }

    #[test]
    fn test_no_empty_modules() {
        for v in [1, 6, 7, 21] {
            let qr = filled_qr(Version::new(v).unwrap(), ECLevel::Q);
            assert!(!qr.modules.contains(&Module::Empty));
        }
    }

    #[test]
    fn test_codeword_placement() {
        let qr = filled_qr(Version::new(1).unwrap(), ECLevel::L);
        // First codeword 0x00 fills the bottom right 2x4 block upward, the
        // second 0x25 = 00100101 continues above it
        assert_eq!(qr.get(20, 20), Module::Data(Color::Light));
        assert_eq!(qr.get(17, 19), Module::Data(Color::Light));
        assert_eq!(qr.get(16, 20), Module::Data(Color::Light));
        assert_eq!(qr.get(15, 20), Module::Data(Color::Dark));
        assert_eq!(qr.get(13, 19), Module::Data(Color::Dark));
    }

    #[test]
    fn test_remainder_bits_light() {
        // Version 2 has 7 remainder bits after its 44 codewords
        let ver = Version::new(2).unwrap();
        let qr = filled_qr(ver, ECLevel::L);
        let data = EncRegionIter::new(ver)
            .filter(|&(r, c)| matches!(qr.get(r, c), Module::Data(_)))
            .collect::<Vec<_>>();
        assert_eq!(data.len(), 44 * 8 + 7);
        assert!(data[352..].iter().all(|&(r, c)| qr.get(r, c) == Module::Data(Color::Light)));
    }

    #[test]
    fn test_mask_twice_restores_data() {
        let qr = filled_qr(Version::new(2).unwrap(), ECLevel::M);
        let mut masked = qr.clone();
        let m = MaskPattern::new(3).unwrap();
        masked.apply_mask(m);
        assert_ne!(masked.modules, qr.modules);
        masked.apply_mask(m);
        let data = |q: &QR| q.modules.iter().filter(|m| matches!(m, Module::Data(_))).copied().collect::<Vec<_>>();
        assert_eq!(data(&masked), data(&qr));
        assert_eq!(masked.mask(), Some(m));
    }

    #[test]
    fn test_apply_best_mask() {
        let mut qr = filled_qr(Version::new(1).unwrap(), ECLevel::M);
        let base = qr.clone();
        let best = qr.apply_best_mask();
        let best_pen = compute_total_penalty(&qr.to_grid());
        for m in MaskPattern::all() {
            let mut other = base.clone();
            other.apply_mask(m);
            assert!(best_pen <= compute_total_penalty(&other.to_grid()));
        }
        assert_eq!(qr.mask(), Some(best));
    }
}
