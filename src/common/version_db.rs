use std::sync::LazyLock;

use super::{mask::MaskPattern, metadata::ECLevel};

// Process wide, read only QR tables. Derived tables are computed once on first
// use and shared by every encoder, reader and worker thread.
//------------------------------------------------------------------------------

pub fn alignment_positions(version: usize) -> &'static [i16] {
    &ALIGNMENT_POSITIONS[version]
}

// Number of modules available for data and ecc after all function patterns
pub const fn num_raw_data_modules(version: usize) -> usize {
    let v = version;
    let mut res = (16 * v + 128) * v + 64;
    if v >= 2 {
        let num_align = v / 7 + 2;
        res -= (25 * num_align - 10) * num_align - 55;
        if v >= 7 {
            res -= 36;
        }
    }
    res
}

// 15 bit format info: 5 data bits protected by a BCH(15, 5) code and XOR masked
pub fn format_info(ecl: ECLevel, mask: MaskPattern) -> u32 {
    FORMAT_INFOS[((ecl.format_bits() << 3) | *mask as u32) as usize]
}

const fn bch_remainder(data: u32, data_len: u32, gen: u32, gen_len: u32) -> u32 {
    let mut rem = data << (gen_len - 1);
    let mut i = data_len + gen_len - 2;
    loop {
        if rem & (1 << i) != 0 {
            rem ^= gen << (i + 1 - gen_len);
        }
        if i + 1 == gen_len {
            break;
        }
        i -= 1;
    }
    rem
}

const fn build_format_infos() -> [u32; 32] {
    let mut res = [0u32; 32];
    let mut i = 0;
    while i < 32 {
        let rem = bch_remainder(i as u32, 5, FORMAT_INFO_GENERATOR, 11);
        res[i] = ((i as u32) << 10 | rem) ^ FORMAT_INFO_MASK;
        i += 1;
    }
    res
}

const fn build_version_infos() -> [u32; 34] {
    let mut res = [0u32; 34];
    let mut i = 0;
    while i < 34 {
        let v = (i + 7) as u32;
        res[i] = v << 12 | bch_remainder(v, 6, VERSION_INFO_GENERATOR, 13);
        i += 1;
    }
    res
}

#[cfg(test)]
mod version_db_tests {
    use super::{alignment_positions, format_info, num_raw_data_modules, FORMAT_INFOS};
    use crate::common::{mask::MaskPattern, metadata::ECLevel};

    #[test]
    fn test_alignment_positions() {
        assert!(alignment_positions(1).is_empty());
        assert_eq!(alignment_positions(2), [6, 18]);
        assert_eq!(alignment_positions(7), [6, 22, 38]);
        assert_eq!(alignment_positions(32), [6, 34, 60, 86, 112, 138]);
        assert_eq!(alignment_positions(40), [6, 30, 58, 86, 114, 142, 170]);
    }

    #[test]
    fn test_raw_data_modules() {
        assert_eq!(num_raw_data_modules(1), 208);
        assert_eq!(num_raw_data_modules(2), 359);
        assert_eq!(num_raw_data_modules(40), 29648);
    }

    #[test]
    fn test_format_info() {
        assert_eq!(format_info(ECLevel::M, MaskPattern::new(0).unwrap()), 0x5412);
        assert_eq!(format_info(ECLevel::L, MaskPattern::new(4).unwrap()), 0x662f);
        assert_eq!(format_info(ECLevel::H, MaskPattern::new(7).unwrap()), 0x083b);
        // Every pair of format infos differ in at least 7 bits
        for (i, a) in FORMAT_INFOS.iter().enumerate() {
            for b in FORMAT_INFOS[i + 1..].iter() {
                assert!((a ^ b).count_ones() >= 7);
            }
        }
    }
}

// Global constants
//------------------------------------------------------------------------------

const FORMAT_INFO_GENERATOR: u32 = 0x537;

const FORMAT_INFO_MASK: u32 = 0x5412;

const VERSION_INFO_GENERATOR: u32 = 0x1f25;

// Indexed by (ec level bits << 3) | mask
pub static FORMAT_INFOS: [u32; 32] = build_format_infos();

// Indexed by version - 7
pub static VERSION_INFOS: [u32; 34] = build_version_infos();

static ALIGNMENT_POSITIONS: LazyLock<Vec<Vec<i16>>> = LazyLock::new(|| {
    (0..=40)
        .map(|v: usize| {
            if v < 2 {
                return vec![];
            }
            let size = (v * 4 + 17) as i16;
            let num_align = (v / 7 + 2) as i16;
            let step = if v == 32 {
                26
            } else {
                (v as i16 * 4 + num_align * 2 + 1) / (num_align * 2 - 2) * 2
            };
            let mut res: Vec<i16> = (0..num_align - 1).map(|i| size - 7 - i * step).collect();
            res.push(6);
            res.reverse();
            res
        })
        .collect()
});

// Coordinates are (row, col), negative values wrap from the far edge.
// Listed from the most significant bit to the least.
pub static FORMAT_INFO_COORDS_MAIN: [(i16, i16); 15] = [
    (8, 0),
    (8, 1),
    (8, 2),
    (8, 3),
    (8, 4),
    (8, 5),
    (8, 7),
    (8, 8),
    (7, 8),
    (5, 8),
    (4, 8),
    (3, 8),
    (2, 8),
    (1, 8),
    (0, 8),
];

pub static FORMAT_INFO_COORDS_SIDE: [(i16, i16); 15] = [
    (-1, 8),
    (-2, 8),
    (-3, 8),
    (-4, 8),
    (-5, 8),
    (-6, 8),
    (-7, 8),
    (8, -8),
    (8, -7),
    (8, -6),
    (8, -5),
    (8, -4),
    (8, -3),
    (8, -2),
    (8, -1),
];

pub static VERSION_INFO_COORDS_TR: [(i16, i16); 18] = [
    (5, -9), (5, -10), (5, -11), (4, -9), (4, -10), (4, -11),
    (3, -9), (3, -10), (3, -11), (2, -9), (2, -10), (2, -11),
    (1, -9), (1, -10), (1, -11), (0, -9), (0, -10), (0, -11),
];

pub static VERSION_INFO_COORDS_BL: [(i16, i16); 18] = [
    (-9, 5), (-10, 5), (-11, 5), (-9, 4), (-10, 4), (-11, 4),
    (-9, 3), (-10, 3), (-11, 3), (-9, 2), (-10, 2), (-11, 2),
    (-9, 1), (-10, 1), (-11, 1), (-9, 0), (-10, 0), (-11, 0),
];

// Index: [ec_level][version]
pub static ECC_CODEWORDS_PER_BLOCK: [[u8; 41]; 4] = [
    [
        0, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28,
        30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
    [
        0, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ],
    [
        0, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30,
        30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
    [
        0, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ],
];

pub static NUM_ERROR_CORRECTION_BLOCKS: [[u8; 41]; 4] = [
    [
        0, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12, 13,
        14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ],
    [
        0, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ],
    [
        0, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27,
        29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ],
    [
        0, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32,
        35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ],
];
