use serde::{Deserialize, Serialize};

// Code set
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum CodeSet {
    A,
    B,
    C,
}

impl CodeSet {
    pub fn start_value(self) -> u8 {
        match self {
            Self::A => START_A,
            Self::B => START_B,
            Self::C => START_C,
        }
    }

    pub fn from_start(value: u8) -> Option<Self> {
        match value {
            START_A => Some(Self::A),
            START_B => Some(Self::B),
            START_C => Some(Self::C),
            _ => None,
        }
    }

    // Codeword that switches into this set from another one
    pub fn switch_value(self) -> u8 {
        match self {
            Self::A => CODE_A,
            Self::B => CODE_B,
            Self::C => CODE_C,
        }
    }

    pub fn contains(self, byte: u8) -> bool {
        match self {
            Self::A => byte < 96,
            Self::B => (32..128).contains(&byte),
            Self::C => byte.is_ascii_digit(),
        }
    }

    /// Codeword for a single byte in set A or B.
    pub fn value(self, byte: u8) -> u8 {
        debug_assert!(self != Self::C && self.contains(byte), "Byte {byte} not in set {self:?}");
        match self {
            Self::A if byte < 32 => byte + 64,
            _ => byte - 32,
        }
    }

    /// Byte for a data codeword below 96 in set A or B.
    pub fn byte(self, value: u8) -> u8 {
        debug_assert!(value < 96, "Not a data codeword: {value}");
        match self {
            Self::A if value >= 64 => value - 64,
            _ => value + 32,
        }
    }
}

#[cfg(test)]
mod code_set_tests {
    use super::CodeSet;

    #[test]
    fn test_value() {
        assert_eq!(CodeSet::B.value(b'1'), 17);
        assert_eq!(CodeSet::B.value(0x7f), 95);
        assert_eq!(CodeSet::A.value(b'A'), 33);
        assert_eq!(CodeSet::A.value(0x00), 64);
        assert_eq!(CodeSet::A.value(0x1f), 95);
    }

    #[test]
    fn test_byte() {
        for b in 0..96 {
            assert_eq!(CodeSet::A.byte(CodeSet::A.value(b)), b);
        }
        for b in 32..128 {
            assert_eq!(CodeSet::B.byte(CodeSet::B.value(b)), b);
        }
    }

    #[test]
    fn test_contains() {
        assert!(CodeSet::A.contains(b'\n'));
        assert!(!CodeSet::A.contains(b'a'));
        assert!(CodeSet::B.contains(b'a'));
        assert!(!CodeSet::B.contains(b'\t'));
        assert!(!CodeSet::B.contains(0x80));
    }
}

// Checksum and pattern matching
//------------------------------------------------------------------------------

/// Mod 103 checksum over the start codeword and position weighted data codewords.
pub fn checksum(values: &[u8]) -> u8 {
    let sum = values
        .iter()
        .enumerate()
        .map(|(i, &v)| v as u32 * (i as u32).max(1))
        .sum::<u32>();
    (sum % 103) as u8
}

/// Nearest symbol for six measured element widths, along with the distance in
/// modules. Symbols are compared by their edge to similar edge measures, the
/// sums of adjacent bar and space pairs, which uniform ink spread leaves intact.
pub fn match_pattern(widths: &[f32]) -> (u8, f32) {
    debug_assert_eq!(widths.len(), 6, "Symbol has 6 elements");
    let mut edges = edge_measures(widths, SYMBOL_MODULES);
    // The fifth measure follows from the others and the fixed width
    edges.truncate(SYMBOL_EDGES);
    let (value, dist) = PATTERNS
        .iter()
        .enumerate()
        .map(|(i, p)| (i, edge_distance(&edges, p)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or((0, f32::MAX));
    (value as u8, dist)
}

pub fn stop_distance(widths: &[f32]) -> f32 {
    debug_assert_eq!(widths.len(), 7, "Stop pattern has 7 elements");
    edge_distance(&edge_measures(widths, STOP_MODULES), &STOP_PATTERN)
}

// Pair sums in modules, with the module size taken from the total width
fn edge_measures(widths: &[f32], modules: usize) -> Vec<f32> {
    let unit = widths.iter().sum::<f32>() / modules as f32;
    if unit <= 0.0 {
        return vec![f32::MAX; widths.len().saturating_sub(1)];
    }
    widths.windows(2).map(|w| (w[0] + w[1]) / unit).collect()
}

fn edge_distance(edges: &[f32], pattern: &[u8]) -> f32 {
    edges.iter().zip(pattern.windows(2)).map(|(&e, p)| (e - (p[0] + p[1]) as f32).abs()).sum()
}

#[cfg(test)]
mod matching_tests {
    use super::{
        checksum, edge_measures, match_pattern, stop_distance, PATTERNS, START_B, SYMBOL_EDGES,
        SYMBOL_MODULES,
    };

    #[test]
    fn test_checksum() {
        assert_eq!(checksum(&[START_B, 17, 18, 19, 20, 21]), 90);
        // Start code carries weight 1 as does the first data codeword
        assert_eq!(checksum(&[START_B, 1]), 2);
    }

    #[test]
    fn test_match_pattern() {
        assert_eq!(match_pattern(&[2.0, 1.0, 2.0, 2.0, 2.0, 2.0]), (0, 0.0));
        // Scaled by 3 with a pixel of blur on two elements
        let (value, dist) = match_pattern(&[7.0, 3.0, 6.0, 6.0, 5.0, 6.0]);
        assert_eq!(value, 0);
        assert!(dist < 1.0);
        assert_eq!(match_pattern(&[4.0, 2.0, 2.0, 4.0, 2.0, 8.0]).0, START_B);
    }

    #[test]
    fn test_match_pattern_under_ink_spread() {
        // Every bar a module too wide and every space a module too narrow, at 3 px per module
        for (value, pattern) in PATTERNS.iter().enumerate() {
            let widths = pattern
                .iter()
                .enumerate()
                .map(|(i, &m)| (m as f32 * 3.0) + if i % 2 == 0 { 1.0 } else { -1.0 })
                .collect::<Vec<_>>();
            assert_eq!(match_pattern(&widths), (value as u8, 0.0), "{pattern:?}");
        }
    }

    #[test]
    fn test_edge_measures_are_distinct() {
        let measures = PATTERNS
            .iter()
            .map(|p| edge_measures(&p.map(|m| m as f32), SYMBOL_MODULES)[..SYMBOL_EDGES].to_vec())
            .collect::<Vec<_>>();
        for (i, a) in measures.iter().enumerate() {
            for (j, b) in measures.iter().enumerate().skip(i + 1) {
                assert_ne!(a, b, "Symbols {i} and {j}");
            }
        }
    }

    #[test]
    fn test_stop_distance() {
        assert_eq!(stop_distance(&[4.0, 6.0, 6.0, 2.0, 2.0, 2.0, 4.0]), 0.0);
        assert!(stop_distance(&[2.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0]) > 2.0);
        // Thickened bars. The stop has one bar more than spaces, so spread
        // shifts the module estimate slightly
        assert!(stop_distance(&[5.0, 5.0, 7.0, 1.0, 3.0, 1.0, 5.0]) < 1.0);
    }
}

// Global constants
//------------------------------------------------------------------------------

pub const FNC3: u8 = 96;
pub const FNC2: u8 = 97;
pub const SHIFT: u8 = 98;
pub const CODE_C: u8 = 99;
// FNC4 inside set B
pub const CODE_B: u8 = 100;
// FNC4 inside set A
pub const CODE_A: u8 = 101;
pub const FNC1: u8 = 102;
pub const START_A: u8 = 103;
pub const START_B: u8 = 104;
pub const START_C: u8 = 105;

pub static SYMBOL_MODULES: usize = 11;

// Edge measures needed to tell symbols apart
pub static SYMBOL_EDGES: usize = 4;

pub static STOP_MODULES: usize = 13;

// Bar and space widths in modules, starting with a bar
pub static STOP_PATTERN: [u8; 7] = [2, 3, 3, 1, 1, 1, 2];

// Indexed by codeword value
pub static PATTERNS: [[u8; 6]; 106] = [
    [2, 1, 2, 2, 2, 2], [2, 2, 2, 1, 2, 2], [2, 2, 2, 2, 2, 1], [1, 2, 1, 2, 2, 3], [1, 2, 1, 3, 2, 2],
    [1, 3, 1, 2, 2, 2], [1, 2, 2, 2, 1, 3], [1, 2, 2, 3, 1, 2], [1, 3, 2, 2, 1, 2], [2, 2, 1, 2, 1, 3],
    [2, 2, 1, 3, 1, 2], [2, 3, 1, 2, 1, 2], [1, 1, 2, 2, 3, 2], [1, 2, 2, 1, 3, 2], [1, 2, 2, 2, 3, 1],
    [1, 1, 3, 2, 2, 2], [1, 2, 3, 1, 2, 2], [1, 2, 3, 2, 2, 1], [2, 2, 3, 2, 1, 1], [2, 2, 1, 1, 3, 2],
    [2, 2, 1, 2, 3, 1], [2, 1, 3, 2, 1, 2], [2, 2, 3, 1, 1, 2], [3, 1, 2, 1, 3, 1], [3, 1, 1, 2, 2, 2],
    [3, 2, 1, 1, 2, 2], [3, 2, 1, 2, 2, 1], [3, 1, 2, 2, 1, 2], [3, 2, 2, 1, 1, 2], [3, 2, 2, 2, 1, 1],
    [2, 1, 2, 1, 2, 3], [2, 1, 2, 3, 2, 1], [2, 3, 2, 1, 2, 1], [1, 1, 1, 3, 2, 3], [1, 3, 1, 1, 2, 3],
    [1, 3, 1, 3, 2, 1], [1, 1, 2, 3, 1, 3], [1, 3, 2, 1, 1, 3], [1, 3, 2, 3, 1, 1], [2, 1, 1, 3, 1, 3],
    [2, 3, 1, 1, 1, 3], [2, 3, 1, 3, 1, 1], [1, 1, 2, 1, 3, 3], [1, 1, 2, 3, 3, 1], [1, 3, 2, 1, 3, 1],
    [1, 1, 3, 1, 2, 3], [1, 1, 3, 3, 2, 1], [1, 3, 3, 1, 2, 1], [3, 1, 3, 1, 2, 1], [2, 1, 1, 3, 3, 1],
    [2, 3, 1, 1, 3, 1], [2, 1, 3, 1, 1, 3], [2, 1, 3, 3, 1, 1], [2, 1, 3, 1, 3, 1], [3, 1, 1, 1, 2, 3],
    [3, 1, 1, 3, 2, 1], [3, 3, 1, 1, 2, 1], [3, 1, 2, 1, 1, 3], [3, 1, 2, 3, 1, 1], [3, 3, 2, 1, 1, 1],
    [3, 1, 4, 1, 1, 1], [2, 2, 1, 4, 1, 1], [4, 3, 1, 1, 1, 1], [1, 1, 1, 2, 2, 4], [1, 1, 1, 4, 2, 2],
    [1, 2, 1, 1, 2, 4], [1, 2, 1, 4, 2, 1], [1, 4, 1, 1, 2, 2], [1, 4, 1, 2, 2, 1], [1, 1, 2, 2, 1, 4],
    [1, 1, 2, 4, 1, 2], [1, 2, 2, 1, 1, 4], [1, 2, 2, 4, 1, 1], [1, 4, 2, 1, 1, 2], [1, 4, 2, 2, 1, 1],
    [2, 4, 1, 2, 1, 1], [2, 2, 1, 1, 1, 4], [4, 1, 3, 1, 1, 1], [2, 4, 1, 1, 1, 2], [1, 3, 4, 1, 1, 1],
    [1, 1, 1, 2, 4, 2], [1, 2, 1, 1, 4, 2], [1, 2, 1, 2, 4, 1], [1, 1, 4, 2, 1, 2], [1, 2, 4, 1, 1, 2],
    [1, 2, 4, 2, 1, 1], [4, 1, 1, 2, 1, 2], [4, 2, 1, 1, 1, 2], [4, 2, 1, 2, 1, 1], [2, 1, 2, 1, 4, 1],
    [2, 1, 4, 1, 2, 1], [4, 1, 2, 1, 2, 1], [1, 1, 1, 1, 4, 3], [1, 1, 1, 3, 4, 1], [1, 3, 1, 1, 4, 1],
    [1, 1, 4, 1, 1, 3], [1, 1, 4, 3, 1, 1], [4, 1, 1, 1, 1, 3], [4, 1, 1, 3, 1, 1], [1, 1, 3, 1, 4, 1],
    [1, 1, 4, 1, 3, 1], [3, 1, 1, 1, 4, 1], [4, 1, 1, 1, 3, 1], [2, 1, 1, 4, 1, 2], [2, 1, 1, 2, 1, 4],
    [2, 1, 1, 2, 3, 2],
];
