use std::ops::Deref;

use serde::{Deserialize, Serialize};

use super::{
    error::{BarcodeError, BarcodeResult},
    grid::ModuleGrid,
};

#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct MaskPattern(u8);

impl MaskPattern {
    pub fn new(pattern: u8) -> BarcodeResult<Self> {
        if pattern >= 8 {
            return Err(BarcodeError::InvalidMaskPattern);
        }
        Ok(Self(pattern))
    }

    pub fn all() -> impl Iterator<Item = MaskPattern> {
        (0..8).map(MaskPattern)
    }
}

impl Deref for MaskPattern {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<u8> for MaskPattern {
    type Error = BarcodeError;
    fn try_from(p: u8) -> BarcodeResult<Self> {
        Self::new(p)
    }
}

impl From<MaskPattern> for u8 {
    fn from(m: MaskPattern) -> Self {
        m.0
    }
}

mod mask_functions {
    pub fn checkerboard(r: i32, c: i32) -> bool {
        (r + c) & 1 == 0
    }

    pub fn horizontal_lines(r: i32, _: i32) -> bool {
        r & 1 == 0
    }

    pub fn vertical_lines(_: i32, c: i32) -> bool {
        c % 3 == 0
    }

    pub fn diagonal_lines(r: i32, c: i32) -> bool {
        (r + c) % 3 == 0
    }

    pub fn large_checkerboard(r: i32, c: i32) -> bool {
        ((r >> 1) + (c / 3)) & 1 == 0
    }

    pub fn fields(r: i32, c: i32) -> bool {
        ((r * c) & 1) + ((r * c) % 3) == 0
    }

    pub fn diamonds(r: i32, c: i32) -> bool {
        (((r * c) & 1) + ((r * c) % 3)) & 1 == 0
    }

    pub fn meadow(r: i32, c: i32) -> bool {
        (((r + c) & 1) + ((r * c) % 3)) & 1 == 0
    }
}

impl MaskPattern {
    /// Returns the predicate telling whether the module at (row, col) is flipped.
    pub fn mask_function(self) -> fn(i32, i32) -> bool {
        match *self {
            0b000 => mask_functions::checkerboard,
            0b001 => mask_functions::horizontal_lines,
            0b010 => mask_functions::vertical_lines,
            0b011 => mask_functions::diagonal_lines,
            0b100 => mask_functions::large_checkerboard,
            0b101 => mask_functions::fields,
            0b110 => mask_functions::diamonds,
            0b111 => mask_functions::meadow,
            _ => unreachable!("Mask pattern is validated on construction"),
        }
    }
}


// Penalty scoring. Weights follow ISO/IEC 18004 section 7.8.3
//------------------------------------------------------------------------------

pub fn compute_total_penalty(grid: &ModuleGrid) -> u32 {
    let adj_pen = compute_adjacent_penalty(grid);
    let blk_pen = compute_block_penalty(grid);
    let fp_pen = compute_finder_pattern_penalty(grid);
    let bal_pen = compute_balance_penalty(grid);
    adj_pen + blk_pen + fp_pen + bal_pen
}

// Lines of the grid: every row followed by every column
fn lines(grid: &ModuleGrid) -> impl Iterator<Item = Vec<bool>> + '_ {
    let (w, h) = (grid.width(), grid.height());
    let rows = (0..h).map(move |r| grid.row(r).to_vec());
    let cols = (0..w).map(move |c| (0..h).map(|r| grid.is_dark(r, c)).collect());
    rows.chain(cols)
}

// N1: 3 + (len - 5) for every run of 5 or more same colored modules
fn compute_adjacent_penalty(grid: &ModuleGrid) -> u32 {
    let mut pen = 0;
    for line in lines(grid) {
        let mut run = 0;
        let mut last = None;
        for &m in line.iter() {
            if last == Some(m) {
                run += 1;
            } else {
                pen += run_penalty(run);
                last = Some(m);
                run = 1;
            }
        }
        pen += run_penalty(run);
    }
    pen
}

fn run_penalty(run: u32) -> u32 {
    if run >= 5 {
        run - 2
    } else {
        0
    }
}

// N2: 3 for every 2x2 block of same colored modules
fn compute_block_penalty(grid: &ModuleGrid) -> u32 {
    let mut pen = 0;
    for r in 0..grid.height().saturating_sub(1) {
        for c in 0..grid.width().saturating_sub(1) {
            let m = grid.is_dark(r, c);
            if m == grid.is_dark(r + 1, c)
                && m == grid.is_dark(r, c + 1)
                && m == grid.is_dark(r + 1, c + 1)
            {
                pen += 3;
            }
        }
    }
    pen
}

// N3: 40 for every 1:1:3:1:1 finder like pattern with 4 light modules on
// either side. Modules beyond the symbol edge count as light.
fn compute_finder_pattern_penalty(grid: &ModuleGrid) -> u32 {
    static PATTERN: [bool; 7] = [true, false, true, true, true, false, true];
    let mut pen = 0;
    for line in lines(grid) {
        let n = line.len() as isize;
        let is_light = |i: isize| i < 0 || i >= n || !line[i as usize];
        for j in 0..=n - 7 {
            if !(0..7).all(|k| line[(j + k) as usize] == PATTERN[k as usize]) {
                continue;
            }
            if (j - 4..j).all(is_light) {
                pen += 40;
            }
            if (j + 7..j + 11).all(is_light) {
                pen += 40;
            }
        }
    }
    pen
}

// N4: 10 for every 5% deviation of dark modules from 50%
fn compute_balance_penalty(grid: &ModuleGrid) -> u32 {
    let dark = grid.count_dark_modules();
    let total = grid.width() * grid.height();
    let percent = (dark * 100 / total) as i64;
    ((percent - 50).unsigned_abs() / 5 * 10) as u32
}

#[cfg(test)]
mod penalty_tests {
    use super::{
        compute_adjacent_penalty, compute_balance_penalty, compute_block_penalty,
        compute_finder_pattern_penalty,
    };
    use crate::common::grid::ModuleGrid;

    fn grid_from_str(rows: &[&str]) -> ModuleGrid {
        let w = rows[0].len();
        let modules = rows.iter().flat_map(|r| r.chars().map(|c| c == '#')).collect();
        ModuleGrid::from_modules(w, rows.len(), modules)
    }

    #[test]
    fn test_adjacent_penalty() {
        // Row of 6 dark: 4. Columns: each column "#." has no run
        let grid = grid_from_str(&["######", "......"]);
        // Row 2 contributes 4 as well
        assert_eq!(compute_adjacent_penalty(&grid), 8);
    }

    #[test]
    fn test_block_penalty() {
        let grid = grid_from_str(&["##.", "##.", "..."]);
        // Top left dark block and bottom right light block
        assert_eq!(compute_block_penalty(&grid), 6);
    }

    #[test]
    fn test_finder_pattern_penalty() {
        let grid = grid_from_str(&["#.###.#....."]);
        // Leading light modules lie beyond the edge, trailing ones are in the row
        assert_eq!(compute_finder_pattern_penalty(&grid), 80);
    }

    #[test]
    fn test_balance_penalty() {
        let grid = grid_from_str(&["##########", ".........."]);
        assert_eq!(compute_balance_penalty(&grid), 0);
        let grid = grid_from_str(&["##########", "#######..."]);
        assert_eq!(compute_balance_penalty(&grid), 60);
    }
}
