use std::fmt::{Display, Formatter};

use super::metadata::Color;

// Module grid
// Logical symbol matrix shared by every encoder and decoder. A 1D symbol is a
// grid of height 1 where each column is one module wide bar or space.
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleGrid {
    w: usize,
    h: usize,
    modules: Vec<bool>, // true is dark
}

impl ModuleGrid {
    pub fn new(w: usize, h: usize) -> Self {
        Self { w, h, modules: vec![false; w * h] }
    }

    pub fn from_modules(w: usize, h: usize, modules: Vec<bool>) -> Self {
        assert_eq!(modules.len(), w * h, "Module count doesn't match dimensions");
        Self { w, h, modules }
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    pub fn modules(&self) -> &[bool] {
        &self.modules
    }

    pub fn is_dark(&self, r: usize, c: usize) -> bool {
        debug_assert!(r < self.h && c < self.w, "Out of grid bounds: Row {r}, Col {c}");
        self.modules[r * self.w + c]
    }

    pub fn get(&self, r: usize, c: usize) -> Color {
        Color::from(self.is_dark(r, c))
    }

    pub fn set(&mut self, r: usize, c: usize, dark: bool) {
        debug_assert!(r < self.h && c < self.w, "Out of grid bounds: Row {r}, Col {c}");
        self.modules[r * self.w + c] = dark;
    }

    // Negative indices wrap around from the far edge
    pub fn get_wrapped(&self, r: i16, c: i16) -> Color {
        let (w, h) = (self.w as i16, self.h as i16);
        debug_assert!(-h <= r && r < h, "Row out of bounds: {r}");
        debug_assert!(-w <= c && c < w, "Column out of bounds: {c}");

        let r = if r < 0 { r + h } else { r };
        let c = if c < 0 { c + w } else { c };
        self.get(r as usize, c as usize)
    }

    pub fn row(&self, r: usize) -> &[bool] {
        &self.modules[r * self.w..(r + 1) * self.w]
    }

    pub fn count_dark_modules(&self) -> usize {
        self.modules.iter().filter(|&&m| m).count()
    }

    /// Run lengths of the first row, alternating colors from the first module.
    pub fn run_lengths(&self) -> Vec<usize> {
        let row = self.row(0);
        let mut runs: Vec<usize> = Vec::new();
        let mut last = true;
        for &m in row {
            match runs.last_mut() {
                Some(run) if m == last => *run += 1,
                _ => {
                    runs.push(1);
                    last = m;
                }
            }
        }
        runs
    }
}

impl Display for ModuleGrid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for r in 0..self.h {
            let line: String = self.row(r).iter().map(|&m| if m { '█' } else { ' ' }).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
