mod decoder;
mod encoder;
pub(crate) mod tables;

pub use tables::CodeSet;

use crate::common::{error::BarcodeResult, grid::ModuleGrid};
use tables::{checksum, PATTERNS, STOP_PATTERN};

// Builder
//------------------------------------------------------------------------------

pub struct Code128Builder<'a> {
    data: &'a [u8],
    code_set: Option<CodeSet>,
    gs1: bool,
}

impl<'a> Code128Builder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, code_set: None, gs1: false }
    }

    pub fn data(&mut self, data: &'a [u8]) -> &mut Self {
        self.data = data;
        self
    }

    /// Restricts encoding to a single code set instead of the shortest mix.
    pub fn code_set(&mut self, code_set: CodeSet) -> &mut Self {
        self.code_set = Some(code_set);
        self
    }

    pub fn unset_code_set(&mut self) -> &mut Self {
        self.code_set = None;
        self
    }

    pub fn gs1(&mut self, gs1: bool) -> &mut Self {
        self.gs1 = gs1;
        self
    }

    pub fn build(&self) -> BarcodeResult<Code128> {
        let mut values = encoder::encode(self.data, self.code_set, self.gs1)?;
        values.push(checksum(&values));
        Ok(Code128 { values, data: self.data.to_vec(), gs1: self.gs1 })
    }
}

// Symbol
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code128 {
    // Start, data and checksum codewords
    values: Vec<u8>,
    data: Vec<u8>,
    gs1: bool,
}

impl Code128 {
    /// Rebuilds a symbol from scanned codewords, start through checksum.
    pub fn from_values(values: Vec<u8>) -> BarcodeResult<Self> {
        let (data, gs1) = decoder::decode(&values)?;
        Ok(Self { values, data, gs1 })
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_gs1(&self) -> bool {
        self.gs1
    }

    pub fn code_set(&self) -> Option<CodeSet> {
        self.values.first().and_then(|&v| CodeSet::from_start(v))
    }

    pub fn checksum(&self) -> u8 {
        self.values.last().copied().unwrap_or_default()
    }

    /// Alternating bar and space widths in modules, starting with a bar and
    /// ending with the stop pattern.
    pub fn widths(&self) -> Vec<u8> {
        let mut res = Vec::with_capacity(self.values.len() * 6 + STOP_PATTERN.len());
        for &v in &self.values {
            res.extend_from_slice(&PATTERNS[v as usize]);
        }
        res.extend_from_slice(&STOP_PATTERN);
        res
    }

    pub fn width(&self) -> usize {
        self.values.len() * tables::SYMBOL_MODULES + tables::STOP_MODULES
    }

    /// Single row of modules without quiet zone.
    pub fn to_grid(&self) -> ModuleGrid {
        let mut modules = Vec::with_capacity(self.width());
        for (i, &w) in self.widths().iter().enumerate() {
            modules.extend(std::iter::repeat(i & 1 == 0).take(w as usize));
        }
        let w = modules.len();
        ModuleGrid::from_modules(w, 1, modules)
    }
}
