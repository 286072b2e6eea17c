use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};

use super::error::{BarcodeError, BarcodeResult};

// Galois field element of GF(256) with primitive polynomial x^8 + x^4 + x^3 + x^2 + 1
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct G(pub u8);

impl G {
    pub const ZERO: G = G(0);
    pub const ONE: G = G(1);

    /// Returns alpha^pow, alpha being the primitive element 2
    pub fn gen_pow(pow: usize) -> Self {
        G(EXP_TABLE[pow % 255])
    }

    pub fn log(self) -> BarcodeResult<usize> {
        if self.0 == 0 {
            return Err(BarcodeError::DomainError);
        }
        Ok(LOG_TABLE[self.0 as usize] as usize)
    }

    pub fn inv(self) -> BarcodeResult<Self> {
        let log = self.log()?;
        Ok(G(EXP_TABLE[(255 - log) % 255]))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<G> for u8 {
    fn from(g: G) -> Self {
        g.0
    }
}

impl Add for G {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        G(self.0 ^ rhs.0)
    }
}

impl AddAssign for G {
    fn add_assign(&mut self, rhs: Self) {
        self.0 ^= rhs.0;
    }
}

impl Sub for G {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        G(self.0 ^ rhs.0)
    }
}

impl Mul for G {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        if self.0 == 0 || rhs.0 == 0 {
            return G(0);
        }
        let log_sum = LOG_TABLE[self.0 as usize] as usize + LOG_TABLE[rhs.0 as usize] as usize;
        G(EXP_TABLE[log_sum % 255])
    }
}

impl MulAssign for G {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

// Panics on a zero divisor; fallible callers should go through `G::inv`
impl Div for G {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        assert!(rhs.0 != 0, "Division by zero in GF(256)");
        if self.0 == 0 {
            return G(0);
        }
        let log_diff =
            LOG_TABLE[self.0 as usize] as usize + 255 - LOG_TABLE[rhs.0 as usize] as usize;
        G(EXP_TABLE[log_diff % 255])
    }
}


// Polynomial helpers
// Coefficients are stored lowest degree first unless stated otherwise
//------------------------------------------------------------------------------

pub fn eval_poly<'a>(poly: impl Iterator<Item = &'a G>, x: G) -> G {
    let mut res = G(0);
    let mut xpow = G(1);
    for &coeff in poly {
        res += coeff * xpow;
        xpow *= x;
    }
    res
}

/// Generator polynomial prod(x - alpha^i) for i in 0..degree. Coefficients are
/// highest degree first, without the leading monic term.
pub fn generator_poly(degree: usize) -> Vec<G> {
    let mut poly = vec![G::ONE];
    for i in 0..degree {
        let root = G::gen_pow(i);
        let mut next = vec![G::ZERO; poly.len() + 1];
        for (j, &c) in poly.iter().enumerate() {
            next[j] += c;
            next[j + 1] += c * root;
        }
        poly = next;
    }
    poly.remove(0);
    poly
}


// Global constants
//------------------------------------------------------------------------------

pub const PRIMITIVE_POLY: u16 = 0x11d;

const fn build_exp_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 256 {
        table[i] = x as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIMITIVE_POLY;
        }
        i += 1;
    }
    table
}

const fn build_log_table() -> [u8; 256] {
    let exp = build_exp_table();
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 255 {
        table[exp[i] as usize] = i as u8;
        i += 1;
    }
    table
}

pub static EXP_TABLE: [u8; 256] = build_exp_table();

pub static LOG_TABLE: [u8; 256] = build_log_table();
