use super::Block;
use crate::common::{
    error::{BarcodeError, BarcodeResult},
    galois::{eval_poly, G},
};

// Rectifier
// Codeword c[0..n] is read as the polynomial c[0]x^(n-1) + ... + c[n-1], so the
// error locator of position j is alpha^(n-1-j)
//------------------------------------------------------------------------------

impl Block {
    /// Corrects the block in place and returns the number of corrected codewords.
    pub fn rectify(&mut self) -> BarcodeResult<usize> {
        // Compute syndromes
        let synd = match self.syndromes() {
            None => return Ok(0),
            Some(s) => s,
        };

        // Error locator polynomial
        let (sig, err_cnt) = berlekamp_massey(&synd);
        if err_cnt == 0 || err_cnt > self.ec_len() / 2 {
            return Err(BarcodeError::UncorrectableError);
        }

        let err_loc = self.chien_search(&sig);
        if err_loc.len() != err_cnt {
            return Err(BarcodeError::UncorrectableError);
        }

        // Sigma derivative. Even powers vanish in characteristic 2
        let mut dsig = vec![G(0); sig.len()];
        for i in (1..sig.len()).step_by(2) {
            dsig[i - 1] = sig[i];
        }

        // Error evaluator
        let omg = omega(&synd, &sig);

        // Error magnitude by Forney's formula, then rectify by XORing data with it
        for &pos in err_loc.iter() {
            let x = G::gen_pow(self.len() - 1 - pos);
            let xinv = x.inv()?;
            let den = eval_poly(dsig.iter(), xinv);
            if den.is_zero() {
                return Err(BarcodeError::UncorrectableError);
            }
            let mag = x * eval_poly(omg.iter(), xinv) * den.inv()?;
            self.codewords[pos] ^= u8::from(mag);
        }

        match self.syndromes() {
            None => Ok(err_cnt),
            Some(_) => Err(BarcodeError::UncorrectableError),
        }
    }

    // S_i = C(alpha^i) for i in 0..ec_len. None when every syndrome is zero
    fn syndromes(&self) -> Option<Vec<G>> {
        let gdata: Vec<G> = self.codewords.iter().rev().map(|&b| G(b)).collect();
        let synd: Vec<G> =
            (0..self.ec_len()).map(|i| eval_poly(gdata.iter(), G::gen_pow(i))).collect();

        if synd.iter().all(|s| s.is_zero()) {
            None
        } else {
            Some(synd)
        }
    }

    // Positions whose inverse locator is a root of sigma
    fn chien_search(&self, sig: &[G]) -> Vec<usize> {
        (0..self.len())
            .filter(|&j| {
                let xinv = G::gen_pow(255 - (self.len() - 1 - j));
                eval_poly(sig.iter(), xinv).is_zero()
            })
            .collect()
    }
}

// Sigma polynomial, lowest degree first, along with the LFSR length
fn berlekamp_massey(synd: &[G]) -> (Vec<G>, usize) {
    let n = synd.len();
    let mut l = 0usize;
    let mut m = 1usize;
    let mut b = G(1);
    let mut cx = vec![G(0); n + 1];
    let mut bx = vec![G(0); n + 1];
    cx[0] = G(1);
    bx[0] = G(1);

    for k in 0..n {
        // Calculate discrepancy
        let mut d = synd[k];
        for i in 1..=l {
            d += cx[i] * synd[k - i];
        }

        if d.is_zero() {
            m += 1;
            continue;
        }

        let tx = cx.clone();
        let scale = d / b;
        for i in 0..=n - m {
            cx[i + m] += scale * bx[i];
        }

        if 2 * l <= k {
            bx = tx;
            l = k + 1 - l;
            b = d;
            m = 1;
        } else {
            m += 1;
        }
    }
    (cx, l)
}

// Error evaluator polynomial: S(x) * sigma(x) mod x^ec_len
fn omega(synd: &[G], sig: &[G]) -> Vec<G> {
    let n = synd.len();
    let mut omg = vec![G(0); n];
    for (i, &s) in synd.iter().enumerate() {
        for (j, &c) in sig.iter().enumerate().take(n - i) {
            omg[i + j] += s * c;
        }
    }
    omg
}


// Rectifier for format and version infos
//------------------------------------------------------------------------------

/// Snaps `info` to the valid codeword within `err_capacity` bit flips, if any.
pub fn rectify_info(info: u32, valid_numbers: &[u32], err_capacity: u32) -> Option<u32> {
    let res = *valid_numbers.iter().min_by_key(|&n| (info ^ n).count_ones())?;

    if (info ^ res).count_ones() <= err_capacity {
        Some(res)
    } else {
        None
    }
}
