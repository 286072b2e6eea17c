use std::sync::LazyLock;

use crate::common::galois::{generator_poly, G};

// Error correction codewords
//------------------------------------------------------------------------------

/// Remainder of `data(x) * x^ec_len` modulo the generator polynomial. Each data
/// codeword is fed through a shift register of `ec_len` cells.
pub fn ecc(data: &[u8], ec_len: usize) -> Vec<u8> {
    let poly = &GENERATOR_POLYNOMIALS[ec_len];
    let mut reg = vec![0u8; ec_len];
    if ec_len == 0 {
        return reg;
    }
    for &d in data {
        let feedback = G(d ^ reg[0]);
        reg.rotate_left(1);
        reg[ec_len - 1] = 0;
        if feedback.is_zero() {
            continue;
        }
        for (cell, &g) in reg.iter_mut().zip(poly.iter()) {
            *cell ^= u8::from(g * feedback);
        }
    }
    reg
}


// Global constants
//------------------------------------------------------------------------------

// Generator polynomials for every ecc count from 0 to 254
static GENERATOR_POLYNOMIALS: LazyLock<Vec<Vec<G>>> =
    LazyLock::new(|| (0..255).map(generator_poly).collect());
