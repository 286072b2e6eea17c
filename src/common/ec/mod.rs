mod block;
mod decoder;
mod encoder;

pub use block::*;
pub use decoder::*;
pub use encoder::*;

use super::error::{BarcodeError, BarcodeResult};

// Reed-Solomon codec over GF(256) for arbitrary (n, k) with n <= 255
//------------------------------------------------------------------------------

/// Appends `ecc_len` error correction codewords to `data`.
pub fn rs_encode(data: &[u8], ecc_len: usize) -> BarcodeResult<Vec<u8>> {
    if data.len() + ecc_len > MAX_BLOCK_SIZE {
        return Err(BarcodeError::CapacityExceeded);
    }
    let mut res = data.to_vec();
    res.extend(ecc(data, ecc_len));
    Ok(res)
}

/// Corrects up to `ecc_len / 2` erroneous codewords and returns the message part.
pub fn rs_decode(codeword: &[u8], ecc_len: usize) -> BarcodeResult<Vec<u8>> {
    if codeword.len() > MAX_BLOCK_SIZE || ecc_len > codeword.len() {
        return Err(BarcodeError::UncorrectableError);
    }
    let mut blk = Block::received(codeword.to_vec(), ecc_len);
    blk.rectify()?;
    Ok(blk.data().to_vec())
}


// Global constants
//------------------------------------------------------------------------------

pub static MAX_BLOCK_SIZE: usize = 255;
