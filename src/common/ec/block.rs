use super::ecc;

// Codeword block
//------------------------------------------------------------------------------

/// Reed-Solomon codeword: data codewords followed by their ecc codewords.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Block {
    pub(super) codewords: Vec<u8>,
    pub(super) data_len: usize,
}

impl Block {
    /// Block holding `data` and `ec_len` freshly computed ecc codewords.
    pub fn encode(data: &[u8], ec_len: usize) -> Self {
        let mut codewords = Vec::with_capacity(data.len() + ec_len);
        codewords.extend_from_slice(data);
        codewords.extend(ecc(data, ec_len));
        Self { codewords, data_len: data.len() }
    }

    /// Block as read from a symbol, possibly damaged. The last `ec_len`
    /// codewords are ecc.
    pub fn received(codewords: Vec<u8>, ec_len: usize) -> Self {
        debug_assert!(ec_len <= codewords.len(), "More ecc than codewords: {ec_len}");
        let data_len = codewords.len().saturating_sub(ec_len);
        Self { codewords, data_len }
    }

    pub fn len(&self) -> usize {
        self.codewords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codewords.is_empty()
    }

    pub fn ec_len(&self) -> usize {
        self.len() - self.data_len
    }

    pub fn data_len(&self) -> usize {
        self.data_len
    }

    pub fn codewords(&self) -> &[u8] {
        &self.codewords
    }

    pub fn data(&self) -> &[u8] {
        &self.codewords[..self.data_len]
    }

    pub fn ecc(&self) -> &[u8] {
        &self.codewords[self.data_len..]
    }
}

#[cfg(test)]
mod block_tests {
    use super::Block;

    #[test]
    fn test_encode_splits_data_and_ecc() {
        let blk = Block::encode(b"abc", 4);
        assert_eq!(blk.len(), 7);
        assert_eq!(blk.data(), b"abc");
        assert_eq!(blk.ecc().len(), blk.ec_len());
        assert_eq!(Block::received(blk.codewords().to_vec(), 4), blk);
    }
}
