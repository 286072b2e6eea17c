// Error
//------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug, PartialEq, Eq, Copy, Clone)]
pub enum BarcodeError {
    // Encoders
    #[error("Empty data")]
    EmptyData,
    #[error("Data exceeds the capacity of the symbol")]
    CapacityExceeded,
    #[error("Unencodable character {byte:#04x} at position {position}")]
    UnencodableCharacter { byte: u8, position: usize },
    #[error("Invalid version")]
    InvalidVersion,
    #[error("Invalid masking pattern")]
    InvalidMaskPattern,
    #[error("ECI assignment number {0} is out of range")]
    InvalidEci(u32),

    // Field arithmetic
    #[error("Zero has no multiplicative inverse in GF(256)")]
    DomainError,

    // Readers
    #[error("Too many errors to correct successfully")]
    UncorrectableError,
    #[error("Cannot compute homography")]
    SingularMatrix,
    #[error("Projected point is at infinity")]
    PointAtInfinity,
    #[error("Invalid format info detected")]
    InvalidFormatInfo,
    #[error("Invalid version info detected")]
    InvalidVersionInfo,
    #[error("Malformed payload bit stream")]
    InvalidPayload,
    #[error("Checksum mismatch")]
    ChecksumMismatch,
    #[error("Symbol not found")]
    SymbolNotFound,
    #[error("Unsupported operation or options")]
    UnsupportedOperation,

    // Batch
    #[error("Worker pool could not be started")]
    WorkerPool,
}

pub type BarcodeResult<T> = Result<T, BarcodeError>;

#[cfg(test)]
mod error_tests {
    use super::BarcodeError;

    #[test]
    fn test_display() {
        assert_eq!(BarcodeError::CapacityExceeded.to_string(), "Data exceeds the capacity of the symbol");
        let err = BarcodeError::UnencodableCharacter { byte: 0xe9, position: 3 };
        assert_eq!(err.to_string(), "Unencodable character 0xe9 at position 3");
    }
}
