//! # barcodism
//!
//! A Rust library for generating and reading QR codes and Code 128 barcodes.
//!
//! ## Features
//!
//! - **QR Code Generation**: Versions 1-40, error correction levels L, M, Q and H, automatic or
//!   fixed masking
//! - **Code 128 Generation**: Shortest mix of code sets A, B and C, or a single forced set, with
//!   optional GS1 framing
//! - **Reading**: Adaptive binarization, finder and start pattern location, perspective
//!   correction and Reed-Solomon error correction
//! - **Batch Decoding**: A fixed size worker pool with cancellation and deadlines
//!
//! ## Quick Start
//!
//! ### Generating a QR Code
//!
//! ```rust
//! use barcodism::{ECLevel, QRBuilder, RenderOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Smallest version that fits the data, lowest penalty mask
//! let qr = QRBuilder::new(b"Hello, World!").ec_level(ECLevel::Q).build()?;
//!
//! let img = barcodism::render::render(&qr.to_grid(), &RenderOptions::default().module_size(4));
//! assert_eq!(img.width(), (qr.width() as u32 + 8) * 4);
//! # Ok(())
//! # }
//! ```
//!
//! ### Generating a Code 128 Barcode
//!
//! ```rust
//! use barcodism::{Code128Builder, CodeSet};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let symbol = Code128Builder::new(b"12345").code_set(CodeSet::B).build()?;
//! assert_eq!(symbol.values(), [104, 17, 18, 19, 20, 21, 90]);
//! # Ok(())
//! # }
//! ```
//!
//! ### Reading Barcodes
//!
//! ```rust,no_run
//! use barcodism::{Reader, ReaderOptions, Speed};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("barcode.png")?.to_luma8();
//!
//! let opts = ReaderOptions { speed: Speed::Detailed, expect_multiple: true, ..Default::default() };
//! let outcome = Reader::new(opts)?.read(&img);
//! for res in outcome.results {
//!     println!("{}: {} ({:.2})", res.symbology, res.text, res.confidence);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Batch Decoding
//!
//! ```rust,no_run
//! use barcodism::{BatchDecoder, CancelToken, ReaderOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let images = ["a.png", "b.png"]
//!     .iter()
//!     .map(|p| image::open(p).map(|img| img.to_luma8()))
//!     .collect::<Result<Vec<_>, _>>()?;
//!
//! let opts = ReaderOptions { max_workers: 2, deadline_ms: Some(5_000), ..Default::default() };
//! let report = BatchDecoder::new(opts)?.decode_all_with(&images, &CancelToken::new());
//! for res in report.results {
//!     println!("image {}: {}", res.source_index, res.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Correction Levels
//! - **L (Low)**: ~7% error correction
//! - **M (Medium)**: ~15% error correction
//! - **Q (Quartile)**: ~25% error correction
//! - **H (High)**: ~30% error correction

#![allow(clippy::items_after_test_module, clippy::suspicious_arithmetic_impl, clippy::suspicious_op_assign_impl)]

pub mod batch;
pub mod builder;
pub mod code128;
pub mod common;
pub mod reader;
pub mod render;
pub mod symbology;

pub use batch::{BatchDecoder, BatchReport, CancelToken};
pub use builder::{QRBuilder, QR};
pub use code128::{Code128, Code128Builder, CodeSet};
pub use common::error::{BarcodeError, BarcodeResult};
pub use common::grid::ModuleGrid;
pub use common::mask::MaskPattern;
pub use common::metadata::{ECLevel, Version};
pub use reader::{
    BoundingBox, CropRegion, DecodeResult, ReadOutcome, Reader, ReaderOptions, RejectReason,
    Rejection, Speed,
};
pub use render::RenderOptions;
pub use symbology::{Barcode, EncodeOptions, Symbology, SymbologyCodec};
