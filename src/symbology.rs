use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::{
    builder::{QRBuilder, QR},
    code128::{Code128, Code128Builder, CodeSet},
    common::{
        error::BarcodeResult,
        grid::ModuleGrid,
        mask::MaskPattern,
        metadata::{ECLevel, Version},
    },
    reader::{binarize::BinaryImage, DecodeResult, ReaderOptions, Rejection},
    render::{render, render_color, RenderOptions},
};

// Symbology
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbology {
    Qr,
    Code128,
}

impl Symbology {
    pub const ALL: [Symbology; 2] = [Symbology::Qr, Symbology::Code128];

    pub fn codec(self) -> &'static dyn SymbologyCodec {
        match self {
            Self::Qr => &QrCodec,
            Self::Code128 => &Code128Codec,
        }
    }
}

impl Display for Symbology {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Qr => write!(f, "QR"),
            Self::Code128 => write!(f, "Code 128"),
        }
    }
}

impl FromStr for Symbology {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "qr" | "qrcode" => Ok(Self::Qr),
            "code128" | "code-128" => Ok(Self::Code128),
            _ => Err(format!("Unknown symbology {s}, expected qr or code128")),
        }
    }
}

// Encode options
//------------------------------------------------------------------------------

/// Symbology agnostic encoding parameters. Options that don't apply to the
/// chosen symbology are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    pub ec_level: ECLevel,
    /// Smallest fitting version when unset.
    pub version: Option<Version>,
    /// Lowest penalty mask when unset.
    pub mask: Option<MaskPattern>,
    /// Shortest mix of code sets when unset.
    pub code_set: Option<CodeSet>,
    /// Leading FNC1 for GS1-128.
    pub gs1: bool,
    /// QR Kanji mode for Shift JIS double byte chars.
    pub kanji: bool,
    /// QR ECI assignment announcing the payload charset.
    pub eci: Option<u32>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { ec_level: ECLevel::M, version: None, mask: None, code_set: None, gs1: false, kanji: false, eci: None }
    }
}

// Barcode
//------------------------------------------------------------------------------

/// Encoded symbol of any symbology.
#[derive(Debug, Clone)]
pub enum Barcode {
    Qr(QR),
    Code128(Code128),
}

impl Barcode {
    pub fn symbology(&self) -> Symbology {
        match self {
            Self::Qr(_) => Symbology::Qr,
            Self::Code128(_) => Symbology::Code128,
        }
    }

    pub fn to_grid(&self) -> ModuleGrid {
        match self {
            Self::Qr(qr) => qr.to_grid(),
            Self::Code128(symbol) => symbol.to_grid(),
        }
    }

    pub fn render(&self, opts: &RenderOptions) -> BarcodeResult<GrayImage> {
        opts.verify()?;
        Ok(render(&self.to_grid(), opts))
    }

    pub fn render_color(&self, opts: &RenderOptions) -> BarcodeResult<RgbImage> {
        opts.verify()?;
        Ok(render_color(&self.to_grid(), opts))
    }
}

// Codecs
//------------------------------------------------------------------------------

/// Encode and decode capability shared by every symbology.
pub trait SymbologyCodec: Sync {
    fn symbology(&self) -> Symbology;

    fn encode(&self, data: &[u8], opts: &EncodeOptions) -> BarcodeResult<Barcode>;

    /// Every candidate found in the image, decoded or rejected. An empty list
    /// means nothing was found.
    fn decode(&self, img: &BinaryImage, opts: &ReaderOptions) -> Vec<Result<DecodeResult, Rejection>>;
}

pub struct QrCodec;

impl SymbologyCodec for QrCodec {
    fn symbology(&self) -> Symbology {
        Symbology::Qr
    }

    fn encode(&self, data: &[u8], opts: &EncodeOptions) -> BarcodeResult<Barcode> {
        let mut builder = QRBuilder::new(data);
        builder.ec_level(opts.ec_level).kanji(opts.kanji);
        if let Some(eci) = opts.eci {
            builder.eci(eci);
        }
        if let Some(v) = opts.version {
            builder.version(v);
        }
        if let Some(m) = opts.mask {
            builder.mask(m);
        }
        Ok(Barcode::Qr(builder.build()?))
    }

    fn decode(&self, img: &BinaryImage, opts: &ReaderOptions) -> Vec<Result<DecodeResult, Rejection>> {
        crate::reader::scan_qr(img, opts)
    }
}

pub struct Code128Codec;

impl SymbologyCodec for Code128Codec {
    fn symbology(&self) -> Symbology {
        Symbology::Code128
    }

    fn encode(&self, data: &[u8], opts: &EncodeOptions) -> BarcodeResult<Barcode> {
        let mut builder = Code128Builder::new(data);
        builder.gs1(opts.gs1);
        if let Some(cs) = opts.code_set {
            builder.code_set(cs);
        }
        Ok(Barcode::Code128(builder.build()?))
    }

    fn decode(&self, img: &BinaryImage, opts: &ReaderOptions) -> Vec<Result<DecodeResult, Rejection>> {
        crate::reader::scan_code128(img, opts)
    }
}
