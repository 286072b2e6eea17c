pub mod binarize;
mod finder;
mod linear;
mod symbol;
mod utils;

pub use symbol::{decode_grid, read_version_info, DecodedQr};

pub(crate) use linear::scan as scan_code128;
pub(crate) use symbol::scan as scan_qr;

use std::{fmt::Display, time::Duration};

use image::{imageops, DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

use crate::{
    common::error::{BarcodeError, BarcodeResult},
    symbology::Symbology,
};
use binarize::BinaryImage;

// Reader options
//------------------------------------------------------------------------------

/// Effort spent per image. Higher levels scan more lines and orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum Speed {
    Faster,
    #[default]
    Balanced,
    Detailed,
    ExtremeDetail,
}

/// Pixel rectangle to restrict the search to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    // Intersection with a w x h image, None when nothing is left
    pub fn clamp(&self, w: u32, h: u32) -> Option<Self> {
        let x0 = self.x.min(w);
        let y0 = self.y.min(h);
        let x1 = self.x.saturating_add(self.width).min(w);
        let y1 = self.y.saturating_add(self.height).min(h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self::new(x0, y0, x1 - x0, y1 - y0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    pub expected_symbologies: Vec<Symbology>,
    /// Keep scanning after the first accepted symbol.
    pub expect_multiple: bool,
    pub crop_region: Option<CropRegion>,
    pub speed: Speed,
    /// Results scoring below this are reported as rejections.
    pub confidence_threshold: f32,
    /// Threads in the batch pool.
    pub max_workers: usize,
    /// Budget for a whole batch in milliseconds.
    pub deadline_ms: Option<u64>,
    /// Also scan a luminance inverted copy. Implied by ExtremeDetail.
    pub try_inverted: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            expected_symbologies: Symbology::ALL.to_vec(),
            expect_multiple: false,
            crop_region: None,
            speed: Speed::default(),
            confidence_threshold: 0.0,
            max_workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            deadline_ms: None,
            try_inverted: false,
        }
    }
}

impl ReaderOptions {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    pub fn scans_inverted(&self) -> bool {
        self.try_inverted || self.speed == Speed::ExtremeDetail
    }

    pub fn verify(&self) -> BarcodeResult<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold)
            || self.max_workers == 0
            || self.expected_symbologies.is_empty()
        {
            return Err(BarcodeError::UnsupportedOperation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod reader_options_tests {
    use std::time::Duration;

    use super::{CropRegion, ReaderOptions, Speed};
    use crate::{common::error::BarcodeError, symbology::Symbology};

    #[test]
    fn test_partial_json() {
        let opts: ReaderOptions =
            serde_json::from_str(r#"{ "speed": "Detailed", "deadline_ms": 250 }"#).unwrap();
        assert_eq!(opts.speed, Speed::Detailed);
        assert_eq!(opts.deadline(), Some(Duration::from_millis(250)));
        assert_eq!(opts.expected_symbologies, [Symbology::Qr, Symbology::Code128]);
        assert!(!opts.expect_multiple);
        assert!(opts.max_workers >= 1);
    }

    #[test]
    fn test_verify() {
        assert!(ReaderOptions::default().verify().is_ok());
        let opts = ReaderOptions { confidence_threshold: 1.5, ..Default::default() };
        assert_eq!(opts.verify(), Err(BarcodeError::UnsupportedOperation));
        let opts = ReaderOptions { max_workers: 0, ..Default::default() };
        assert_eq!(opts.verify(), Err(BarcodeError::UnsupportedOperation));
    }

    #[test]
    fn test_crop_clamp() {
        let crop = CropRegion::new(50, 10, 100, 100);
        assert_eq!(crop.clamp(120, 80), Some(CropRegion::new(50, 10, 70, 70)));
        assert_eq!(crop.clamp(40, 80), None);
    }

    #[test]
    fn test_inverted() {
        assert!(!ReaderOptions::default().scans_inverted());
        let opts = ReaderOptions { speed: Speed::ExtremeDetail, ..Default::default() };
        assert!(opts.scans_inverted());
    }
}

// Results
//------------------------------------------------------------------------------

/// Quadrilateral in image pixels, clockwise from the symbol's top left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub corners: [(f32, f32); 4],
}

impl BoundingBox {
    pub fn new(corners: [(f32, f32); 4]) -> Self {
        Self { corners }
    }

    pub fn from_rect(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new([(left, top), (right, top), (right, bottom), (left, bottom)])
    }

    pub fn left(&self) -> f32 {
        self.corners.iter().map(|c| c.0).fold(f32::MAX, f32::min)
    }

    pub fn top(&self) -> f32 {
        self.corners.iter().map(|c| c.1).fold(f32::MAX, f32::min)
    }

    pub fn right(&self) -> f32 {
        self.corners.iter().map(|c| c.0).fold(f32::MIN, f32::max)
    }

    pub fn bottom(&self) -> f32 {
        self.corners.iter().map(|c| c.1).fold(f32::MIN, f32::max)
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.corners.map(|(x, y)| (x + dx, y + dy)))
    }

    /// Axis aligned envelope of both boxes.
    pub fn union(&self, other: &BoundingBox) -> Self {
        Self::from_rect(
            self.left().min(other.left()),
            self.top().min(other.top()),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    // Axis aligned envelopes intersect
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.left() <= other.right()
            && other.left() <= self.right()
            && self.top() <= other.bottom()
            && other.top() <= self.bottom()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeResult {
    pub payload: Vec<u8>,
    pub text: String,
    pub symbology: Symbology,
    /// In [0, 1], higher is better.
    pub confidence: f32,
    pub bounds: BoundingBox,
    pub source_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    Failed(BarcodeError),
    LowConfidence(f32),
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(e) => write!(f, "{e}"),
            Self::LowConfidence(c) => write!(f, "Confidence {c:.2} below threshold"),
        }
    }
}

/// Candidate that was located but did not make it into the results.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub symbology: Symbology,
    pub bounds: BoundingBox,
    pub reason: RejectReason,
    pub source_index: usize,
}

impl Rejection {
    pub fn failed(symbology: Symbology, bounds: BoundingBox, err: BarcodeError) -> Self {
        Self { symbology, bounds, reason: RejectReason::Failed(err), source_index: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadOutcome {
    pub results: Vec<DecodeResult>,
    pub rejections: Vec<Rejection>,
}

impl ReadOutcome {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}


// Reader
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Reader {
    opts: ReaderOptions,
}

impl Reader {
    pub fn new(opts: ReaderOptions) -> BarcodeResult<Self> {
        opts.verify()?;
        Ok(Self { opts })
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.opts
    }

    pub fn read(&self, img: &GrayImage) -> ReadOutcome {
        self.read_indexed(img, 0)
    }

    pub fn read_dynamic(&self, img: &DynamicImage) -> ReadOutcome {
        self.read(&img.to_luma8())
    }

    /// Convenience for callers expecting exactly one symbol.
    pub fn read_one(&self, img: &GrayImage) -> BarcodeResult<DecodeResult> {
        self.read(img).results.into_iter().next().ok_or(BarcodeError::SymbolNotFound)
    }

    /// Decodes every expected symbology in the image, tagging results with
    /// `source_index`. Finding nothing yields an empty outcome.
    pub fn read_indexed(&self, img: &GrayImage, source_index: usize) -> ReadOutcome {
        let (w, h) = img.dimensions();
        let crop = match self.opts.crop_region {
            Some(region) => match region.clamp(w, h) {
                Some(c) => c,
                None => {
                    log::warn!("Crop region {region:?} lies outside the {w}x{h} image");
                    return ReadOutcome::default();
                }
            },
            None => CropRegion::new(0, 0, w, h),
        };
        if crop.width == 0 || crop.height == 0 {
            return ReadOutcome::default();
        }

        let bin = match self.opts.crop_region {
            Some(_) => {
                let view = imageops::crop_imm(img, crop.x, crop.y, crop.width, crop.height);
                BinaryImage::binarize(&view.to_image())
            }
            None => BinaryImage::binarize(img),
        };

        let mut passes = vec![bin];
        if self.opts.scans_inverted() {
            passes.push(passes[0].invert());
        }

        let mut outcome = ReadOutcome::default();
        'passes: for pass in &passes {
            for &sym in dedup(&self.opts.expected_symbologies).iter() {
                for item in sym.codec().decode(pass, &self.opts) {
                    match item {
                        Ok(res) if res.confidence < self.opts.confidence_threshold => {
                            let reason = RejectReason::LowConfidence(res.confidence);
                            let rej = Rejection { symbology: sym, bounds: res.bounds, reason, source_index };
                            push_rejection(&mut outcome.rejections, rej);
                        }
                        Ok(res) => {
                            let dup = outcome.results.iter().any(|r| {
                                r.symbology == res.symbology
                                    && r.payload == res.payload
                                    && r.bounds.overlaps(&res.bounds)
                            });
                            if !dup {
                                log::debug!("Decoded {} symbol: {:?}", res.symbology, res.text);
                                outcome.results.push(res);
                            }
                        }
                        Err(rej) => push_rejection(&mut outcome.rejections, rej),
                    }
                    if !self.opts.expect_multiple && !outcome.results.is_empty() {
                        break 'passes;
                    }
                }
            }
        }

        // Candidates recovered by another pass are not rejections
        outcome.rejections.retain(|rej| {
            !outcome.results.iter().any(|r| r.symbology == rej.symbology && r.bounds.overlaps(&rej.bounds))
        });

        let (dx, dy) = (crop.x as f32, crop.y as f32);
        for res in outcome.results.iter_mut() {
            res.bounds = res.bounds.translate(dx, dy);
            res.source_index = source_index;
        }
        for rej in outcome.rejections.iter_mut() {
            rej.bounds = rej.bounds.translate(dx, dy);
            rej.source_index = source_index;
        }

        log::debug!(
            "Image {source_index}: {} results, {} rejections",
            outcome.results.len(),
            outcome.rejections.len()
        );
        outcome
    }
}

fn dedup(symbologies: &[Symbology]) -> Vec<Symbology> {
    let mut res = Vec::with_capacity(symbologies.len());
    for &s in symbologies {
        if !res.contains(&s) {
            res.push(s);
        }
    }
    res
}

fn push_rejection(rejections: &mut Vec<Rejection>, rej: Rejection) {
    let dup = rejections.iter().any(|r| {
        r.symbology == rej.symbology && r.reason == rej.reason && r.bounds.overlaps(&rej.bounds)
    });
    if !dup {
        log::debug!("Rejected {} candidate: {}", rej.symbology, rej.reason);
        rejections.push(rej);
    }
}

#[cfg(test)]
mod reader_tests {
    use image::{GrayImage, Luma};

    use super::{CropRegion, Reader, ReaderOptions, RejectReason};
    use crate::{
        builder::QRBuilder,
        code128::Code128Builder,
        common::{error::BarcodeError, metadata::ECLevel},
        render::{render, RenderOptions},
        symbology::Symbology,
    };

    fn qr_image(data: &str) -> GrayImage {
        let qr = QRBuilder::new(data.as_bytes()).ec_level(ECLevel::M).build().unwrap();
        render(&qr.to_grid(), &RenderOptions::default().module_size(6))
    }

    #[test]
    fn test_blank_image_is_empty() {
        let img = GrayImage::from_pixel(200, 200, Luma([255]));
        let outcome = Reader::default().read(&img);
        assert!(outcome.results.is_empty());
        assert_eq!(Reader::default().read_one(&img), Err(BarcodeError::SymbolNotFound));
    }

    #[test]
    fn test_read_qr() {
        let res = Reader::default().read_one(&qr_image("Hello, world!")).unwrap();
        assert_eq!(res.payload, b"Hello, world!");
        assert_eq!(res.text, "Hello, world!");
        assert_eq!(res.symbology, Symbology::Qr);
        assert_eq!(res.confidence, 1.0);
    }

    #[test]
    fn test_read_code128() {
        let symbol = Code128Builder::new(b"Code 128").build().unwrap();
        let img = render(&symbol.to_grid(), &RenderOptions::default().module_size(3));
        let opts = ReaderOptions { expected_symbologies: vec![Symbology::Code128], ..Default::default() };
        let res = Reader::new(opts).unwrap().read_one(&img).unwrap();
        assert_eq!(res.text, "Code 128");
        assert_eq!(res.symbology, Symbology::Code128);
    }

    #[test]
    fn test_crop_translates_bounds() {
        let sym = qr_image("crop");
        let mut img = GrayImage::from_pixel(sym.width() + 100, sym.height() + 60, Luma([255]));
        image::imageops::replace(&mut img, &sym, 100, 60);

        let crop = CropRegion::new(90, 50, sym.width() + 10, sym.height() + 10);
        let opts = ReaderOptions { crop_region: Some(crop), ..Default::default() };
        let res = Reader::new(opts).unwrap().read_one(&img).unwrap();
        assert_eq!(res.payload, b"crop");
        // Quiet zone is 4 modules of 6 px
        assert!((res.bounds.left() - 124.0).abs() < 3.0, "{:?}", res.bounds);
        assert!((res.bounds.top() - 84.0).abs() < 3.0, "{:?}", res.bounds);
    }

    #[test]
    fn test_crop_missing_symbol() {
        let sym = qr_image("crop");
        let opts = ReaderOptions { crop_region: Some(CropRegion::new(0, 0, 20, 20)), ..Default::default() };
        assert!(Reader::new(opts).unwrap().read(&sym).is_empty());
    }

    #[test]
    fn test_confidence_threshold() {
        let qr = QRBuilder::new(b"threshold").ec_level(ECLevel::H).build().unwrap();
        let mut grid = qr.to_grid();
        // Corrupt a few data modules far from the function patterns
        for c in 9..13 {
            let dark = grid.is_dark(10, c);
            grid.set(10, c, !dark);
        }
        let img = render(&grid, &RenderOptions::default().module_size(6));

        let accepted = Reader::default().read_one(&img).unwrap();
        assert!(accepted.confidence < 1.0 && accepted.confidence >= 0.5);

        let opts = ReaderOptions { confidence_threshold: 0.999, ..Default::default() };
        let outcome = Reader::new(opts).unwrap().read(&img);
        assert!(outcome.results.is_empty());
        assert!(outcome
            .rejections
            .iter()
            .any(|r| matches!(r.reason, RejectReason::LowConfidence(c) if c == accepted.confidence)));
    }

    #[test]
    fn test_expect_multiple() {
        let (a, b) = (qr_image("first"), qr_image("second"));
        let mut img = GrayImage::from_pixel(a.width() + b.width(), a.height().max(b.height()), Luma([255]));
        image::imageops::replace(&mut img, &a, 0, 0);
        image::imageops::replace(&mut img, &b, a.width() as i64, 0);

        assert_eq!(Reader::default().read(&img).results.len(), 1);

        let opts = ReaderOptions { expect_multiple: true, ..Default::default() };
        let mut payloads =
            Reader::new(opts).unwrap().read(&img).results.into_iter().map(|r| r.payload).collect::<Vec<_>>();
        payloads.sort();
        assert_eq!(payloads, [b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn test_inverted() {
        let mut img = qr_image("inverted");
        image::imageops::invert(&mut img);
        let opts = ReaderOptions { try_inverted: true, ..Default::default() };
        let res = Reader::new(opts).unwrap().read_one(&img).unwrap();
        assert_eq!(res.payload, b"inverted");
    }
}
