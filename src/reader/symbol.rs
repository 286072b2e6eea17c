use super::{
    binarize::BinaryImage,
    finder::{group_finders, locate_finders, FinderGroup},
    utils::{
        geometry::{Axis, Point},
        homography::Homography,
        measure_runs,
    },
    BoundingBox, DecodeResult, ReaderOptions, Rejection,
};
use crate::{
    builder::{Module, QR},
    common::{
        codec::{decode, Payload},
        ec::{rectify_info, Block},
        error::{BarcodeError, BarcodeResult},
        grid::ModuleGrid,
        iter::EncRegionIter,
        mask::MaskPattern,
        metadata::{ECLevel, Metadata, Version},
        version_db::{
            FORMAT_INFOS, FORMAT_INFO_COORDS_MAIN, FORMAT_INFO_COORDS_SIDE, VERSION_INFOS,
            VERSION_INFO_COORDS_BL, VERSION_INFO_COORDS_TR,
        },
    },
    symbology::Symbology,
};

// Scan
//------------------------------------------------------------------------------

/// Locates QR symbols in the binary image and decodes each of them. Failed
/// candidates come back as rejections.
pub fn scan(img: &BinaryImage, opts: &ReaderOptions) -> Vec<Result<DecodeResult, Rejection>> {
    let finders = locate_finders(img);
    let groups = group_finders(&finders);

    let mut res = Vec::with_capacity(groups.len());
    for group in groups.iter() {
        let item = decode_group(img, group);
        let found = item.is_ok();
        res.push(item);
        if found && !opts.expect_multiple {
            break;
        }
    }
    res
}

// Tries the estimated version and its neighbours, then whatever the version
// info of a sampled grid points at
fn decode_group(img: &BinaryImage, group: &FinderGroup) -> Result<DecodeResult, Rejection> {
    let est = ((group.estimated_width() - 17.0) / 4.0).round().clamp(1.0, 40.0) as usize;
    let mut candidates: Vec<Version> =
        [est, est - 1, est + 1].into_iter().filter_map(|v| Version::new(v).ok()).collect();
    log::trace!("Finder group rotated {:.0} degrees, estimated version {est}", group.angle.to_degrees());

    let mut err = BarcodeError::SymbolNotFound;
    let mut i = 0;
    while i < candidates.len() {
        let ver = candidates[i];
        i += 1;

        let sampled = locate(img, group, ver).and_then(|h| Ok((sample_grid(img, &h, ver)?, h)));
        let (grid, h) = match sampled {
            Ok(s) => s,
            Err(e) => {
                err = e;
                continue;
            }
        };

        match decode_grid(&grid) {
            Ok(decoded) => return Ok(to_result(decoded, &h, ver)),
            Err(BarcodeError::InvalidVersionInfo) => {
                if let Ok(v) = read_version_info(&grid) {
                    if !candidates.contains(&v) {
                        log::debug!("Version info points at version {}, resampling", *v);
                        candidates.push(v);
                    }
                }
                err = BarcodeError::InvalidVersionInfo;
            }
            Err(e) => err = e,
        }
        log::trace!("Version {} failed for finder group: {err}", *ver);
    }

    Err(Rejection::failed(Symbology::Qr, group_bounds(group), err))
}

fn to_result(decoded: DecodedQr, h: &Homography, ver: Version) -> DecodeResult {
    let Metadata { version, ec_level, .. } = decoded.metadata;
    let cap = version.ec_capacity(ec_level);
    let ratio = if cap == 0 { 1.0 } else { (decoded.corrected as f32 / cap as f32).min(1.0) };
    let confidence = 0.5 + 0.5 * (1.0 - ratio);
    log::debug!("Decoded QR {} with {} corrected codewords", decoded.metadata, decoded.corrected);

    let payload = Payload { bytes: decoded.payload, eci: decoded.eci };
    let w = ver.width() as f64;
    let corners = [(0.0, 0.0), (w, 0.0), (w, w), (0.0, w)]
        .map(|(x, y)| h.map(x, y).map(|p| (p.x as f32, p.y as f32)).unwrap_or_default());

    DecodeResult {
        text: payload.text(),
        payload: payload.bytes,
        symbology: Symbology::Qr,
        confidence,
        bounds: BoundingBox::new(corners),
        source_index: 0,
    }
}

// Envelope of the finder group, padded to the outer edge of the finders
fn group_bounds(group: &FinderGroup) -> BoundingBox {
    let [tl, tr, bl] = group.finders;
    let br = tr + bl - tl;
    let pts = [tl, tr, br, bl];
    let pad = group.module * 3.5;
    let left = pts.iter().map(|p| p.x).fold(f64::MAX, f64::min) - pad;
    let top = pts.iter().map(|p| p.y).fold(f64::MAX, f64::min) - pad;
    let right = pts.iter().map(|p| p.x).fold(f64::MIN, f64::max) + pad;
    let bottom = pts.iter().map(|p| p.y).fold(f64::MIN, f64::max) + pad;
    BoundingBox::from_rect(left as f32, top as f32, right as f32, bottom as f32)
}

// Locate symbol
// Module space has x along columns and y along rows, both in modules. The
// centre of module (r, c) is (c + 0.5, r + 0.5)
//------------------------------------------------------------------------------

fn locate(img: &BinaryImage, group: &FinderGroup, ver: Version) -> BarcodeResult<Homography> {
    let [tl, tr, bl] = group.finders;
    let w = ver.width() as f64;

    let align = match *ver {
        1 => None,
        _ => {
            let k = (w - 10.0) / (w - 7.0);
            let estimate = tl + (tr - tl) * k + (bl - tl) * k;
            locate_alignment_pattern(img, estimate, group.module)
        }
    };

    let (src_4, dst_4) = match align {
        Some(a) => (Point::new(w - 6.5, w - 6.5), a),
        None => (Point::new(w - 3.5, w - 3.5), tr + bl - tl),
    };
    let src = [Point::new(3.5, 3.5), Point::new(w - 3.5, 3.5), src_4, Point::new(3.5, w - 3.5)];
    let dst = [tl, tr, dst_4, bl];

    let h = Homography::compute(src, dst)?;
    Ok(jiggle_homography(img, h, ver))
}

// Searches around the estimate for a dark stone inside a light ring, the
// 1:1:1 cross section of the bottom right alignment pattern. Picks the
// candidate nearest to the estimate
fn locate_alignment_pattern(img: &BinaryImage, estimate: Point, module: f64) -> Option<Point> {
    let radius = (module * ALIGNMENT_SEARCH_RADIUS).ceil() as i32;
    let step = ((module / 3.0) as i32).max(1);
    let max_run = (module * 2.0).ceil() as u32;
    let (ex, ey) = estimate.pixel();

    let mut best: Option<(Point, f64)> = None;
    for dy in (-radius..=radius).step_by(step as usize) {
        for dx in (-radius..=radius).step_by(step as usize) {
            let seed = (ex + dx, ey + dy);
            if img.get(seed.0, seed.1) != Some(true) {
                continue;
            }
            let Some(cand) = verify_alignment(img, seed, module, max_run) else { continue };
            let d = cand.dist_sq(&estimate);
            match best {
                Some((_, bd)) if bd <= d => {}
                _ => best = Some((cand, d)),
            }
        }
    }

    if best.is_none() {
        log::debug!("No alignment pattern near {estimate:?}, falling back to affine estimate");
    }
    best.map(|(p, _)| p)
}

fn verify_alignment(img: &BinaryImage, seed: (i32, i32), module: f64, max_run: u32) -> Option<Point> {
    let plausible = |total: u32| (module * 1.5..=module * 4.5).contains(&(total as f64));

    let vert = measure_runs(img, seed, Axis::Y, 3, max_run)?;
    if !vert.matches(&ALIGNMENT_PATTERN) || !plausible(vert.total()) {
        return None;
    }
    let cy = vert.centre.floor() as i32;
    let horz = measure_runs(img, (seed.0, cy), Axis::X, 3, max_run)?;
    if !horz.matches(&ALIGNMENT_PATTERN) || !plausible(horz.total()) {
        return None;
    }
    Some(Point::new(horz.centre, vert.centre))
}

// Nudges each coefficient of the homography while the sampled function
// patterns agree better with their expected colours
fn jiggle_homography(img: &BinaryImage, mut h: Homography, ver: Version) -> Homography {
    let mut best = symbol_fitness(img, &h, ver);
    let mut adjustments = h.0.map(|x| x * 0.02);

    for _ in 0..JIGGLE_PASSES {
        for i in 0..16 {
            let j = i >> 1;
            let old = h.0[j];
            let step = adjustments[j];
            h.0[j] = if i & 1 == 0 { old - step } else { old + step };

            let test = symbol_fitness(img, &h, ver);
            if test > best {
                best = test;
            } else {
                h.0[j] = old;
            }
        }
        adjustments = adjustments.map(|x| x * 0.5);
    }
    h
}

fn symbol_fitness(img: &BinaryImage, h: &Homography, ver: Version) -> i32 {
    let w = ver.width() as i32;
    let mut score = 0;

    // Timing patterns
    for i in 8..w - 8 {
        let sign = if i & 1 == 0 { 1 } else { -1 };
        score += cell_fitness(img, h, i, 6) * sign;
        score += cell_fitness(img, h, 6, i) * sign;
    }

    // Finders
    score += finder_fitness(img, h, 3, 3);
    score += finder_fitness(img, h, w - 4, 3);
    score += finder_fitness(img, h, 3, w - 4);

    // Alignment patterns clear of the finders
    let poses = ver.alignment_pattern();
    for &r in poses {
        for &c in poses {
            let (r, c) = (r as i32, c as i32);
            if (r == 6 && (c == 6 || c == w - 7)) || (r == w - 7 && c == 6) {
                continue;
            }
            score += cell_fitness(img, h, c, r) - ring_fitness(img, h, c, r, 1)
                + ring_fitness(img, h, c, r, 2);
        }
    }
    score
}

fn finder_fitness(img: &BinaryImage, h: &Homography, cx: i32, cy: i32) -> i32 {
    cell_fitness(img, h, cx, cy) + ring_fitness(img, h, cx, cy, 1) - ring_fitness(img, h, cx, cy, 2)
        + ring_fitness(img, h, cx, cy, 3)
}

fn ring_fitness(img: &BinaryImage, h: &Homography, cx: i32, cy: i32, r: i32) -> i32 {
    let mut score = 0;
    for i in 0..r * 2 {
        score += cell_fitness(img, h, cx - r + i, cy - r);
        score += cell_fitness(img, h, cx - r, cy + r - i);
        score += cell_fitness(img, h, cx + r, cy - r + i);
        score += cell_fitness(img, h, cx + r - i, cy + r);
    }
    score
}

// +1 for every dark sample within the module, -1 for every light one
fn cell_fitness(img: &BinaryImage, h: &Homography, x: i32, y: i32) -> i32 {
    const OFFSETS: [f64; 3] = [0.3, 0.5, 0.7];
    let mut score = 0;
    for dy in OFFSETS {
        for dx in OFFSETS {
            let Ok(pt) = h.map(x as f64 + dx, y as f64 + dy) else { continue };
            let (px, py) = pt.pixel();
            match img.get(px, py) {
                Some(true) => score += 1,
                Some(false) => score -= 1,
                None => {}
            }
        }
    }
    score
}

/// Samples every module of a `ver` sized symbol. Each module is the majority of
/// five samples around its centre; samples outside the image count as light.
fn sample_grid(img: &BinaryImage, h: &Homography, ver: Version) -> BarcodeResult<ModuleGrid> {
    let w = ver.width();
    let mut grid = ModuleGrid::new(w, w);
    for r in 0..w {
        for c in 0..w {
            let mut dark = 0;
            for (dx, dy) in SAMPLE_OFFSETS {
                let pt = h.map(c as f64 + dx, r as f64 + dy)?;
                let (px, py) = pt.pixel();
                if img.get(px, py) == Some(true) {
                    dark += 1;
                }
            }
            grid.set(r, c, dark * 2 > SAMPLE_OFFSETS.len());
        }
    }
    Ok(grid)
}


// Decode module grid
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedQr {
    pub payload: Vec<u8>,
    /// Charset announced by an ECI header.
    pub eci: Option<u32>,
    pub metadata: Metadata,
    /// Codewords repaired by error correction.
    pub corrected: usize,
}

/// Decodes a sampled or generated module grid without quiet zone.
pub fn decode_grid(grid: &ModuleGrid) -> BarcodeResult<DecodedQr> {
    if grid.width() != grid.height() {
        return Err(BarcodeError::InvalidVersion);
    }
    let ver = Version::from_width(grid.width())?;
    let (ecl, mask) = read_format_info(grid)?;
    if *ver >= 7 && read_version_info(grid)? != ver {
        return Err(BarcodeError::InvalidVersionInfo);
    }

    let codewords = extract_codewords(grid, ver, ecl, mask);
    let mut blocks = deinterleave(&codewords, ver, ecl);
    let mut corrected = 0;
    for blk in blocks.iter_mut() {
        corrected += blk.rectify()?;
    }

    let data = blocks.iter().flat_map(|b| b.data().iter().copied()).collect::<Vec<_>>();
    let Payload { bytes, eci } = decode(&data, ver)?;
    Ok(DecodedQr { payload: bytes, eci, metadata: Metadata::new(ver, ecl, mask), corrected })
}

fn read_format_info(grid: &ModuleGrid) -> BarcodeResult<(ECLevel, MaskPattern)> {
    for coords in [&FORMAT_INFO_COORDS_MAIN, &FORMAT_INFO_COORDS_SIDE] {
        let info = read_number(grid, coords);
        let Some(valid) = rectify_info(info, &FORMAT_INFOS, INFO_ERROR_CAPACITY) else { continue };
        let idx = FORMAT_INFOS.iter().position(|&f| f == valid).ok_or(BarcodeError::InvalidFormatInfo)?;
        let ecl = ECLevel::from_format_bits((idx >> 3) as u32);
        let mask = MaskPattern::new((idx & 7) as u8)?;
        return Ok((ecl, mask));
    }
    Err(BarcodeError::InvalidFormatInfo)
}

/// Version encoded in either copy of the version info.
pub fn read_version_info(grid: &ModuleGrid) -> BarcodeResult<Version> {
    if grid.width() < VERSION_INFO_MIN_WIDTH {
        return Err(BarcodeError::InvalidVersionInfo);
    }
    for coords in [&VERSION_INFO_COORDS_BL, &VERSION_INFO_COORDS_TR] {
        let info = read_number(grid, coords);
        let Some(valid) = rectify_info(info, &VERSION_INFOS, INFO_ERROR_CAPACITY) else { continue };
        let Some(idx) = VERSION_INFOS.iter().position(|&v| v == valid) else { continue };
        return Version::new(idx + 7);
    }
    Err(BarcodeError::InvalidVersionInfo)
}

// Reads bits MSB first along coords
fn read_number(grid: &ModuleGrid, coords: &[(i16, i16)]) -> u32 {
    coords.iter().fold(0, |acc, &(r, c)| (acc << 1) | grid.get_wrapped(r, c).is_dark() as u32)
}

// Unmasked codewords in placement order
fn extract_codewords(grid: &ModuleGrid, ver: Version, ecl: ECLevel, mask: MaskPattern) -> Vec<u8> {
    let skeleton = QR::skeleton(ver, ecl);
    let mask_fn = mask.mask_function();
    let total_bits = ver.total_codewords() << 3;

    let mut res = vec![0u8; ver.total_codewords()];
    let region = EncRegionIter::new(ver).filter(|&(r, c)| skeleton.get(r, c) == Module::Empty);
    // Remainder bits past the last codeword are dropped
    for (i, (r, c)) in region.take(total_bits).enumerate() {
        if grid.is_dark(r as usize, c as usize) ^ mask_fn(r as i32, c as i32) {
            res[i >> 3] |= 0x80 >> (i & 7);
        }
    }
    res
}

// Inverse of the builder's interleaving: data codewords round robin across
// blocks, group 2 blocks holding one more, then ecc codewords round robin
fn deinterleave(codewords: &[u8], ver: Version, ecl: ECLevel) -> Vec<Block> {
    let (b1_size, b1_count, b2_size, b2_count) = ver.data_codewords_per_block(ecl);
    let ec_len = ver.ecc_per_block(ecl);
    let sizes = std::iter::repeat(b1_size)
        .take(b1_count)
        .chain(std::iter::repeat(b2_size).take(b2_count))
        .collect::<Vec<_>>();

    let mut blocks = sizes.iter().map(|&s| Vec::with_capacity(s + ec_len)).collect::<Vec<Vec<u8>>>();
    let mut cws = codewords.iter().copied();
    for i in 0..b1_size.max(b2_size) {
        for (blk, &size) in blocks.iter_mut().zip(&sizes) {
            if i < size {
                blk.extend(cws.next());
            }
        }
    }
    for _ in 0..ec_len {
        for blk in blocks.iter_mut() {
            blk.extend(cws.next());
        }
    }

    blocks.into_iter().map(|cws| Block::received(cws, ec_len)).collect()
}


// Global constants
//------------------------------------------------------------------------------

static INFO_ERROR_CAPACITY: u32 = 3;

// Version 7 is the first to carry version info
static VERSION_INFO_MIN_WIDTH: usize = 45;

static ALIGNMENT_PATTERN: [f64; 3] = [1.0, 1.0, 1.0];

// In modules around the estimated alignment centre
static ALIGNMENT_SEARCH_RADIUS: f64 = 4.0;

static JIGGLE_PASSES: usize = 5;

// Relative to the module's top left corner
static SAMPLE_OFFSETS: [(f64, f64); 5] = [(0.5, 0.5), (0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];
