use super::{binarize::BinaryImage, BoundingBox, DecodeResult, ReaderOptions, Rejection, Speed};
use crate::{
    code128::{
        tables::{match_pattern, stop_distance, START_A, START_C, STOP_MODULES, SYMBOL_MODULES},
        Code128,
    },
    common::error::BarcodeError,
    symbology::Symbology,
};

// Runs
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
struct Run {
    start: f32,
    len: f32,
    dark: bool,
}

impl Run {
    fn end(&self) -> f32 {
        self.start + self.len
    }
}

fn runs(line: &[bool]) -> Vec<Run> {
    let mut res: Vec<Run> = Vec::new();
    for (i, &dark) in line.iter().enumerate() {
        match res.last_mut() {
            Some(run) if run.dark == dark => run.len += 1.0,
            _ => res.push(Run { start: i as f32, len: 1.0, dark }),
        }
    }
    res
}

// Runs split where the luminance crosses the line's mid level, placed between
// pixel centres by linear interpolation. Blur and ink spread move both edges
// of a bar alike, so edge to edge distances survive where a per pixel
// threshold merges thin spaces
fn luma_runs(line: &[u8]) -> Vec<Run> {
    let Some(&first) = line.first() else { return Vec::new() };
    let (lo, hi) = line.iter().fold((u8::MAX, u8::MIN), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    if hi - lo < MIN_LINE_CONTRAST {
        return Vec::new();
    }

    let mid = (lo as f32 + hi as f32) / 2.0;
    let mut res = Vec::new();
    let mut start = 0.0;
    let mut dark = (first as f32) < mid;
    for (x, pair) in line.windows(2).enumerate() {
        let (a, b) = (pair[0] as f32, pair[1] as f32);
        if (b < mid) == dark {
            continue;
        }
        let edge = x as f32 + 0.5 + (mid - a) / (b - a);
        res.push(Run { start, len: edge - start, dark });
        start = edge;
        dark = !dark;
    }
    res.push(Run { start, len: line.len() as f32 - start, dark });
    res
}

fn widths<const N: usize>(runs: &[Run]) -> Option<[f32; N]> {
    let slice = runs.get(..N)?;
    let mut res = [0.0; N];
    for (w, r) in res.iter_mut().zip(slice) {
        *w = r.len;
    }
    Some(res)
}

// Scanlines
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Row(u32),
    Column(u32),
}

impl Line {
    fn pixels(self, img: &BinaryImage) -> Vec<bool> {
        match self {
            Self::Row(y) => img.row(y).to_vec(),
            Self::Column(x) => img.column(x),
        }
    }

    fn luma(self, img: &BinaryImage) -> Option<Vec<u8>> {
        let luma = img.luma()?;
        let line: Vec<u8> = match self {
            Self::Row(y) => (0..luma.width()).map(|x| luma.get_pixel(x, y)[0]).collect(),
            Self::Column(x) => (0..luma.height()).map(|y| luma.get_pixel(x, y)[0]).collect(),
        };
        Some(line)
    }

    // Box covering [from, to) along the line
    fn bounds(self, from: f32, to: f32) -> BoundingBox {
        match self {
            Self::Row(y) => BoundingBox::from_rect(from, y as f32, to, y as f32 + 1.0),
            Self::Column(x) => BoundingBox::from_rect(x as f32, from, x as f32 + 1.0, to),
        }
    }

    fn is_row(self) -> bool {
        matches!(self, Self::Row(_))
    }
}

fn scanlines(img: &BinaryImage, speed: Speed) -> Vec<Line> {
    let spread = |n: u32, len: u32| -> Vec<u32> {
        let n = n.min(len);
        (0..n).map(|i| (len as u64 * (i as u64 + 1) / (n as u64 + 1)) as u32).collect()
    };

    match speed {
        Speed::Faster => spread(FASTER_ROWS, img.h).into_iter().map(Line::Row).collect(),
        Speed::Balanced => {
            let rows = (img.h / BALANCED_ROW_STEP).max(BALANCED_ROWS);
            spread(rows, img.h).into_iter().map(Line::Row).collect()
        }
        Speed::Detailed => (0..img.h)
            .step_by(2)
            .map(Line::Row)
            .chain((0..img.w).step_by(2).map(Line::Column))
            .collect(),
        Speed::ExtremeDetail => (0..img.h).map(Line::Row).chain((0..img.w).map(Line::Column)).collect(),
    }
}


// Scan
//------------------------------------------------------------------------------

// Codewords read off one scanline, start through checksum
#[derive(Debug, Clone, PartialEq)]
struct Hit {
    values: Vec<u8>,
    mean_dist: f32,
}

// Outcome of one read from a start pattern, with its span along the line
#[derive(Debug, Clone, PartialEq)]
struct LineRead {
    hit: Result<Hit, BarcodeError>,
    from: f32,
    to: f32,
}

/// Reads Code 128 symbols along the scanlines chosen by `opts.speed`, in both
/// directions so upside down symbols read too. Each line is read twice, from
/// the thresholded pixels and from subpixel edges in its luminance. Hits with
/// the same payload on overlapping spans are merged into one result.
///
/// Reads that find a start pattern but fail later are reported as rejections
/// unless another line through the same symbol decoded it.
pub fn scan(img: &BinaryImage, opts: &ReaderOptions) -> Vec<Result<DecodeResult, Rejection>> {
    let mut results: Vec<(DecodeResult, bool)> = Vec::new();
    let mut rejections: Vec<Rejection> = Vec::new();

    for line in scanlines(img, opts.speed) {
        let mut sources = vec![runs(&line.pixels(img))];
        if let Some(luma) = line.luma(img) {
            sources.push(luma_runs(&luma));
        }

        for mut line_runs in sources {
            for reversed in [false, true] {
                if reversed {
                    line_runs.reverse();
                }
                for read in read_line(&line_runs) {
                    let bounds = line.bounds(read.from, read.to);
                    let symbol = read.hit.and_then(|hit| {
                        Code128::from_values(hit.values).map(|symbol| (symbol, hit.mean_dist))
                    });
                    match symbol {
                        Ok((symbol, dist)) => merge_result(&mut results, symbol, dist, bounds, line.is_row()),
                        Err(e) => merge_rejection(&mut rejections, bounds, e),
                    }
                }
            }
        }
    }

    rejections.retain(|rej| !results.iter().any(|(r, _)| r.bounds.overlaps(&rej.bounds)));

    log::debug!("Code 128 scan: {} symbols, {} rejected candidates", results.len(), rejections.len());
    results.into_iter().map(|(r, _)| Ok(r)).chain(rejections.into_iter().map(Err)).collect()
}

fn merge_result(
    results: &mut Vec<(DecodeResult, bool)>,
    symbol: Code128,
    mean_dist: f32,
    bounds: BoundingBox,
    is_row: bool,
) {
    let confidence = (1.0 - mean_dist / (2.0 * MAX_EDGE_DISTANCE)).clamp(0.0, 1.0);
    // Spans along the scan direction overlap
    let same_span = |r: &DecodeResult| {
        if is_row {
            r.bounds.left() <= bounds.right() && bounds.left() <= r.bounds.right()
        } else {
            r.bounds.top() <= bounds.bottom() && bounds.top() <= r.bounds.bottom()
        }
    };

    let existing = results
        .iter_mut()
        .find(|(r, row)| *row == is_row && r.payload == symbol.data() && same_span(r));
    match existing {
        Some((r, _)) => {
            r.bounds = r.bounds.union(&bounds);
            r.confidence = r.confidence.max(confidence);
        }
        None => {
            let payload = symbol.data().to_vec();
            // Code 128 data bytes are ISO 8859-1
            let text = payload.iter().map(|&b| b as char).collect();
            let res = DecodeResult {
                payload,
                text,
                symbology: Symbology::Code128,
                confidence,
                bounds,
                source_index: 0,
            };
            results.push((res, is_row));
        }
    }
}

fn merge_rejection(rejections: &mut Vec<Rejection>, bounds: BoundingBox, err: BarcodeError) {
    let rej = Rejection::failed(Symbology::Code128, bounds, err);
    match rejections.iter_mut().find(|r| r.reason == rej.reason && r.bounds.overlaps(&bounds)) {
        Some(r) => {
            r.bounds = r.bounds.union(&bounds);
        }
        None => rejections.push(rej),
    }
}

// Every start pattern preceded by a quiet zone begins a read, which ends at
// the stop pattern or at the first symbol that fails
fn read_line(runs: &[Run]) -> Vec<LineRead> {
    let mut reads = Vec::new();
    let mut i = 0;
    while i < runs.len() {
        if !runs[i].dark {
            i += 1;
            continue;
        }
        let Some(start) = widths::<6>(&runs[i..]) else { break };
        let (value, dist) = match_pattern(&start);
        let unit = start.iter().sum::<f32>() / SYMBOL_MODULES as f32;
        let quiet = i == 0 || runs[i - 1].len >= unit * MIN_QUIET_ZONE;
        if !(START_A..=START_C).contains(&value) || dist > MAX_START_DISTANCE || !quiet {
            i += 1;
            continue;
        }

        let (hit, consumed) = match read_symbols(&runs[i..], value, dist) {
            Ok((hit, consumed)) => (Ok(hit), consumed),
            Err((e, consumed)) => (Err(e), consumed),
        };
        let (first, last) = (&runs[i], &runs[i + consumed - 1]);
        let from = first.start.min(last.start);
        let to = first.end().max(last.end());
        log::trace!("Code 128 read over [{from:.1}, {to:.1}): {:?}", hit.as_ref().map(|h| h.values.len()));

        // A failed read may still hide a later start on the same line
        i += if hit.is_ok() { consumed } else { 1 };
        reads.push(LineRead { hit, from, to });
    }
    reads
}

// Reads codewords after the start symbol until the stop pattern. Returns the
// hit and the number of runs it spans, or the failure and the runs examined
fn read_symbols(runs: &[Run], start: u8, start_dist: f32) -> Result<(Hit, usize), (BarcodeError, usize)> {
    let mut values = vec![start];
    let mut total_dist = start_dist;
    let mut j = 6;

    loop {
        let rest = &runs[j..];
        let Some(sym) = widths::<6>(rest) else {
            // Line ends before any stop pattern
            return Err((BarcodeError::InvalidPayload, runs.len()));
        };
        let (value, dist) = match_pattern(&sym);

        if let Some(stop) = widths::<7>(rest) {
            let stop_dist = stop_distance(&stop);
            let unit = stop.iter().sum::<f32>() / STOP_MODULES as f32;
            let trailing_quiet = rest.get(7).map_or(true, |r| r.len >= unit * MIN_QUIET_ZONE);
            if stop_dist <= MAX_STOP_DISTANCE && (stop_dist < dist || trailing_quiet) {
                // Start, one data codeword and the checksum at least
                if values.len() < 3 {
                    return Err((BarcodeError::InvalidPayload, j + 7));
                }
                let mean_dist = (total_dist + stop_dist) / (values.len() + 1) as f32;
                return Ok((Hit { values, mean_dist }, j + 7));
            }
        }
        if dist > MAX_EDGE_DISTANCE {
            return Err((BarcodeError::UncorrectableError, j + 6));
        }
        if values.len() >= MAX_SYMBOLS {
            return Err((BarcodeError::InvalidPayload, j + 6));
        }

        values.push(value);
        total_dist += dist;
        j += 6;
    }
}


// Global constants
//------------------------------------------------------------------------------

static FASTER_ROWS: u32 = 8;

static BALANCED_ROWS: u32 = 24;

// Pixel rows per Balanced scanline once the image is taller than the minimum
static BALANCED_ROW_STEP: u32 = 4;

// Summed over a symbol's four edge measures, in modules. Distinct patterns
// differ by at least one module in some measure
static MAX_EDGE_DISTANCE: f32 = 1.5;

// Tighter than data symbols so that the reversed stop never starts a read
static MAX_START_DISTANCE: f32 = 1.0;

// Summed over the stop pattern's six edge measures
static MAX_STOP_DISTANCE: f32 = 2.0;

// Light run required before a start symbol, in modules. Wider than any space
// within a symbol
static MIN_QUIET_ZONE: f32 = 5.0;

// Luminance spread below which a line holds no bars
static MIN_LINE_CONTRAST: u8 = 48;

// Upper bound on codewords in one symbol
static MAX_SYMBOLS: usize = 128;
