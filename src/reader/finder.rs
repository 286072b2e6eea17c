use super::{
    binarize::BinaryImage,
    utils::{
        geometry::{Axis, Point},
        measure_runs,
    },
};

const FINDER_PATTERN: [f64; 5] = [1.0, 1.0, 3.0, 1.0, 1.0];

// Finder line
//------------------------------------------------------------------------------

// **   ******   **  <- Finder line
// ^    ^        ^
// left stone    right
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DatumLine {
    left: u32,
    stone: u32,
    stone_len: u32,
    right: u32,
    y: u32,
}

// Line scanner to detect finder line
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineScanner {
    buffer: [u32; 6], // Run length of each transition, last one is in progress
    prev: Option<bool>,
    flips: u32,
    pos: u32,
    y: u32,
}

impl LineScanner {
    fn new(y: u32) -> Self {
        Self { buffer: [0; 6], prev: None, flips: 0, pos: 0, y }
    }

    fn advance(&mut self, dark: bool) -> Option<DatumLine> {
        self.pos += 1;

        if self.prev == Some(dark) {
            self.buffer[5] += 1;
            return None;
        }

        self.buffer.rotate_left(1);
        self.buffer[5] = 1;
        self.prev = Some(dark);
        self.flips += 1;

        // The finished run has to be the dark outer ring
        if dark || !self.is_finder_line() {
            return None;
        }

        let end = self.pos - 1;
        Some(DatumLine {
            left: end - self.buffer[..5].iter().sum::<u32>(),
            stone: end - self.buffer[2..5].iter().sum::<u32>(),
            stone_len: self.buffer[2],
            right: end - self.buffer[4],
            y: self.y,
        })
    }

    // Validates whether last 5 run lengths are in the 1:1:3:1:1 ratio
    fn is_finder_line(&self) -> bool {
        if self.flips < 6 {
            return false;
        }

        let avg = (self.buffer[..5].iter().sum::<u32>() as f64) / 7.0;
        let tol = avg * 3.0 / 4.0;

        FINDER_PATTERN
            .iter()
            .zip(&self.buffer[..5])
            .all(|(r, &rl)| (rl as f64 - r * avg).abs() <= tol)
    }
}

#[cfg(test)]
mod line_scanner_tests {
    use super::LineScanner;

    #[test]
    fn test_detects_finder_line() {
        let row = "...##..######..##...";
        let mut scanner = LineScanner::new(0);
        let hits = row.chars().filter_map(|c| scanner.advance(c == '#')).collect::<Vec<_>>();
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].left, hits[0].stone, hits[0].stone_len, hits[0].right), (3, 7, 6, 15));
    }

    #[test]
    fn test_rejects_other_ratios() {
        let row = "...##..##..##...";
        let mut scanner = LineScanner::new(0);
        assert!(row.chars().all(|c| scanner.advance(c == '#').is_none()));
    }
}

// Locate finders
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Finder {
    pub centre: Point,
    // Estimated module size in pixels
    pub module: f64,
    // Number of scanlines that confirmed this finder
    pub hits: u32,
}

impl Finder {
    fn absorb(&mut self, other: &Finder) {
        let (n, m) = (self.hits as f64, other.hits as f64);
        self.centre = (self.centre * n + other.centre * m) * (1.0 / (n + m));
        self.module = (self.module * n + other.module * m) / (n + m);
        self.hits += other.hits;
    }

    fn is_near(&self, other: &Finder) -> bool {
        self.centre.dist(&other.centre) <= self.module * 2.0
            && (self.module - other.module).abs() <= self.module * 0.5
    }
}

/// Scans every row for 1:1:3:1:1 runs, cross checks each hit vertically and
/// horizontally, then merges hits on the same finder.
pub fn locate_finders(img: &BinaryImage) -> Vec<Finder> {
    let mut finders: Vec<Finder> = Vec::new();

    for y in 0..img.h {
        let mut scanner = LineScanner::new(y);
        let row = img.row(y);
        // Trailing light pixel closes a finder touching the right edge
        for &dark in row.iter().chain([false].iter()) {
            let Some(datum) = scanner.advance(dark) else { continue };
            let Some(cand) = verify_finder(img, &datum) else { continue };
            match finders.iter_mut().find(|f| f.is_near(&cand)) {
                Some(f) => f.absorb(&cand),
                None => finders.push(cand),
            }
        }
    }

    finders.retain(|f| f.hits >= MIN_HITS);
    finders.sort_unstable_by(|a, b| b.hits.cmp(&a.hits));
    log::debug!("Located {} finder candidates", finders.len());
    finders
}

// Cross checks the pattern along Y through the stone centre, then re-measures
// along X through the vertical centre to refine the horizontal estimate
fn verify_finder(img: &BinaryImage, datum: &DatumLine) -> Option<Finder> {
    let width = datum.right - datum.left;
    let max_run = width * 2;
    let cx = datum.stone + datum.stone_len / 2;

    let vert = measure_runs(img, (cx as i32, datum.y as i32), Axis::Y, 5, max_run)?;
    if !vert.matches(&FINDER_PATTERN) {
        return None;
    }

    let cy = vert.centre.floor() as i32;
    let horz = measure_runs(img, (cx as i32, cy), Axis::X, 5, max_run)?;
    if !horz.matches(&FINDER_PATTERN) {
        return None;
    }

    // Both axes should measure a similarly sized pattern
    let (th, tv) = (horz.total() as f64, vert.total() as f64);
    if th > tv * 1.6 || tv > th * 1.6 {
        return None;
    }

    let module = (th + tv) / 14.0;
    Some(Finder { centre: Point::new(horz.centre, vert.centre), module, hits: 1 })
}

#[cfg(test)]
mod finder_tests {
    use image::GrayImage;

    use super::locate_finders;
    use crate::{
        builder::QRBuilder,
        common::metadata::{ECLevel, Version},
        reader::binarize::BinaryImage,
        render::{render, RenderOptions},
    };

    pub(super) fn rendered(ver: usize, module: u32) -> GrayImage {
        let qr = QRBuilder::new(b"Hello, world!")
            .version(Version::new(ver).unwrap())
            .ec_level(ECLevel::L)
            .build()
            .unwrap();
        render(&qr.to_grid(), &RenderOptions::default().module_size(module))
    }

    #[test]
    fn test_locate_finders() {
        let img = BinaryImage::binarize(&rendered(4, 10));
        let finders = locate_finders(&img);
        assert!(finders.len() >= 3);

        // Quiet zone of 40 px, finder centres 3.5 modules in
        let expected = [(75.0, 75.0), (335.0, 75.0), (75.0, 335.0)];
        for (x, y) in expected {
            let f = finders.iter().find(|f| (f.centre.x - x).abs() < 2.0 && (f.centre.y - y).abs() < 2.0);
            assert!(f.is_some_and(|f| (f.module - 10.0).abs() < 1.0), "No finder at {x}, {y}: {finders:?}");
        }
    }

    #[test]
    fn test_no_finders_in_blank() {
        let img = BinaryImage::from_dark(40, 40, vec![false; 1600]);
        assert!(locate_finders(&img).is_empty());
    }
}

// Groups finders in 3, which form potential symbols
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderGroup {
    pub finders: [Point; 3], // [TL, TR, BL]
    pub module: f64,
    pub score: f64, // Lower is better
    /// Direction of TL to TR in radians, clockwise from the image x axis.
    pub angle: f64,
}

impl FinderGroup {
    /// Estimated modules per side from the finder spacing.
    pub fn estimated_width(&self) -> f64 {
        let [tl, tr, bl] = self.finders;
        (tl.dist(&tr) + tl.dist(&bl)) / 2.0 / self.module + 7.0
    }
}

// Below diagram shows the finders of a group
// ****************             ****************
// **            **             **            **
// **   ******   **             **   ******   **
// **   ***TL*   **             **   ***TR*   **
// **   ******   **             **   ******   **
// **            **             **            **
// ****************             ****************
//
// ****************
// **            **
// **   ******   **
// **   ***BL*   **
// **   ******   **
// **            **
// ****************
/// Picks triples of similar finders forming an isosceles right angle, best
/// scoring first, each finder used at most once.
pub fn group_finders(finders: &[Finder]) -> Vec<FinderGroup> {
    let finders = &finders[..finders.len().min(MAX_FINDERS)];
    let mut all_groups = Vec::new();

    for i in 0..finders.len() {
        for j in (i + 1)..finders.len() {
            for k in (j + 1)..finders.len() {
                let trio = [finders[i], finders[j], finders[k]];
                let best = (0..3)
                    .filter_map(|v| score_group(&trio, v))
                    .min_by(|a, b| a.score.total_cmp(&b.score));
                if let Some(g) = best {
                    all_groups.push((g, [i, j, k]));
                }
            }
        }
    }

    all_groups.sort_unstable_by(|a, b| a.0.score.total_cmp(&b.0.score));

    let mut used = vec![false; finders.len()];
    let mut res = Vec::new();
    for (g, idxs) in all_groups {
        if idxs.iter().all(|&i| !used[i]) {
            idxs.iter().for_each(|&i| used[i] = true);
            res.push(g);
        }
    }

    log::debug!("Grouped finders into {} symbol candidates", res.len());
    res
}

// Scores the trio with finder `v` at the right angle
fn score_group(trio: &[Finder; 3], v: usize) -> Option<FinderGroup> {
    let tl = trio[v];
    let (a, b) = (trio[(v + 1) % 3], trio[(v + 2) % 3]);

    let modules = trio.map(|f| f.module);
    let (min_mod, max_mod) = modules.iter().fold((f64::MAX, 0f64), |(lo, hi), &m| (lo.min(m), hi.max(m)));
    if max_mod > min_mod * 1.5 {
        return None;
    }

    let (d1, d2) = (tl.centre.dist(&a.centre), tl.centre.dist(&b.centre));
    let module = modules.iter().sum::<f64>() / 3.0;
    // Version 1 finders are 14 modules apart
    if d1.min(d2) < module * 10.0 {
        return None;
    }

    let ratio = d1 / d2;
    let cos = Point::cos_angle(&a.centre, &tl.centre, &b.centre);
    if !(0.7..=1.43).contains(&ratio) || cos.abs() > 0.35 {
        return None;
    }

    let (tr, bl) =
        if Point::cross(&tl.centre, &a.centre, &b.centre) > 0.0 { (a, b) } else { (b, a) };

    let score = (1.0 - ratio).abs() + cos.abs() + (max_mod - min_mod) / max_mod;
    let angle = (tr.centre.y - tl.centre.y).atan2(tr.centre.x - tl.centre.x);
    Some(FinderGroup { finders: [tl.centre, tr.centre, bl.centre], module, score, angle })
}


// Global constants
//------------------------------------------------------------------------------

// Minimum scanlines confirming a finder
static MIN_HITS: u32 = 2;

// Candidates considered for grouping, strongest first
static MAX_FINDERS: usize = 24;
