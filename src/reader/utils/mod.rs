pub mod geometry;
pub mod homography;

use geometry::Axis;

use super::binarize::BinaryImage;

// Pattern measurement along a line. Used by the finder locator to cross check
// the 1:1:3:1:1 pattern and by the alignment search for the 1:1:1 pattern
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Runs {
    pub lens: Vec<u32>,
    // Centre of the middle run along the axis
    pub centre: f64,
}

impl Runs {
    pub fn total(&self) -> u32 {
        self.lens.iter().sum()
    }

    /// Whether the runs follow `pattern` within 3/4 of a module per run.
    pub fn matches(&self, pattern: &[f64]) -> bool {
        if self.lens.len() != pattern.len() || self.lens.contains(&0) {
            return false;
        }
        let unit = self.total() as f64 / pattern.iter().sum::<f64>();
        let tol = unit * 3.0 / 4.0;
        self.lens.iter().zip(pattern).all(|(&rl, &p)| (rl as f64 - p * unit).abs() <= tol)
    }
}

/// Counts `count` alternating runs centred on the run holding `seed`. Outer runs
/// stop at the next colour change or the image border. Fails when any run grows
/// past `max_run`.
pub fn measure_runs(
    img: &BinaryImage,
    seed: (i32, i32),
    axis: Axis,
    count: usize,
    max_run: u32,
) -> Option<Runs> {
    let mut lens = vec![0; count];
    lens[count / 2] = 1;

    let start = walk(img, seed, axis, -1, &mut lens, max_run)?;
    let end = walk(img, seed, axis, 1, &mut lens, max_run)?;

    let centre = (start as f64 + end as f64 + 1.0) / 2.0;
    Some(Runs { lens, centre })
}

// Extends the runs from the seed in one direction and returns the last
// coordinate of the middle run
fn walk(
    img: &BinaryImage,
    seed: (i32, i32),
    axis: Axis,
    dir: i32,
    lens: &mut [u32],
    max_run: u32,
) -> Option<i32> {
    let mid = lens.len() / 2;
    let last = if dir < 0 { 0 } else { lens.len() - 1 };
    let mut clr = img.get(seed.0, seed.1)?;
    let (mut pos, mut idx, mut end) = (seed, mid, axis.coord(seed));
    loop {
        pos = axis.step(pos, dir);
        let Some(px) = img.get(pos.0, pos.1) else { break };
        if px != clr {
            if idx == last {
                break;
            }
            idx = if dir < 0 { idx - 1 } else { idx + 1 };
            clr = px;
        }
        if idx == mid {
            end = axis.coord(pos);
        }
        lens[idx] += 1;
        if lens[idx] > max_run {
            return None;
        }
    }
    Some(end)
}
