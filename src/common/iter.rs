use super::metadata::Version;

// Zigzag traversal of the encoding region
//------------------------------------------------------------------------------

/// Module coordinates in codeword placement order. Two column strips run from
/// the right edge, upward then downward in turn, and the vertical timing
/// column is stepped over. Function modules are yielded too; callers skip
/// whatever is already occupied.
#[derive(Debug, Clone)]
pub struct EncRegionIter {
    w: usize,
    step: usize,
}

impl EncRegionIter {
    pub const fn new(version: Version) -> Self {
        Self { w: version.width(), step: 0 }
    }
}

impl Iterator for EncRegionIter {
    type Item = (i16, i16);
    fn next(&mut self) -> Option<Self::Item> {
        let w = self.w;
        if self.step >= w * (w - 1) {
            return None;
        }
        let (strip, offset) = (self.step / (2 * w), self.step % (2 * w));
        self.step += 1;

        let mut right = w - 1 - 2 * strip;
        if right <= VERT_TIMING_COL {
            right -= 1;
        }
        let c = right - offset % 2;
        let r = match strip % 2 {
            0 => w - 1 - offset / 2,
            _ => offset / 2,
        };
        Some((r as i16, c as i16))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.w * (self.w - 1)).saturating_sub(self.step);
        (left, Some(left))
    }
}


// Global constants
//------------------------------------------------------------------------------

static VERT_TIMING_COL: usize = 6;
