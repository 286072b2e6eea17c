use std::ops::Index;

use super::geometry::Point;
use crate::common::error::{BarcodeError, BarcodeResult};

// Projective map from module space onto the image
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Clone)]
pub struct Homography(pub [f64; 8]);

impl Index<usize> for Homography {
    type Output = f64;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl Homography {
    /// Solves for the homography taking `src[i]` onto `dst[i]`.
    pub fn compute(src: [Point; 4], dst: [Point; 4]) -> BarcodeResult<Self> {
        // Two rows per correspondence, h33 fixed to 1
        let mut a = [[0.0_f64; 8]; 8];
        let mut b = [0.0_f64; 8];

        for i in 0..4 {
            let (x, y) = (src[i].x, src[i].y);
            let (xp, yp) = (dst[i].x, dst[i].y);

            a[2 * i] = [-x, -y, -1.0, 0.0, 0.0, 0.0, xp * x, xp * y];
            b[2 * i] = -xp;

            a[2 * i + 1] = [0.0, 0.0, 0.0, -x, -y, -1.0, yp * x, yp * y];
            b[2 * i + 1] = -yp;
        }

        Ok(Self(Self::solve_linear_system(a, b)?))
    }

    // Gaussian elimination with partial pivoting
    fn solve_linear_system(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> BarcodeResult<[f64; 8]> {
        for i in 0..8 {
            let max_row = (i..8)
                .max_by(|&r1, &r2| a[r1][i].abs().total_cmp(&a[r2][i].abs()))
                .unwrap_or(i);
            if max_row != i {
                a.swap(i, max_row);
                b.swap(i, max_row);
            }

            if a[i][i].abs() < f64::EPSILON {
                return Err(BarcodeError::SingularMatrix);
            }

            let pivot = a[i][i];
            for c in i..8 {
                a[i][c] /= pivot;
            }
            b[i] /= pivot;

            for r in (i + 1)..8 {
                let factor = a[r][i];
                for c in i..8 {
                    a[r][c] -= factor * a[i][c];
                }
                b[r] -= factor * b[i];
            }
        }

        // Back substitution
        let mut x = [0.0; 8];
        for r in (0..8).rev() {
            let sum = ((r + 1)..8).map(|c| a[r][c] * x[c]).sum::<f64>();
            x[r] = b[r] - sum;
        }
        Ok(x)
    }

    pub fn map(&self, x: f64, y: f64) -> BarcodeResult<Point> {
        let xp = self[0] * x + self[1] * y + self[2];
        let yp = self[3] * x + self[4] * y + self[5];
        let w = self[6] * x + self[7] * y + 1.0;

        if w.abs() <= f64::EPSILON {
            return Err(BarcodeError::PointAtInfinity);
        }

        Ok(Point::new(xp / w, yp / w))
    }
}
