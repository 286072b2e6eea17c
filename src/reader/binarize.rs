use image::{imageops, GrayImage};
use imageproc::{
    contrast::otsu_level,
    integral_image::{integral_image, integral_squared_image},
};

// Dark coverage band outside of which the adaptive result is distrusted
const MIN_DARK_RATIO: f64 = 0.02;
const MAX_DARK_RATIO: f64 = 0.80;

// Pixels darker than the local mean by this percentage are dark
const ADAPTIVE_BIAS: u64 = 5;

// Windows with a standard deviation under 12 grey levels are flat
const MIN_VARIANCE: f64 = 144.0;

// Binary image
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage {
    pub w: u32,
    pub h: u32,
    dark: Vec<bool>,
    // Source luminance, kept for readers that locate edges below pixel precision
    luma: Option<GrayImage>,
}

impl BinaryImage {
    /// Adaptive threshold, falling back to a global Otsu threshold when the
    /// dark coverage is implausible.
    pub fn binarize(img: &GrayImage) -> Self {
        let adaptive = Self::adaptive(img);
        let ratio = adaptive.dark_ratio();
        if (MIN_DARK_RATIO..=MAX_DARK_RATIO).contains(&ratio) {
            return adaptive;
        }

        let level = otsu_level(img);
        log::debug!("Dark coverage {:.1}% out of band, using Otsu level {level}", ratio * 100.0);
        Self::global(img, level)
    }

    // Compares each pixel with the mean of a window around it. Flat windows
    // carry no local contrast and defer to the global Otsu level instead
    pub fn adaptive(img: &GrayImage) -> Self {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Self { w, h, dark: Vec::new(), luma: None };
        }

        let integral = integral_image::<_, u64>(img);
        let integral_sq = integral_squared_image::<_, u64>(img);
        let window_sum = |x0: u32, y0: u32, x1: u32, y1: u32| {
            let sum = |x, y| integral.get_pixel(x, y)[0];
            let sum_sq = |x, y| integral_sq.get_pixel(x, y)[0];
            (
                sum(x1, y1) + sum(x0, y0) - sum(x0, y1) - sum(x1, y0),
                sum_sq(x1, y1) + sum_sq(x0, y0) - sum_sq(x0, y1) - sum_sq(x1, y0),
            )
        };
        let level = otsu_level(img);
        let radius = (w.max(h) / 16).max(4);

        let mut dark = Vec::with_capacity((w * h) as usize);
        for y in 0..h {
            let (y0, y1) = (y.saturating_sub(radius), (y + radius + 1).min(h));
            for x in 0..w {
                let (x0, x1) = (x.saturating_sub(radius), (x + radius + 1).min(w));
                let count = ((x1 - x0) * (y1 - y0)) as u64;
                let (total, total_sq) = window_sum(x0, y0, x1, y1);
                let mean = total as f64 / count as f64;
                let variance = total_sq as f64 / count as f64 - mean * mean;

                let px = img.get_pixel(x, y)[0];
                dark.push(match variance < MIN_VARIANCE {
                    true => px <= level,
                    false => px as u64 * count * 100 <= total * (100 - ADAPTIVE_BIAS),
                });
            }
        }

        Self { w, h, dark, luma: Some(img.clone()) }
    }

    pub fn global(img: &GrayImage, level: u8) -> Self {
        let (w, h) = img.dimensions();
        let dark = img.pixels().map(|p| p[0] <= level).collect();
        Self { w, h, dark, luma: Some(img.clone()) }
    }

    pub fn from_dark(w: u32, h: u32, dark: Vec<bool>) -> Self {
        debug_assert_eq!(dark.len(), (w * h) as usize, "Pixel count doesn't match dimensions");
        Self { w, h, dark, luma: None }
    }

    /// Swaps dark and light, in the source luminance too.
    pub fn invert(&self) -> Self {
        let luma = self.luma.as_ref().map(|img| {
            let mut inv = img.clone();
            imageops::invert(&mut inv);
            inv
        });
        Self { w: self.w, h: self.h, dark: self.dark.iter().map(|d| !d).collect(), luma }
    }

    pub fn luma(&self) -> Option<&GrayImage> {
        self.luma.as_ref()
    }

    #[inline]
    pub fn is_dark(&self, x: u32, y: u32) -> bool {
        self.dark[(y * self.w + x) as usize]
    }

    /// Colour at a signed position, None outside the image.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<bool> {
        if x < 0 || y < 0 || x as u32 >= self.w || y as u32 >= self.h {
            return None;
        }
        Some(self.is_dark(x as u32, y as u32))
    }

    pub fn row(&self, y: u32) -> &[bool] {
        let start = (y * self.w) as usize;
        &self.dark[start..start + self.w as usize]
    }

    pub fn column(&self, x: u32) -> Vec<bool> {
        (0..self.h).map(|y| self.is_dark(x, y)).collect()
    }

    pub fn dark_ratio(&self) -> f64 {
        if self.dark.is_empty() {
            return 0.0;
        }
        self.dark.iter().filter(|&&d| d).count() as f64 / self.dark.len() as f64
    }
}
