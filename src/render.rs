use image::{
    imageops::{self, FilterType},
    GrayImage, ImageBuffer, Luma, Pixel, Rgb, RgbImage,
};
use serde::{Deserialize, Serialize};

use crate::common::{
    error::{BarcodeError, BarcodeResult},
    grid::ModuleGrid,
};

// Quiet zones in modules
pub const QR_QUIET_ZONE: u32 = 4;
pub const LINEAR_QUIET_ZONE: u32 = 10;

// Minimum luminance difference between foreground and background
const MIN_CONTRAST: f64 = 0.5;

// Render options
//------------------------------------------------------------------------------

/// Presentation of a module grid. None of these alter the logical grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Pixels per module.
    pub module_size: u32,
    /// Quiet zone in modules. Defaults to 4 for matrix and 10 for linear symbols.
    pub margin: Option<u32>,
    pub foreground: [u8; 3],
    pub background: [u8; 3],
    /// Final image width in pixels. Height scales proportionally.
    pub target_width: Option<u32>,
    /// Bar height in modules for linear symbols.
    pub bar_height: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            module_size: 4,
            margin: None,
            foreground: [0, 0, 0],
            background: [255, 255, 255],
            target_width: None,
            bar_height: 40,
        }
    }
}

impl RenderOptions {
    pub fn module_size(mut self, module_size: u32) -> Self {
        self.module_size = module_size;
        self
    }

    pub fn margin(mut self, margin: u32) -> Self {
        self.margin = Some(margin);
        self
    }

    pub fn colors(mut self, foreground: [u8; 3], background: [u8; 3]) -> Self {
        self.foreground = foreground;
        self.background = background;
        self
    }

    pub fn target_width(mut self, target_width: u32) -> Self {
        self.target_width = Some(target_width);
        self
    }

    pub fn bar_height(mut self, bar_height: u32) -> Self {
        self.bar_height = bar_height;
        self
    }

    /// Rejects options that produce unreadable output: zero sized modules or
    /// colours less than 50% apart in luminance.
    pub fn verify(&self) -> BarcodeResult<()> {
        let contrast = (luminance(self.foreground) - luminance(self.background)).abs();
        if self.module_size == 0 || self.bar_height == 0 || contrast < MIN_CONTRAST {
            log::warn!("Render options rejected: Module size {}, Contrast {contrast:.2}", self.module_size);
            return Err(BarcodeError::UnsupportedOperation);
        }
        Ok(())
    }

    fn quiet_zone(&self, grid: &ModuleGrid) -> u32 {
        self.margin.unwrap_or(if is_linear(grid) { LINEAR_QUIET_ZONE } else { QR_QUIET_ZONE })
    }
}

// Relative luminance in [0, 1]
pub fn luminance(rgb: [u8; 3]) -> f64 {
    let [r, g, b] = rgb.map(|c| c as f64 / 255.0);
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

fn is_linear(grid: &ModuleGrid) -> bool {
    grid.height() == 1
}

// Render
//------------------------------------------------------------------------------

/// Pure black on white rendering, ignoring the colour options.
pub fn render(grid: &ModuleGrid, opts: &RenderOptions) -> GrayImage {
    paint(grid, opts, Luma([0]), Luma([255]))
}

pub fn render_color(grid: &ModuleGrid, opts: &RenderOptions) -> RgbImage {
    paint(grid, opts, Rgb(opts.foreground), Rgb(opts.background))
}

fn paint<P: Pixel + 'static>(
    grid: &ModuleGrid,
    opts: &RenderOptions,
    dark: P,
    light: P,
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let mod_sz = opts.module_size.max(1);
    let qz_sz = opts.quiet_zone(grid) * mod_sz;
    // Linear grids stretch their single row into bars
    let rows = if is_linear(grid) { opts.bar_height.max(1) } else { grid.height() as u32 };
    let (sym_w, sym_h) = (grid.width() as u32 * mod_sz, rows * mod_sz);
    let (w, h) = (sym_w + 2 * qz_sz, sym_h + 2 * qz_sz);

    let canvas = ImageBuffer::from_fn(w, h, |x, y| {
        if x < qz_sz || x >= qz_sz + sym_w || y < qz_sz || y >= qz_sz + sym_h {
            return light;
        }
        let c = ((x - qz_sz) / mod_sz) as usize;
        let r = if is_linear(grid) { 0 } else { ((y - qz_sz) / mod_sz) as usize };
        if grid.is_dark(r, c) {
            dark
        } else {
            light
        }
    });

    match opts.target_width {
        Some(tw) if tw > 0 && tw != w => {
            let th = ((h as u64 * tw as u64) / w as u64).max(1) as u32;
            log::debug!("Resizing rendered symbol from {w}x{h} to {tw}x{th}");
            imageops::resize(&canvas, tw, th, FilterType::Nearest)
        }
        _ => canvas,
    }
}
