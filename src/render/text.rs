use anyhow::{Context, Result};
use fontdue::{Font, FontSettings};
use std::path::{Path, PathBuf};

/// Fonts tried when no font is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub struct TextOverlay {
    font: Font,
    font_size: f32,
}

impl TextOverlay {
    pub fn from_bytes(bytes: &[u8], font_size: f32) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| anyhow::anyhow!("Failed to parse font: {}", e))?;
        Ok(Self { font, font_size })
    }

    pub fn from_file(path: &Path, font_size: f32) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font file: {}", path.display()))?;
        Self::from_bytes(&bytes, font_size)
    }

    /// Load `configured` if given, otherwise the first system font found.
    /// Returns `None` when no font is usable; callers then draw ticks without text.
    pub fn discover(configured: Option<&Path>, font_size: f32) -> Option<Self> {
        if let Some(path) = configured {
            match Self::from_file(path, font_size) {
                Ok(overlay) => return Some(overlay),
                Err(err) => log::warn!("{:#}", err),
            }
        }
        let found = SYSTEM_FONT_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())?;
        match Self::from_file(&found, font_size) {
            Ok(overlay) => {
                log::debug!("Using font {}", found.display());
                Some(overlay)
            }
            Err(err) => {
                log::warn!("{:#}", err);
                None
            }
        }
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn line_height(&self) -> u32 {
        (self.font_size * 1.2).ceil() as u32
    }

    /// Composite text onto an RGBA pixel buffer with its top-left at (x, y).
    pub fn composite(
        &self,
        pixels: &mut [u8],
        width: u32,
        height: u32,
        text: &str,
        x: i32,
        y: i32,
        color: [u8; 4],
    ) {
        let mut cursor_x = x;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, self.font_size);
            let glyph_y = y + self.font_size as i32 - metrics.height as i32 - metrics.ymin;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let alpha = bitmap[gy * metrics.width + gx];
                    if alpha == 0 {
                        continue;
                    }

                    let px = cursor_x + gx as i32 + metrics.xmin;
                    let py = glyph_y + gy as i32;
                    if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                        continue;
                    }

                    let idx = (py as usize * width as usize + px as usize) * 4;
                    if idx + 3 >= pixels.len() {
                        continue;
                    }
                    let a = alpha as f32 / 255.0 * (color[3] as f32 / 255.0);
                    blend(&mut pixels[idx..idx + 4], color, a);
                }
            }

            cursor_x += metrics.advance_width.round() as i32;
        }
    }

    /// Width of rendered text in pixels.
    pub fn measure_width(&self, text: &str) -> u32 {
        let width: f32 = text
            .chars()
            .map(|ch| self.font.metrics(ch, self.font_size).advance_width)
            .sum();
        width.ceil() as u32
    }
}

/// Alpha-blend `color` over one RGBA pixel with coverage `a`.
#[inline]
pub fn blend(pixel: &mut [u8], color: [u8; 4], a: f32) {
    let inv_a = 1.0 - a;
    pixel[0] = (color[0] as f32 * a + pixel[0] as f32 * inv_a) as u8;
    pixel[1] = (color[1] as f32 * a + pixel[1] as f32 * inv_a) as u8;
    pixel[2] = (color[2] as f32 * a + pixel[2] as f32 * inv_a) as u8;
    pixel[3] = 255;
}

/// Blend a filled rectangle onto an RGBA buffer, clipped to its bounds.
pub fn fill_rect(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    color: [u8; 4],
) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + w).min(width as i32);
    let y1 = (y + h).min(height as i32);
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    let a = color[3] as f32 / 255.0;
    for py in y0..y1 {
        for px in x0..x1 {
            let idx = (py as usize * width as usize + px as usize) * 4;
            blend(&mut pixels[idx..idx + 4], color, a);
        }
    }
}
