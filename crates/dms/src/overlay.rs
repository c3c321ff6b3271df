//! Frame overlays: eye contours, EAR readout and the drowsiness banner

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::info;

use crate::ear::{EarMeasurement, EyeContour};
use crate::DmsError;

/// Colors and size of one text label
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub foreground: [u8; 3],
    pub background: [u8; 3],
    /// Glyph height in pixels
    pub height_px: f32,
}

/// Layout and colors of everything the renderer draws (RGB order)
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub contour_color: [u8; 3],
    pub ratio_text: TextStyle,
    pub alert_text: TextStyle,
    /// Space between text and the edge of its background box
    pub padding: u32,
    /// Baseline-left of the EAR readout
    pub ratio_origin: (i32, i32),
    /// Baseline-left of the alert banner
    pub alert_origin: (i32, i32),
    pub alert_message: String,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            contour_color: [0, 255, 0],
            ratio_text: TextStyle {
                foreground: [255, 255, 255],
                background: [0, 0, 0],
                height_px: 16.0,
            },
            alert_text: TextStyle {
                foreground: [255, 255, 255],
                background: [255, 0, 0],
                height_px: 24.0,
            },
            padding: 10,
            ratio_origin: (10, 100),
            alert_origin: (10, 50),
            alert_message: "Somnolence ALERT!".to_string(),
        }
    }
}

/// Glyph source for overlay text
pub enum Glyphs {
    /// Built-in 8x8 bitmap font, scaled by whole pixels
    Bitmap,
    /// TrueType/OpenType font file
    TrueType(FontVec),
}

impl Glyphs {
    /// Load a font file
    pub fn load(path: &Path) -> Result<Self, DmsError> {
        let bytes = std::fs::read(path)
            .map_err(|e| DmsError::Config(format!("font {}: {}", path.display(), e)))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| DmsError::Config(format!("font {}: {}", path.display(), e)))?;
        info!("Loaded overlay font from {}", path.display());
        Ok(Self::TrueType(font))
    }

    /// (width, height) of `text` rendered at `height_px`
    pub fn text_size(&self, height_px: f32, text: &str) -> (u32, u32) {
        match self {
            Glyphs::Bitmap => {
                let cell = bitmap_cell(height_px);
                (text.chars().count() as u32 * 8 * cell, 8 * cell)
            }
            Glyphs::TrueType(font) => text_size(PxScale::from(height_px), font, text),
        }
    }

    /// Draw `text` with its top-left corner at (x, y)
    pub fn draw(&self, image: &mut RgbImage, color: [u8; 3], x: i32, y: i32, height_px: f32, text: &str) {
        match self {
            Glyphs::Bitmap => draw_bitmap_text(image, color, x, y, height_px, text),
            Glyphs::TrueType(font) => {
                draw_text_mut(image, Rgb(color), x, y, PxScale::from(height_px), font, text)
            }
        }
    }
}

impl std::fmt::Debug for Glyphs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Glyphs::Bitmap => f.write_str("Glyphs::Bitmap"),
            Glyphs::TrueType(_) => f.write_str("Glyphs::TrueType"),
        }
    }
}

fn bitmap_cell(height_px: f32) -> u32 {
    ((height_px / 8.0).round() as u32).max(1)
}

fn draw_bitmap_text(image: &mut RgbImage, color: [u8; 3], x: i32, y: i32, height_px: f32, text: &str) {
    let cell = bitmap_cell(height_px);
    let step = (8 * cell) as i32;

    for (i, ch) in text.chars().enumerate() {
        // Unknown characters render as blanks
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let left = x + i as i32 * step;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..8i32 {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let px = left + col * cell as i32;
                let py = y + row as i32 * cell as i32;
                draw_filled_rect_mut(image, Rect::at(px, py).of_size(cell, cell), Rgb(color));
            }
        }
    }
}

/// Draws overlays onto frames in place. Never changes frame dimensions.
#[derive(Debug)]
pub struct FrameRenderer {
    style: OverlayStyle,
    glyphs: Glyphs,
}

impl Default for FrameRenderer {
    fn default() -> Self {
        Self::new(OverlayStyle::default(), Glyphs::Bitmap)
    }
}

impl FrameRenderer {
    pub fn new(style: OverlayStyle, glyphs: Glyphs) -> Self {
        Self { style, glyphs }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Draw contours and the EAR readout when eyes were measured, plus the
    /// banner if `alert` is also set. Without eyes the image is untouched.
    pub fn annotate(&self, image: &mut RgbImage, eyes: Option<&EarMeasurement>, alert: bool) {
        if let Some(measurement) = eyes {
            self.draw_contour(image, &measurement.left);
            self.draw_contour(image, &measurement.right);
        }

        if alert && eyes.is_some() {
            self.put_text_with_background(
                image,
                &self.style.alert_message,
                self.style.alert_origin,
                &self.style.alert_text,
            );
        }

        if let Some(measurement) = eyes {
            let text = format!("EAR (Eye Aspect Ratio): {:.2}", measurement.average);
            self.put_text_with_background(image, &text, self.style.ratio_origin, &self.style.ratio_text);
        }
    }

    /// Closed outline through the six contour points
    pub fn draw_contour(&self, image: &mut RgbImage, contour: &EyeContour) {
        let points = contour.points();
        let color = Rgb(self.style.contour_color);
        for (i, start) in points.iter().enumerate() {
            let end = points[(i + 1) % points.len()];
            draw_line_segment_mut(
                image,
                (start.x as f32, start.y as f32),
                (end.x as f32, end.y as f32),
                color,
            );
        }
    }

    /// Text on an opaque box. The text baseline sits at `origin`; the box
    /// extends `padding` beyond the text on every side.
    pub fn put_text_with_background(
        &self,
        image: &mut RgbImage,
        text: &str,
        origin: (i32, i32),
        style: &TextStyle,
    ) {
        let (text_width, text_height) = self.glyphs.text_size(style.height_px, text);
        let padding = self.style.padding;
        let (x, y) = origin;

        let background = Rect::at(x - padding as i32, y - text_height as i32 - padding as i32)
            .of_size((text_width + 2 * padding).max(1), (text_height + 2 * padding).max(1));
        draw_filled_rect_mut(image, background, Rgb(style.background));

        self.glyphs.draw(
            image,
            style.foreground,
            x,
            y - text_height as i32,
            style.height_px,
            text,
        );
    }
}
