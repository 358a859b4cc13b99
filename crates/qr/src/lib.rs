//! QR images for ticket payloads.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, Rgb, RgbImage};
use qrcode::render::unicode::Dense1x2;
use qrcode::types::QrError;
use qrcode::{Color, QrCode};
use thiserror::Error;

/// Pixels per module when the requested width is too small to fit the code.
const FALLBACK_SCALE: f64 = 4.0;

/// Widest quiet zone accepted, in modules.
pub const MAX_MARGIN_MODULES: u32 = 64;

/// Widest image accepted, in pixels.
pub const MAX_PIXEL_WIDTH: u32 = 4096;

pub const BLACK: Rgb<u8> = Rgb([0x00, 0x00, 0x00]);
pub const WHITE: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("payload does not fit in a QR code: {0}")]
    Encode(#[from] QrError),

    #[error("could not encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid color {0:?}, expected #rrggbb")]
    Color(String),

    #[error("margin of {0} modules exceeds the limit of {MAX_MARGIN_MODULES}")]
    MarginTooLarge(u32),

    #[error("width of {0} px exceeds the limit of {MAX_PIXEL_WIDTH}")]
    WidthTooLarge(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub pixel_width: u32,
    /// Quiet zone around the code, in modules.
    pub margin_modules: u32,
    pub foreground: Rgb<u8>,
    pub background: Rgb<u8>,
}

impl RenderOptions {
    /// Full-screen QR view.
    pub const fn page() -> Self {
        Self {
            pixel_width: 300,
            margin_modules: 3,
            foreground: BLACK,
            background: WHITE,
        }
    }

    /// Smaller code for the pop-up variant.
    pub const fn compact() -> Self {
        Self {
            pixel_width: 200,
            margin_modules: 2,
            foreground: BLACK,
            background: WHITE,
        }
    }
}

impl RenderOptions {
    /// Reject sizes that would overflow or allocate an unreasonable canvas.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.margin_modules > MAX_MARGIN_MODULES {
            return Err(RenderError::MarginTooLarge(self.margin_modules));
        }
        if self.pixel_width > MAX_PIXEL_WIDTH {
            return Err(RenderError::WidthTooLarge(self.pixel_width));
        }
        Ok(())
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::page()
    }
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_color(s: &str) -> Result<Rgb<u8>, RenderError> {
    let bytes = hex::decode(s.trim().trim_start_matches('#')).map_err(|_| RenderError::Color(s.to_string()))?;
    match bytes.as_slice() {
        [r, g, b] => Ok(Rgb([*r, *g, *b])),
        _ => Err(RenderError::Color(s.to_string())),
    }
}

/// Turns an opaque payload string into a scannable image.
pub trait QrRenderer: Send + Sync {
    fn render(&self, payload: &str, options: &RenderOptions) -> Result<QrImage, RenderError>;
}

/// An encoded PNG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrImage {
    png: Vec<u8>,
    width: u32,
}

impl QrImage {
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// `data:image/png;base64,...` form, suitable for an `<img src>`.
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PngRenderer;

impl QrRenderer for PngRenderer {
    fn render(&self, payload: &str, options: &RenderOptions) -> Result<QrImage, RenderError> {
        options.validate()?;
        let code = QrCode::new(payload.as_bytes())?;
        let modules = code.width();
        let colors = code.to_colors();

        let span = modules as u32 + 2 * options.margin_modules;
        let (scale, size) = if options.pixel_width >= span {
            (f64::from(options.pixel_width) / f64::from(span), options.pixel_width)
        } else {
            (FALLBACK_SCALE, (f64::from(span) * FALLBACK_SCALE) as u32)
        };
        let margin = (f64::from(options.margin_modules) * scale) as u32;

        let canvas = RgbImage::from_fn(size, size, |x, y| {
            if x < margin || y < margin || x >= size - margin || y >= size - margin {
                return options.background;
            }
            let col = (f64::from(x - margin) / scale) as usize;
            let row = (f64::from(y - margin) / scale) as usize;
            if col >= modules || row >= modules {
                return options.background;
            }
            match colors.get(row * modules + col) {
                Some(Color::Dark) => options.foreground,
                _ => options.background,
            }
        });

        let mut png = Vec::new();
        canvas.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        Ok(QrImage { png, width: size })
    }
}

/// Block-character rendering for terminals, two modules per character row.
pub fn render_terminal(payload: &str) -> Result<String, RenderError> {
    let code = QrCode::new(payload.as_bytes())?;
    Ok(code
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .build())
}
