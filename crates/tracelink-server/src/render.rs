//! Scannable-image rendering of access URLs.
//!
//! The operator surface depends only on [`CodeRenderer`]; the QR
//! implementation is the production collaborator.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("cannot encode data: {0}")]
    Encode(String),

    #[error("cannot write image: {0}")]
    Image(String),
}

/// Turns a URL into PNG bytes.
pub trait CodeRenderer: Send + Sync {
    fn render_png(&self, data: &str) -> Result<Vec<u8>, RenderError>;
}

/// QR code renderer at the highest error-correction level.
#[derive(Clone, Debug)]
pub struct QrCodeRenderer {
    /// Edge length of one module, in pixels.
    pub module_px: u32,
}

impl Default for QrCodeRenderer {
    fn default() -> Self {
        Self { module_px: 10 }
    }
}

impl CodeRenderer for QrCodeRenderer {
    fn render_png(&self, data: &str) -> Result<Vec<u8>, RenderError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::H)
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        let image = code
            .render::<Luma<u8>>()
            .module_dimensions(self.module_px, self.module_px)
            .quiet_zone(true)
            .build();

        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| RenderError::Image(e.to_string()))?;
        Ok(buf.into_inner())
    }
}

/// Inline a PNG as a `data:` URI.
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}
