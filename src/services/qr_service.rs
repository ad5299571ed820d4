// src/services/qr_service.rs

use std::path::{Path, PathBuf};

use base64::Engine;
use image::{imageops::FilterType, DynamicImage, ImageOutputFormat, Luma};
use qrcode::{EcLevel, QrCode};

use crate::common::error::AppError;

pub const BATCH_ID_PARAM: &str = "batch_id";
const MODULE_PX: u32 = 10;
const LOGO_WIDTH: u32 = 80;

/// Builds, stores and reads the per-batch QR artifact (`<qr_dir>/<batch_id>.png`).
#[derive(Clone)]
pub struct QrService {
    base_url: String,
    qr_dir: PathBuf,
    logo_path: Option<PathBuf>,
}

impl QrService {
    pub fn new(base_url: String, qr_dir: PathBuf, logo_path: Option<PathBuf>) -> Self {
        Self { base_url, qr_dir, logo_path }
    }

    /// `<base>?batch_id=<id>`; appended with `&` when the base already has a query.
    pub fn payload_for(&self, batch_id: &str) -> String {
        let sep = if self.base_url.contains('?') { '&' } else { '?' };
        format!("{}{}{}={}", self.base_url, sep, BATCH_ID_PARAM, batch_id)
    }

    pub fn artifact_path(&self, batch_id: &str) -> PathBuf {
        self.qr_dir.join(format!("{}.png", batch_id))
    }

    pub fn logo_path(&self) -> Option<&Path> {
        self.logo_path.as_deref().filter(|p| p.exists())
    }

    /// Renders the PNG for a batch. Deterministic for a given id and logo.
    pub fn render_png(&self, batch_id: &str) -> Result<Vec<u8>, AppError> {
        let payload = self.payload_for(batch_id);
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::H)
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

        let modules = code
            .render::<Luma<u8>>()
            .module_dimensions(MODULE_PX, MODULE_PX)
            .build();
        let mut canvas = DynamicImage::ImageLuma8(modules).to_rgba8();

        if let Some(logo) = self.load_logo() {
            let x = canvas.width().saturating_sub(logo.width()) / 2;
            let y = canvas.height().saturating_sub(logo.height()) / 2;
            image::imageops::overlay(&mut canvas, &logo, x, y);
        }

        // Stored as plain RGB: the PDF renderer refuses alpha channels
        let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut png, ImageOutputFormat::Png)
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;
        Ok(png)
    }

    fn load_logo(&self) -> Option<image::RgbaImage> {
        let path = self.logo_path()?;
        match image::open(path) {
            Ok(logo) => Some(logo.resize(LOGO_WIDTH, u32::MAX, FilterType::Triangle).to_rgba8()),
            Err(e) => {
                tracing::warn!("Logo {} could not be loaded, skipping overlay: {}", path.display(), e);
                None
            }
        }
    }

    /// Renders off the async runtime and writes the artifact file.
    pub async fn generate(&self, batch_id: &str) -> Result<Vec<u8>, AppError> {
        let service = self.clone();
        let id = batch_id.to_string();
        let png = tokio::task::spawn_blocking(move || service.render_png(&id))
            .await
            .map_err(|e| anyhow::anyhow!("QR render task failed: {}", e))??;

        tokio::fs::create_dir_all(&self.qr_dir).await?;
        tokio::fs::write(self.artifact_path(batch_id), &png).await?;
        tracing::debug!("QR artifact written for batch {}", batch_id);
        Ok(png)
    }

    /// The stored PNG, regenerated when the file has gone missing.
    pub async fn read_or_generate(&self, batch_id: &str) -> Result<Vec<u8>, AppError> {
        match tokio::fs::read(self.artifact_path(batch_id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.generate(batch_id).await,
            Err(e) => Err(e.into()),
        }
    }

    /// `data:` URL of the stored artifact; `None` when the file is absent.
    pub async fn thumbnail_data_url(&self, batch_id: &str) -> Option<String> {
        let bytes = tokio::fs::read(self.artifact_path(batch_id)).await.ok()?;
        Some(format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        ))
    }

    /// Removal errors (including "already gone") are deliberately ignored.
    pub async fn remove(&self, batch_id: &str) {
        if let Err(e) = tokio::fs::remove_file(self.artifact_path(batch_id)).await {
            tracing::debug!("QR artifact for {} not removed: {}", batch_id, e);
        }
    }
}

/// Finds and decodes the first QR grid in an image. `Ok(None)` when none is readable.
pub fn decode(image_bytes: &[u8]) -> Result<Option<String>, AppError> {
    let luma = image::load_from_memory(image_bytes)
        .map_err(|e| AppError::InvalidImage(e.to_string()))?
        .to_luma8();
    let (width, height) = luma.dimensions();

    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        width as usize,
        height as usize,
        |x, y| luma.get_pixel(x as u32, y as u32)[0],
    );

    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((_meta, content)) => return Ok(Some(content)),
            Err(e) => tracing::debug!("QR grid found but not decodable: {:?}", e),
        }
    }
    Ok(None)
}

/// Pulls the `batch_id` query parameter out of a scanned payload.
/// Also matches payloads that carry extra parameters (`?menu=...&batch_id=...`).
pub fn extract_batch_id(payload: &str) -> Option<String> {
    let url = reqwest::Url::parse(payload.trim()).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == BATCH_ID_PARAM)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
