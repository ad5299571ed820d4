// src/services/document_service.rs

use std::sync::Arc;

use genpdf::{elements, style, Alignment, Element};
use image::DynamicImage;

use crate::{
    common::error::AppError,
    config::AppConfig,
    middleware::i18n::Locale,
    models::batch::ProductionBatch,
    services::qr_service::QrService,
};

/// Single-page batch report: title, field list, QR image, optional logo.
#[derive(Clone)]
pub struct DocumentService {
    qr_service: QrService,
    config: Arc<AppConfig>,
}

/// Label/value pairs in report order: ID, date, variant, site, warehouse, expiry, PIC.
pub fn report_fields(batch: &ProductionBatch, locale: &Locale) -> Vec<(&'static str, String)> {
    let labels: [&'static str; 7] = if locale.is_english() {
        ["Batch ID", "Production date", "Variant", "Production site", "Warehouse", "Expiry date", "PIC"]
    } else {
        ["Batch ID", "Tanggal Produksi", "Varian", "Tempat", "Gudang", "Kedaluwarsa", "PIC"]
    };
    let values = [
        &batch.batch_id,
        &batch.production_date,
        &batch.variant,
        &batch.production_site,
        &batch.warehouse_location,
        &batch.expiry_date,
        &batch.person_in_charge,
    ];
    labels.into_iter().zip(values.into_iter().cloned()).collect()
}

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

/// genpdf refuses images with an alpha channel, so everything goes through RGB.
fn rgb_image(image: DynamicImage) -> Result<elements::Image, AppError> {
    elements::Image::from_dynamic_image(DynamicImage::ImageRgb8(image.to_rgb8())).map_err(pdf_error)
}

impl DocumentService {
    pub fn new(qr_service: QrService, config: Arc<AppConfig>) -> Self {
        Self { qr_service, config }
    }

    pub async fn generate_batch_pdf(
        &self,
        batch: ProductionBatch,
        locale: Locale,
    ) -> Result<Vec<u8>, AppError> {
        // 1. QR artifact (rebuilt if the file went missing)
        let qr_png = self.qr_service.read_or_generate(&batch.batch_id).await?;

        // 2. Layout + render off the async runtime
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.render(&batch, &qr_png, &locale))
            .await
            .map_err(|e| anyhow::anyhow!("PDF render task failed: {}", e))?
    }

    fn render(&self, batch: &ProductionBatch, qr_png: &[u8], locale: &Locale) -> Result<Vec<u8>, AppError> {
        let font_family = genpdf::fonts::from_files(&self.config.fonts_dir, &self.config.font_family, None)
            .map_err(|_| {
                AppError::FontNotFound(format!(
                    "{}-*.ttf in {}",
                    self.config.font_family,
                    self.config.fonts_dir.display()
                ))
            })?;

        let title = format!("{} - Product Report", self.config.company_name);

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(format!("{} {}", title, batch.batch_id));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- HEADER ---
        if let Some(logo_path) = self.qr_service.logo_path() {
            match image::open(logo_path) {
                Ok(logo) => doc.push(
                    rgb_image(logo.thumbnail(300, 300))?
                        .with_alignment(Alignment::Left)
                        .with_scale(genpdf::Scale::new(0.4, 0.4)),
                ),
                Err(e) => tracing::warn!("Logo not added to PDF: {}", e),
            }
        }

        doc.push(elements::Paragraph::new(title).styled(style::Style::new().bold().with_font_size(20)));
        doc.push(elements::Break::new(1.5));

        // --- FIELDS ---
        let mut table = elements::TableLayout::new(vec![1, 2]);
        let style_bold = style::Style::new().bold();
        for (label, value) in report_fields(batch, locale) {
            table
                .row()
                .element(elements::Paragraph::new(label).styled(style_bold))
                .element(elements::Paragraph::new(value))
                .push()
                .map_err(pdf_error)?;
        }
        doc.push(table);
        doc.push(elements::Break::new(2));

        // --- QR CODE ---
        let qr = image::load_from_memory(qr_png).map_err(|e| AppError::InvalidImage(e.to_string()))?;
        doc.push(
            rgb_image(qr)?
                .with_alignment(Alignment::Center)
                .with_scale(genpdf::Scale::new(0.5, 0.5)),
        );

        let mut buffer = Vec::new();
        doc.render(&mut buffer).map_err(pdf_error)?;
        Ok(buffer)
    }
}
