// src/models/batch.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::services::expiry::ExpiryStatus;

// --- ProductionBatch (table `production_batches`) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductionBatch {
    #[schema(ignore)]
    #[serde(skip)]
    pub id: i64,
    #[schema(example = "BATCH001")]
    pub batch_id: String,
    #[schema(example = "2025-11-10")]
    pub production_date: String,
    #[schema(example = "Rina")]
    pub person_in_charge: String,
    #[schema(example = "Roastery Bandung")]
    pub production_site: String,
    #[schema(example = "Arabica Gayo")]
    pub variant: String,
    #[schema(example = "Gudang A-2")]
    pub warehouse_location: String,
    #[schema(example = "2026-05-09")]
    pub expiry_date: String,
    #[schema(example = "2025-11-10 09:15:00")]
    pub created_at: String,
    #[schema(example = "2025-11-10 09:15:00")]
    pub updated_at: String,
}

/// Validated insert, built from `CreateBatchPayload`.
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub batch_id: String,
    pub production_date: NaiveDate,
    pub person_in_charge: String,
    pub production_site: String,
    pub variant: String,
    pub warehouse_location: String,
    pub expiry_date: NaiveDate,
}

/// Only the mutable fields; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct BatchChanges {
    pub production_site: Option<String>,
    pub variant: Option<String>,
    pub warehouse_location: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

impl BatchChanges {
    pub fn is_empty(&self) -> bool {
        self.production_site.is_none()
            && self.variant.is_none()
            && self.warehouse_location.is_none()
            && self.expiry_date.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

// ---
// Payloads
// ---

pub const MAX_BATCH_ID_LEN: usize = 64;

/// Canonical form of a batch id: trimmed, upper-case.
pub fn normalize_batch_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Batch ids end up in file names and URLs: keep them to a safe alphabet.
pub fn validate_batch_id(value: &str) -> Result<(), ValidationError> {
    let mut chars = value.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if !(first_ok && rest_ok) {
        let mut err = ValidationError::new("batch_id_charset");
        err.message = Some("Only letters, digits, '-', '_' and '.' are allowed.".into());
        return Err(err);
    }
    if value.len() > MAX_BATCH_ID_LEN {
        let mut err = ValidationError::new("batch_id_length");
        err.message = Some("At most 64 characters.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchPayload {
    #[validate(
        length(min = 1, max = 64, message = "required"),
        custom(function = "validate_batch_id")
    )]
    #[schema(example = "BATCH001")]
    pub batch_id: String,

    #[schema(value_type = String, example = "2025-11-10")]
    pub production_date: NaiveDate,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Rina")]
    pub person_in_charge: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Roastery Bandung")]
    pub production_site: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Arabica Gayo")]
    pub variant: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Gudang A-2")]
    pub warehouse_location: String,

    #[schema(value_type = String, example = "2026-05-09")]
    pub expiry_date: NaiveDate,
}

impl CreateBatchPayload {
    /// Trims every text field and upper-cases the batch id.
    pub fn normalized(self) -> Self {
        Self {
            batch_id: normalize_batch_id(&self.batch_id),
            person_in_charge: self.person_in_charge.trim().to_string(),
            production_site: self.production_site.trim().to_string(),
            variant: self.variant.trim().to_string(),
            warehouse_location: self.warehouse_location.trim().to_string(),
            ..self
        }
    }

    pub fn validate_consistency(&self) -> Result<(), ValidationError> {
        check_expiry_after_production(self.production_date, self.expiry_date)
    }

    pub fn into_new_batch(self) -> NewBatch {
        NewBatch {
            batch_id: self.batch_id,
            production_date: self.production_date,
            person_in_charge: self.person_in_charge,
            production_site: self.production_site,
            variant: self.variant,
            warehouse_location: self.warehouse_location,
            expiry_date: self.expiry_date,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBatchPayload {
    #[validate(length(min = 1, message = "must not be empty"))]
    #[schema(example = "Roastery Bandung")]
    pub production_site: Option<String>,

    #[validate(length(min = 1, message = "must not be empty"))]
    #[schema(example = "Robusta Temanggung")]
    pub variant: Option<String>,

    #[validate(length(min = 1, message = "must not be empty"))]
    #[schema(example = "Gudang B-1")]
    pub warehouse_location: Option<String>,

    #[schema(value_type = Option<String>, example = "2026-06-01")]
    pub expiry_date: Option<NaiveDate>,
}

impl UpdateBatchPayload {
    /// Trims the text fields so whitespace-only values fail `validate()`.
    pub fn normalized(self) -> Self {
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string());
        Self {
            production_site: trim(self.production_site),
            variant: trim(self.variant),
            warehouse_location: trim(self.warehouse_location),
            ..self
        }
    }

    pub fn into_changes(self) -> BatchChanges {
        BatchChanges {
            production_site: self.production_site,
            variant: self.variant,
            warehouse_location: self.warehouse_location,
            expiry_date: self.expiry_date,
        }
    }
}

pub fn check_expiry_after_production(
    production: NaiveDate,
    expiry: NaiveDate,
) -> Result<(), ValidationError> {
    if expiry <= production {
        let mut err = ValidationError::new("ExpiryBeforeProduction");
        err.message = Some("The expiry date must be after the production date.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Views
// ---

/// One row of the operator table: record, expiry status and QR thumbnail.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchRow {
    #[serde(flatten)]
    pub batch: ProductionBatch,
    pub status: ExpiryStatus,
    #[schema(example = "⚠️ Hampir kedaluwarsa (5 hari lagi)")]
    pub status_label: String,
    pub days_until_expiry: Option<i64>,
    /// `data:image/png;base64,...`, or `null` when the QR file is missing.
    pub qr_thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBatch {
    pub batch: ProductionBatch,
    #[schema(example = "http://localhost:3000/consumer?batch_id=BATCH001")]
    pub consumer_url: String,
    #[schema(example = "/api/batches/BATCH001/qr")]
    pub qr_url: String,
}

/// Public, read-only summary reached through the QR link.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerView {
    pub batch_id: String,
    pub variant: String,
    pub production_date: String,
    pub production_site: String,
    pub warehouse_location: String,
    pub expiry_date: String,
    pub status: ExpiryStatus,
    pub status_label: String,
    pub person_in_charge: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerPlaceholder {
    #[schema(example = "Scan QR Code pada kemasan untuk melihat informasi produk.")]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub payload: String,
    pub batch_id: String,
    pub batch: ConsumerView,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LatestScanResponse {
    pub payload: Option<String>,
    pub batch_id: Option<String>,
}

// --- CSV row: header = field names, no surrogate id ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCsvRow {
    pub batch_id: String,
    pub production_date: String,
    pub person_in_charge: String,
    pub production_site: String,
    pub variant: String,
    pub warehouse_location: String,
    pub expiry_date: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ProductionBatch> for BatchCsvRow {
    fn from(b: ProductionBatch) -> Self {
        Self {
            batch_id: b.batch_id,
            production_date: b.production_date,
            person_in_charge: b.person_in_charge,
            production_site: b.production_site,
            variant: b.variant,
            warehouse_location: b.warehouse_location,
            expiry_date: b.expiry_date,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(batch_id: &str) -> CreateBatchPayload {
        CreateBatchPayload {
            batch_id: batch_id.to_string(),
            production_date: NaiveDate::from_ymd_opt(2025, 11, 10).unwrap(),
            person_in_charge: " Rina ".into(),
            production_site: "Bandung".into(),
            variant: "Arabica".into(),
            warehouse_location: "A-2".into(),
            expiry_date: NaiveDate::from_ymd_opt(2026, 5, 9).unwrap(),
        }
    }

    #[test]
    fn normalizes_batch_id_and_text_fields() {
        let p = payload("  batch001 ").normalized();
        assert_eq!(p.batch_id, "BATCH001");
        assert_eq!(p.person_in_charge, "Rina");
        assert!(p.validate().is_ok());
    }

    #[test]
    fn rejects_unsafe_batch_ids() {
        for bad in ["../etc", "A B", "A/B", "-LEAD", "X?y=1"] {
            assert!(validate_batch_id(bad).is_err(), "{bad} should be rejected");
        }
        for good in ["BATCH001", "HC-2025.11_01", "7"] {
            assert!(validate_batch_id(good).is_ok(), "{good} should be accepted");
        }
    }

    #[test]
    fn empty_required_field_fails_validation() {
        let mut p = payload("B1");
        p.variant = String::new();
        let errors = p.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("variant"));
    }

    #[test]
    fn expiry_must_follow_production() {
        let mut p = payload("B1");
        p.expiry_date = p.production_date;
        assert!(p.validate_consistency().is_err());
    }

    #[test]
    fn update_payload_trims_and_keeps_absent_fields() {
        let changes = UpdateBatchPayload {
            variant: Some("  Robusta ".into()),
            ..Default::default()
        }
        .normalized()
        .into_changes();
        assert_eq!(changes.variant.as_deref(), Some("Robusta"));
        assert!(changes.production_site.is_none());
        assert!(!changes.is_empty());
        assert!(BatchChanges::default().is_empty());
    }

    #[test]
    fn whitespace_only_update_fails_validation() {
        let payload = UpdateBatchPayload {
            variant: Some("   ".into()),
            ..Default::default()
        }
        .normalized();
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("variant"));
    }

    #[test]
    fn overlong_batch_id_is_rejected() {
        assert!(validate_batch_id(&"A".repeat(MAX_BATCH_ID_LEN)).is_ok());
        assert!(validate_batch_id(&"A".repeat(MAX_BATCH_ID_LEN + 1)).is_err());
        assert_eq!(normalize_batch_id("  batch001 "), "BATCH001");
    }
}
