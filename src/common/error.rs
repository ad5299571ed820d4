// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::middleware::i18n::Locale;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Batch ID already exists: {0}")]
    DuplicateBatchId(String),

    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    #[error("No QR code found in image")]
    QrUnreadable,

    #[error("QR payload carries no batch id")]
    ForeignQrPayload,

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid operator token")]
    InvalidToken,

    #[error("Backup is not configured")]
    BackupNotConfigured,

    #[error("Backup file not found: {0}")]
    BackupNotFound(String),

    #[error("Backup request failed: {0}")]
    BackupFailed(String),

    #[error("Invalid backup file: {0}")]
    InvalidBackup(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Anything unexpected; `anyhow` keeps the context for the log line.
    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::BackupFailed(e.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(e: csv::Error) -> Self {
        AppError::InvalidBackup(e.to_string())
    }
}

/// The HTTP-facing error: a status plus an already localised message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), details: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.message, "details": details }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateBatchId(_) => StatusCode::CONFLICT,
            AppError::BatchNotFound(_) | AppError::BackupNotFound(_) => StatusCode::NOT_FOUND,
            AppError::QrUnreadable
            | AppError::ForeignQrPayload
            | AppError::InvalidImage(_)
            | AppError::InvalidBackup(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::BackupFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::BackupNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            AppError::FontNotFound(_)
            | AppError::DatabaseError(_)
            | AppError::Io(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the user, in Indonesian unless the client asked for English.
    pub fn message(&self, locale: &Locale) -> String {
        let en = locale.is_english();
        match self {
            AppError::ValidationError(_) => pick(en, "Satu atau lebih kolom tidak valid.", "One or more fields are invalid."),
            AppError::DuplicateBatchId(id) if en => format!("Batch ID {} is already registered, use another ID.", id),
            AppError::DuplicateBatchId(id) => format!("Batch ID {} sudah terdaftar, gunakan ID lain.", id),
            AppError::BatchNotFound(id) if en => format!("Batch {} not found.", id),
            AppError::BatchNotFound(id) => format!("Data batch {} tidak ditemukan.", id),
            AppError::QrUnreadable => pick(en, "QR tidak terbaca.", "QR code is unreadable."),
            AppError::ForeignQrPayload => pick(
                en,
                "QR tidak berisi informasi batch Harlur Coffee.",
                "QR code does not contain batch information.",
            ),
            AppError::InvalidImage(_) => pick(en, "Gambar tidak valid.", "The uploaded image is invalid."),
            AppError::InvalidToken => pick(en, "Token operator tidak valid atau tidak ada.", "Operator token is invalid or missing."),
            AppError::BackupNotConfigured => pick(en, "Backup belum dikonfigurasi.", "Backup is not configured."),
            AppError::BackupNotFound(name) if en => format!("Backup file {} was not found.", name),
            AppError::BackupNotFound(name) => format!("File backup {} tidak ditemukan.", name),
            AppError::BackupFailed(detail) if en => format!("Backup failed: {}", detail),
            AppError::BackupFailed(detail) => format!("Gagal backup: {}", detail),
            AppError::InvalidBackup(detail) if en => format!("Invalid backup file: {}", detail),
            AppError::InvalidBackup(detail) => format!("File backup tidak valid: {}", detail),
            AppError::FontNotFound(_) => pick(en, "Font untuk PDF tidak ditemukan.", "PDF font files were not found."),
            AppError::DatabaseError(_) | AppError::Io(_) | AppError::InternalServerError(_) => {
                pick(en, "Terjadi kesalahan tak terduga.", "An unexpected error occurred.")
            }
        }
    }

    pub fn to_api_error(self, locale: &Locale) -> ApiError {
        let status = self.status();
        let message = self.message(locale);

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal server error: {:?}", self);
        }

        let details = match &self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                                .into()
                        })
                        .collect();
                    details.insert(field.to_string(), Value::Array(messages));
                }
                Some(Value::Object(details))
            }
            _ => None,
        };

        ApiError { status, message, details }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

fn pick(en: bool, id: &str, english: &str) -> String {
    if en { english.to_string() } else { id.to_string() }
}
