pub mod backup_service;
pub mod backup_sink;
pub mod batch_service;
pub mod csv_export;
pub mod document_service;
pub mod expiry;
pub mod qr_service;
