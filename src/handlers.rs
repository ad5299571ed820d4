pub mod activity;
pub mod backups;
pub mod batches;
pub mod consumer;
pub mod documents;
pub mod scan;
