pub mod activity;
pub mod backup;
pub mod batch;
