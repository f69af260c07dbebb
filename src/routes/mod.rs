pub mod analytics;
pub mod ingest;
pub mod interactions;
pub mod views;
pub mod workflows;
