pub mod models;
pub mod service;

pub use models::{PlayerStats, ServerStats};
pub use service::ReportService;
