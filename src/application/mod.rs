pub mod download_coordinator;
pub mod session;

pub use download_coordinator::{DownloadCoordinator, DownloadEvent};
