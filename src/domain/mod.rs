pub mod error;
pub mod metadata;
pub mod model;

pub use error::AppError;
pub use metadata::StreamMetadata;
pub use model::{output_file_name, DownloadMode, DownloadPhase, DownloadRequest, DownloadedFile};
