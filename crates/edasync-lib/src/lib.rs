pub mod align;
pub mod config;
pub mod detectors;
pub mod error;
pub mod io;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod signal;
pub mod timestamps;

pub use error::{IngestError, Warning};
pub use pipeline::{process_upload, UploadRequest, UploadResponse};
pub use signal::*;
