use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("projection error: {0}")]
    Projection(#[from] proj4rs::errors::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("download failed with HTTP status {status}")]
    Download { status: u16 },

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("sink rejected batch: {message}")]
    Sink { message: String },
}

pub type Result<T> = std::result::Result<T, HarvestError>;
