use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CurateError>;

#[derive(Debug, Error)]
pub enum CurateError {
    #[error("degenerate box ({x1}, {y1}, {x2}, {y2}) cannot be normalized")]
    InvalidGeometry { x1: f32, y1: f32, x2: f32, y2: f32 },
    #[error("unrecognized key {0:?}, press 'y' (auto), 'n' (manual), 's' (skip) or 'q' (quit)")]
    UnrecognizedInput(char),
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("json parse error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed label on line {line}: {msg}")]
    Label { line: usize, msg: String },
    #[error("detector failed: {0}")]
    Detector(String),
    #[error("invalid split: {0}")]
    InvalidSplit(String),
    #[error("preview failed: {0}")]
    Preview(String),
}

impl CurateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CurateError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        CurateError::Image {
            path: path.into(),
            source,
        }
    }
}
