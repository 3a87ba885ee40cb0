//! Error types for layer updates and menu configuration

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Unsupported input kind: {0}")]
    UnsupportedInputKind(String),

    #[error("Label map is {labels_width}x{labels_height} but the base image is {image_width}x{image_height}")]
    ShapeMismatch {
        image_width: u32,
        image_height: u32,
        labels_width: u32,
        labels_height: u32,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to decode '{path}': {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Buffer size mismatch: expected {expected} samples ({width}x{height}x{channels}), got {actual}")]
    BufferSizeMismatch {
        width: u32,
        height: u32,
        channels: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Opacity must be in (0, 1], got {0}")]
    InvalidOpacity(f32),

    #[error("Invalid label value {value}: labels must be integers in 0..=4294967295")]
    InvalidLabel { value: i128 },

    #[error("Duplicate context menu label: {0}")]
    DuplicateMenuLabel(String),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
