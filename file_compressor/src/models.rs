use thiserror::Error;
use warp::http::StatusCode;

/// The `file` part of an upload, read fully into memory.
#[derive(Debug)]
pub struct FilePart {
    pub filename: String,
    pub content: Vec<u8>,
}

// Rejections raised by the compress route
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("No file part")]
    NoFilePart,
    #[error("No selected file")]
    NoSelectedFile,
    #[error("Malformed form data: {0}")]
    MalformedForm(String),
    #[error("Failed to compress file")]
    Compression,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NoFilePart | ServerError::NoSelectedFile | ServerError::MalformedForm(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Compression => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl warp::reject::Reject for ServerError {}
