//! Upload a file to a `/compress` endpoint and save the gzip it returns,
//! plus the warp server that implements that endpoint.

pub mod client;
pub mod config;
pub mod gzip;
pub mod handlers;
pub mod models;
pub mod server;
pub mod session;
pub mod state;
pub mod web;

pub use client::{CompressError, Compressor, HttpCompressor, Upload, UploadPayload};
pub use config::{ClientConfig, ServerConfig};
pub use session::{
    CompressedResult, CompressionSession, DownloadArtifact, SelectedFile, SessionError, SessionState,
};
