use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";
pub const COMPRESS_PATH: &str = "/compress";
pub const FILE_FIELD: &str = "file";
pub const COMPRESSED_SUFFIX: &str = ".gz";
pub const PLACEHOLDER_VALUE: &str = "test";
pub const DEFAULT_UPLOAD_LIMIT: u64 = 64 * 1024 * 1024;
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Settings for the upload side of a compression cycle.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub endpoint: String,
    pub field_name: String,
    pub suffix: String,
    /// `None` leaves the request without a deadline.
    pub timeout: Option<Duration>,
    /// Send the literal placeholder instead of the file bytes.
    pub placeholder: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            endpoint: COMPRESS_PATH.to_string(),
            field_name: FILE_FIELD.to_string(),
            suffix: COMPRESSED_SUFFIX.to_string(),
            timeout: None,
            placeholder: false,
        }
    }
}

impl ClientConfig {
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    pub fn compress_url(&self) -> String {
        format!(
            "{}/{}",
            self.server_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub upload_limit: u64,
    /// gzip level, 0-9.
    pub compression_level: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: ([0, 0, 0, 0], 8080).into(),
            upload_limit: DEFAULT_UPLOAD_LIMIT,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}
