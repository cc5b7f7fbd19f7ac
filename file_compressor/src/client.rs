use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use thiserror::Error;

use crate::config::{ClientConfig, PLACEHOLDER_VALUE};

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("request to compression server failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("compression server responded with {0}")]
    Status(StatusCode),
    #[error("failed to read selected file: {0}")]
    Io(#[from] std::io::Error),
}

/// What goes into the `file` part of the form.
#[derive(Debug, Clone)]
pub enum UploadPayload {
    File(Bytes),
    /// The literal text value the legacy page sent instead of the file.
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub payload: UploadPayload,
}

/// Sends one upload to whatever does the compressing and hands back the
/// response body untouched.
#[async_trait]
pub trait Compressor: Send + Sync {
    async fn compress(&self, upload: Upload) -> Result<Bytes, CompressError>;
}

pub struct HttpCompressor {
    client: reqwest::Client,
    url: String,
    field_name: String,
}

impl HttpCompressor {
    pub fn new(config: &ClientConfig) -> Result<Self, CompressError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url: config.compress_url(),
            field_name: config.field_name.clone(),
        })
    }

    fn build_form(&self, upload: Upload) -> Form {
        let part = match upload.payload {
            UploadPayload::File(content) => {
                Part::bytes(content.to_vec()).file_name(upload.file_name)
            }
            UploadPayload::Placeholder => Part::text(PLACEHOLDER_VALUE),
        };
        Form::new().part(self.field_name.clone(), part)
    }
}

#[async_trait]
impl Compressor for HttpCompressor {
    async fn compress(&self, upload: Upload) -> Result<Bytes, CompressError> {
        debug!("POST {} ({})", self.url, upload.file_name);

        let response = self
            .client
            .post(&self.url)
            .multipart(self.build_form(upload))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompressError::Status(status));
        }

        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn compressor_for(server: &Server) -> HttpCompressor {
        let config = ClientConfig::default().with_server_url(server.url());
        HttpCompressor::new(&config).unwrap()
    }

    fn upload(name: &str, content: &'static [u8]) -> Upload {
        Upload {
            file_name: name.to_string(),
            payload: UploadPayload::File(Bytes::from_static(content)),
        }
    }

    #[tokio::test]
    async fn returns_response_body_on_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/compress")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="file"; filename="report.pdf""#.to_string()),
                Matcher::Regex("pdf-bytes".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/gzip")
            .with_body([0x1f, 0x8b, 0x08, 0x00])
            .create_async()
            .await;

        let body = compressor_for(&server)
            .compress(upload("report.pdf", b"pdf-bytes"))
            .await
            .unwrap();

        assert_eq!(&body[..], &[0x1f, 0x8b, 0x08, 0x00]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/compress")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = compressor_for(&server)
            .compress(upload("a.txt", b"a"))
            .await
            .unwrap_err();

        assert!(matches!(err, CompressError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
    }

    #[tokio::test]
    async fn placeholder_sends_text_field_without_filename() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/compress")
            .match_body(Matcher::Regex(r#"name="file"\r\n\r\ntest\r\n"#.to_string()))
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let placeholder = Upload {
            file_name: "ignored.bin".to_string(),
            payload: UploadPayload::Placeholder,
        };
        compressor_for(&server).compress(placeholder).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let config = ClientConfig::default().with_server_url("http://127.0.0.1:1");
        let err = HttpCompressor::new(&config)
            .unwrap()
            .compress(upload("a.txt", b"a"))
            .await
            .unwrap_err();

        assert!(matches!(err, CompressError::Transport(_)));
    }
}
