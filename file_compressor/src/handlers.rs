use std::convert::Infallible;

use bytes::BufMut;
use futures_util::TryStreamExt;
use log::{error, info, warn};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use warp::http::{header, HeaderValue, StatusCode};
use warp::multipart::FormData;
use warp::{Rejection, Reply};

use crate::config::{COMPRESSED_SUFFIX, FILE_FIELD};
use crate::gzip::gzip_in_background;
use crate::models::{FilePart, ServerError};
use crate::state::ServerState;

pub async fn handle_compress(form: FormData, state: ServerState) -> Result<impl Reply, Rejection> {
    let upload = read_file_part(form).await?;
    let original_size = upload.content.len();

    let compressed = gzip_in_background(upload.content, state.compression_level())
        .await
        .map_err(|e| {
            error!("Failed to compress {}: {}", upload.filename, e);
            warp::reject::custom(ServerError::Compression)
        })?;

    let total = state.record_compressed();
    info!(
        "Compressed {} ({} -> {} bytes, {} total)",
        upload.filename,
        original_size,
        compressed.len(),
        total
    );

    let filename = format!("{}{}", upload.filename, COMPRESSED_SUFFIX);
    let mut response = warp::reply::Response::new(compressed.into());
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/gzip"));
    headers.insert(header::CONTENT_DISPOSITION, content_disposition(&filename));

    Ok(response)
}

// RFC 5987 attr-char
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// `attachment` disposition for `filename`. Names that are not plain
/// printable ASCII get a stripped ASCII fallback plus `filename*`.
pub fn content_disposition(filename: &str) -> HeaderValue {
    let fallback: String = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control() && *c != '"' && *c != '\\')
        .collect();

    let value = if fallback == filename {
        format!("attachment; filename=\"{}\"", filename)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            utf8_percent_encode(filename, ATTR_CHAR)
        )
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

// First part named `file` that carries a filename; plain text fields are skipped
async fn read_file_part(form: FormData) -> Result<FilePart, Rejection> {
    futures_util::pin_mut!(form);

    while let Some(mut part) = form.try_next().await.map_err(malformed)? {
        if part.name() != FILE_FIELD {
            continue;
        }
        let filename = match part.filename() {
            Some(name) => name.to_string(),
            None => continue,
        };
        if filename.is_empty() {
            return Err(warp::reject::custom(ServerError::NoSelectedFile));
        }

        let mut content = Vec::new();
        while let Some(chunk) = part.data().await {
            content.put(chunk.map_err(malformed)?);
        }
        return Ok(FilePart { filename, content });
    }

    Err(warp::reject::custom(ServerError::NoFilePart))
}

fn malformed(err: warp::Error) -> Rejection {
    warp::reject::custom(ServerError::MalformedForm(err.to_string()))
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(server_err) = err.find::<ServerError>() {
        (server_err.status(), server_err.to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "File too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else if err.find::<warp::reject::MissingHeader>().is_some()
        || err.find::<warp::reject::InvalidHeader>().is_some()
    {
        // Not a multipart body at all
        (StatusCode::BAD_REQUEST, ServerError::NoFilePart.to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    if status.is_server_error() {
        error!("Request failed: {:?}", err);
    } else {
        warn!("Request rejected: {} {}", status.as_u16(), message);
    }

    Ok(warp::reply::with_status(message, status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_name_is_quoted_as_is() {
        assert_eq!(
            content_disposition("notes.txt.gz"),
            "attachment; filename=\"notes.txt.gz\""
        );
    }

    #[test]
    fn non_ascii_name_gets_fallback_and_encoded_form() {
        assert_eq!(
            content_disposition("résumé.txt.gz"),
            "attachment; filename=\"rsum.txt.gz\"; filename*=UTF-8''r%C3%A9sum%C3%A9.txt.gz"
        );
    }

    #[test]
    fn quotes_and_backslashes_never_reach_the_quoted_string() {
        let value = content_disposition("a\"b\\c.gz");
        assert_eq!(
            value,
            "attachment; filename=\"abc.gz\"; filename*=UTF-8''a%22b%5Cc.gz"
        );
    }

    #[test]
    fn control_characters_are_stripped_from_fallback() {
        let value = content_disposition("bad\r\nname.gz");
        let text = value.to_str().unwrap();
        assert!(text.starts_with("attachment; filename=\"badname.gz\"; "));
        assert!(text.ends_with("bad%0D%0Aname.gz"));
    }
}
