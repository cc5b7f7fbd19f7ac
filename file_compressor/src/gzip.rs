use std::io;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;

use crate::config::COMPRESSED_SUFFIX;

/// Gzip `content` at `level` (clamped to 0-9).
pub fn gzip_bytes(content: &[u8], level: u32) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder.write_all(content)?;
    encoder.finish()
}

// Compression is CPU bound, keep it off the async workers
pub async fn gzip_in_background(content: Vec<u8>, level: u32) -> io::Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || gzip_bytes(&content, level)).await?
}

/// Decode a complete gzip stream.
pub fn gunzip_bytes(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

pub async fn gunzip_in_background(data: Vec<u8>) -> io::Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || gunzip_bytes(&data)).await?
}

/// `report.pdf.gz` -> `report.pdf`; names without the suffix get `.out`.
pub fn decompressed_name(name: &str) -> String {
    match name.strip_suffix(COMPRESSED_SUFFIX) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => format!("{}.out", name),
    }
}

/// Decompress `input` into `out_dir` and return the written path.
pub async fn decompress_file(input: &Path, out_dir: &Path) -> io::Result<PathBuf> {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "input has no file name"))?;

    let data = tokio::fs::read(input).await?;
    let compressed_size = data.len();
    let content = gunzip_in_background(data).await?;

    let output = out_dir.join(decompressed_name(&name));
    tokio::fs::write(&output, &content).await?;
    info!(
        "Decompressed {} ({} -> {} bytes)",
        input.display(),
        compressed_size,
        content.len()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gunzip(data: &[u8]) -> Vec<u8> {
        gunzip_bytes(data).unwrap()
    }

    #[test]
    fn output_is_gzip_and_decodes_back() {
        let content = "report ".repeat(500);
        let compressed = gzip_bytes(content.as_bytes(), 6).unwrap();

        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
        assert!(compressed.len() < content.len());
        assert_eq!(gunzip(&compressed), content.as_bytes());
    }

    #[test]
    fn empty_input_still_has_header() {
        let compressed = gzip_bytes(b"", 6).unwrap();
        assert!(!compressed.is_empty());
        assert!(gunzip(&compressed).is_empty());
    }

    #[test]
    fn out_of_range_level_is_clamped() {
        let compressed = gzip_bytes(b"abc", 42).unwrap();
        assert_eq!(gunzip(&compressed), b"abc");
    }

    #[tokio::test]
    async fn background_compression_matches_inline() {
        let inline = gzip_bytes(b"same input", 6).unwrap();
        let background = gzip_in_background(b"same input".to_vec(), 6).await.unwrap();
        assert_eq!(gunzip(&inline), gunzip(&background));
    }

    #[test]
    fn gunzip_restores_gzipped_content() {
        let content = b"%PDF-1.7 quarterly numbers".repeat(40);
        let compressed = gzip_bytes(&content, 9).unwrap();
        assert_eq!(gunzip_bytes(&compressed).unwrap(), content);
    }

    #[test]
    fn gunzip_rejects_non_gzip_input() {
        assert!(gunzip_bytes(b"plain text, not gzip").is_err());
    }

    #[test]
    fn decompressed_name_strips_suffix() {
        assert_eq!(decompressed_name("report.pdf.gz"), "report.pdf");
        assert_eq!(decompressed_name("archive.tar.gz"), "archive.tar");
        assert_eq!(decompressed_name("notes.txt"), "notes.txt.out");
        assert_eq!(decompressed_name(".gz"), ".gz.out");
    }

    #[tokio::test]
    async fn decompress_file_writes_into_out_dir() {
        let input_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let input = input_dir.path().join("report.pdf.gz");
        std::fs::write(&input, gzip_bytes(b"quarterly numbers", 6).unwrap()).unwrap();

        let written = decompress_file(&input, out_dir.path()).await.unwrap();

        assert_eq!(written, out_dir.path().join("report.pdf"));
        assert_eq!(std::fs::read(written).unwrap(), b"quarterly numbers");
    }

    #[tokio::test]
    async fn decompress_file_leaves_nothing_on_bad_input() {
        let input_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let input = input_dir.path().join("broken.gz");
        std::fs::write(&input, b"not gzip").unwrap();

        assert!(decompress_file(&input, out_dir.path()).await.is_err());
        assert_eq!(std::fs::read_dir(out_dir.path()).unwrap().count(), 0);
    }
}
