//! Content type detection from file contents
//!
//! The MIME type is sniffed from the leading bytes of the file. The file
//! name and extension are never consulted.

use std::path::Path;

use tokio::io::AsyncReadExt;

use crate::error::{Error, Result};

/// Number of leading bytes inspected
const SNIFF_LEN: usize = 8192;

/// Fallback for binary content without a known signature
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Fallback for unrecognised text content
pub const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Determine the MIME type of the file at `path`
pub async fn classify(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path).await?;
    if !metadata.is_file() {
        return Err(Error::Classification(format!(
            "{} is not a regular file",
            path.display()
        )));
    }

    let file = tokio::fs::File::open(path).await?;
    let mut buf = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut buf).await?;

    if buf.is_empty() {
        return Err(Error::Classification(format!(
            "{} is empty",
            path.display()
        )));
    }

    Ok(sniff(&buf).to_string())
}

/// MIME type for a content prefix
fn sniff(buf: &[u8]) -> &'static str {
    if let Some(kind) = infer::get(buf) {
        return kind.mime_type();
    }

    if looks_like_text(buf) {
        PLAIN_TEXT
    } else {
        OCTET_STREAM
    }
}

fn looks_like_text(buf: &[u8]) -> bool {
    if buf.contains(&0) {
        return false;
    }
    match std::str::from_utf8(buf) {
        Ok(_) => true,
        // A multi-byte character cut off at the end of the sniff window is still text
        Err(e) => e.error_len().is_none() && buf.len() == SNIFF_LEN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[tokio::test]
    async fn test_detects_pdf_by_content() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "report.txt", b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n1 0 obj\n");
        assert_eq!(classify(&path).await.unwrap(), "application/pdf");
    }

    #[tokio::test]
    async fn test_detects_png_without_extension() {
        let dir = TempDir::new().unwrap();
        let png = [
            0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R',
        ];
        let path = write(&dir, "image", &png);
        assert_eq!(classify(&path).await.unwrap(), "image/png");
    }

    #[tokio::test]
    async fn test_detects_zip() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "secret.zip", b"PK\x03\x04\x14\x00\x00\x00\x08\x00");
        assert_eq!(classify(&path).await.unwrap(), "application/zip");
    }

    #[tokio::test]
    async fn test_plain_text_fallback() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "notes.pdf", "hello wörld\n".as_bytes());
        assert_eq!(classify(&path).await.unwrap(), PLAIN_TEXT);
    }

    #[tokio::test]
    async fn test_binary_fallback() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "blob.bin", &[0x00, 0x9f, 0x42, 0x13, 0x37]);
        assert_eq!(classify(&path).await.unwrap(), OCTET_STREAM);
    }

    #[tokio::test]
    async fn test_only_leading_window_is_read() {
        let dir = TempDir::new().unwrap();
        let mut data = vec![b'a'; SNIFF_LEN];
        data.extend_from_slice(&[0x00, 0xff, 0x00]);
        let path = write(&dir, "long.log", &data);
        assert_eq!(classify(&path).await.unwrap(), PLAIN_TEXT);
    }

    #[tokio::test]
    async fn test_empty_file_is_classification_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.txt", b"");
        assert!(matches!(classify(&path).await, Err(Error::Classification(_))));
    }

    #[tokio::test]
    async fn test_directory_is_classification_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(classify(dir.path()).await, Err(Error::Classification(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.txt");
        assert!(matches!(classify(&path).await, Err(Error::Io(_))));
    }
}
