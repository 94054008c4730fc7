//! Key material sources
//!
//! Kubeconfig entries reference certificates, keys, and tokens in three
//! physically different ways: a path on disk, an inline base64 blob, or a
//! plain string. [`KeySource`] wraps all three behind one descriptor so
//! consumers never special-case by origin.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

/// Errors that can occur when constructing or materializing key material
#[derive(Debug, Error)]
pub enum KeySourceError {
    #[error("Missing {0}: neither a path nor inline data was provided")]
    Missing(&'static str),

    #[error("Ambiguous {0}: both a path and inline data were provided")]
    Ambiguous(&'static str),

    #[error("Failed to read key material: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode key material: {0}")]
    Decode(String),
}

/// Where a piece of key material comes from.
///
/// The descriptor is cheap to clone and carries no bytes; material is
/// only read when a stream is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Read from a file on disk
    File(PathBuf),
    /// Decoded from an inline base64 string
    Base64(String),
    /// Used verbatim
    Literal(String),
}

impl KeySource {
    /// Build a source from an optional (path, inline data) pair.
    ///
    /// Exactly one of the two must be set. `what` names the pair in error
    /// messages, e.g. `"certificate-authority"`.
    pub fn from_options(
        path: Option<PathBuf>,
        data: Option<String>,
        what: &'static str,
    ) -> Result<Self, KeySourceError> {
        match (path, data) {
            (Some(path), None) => Ok(KeySource::File(path)),
            (None, Some(data)) => Ok(KeySource::Base64(data)),
            (Some(_), Some(_)) => Err(KeySourceError::Ambiguous(what)),
            (None, None) => Err(KeySourceError::Missing(what)),
        }
    }

    /// Open the key material as a byte stream.
    ///
    /// The stream owns its resource and releases it when dropped.
    pub fn open(&self) -> Result<Box<dyn Read>, KeySourceError> {
        match self {
            KeySource::File(path) => Ok(Box::new(File::open(path)?)),
            KeySource::Base64(data) => {
                let bytes = BASE64
                    .decode(data.trim())
                    .map_err(|e| KeySourceError::Decode(e.to_string()))?;
                Ok(Box::new(Cursor::new(bytes)))
            }
            KeySource::Literal(text) => Ok(Box::new(Cursor::new(text.clone().into_bytes()))),
        }
    }

    /// Drain the stream and decode it as ASCII text.
    ///
    /// The underlying resource is released before this returns.
    pub fn to_text(&self) -> Result<String, KeySourceError> {
        let mut stream = self.open()?;
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        drop(stream);

        if !bytes.is_ascii() {
            return Err(KeySourceError::Decode(
                "key material is not ASCII".to_string(),
            ));
        }
        String::from_utf8(bytes).map_err(|e| KeySourceError::Decode(e.to_string()))
    }
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::File(path) => write!(f, "file {}", path.display()),
            KeySource::Base64(_) => write!(f, "inline base64 data"),
            KeySource::Literal(_) => write!(f, "literal value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_options_path_only() {
        let source =
            KeySource::from_options(Some(PathBuf::from("/tmp/ca.crt")), None, "certificate")
                .unwrap();
        assert_eq!(source, KeySource::File(PathBuf::from("/tmp/ca.crt")));
    }

    #[test]
    fn test_from_options_data_only() {
        let source = KeySource::from_options(None, Some("aGVsbG8=".to_string()), "certificate")
            .unwrap();
        assert_eq!(source, KeySource::Base64("aGVsbG8=".to_string()));
    }

    #[test]
    fn test_from_options_both_set() {
        let result = KeySource::from_options(
            Some(PathBuf::from("/tmp/ca.crt")),
            Some("aGVsbG8=".to_string()),
            "certificate-authority",
        );
        assert!(matches!(result, Err(KeySourceError::Ambiguous(_))));
    }

    #[test]
    fn test_from_options_neither_set() {
        let result = KeySource::from_options(None, None, "certificate-authority");
        assert!(matches!(result, Err(KeySourceError::Missing(_))));
    }

    #[test]
    fn test_literal_to_text() {
        let source = KeySource::Literal("my-token".to_string());
        assert_eq!(source.to_text().unwrap(), "my-token");
    }

    #[test]
    fn test_base64_to_text() {
        let source = KeySource::Base64("aGVsbG8=".to_string());
        assert_eq!(source.to_text().unwrap(), "hello");
    }

    #[test]
    fn test_base64_accepts_surrounding_whitespace() {
        let source = KeySource::Base64("  aGVsbG8=\n".to_string());
        assert_eq!(source.to_text().unwrap(), "hello");
    }

    #[test]
    fn test_base64_invalid_data() {
        let source = KeySource::Base64("not base64!!".to_string());
        assert!(matches!(source.open(), Err(KeySourceError::Decode(_))));
    }

    #[test]
    fn test_file_to_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"-----BEGIN CERTIFICATE-----").unwrap();

        let source = KeySource::File(file.path().to_path_buf());
        assert_eq!(source.to_text().unwrap(), "-----BEGIN CERTIFICATE-----");
    }

    #[test]
    fn test_missing_file() {
        let source = KeySource::File(PathBuf::from("/nonexistent/ca.crt"));
        assert!(matches!(source.open(), Err(KeySourceError::Io(_))));
    }

    #[test]
    fn test_non_ascii_rejected() {
        let source = KeySource::Literal("tøken".to_string());
        assert!(matches!(source.to_text(), Err(KeySourceError::Decode(_))));
    }
}
