//! Local file content: reading, fingerprinting and resource type
//! classification.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use base64::prelude::{Engine as _, BASE64_STANDARD};

use crate::change_cache::{content_hash, Fingerprint};
use crate::error::{io_err, SyncError};

/// Web resource type codes understood by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebResourceType {
    Html,
    Css,
    Script,
    Data,
    Png,
    Jpg,
    Gif,
    Xsl,
    Ico,
    Svg,
}

impl WebResourceType {
    /// Extensions a folder publish picks up, lowercase, without the dot.
    pub const EXTENSIONS: [&'static str; 16] = [
        "html", "htm", "css", "js", "ts", "xml", "resx", "json", "png", "jpg", "jpeg", "gif",
        "xsl", "xslt", "ico", "svg",
    ];

    pub fn code(self) -> u8 {
        match self {
            WebResourceType::Html => 1,
            WebResourceType::Css => 2,
            WebResourceType::Script => 3,
            WebResourceType::Data => 4,
            WebResourceType::Png => 5,
            WebResourceType::Jpg => 6,
            WebResourceType::Gif => 7,
            WebResourceType::Xsl => 10,
            WebResourceType::Ico => 11,
            WebResourceType::Svg => 12,
        }
    }

    /// Classify by extension, case-insensitively. Unknown extensions upload
    /// as script.
    pub fn from_path(path: &Path) -> Self {
        let ext = extension(path);
        match ext.as_deref() {
            Some("html" | "htm") => WebResourceType::Html,
            Some("css") => WebResourceType::Css,
            Some("xml" | "resx" | "json") => WebResourceType::Data,
            Some("png") => WebResourceType::Png,
            Some("jpg" | "jpeg") => WebResourceType::Jpg,
            Some("gif") => WebResourceType::Gif,
            Some("xsl" | "xslt") => WebResourceType::Xsl,
            Some("ico") => WebResourceType::Ico,
            Some("svg") => WebResourceType::Svg,
            _ => WebResourceType::Script,
        }
    }

    /// `true` when a folder publish should include `path`.
    pub fn is_publishable(path: &Path) -> bool {
        extension(path).is_some_and(|ext| Self::EXTENSIONS.contains(&ext.as_str()))
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// A local file read once for both change detection and upload.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub fingerprint: Fingerprint,
}

impl LocalFile {
    pub async fn read(path: &Path) -> Result<Self, SyncError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| io_err(path, e))?;
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_err(path, e))?;
        let modified_time = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as f64)
            .unwrap_or(0.0);
        let fingerprint = Fingerprint {
            modified_time,
            byte_size: bytes.len() as u64,
            content_hash: content_hash(&bytes),
        };
        Ok(Self {
            path: path.to_path_buf(),
            bytes,
            fingerprint,
        })
    }

    pub fn base64(&self) -> String {
        BASE64_STANDARD.encode(&self.bytes)
    }

    /// File name shown as the resource's display name.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_table_matches_platform_codes() {
        let cases = [
            ("a.html", 1),
            ("a.HTM", 1),
            ("a.css", 2),
            ("a.js", 3),
            ("a.ts", 3),
            ("a.xml", 4),
            ("a.resx", 4),
            ("a.json", 4),
            ("a.png", 5),
            ("a.jpg", 6),
            ("a.jpeg", 6),
            ("a.gif", 7),
            ("a.xsl", 10),
            ("a.xslt", 10),
            ("a.ico", 11),
            ("a.svg", 12),
            ("a.unknown", 3),
            ("Makefile", 3),
        ];
        for (name, code) in cases {
            assert_eq!(WebResourceType::from_path(Path::new(name)).code(), code, "{name}");
        }
    }

    #[test]
    fn publishable_extensions() {
        assert!(WebResourceType::is_publishable(Path::new("forms/acct.JS")));
        assert!(!WebResourceType::is_publishable(Path::new("notes.md")));
        assert!(!WebResourceType::is_publishable(Path::new("README")));
    }

    #[tokio::test]
    async fn read_fingerprints_and_encodes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("acct.js");
        std::fs::write(&path, b"abc").unwrap();

        let file = LocalFile::read(&path).await.unwrap();
        assert_eq!(file.fingerprint.byte_size, 3);
        assert_eq!(file.fingerprint.content_hash, content_hash(b"abc"));
        assert!(file.fingerprint.modified_time > 0.0);
        assert_eq!(file.base64(), "YWJj");
        assert_eq!(file.display_name(), "acct.js");
    }
}
