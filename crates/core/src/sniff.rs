//! Content sniffing and the extension allow-list.
//!
//! The extension a file is stored under is decided here from its leading
//! bytes only. Client-supplied filenames and content types never reach this
//! module.

use crate::config::UploadConfig;
use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek, SeekFrom};
use thiserror::Error;

/// MIME type reported for content no signature matched.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// MIME type reported for an empty upload.
pub const EMPTY: &str = "application/x-empty";

/// Preferred extension for MIME types with several registered extensions.
const CANONICAL_EXTENSIONS: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/bmp", "bmp"),
    ("image/tiff", "tiff"),
    ("image/avif", "avif"),
    ("image/heif", "heif"),
    ("image/x-icon", "ico"),
    ("image/vnd.microsoft.icon", "ico"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
    ("video/x-m4v", "m4v"),
    ("video/quicktime", "mov"),
    ("video/x-matroska", "mkv"),
    ("video/x-msvideo", "avi"),
    ("audio/mpeg", "mp3"),
    ("audio/ogg", "ogg"),
    ("audio/x-wav", "wav"),
    ("audio/x-flac", "flac"),
    ("audio/m4a", "m4a"),
    ("application/pdf", "pdf"),
    ("application/zip", "zip"),
    ("application/gzip", "gz"),
    ("application/x-tar", "tar"),
    ("text/plain", "txt"),
];

/// Result of sniffing a byte prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Detected {
    /// Lowercased MIME type derived from content.
    pub mime: String,
    /// Extension (without dot) mapped from `mime`, if any.
    pub extension: Option<String>,
}

/// Why sniffed content was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SniffRejection {
    #[error("no extension known for content type {mime}")]
    Unrecognized { mime: String },

    #[error("extension {extension} is not allowed")]
    NotAllowed { extension: String },
}

/// Which sniffed extensions may be stored.
#[derive(Clone, Debug)]
pub enum ExtensionPolicy {
    /// Every derivable extension is accepted. Only reachable through explicit config.
    AllowAll,
    /// Only the listed extensions (lowercase, no dot).
    Only(HashSet<String>),
}

impl ExtensionPolicy {
    /// Build an allow-list policy, normalizing case and leading dots.
    pub fn only<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Only(
            extensions
                .into_iter()
                .map(|e| normalize_extension(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }

    /// The policy described by upload configuration.
    pub fn from_config(config: &UploadConfig) -> Self {
        if config.allow_all_extensions {
            Self::AllowAll
        } else {
            Self::only(&config.allowed_extensions)
        }
    }

    /// Check whether an extension passes the policy.
    pub fn allows(&self, extension: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::Only(set) => set.contains(&normalize_extension(extension)),
        }
    }
}

/// Determines a trusted extension for uploaded content.
#[derive(Clone, Debug)]
pub struct ContentSniffer {
    window: usize,
    overrides: HashMap<String, String>,
    policy: ExtensionPolicy,
}

impl ContentSniffer {
    /// Create a sniffer reading at most `window` bytes.
    ///
    /// `overrides` maps MIME types to extensions and wins over the built-in table.
    pub fn new(window: usize, overrides: &HashMap<String, String>, policy: ExtensionPolicy) -> Self {
        let overrides = overrides
            .iter()
            .map(|(mime, ext)| (mime.trim().to_lowercase(), normalize_extension(ext)))
            .filter(|(mime, ext)| !mime.is_empty() && !ext.is_empty())
            .collect();
        Self {
            window,
            overrides,
            policy,
        }
    }

    /// Build a sniffer from upload configuration.
    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(
            config.sniff_window_bytes,
            &config.mime_overrides,
            ExtensionPolicy::from_config(config),
        )
    }

    /// The allow-list in effect.
    pub fn policy(&self) -> &ExtensionPolicy {
        &self.policy
    }

    /// Sniff a seekable stream.
    ///
    /// Reads at most `window` bytes regardless of stream length and rewinds to
    /// the start before returning, so the caller can still persist everything.
    pub fn detect<R: Read + Seek>(&self, reader: &mut R) -> crate::Result<Detected> {
        let mut prefix = Vec::with_capacity(self.window);
        reader
            .by_ref()
            .take(self.window as u64)
            .read_to_end(&mut prefix)?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(self.detect_bytes(&prefix))
    }

    /// Sniff an in-memory buffer. Only the first `window` bytes are looked at.
    pub fn detect_bytes(&self, data: &[u8]) -> Detected {
        let prefix = &data[..data.len().min(self.window)];
        let mime = sniff_mime(prefix);
        let extension = self.extension_for(&mime);
        Detected { mime, extension }
    }

    /// Map a MIME type to an extension: overrides, then canonical table, then `mime_guess`.
    pub fn extension_for(&self, mime: &str) -> Option<String> {
        let mime = mime.trim().to_lowercase();
        if mime == OCTET_STREAM || mime == EMPTY {
            return None;
        }
        if let Some(ext) = self.overrides.get(&mime) {
            return Some(ext.clone());
        }
        if let Some((_, ext)) = CANONICAL_EXTENSIONS.iter().find(|(m, _)| *m == mime) {
            return Some((*ext).to_string());
        }
        mime_guess::get_mime_extensions_str(&mime)
            .and_then(|exts| exts.first())
            .map(|ext| normalize_extension(ext))
    }

    /// Apply the allow-list to a detection result, returning the extension to store under.
    pub fn check(&self, detected: &Detected) -> Result<String, SniffRejection> {
        let extension = detected
            .extension
            .as_deref()
            .ok_or_else(|| SniffRejection::Unrecognized {
                mime: detected.mime.clone(),
            })?;
        if !self.policy.allows(extension) {
            return Err(SniffRejection::NotAllowed {
                extension: extension.to_string(),
            });
        }
        Ok(extension.to_string())
    }
}

/// Detect a MIME type from magic bytes, falling back to plain text detection.
fn sniff_mime(prefix: &[u8]) -> String {
    if prefix.is_empty() {
        return EMPTY.to_string();
    }
    if let Some(kind) = infer::get(prefix) {
        return kind.mime_type().to_lowercase();
    }
    if looks_like_text(prefix) {
        return "text/plain".to_string();
    }
    OCTET_STREAM.to_string()
}

/// UTF-8 without NUL bytes. A code point cut off by the sniff window still counts.
fn looks_like_text(prefix: &[u8]) -> bool {
    if prefix.contains(&0) {
        return false;
    }
    match std::str::from_utf8(prefix) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && e.valid_up_to() > 0,
    }
}

/// Lowercase, trim and strip leading dots.
fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
