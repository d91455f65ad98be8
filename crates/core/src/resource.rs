//! Resource identifiers: uploaded files and short URLs.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// The two kinds of resource a deletion capability can refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    File,
    ShortUrl,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::ShortUrl => "short_url",
        }
    }

    /// Human readable name used in response messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::ShortUrl => "short URL",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored upload: random stem plus an extension taken from sniffed content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedFile {
    filename: String,
    extension: String,
}

impl UploadedFile {
    /// Build from a generated token and a sniffed extension.
    pub fn new(token: impl Into<String>, extension: impl AsRef<str>) -> Result<Self> {
        let filename = token.into();
        if filename.is_empty() || !filename.chars().all(is_token_char) {
            return Err(Error::InvalidFilename(filename));
        }
        let extension = extension.as_ref().trim_start_matches('.').to_lowercase();
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidFilename(format!("{filename}.{extension}")));
        }
        Ok(Self {
            filename,
            extension,
        })
    }

    /// Build from a token, optionally suffixed with a fragment of the client's filename.
    ///
    /// The fragment is sanitized, reduced to its stem and capped at `max_len`
    /// characters. An original name that sanitizes to nothing adds no suffix.
    pub fn compose(
        token: impl Into<String>,
        original: Option<&str>,
        max_len: usize,
        extension: impl AsRef<str>,
    ) -> Result<Self> {
        let mut file = Self::new(token, extension)?;
        if let Some(suffix) = original.and_then(|name| original_suffix(name, max_len)) {
            file.filename = format!("{}-{}", file.filename, suffix);
        }
        Ok(file)
    }

    /// Stem without the extension.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Storage key, public path segment and capability identifier.
    pub fn full_filename(&self) -> String {
        format!("{}.{}", self.filename, self.extension)
    }
}

/// A shortened URL with its lookup token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShortUrl {
    pub token: String,
    pub url: String,
}

impl ShortUrl {
    /// Normalize `raw` and pair it with `token`.
    pub fn new(token: impl Into<String>, raw: &str) -> Result<Self> {
        Ok(Self {
            token: token.into(),
            url: normalize_url(raw)?,
        })
    }
}

/// Ensure a URL carries an explicit scheme and a host.
///
/// Input without `http://` or `https://` gets `https://` prepended.
pub fn normalize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("url is empty".to_string()));
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&candidate).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(Error::InvalidUrl(format!("no host in {trimmed}"))),
    }

    Ok(parsed.to_string())
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Sanitize an original filename down to a short, safe stem.
fn original_suffix(name: &str, max_len: usize) -> Option<String> {
    // Browsers on Windows may send the full client path.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let sanitized: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let sanitized = sanitized.trim_matches(|c| c == '.' || c == '_');

    let stem = match sanitized.rfind('.') {
        Some(idx) if idx > 0 => &sanitized[..idx],
        _ => sanitized,
    };

    let capped: String = stem.chars().take(max_len).collect();
    let capped = capped.trim_start_matches('.');
    if capped.is_empty() {
        None
    } else {
        Some(capped.to_string())
    }
}
