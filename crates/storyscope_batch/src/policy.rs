//! Upload policy: what may enter a batch and how it is named.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Extensions accepted when no configuration overrides them.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] =
    &["mp3", "wav", "mp4", "avi", "mov", "jpg", "jpeg", "png", "gif"];

/// 500 MiB
pub const DEFAULT_MAX_BATCH_BYTES: u64 = 500 * 1024 * 1024;
pub const DEFAULT_MAX_FILE_BYTES: u64 = DEFAULT_MAX_BATCH_BYTES;

/// Limits applied by `Orchestrator::submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    allowed_extensions: Vec<String>,
    pub max_file_bytes: u64,
    pub max_batch_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
        }
    }
}

impl UploadPolicy {
    /// Extensions are matched case-insensitively; a leading dot is ignored.
    pub fn new(allowed_extensions: &[String], max_file_bytes: u64, max_batch_bytes: u64) -> Self {
        let mut allowed: Vec<String> = allowed_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        allowed.dedup();
        Self {
            allowed_extensions: allowed,
            max_file_bytes,
            max_batch_bytes,
        }
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn is_allowed(&self, filename: &str) -> bool {
        extension(filename)
            .map(|ext| self.allowed_extensions.iter().any(|a| *a == ext))
            .unwrap_or(false)
    }
}

/// Lowercased extension after the last dot, if any.
pub fn extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

/// Reduce a client-supplied name to a safe flat filename.
///
/// Keeps only the last path component, turns whitespace into `_`, drops
/// everything outside `[A-Za-z0-9._-]` and trims leading/trailing `.` and
/// `_`. May return an empty string, which callers treat as "no file".
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// MIME type handed to the analyzer.
pub fn mime_type_for(filename: &str) -> Option<&'static str> {
    let mime = match extension(filename)?.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        _ => return None,
    };
    Some(mime)
}

/// Coarse media class stored with each analysis record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Audio,
    Image,
}

impl FileKind {
    /// Audio and video both count as `Audio`.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("audio/") || mime.starts_with("video/") {
            Self::Audio
        } else {
            Self::Image
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "Audio",
            Self::Image => "Image",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human title from a filename: extension dropped, `_`/`-` become spaces,
/// every word capitalized.
pub fn title_from_filename(filename: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };
    stem.replace(['_', '-'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
