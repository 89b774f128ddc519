//! Attachment intake and validation.
//!
//! An attachment is an optional document or image handed to the risk
//! forecaster alongside the program description. It is checked for size and
//! media type before any bytes reach the completion backend; read failures are
//! folded into the same rejection type so callers only handle one error.
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest attachment accepted, in bytes (20 MiB).
pub const MAX_ATTACHMENT_BYTES: u64 = 20 * 1024 * 1024;

pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Media types the completion backend can decode.
pub const ALLOWED_MEDIA_TYPES: [&str; 6] = [
    "application/pdf",
    DOCX_MEDIA_TYPE,
    "text/plain",
    "image/png",
    "image/jpeg",
    "image/jpg",
];

/// Display name for an attachment piped through stdin.
pub const STDIN_ATTACHMENT_NAME: &str = "stdin";

/// Why an attachment was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentRejection {
    #[error("attachment {name} is {size} bytes, exceeding the {limit} byte limit")]
    TooLarge { name: String, size: u64, limit: u64 },

    #[error("attachment {name} has unsupported media type {media_type:?} (allowed: {allowed})")]
    UnsupportedType {
        name: String,
        media_type: String,
        allowed: String,
    },

    #[error("attachment {name} could not be read: {reason}")]
    Unreadable { name: String, reason: String },
}

/// Where the attachment bytes come from.
#[derive(Debug, Clone)]
pub enum AttachmentSource {
    Path(PathBuf),
    /// Read from standard input when validated.
    Stdin,
    #[cfg(test)]
    Bytes(Vec<u8>),
}

/// Caller-provided attachment that has not been validated yet.
#[derive(Debug, Clone)]
pub struct AttachmentInput {
    pub name: String,
    pub media_type: String,
    pub source: AttachmentSource,
}

impl AttachmentInput {
    #[cfg(test)]
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            source: AttachmentSource::Bytes(bytes),
        }
    }

    /// Reference a file on disk; the display name is its file name.
    pub fn from_path(path: &Path, media_type: impl Into<String>) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            media_type: media_type.into(),
            source: AttachmentSource::Path(path.to_path_buf()),
        }
    }

    /// Bytes piped on standard input; the media type cannot be inferred.
    pub fn from_stdin(media_type: impl Into<String>) -> Self {
        Self {
            name: STDIN_ATTACHMENT_NAME.to_string(),
            media_type: media_type.into(),
            source: AttachmentSource::Stdin,
        }
    }
}

/// A validated attachment, ready to send.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    name: String,
    media_type: String,
    bytes: Vec<u8>,
}

impl Attachment {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Validate an attachment: size first, then media type.
pub fn validate_attachment(input: AttachmentInput) -> Result<Attachment, AttachmentRejection> {
    let AttachmentInput {
        name,
        media_type,
        source,
    } = input;

    let bytes = match source {
        AttachmentSource::Path(path) => {
            // Size-checked from metadata so oversized files are never read.
            let metadata = fs::metadata(&path).map_err(|err| unreadable(&name, &err))?;
            check_size(&name, metadata.len())?;
            let file = fs::File::open(&path).map_err(|err| unreadable(&name, &err))?;
            read_capped(&name, file)?
        }
        AttachmentSource::Stdin => read_capped(&name, std::io::stdin().lock())?,
        #[cfg(test)]
        AttachmentSource::Bytes(bytes) => {
            check_size(&name, bytes.len() as u64)?;
            bytes
        }
    };

    let media_type = media_type.trim().to_ascii_lowercase();
    if !ALLOWED_MEDIA_TYPES.contains(&media_type.as_str()) {
        return Err(AttachmentRejection::UnsupportedType {
            name,
            media_type,
            allowed: ALLOWED_MEDIA_TYPES.join(", "),
        });
    }
    let media_type = canonical_media_type(media_type);

    Ok(Attachment {
        name,
        media_type,
        bytes,
    })
}

/// Read at most one byte past the limit, so an oversized stream is rejected
/// without being buffered whole.
fn read_capped(name: &str, reader: impl Read) -> Result<Vec<u8>, AttachmentRejection> {
    let mut bytes = Vec::new();
    reader
        .take(MAX_ATTACHMENT_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|err| unreadable(name, &err))?;
    check_size(name, bytes.len() as u64)?;
    Ok(bytes)
}

fn unreadable(name: &str, err: &std::io::Error) -> AttachmentRejection {
    AttachmentRejection::Unreadable {
        name: name.to_string(),
        reason: err.to_string(),
    }
}

/// `image/jpg` is accepted on input but is not a registered type.
fn canonical_media_type(media_type: String) -> String {
    if media_type == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        media_type
    }
}

fn check_size(name: &str, size: u64) -> Result<(), AttachmentRejection> {
    if size > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentRejection::TooLarge {
            name: name.to_string(),
            size,
            limit: MAX_ATTACHMENT_BYTES,
        });
    }
    Ok(())
}

/// Guess a media type from a file extension (pdf, docx, txt, png, jpg, jpeg).
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "docx" => Some(DOCX_MEDIA_TYPE),
        "txt" => Some("text/plain"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}
