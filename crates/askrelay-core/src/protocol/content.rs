//! Reply content items (text / image / audio / embedded resource).
//!
//! Binary payloads travel as standard base64 strings and are only decoded on
//! demand. Validation is separate from decoding so a reply with a bad item
//! can be turned into an error result instead of being dropped with the
//! frame it arrived on.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

const IMAGE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/svg+xml",
    "image/tiff",
];

const AUDIO_MIME_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/wave",
    "audio/x-wav",
    "audio/ogg",
    "audio/webm",
    "audio/flac",
    "audio/aac",
    "audio/m4a",
    "audio/mp4",
];

/// One item of a human reply.
///
/// Decoding only checks the shape; every field a peer might get wrong is
/// defaulted and left to `validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        #[serde(default)]
        text: String,
    },
    Image {
        /// base64 (standard alphabet)
        #[serde(default)]
        data: String,
        #[serde(default)]
        mime_type: String,
    },
    Audio {
        /// base64 (standard alphabet)
        #[serde(default)]
        data: String,
        #[serde(default)]
        mime_type: String,
    },
    EmbeddedResource {
        #[serde(default)]
        uri: String,
        #[serde(default)]
        mime_type: String,
        /// base64 (standard alphabet), may be empty
        #[serde(default)]
        data: String,
    },
    /// Any `type` outside the set above. Never valid.
    #[serde(other)]
    Unsupported,
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }

    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Result<Self> {
        let item = ContentItem::Image {
            data: data.into(),
            mime_type: mime_type.into(),
        };
        item.validate()?;
        Ok(item)
    }

    pub fn audio(data: impl Into<String>, mime_type: impl Into<String>) -> Result<Self> {
        let item = ContentItem::Audio {
            data: data.into(),
            mime_type: mime_type.into(),
        };
        item.validate()?;
        Ok(item)
    }

    pub fn embedded_resource(
        uri: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl AsRef<[u8]>,
    ) -> Result<Self> {
        let item = ContentItem::EmbeddedResource {
            uri: uri.into(),
            mime_type: mime_type.into(),
            data: STANDARD.encode(data),
        };
        item.validate()?;
        Ok(item)
    }

    /// Short kind name, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentItem::Text { .. } => "text",
            ContentItem::Image { .. } => "image",
            ContentItem::Audio { .. } => "audio",
            ContentItem::EmbeddedResource { .. } => "embedded_resource",
            ContentItem::Unsupported => "unsupported",
        }
    }

    /// Decoded binary payload; `None` for text and unsupported items.
    pub fn decode_data(&self) -> Result<Option<Vec<u8>>> {
        let data = match self {
            ContentItem::Image { data, .. }
            | ContentItem::Audio { data, .. }
            | ContentItem::EmbeddedResource { data, .. } => data,
            ContentItem::Text { .. } | ContentItem::Unsupported => return Ok(None),
        };
        STANDARD
            .decode(data)
            .map(Some)
            .map_err(|e| RelayError::InvalidContent(format!("invalid base64 {} data: {e}", self.kind())))
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ContentItem::Text { .. } => Ok(()),
            ContentItem::Image { mime_type, .. } => {
                self.decode_data()?;
                check_mime(mime_type, IMAGE_MIME_TYPES, "image")
            }
            ContentItem::Audio { mime_type, .. } => {
                self.decode_data()?;
                check_mime(mime_type, AUDIO_MIME_TYPES, "audio")
            }
            ContentItem::EmbeddedResource { uri, .. } => {
                if uri.trim().is_empty() {
                    return Err(RelayError::InvalidContent(
                        "embedded resource URI cannot be empty".into(),
                    ));
                }
                self.decode_data().map(|_| ())
            }
            ContentItem::Unsupported => Err(RelayError::InvalidContent(
                "unsupported content type".into(),
            )),
        }
    }
}

/// Validate every item; the first failure wins.
pub fn validate_all(items: &[ContentItem]) -> Result<()> {
    items.iter().try_for_each(ContentItem::validate)
}

fn check_mime(mime_type: &str, allowed: &[&str], kind: &str) -> Result<()> {
    let lower = mime_type.to_ascii_lowercase();
    if allowed.contains(&lower.as_str()) {
        Ok(())
    } else {
        Err(RelayError::InvalidContent(format!(
            "invalid {kind} MIME type: {mime_type}"
        )))
    }
}

