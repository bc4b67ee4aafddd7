//! Caller-visible outcome of a blocking ask/report call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, RelayError};
use crate::protocol::content::{validate_all, ContentItem};

/// `{is_error, meta, contents}`: every outcome, success or failure, takes
/// this shape so the RPC boundary never sees a transport fault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResult {
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    #[serde(default)]
    pub contents: Vec<ContentItem>,
}

impl CallResult {
    pub fn success(meta: BTreeMap<String, String>, contents: Vec<ContentItem>) -> Self {
        Self {
            is_error: false,
            meta,
            contents,
        }
    }

    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        let mut meta = BTreeMap::new();
        meta.insert("error".to_string(), code.as_str().to_string());
        meta.insert("message".to_string(), message.into());
        Self {
            is_error: true,
            meta,
            contents: Vec::new(),
        }
    }

    pub fn from_error(err: &RelayError) -> Self {
        Self::failure(err.code(), err.to_string())
    }

    /// `meta["error"]`, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.meta.get("error").map(String::as_str)
    }

    /// Replace a non-error result whose contents fail validation with an
    /// `invalid_content` failure. Error results pass through untouched.
    pub fn validated(self) -> Self {
        if self.is_error {
            return self;
        }
        match validate_all(&self.contents) {
            Ok(()) => self,
            Err(e) => Self::from_error(&e),
        }
    }
}
