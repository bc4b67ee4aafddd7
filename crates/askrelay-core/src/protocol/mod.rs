//! Protocol modules.
//!
//! - `envelope`: the tagged union carried on the persistent peer connection.
//! - `frame`: header-first decoding that tolerates unknown tags.
//! - `content`: reply content items and their validation.
//! - `result`: the `{is_error, meta, contents}` shape returned to callers.
//!
//! All decoders are panic-free: malformed input is reported as `RelayError`.

pub mod content;
pub mod envelope;
pub mod frame;
pub mod result;

pub use content::ContentItem;
pub use envelope::{Envelope, Prompt, Verb};
pub use frame::Decoded;
pub use result::CallResult;
