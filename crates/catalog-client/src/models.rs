//! Data models for the stack catalog API
//!
//! Full stack definitions are deliberately kept as raw `serde_json::Value`
//! trees: the controller only rewrites one nested field and otherwise must
//! preserve every sibling byte-for-byte on re-upload, so a typed schema
//! would only get in the way.

use serde::{Deserialize, Serialize};

/// Identity view of one catalog entry, as returned by `GET /api/stack`.
///
/// The catalog returns the full stack definition; everything beyond `id`
/// and `name` is ignored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackRef {
    /// Unique stack id assigned by the catalog
    pub id: String,
    /// Human-readable stack name (e.g. "java-default")
    pub name: String,
}
