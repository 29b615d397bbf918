//! Status records produced by app detectors.

use serde::{Deserialize, Serialize};

/// Raw sub-fields of a matched status banner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFields {
    /// Leading indicator glyph (e.g., "✻").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
    /// Action verb (e.g., "Crafting").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Elapsed duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    /// Direction glyph plus token count (e.g., "↑6.0k").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
}

/// Result of a detector matching its in-band status protocol in a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// The original chunk with the banner's containing line excised,
    /// ANSI codes intact everywhere else.
    pub filtered_data: String,
    /// Compact display string, e.g. "Crafting (205s, ↑6.0k)".
    pub display_text: String,
    /// Raw sub-fields for diagnostics and richer consumers.
    pub raw: StatusFields,
}
