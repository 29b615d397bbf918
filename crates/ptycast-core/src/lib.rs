//! Terminal output processing pipeline for Ptycast.

mod activity;
mod ansi;
mod cache;
mod detector;
mod error;
pub mod logging;
mod prompt;
mod prune;
mod title_filter;

pub use activity::{
    ActivityTracker, ActivityTrackerConfig, ProcessedOutput, TurnCompletedCallback,
};
pub use ansi::{strip_ansi_codes, stripped_to_original_index};
pub use cache::BoundedCache;
pub use detector::{
    AppDetector, ClaudeDetector, DetectorRegistry, NoLineage, ProcessLineage,
};
pub use error::PtycastError;
pub use prompt::{PromptClassifier, DEFAULT_CACHE_CAPACITY};
pub use prune::{
    byte_position_from_cursor, detect_last, find_last_prune_point, scan_line_for_prune_point,
    sequence_byte_position, DestructiveSequence, PruneMatch,
};
pub use title_filter::{TitleSequenceFilter, DEFAULT_CARRY_LIMIT};

#[cfg(target_os = "linux")]
pub use detector::ProcLineage;

/// Result type for Ptycast operations.
pub type Result<T> = std::result::Result<T, PtycastError>;
