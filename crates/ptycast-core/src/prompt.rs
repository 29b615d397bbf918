//! Shell prompt classification.
//!
//! Distinguishes "the shell is waiting at a prompt" from ordinary output.
//! Used two ways: `is_prompt_only` keeps prompt redraws from counting as
//! session activity, and `ends_with_prompt` decides when it is safe to
//! (re-)inject a window title. Both are polled against slowly growing
//! buffers, so results are memoized in shared bounded caches.

use crate::ansi::strip_ansi_codes;
use crate::cache::BoundedCache;
use once_cell::sync::Lazy;
use ptycast_types::ShellKind;
use regex::Regex;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Default capacity for each classification cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Inputs longer than this (in characters) are rejected outright; upstream
/// chunking should already bound input size.
const MAX_CLASSIFY_LEN: usize = 10_000;

/// `ends_with_prompt` cache keys use only the input's tail.
const TAIL_KEY_CHARS: usize = 100;

/// A whole string that is exactly one prompt tail: optional bracketed tag,
/// one prompt glyph (or the PowerShell `PS ...>` form), optional trailing
/// color reset.
static PROMPT_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\[[^\]]*\]\s*)?(?:PS [^>]*>|[$#%>❯➜])(?:\x1b\[0?m)?$").unwrap()
});

/// The same grammar applied to the tail of an ANSI-stripped string.
static PROMPT_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\[[^\]]*\]\s*)?(?:PS [^>]*>|[$#%>❯➜])\s*$").unwrap()
});

/// PowerShell prompt shape on the last line.
static POWERSHELL_PROMPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"PS [^>]*>\s*$").unwrap());

/// Cached shell-prompt classifier.
///
/// The caches are the only process-wide shared mutable state in the
/// pipeline; share one instance across sessions behind an `Arc`.
#[derive(Debug)]
pub struct PromptClassifier {
    prompt_only: Mutex<BoundedCache<bool>>,
    ends_with: Mutex<BoundedCache<bool>>,
}

impl Default for PromptClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptClassifier {
    pub fn new() -> Self {
        Self::with_cache_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self {
            prompt_only: Mutex::new(BoundedCache::new(capacity)),
            ends_with: Mutex::new(BoundedCache::new(capacity)),
        }
    }

    /// True iff, after trimming, the whole string is exactly one prompt tail.
    ///
    /// A leading run of exactly two `.`/`>` characters disqualifies the
    /// match; other REPLs use `..`/`>>` runs as continuation markers.
    pub fn is_prompt_only(&self, s: &str) -> bool {
        // Char count never exceeds byte length, so short inputs skip the
        // full count.
        if s.len() > MAX_CLASSIFY_LEN {
            let char_count = s.chars().count();
            if char_count > MAX_CLASSIFY_LEN {
                warn!(
                    target: "ptycast::prompt",
                    chars = char_count,
                    "Rejecting oversized prompt classification input"
                );
                return false;
            }
        }

        let trimmed = s.trim();
        {
            let cache = self.prompt_only.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(trimmed) {
                return hit;
            }
        }

        let leading_marks = trimmed
            .chars()
            .take_while(|c| matches!(c, '.' | '>'))
            .count();
        let result = leading_marks != 2 && PROMPT_ONLY.is_match(trimmed);

        self.prompt_only
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(trimmed.to_string(), result);
        result
    }

    /// True iff the string's tail, after stripping ANSI codes, looks like a
    /// prompt. Keyed on the last 100 characters so repeated polling of a
    /// growing buffer stays cheap.
    pub fn ends_with_prompt(&self, s: &str) -> bool {
        let key = tail_chars(s, TAIL_KEY_CHARS).to_string();
        {
            let cache = self.ends_with.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(&key) {
                return hit;
            }
        }

        let stripped = strip_ansi_codes(&key);
        let result = PROMPT_TAIL.is_match(&stripped);

        self.ends_with
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, result);
        result
    }

    /// Map a known prompt shape to a shell label. REPL continuation markers
    /// are checked before the general glyph patterns so `>>>` is not
    /// swallowed by `>`.
    pub fn shell_kind(&self, s: &str) -> ShellKind {
        let stripped = strip_ansi_codes(s);
        let trimmed = stripped.trim_end();

        if trimmed.ends_with(">>>") || trimmed.ends_with("...") {
            return ShellKind::ReplContinuation;
        }
        if let Some(last_line) = trimmed.lines().last() {
            if POWERSHELL_PROMPT.is_match(last_line) {
                return ShellKind::PowerShell;
            }
        }
        match trimmed.chars().last() {
            Some('%') => ShellKind::Zsh,
            Some('#') => ShellKind::RootShell,
            Some('❯') | Some('➜') => ShellKind::ModernShell,
            Some('$') => ShellKind::PosixShell,
            _ => ShellKind::Unknown,
        }
    }
}

/// The last `n` characters of a string, on a char boundary.
fn tail_chars(s: &str, n: usize) -> &str {
    match s.char_indices().rev().nth(n.saturating_sub(1)) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
