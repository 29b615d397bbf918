//! Title-sequence filtering with cross-chunk carry.
//!
//! Terminal applications set the window/tab title with OSC 0/1/2 sequences.
//! Forwarded output must not carry them (the host injects its own titles),
//! but chunk boundaries are arbitrary: a sequence may start in one chunk and
//! terminate several chunks later, or never. Complete sequences are removed;
//! a dangling prefix at the end of a chunk is held back and prepended to the
//! next call.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Default cap on the carry buffer. A stream that emits an unterminated
/// title prefix forever would otherwise grow it without bound; on overflow
/// the carry is flushed through unfiltered.
pub const DEFAULT_CARRY_LIMIT: usize = 4096;

/// A complete title sequence: ESC ] 0|1|2 ; payload, BEL or ST terminated.
static TITLE_SEQUENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\][012];[^\x07\x1b]*(?:\x07|\x1b\\)").unwrap()
});

/// A dangling suffix that could still become a title sequence: anything from
/// a bare ESC up to an unterminated payload, including a trailing ESC that
/// may be the first half of a split ST terminator.
static TITLE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b(?:\](?:[012](?:;[^\x07\x1b]*\x1b?)?)?)?$").unwrap()
});

/// Stateful stream filter removing title-setting sequences.
///
/// One instance per output stream; `filter` must be called once per chunk,
/// in order.
#[derive(Debug, Default)]
pub struct TitleSequenceFilter {
    carry: String,
}

impl TitleSequenceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one chunk, returning the bytes safe to emit now.
    pub fn filter(&mut self, chunk: &str) -> String {
        let input = if self.carry.is_empty() {
            chunk.to_string()
        } else {
            let mut s = std::mem::take(&mut self.carry);
            s.push_str(chunk);
            s
        };

        let cleaned = TITLE_SEQUENCE.replace_all(&input, "");

        match TITLE_PREFIX.find(&cleaned) {
            Some(m) => {
                let mut out = cleaned[..m.start()].to_string();
                let partial = &cleaned[m.start()..];
                if partial.len() > DEFAULT_CARRY_LIMIT {
                    warn!(
                        target: "ptycast::title",
                        len = partial.len(),
                        "Unterminated title sequence exceeded carry limit, flushing unfiltered"
                    );
                    out.push_str(partial);
                } else {
                    self.carry.push_str(partial);
                }
                out
            }
            None => cleaned.into_owned(),
        }
    }

    /// Emit whatever is still held back. Call at stream end so a dangling
    /// prefix that never completed is not lost.
    pub fn flush(&mut self) -> String {
        std::mem::take(&mut self.carry)
    }

    /// Bytes currently held back waiting for a terminator.
    pub fn pending(&self) -> &str {
        &self.carry
    }
}
