//! Destructive-sequence detection and recording byte-offset math.
//!
//! When a program clears the screen or resets the terminal, everything
//! recorded before that point is irrelevant to replay. During compaction
//! the recorder rescans its stored `[time, channel, data]` lines; this
//! module finds the most recent destructive sequence and converts its
//! character position inside an event's `data` into an exact byte offset
//! in the serialized file, so the recording can be truncated safely.
//!
//! The byte math is escape-aware: offsets are computed against the
//! serde_json-escaped form of `data`, which is exactly what the writer put
//! on disk (see `RecordedEvent`).

use crate::Result;
use ptycast_types::{RecordedEvent, OUTPUT_CHANNEL};
use tracing::{debug, info};

/// A terminal sequence that invalidates previously visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructiveSequence {
    /// CSI 2J: erase the whole display.
    ClearScreen,
    /// CSI 3J: erase the scrollback.
    ClearScrollback,
    /// ESC c: full terminal reset (RIS).
    FullReset,
    /// CSI H CSI 2J: cursor home then clear.
    HomeAndClear,
    /// CSI H CSI 3J: cursor home then scrollback clear.
    HomeAndClearScrollback,
    /// CSI ?1049h: enter the alternate screen.
    AltScreenEnter,
    /// CSI ?1049l: leave the alternate screen.
    AltScreenExit,
    /// CSI ?47h: legacy alternate screen save.
    LegacyAltScreenSave,
    /// CSI ?47l: legacy alternate screen restore.
    LegacyAltScreenRestore,
}

impl DestructiveSequence {
    /// All sequences, in the fixed scan order.
    pub const ALL: [DestructiveSequence; 9] = [
        DestructiveSequence::ClearScreen,
        DestructiveSequence::ClearScrollback,
        DestructiveSequence::FullReset,
        DestructiveSequence::HomeAndClear,
        DestructiveSequence::HomeAndClearScrollback,
        DestructiveSequence::AltScreenEnter,
        DestructiveSequence::AltScreenExit,
        DestructiveSequence::LegacyAltScreenSave,
        DestructiveSequence::LegacyAltScreenRestore,
    ];

    /// The literal byte sequence.
    pub fn sequence(&self) -> &'static str {
        match self {
            DestructiveSequence::ClearScreen => "\x1b[2J",
            DestructiveSequence::ClearScrollback => "\x1b[3J",
            DestructiveSequence::FullReset => "\x1bc",
            DestructiveSequence::HomeAndClear => "\x1b[H\x1b[2J",
            DestructiveSequence::HomeAndClearScrollback => "\x1b[H\x1b[3J",
            DestructiveSequence::AltScreenEnter => "\x1b[?1049h",
            DestructiveSequence::AltScreenExit => "\x1b[?1049l",
            DestructiveSequence::LegacyAltScreenSave => "\x1b[?47h",
            DestructiveSequence::LegacyAltScreenRestore => "\x1b[?47l",
        }
    }

    /// The sequence with ESC rendered visibly, for logs.
    pub fn printable(&self) -> String {
        self.sequence().replace('\x1b', "ESC")
    }
}

/// A destructive sequence found in event data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneMatch {
    pub sequence: DestructiveSequence,
    /// Character index of the sequence start within the event's data.
    pub char_index: usize,
}

/// Find the destructive sequence with the greatest starting character
/// index; the most recent destructive event wins.
pub fn detect_last(data: &str) -> Option<PruneMatch> {
    let mut best: Option<(usize, DestructiveSequence)> = None;

    for seq in DestructiveSequence::ALL {
        if let Some(byte_idx) = data.rfind(seq.sequence()) {
            match best {
                Some((existing, _)) if existing >= byte_idx => {}
                _ => best = Some((byte_idx, seq)),
            }
        }
    }

    best.map(|(byte_idx, sequence)| PruneMatch {
        sequence,
        char_index: data[..byte_idx].chars().count(),
    })
}

/// The character index just after the last destructive sequence; content
/// before it is safely discardable.
pub fn find_last_prune_point(data: &str) -> Option<usize> {
    detect_last(data).map(|m| m.char_index + m.sequence.sequence().len())
}

/// Convert a character offset inside an event's `data` into a byte offset
/// in the serialized recording.
///
/// The line on disk is `[time,"o","<escaped data>"]\n`. The prefix through
/// the opening quote of the data field is recovered by serializing the
/// same event with empty data and dropping the closing `"]`; the data
/// contribution is the byte length of the escaped substring up to
/// `end_char_index`.
pub fn sequence_byte_position(
    line_start: u64,
    time: f64,
    data: &str,
    end_char_index: usize,
) -> Result<u64> {
    let probe = RecordedEvent {
        time,
        channel: OUTPUT_CHANNEL.to_string(),
        data: String::new(),
    };
    let prefix_len = serde_json::to_string(&probe)?.len() - 2; // drop `"]`

    let data_prefix: String = data.chars().take(end_char_index).collect();
    let escaped_len = serde_json::to_string(&data_prefix)?.len() - 2; // drop quotes

    Ok(line_start + prefix_len as u64 + escaped_len as u64)
}

/// Inverse companion: given the file cursor just after an already-written
/// line (serialized event plus trailing newline), recover the line start
/// and compute the byte offset for `end_char_index` within its data.
pub fn byte_position_from_cursor(
    cursor: u64,
    event: &RecordedEvent,
    end_char_index: usize,
) -> Result<u64> {
    let line_len = serde_json::to_string(event)?.len() as u64 + 1; // newline
    let line_start = cursor.saturating_sub(line_len);
    sequence_byte_position(line_start, event.time, &event.data, end_char_index)
}

/// Rescan one stored recording line for a prune point.
///
/// Returns the byte offset just after the most recent destructive sequence,
/// or `None` when the line is malformed, is not an output event, or
/// contains no destructive sequence. Malformed lines are logged at debug
/// level and never abort the scan.
pub fn scan_line_for_prune_point(line_start: u64, line: &str) -> Option<u64> {
    let event: RecordedEvent = match serde_json::from_str(line.trim_end_matches('\n')) {
        Ok(event) => event,
        Err(e) => {
            debug!(target: "ptycast::prune", error = %e, "Skipping malformed recorded line");
            return None;
        }
    };
    if event.channel != OUTPUT_CHANNEL {
        return None;
    }

    let matched = detect_last(&event.data)?;
    let end_char = matched.char_index + matched.sequence.sequence().len();
    match sequence_byte_position(line_start, event.time, &event.data, end_char) {
        Ok(offset) => {
            info!(
                target: "ptycast::prune",
                sequence = %matched.sequence.printable(),
                char_index = matched.char_index,
                byte_offset = offset,
                "Found prune point"
            );
            Some(offset)
        }
        Err(e) => {
            debug!(target: "ptycast::prune", error = %e, "Byte offset computation failed");
            None
        }
    }
}
