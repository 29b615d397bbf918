//! ANSI escape sequence stripping and offset translation.
//!
//! Detectors pattern-match against ANSI-stripped text, but must excise what
//! they matched from the original data with its escape codes intact. The
//! offset translation here walks the ANSI spans to map a position in the
//! stripped text back to the corresponding position in the original.

use once_cell::sync::Lazy;
use regex::Regex;

/// Comprehensive regex for ANSI escape sequences.
/// Matches:
/// - CSI sequences: ESC [ ... letter (colors, cursor, etc.)
/// - OSC sequences: ESC ] ... BEL or ESC \ (window title, etc.)
/// - Character set: ESC ( or ESC ) followed by character
/// - Other escapes: ESC = ESC > ESC M etc.
static ANSI_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\x1b\[[0-9;?]*[A-Za-z]",    // CSI sequences (colors, cursor, etc.)
        r"|\x1b\][^\x07]*\x07",       // OSC sequences ending with BEL
        r"|\x1b\][^\x1b]*\x1b\\",     // OSC sequences ending with ST
        r"|\x1b[()][A-Z0-9]",         // Character set selection
        r"|\x1b[=>MNOP78]",           // Other single-char escapes
        r"|\x1b",                     // Catch any remaining bare ESC
    ))
    .unwrap()
});

/// Strip ANSI escape codes from text.
pub fn strip_ansi_codes(text: &str) -> String {
    ANSI_REGEX.replace_all(text, "").to_string()
}

/// Map a byte offset in `strip_ansi_codes(original)` back to the byte offset
/// of the same character in `original`.
///
/// An offset equal to the stripped length maps to `original.len()`. Offsets
/// past that return `None`.
pub fn stripped_to_original_index(original: &str, stripped_index: usize) -> Option<usize> {
    let mut cum = 0usize; // bytes of plain text seen so far
    let mut pos = 0usize; // cursor into original

    for m in ANSI_REGEX.find_iter(original) {
        let seg_len = m.start() - pos;
        if stripped_index < cum + seg_len {
            return Some(pos + (stripped_index - cum));
        }
        cum += seg_len;
        pos = m.end();
    }

    let seg_len = original.len() - pos;
    if stripped_index <= cum + seg_len {
        Some(pos + (stripped_index - cum))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_codes() {
        let input = "\x1b[32mHello\x1b[0m World";
        assert_eq!(strip_ansi_codes(input), "Hello World");
    }

    #[test]
    fn test_strip_osc_title() {
        let input = "\x1b]0;My Title\x07visible";
        assert_eq!(strip_ansi_codes(input), "visible");
    }

    #[test]
    fn test_map_identity_without_ansi() {
        let s = "plain text";
        for i in 0..=s.len() {
            assert_eq!(stripped_to_original_index(s, i), Some(i));
        }
    }

    #[test]
    fn test_map_skips_ansi_spans() {
        let original = "\x1b[32mHello\x1b[0m World";
        let stripped = strip_ansi_codes(original);
        assert_eq!(stripped, "Hello World");

        // 'H' is the first plain char, right after the 5-byte color code.
        assert_eq!(stripped_to_original_index(original, 0), Some(5));
        // 'W' sits after "Hello" plus the reset code.
        let w_stripped = stripped.find('W').unwrap();
        let w_original = original.find('W').unwrap();
        assert_eq!(stripped_to_original_index(original, w_stripped), Some(w_original));
    }

    #[test]
    fn test_map_end_of_string() {
        let original = "abc\x1b[0m";
        // Stripped length maps past any trailing codes to the end.
        assert_eq!(stripped_to_original_index(original, 3), Some(original.len()));
        assert_eq!(stripped_to_original_index(original, 4), None);
    }
}
