//! App status detectors.
//!
//! Some terminal applications publish an in-band status line (a "banner")
//! in their output. A detector recognizes one application's protocol:
//! `detect` decides once per session, from the launch argv, whether the
//! app is present; `parse_status` is evaluated per chunk and, on a match,
//! yields a compact display string plus the chunk with the banner excised.

use crate::ansi::{strip_ansi_codes, stripped_to_original_index};
use crate::error::PtycastError;
use crate::Result;
use once_cell::sync::Lazy;
use ptycast_types::{StatusFields, StatusRecord};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

/// A detector for one application's in-band status protocol.
pub trait AppDetector: Send + Sync {
    /// Stable registry name (e.g. "claude").
    fn name(&self) -> &str;

    /// Whether this launch command runs the app. Evaluated once per session.
    fn detect(&self, argv: &[String]) -> bool;

    /// Parse one output chunk. `Ok(None)` means the chunk does not look
    /// like a status line; `Err` means it looked like one but failed strict
    /// parsing (kept distinguishable for diagnostics).
    fn parse_status(&self, chunk: &str) -> Result<Option<StatusRecord>>;
}

/// Best-effort view of the live process tree under a session's PTY child.
///
/// Wrapped or aliased invocations (`npx`, shell functions) hide the real
/// app from argv; inspecting the spawned process's descendants can still
/// find it. Inherently racy, since a process may exit mid-walk, so results are
/// advisory only.
pub trait ProcessLineage: Send + Sync {
    /// Command lines of the session's process and its descendants.
    fn command_lines(&self) -> Vec<String>;
}

/// The pure-argv default: no OS introspection available.
#[derive(Debug, Default)]
pub struct NoLineage;

impl ProcessLineage for NoLineage {
    fn command_lines(&self) -> Vec<String> {
        Vec::new()
    }
}

/// procfs-backed lineage walker.
#[cfg(target_os = "linux")]
#[derive(Debug)]
pub struct ProcLineage {
    root_pid: u32,
}

#[cfg(target_os = "linux")]
impl ProcLineage {
    /// Walk at most this many processes per inspection.
    const MAX_VISITS: usize = 64;

    pub fn new(root_pid: u32) -> Self {
        Self { root_pid }
    }
}

#[cfg(target_os = "linux")]
impl ProcessLineage for ProcLineage {
    fn command_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut queue = vec![self.root_pid];
        let mut visited = 0usize;

        while let Some(pid) = queue.pop() {
            visited += 1;
            if visited > Self::MAX_VISITS {
                break;
            }

            if let Ok(raw) = std::fs::read(format!("/proc/{pid}/cmdline")) {
                let cmdline = raw
                    .split(|&b| b == 0)
                    .filter(|part| !part.is_empty())
                    .map(|part| String::from_utf8_lossy(part).into_owned())
                    .collect::<Vec<_>>()
                    .join(" ");
                if !cmdline.is_empty() {
                    lines.push(cmdline);
                }
            }

            let children_path = format!("/proc/{pid}/task/{pid}/children");
            if let Ok(children) = std::fs::read_to_string(children_path) {
                for child in children.split_whitespace() {
                    if let Ok(child_pid) = child.parse::<u32>() {
                        queue.push(child_pid);
                    }
                }
            }
        }

        lines
    }
}

/// Ordered set of registered detectors.
///
/// Owned by the session manager and injected at tracker construction; no
/// global registry. `register` replaces a same-named detector in place or
/// appends a new one, and `bind` picks the first match by registration
/// order.
#[derive(Default)]
pub struct DetectorRegistry {
    detectors: Vec<Arc<dyn AppDetector>>,
}

impl DetectorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in detectors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ClaudeDetector::new()));
        registry
    }

    /// Add a detector, replacing any existing one with the same name.
    pub fn register(&mut self, detector: Arc<dyn AppDetector>) {
        if let Some(existing) = self
            .detectors
            .iter_mut()
            .find(|d| d.name() == detector.name())
        {
            info!(target: "ptycast::status", name = detector.name(), "Replacing detector");
            *existing = detector;
        } else {
            debug!(target: "ptycast::status", name = detector.name(), "Registered detector");
            self.detectors.push(detector);
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Choose at most one detector for a session: first registration-order
    /// match against argv, then best-effort process lineage for wrapped
    /// invocations.
    pub fn bind(
        &self,
        argv: &[String],
        lineage: &dyn ProcessLineage,
    ) -> Option<Arc<dyn AppDetector>> {
        if let Some(detector) = self.detectors.iter().find(|d| d.detect(argv)) {
            debug!(
                target: "ptycast::status",
                name = detector.name(),
                "Bound detector from argv"
            );
            return Some(detector.clone());
        }

        let lineage_lines = lineage.command_lines();
        for line in &lineage_lines {
            let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if let Some(detector) = self.detectors.iter().find(|d| d.detect(&tokens)) {
                debug!(
                    target: "ptycast::status",
                    name = detector.name(),
                    command = %line,
                    "Bound detector from process lineage"
                );
                return Some(detector.clone());
            }
        }

        None
    }
}

/// Marker phrase that terminates the Claude status banner.
const CLAUDE_STATUS_MARKER: &str = "esc to interrupt";

/// The Claude CLI status banner, matched against ANSI-stripped text:
/// indicator glyph, action verb, duration, optional token progress, ending
/// in the marker phrase. Example:
/// `✻ Crafting… (205s · ↑ 6.0k tokens · esc to interrupt)`
static CLAUDE_STATUS_BANNER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"([✢✳✶✻✽✺·\*\+])\s*",                            // indicator glyph
        r"([A-Z][A-Za-z]+)(?:…|\.{3})?\s*",               // action verb
        r"\((\d+)s",                                      // duration in seconds
        r"(?:\s*[·•]\s*([↑↓⚒])\s*([0-9.]+)k?\s*tokens)?", // optional progress
        r"[^)\n]*esc to interrupt\)",                     // marker phrase
    ))
    .unwrap()
});

/// Detector for the Claude CLI's in-band status banner.
#[derive(Debug, Default)]
pub struct ClaudeDetector;

impl ClaudeDetector {
    pub fn new() -> Self {
        Self
    }
}

impl AppDetector for ClaudeDetector {
    fn name(&self) -> &str {
        "claude"
    }

    fn detect(&self, argv: &[String]) -> bool {
        argv.iter().any(|arg| {
            let basename = arg.rsplit('/').next().unwrap_or(arg);
            basename.to_lowercase().starts_with("claude")
        })
    }

    fn parse_status(&self, chunk: &str) -> Result<Option<StatusRecord>> {
        let stripped = strip_ansi_codes(chunk);
        if !stripped.contains(CLAUDE_STATUS_MARKER) {
            return Ok(None);
        }

        let caps = CLAUDE_STATUS_BANNER.captures(&stripped).ok_or_else(|| {
            PtycastError::StatusParse {
                detector: self.name().to_string(),
                reason: "marker phrase present but banner grammar did not match".to_string(),
            }
        })?;

        let banner_start = caps.get(0).map_or(0, |m| m.start());
        let indicator = caps.get(1).map(|m| m.as_str().to_string());
        let action = caps.get(2).map(|m| m.as_str().to_string());
        let duration_secs: u64 =
            caps.get(3)
                .and_then(|m| m.as_str().parse().ok())
                .ok_or_else(|| PtycastError::StatusParse {
                    detector: self.name().to_string(),
                    reason: "duration is not a valid integer".to_string(),
                })?;
        let progress = match (caps.get(4), caps.get(5)) {
            (Some(dir), Some(count)) => Some(format!("{}{}k", dir.as_str(), count.as_str())),
            _ => None,
        };

        let action_text = action.as_deref().unwrap_or("Working");
        let display_text = match &progress {
            Some(p) => format!("{action_text} ({duration_secs}s, {p})"),
            None => format!("{action_text} ({duration_secs}s)"),
        };

        let filtered_data = excise_containing_line(chunk, banner_start);

        debug!(
            target: "ptycast::status",
            display = %display_text,
            "Matched Claude status banner"
        );

        Ok(Some(StatusRecord {
            filtered_data,
            display_text,
            raw: StatusFields {
                indicator,
                action,
                duration_secs: Some(duration_secs),
                progress,
            },
        }))
    }
}

/// Remove the line of `original` containing the character whose ANSI-stripped
/// byte offset is `stripped_start`. Falls back to returning the original
/// untouched if the offset cannot be translated.
fn excise_containing_line(original: &str, stripped_start: usize) -> String {
    let Some(orig_idx) = stripped_to_original_index(original, stripped_start) else {
        return original.to_string();
    };
    let orig_idx = orig_idx.min(original.len());

    let line_start = original[..orig_idx].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = original[orig_idx..]
        .find('\n')
        .map(|i| orig_idx + i + 1) // include the newline
        .unwrap_or(original.len());

    let mut out = String::with_capacity(original.len() - (line_end - line_start));
    out.push_str(&original[..line_start]);
    out.push_str(&original[line_end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_from_argv() {
        let d = ClaudeDetector::new();
        assert!(d.detect(&argv(&["claude"])));
        assert!(d.detect(&argv(&["/usr/local/bin/claude", "--continue"])));
        assert!(d.detect(&argv(&["npx", "claude-code"])));
        assert!(!d.detect(&argv(&["bash", "-l"])));
        assert!(!d.detect(&argv(&["vim", "notes.md"])));
    }

    #[test]
    fn test_parse_full_banner() {
        let d = ClaudeDetector::new();
        let chunk = "output above\n✻ Crafting… (205s · ↑ 6.0k tokens · esc to interrupt)\nbelow\n";
        let record = d.parse_status(chunk).unwrap().unwrap();

        assert_eq!(record.display_text, "Crafting (205s, ↑6.0k)");
        assert_eq!(record.filtered_data, "output above\nbelow\n");
        assert_eq!(record.raw.indicator.as_deref(), Some("✻"));
        assert_eq!(record.raw.action.as_deref(), Some("Crafting"));
        assert_eq!(record.raw.duration_secs, Some(205));
        assert_eq!(record.raw.progress.as_deref(), Some("↑6.0k"));
    }

    #[test]
    fn test_parse_banner_without_progress() {
        let d = ClaudeDetector::new();
        let chunk = "✢ Thinking… (3s · esc to interrupt)";
        let record = d.parse_status(chunk).unwrap().unwrap();

        assert_eq!(record.display_text, "Thinking (3s)");
        assert_eq!(record.filtered_data, "");
        assert_eq!(record.raw.progress, None);
    }

    #[test]
    fn test_parse_banner_with_ansi_codes() {
        let d = ClaudeDetector::new();
        let chunk =
            "keep\n\x1b[2m✻ Churning… (12s · ↓ 1.2k tokens · esc to interrupt)\x1b[0m\nrest";
        let record = d.parse_status(chunk).unwrap().unwrap();

        assert_eq!(record.display_text, "Churning (12s, ↓1.2k)");
        assert_eq!(record.filtered_data, "keep\nrest");
    }

    #[test]
    fn test_ordinary_output_is_no_match() {
        let d = ClaudeDetector::new();
        assert!(d.parse_status("plain build output\n").unwrap().is_none());
        assert!(d.parse_status("").unwrap().is_none());
    }

    #[test]
    fn test_marker_without_grammar_is_parse_error() {
        let d = ClaudeDetector::new();
        let err = d
            .parse_status("press esc to interrupt the download")
            .unwrap_err();
        assert!(matches!(err, PtycastError::StatusParse { .. }));
    }

    #[test]
    fn test_registry_register_replaces_by_name() {
        struct Dummy(&'static str);
        impl AppDetector for Dummy {
            fn name(&self) -> &str {
                "claude"
            }
            fn detect(&self, _argv: &[String]) -> bool {
                false
            }
            fn parse_status(&self, _chunk: &str) -> Result<Option<StatusRecord>> {
                Ok(None)
            }
        }

        let mut registry = DetectorRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["claude"]);
        registry.register(Arc::new(Dummy("replacement")));
        assert_eq!(registry.names(), vec!["claude"]);
        // The replacement no longer detects anything.
        assert!(registry.bind(&argv(&["claude"]), &NoLineage).is_none());
    }

    #[test]
    fn test_bind_via_lineage_fallback() {
        struct FakeLineage;
        impl ProcessLineage for FakeLineage {
            fn command_lines(&self) -> Vec<String> {
                vec![
                    "/bin/zsh -il".to_string(),
                    "node /home/dev/.npm/bin/claude".to_string(),
                ]
            }
        }

        let registry = DetectorRegistry::with_defaults();
        // argv alone (a wrapper script) does not match...
        assert!(registry.bind(&argv(&["./run-agent.sh"]), &NoLineage).is_none());
        // ...but the live process tree does.
        let bound = registry.bind(&argv(&["./run-agent.sh"]), &FakeLineage).unwrap();
        assert_eq!(bound.name(), "claude");
    }
}
