//! End-to-end tests for the output pipeline: chunked title filtering,
//! detector status flow, and prune offsets against a real recording file.

use ptycast_core::{
    scan_line_for_prune_point, ActivityTracker, ActivityTrackerConfig, DetectorRegistry,
    NoLineage, PromptClassifier,
};
use ptycast_types::RecordedEvent;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn make_tracker(argv: &[&str], config: ActivityTrackerConfig) -> ActivityTracker {
    let registry = DetectorRegistry::with_defaults();
    ActivityTracker::new(
        Uuid::new_v4(),
        &argv.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        &registry,
        &NoLineage,
        Arc::new(PromptClassifier::new()),
        config,
    )
}

#[test]
fn title_sequence_split_across_chunks_never_leaks() {
    let mut tracker = make_tracker(&["bash"], ActivityTrackerConfig::default());

    // An OSC title sequence arrives split over three PTY reads.
    let chunks = ["build ok \x1b]2;dev@box: ~/w", "ork\x07 tests ok", "\ndone\n"];
    let mut forwarded = String::new();
    for chunk in chunks {
        forwarded.push_str(&tracker.process_output(chunk).data);
    }
    forwarded.push_str(&tracker.finish());

    assert_eq!(forwarded, "build ok  tests ok\ndone\n");
    assert!(!forwarded.contains('\x1b'));
}

#[test]
fn detector_status_then_turn_completed() {
    let config = ActivityTrackerConfig {
        activity_timeout: Duration::from_millis(50),
        status_timeout: Duration::from_millis(50),
        min_activity_len: 5,
    };
    let mut tracker = make_tracker(&["claude", "--continue"], config);

    let completions = Arc::new(AtomicUsize::new(0));
    {
        let completions = completions.clone();
        tracker.on_turn_completed(Box::new(move |_| {
            completions.fetch_add(1, Ordering::SeqCst);
        }));
    }

    // The banner is consumed, surfaced as a status, and the session is active.
    let out = tracker.process_output("✻ Deliberating… (17s · ↑ 2.4k tokens · esc to interrupt)\n");
    assert_eq!(out.data, "");
    assert!(out.state.is_active);
    assert_eq!(
        out.state.specific_status.as_ref().map(|s| s.status.as_str()),
        Some("Deliberating (17s, ↑2.4k)")
    );

    // Once the status stops refreshing, the turn completes exactly once.
    std::thread::sleep(Duration::from_millis(80));
    let state = tracker.activity_state();
    assert!(state.specific_status.is_none());
    tracker.activity_state();
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

#[test]
fn prune_offset_is_exact_against_a_recording_on_disk() {
    // A session where the app clears the screen mid-recording.
    let events = vec![
        RecordedEvent::output(0.0, "login banner\r\n"),
        RecordedEvent::output(1.2, "scrolling output with ✻ glyphs\r\n"),
        RecordedEvent::output(2.4, "more text \x1b[H\x1b[2J fresh screen"),
        RecordedEvent::output(3.1, "post-clear content\r\n"),
    ];

    let mut file = tempfile::NamedTempFile::new().unwrap();
    let mut lines = Vec::new();
    let mut cursor = 0u64;
    for event in &events {
        let line = serde_json::to_string(event).unwrap();
        writeln!(file, "{line}").unwrap();
        lines.push((cursor, line.clone()));
        cursor += line.len() as u64 + 1;
    }
    file.flush().unwrap();

    // Rescan every stored line; only the clearing event yields an offset.
    let mut prune_offset = None;
    for (start, line) in &lines {
        if let Some(offset) = scan_line_for_prune_point(*start, line) {
            prune_offset = Some(offset);
        }
    }
    let offset = prune_offset.unwrap() as usize;

    // The byte before the offset is the end of the escaped clear sequence,
    // and everything after it is still valid file content.
    let contents = std::fs::read(file.path()).unwrap();
    let head = std::str::from_utf8(&contents[..offset]).unwrap();
    assert!(head.ends_with("\\u001b[H\\u001b[2J"));
    let tail = std::str::from_utf8(&contents[offset..]).unwrap();
    assert!(tail.starts_with(" fresh screen"));

    // The tail of the clearing line still closes its JSON string, so a
    // reader that keeps the offset can reconstruct a valid line.
    let (line3_start, line3) = &lines[2];
    let rebuilt_suffix = &line3[(offset - *line3_start as usize)..];
    assert!(rebuilt_suffix.ends_with("\"]"));
}
