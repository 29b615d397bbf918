//! Per-session activity tracking and turn-completed signaling.
//!
//! One tracker per PTY session. Every output chunk flows through
//! `process_output`, which title-filters it, decides whether it counts as
//! activity, and runs the bound app detector. `activity_state` is the
//! single place where stale statuses are evicted and the turn-completed
//! check runs; hosts poll it periodically even when no output arrives.

use crate::detector::{AppDetector, DetectorRegistry, ProcessLineage};
use crate::prompt::PromptClassifier;
use crate::title_filter::TitleSequenceFilter;
use ptycast_types::{ActivityState, AppStatus};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Fired once per status episode when a fresh status goes stale: the app
/// finished its in-progress action and control is back with the user.
pub type TurnCompletedCallback = Box<dyn Fn(Uuid) + Send + Sync>;

/// Tunables for the activity state machine.
#[derive(Debug, Clone)]
pub struct ActivityTrackerConfig {
    /// A session is Active while output was seen within this window.
    pub activity_timeout: Duration,
    /// A detector status is cleared after this long without a refresh.
    pub status_timeout: Duration,
    /// Trimmed chunks at or below this length never count as activity.
    pub min_activity_len: usize,
}

impl Default for ActivityTrackerConfig {
    fn default() -> Self {
        Self {
            activity_timeout: Duration::from_secs(5),
            status_timeout: Duration::from_secs(10),
            min_activity_len: 5,
        }
    }
}

/// Output of one `process_output` call.
#[derive(Debug, Clone)]
pub struct ProcessedOutput {
    /// The chunk to forward to transport and recorder (title sequences
    /// removed, status banner excised when a detector matched).
    pub data: String,
    /// Activity snapshot after this chunk.
    pub state: ActivityState,
}

/// A detector status plus when it was recorded.
struct CurrentStatus {
    app: String,
    status: String,
    recorded_at: Instant,
}

/// Per-session activity state machine.
pub struct ActivityTracker {
    session_id: Uuid,
    config: ActivityTrackerConfig,
    title_filter: TitleSequenceFilter,
    classifier: Arc<PromptClassifier>,
    detector: Option<Arc<dyn AppDetector>>,
    /// Epoch milliseconds of the last meaningful output; monotonically
    /// non-decreasing for the tracker's lifetime.
    last_activity_time: u64,
    last_activity_instant: Option<Instant>,
    status: Option<CurrentStatus>,
    turn_callback: Option<TurnCompletedCallback>,
}

impl ActivityTracker {
    /// Create a tracker for a session, binding at most one detector from
    /// the registry against the launch argv (with lineage fallback).
    pub fn new(
        session_id: Uuid,
        argv: &[String],
        registry: &DetectorRegistry,
        lineage: &dyn ProcessLineage,
        classifier: Arc<PromptClassifier>,
        config: ActivityTrackerConfig,
    ) -> Self {
        let detector = registry.bind(argv, lineage);
        match &detector {
            Some(d) => info!(
                target: "ptycast::activity",
                session = %session_id,
                detector = d.name(),
                "Tracker created with detector"
            ),
            None => debug!(
                target: "ptycast::activity",
                session = %session_id,
                "Tracker created without detector"
            ),
        }

        Self {
            session_id,
            config,
            title_filter: TitleSequenceFilter::new(),
            classifier,
            detector,
            last_activity_time: 0,
            last_activity_instant: None,
            status: None,
            turn_callback: None,
        }
    }

    /// Register the one-shot turn-completed callback.
    pub fn on_turn_completed(&mut self, callback: TurnCompletedCallback) {
        self.turn_callback = Some(callback);
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Name of the bound detector, if any.
    pub fn detector_name(&self) -> Option<&str> {
        self.detector.as_deref().map(|d| d.name())
    }

    /// Process one output chunk, in order, single stream.
    pub fn process_output(&mut self, chunk: &str) -> ProcessedOutput {
        let filtered = self.title_filter.filter(chunk);

        // Generic activity: meaningful length and not a bare prompt redraw.
        let trimmed = filtered.trim();
        if trimmed.chars().count() > self.config.min_activity_len
            && !self.classifier.is_prompt_only(trimmed)
        {
            self.bump_activity();
        }

        // App-specific status short-circuits generic handling.
        if let Some(detector) = self.detector.clone() {
            match detector.parse_status(&filtered) {
                Ok(Some(record)) => {
                    self.bump_activity();
                    self.status = Some(CurrentStatus {
                        app: detector.name().to_string(),
                        status: record.display_text.clone(),
                        recorded_at: Instant::now(),
                    });
                    debug!(
                        target: "ptycast::activity",
                        session = %self.session_id,
                        status = %record.display_text,
                        "Recorded app status"
                    );
                    return ProcessedOutput {
                        data: record.filtered_data,
                        state: self.activity_state(),
                    };
                }
                Ok(None) => {}
                Err(e) => {
                    // A broken detector must never take the stream down.
                    warn!(
                        target: "ptycast::activity",
                        session = %self.session_id,
                        error = %e,
                        "Detector parse failed, treating as no match"
                    );
                }
            }
        }

        ProcessedOutput {
            data: filtered,
            state: self.activity_state(),
        }
    }

    /// Current activity snapshot. Evicts a stale status and fires the
    /// turn-completed callback; call periodically even without new output.
    pub fn activity_state(&mut self) -> ActivityState {
        self.evict_stale_status();

        let is_active = self
            .last_activity_instant
            .map(|t| t.elapsed() < self.config.activity_timeout)
            .unwrap_or(false);

        ActivityState {
            is_active,
            last_activity_time: self.last_activity_time,
            specific_status: self.status.as_ref().map(|s| AppStatus {
                app: s.app.clone(),
                status: s.status.clone(),
            }),
        }
    }

    /// Release any partial title sequence still buffered. Call at session
    /// end before closing the stream.
    pub fn finish(&mut self) -> String {
        self.title_filter.flush()
    }

    fn bump_activity(&mut self) {
        self.last_activity_time = self.last_activity_time.max(now_ms());
        self.last_activity_instant = Some(Instant::now());
    }

    fn evict_stale_status(&mut self) {
        let stale = self
            .status
            .as_ref()
            .map(|s| s.recorded_at.elapsed() > self.config.status_timeout)
            .unwrap_or(false);
        if !stale {
            return;
        }

        let status = self.status.take();
        info!(
            target: "ptycast::activity",
            session = %self.session_id,
            status = status.as_ref().map(|s| s.status.as_str()).unwrap_or(""),
            "Status went stale, turn completed"
        );

        if self.detector.is_some() {
            if let Some(callback) = &self.turn_callback {
                callback(self.session_id);
            }
        }
    }
}

/// Current timestamp in milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
