use serde::Serialize;

pub const STARTING_MESSAGE: &str = "Starting to load data...";

/// Lifecycle of one load session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Complete,
    Error,
}

/// UI-facing snapshot of a load session.
///
/// Only [`crate::LoadTracker`] mutates this; everyone else reads snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LoadProgressState {
    pub phase: LoadPhase,
    pub is_loading: bool,
    pub loaded_count: usize,
    /// Zero until the payload has been parsed.
    pub total_count: usize,
    /// 1-based index of the last appended chunk, 0 before the first one.
    pub current_chunk_index: usize,
    pub status_message: String,
    pub last_error: Option<String>,
}

impl LoadProgressState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn percentage(&self) -> u8 {
        percentage(self.loaded_count, self.total_count)
    }

    pub(crate) fn start(&mut self) {
        *self = Self {
            phase: LoadPhase::Loading,
            is_loading: true,
            status_message: STARTING_MESSAGE.to_string(),
            ..Self::default()
        };
    }

    pub(crate) fn record_chunk(&mut self, loaded: usize, total: usize, chunk_index: usize) {
        self.loaded_count = loaded;
        self.total_count = total;
        self.current_chunk_index = chunk_index;
        self.status_message = format_progress(loaded, total, chunk_index);
    }

    pub(crate) fn record_total(&mut self, total: usize) {
        self.total_count = total;
    }

    pub(crate) fn complete(&mut self, total: usize, duration_ms: f64) {
        self.phase = LoadPhase::Complete;
        self.is_loading = false;
        self.loaded_count = total;
        self.total_count = total;
        self.status_message = format_completion(total, duration_ms);
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.phase = LoadPhase::Error;
        self.is_loading = false;
        self.status_message = format!("Error: {message}");
        self.last_error = Some(message);
    }
}

/// Share of `loaded` in `total`, rounded to a whole percent in `0..=100`.
///
/// An unknown or empty total reads as 0%.
pub fn percentage(loaded: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (loaded as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Single-line status for an in-flight load.
pub fn format_progress(loaded: usize, total: usize, chunk_index: usize) -> String {
    format!(
        "Loading chunk {chunk_index}: {loaded}/{total} features ({}%)",
        percentage(loaded, total)
    )
}

pub fn format_completion(total: usize, duration_ms: f64) -> String {
    format!("Completed! Loaded {total} features in {duration_ms:.0}ms")
}
