//! Aggregated view over several trackers, one row per layer.

use std::collections::BTreeMap;

use tokio::sync::watch;

use crate::progress::LoadProgressState;

/// One line of the progress panel.
///
/// While loading: `"{layer}: {status} [Chunk N • P%]"`, the bracket only once a
/// chunk has landed. After a failure: `"{layer}: Error: {message}"`.
pub fn render_line(layer: &str, state: &LoadProgressState) -> String {
    if let Some(error) = &state.last_error {
        return format!("{layer}: Error: {error}");
    }
    if state.current_chunk_index > 0 {
        format!(
            "{layer}: {} [Chunk {} • {}%]",
            state.status_message,
            state.current_chunk_index,
            state.percentage()
        )
    } else {
        format!("{layer}: {}", state.status_message)
    }
}

#[derive(Debug, Default)]
pub struct LoadBoard {
    layers: BTreeMap<String, watch::Receiver<LoadProgressState>>,
}

impl LoadBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any receiver already registered under `layer`.
    pub fn register(
        &mut self,
        layer: impl Into<String>,
        progress: watch::Receiver<LoadProgressState>,
    ) {
        self.layers.insert(layer.into(), progress);
    }

    pub fn unregister(&mut self, layer: &str) -> bool {
        self.layers.remove(layer).is_some()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Current state of every layer, sorted by layer name.
    pub fn snapshots(&self) -> Vec<(String, LoadProgressState)> {
        self.layers
            .iter()
            .map(|(layer, rx)| (layer.clone(), rx.borrow().clone()))
            .collect()
    }

    /// Layers worth showing: still loading, or failed.
    pub fn visible(&self) -> Vec<(String, LoadProgressState)> {
        self.snapshots()
            .into_iter()
            .filter(|(_, s)| s.is_loading || s.last_error.is_some())
            .collect()
    }

    pub fn render(&self) -> Vec<String> {
        self.visible()
            .iter()
            .map(|(layer, state)| render_line(layer, state))
            .collect()
    }

    /// True once no registered layer is still loading.
    pub fn all_settled(&self) -> bool {
        self.layers.values().all(|rx| !rx.borrow().is_loading)
    }

    /// Whether any layer changed since the previous call. Marks all as seen.
    pub fn take_changed(&mut self) -> bool {
        let mut changed = false;
        for rx in self.layers.values_mut() {
            // Works after the tracker is dropped, so a final state is never missed.
            if rx.borrow_and_update().has_changed() {
                changed = true;
            }
        }
        changed
    }
}
