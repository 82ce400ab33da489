use std::sync::Arc;

use formats::RecordParser;
use tokio::sync::watch;

use crate::error::LoadError;
use crate::loader::{BatchLoader, LoadConfig, LoadResult};
use crate::progress::LoadProgressState;
use crate::sink::FeatureSink;
use crate::transport::Transport;

/// Owns the progress state of one logical load target (typically one layer).
///
/// Every [`LoadTracker::load`] starts a fresh session: counters and the last
/// error are cleared before any asynchronous work begins. `load` borrows the
/// tracker mutably, so two sessions can never interleave their updates on the
/// same state. Not `Clone`: observers use [`LoadTracker::subscribe`].
#[derive(Debug)]
pub struct LoadTracker {
    state: Arc<watch::Sender<LoadProgressState>>,
}

impl Default for LoadTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LoadProgressState::idle());
        Self {
            state: Arc::new(tx),
        }
    }

    /// Read-only stream of state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<LoadProgressState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> LoadProgressState {
        self.state.borrow().clone()
    }

    /// Back to the idle shape, e.g. once a UI has dismissed a finished session.
    pub fn reset(&mut self) {
        self.state.send_replace(LoadProgressState::idle());
    }

    /// Runs `loader` while mirroring its progress into the tracked state.
    ///
    /// The caller's own callbacks in `config` still fire, after the state has
    /// been updated for the same event. Errors are recorded and returned.
    pub async fn load<T, P, S>(
        &mut self,
        loader: &BatchLoader<T, P>,
        url: &str,
        sink: &mut S,
        config: &LoadConfig,
    ) -> Result<LoadResult, LoadError>
    where
        T: Transport,
        P: RecordParser,
        S: FeatureSink + ?Sized,
    {
        self.state.send_modify(LoadProgressState::start);
        let observed = self.observe(config);

        match loader.load(url, sink, &observed).await {
            Ok(result) => {
                self.state
                    .send_modify(|s| s.complete(result.feature_count, result.load_duration_ms));
                Ok(result)
            }
            Err(e) => {
                let message = e.to_string();
                self.state.send_modify(|s| s.fail(message));
                Err(e)
            }
        }
    }

    fn observe(&self, config: &LoadConfig) -> LoadConfig {
        let mut observed = config.clone();

        let state = Arc::clone(&self.state);
        let user_chunk = config.on_chunk_loaded.clone();
        observed.on_chunk_loaded = Some(Arc::new(move |loaded, total, chunk_index| {
            state.send_modify(|s| s.record_chunk(loaded, total, chunk_index));
            if let Some(f) = &user_chunk {
                f(loaded, total, chunk_index);
            }
        }));

        let state = Arc::clone(&self.state);
        let user_complete = config.on_complete.clone();
        observed.on_complete = Some(Arc::new(move |total| {
            state.send_modify(|s| s.record_total(total));
            if let Some(f) = &user_complete {
                f(total);
            }
        }));

        observed
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::Arc;
    use std::time::Duration;

    use formats::Feature;
    use foundation::Crs;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use tokio::sync::watch;

    use super::LoadTracker;
    use crate::error::LoadErrorKind;
    use crate::loader::test_support::points_payload;
    use crate::loader::{BatchLoader, LoadConfig};
    use crate::progress::{LoadPhase, LoadProgressState, STARTING_MESSAGE};
    use crate::sink::{FeatureSink, SinkError, VectorSource};
    use crate::transport::MemoryTransport;

    /// Refuses every batch, remembering the tracked state at the first attempt.
    struct Refusing {
        seen: Arc<Mutex<Option<LoadProgressState>>>,
        progress: watch::Receiver<LoadProgressState>,
    }

    impl FeatureSink for Refusing {
        fn append_batch(&mut self, _: Vec<Feature>) -> Result<(), SinkError> {
            *self.seen.lock() = Some(self.progress.borrow().clone());
            Err(SinkError::DuplicateId("x".to_string()))
        }

        fn clear(&mut self) {}

        fn len(&self) -> usize {
            0
        }
    }

    fn loader() -> BatchLoader<MemoryTransport> {
        let transport = MemoryTransport::new();
        transport.insert("/ok", points_payload(2500));
        transport.insert("/empty", points_payload(0));
        transport.insert_status("/missing", 404);
        BatchLoader::new(transport)
    }

    fn recording_config(
        tracker: &LoadTracker,
        seen: &Arc<Mutex<Vec<LoadProgressState>>>,
    ) -> LoadConfig {
        let rx = tracker.subscribe();
        let seen = Arc::clone(seen);
        LoadConfig::new(Crs::Etrs89)
            .with_chunk_size(NonZeroUsize::new(1000).unwrap())
            .on_chunk_loaded(move |_, _, _| seen.lock().push(rx.borrow().clone()))
    }

    #[test]
    fn starts_idle() {
        let tracker = LoadTracker::new();
        assert_eq!(tracker.snapshot(), LoadProgressState::idle());
        assert_eq!(tracker.snapshot().phase, LoadPhase::Idle);
    }

    #[tokio::test]
    async fn mirrors_every_chunk_then_completes() {
        let loader = loader();
        let mut tracker = LoadTracker::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let config = recording_config(&tracker, &seen);

        let mut sink = VectorSource::new();
        let result = tracker.load(&loader, "/ok", &mut sink, &config).await.unwrap();
        assert_eq!(result.feature_count, 2500);

        let seen = seen.lock();
        let progress: Vec<_> = seen
            .iter()
            .map(|s| (s.loaded_count, s.total_count, s.current_chunk_index))
            .collect();
        assert_eq!(progress, vec![(1000, 2500, 1), (2000, 2500, 2), (2500, 2500, 3)]);
        assert!(seen.iter().all(|s| s.is_loading && s.phase == LoadPhase::Loading));
        assert_eq!(seen[0].status_message, "Loading chunk 1: 1000/2500 features (40%)");

        let done = tracker.snapshot();
        assert_eq!(done.phase, LoadPhase::Complete);
        assert!(!done.is_loading);
        assert_eq!(done.loaded_count, 2500);
        assert!(done.status_message.starts_with("Completed! Loaded 2500 features in "));
        assert_eq!(done.last_error, None);
    }

    #[tokio::test]
    async fn records_transport_failure() {
        let loader = loader();
        let mut tracker = LoadTracker::new();
        let mut sink = VectorSource::new();

        let err = tracker
            .load(&loader, "/missing", &mut sink, &LoadConfig::new(Crs::Etrs89))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 404");

        let state = tracker.snapshot();
        assert_eq!(state.phase, LoadPhase::Error);
        assert!(!state.is_loading);
        assert_eq!(state.loaded_count, 0);
        assert_eq!(state.last_error.as_deref(), Some("HTTP error! status: 404"));
        assert_eq!(state.status_message, "Error: HTTP error! status: 404");
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn new_session_starts_from_scratch() {
        let loader = loader();
        let mut tracker = LoadTracker::new();
        let mut sink = VectorSource::new();

        let _ = tracker
            .load(&loader, "/missing", &mut sink, &LoadConfig::new(Crs::Etrs89))
            .await;
        assert!(tracker.snapshot().last_error.is_some());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let config = recording_config(&tracker, &seen);
        tracker.load(&loader, "/ok", &mut sink, &config).await.unwrap();

        let first = seen.lock()[0].clone();
        assert_eq!(first.last_error, None);
        assert_eq!(first.loaded_count, 1000);
        assert_eq!(first.current_chunk_index, 1);
    }

    #[tokio::test]
    async fn state_is_reset_before_the_fetch() {
        let loader = loader();
        let mut tracker = LoadTracker::new();
        let rx = tracker.subscribe();
        let mut sink = VectorSource::new();
        tracker
            .load(&loader, "/ok", &mut sink, &LoadConfig::new(Crs::Etrs89))
            .await
            .unwrap();
        assert_eq!(tracker.snapshot().phase, LoadPhase::Complete);

        // A second session against a failing sink: the starting shape is
        // visible even though the load dies on its first chunk.
        let at_first_append = Arc::new(Mutex::new(None));
        let mut refusing = Refusing {
            seen: Arc::clone(&at_first_append),
            progress: rx,
        };
        let err = tracker
            .load(&loader, "/ok", &mut refusing, &LoadConfig::new(Crs::Etrs89))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::Sink);

        let before = at_first_append.lock().clone().unwrap();
        assert_eq!(before.phase, LoadPhase::Loading);
        assert_eq!(before.loaded_count, 0);
        assert_eq!(before.total_count, 0);
        assert_eq!(before.status_message, STARTING_MESSAGE);
        assert_eq!(tracker.snapshot().phase, LoadPhase::Error);
    }

    #[tokio::test]
    async fn empty_payload_completes_with_zero() {
        let loader = loader();
        let mut tracker = LoadTracker::new();
        let mut sink = VectorSource::new();
        tracker
            .load(&loader, "/empty", &mut sink, &LoadConfig::new(Crs::Etrs89))
            .await
            .unwrap();
        let state = tracker.snapshot();
        assert_eq!(state.phase, LoadPhase::Complete);
        assert_eq!(state.total_count, 0);
        assert_eq!(state.percentage(), 0);
    }

    #[tokio::test]
    async fn reset_returns_to_idle_and_notifies() {
        let loader = loader();
        let mut tracker = LoadTracker::new();
        let mut rx = tracker.subscribe();
        let mut sink = VectorSource::new();
        tracker
            .load(&loader, "/ok", &mut sink, &LoadConfig::new(Crs::Etrs89))
            .await
            .unwrap();
        rx.borrow_and_update();

        tracker.reset();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow(), LoadProgressState::idle());
    }

    #[tokio::test]
    async fn failure_mid_load_counts_only_appended_chunks() {
        // f1500 is already in the sink, so chunk 2 (f1000..f1999) is refused.
        let loader = loader();
        let mut tracker = LoadTracker::new();
        let mut sink = VectorSource::new();
        let seed = Feature {
            id: Some("f1500".to_string()),
            properties: serde_json::Map::new(),
            geometry: None,
        };
        sink.append_batch(vec![seed]).unwrap();

        let config =
            LoadConfig::new(Crs::Etrs89).with_chunk_size(NonZeroUsize::new(1000).unwrap());
        let err = tracker
            .load(&loader, "/ok", &mut sink, &config)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::Sink);

        let state = tracker.snapshot();
        assert_eq!(state.phase, LoadPhase::Error);
        assert!(!state.is_loading);
        assert_eq!(state.loaded_count, 1000);
        assert_eq!(state.total_count, 2500);
        assert_eq!(state.current_chunk_index, 1);
        assert_eq!(state.last_error.as_deref(), Some(err.to_string().as_str()));
        assert_eq!(sink.len(), 1001);
    }

    #[tokio::test(start_paused = true)]
    async fn trackers_loading_side_by_side_keep_their_own_state() {
        let transport = MemoryTransport::new();
        transport.insert("/slow", points_payload(30));
        transport.insert("/fast", points_payload(5));
        let loader = BatchLoader::new(transport);

        let mut slow = LoadTracker::new();
        let mut fast = LoadTracker::new();
        let mut slow_sink = VectorSource::new();
        let mut fast_sink = VectorSource::new();
        let slow_config = LoadConfig::new(Crs::Etrs89)
            .with_chunk_size(NonZeroUsize::new(10).unwrap())
            .with_chunk_delay(Duration::from_millis(50));
        let fast_config = LoadConfig::new(Crs::Etrs89);

        let (a, b) = tokio::join!(
            slow.load(&loader, "/slow", &mut slow_sink, &slow_config),
            fast.load(&loader, "/fast", &mut fast_sink, &fast_config),
        );
        assert_eq!(a.unwrap().feature_count, 30);
        assert_eq!(b.unwrap().feature_count, 5);

        let slow = slow.snapshot();
        assert_eq!(slow.phase, LoadPhase::Complete);
        assert_eq!((slow.loaded_count, slow.current_chunk_index), (30, 3));
        let fast = fast.snapshot();
        assert_eq!(fast.phase, LoadPhase::Complete);
        assert_eq!((fast.loaded_count, fast.current_chunk_index), (5, 1));
    }
}
