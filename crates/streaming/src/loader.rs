use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use formats::{Feature, GeoJsonParser, RecordParser};
use foundation::{Crs, Reprojector};
use runtime::{CancellationToken, ChunkPlan, LoadStats, Pacer};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::error::LoadError;
use crate::sink::FeatureSink;
use crate::transport::Transport;

pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = NonZeroUsize::new(1000).unwrap();

/// `(loaded_count, total_count, chunk_index)`, called after every chunk.
pub type ChunkCallback = Arc<dyn Fn(usize, usize, usize) + Send + Sync>;
/// `(total_count)`, called once after the last chunk.
pub type CompleteCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// Settings for one load session.
#[derive(Clone)]
pub struct LoadConfig {
    pub chunk_size: NonZeroUsize,
    /// Pause between chunks. Zero still yields once.
    pub chunk_delay: Duration,
    pub source_crs: Crs,
    pub target_crs: Crs,
    pub on_chunk_loaded: Option<ChunkCallback>,
    pub on_complete: Option<CompleteCallback>,
    /// Checked before the fetch and at every chunk boundary.
    pub cancel: Option<CancellationToken>,
}

impl LoadConfig {
    pub fn new(source_crs: Crs) -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: Duration::ZERO,
            source_crs,
            target_crs: Crs::WebMercator,
            on_chunk_loaded: None,
            on_complete: None,
            cancel: None,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: NonZeroUsize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_chunk_delay(mut self, chunk_delay: Duration) -> Self {
        self.chunk_delay = chunk_delay;
        self
    }

    pub fn with_target_crs(mut self, target_crs: Crs) -> Self {
        self.target_crs = target_crs;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn on_chunk_loaded(
        mut self,
        f: impl Fn(usize, usize, usize) + Send + Sync + 'static,
    ) -> Self {
        self.on_chunk_loaded = Some(Arc::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }
}

impl std::fmt::Debug for LoadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadConfig")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_delay", &self.chunk_delay)
            .field("source_crs", &self.source_crs)
            .field("target_crs", &self.target_crs)
            .field("on_chunk_loaded", &self.on_chunk_loaded.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadResult {
    /// Records appended to the sink; always the parsed record count.
    pub feature_count: usize,
    pub load_duration_ms: f64,
    pub stats: LoadStats,
}

/// Fetches a payload, parses it into records and feeds them to a sink in
/// bounded chunks, pausing between chunks.
#[derive(Debug, Clone)]
pub struct BatchLoader<T, P = GeoJsonParser> {
    transport: T,
    parser: P,
}

impl<T: Transport> BatchLoader<T> {
    pub fn new(transport: T) -> Self {
        Self::with_parser(transport, GeoJsonParser)
    }
}

impl<T: Transport, P: RecordParser> BatchLoader<T, P> {
    pub fn with_parser(transport: T, parser: P) -> Self {
        Self { transport, parser }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs one session against `sink`.
    ///
    /// On failure the remaining chunks are skipped; chunks already appended
    /// stay in the sink.
    pub async fn load<S: FeatureSink + ?Sized>(
        &self,
        url: &str,
        sink: &mut S,
        config: &LoadConfig,
    ) -> Result<LoadResult, LoadError> {
        let result = self.run(url, sink, config).await;
        if let Err(e) = &result {
            error!(url, kind = ?e.kind(), "batch load failed: {e}");
        }
        result
    }

    async fn run<S: FeatureSink + ?Sized>(
        &self,
        url: &str,
        sink: &mut S,
        config: &LoadConfig,
    ) -> Result<LoadResult, LoadError> {
        let started = Instant::now();
        let mut stats = LoadStats::new();

        if config.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        info!(
            url,
            source_crs = %config.source_crs,
            target_crs = %config.target_crs,
            chunk_size = config.chunk_size.get(),
            "loading features"
        );

        let fetch_started = Instant::now();
        let payload = match &config.cancel {
            Some(cancel) => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LoadError::Cancelled),
                fetched = self.transport.fetch(url) => fetched?,
            },
            None => self.transport.fetch(url).await?,
        };
        stats.record_fetch(payload.len(), fetch_started.elapsed());

        let parse_started = Instant::now();
        let reprojector = Reprojector::new(config.source_crs, config.target_crs);
        let features = self.parser.parse(&payload, &reprojector)?;
        drop(payload);
        stats.record_parse(parse_started.elapsed());

        let total = features.len();
        let plan = ChunkPlan::new(total, config.chunk_size);
        let pacer = Pacer::new(config.chunk_delay);
        debug!(url, total, chunks = plan.chunk_count(), "payload parsed");

        let mut records = features.into_iter();
        let mut loaded = 0usize;
        for span in plan.chunks() {
            if config.is_cancelled() {
                return Err(LoadError::Cancelled);
            }

            let batch: Vec<Feature> = records.by_ref().take(span.len()).collect();
            let append_started = Instant::now();
            sink.append_batch(batch)?;
            stats.record_chunk(span.len(), append_started.elapsed());

            loaded += span.len();
            debug!(url, chunk = span.index, loaded, total, "chunk appended");
            if let Some(on_chunk_loaded) = &config.on_chunk_loaded {
                on_chunk_loaded(loaded, total, span.index);
            }

            if !span.is_last {
                match &config.cancel {
                    Some(cancel) => {
                        if !pacer.pause_or_cancel(cancel).await {
                            return Err(LoadError::Cancelled);
                        }
                    }
                    None => pacer.pause().await,
                }
            }
        }

        let load_duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Some(on_complete) = &config.on_complete {
            on_complete(total);
        }
        info!(url, features = total, load_duration_ms, "load complete");

        Ok(LoadResult {
            feature_count: total,
            load_duration_ms,
            stats,
        })
    }
}
