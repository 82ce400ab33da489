//! Concurrent loading of several layers with a live progress panel.

use std::io::Write;
use std::time::Duration;

use catalog::{CatalogError, LayerCatalog, url_for};
use foundation::Aabb2;
use futures_util::future::join_all;
use runtime::CancellationToken;
use streaming::{
    BatchLoader, FeatureSink, LoadBoard, LoadConfig, LoadError, LoadResult, LoadTracker, Transport,
    VectorSource,
};

use crate::args::LoadSettings;

pub const PANEL_REFRESH: Duration = Duration::from_millis(100);

/// One layer to load: where from, and how.
#[derive(Debug, Clone)]
pub struct LayerJob {
    pub id: String,
    pub url: String,
    pub config: LoadConfig,
}

#[derive(Debug)]
pub struct LayerOutcome {
    pub id: String,
    pub result: Result<LoadResult, LoadError>,
    /// Features in the sink when the session ended, including partial loads.
    pub features: usize,
    pub extent: Aabb2,
}

impl LayerOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

pub fn jobs_for_catalog(
    catalog: &LayerCatalog,
    ids: &[String],
    base_url: Option<&str>,
    settings: &LoadSettings,
) -> Result<Vec<LayerJob>, CatalogError> {
    Ok(catalog
        .select(ids)?
        .into_iter()
        .map(|entry| LayerJob {
            id: entry.id.clone(),
            url: url_for(entry, base_url),
            config: settings.config_for(entry),
        })
        .collect())
}

/// Loads every job concurrently on the current task, writing the progress
/// panel to `out` whenever a layer's state changes.
///
/// Outcomes are returned in job order.
pub async fn run_jobs<T: Transport>(
    loader: &BatchLoader<T>,
    jobs: Vec<LayerJob>,
    cancel: &CancellationToken,
    out: &mut impl Write,
) -> std::io::Result<Vec<LayerOutcome>> {
    let mut board = LoadBoard::new();
    let mut sessions = Vec::with_capacity(jobs.len());
    for job in jobs {
        let tracker = LoadTracker::new();
        board.register(job.id.clone(), tracker.subscribe());
        sessions.push((job, tracker));
    }

    let loads = join_all(
        sessions
            .into_iter()
            .map(|(job, tracker)| load_layer(loader, job, tracker, cancel.clone())),
    );
    tokio::pin!(loads);

    let mut ticker = tokio::time::interval(PANEL_REFRESH);
    let outcomes = loop {
        tokio::select! {
            outcomes = &mut loads => break outcomes,
            _ = ticker.tick() => print_panel(&mut board, out)?,
        }
    };
    print_panel(&mut board, out)?;
    Ok(outcomes)
}

async fn load_layer<T: Transport>(
    loader: &BatchLoader<T>,
    job: LayerJob,
    mut tracker: LoadTracker,
    cancel: CancellationToken,
) -> LayerOutcome {
    let config = job.config.with_cancel(cancel);
    let mut sink = VectorSource::new();
    let result = tracker.load(loader, &job.url, &mut sink, &config).await;
    LayerOutcome {
        id: job.id,
        result,
        features: sink.len(),
        extent: sink.extent(),
    }
}

fn print_panel(board: &mut LoadBoard, out: &mut impl Write) -> std::io::Result<()> {
    if !board.take_changed() {
        return Ok(());
    }
    for line in board.render() {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

pub fn summary_line(outcome: &LayerOutcome) -> String {
    match &outcome.result {
        Ok(result) => format!(
            "{}: loaded {} features in {:.0}ms ({} chunks, fetch {}ms, parse {}ms)",
            outcome.id,
            result.feature_count,
            result.load_duration_ms,
            result.stats.chunks,
            result.stats.fetch_time().as_millis(),
            result.stats.parse_time().as_millis(),
        ),
        Err(e) if outcome.features > 0 => format!(
            "{}: failed after {} features: {e}",
            outcome.id, outcome.features
        ),
        Err(e) => format!("{}: failed: {e}", outcome.id),
    }
}
