use std::io::Write;
use std::process::ExitCode;

use catalog::{LayerCatalog, url_for};
use clap::Parser;
use runtime::CancellationToken;
use streaming::{BatchLoader, DefaultTransport, FileTransport, HttpTransport};
use tools::args::{Args, Command, LoadSettings};
use tools::session::{LayerJob, jobs_for_catalog, run_jobs, summary_line};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match real_main(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// `Ok(false)` when at least one load failed.
async fn real_main(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let catalog = match &args.catalog {
        Some(path) => LayerCatalog::from_json_path(path)?,
        None => LayerCatalog::default_poland(),
    };
    let settings = LoadSettings::from(&args);
    let base_url = args.base_url.as_deref();

    let jobs = match &args.command {
        Command::Layers => {
            print_layers(&catalog, base_url)?;
            return Ok(true);
        }
        Command::Load { layers } => jobs_for_catalog(&catalog, layers, base_url, &settings)?,
        Command::Fetch { url, source_crs } => vec![LayerJob {
            id: url.clone(),
            url: url.clone(),
            config: settings.config_for_crs(*source_crs),
        }],
    };

    let transport = DefaultTransport::new(
        HttpTransport::default(),
        FileTransport::with_root(&args.root),
    );
    let loader = BatchLoader::new(transport);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping at the next chunk boundary");
            on_interrupt.cancel();
        }
    });

    let mut stdout = std::io::stdout().lock();
    let outcomes = run_jobs(&loader, jobs, &cancel, &mut stdout).await?;
    for outcome in &outcomes {
        writeln!(stdout, "{}", summary_line(outcome))?;
    }
    Ok(outcomes.iter().all(|o| o.is_ok()))
}

fn print_layers(catalog: &LayerCatalog, base_url: Option<&str>) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    for entry in catalog.layers() {
        writeln!(
            stdout,
            "{:<14} {:<14} {:<10} z={:<4} {}",
            entry.id,
            entry.name,
            entry.source_crs.code(),
            entry.z_index,
            url_for(entry, base_url)
        )?;
    }
    Ok(())
}
