use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use catalog::LayerEntry;
use clap::{Parser, Subcommand};
use foundation::Crs;
use streaming::{DEFAULT_CHUNK_SIZE, LoadConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Progressive GeoJSON loader for the Polish map layers")]
pub struct Args {
    /// Base URL (or directory) that layer paths are resolved against
    #[arg(long, env = "POLMAP_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// JSON layer catalog replacing the built-in one
    #[arg(long, env = "POLMAP_CATALOG", global = true)]
    pub catalog: Option<PathBuf>,

    /// Directory that site-absolute paths like `/data/x.geojson` are read from
    #[arg(long, env = "POLMAP_ROOT", default_value = ".", global = true)]
    pub root: PathBuf,

    /// Records per chunk (overrides the catalog)
    #[arg(long, global = true)]
    pub chunk_size: Option<NonZeroUsize>,

    /// Pause between chunks in milliseconds (overrides the catalog)
    #[arg(long, global = true)]
    pub chunk_delay_ms: Option<u64>,

    /// CRS the features are reprojected into
    #[arg(long, default_value = "EPSG:3857", global = true)]
    pub target_crs: Crs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the layers of the catalog
    Layers,

    /// Load catalog layers concurrently (all of them when none are named)
    Load { layers: Vec<String> },

    /// Load one arbitrary GeoJSON resource
    Fetch {
        url: String,

        /// CRS of the payload's coordinates
        #[arg(long, default_value = "EPSG:4326")]
        source_crs: Crs,
    },
}

/// Chunking and reprojection knobs shared by every load of one invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSettings {
    pub chunk_size: Option<NonZeroUsize>,
    pub chunk_delay_ms: Option<u64>,
    pub target_crs: Crs,
}

impl From<&Args> for LoadSettings {
    fn from(args: &Args) -> Self {
        Self {
            chunk_size: args.chunk_size,
            chunk_delay_ms: args.chunk_delay_ms,
            target_crs: args.target_crs,
        }
    }
}

impl LoadSettings {
    /// Command-line flags win over the catalog entry, which wins over defaults.
    pub fn config_for(&self, entry: &LayerEntry) -> LoadConfig {
        self.config(
            entry.source_crs,
            self.chunk_size.or(entry.chunk_size),
            self.chunk_delay_ms.or(entry.chunk_delay_ms),
        )
    }

    pub fn config_for_crs(&self, source_crs: Crs) -> LoadConfig {
        self.config(source_crs, self.chunk_size, self.chunk_delay_ms)
    }

    fn config(
        &self,
        source_crs: Crs,
        chunk_size: Option<NonZeroUsize>,
        chunk_delay_ms: Option<u64>,
    ) -> LoadConfig {
        LoadConfig::new(source_crs)
            .with_target_crs(self.target_crs)
            .with_chunk_size(chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE))
            .with_chunk_delay(Duration::from_millis(chunk_delay_ms.unwrap_or(0)))
    }
}
