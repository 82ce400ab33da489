pub mod chunking;
pub mod metrics;
pub mod pacing;

pub use chunking::*;
pub use metrics::*;
pub use pacing::*;

pub use tokio_util::sync::CancellationToken;
