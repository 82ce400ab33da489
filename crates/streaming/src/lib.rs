pub mod board;
pub mod error;
pub mod loader;
pub mod progress;
pub mod sink;
pub mod tracker;
pub mod transport;

pub use board::*;
pub use error::*;
pub use loader::*;
pub use progress::*;
pub use sink::*;
pub use tracker::*;
pub use transport::*;
