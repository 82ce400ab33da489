pub mod geodesy;
pub mod mercator;
pub mod tmerc;

pub use geodesy::*;
pub use mercator::*;
pub use tmerc::*;
