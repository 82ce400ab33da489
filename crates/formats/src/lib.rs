pub mod geojson;
pub mod parser;

pub use geojson::*;
pub use parser::*;
