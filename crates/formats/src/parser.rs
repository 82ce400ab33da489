use foundation::Reprojector;

use crate::geojson::{Feature, read_features};

/// Error type for record parsing.
#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl ParseError {
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Turns a raw payload into an ordered list of records in the reprojector's
/// target system.
///
/// Implementations must keep the payload's record order.
pub trait RecordParser: Send + Sync {
    fn parse(&self, payload: &[u8], reprojector: &Reprojector) -> Result<Vec<Feature>, ParseError>;
}

/// GeoJSON `FeatureCollection` / `Feature` parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoJsonParser;

impl RecordParser for GeoJsonParser {
    fn parse(&self, payload: &[u8], reprojector: &Reprojector) -> Result<Vec<Feature>, ParseError> {
        read_features(payload, reprojector).map_err(|e| ParseError::with_source(e.to_string(), e))
    }
}
