use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use foundation::Crs;
use serde::{Deserialize, Serialize};

pub const VOIVODESHIPS_ID: &str = "voivodeships";
pub const LINES_ID: &str = "lines";

/// One loadable dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    pub id: String,
    pub name: String,
    /// Absolute URL, or a path resolved against the catalog's base URL.
    pub path: String,
    pub source_crs: Crs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<NonZeroUsize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_delay_ms: Option<u64>,
    #[serde(default)]
    pub z_index: i32,
}

impl LayerEntry {
    pub fn chunk_delay(&self) -> Option<Duration> {
        self.chunk_delay_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    NotFound(String),
    DuplicateId(String),
    Corrupt(String),
    Encode(String),
    Io(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::NotFound(id) => write!(f, "unknown layer: {id}"),
            CatalogError::DuplicateId(id) => write!(f, "layer id listed twice: {id}"),
            CatalogError::Corrupt(msg) => write!(f, "catalog file corrupt: {msg}"),
            CatalogError::Encode(msg) => write!(f, "catalog could not be written: {msg}"),
            CatalogError::Io(msg) => write!(f, "catalog file error: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct CatalogFile {
    layers: Vec<LayerEntry>,
}

/// Layers in draw order (ascending `z_index`, ties keep file order).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LayerCatalog {
    layers: Vec<LayerEntry>,
}

impl LayerCatalog {
    pub fn new(mut layers: Vec<LayerEntry>) -> Result<Self, CatalogError> {
        let mut seen = BTreeSet::new();
        for layer in &layers {
            if !seen.insert(layer.id.as_str()) {
                return Err(CatalogError::DuplicateId(layer.id.clone()));
            }
        }
        layers.sort_by_key(|l| l.z_index);
        Ok(Self { layers })
    }

    /// The two datasets of the Polish map: voivodeship borders and transit lines.
    pub fn default_poland() -> Self {
        let layers = vec![
            LayerEntry {
                id: VOIVODESHIPS_ID.to_string(),
                name: "Voivodeships".to_string(),
                path: "/data/wojewodztwa.geojson".to_string(),
                source_crs: Crs::Etrs89,
                chunk_size: None,
                chunk_delay_ms: None,
                z_index: 100,
            },
            LayerEntry {
                id: LINES_ID.to_string(),
                name: "Lines".to_string(),
                path: "/data/linie.geojson".to_string(),
                source_crs: Crs::Puwg1992,
                chunk_size: None,
                chunk_delay_ms: None,
                z_index: 200,
            },
        ];
        Self { layers }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let file = serde_json::from_str::<CatalogFile>(raw)
            .map_err(|e| CatalogError::Corrupt(e.to_string()))?;
        Self::new(file.layers)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_string(&self) -> Result<String, CatalogError> {
        let file = CatalogFile {
            layers: self.layers.clone(),
        };
        serde_json::to_string_pretty(&file)
            .map_err(|e| CatalogError::Encode(e.to_string()))
    }

    pub fn layers(&self) -> &[LayerEntry] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: &str) -> Result<&LayerEntry, CatalogError> {
        self.layers
            .iter()
            .find(|l| l.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// Entries for `ids` in the order given; all layers when `ids` is empty.
    pub fn select(&self, ids: &[String]) -> Result<Vec<&LayerEntry>, CatalogError> {
        if ids.is_empty() {
            return Ok(self.layers.iter().collect());
        }
        ids.iter().map(|id| self.get(id)).collect()
    }
}

/// Joins `entry.path` onto `base_url` unless the path already carries a scheme.
pub fn url_for(entry: &LayerEntry, base_url: Option<&str>) -> String {
    let path = entry.path.as_str();
    if path.contains("://") {
        return path.to_string();
    }
    match base_url.map(str::trim).filter(|b| !b.is_empty()) {
        Some(base) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_catalog_is_in_draw_order() {
        let catalog = LayerCatalog::default_poland();
        let ids: Vec<_> = catalog.layers().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec![VOIVODESHIPS_ID, LINES_ID]);

        let lines = catalog.get(LINES_ID).unwrap();
        assert_eq!(lines.source_crs, Crs::Puwg1992);
        assert_eq!(lines.z_index, 200);
        assert_eq!(catalog.get(VOIVODESHIPS_ID).unwrap().source_crs, Crs::Etrs89);
    }

    #[test]
    fn unknown_layer_is_an_error() {
        let catalog = LayerCatalog::default_poland();
        assert_eq!(
            catalog.get("rivers").unwrap_err(),
            CatalogError::NotFound("rivers".to_string())
        );
        assert!(catalog.select(&["lines".to_string(), "rivers".to_string()]).is_err());
    }

    #[test]
    fn select_keeps_requested_order() {
        let catalog = LayerCatalog::default_poland();
        let picked = catalog
            .select(&[LINES_ID.to_string(), VOIVODESHIPS_ID.to_string()])
            .unwrap();
        assert_eq!(picked[0].id, LINES_ID);
        assert_eq!(picked[1].id, VOIVODESHIPS_ID);
        assert_eq!(catalog.select(&[]).unwrap().len(), 2);
    }

    #[test]
    fn reads_json_and_sorts_by_z_index() {
        let raw = r#"{
            "layers": [
                {"id": "top", "name": "Top", "path": "top.geojson", "source_crs": "EPSG:3857", "z_index": 5},
                {"id": "base", "name": "Base", "path": "base.geojson", "source_crs": "EPSG:2180",
                 "chunk_size": 250, "chunk_delay_ms": 16}
            ]
        }"#;
        let catalog = LayerCatalog::from_json_str(raw).unwrap();
        let ids: Vec<_> = catalog.layers().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["base", "top"]);

        let base = catalog.get("base").unwrap();
        assert_eq!(base.chunk_size, NonZeroUsize::new(250));
        assert_eq!(base.chunk_delay(), Some(Duration::from_millis(16)));
        assert_eq!(catalog.get("top").unwrap().chunk_delay(), None);
    }

    #[test]
    fn rejects_bad_files() {
        let dup = r#"{"layers": [
            {"id": "a", "name": "A", "path": "a", "source_crs": "EPSG:4326"},
            {"id": "a", "name": "A2", "path": "b", "source_crs": "EPSG:4326"}
        ]}"#;
        assert_eq!(
            LayerCatalog::from_json_str(dup).unwrap_err(),
            CatalogError::DuplicateId("a".to_string())
        );

        let bad_crs = r#"{"layers": [{"id": "a", "name": "A", "path": "a", "source_crs": "EPSG:31370"}]}"#;
        assert!(matches!(
            LayerCatalog::from_json_str(bad_crs),
            Err(CatalogError::Corrupt(_))
        ));

        let zero_chunk = r#"{"layers": [{"id": "a", "name": "A", "path": "a", "source_crs": "EPSG:4326", "chunk_size": 0}]}"#;
        assert!(LayerCatalog::from_json_str(zero_chunk).is_err());
    }

    #[test]
    fn json_round_trip_preserves_entries() {
        let catalog = LayerCatalog::default_poland();
        let raw = catalog.to_json_string().unwrap();
        assert!(raw.contains("\"EPSG:2180\""));
        assert_eq!(LayerCatalog::from_json_str(&raw).unwrap(), catalog);
    }

    #[test]
    fn resolves_urls() {
        let catalog = LayerCatalog::default_poland();
        let lines = catalog.get(LINES_ID).unwrap();
        assert_eq!(url_for(lines, None), "/data/linie.geojson");
        assert_eq!(url_for(lines, Some("  ")), "/data/linie.geojson");
        assert_eq!(
            url_for(lines, Some("https://maps.example.org/")),
            "https://maps.example.org/data/linie.geojson"
        );

        let mut remote = lines.clone();
        remote.path = "https://cdn.example.org/linie.geojson".to_string();
        assert_eq!(url_for(&remote, Some("http://ignored")), remote.path);
    }

    #[test]
    fn write_and_read_failures_are_told_apart() {
        let write = CatalogError::Encode("key must be a string".to_string());
        assert_eq!(
            write.to_string(),
            "catalog could not be written: key must be a string"
        );
        let read = CatalogError::Io("/x.json: not found".to_string());
        assert_eq!(read.to_string(), "catalog file error: /x.json: not found");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = LayerCatalog::from_json_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
