use foundation::{Aabb2, ReprojectError, Reprojector};
use serde_json::{Map, Value};

/// A position in whatever CRS the record was reprojected to.
pub type Position = [f64; 2];

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
    GeometryCollection(Vec<Geometry>),
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            Geometry::GeometryCollection(_) => "GeometryCollection",
        }
    }

    pub fn for_each_position(&self, f: &mut impl FnMut(Position)) {
        match self {
            Geometry::Point(p) => f(*p),
            Geometry::MultiPoint(ps) | Geometry::LineString(ps) => ps.iter().for_each(|p| f(*p)),
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter().flatten().for_each(|p| f(*p))
            }
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().for_each(|p| f(*p)),
            Geometry::GeometryCollection(parts) => {
                for part in parts {
                    part.for_each_position(f);
                }
            }
        }
    }

    pub fn bounds(&self) -> Aabb2 {
        let mut b = Aabb2::empty();
        self.for_each_position(&mut |p| b.extend(p));
        b
    }
}

/// One geometry + attribute record.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    /// GeoJSON allows features without geometry.
    pub geometry: Option<Geometry>,
}

impl Feature {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

#[derive(Debug)]
pub enum GeoJsonError {
    Json(serde_json::Error),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
    Reproject { index: usize, source: ReprojectError },
}

impl std::fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoJsonError::Json(e) => write!(f, "JSON parse error: {e}"),
            GeoJsonError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection or Feature")
            }
            GeoJsonError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
            GeoJsonError::Reproject { index, source } => {
                write!(f, "feature at index {index}: {source}")
            }
        }
    }
}

impl std::error::Error for GeoJsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeoJsonError::Json(e) => Some(e),
            GeoJsonError::Reproject { source, .. } => Some(source),
            _ => None,
        }
    }
}

enum GeometryError {
    Invalid(String),
    Reproject(ReprojectError),
}

impl From<String> for GeometryError {
    fn from(reason: String) -> Self {
        GeometryError::Invalid(reason)
    }
}

/// Reads every feature of a GeoJSON payload, reprojecting positions as it goes.
pub fn read_features(
    payload: &[u8],
    reprojector: &Reprojector,
) -> Result<Vec<Feature>, GeoJsonError> {
    let value: Value = serde_json::from_slice(payload).map_err(GeoJsonError::Json)?;
    read_features_from_value(&value, reprojector)
}

pub fn read_features_from_value(
    value: &Value,
    reprojector: &Reprojector,
) -> Result<Vec<Feature>, GeoJsonError> {
    let obj = value
        .as_object()
        .ok_or(GeoJsonError::NotAFeatureCollection)?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or(GeoJsonError::NotAFeatureCollection)?;

    match ty {
        "FeatureCollection" => {
            let features_val = obj
                .get("features")
                .and_then(|v| v.as_array())
                .ok_or(GeoJsonError::NotAFeatureCollection)?;
            let mut features = Vec::with_capacity(features_val.len());
            for (index, feat_val) in features_val.iter().enumerate() {
                features.push(read_feature(index, feat_val, reprojector)?);
            }
            Ok(features)
        }
        "Feature" => Ok(vec![read_feature(0, value, reprojector)?]),
        _ => Err(GeoJsonError::NotAFeatureCollection),
    }
}

fn read_feature(
    index: usize,
    value: &Value,
    reprojector: &Reprojector,
) -> Result<Feature, GeoJsonError> {
    let invalid = |reason: &str| GeoJsonError::InvalidFeature {
        index,
        reason: reason.to_string(),
    };

    let feat_obj = value
        .as_object()
        .ok_or_else(|| invalid("feature must be an object"))?;
    let feat_type = feat_obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| invalid("feature missing type"))?;
    if feat_type != "Feature" {
        return Err(GeoJsonError::InvalidFeature {
            index,
            reason: format!("unexpected feature type: {feat_type}"),
        });
    }

    let id = match feat_obj.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let properties = feat_obj
        .get("properties")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    let geometry = match feat_obj.get("geometry") {
        None | Some(Value::Null) => None,
        Some(g) => Some(parse_geometry(g, reprojector).map_err(|e| match e {
            GeometryError::Invalid(reason) => GeoJsonError::InvalidFeature { index, reason },
            GeometryError::Reproject(source) => GeoJsonError::Reproject { index, source },
        })?),
    };

    Ok(Feature {
        id,
        properties,
        geometry,
    })
}

fn parse_geometry(value: &Value, r: &Reprojector) -> Result<Geometry, GeometryError> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    if ty == "GeometryCollection" {
        let parts = obj
            .get("geometries")
            .and_then(|v| v.as_array())
            .ok_or("GeometryCollection missing geometries".to_string())?;
        let mut out = Vec::with_capacity(parts.len());
        for part in parts {
            out.push(parse_geometry(part, r)?);
        }
        return Ok(Geometry::GeometryCollection(out));
    }

    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_position(coords, r)?)),
        "MultiPoint" => Ok(Geometry::MultiPoint(parse_positions(coords, r)?)),
        "LineString" => Ok(Geometry::LineString(parse_positions(coords, r)?)),
        "MultiLineString" => Ok(Geometry::MultiLineString(parse_rings(coords, r)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_rings(coords, r)?)),
        "MultiPolygon" => Ok(Geometry::MultiPolygon(parse_multi_polygon(coords, r)?)),
        other => Err(format!("unsupported geometry type: {other}").into()),
    }
}

fn parse_position(coords: &Value, r: &Reprojector) -> Result<Position, GeometryError> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have at least two ordinates".to_string().into());
    }
    let x = arr[0]
        .as_f64()
        .ok_or("position x must be a number".to_string())?;
    let y = arr[1]
        .as_f64()
        .ok_or("position y must be a number".to_string())?;
    r.reproject([x, y]).map_err(GeometryError::Reproject)
}

fn parse_positions(coords: &Value, r: &Reprojector) -> Result<Vec<Position>, GeometryError> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    let mut out = Vec::with_capacity(arr.len());
    for item in arr {
        out.push(parse_position(item, r)?);
    }
    Ok(out)
}

fn parse_rings(coords: &Value, r: &Reprojector) -> Result<Vec<Vec<Position>>, GeometryError> {
    let rings = coords
        .as_array()
        .ok_or("coordinates must be an array of position arrays".to_string())?;
    let mut out = Vec::with_capacity(rings.len());
    for ring in rings {
        out.push(parse_positions(ring, r)?);
    }
    Ok(out)
}

fn parse_multi_polygon(
    coords: &Value,
    r: &Reprojector,
) -> Result<Vec<Vec<Vec<Position>>>, GeometryError> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    let mut out = Vec::with_capacity(polys.len());
    for poly in polys {
        out.push(parse_rings(poly, r)?);
    }
    Ok(out)
}
