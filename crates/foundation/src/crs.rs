use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::math::mercator::{lon_lat_to_mercator, mercator_to_lon_lat};
use crate::math::tmerc::TransverseMercator;

/// Coordinate reference systems understood by the loaders.
///
/// Serialized as its `EPSG:nnnn` code.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Crs {
    /// EPSG:4326, WGS84 longitude/latitude degrees.
    Wgs84,
    /// EPSG:4258, ETRS89 longitude/latitude degrees.
    Etrs89,
    /// EPSG:3857, spherical Web Mercator meters.
    #[default]
    WebMercator,
    /// EPSG:2180, Poland CS92 transverse Mercator meters.
    Puwg1992,
}

impl Crs {
    pub const ALL: [Crs; 4] = [Crs::Wgs84, Crs::Etrs89, Crs::WebMercator, Crs::Puwg1992];

    pub fn code(self) -> &'static str {
        match self {
            Crs::Wgs84 => "EPSG:4326",
            Crs::Etrs89 => "EPSG:4258",
            Crs::WebMercator => "EPSG:3857",
            Crs::Puwg1992 => "EPSG:2180",
        }
    }

    pub fn is_geographic(self) -> bool {
        matches!(self, Crs::Wgs84 | Crs::Etrs89)
    }

    fn unproject(self, [x, y]: [f64; 2]) -> [f64; 2] {
        match self {
            // ETRS89 and WGS84 differ by well under a meter; the datum shift is zero here.
            Crs::Wgs84 | Crs::Etrs89 => [x, y],
            Crs::WebMercator => mercator_to_lon_lat(x, y),
            Crs::Puwg1992 => TransverseMercator::PUWG_1992.inverse(x, y),
        }
    }

    fn project(self, [lon, lat]: [f64; 2]) -> [f64; 2] {
        match self {
            Crs::Wgs84 | Crs::Etrs89 => [lon, lat],
            Crs::WebMercator => lon_lat_to_mercator(lon, lat),
            Crs::Puwg1992 => TransverseMercator::PUWG_1992.forward(lon, lat),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrsError {
    Unsupported(String),
}

impl fmt::Display for CrsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsError::Unsupported(code) => write!(f, "unsupported coordinate system: {code}"),
        }
    }
}

impl std::error::Error for CrsError {}

impl FromStr for Crs {
    type Err = CrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("EPSG:"))
            .map(|_| &trimmed[5..])
            .unwrap_or(trimmed);
        match number {
            "4326" => Ok(Crs::Wgs84),
            "4258" => Ok(Crs::Etrs89),
            "3857" | "900913" => Ok(Crs::WebMercator),
            "2180" => Ok(Crs::Puwg1992),
            _ => Err(CrsError::Unsupported(trimmed.to_string())),
        }
    }
}

impl TryFrom<String> for Crs {
    type Error = CrsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.code().to_string()
    }
}

/// A position that could not be carried between two systems.
#[derive(Debug, Clone, PartialEq)]
pub struct ReprojectError {
    pub position: [f64; 2],
    pub from: Crs,
    pub to: Crs,
}

impl fmt::Display for ReprojectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot reproject ({}, {}) from {} to {}",
            self.position[0], self.position[1], self.from, self.to
        )
    }
}

impl std::error::Error for ReprojectError {}

/// Converts positions from one [`Crs`] to another through geographic degrees.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Reprojector {
    source: Crs,
    target: Crs,
}

impl Reprojector {
    pub fn new(source: Crs, target: Crs) -> Self {
        Self { source, target }
    }

    pub fn identity(crs: Crs) -> Self {
        Self::new(crs, crs)
    }

    pub fn source(&self) -> Crs {
        self.source
    }

    pub fn target(&self) -> Crs {
        self.target
    }

    pub fn is_identity(&self) -> bool {
        self.source == self.target
            || (self.source.is_geographic() && self.target.is_geographic())
    }

    pub fn reproject(&self, position: [f64; 2]) -> Result<[f64; 2], ReprojectError> {
        let err = || ReprojectError {
            position,
            from: self.source,
            to: self.target,
        };

        if !position.iter().all(|v| v.is_finite()) {
            return Err(err());
        }
        if self.is_identity() {
            return Ok(position);
        }

        let out = self.target.project(self.source.unproject(position));
        if out.iter().all(|v| v.is_finite()) {
            Ok(out)
        } else {
            Err(err())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Crs, CrsError, Reprojector};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn parses_epsg_codes() {
        assert_eq!("EPSG:4258".parse::<Crs>(), Ok(Crs::Etrs89));
        assert_eq!("epsg:2180".parse::<Crs>(), Ok(Crs::Puwg1992));
        assert_eq!(" 3857 ".parse::<Crs>(), Ok(Crs::WebMercator));
        assert_eq!(
            "EPSG:32634".parse::<Crs>(),
            Err(CrsError::Unsupported("EPSG:32634".to_string()))
        );
    }

    #[test]
    fn codes_round_trip() {
        for crs in Crs::ALL {
            assert_eq!(crs.code().parse::<Crs>(), Ok(crs));
        }
    }

    #[test]
    fn serializes_as_code() {
        let json = serde_json::to_string(&Crs::Puwg1992).unwrap();
        assert_eq!(json, "\"EPSG:2180\"");
        let back: Crs = serde_json::from_str("\"EPSG:4258\"").unwrap();
        assert_eq!(back, Crs::Etrs89);
        assert!(serde_json::from_str::<Crs>("\"EPSG:1\"").is_err());
    }

    #[test]
    fn geographic_to_geographic_is_identity() {
        let r = Reprojector::new(Crs::Etrs89, Crs::Wgs84);
        assert!(r.is_identity());
        assert_eq!(r.reproject([19.5, 51.9]).unwrap(), [19.5, 51.9]);
    }

    #[test]
    fn etrs89_to_web_mercator() {
        let r = Reprojector::new(Crs::Etrs89, Crs::WebMercator);
        let [x, y] = r.reproject([180.0, 0.0]).unwrap();
        assert_close(x, 20_037_508.342_789_244, 1e-6);
        assert_close(y, 0.0, 1e-6);
    }

    #[test]
    fn puwg1992_to_web_mercator_matches_geographic_path() {
        let to_merc = Reprojector::new(Crs::Puwg1992, Crs::WebMercator);
        let from_geo = Reprojector::new(Crs::Etrs89, Crs::WebMercator);
        let to_puwg = Reprojector::new(Crs::Etrs89, Crs::Puwg1992);

        let grid = to_puwg.reproject([21.0, 52.2]).unwrap();
        let via_grid = to_merc.reproject(grid).unwrap();
        let direct = from_geo.reproject([21.0, 52.2]).unwrap();
        assert_close(via_grid[0], direct[0], 0.05);
        assert_close(via_grid[1], direct[1], 0.05);
    }

    #[test]
    fn rejects_non_finite_positions() {
        let r = Reprojector::new(Crs::Etrs89, Crs::WebMercator);
        let err = r.reproject([f64::NAN, 50.0]).unwrap_err();
        assert_eq!(err.from, Crs::Etrs89);
        assert!(err.to_string().contains("EPSG:3857"));
    }
}
