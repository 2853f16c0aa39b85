use crate::error::HarvestError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Polygonal geometry, serialized exactly as GeoJSON.
///
/// The same shape carries both source-CRS meter coordinates (as read from a
/// shapefile) and canonical WGS84 lon/lat degrees (after reprojection, or as
/// delivered by a WFS that was asked for EPSG:4326 directly). The pipeline
/// stage determines which one a value holds; the structure itself — ring
/// order, point order, polygon nesting — is never altered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
        }
    }

    /// Arithmetic mean of the outer-ring vertices.
    ///
    /// Returns `None` for degenerate geometries without any outer-ring point.
    pub fn centroid(&self) -> Option<[f64; 2]> {
        let points: Vec<[f64; 2]> = match self {
            Geometry::Polygon { coordinates } => coordinates.first()?.clone(),
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .filter_map(|polygon| polygon.first())
                .flatten()
                .copied()
                .collect(),
        };
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
        Some([sx / n, sy / n])
    }
}

/// One feature as emitted by a source adapter, before normalization.
///
/// A `None` geometry marks a feature that must be counted as skipped and
/// never forwarded downstream.
#[derive(Debug, Clone)]
pub struct RawFeature {
    pub geometry: Option<Geometry>,
    pub attributes: Map<String, Value>,
}

/// NRW flood risk zone categories, one shapefile archive each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskZone {
    Hq100,
    HqHaeufig,
    HqExtrem,
}

impl RiskZone {
    /// Declared harvest order.
    pub const ALL: [RiskZone; 3] = [RiskZone::Hq100, RiskZone::HqHaeufig, RiskZone::HqExtrem];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskZone::Hq100 => "HQ100",
            RiskZone::HqHaeufig => "HQhaeufig",
            RiskZone::HqExtrem => "HQextrem",
        }
    }
}

impl fmt::Display for RiskZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskZone {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hq100" => Ok(RiskZone::Hq100),
            "hqhaeufig" => Ok(RiskZone::HqHaeufig),
            "hqextrem" => Ok(RiskZone::HqExtrem),
            other => Err(HarvestError::Config(format!("unknown risikozone: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn geometry_serializes_as_geojson() {
        let geometry = Geometry::Polygon {
            coordinates: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
        };
        let value = serde_json::to_value(&geometry).unwrap();
        assert_eq!(value["type"], "Polygon");
        assert_eq!(value["coordinates"][0][1], json!([1.0, 0.0]));
    }

    #[test]
    fn geometry_deserializes_multipolygon() {
        let value = json!({
            "type": "MultiPolygon",
            "coordinates": [[[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 0.0]]]]
        });
        let geometry: Geometry = serde_json::from_value(value).unwrap();
        assert_eq!(geometry.type_name(), "MultiPolygon");
    }

    #[test]
    fn centroid_averages_outer_ring() {
        let geometry = Geometry::Polygon {
            coordinates: vec![
                vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]],
                // Inner rings do not contribute
                vec![[1.0, 1.0], [2.0, 1.0], [2.0, 2.0]],
            ],
        };
        assert_eq!(geometry.centroid(), Some([2.0, 2.0]));
    }

    #[test]
    fn risk_zone_round_trips_names() {
        for zone in RiskZone::ALL {
            assert_eq!(zone.as_str().parse::<RiskZone>().unwrap(), zone);
        }
        assert!("HQ42".parse::<RiskZone>().is_err());
    }
}
