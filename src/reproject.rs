use crate::constants::{EPSG_25832, EPSG_4326};
use crate::error::Result;
use crate::types::Geometry;
use proj4rs::transform::transform;
use proj4rs::Proj;

/// Converts geometries from a projected source CRS into WGS84 lon/lat degrees.
///
/// The projection parameter sets are parsed once at construction, not per
/// feature. Transformation is pointwise and all-or-nothing: any failing
/// coordinate fails the whole geometry, so no feature is ever forwarded
/// partially transformed.
pub struct Reprojector {
    source: Proj,
    target: Proj,
}

impl Reprojector {
    pub fn new(source_def: &str) -> Result<Self> {
        Ok(Self {
            source: Proj::from_proj_string(source_def)?,
            target: Proj::from_proj_string(EPSG_4326)?,
        })
    }

    /// Reprojector for ETRS89 / UTM zone 32N, the CRS all NRW open-data
    /// shapefiles are published in.
    pub fn utm32n() -> Result<Self> {
        Self::new(EPSG_25832)
    }

    /// Transforms every coordinate pair while preserving ring and polygon
    /// structure exactly.
    pub fn transform(&self, geometry: &Geometry) -> Result<Geometry> {
        match geometry {
            Geometry::Polygon { coordinates } => Ok(Geometry::Polygon {
                coordinates: self.transform_rings(coordinates)?,
            }),
            Geometry::MultiPolygon { coordinates } => {
                let mut polygons = Vec::with_capacity(coordinates.len());
                for rings in coordinates {
                    polygons.push(self.transform_rings(rings)?);
                }
                Ok(Geometry::MultiPolygon {
                    coordinates: polygons,
                })
            }
        }
    }

    fn transform_rings(&self, rings: &[Vec<[f64; 2]>]) -> Result<Vec<Vec<[f64; 2]>>> {
        rings.iter().map(|ring| self.transform_ring(ring)).collect()
    }

    fn transform_ring(&self, ring: &[[f64; 2]]) -> Result<Vec<[f64; 2]>> {
        let mut out = Vec::with_capacity(ring.len());
        for &[x, y] in ring {
            let mut point = (x, y, 0.0);
            transform(&self.source, &self.target, &mut point)?;
            // proj4rs yields radians for geographic target systems
            out.push([point.0.to_degrees(), point.1.to_degrees()]);
        }
        Ok(out)
    }
}
