use super::FeatureSource;
use crate::error::{HarvestError, Result};
use crate::types::{Geometry, RawFeature};
use serde_json::{Map, Number, Value};
use shapefile::dbase::FieldValue;
use std::path::Path;
use std::sync::mpsc::{sync_channel, Receiver};
use std::thread;
use tracing::debug;

/// Archive-file adapter: streams one `RawFeature` per shape record from a
/// `.shp`/`.dbf` pair resolved by the cache manager.
///
/// Geometries are emitted in the source's projected CRS; reprojection is the
/// caller's responsibility. Record reads run on a dedicated thread behind a
/// bounded channel so the file is only read as far as the run actually pulls.
pub struct ShapefileSource {
    records: Receiver<Result<RawFeature>>,
}

impl ShapefileSource {
    pub fn open(shp_path: &Path) -> Result<Self> {
        debug!(path = %shp_path.display(), "opening shapefile pair");
        let mut reader = shapefile::Reader::from_path(shp_path)?;
        let (tx, rx) = sync_channel(1);
        thread::spawn(move || {
            for pair in reader.iter_shapes_and_records() {
                let item = pair
                    .map(|(shape, record)| RawFeature {
                        geometry: shape_to_geometry(shape),
                        attributes: record_to_attributes(record),
                    })
                    .map_err(HarvestError::from);
                // A dropped receiver means the run stopped pulling; stop reading.
                if tx.send(item).is_err() {
                    break;
                }
            }
        });
        Ok(Self { records: rx })
    }
}

#[async_trait::async_trait]
impl FeatureSource for ShapefileSource {
    fn source_name(&self) -> &'static str {
        "shapefile"
    }

    async fn next_feature(&mut self) -> Result<Option<RawFeature>> {
        match self.records.recv() {
            Ok(item) => item.map(Some),
            // Sender gone: the reader thread finished the file.
            Err(_) => Ok(None),
        }
    }
}

/// Shapefiles encode polygons and multipolygons in one record type; ring
/// grouping decides which GeoJSON shape comes out.
fn shape_to_geometry(shape: shapefile::Shape) -> Option<Geometry> {
    match shape {
        shapefile::Shape::Polygon(polygon) => {
            let multi = geo_types::MultiPolygon::<f64>::from(polygon);
            let mut polygons: Vec<Vec<Vec<[f64; 2]>>> =
                multi.0.into_iter().map(polygon_rings).collect();
            match polygons.len() {
                0 => None,
                1 => Some(Geometry::Polygon {
                    coordinates: polygons.remove(0),
                }),
                _ => Some(Geometry::MultiPolygon {
                    coordinates: polygons,
                }),
            }
        }
        _ => None,
    }
}

fn polygon_rings(polygon: geo_types::Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    let (exterior, interiors) = polygon.into_inner();
    let mut rings = vec![line_string_points(exterior)];
    rings.extend(interiors.into_iter().map(line_string_points));
    rings
}

fn line_string_points(line: geo_types::LineString<f64>) -> Vec<[f64; 2]> {
    line.0.into_iter().map(|c| [c.x, c.y]).collect()
}

fn record_to_attributes(record: shapefile::dbase::Record) -> Map<String, Value> {
    record
        .into_iter()
        .map(|(name, value)| (name, field_to_json(value)))
        .collect()
}

fn field_to_json(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(v) => v.map(Value::String).unwrap_or(Value::Null),
        FieldValue::Numeric(v) => v
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::Float(v) => v
            .and_then(|n| Number::from_f64(f64::from(n)))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::Integer(v) => Value::Number(v.into()),
        FieldValue::Double(v) => Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::Logical(v) => v.map(Value::Bool).unwrap_or(Value::Null),
        FieldValue::Date(v) => v
            .and_then(|d| {
                chrono::NaiveDate::from_ymd_opt(d.year() as i32, d.month(), d.day())
            })
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        other => Value::String(format!("{other:?}")),
    }
}
