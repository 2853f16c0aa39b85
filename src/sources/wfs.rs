use super::FeatureSource;
use crate::error::{HarvestError, Result};
use crate::types::{Geometry, RawFeature};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<WfsFeature>,
    /// Advertised dataset total; logged, never used for paging.
    #[serde(default, rename = "totalFeatures")]
    total_features: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WfsFeature {
    #[serde(default)]
    geometry: Option<Value>,
    #[serde(default)]
    properties: Map<String, Value>,
}

/// Streaming-service adapter: one bounded GetFeature request, features
/// handed out one at a time.
///
/// The canonical CRS is requested from the service directly, so features
/// from this source skip the reprojection stage. If the remote caps the
/// requested count, the run simply sees fewer features; paging is a
/// deliberate non-goal.
pub struct WfsSource {
    features: VecDeque<RawFeature>,
}

impl WfsSource {
    #[instrument(skip(client))]
    pub async fn fetch(
        client: &reqwest::Client,
        url: &str,
        type_name: &str,
        count: u64,
    ) -> Result<Self> {
        let count = count.to_string();
        println!("📥 Fetching WFS {type_name}...");
        let response = client
            .get(url)
            .query(&[
                ("SERVICE", "WFS"),
                ("VERSION", "2.0.0"),
                ("REQUEST", "GetFeature"),
                ("TYPENAMES", type_name),
                ("COUNT", count.as_str()),
                ("SRSNAME", "EPSG:4326"),
                ("OUTPUTFORMAT", "application/json"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(HarvestError::Download {
                status: response.status().as_u16(),
            });
        }
        let collection: FeatureCollection = response.json().await?;
        Ok(Self::from_collection(collection))
    }

    /// Builds a source from an already-parsed feature collection body.
    pub fn from_json(body: Value) -> Result<Self> {
        Ok(Self::from_collection(serde_json::from_value(body)?))
    }

    fn from_collection(collection: FeatureCollection) -> Self {
        let returned = collection.features.len();
        if let Some(total) = &collection.total_features {
            info!(returned, total = %total, "WFS feature collection received");
            println!("   → {returned} features returned (total in dataset: {total})");
        } else {
            println!("   → {returned} features returned");
        }
        let features = collection
            .features
            .into_iter()
            .map(|feature| RawFeature {
                // Non-polygonal or malformed geometries degrade to None and
                // are counted as skipped downstream.
                geometry: feature
                    .geometry
                    .and_then(|g| serde_json::from_value::<Geometry>(g).ok()),
                attributes: feature.properties,
            })
            .collect();
        Self { features }
    }
}

#[async_trait::async_trait]
impl FeatureSource for WfsSource {
    fn source_name(&self) -> &'static str {
        "wfs"
    }

    async fn next_feature(&mut self) -> Result<Option<RawFeature>> {
        Ok(self.features.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection_body() -> Value {
        json!({
            "type": "FeatureCollection",
            "totalFeatures": 271,
            "features": [
                {
                    "type": "Feature",
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[13.4, 52.5], [13.5, 52.5], [13.5, 52.6], [13.4, 52.5]]]
                    },
                    "properties": {"sen_id": "0101", "uesg": "Erpe"}
                },
                {
                    "type": "Feature",
                    "geometry": null,
                    "properties": {"sen_id": "0102"}
                }
            ]
        })
    }

    #[tokio::test]
    async fn yields_features_in_order_then_exhausts() {
        let mut source = WfsSource::from_json(collection_body()).unwrap();

        let first = source.next_feature().await.unwrap().unwrap();
        assert_eq!(first.geometry.as_ref().unwrap().type_name(), "Polygon");
        assert_eq!(first.attributes["uesg"], "Erpe");

        let second = source.next_feature().await.unwrap().unwrap();
        assert!(second.geometry.is_none());

        assert!(source.next_feature().await.unwrap().is_none());
        assert!(source.next_feature().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unparsable_geometry_degrades_to_none() {
        let body = json!({
            "features": [{
                "geometry": {"type": "Point", "coordinates": [13.4, 52.5]},
                "properties": {}
            }]
        });
        let mut source = WfsSource::from_json(body).unwrap();
        let feature = source.next_feature().await.unwrap().unwrap();
        assert!(feature.geometry.is_none());
    }
}
