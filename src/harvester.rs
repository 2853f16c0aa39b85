use crate::cache::CacheManager;
use crate::constants::{
    nrw_flood_dataset_url, BERLIN_FEATURE_TYPE, BERLIN_WFS_MAX_COUNT, BERLIN_WFS_URL,
    BORIS_BATCH_SIZE, BORIS_DOWNLOAD_URL, BORIS_TABLE, FLOOD_BATCH_SIZE, FLOOD_TABLE,
    SAMPLE_LIMIT, SAMPLE_MAX_CHARS,
};
use crate::error::{HarvestError, Result};
use crate::loader::BatchLoader;
use crate::normalize;
use crate::reproject::Reprojector;
use crate::sink::Sink;
use crate::sources::{FeatureSource, ShapefileSource, WfsSource};
use crate::types::{Geometry, RiskZone};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Aggregate counters for one harvest run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunCounters {
    pub read: u64,
    pub upserted: u64,
    pub skipped: u64,
}

/// Configuration shared by every harvester.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Global feature ceiling across all sub-datasets; `u64::MAX` means
    /// unbounded.
    pub limit: u64,
    /// Perform every stage except sink writes; print sampled rows instead.
    pub dry_run: bool,
}

/// Which flood source(s) to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodSource {
    Berlin,
    Nrw,
}

impl fmt::Display for FloodSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FloodSource::Berlin => "berlin",
            FloodSource::Nrw => "nrw",
        })
    }
}

impl FromStr for FloodSource {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "berlin" => Ok(FloodSource::Berlin),
            "nrw" => Ok(FloodSource::Nrw),
            other => Err(HarvestError::Config(format!("unknown source: {other}"))),
        }
    }
}

/// Sub-dataset selection for the flood harvester.
#[derive(Debug, Clone, Default)]
pub struct FloodOptions {
    pub source: Option<FloodSource>,
    pub risikozone: Option<RiskZone>,
}

impl FloodOptions {
    fn includes_berlin(&self) -> bool {
        self.source.map_or(true, |s| s == FloodSource::Berlin)
    }

    fn includes_nrw(&self) -> bool {
        self.source.map_or(true, |s| s == FloodSource::Nrw)
    }

    fn zones(&self) -> Vec<RiskZone> {
        match self.risikozone {
            Some(zone) => vec![zone],
            None => RiskZone::ALL.to_vec(),
        }
    }
}

/// What the normalizer decided about one feature.
pub enum Normalized {
    Row(Value),
    /// A required field was unusable; counted as skipped.
    Skip,
    /// Excluded by a run filter; counted as read only.
    Filtered,
}

/// Owns the state of one harvest invocation: counters, staging area, sink.
///
/// Sub-datasets run sequentially in declared order; features are pulled one
/// at a time and reprojected, normalized, and batched inline before the next
/// pull.
pub struct HarvestRun {
    options: RunOptions,
    counters: RunCounters,
    sink: Option<Arc<dyn Sink>>,
    cache: CacheManager,
    client: reqwest::Client,
}

impl HarvestRun {
    pub fn new(
        options: RunOptions,
        sink: Option<Arc<dyn Sink>>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            options,
            counters: RunCounters::default(),
            sink,
            cache: CacheManager::new(staging_dir),
            client: reqwest::Client::new(),
        }
    }

    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    fn remaining(&self) -> u64 {
        self.options.limit.saturating_sub(self.counters.read)
    }

    fn sink_for_writes(&self) -> Option<Arc<dyn Sink>> {
        if self.options.dry_run {
            None
        } else {
            self.sink.clone()
        }
    }

    /// Harvests flood-risk zones: Berlin WFS first, then the NRW shapefile
    /// archives in fixed zone order. Later sub-datasets still run when one
    /// dataset exhausts itself early, as long as the global limit has room.
    #[instrument(skip(self))]
    pub async fn harvest_flood(&mut self, filter: &FloodOptions) -> Result<RunCounters> {
        if filter.includes_berlin() && self.remaining() > 0 {
            println!("━━━ Berlin (WFS) ━━━");
            let count = self.remaining().min(BERLIN_WFS_MAX_COUNT);
            let mut source =
                WfsSource::fetch(&self.client, BERLIN_WFS_URL, BERLIN_FEATURE_TYPE, count).await?;
            let loader = BatchLoader::new(self.sink_for_writes(), FLOOD_TABLE, FLOOD_BATCH_SIZE);
            self.drain_source(&mut source, None, loader, |geometry, attributes| {
                Normalized::Row(normalize::normalize_berlin_flood(geometry, attributes))
            })
            .await?;
            println!();
        }

        if filter.includes_nrw() {
            let reprojector = Reprojector::utm32n()?;
            for zone in filter.zones() {
                if self.remaining() == 0 {
                    break;
                }
                println!("━━━ NRW {zone} (Shapefile) ━━━");
                let url = nrw_flood_dataset_url(zone);
                let shp_path = self.cache.resolve(zone.as_str(), &url).await?;
                let mut source = ShapefileSource::open(&shp_path)?;
                let loader =
                    BatchLoader::new(self.sink_for_writes(), FLOOD_TABLE, FLOOD_BATCH_SIZE);
                self.drain_source(
                    &mut source,
                    Some(&reprojector),
                    loader,
                    |geometry, attributes| {
                        Normalized::Row(normalize::normalize_nrw_flood(
                            geometry, attributes, zone, &url,
                        ))
                    },
                )
                .await?;
                println!();
            }
        }

        info!(
            read = self.counters.read,
            upserted = self.counters.upserted,
            skipped = self.counters.skipped,
            "flood harvest finished"
        );
        Ok(self.counters)
    }

    /// Harvests NRW BORIS ground values from the single BRW archive,
    /// optionally restricted to one municipality.
    #[instrument(skip(self))]
    pub async fn harvest_ground_values(&mut self, gemeinde: Option<&str>) -> Result<RunCounters> {
        let shp_path = self.cache.resolve("brw", BORIS_DOWNLOAD_URL).await?;
        let mut source = ShapefileSource::open(&shp_path)?;
        let reprojector = Reprojector::utm32n()?;
        let loader = BatchLoader::new(self.sink_for_writes(), BORIS_TABLE, BORIS_BATCH_SIZE);
        self.drain_source(
            &mut source,
            Some(&reprojector),
            loader,
            |geometry, attributes| {
                if let Some(filter) = gemeinde {
                    if normalize::gemeinde_name(attributes) != filter {
                        return Normalized::Filtered;
                    }
                }
                match normalize::normalize_ground_value(geometry, attributes, BORIS_DOWNLOAD_URL) {
                    Some(row) => Normalized::Row(row),
                    None => Normalized::Skip,
                }
            },
        )
        .await?;

        info!(
            read = self.counters.read,
            upserted = self.counters.upserted,
            skipped = self.counters.skipped,
            "ground-value harvest finished"
        );
        Ok(self.counters)
    }

    /// Drives one source adapter: pulls features up to the remaining global
    /// limit, reprojects when a reprojector is given, normalizes, batches,
    /// and finally flushes.
    ///
    /// Features with null or untransformable geometry are counted as read
    /// and skipped, and never forwarded.
    pub async fn drain_source<S, F>(
        &mut self,
        source: &mut S,
        reprojector: Option<&Reprojector>,
        mut loader: BatchLoader,
        mut normalize: F,
    ) -> Result<()>
    where
        S: FeatureSource + ?Sized,
        F: FnMut(Geometry, &Map<String, Value>) -> Normalized,
    {
        let mut sampled = 0;
        while self.remaining() > 0 {
            let feature = match source.next_feature().await {
                Ok(Some(feature)) => feature,
                Ok(None) => break,
                Err(e) => {
                    // Keep upserted honest even when the adapter dies mid-run.
                    self.counters.upserted += loader.finish().await;
                    return Err(e);
                }
            };
            self.counters.read += 1;

            let Some(geometry) = feature.geometry else {
                self.counters.skipped += 1;
                continue;
            };
            let geometry = match reprojector {
                Some(reprojector) => match reprojector.transform(&geometry) {
                    Ok(transformed) => transformed,
                    Err(e) => {
                        warn!(source = source.source_name(), "dropping untransformable geometry: {}", e);
                        self.counters.skipped += 1;
                        continue;
                    }
                },
                None => geometry,
            };

            match normalize(geometry, &feature.attributes) {
                Normalized::Row(row) => {
                    if self.options.dry_run && sampled < SAMPLE_LIMIT {
                        sampled += 1;
                        println!("{}", format_sample(sampled, &row));
                    }
                    loader.accumulate(row).await;
                }
                Normalized::Skip => self.counters.skipped += 1,
                Normalized::Filtered => {}
            }
        }
        self.counters.upserted += loader.finish().await;
        Ok(())
    }
}

/// Human-readable sample of one normalized row, with bulky geometry elided.
/// Samples are numbered per sub-dataset, starting at 1.
fn format_sample(index: u64, row: &Value) -> String {
    let mut display = row.clone();
    if let Some(object) = display.as_object_mut() {
        if let Some(geometry) = object.get_mut("geometry") {
            let label = geometry
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("geometry")
                .to_string();
            *geometry = Value::String(format!("[{label}]"));
        }
        if let Some(raw_data) = object.get_mut("raw_data").and_then(Value::as_object_mut) {
            if raw_data.contains_key("polygon") {
                raw_data.insert("polygon".to_string(), Value::String("[omitted]".to_string()));
            }
        }
    }
    let text = serde_json::to_string_pretty(&display).unwrap_or_default();
    let truncated: String = text.chars().take(SAMPLE_MAX_CHARS).collect();
    format!("📋 Sample #{index}: {truncated}")
}
