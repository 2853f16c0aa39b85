use crate::error::{HarvestError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lifecycle of one staged dataset artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Absent,
    Downloading,
    Ready,
}

/// Owns the local staging area for downloaded dataset archives.
///
/// An artifact is downloaded and unpacked at most once per staging directory.
/// A present payload file is never re-validated against the remote: source
/// datasets are batch drops, not live feeds, so staleness is accepted.
pub struct CacheManager {
    staging_dir: PathBuf,
    client: reqwest::Client,
}

impl CacheManager {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Current state of a dataset's staging subdirectory.
    pub fn state(&self, dataset_key: &str) -> CacheState {
        match find_payload(&self.staging_dir.join(dataset_key)) {
            Ok(Some(_)) => CacheState::Ready,
            _ => CacheState::Absent,
        }
    }

    /// Resolves a dataset to a local `.shp` payload path, downloading and
    /// unpacking the archive only when no payload is staged yet.
    pub async fn resolve(&self, dataset_key: &str, url: &str) -> Result<PathBuf> {
        let dir = self.staging_dir.join(dataset_key);
        fs::create_dir_all(&dir)?;

        if let Some(existing) = find_payload(&dir)? {
            println!("📦 Using cached shapefile: {}", existing.display());
            debug!(dataset = dataset_key, path = %existing.display(), "cache hit");
            return Ok(existing);
        }

        info!(dataset = dataset_key, url, state = ?CacheState::Downloading, "cache miss, downloading archive");
        println!("📥 Downloading {dataset_key} shapefile archive...");
        println!("   URL: {url}");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(HarvestError::Download {
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        let zip_path = dir.join("data.zip");
        fs::write(&zip_path, &bytes)?;
        println!("✅ Downloaded.");

        println!("📦 Extracting...");
        let file = fs::File::open(&zip_path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        archive.extract(&dir)?;

        let payload = find_payload(&dir)?.ok_or_else(|| {
            HarvestError::Extraction(format!("archive for {dataset_key} contains no .shp file"))
        })?;
        println!("✅ Extracted: {}", payload.display());
        debug!(dataset = dataset_key, state = ?CacheState::Ready, "artifact staged");
        Ok(payload)
    }
}

/// First lexicographic `.shp` inside the dataset directory, if any.
fn find_payload(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let mut shapefiles: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("shp"))
                .unwrap_or(false)
        })
        .collect();
    shapefiles.sort();
    Ok(shapefiles.into_iter().next())
}
