use crate::types::RiskZone;

// --- Flood zones (Hochwasser) ---

pub const NRW_FLOOD_BASE_URL: &str =
    "https://www.opengeodata.nrw.de/produkte/umwelt_klima/wasser/hochwasser/hwrm";

pub const BERLIN_WFS_URL: &str = "https://gdi.berlin.de/services/wfs/ua_uesg";
pub const BERLIN_FEATURE_TYPE: &str = "ua_uesg:c_ueberschwemmungsgebiete";

/// The Berlin WFS enforces its own per-call cap; we never page past it.
pub const BERLIN_WFS_MAX_COUNT: u64 = 1000;

pub const FLOOD_TABLE: &str = "geo_hochwasser";
pub const FLOOD_BATCH_SIZE: usize = 200;
pub const FLOOD_STAGING_DIR: &str = "/tmp/hochwasser_harvest";

/// Archive URL for one NRW flood risk zone (EPSG:25832 shapefiles).
pub fn nrw_flood_dataset_url(zone: RiskZone) -> String {
    format!(
        "{}/{}-Ueberschwemmungsgrenzen_EPSG25832_Shape.zip",
        NRW_FLOOD_BASE_URL,
        zone.as_str()
    )
}

// --- Ground values (BORIS Bodenrichtwerte) ---

pub const BORIS_DOWNLOAD_URL: &str =
    "https://www.opengeodata.nrw.de/produkte/infrastruktur_bauen_wohnen/boris/BRW/BRW_EPSG25832_Shape.zip";

pub const BORIS_TABLE: &str = "geo_boris";
pub const BORIS_BATCH_SIZE: usize = 500;
pub const BORIS_STAGING_DIR: &str = "/tmp/brw_nrw_harvest";

// --- Coordinate reference systems ---

/// EPSG:25832 (ETRS89 / UTM zone 32N), the CRS NRW open data is published in.
pub const EPSG_25832: &str =
    "+proj=utm +zone=32 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs";

/// EPSG:4326, the canonical output CRS (WGS84 lon/lat degrees).
pub const EPSG_4326: &str = "+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs";

// --- Normalization ---

/// Sentinel for attributes no known alias resolves.
pub const UNKNOWN: &str = "unbekannt";

/// Municipality name spellings vary per source municipality; tried in order.
pub const GEMEINDE_ALIASES: &[&str] = &["GEMEINDE", "GN", "GENA", "gemeinde"];

pub const LICENSE_DL_DE_ZERO: &str = "dl-de/zero-2-0";
pub const LICENSE_DL_DE_BY: &str = "dl-de/by-2-0";

// --- Dry-run sampling ---

pub const SAMPLE_LIMIT: u64 = 3;
pub const SAMPLE_MAX_CHARS: usize = 600;
