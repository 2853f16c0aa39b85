pub mod archive;
pub mod wfs;

pub use archive::ShapefileSource;
pub use wfs::WfsSource;

use crate::error::Result;
use crate::types::RawFeature;

/// One readable pass over a dataset.
///
/// Sources are finite and not restartable: an exhausted source keeps
/// returning `None`, and re-reading a dataset requires a new instance.
#[async_trait::async_trait]
pub trait FeatureSource: Send {
    fn source_name(&self) -> &'static str;

    /// Pulls the next raw feature, or `None` once the dataset is exhausted.
    async fn next_feature(&mut self) -> Result<Option<RawFeature>>;
}
