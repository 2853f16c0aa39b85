use crate::error::{HarvestError, Result};

const DEFAULT_SUPABASE_URL: &str = "https://jkcnvuyklczouglhcoih.supabase.co";

/// Credentials for the PostgREST sink, read from the environment.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub base_url: String,
    pub service_role_key: String,
}

impl SinkConfig {
    /// Loads sink credentials. A `.env` file is honored if present.
    ///
    /// The service-role key is required for any run that writes; validation
    /// happens here, before any download or sink I/O starts.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let base_url = std::env::var("SUPABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SUPABASE_URL.to_string());

        let service_role_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                HarvestError::Config(
                    "SUPABASE_SERVICE_ROLE_KEY not set. Use --dry-run or set env var.".to_string(),
                )
            })?;

        Ok(Self {
            base_url,
            service_role_key,
        })
    }
}
