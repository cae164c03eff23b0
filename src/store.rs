//! Process-lifetime dataset cache.
//!
//! Each dataset is fetched and parsed at most once per process; concurrent
//! first callers coalesce onto the same in-flight load instead of issuing
//! duplicate fetches. A failed load leaves the slot empty so the next call
//! retries. Cached values are immutable (`Arc`) and only replaced by process
//! restart; there is no partial update path.
//!
//! Stale-response handling is the caller's concern: a consumer that changes
//! its target id mid-flight should drop the old future (cancelling it) or
//! compare the id it captured at request time before using the result.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::OnceCell;

use crate::{
    config::{ConfigError, DataConfig},
    datasets::{CampusTable, DistrictTable, SpendingTable},
    fetch::{FetchError, Fetcher},
    geo::FeatureCollection,
};

/// Why a dataset could not be produced: the URL was never configured, or the
/// transport failed. "Loaded but empty" is not an error.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub struct DataStore {
    config: DataConfig,
    fetcher: Fetcher,
    districts: OnceCell<Arc<DistrictTable>>,
    campuses: OnceCell<Arc<CampusTable>>,
    spending: OnceCell<Arc<SpendingTable>>,
    districts_geo: OnceCell<Arc<FeatureCollection>>,
    campuses_geo: OnceCell<Arc<FeatureCollection>>,
}

impl DataStore {
    pub fn new(config: DataConfig, fetcher: Fetcher) -> Self {
        DataStore {
            config,
            fetcher,
            districts: OnceCell::new(),
            campuses: OnceCell::new(),
            spending: OnceCell::new(),
            districts_geo: OnceCell::new(),
            campuses_geo: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    pub async fn districts(&self) -> Result<Arc<DistrictTable>, LoadError> {
        self.districts
            .get_or_try_init(|| async {
                let url = self.config.require_districts_csv()?;
                let text = self.fetcher.text(url).await?;
                Ok(Arc::new(DistrictTable::from_csv(&text)))
            })
            .await
            .cloned()
    }

    pub async fn campuses(&self) -> Result<Arc<CampusTable>, LoadError> {
        self.campuses
            .get_or_try_init(|| async {
                let url = self.config.require_campuses_csv()?;
                let text = self.fetcher.text(url).await?;
                Ok(Arc::new(CampusTable::from_csv(&text)))
            })
            .await
            .cloned()
    }

    pub async fn spending(&self) -> Result<Arc<SpendingTable>, LoadError> {
        self.spending
            .get_or_try_init(|| async {
                let url = self.config.require_spending_csv()?;
                let text = self.fetcher.text(url).await?;
                Ok(Arc::new(SpendingTable::from_csv(&text)))
            })
            .await
            .cloned()
    }

    pub async fn districts_geojson(&self) -> Result<Arc<FeatureCollection>, LoadError> {
        self.districts_geo
            .get_or_try_init(|| async {
                let url = self.config.require_districts_geojson()?;
                let collection: FeatureCollection = self.fetcher.json(url).await?;
                Ok(Arc::new(collection))
            })
            .await
            .cloned()
    }

    /// Campus point GeoJSON; callers check the config before asking, since a
    /// missing URL here usually means "synthesize points from the CSV".
    pub async fn campuses_geojson(&self) -> Result<Arc<FeatureCollection>, LoadError> {
        self.campuses_geo
            .get_or_try_init(|| async {
                let url = self
                    .config
                    .campuses_geojson
                    .as_deref()
                    .ok_or(ConfigError::Missing {
                        dataset: "campus GeoJSON",
                        env_var: crate::config::ENV_CAMPUSES_GEOJSON,
                        key: "campuses_geojson",
                    })?;
                let collection: FeatureCollection = self.fetcher.json(url).await?;
                Ok(Arc::new(collection))
            })
            .await
            .cloned()
    }
}
