use std::sync::Arc;

use tracing::{debug, info};

use shared_config::AppConfig;

use crate::models::{MatchingError, RankingResult, RequestCriteria};
use crate::services::ranking::{DonorRankingEngine, RankingSettings};
use crate::services::scorer::{DonorScorer, HttpDonorScorer};
use crate::services::store::{DonorStore, SupabaseDonorStore};

pub struct DonorMatchingService {
    store: Arc<dyn DonorStore>,
    scorer: Option<Arc<dyn DonorScorer>>,
    engine: DonorRankingEngine,
}

impl DonorMatchingService {
    pub fn new(config: &AppConfig) -> Self {
        let scorer = HttpDonorScorer::from_config(config).map(|scorer| Arc::new(scorer) as Arc<dyn DonorScorer>);
        Self::with_parts(Arc::new(SupabaseDonorStore::new(config)), scorer, RankingSettings::from(config))
    }

    pub fn with_parts(
        store: Arc<dyn DonorStore>,
        scorer: Option<Arc<dyn DonorScorer>>,
        settings: RankingSettings,
    ) -> Self {
        Self {
            store,
            scorer,
            engine: DonorRankingEngine::new(settings),
        }
    }

    /// Rank donors for a request over a fresh read of the donor pool.
    ///
    /// Fails only when the pool cannot be read or is empty at the source;
    /// scorer trouble is absorbed by the engine.
    pub async fn match_donors(&self, criteria: &RequestCriteria) -> Result<Vec<RankingResult>, MatchingError> {
        debug!(
            "Matching {} donors near {}, {}",
            criteria.blood_type, criteria.location.city, criteria.location.state
        );

        let pool = self.store.candidate_pool().await?;
        if pool.is_empty() {
            return Err(MatchingError::PoolUnavailable("no donor profiles registered".to_string()));
        }

        let results = self
            .engine
            .rank_donors(criteria, &pool, self.scorer.as_deref())
            .await;

        info!(
            "Ranked {} of {} donors for {} request",
            results.len(),
            pool.len(),
            criteria.blood_type
        );
        Ok(results)
    }
}
