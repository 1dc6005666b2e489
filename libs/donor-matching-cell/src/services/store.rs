use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::{StoreError, SupabaseClient};

use crate::models::DonorCandidate;

/// Source of the donor pool. Read fresh on every request.
#[async_trait]
pub trait DonorStore: Send + Sync {
    async fn candidate_pool(&self) -> Result<Vec<DonorCandidate>, StoreError>;
}

pub struct SupabaseDonorStore {
    supabase: SupabaseClient,
}

impl SupabaseDonorStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl DonorStore for SupabaseDonorStore {
    async fn candidate_pool(&self) -> Result<Vec<DonorCandidate>, StoreError> {
        let path = "/rest/v1/donor_profiles?select=id,blood_type,city,state,last_donation_date,next_eligible_date,total_donations,available_for_emergency";
        let donors: Vec<DonorCandidate> = self.supabase.request(Method::GET, path, None).await?;
        debug!("Loaded {} donor profiles", donors.len());
        Ok(donors)
    }
}
