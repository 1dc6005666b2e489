pub mod compatibility;
pub mod matching;
pub mod ranking;
pub mod scorer;
pub mod store;

pub use compatibility::{can_donate_to, can_receive_from, is_compatible};
pub use matching::DonorMatchingService;
pub use ranking::{DonorRankingEngine, RankingSettings};
pub use scorer::{DonorScorer, HttpDonorScorer, ScoreRequest, ScoreResponse, ScorerHealth};
pub use store::{DonorStore, SupabaseDonorStore};
