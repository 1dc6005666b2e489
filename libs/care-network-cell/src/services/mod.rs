pub mod network;
pub mod registry;
pub mod store;

pub use network::CareNetworkService;
pub use registry::{Outcome, RelationshipRegistry};
pub use store::{RelationshipStore, SupabaseRelationshipStore};
