//! In-memory stores for brands, signatures and evaluations.
//!
//! Each store owns its own synchronization. Internal locks are held only
//! for a single map access; none is held across a collaborator call except
//! the per-brand creation gate in [`SignatureStore`].

mod brands;
mod evaluations;
mod signatures;

pub use brands::BrandRegistry;
pub use evaluations::EvaluationStore;
pub use signatures::SignatureStore;
