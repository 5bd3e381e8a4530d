// Core algorithm exports
pub mod classifier;
pub mod comparators;
pub mod filters;
pub mod pipeline;
pub mod ranker;
pub mod scorer;
pub mod tiers;

pub use classifier::{classify, PreferencePartition};
pub use comparators::{default_comparators, Comparator};
pub use filters::apply_hard_filters;
pub use pipeline::{batch_size, MatchPipeline, PipelineConfig};
pub use ranker::{rank, resort, tier_alignment, SortKey, SortOrder};
pub use scorer::{FitScorer, MatchScorer};
pub use tiers::{select_overlap, TierSelector};
