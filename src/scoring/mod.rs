pub mod aggregate;
pub mod eta;
pub mod explicit;
pub mod implicit;
pub mod result;

pub use aggregate::{Accumulator, Rollup, WeightedAxisMean, WeightedMean};
pub use eta::{score_eta, EtaReport};
pub use explicit::{score_explicit, ExplicitReport};
pub use implicit::{cosine_similarity, normalized_similarity, score_implicit, ImplicitReport};
pub use result::{AxisScores, Level, Metric, ScoreAxis, ScoreResult, MODEL_KEY};
