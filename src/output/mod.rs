pub mod formatter;
pub mod writer;

pub use formatter::{format_level, format_score, format_summary, format_tsv, should_use_colors};
pub use writer::{
    load_manifest, load_score_result, write_json_atomic, ArtifactWriter, OutputSchema, RunManifest,
};
