pub mod s3;
pub mod traits;

pub use s3::S3ArtifactStore;
pub use traits::ArtifactStore;

use chrono::Utc;

/// Object key for a generated candidate: unique per time, call and candidate.
pub fn candidate_key(prefix: &str, call_number: u32, candidate_index: usize) -> String {
    format!(
        "{}/{}-call{}-cand{}.png",
        prefix.trim_end_matches('/'),
        Utc::now().timestamp_millis(),
        call_number,
        candidate_index
    )
}
