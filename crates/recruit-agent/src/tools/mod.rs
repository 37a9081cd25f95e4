//! The tools the recruiting assistant can call.

mod bucket_file;
mod candidate;

pub use bucket_file::{BucketFileParameters, DownloadBucketFileTool};
pub use candidate::{CandidateParameters, TraffitCandidateTool};
