//! Submission and comment records
//!
//! Raw payload types decoded from the search API, the cleaned records the
//! harvester works with, and the row layouts used when writing them out.

pub mod clean;
mod types;

pub use clean::normalize_text;
pub use types::{
    ChildRecord, CommentRow, ParentRecord, RawComment, RawSubmission, SearchResponse,
    SubmissionRow,
};
