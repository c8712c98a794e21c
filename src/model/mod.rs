//! Canonical issue-tracker entities.
//!
//! Stories and bugs are deserialized from the on-disk dataset document.
//! Fields the engine does not consume are preserved verbatim in a flattened
//! map so they survive a round trip and can be echoed back by search results.

mod issue;

pub use issue::{Bug, IssueDataset, IssueKind, IssueRecord, Story};
