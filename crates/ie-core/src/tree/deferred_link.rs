use serde::Deserialize;

/// A parent attribute that points at one of its own children.
///
/// Filled after the children of `relation` are persisted, e.g. a merge
/// request's `latest_merge_request_diff_id`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeferredLink {
    pub attribute: String,
    pub relation: String,
}
