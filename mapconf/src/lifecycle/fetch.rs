use serde::{Deserialize, Serialize};

/// Identifies the group state a fetch was issued for.
///
/// The generation changes every time the group is materialised again, so completions of fetches
/// issued before a removal or a replacement are recognised as stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchTicket {
    /// Group id.
    pub group_id: String,
    /// Generation of the group entry.
    pub generation: u64,
}

/// Document the application must load and hand back with
/// [`complete_fetch`](super::LayerLifecycleManager::complete_fetch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Ticket to return with the result.
    pub ticket: FetchTicket,
    /// Url of the document.
    pub url: String,
}
