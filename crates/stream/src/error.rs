use portalspace_assets::FetchError;
use portalspace_common::LinkId;

/// Errors surfaced by the streaming controller.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("no live portal link {0}")]
    UnknownLink(LinkId),
}
