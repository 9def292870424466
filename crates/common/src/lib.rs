//! Shared value types: poses, world identities, slots and collaborator handles.

mod types;
mod url;

pub use types::{LinkId, Pose, RenderHandle, Slot};
pub use self::url::{UrlError, WorldUrl};

pub fn crate_info() -> &'static str {
    "portalspace-common v0.1.0"
}
