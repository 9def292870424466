//! Rendering adapter: the scene interface the streaming core drives.
//!
//! # Invariants
//! - The scene never mutates streaming state; it only reports crossings.
//! - Every object is addressed by an opaque [`RenderHandle`](portalspace_common::RenderHandle).
//!
//! [`HeadlessScene`] implements the trait in memory for tests, benches and
//! the CLI. A GPU backend implements the same trait without changing
//! consumers.

mod headless;
mod scene;

pub use headless::{HeadlessScene, NodeKind, SceneNode};
pub use scene::{AssetCompletion, AssetRequest, CrossingEvent, PortalPair, Scene, SceneError};

pub fn crate_info() -> &'static str {
    "portalspace-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
