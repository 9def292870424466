//! World documents: the JSON boundary and the sources that fetch them.
//!
//! # Invariants
//! - A parsed [`WorldDocument`] is never mutated; placement in shared space
//!   is derived by the streaming core.
//! - Positions and rotations are converted to fixed-layout glam types once,
//!   at parse time.

mod document;
mod source;

pub use document::{PortalDescriptor, PortalDestination, WorldDocument};
pub use source::{DirectorySource, DocumentSource, FetchError, MemorySource};

pub fn crate_info() -> &'static str {
    "portalspace-assets v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("assets"));
    }
}
