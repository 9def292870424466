use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position and orientation in some world's frame.
///
/// Serializes as `{"position": [x, y, z], "rotation": [x, y, z, w]}`; a
/// missing rotation reads as identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Same orientation, position moved by `offset`.
    pub fn translated(self, offset: Vec3) -> Self {
        Self {
            position: self.position + offset,
            rotation: self.rotation,
        }
    }

    /// Direction the pose faces (-Z rotated into this frame).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Grid slot a loaded world occupies in shared space.
///
/// Slot 0 is reserved for the traversal root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot(pub u32);

impl Slot {
    pub const ROOT: Slot = Slot(0);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle to an object owned by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RenderHandle(pub u64);

/// Identifies one live portal link for crossing notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_default_is_identity() {
        let p = Pose::default();
        assert_eq!(p.position, Vec3::ZERO);
        assert_eq!(p.rotation, Quat::IDENTITY);
    }

    #[test]
    fn pose_reads_json_arrays() {
        let p: Pose =
            serde_json::from_str(r#"{"position":[1,2,3],"rotation":[0,0,0,1]}"#).unwrap();
        assert_eq!(p.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.rotation, Quat::IDENTITY);
    }

    #[test]
    fn pose_rotation_is_optional() {
        let p: Pose = serde_json::from_str(r#"{"position":[0,1,0]}"#).unwrap();
        assert_eq!(p.rotation, Quat::IDENTITY);
    }

    #[test]
    fn translated_keeps_rotation() {
        let r = Quat::from_rotation_y(1.0);
        let p = Pose::new(Vec3::X, r).translated(Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(p.position, Vec3::new(1.0, 5.0, 0.0));
        assert_eq!(p.rotation, r);
    }

    #[test]
    fn root_slot() {
        assert!(Slot::ROOT.is_root());
        assert!(!Slot(3).is_root());
        assert_eq!(Slot(3).to_string(), "#3");
    }
}
