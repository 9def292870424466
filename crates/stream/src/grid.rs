use glam::Vec3;
use portalspace_common::{Pose, Slot};
use serde::{Deserialize, Serialize};

/// Grid cell a slot maps to: column, row and vertical layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub x: u32,
    pub z: u32,
    pub layer: u32,
}

/// Tiling of shared space into equally sized cells, one world per cell.
///
/// Cells are laid out `columns` wide (X) and `rows` deep (Z) per layer;
/// layers stack upwards without bound. Worlds never overlap as long as each
/// world's local extents fit inside one cell, which is a configuration
/// invariant the caller owns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridLayout {
    pub cell_extent: Vec3,
    pub columns: u32,
    pub rows: u32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            cell_extent: Vec3::new(512.0, 256.0, 512.0),
            columns: 16,
            rows: 16,
        }
    }
}

impl GridLayout {
    pub fn new(cell_extent: Vec3, columns: u32, rows: u32) -> Self {
        let layout = Self {
            cell_extent,
            columns,
            rows,
        };
        layout.assert_valid();
        layout
    }

    pub(crate) fn assert_valid(&self) {
        assert!(
            self.cell_extent.cmpgt(Vec3::ZERO).all(),
            "cell_extent must be positive"
        );
        assert!(
            self.columns > 0 && self.rows > 0,
            "grid needs at least one column and row"
        );
    }

    /// Decompose a slot into its cell.
    pub fn cell_of(&self, slot: Slot) -> GridCell {
        let s = slot.index();
        GridCell {
            x: s % self.columns,
            z: (s / self.columns) % self.rows,
            // Widened: columns * rows may exceed u32.
            layer: (u64::from(s) / (u64::from(self.columns) * u64::from(self.rows))) as u32,
        }
    }

    /// Translation from a world's local frame into its cell.
    pub fn offset(&self, slot: Slot) -> Vec3 {
        let cell = self.cell_of(slot);
        Vec3::new(
            cell.x as f32 * self.cell_extent.x,
            cell.layer as f32 * self.cell_extent.y,
            cell.z as f32 * self.cell_extent.z,
        )
    }

    pub fn to_shared(&self, local: Vec3, slot: Slot) -> Vec3 {
        local + self.offset(slot)
    }

    pub fn to_local(&self, shared: Vec3, slot: Slot) -> Vec3 {
        shared - self.offset(slot)
    }

    pub fn pose_to_shared(&self, local: Pose, slot: Slot) -> Pose {
        local.translated(self.offset(slot))
    }

    pub fn pose_to_local(&self, shared: Pose, slot: Slot) -> Pose {
        shared.translated(-self.offset(slot))
    }

    /// Shared-space bounds `(min, max)` of a slot's cell, local origin at `min`.
    pub fn cell_bounds(&self, slot: Slot) -> (Vec3, Vec3) {
        let min = self.offset(slot);
        (min, min + self.cell_extent)
    }
}
