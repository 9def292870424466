use std::fmt;

use portalspace_common::{Slot, WorldUrl};

use crate::grid::{GridCell, GridLayout};
use crate::registry::WorldRegistry;
use crate::slots::SlotAllocator;

/// Load state of a world's renderable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    Ready,
    Loading,
    Missing,
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssetStatus::Ready => "ready",
            AssetStatus::Loading => "loading",
            AssetStatus::Missing => "missing",
        })
    }
}

/// One registry row for developer tooling.
#[derive(Debug, Clone)]
pub struct WorldSummary {
    pub url: WorldUrl,
    pub name: String,
    pub slot: Slot,
    pub cell: GridCell,
    pub generation: u64,
    pub links: usize,
    /// Links whose destination has no live world state.
    pub dangling: usize,
    pub asset: AssetStatus,
}

impl fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) slot={} cell=({}, {}, layer {}) links={} dangling={} asset={} gen={}",
            self.url,
            self.name,
            self.slot,
            self.cell.x,
            self.cell.z,
            self.cell.layer,
            self.links,
            self.dangling,
            self.asset,
            self.generation
        )
    }
}

/// Snapshot of the whole streaming state.
#[derive(Debug, Clone)]
pub struct StreamSummary {
    pub root: Option<WorldUrl>,
    pub worlds: Vec<WorldSummary>,
    pub live_slots: usize,
    pub pooled_slots: Vec<Slot>,
}

impl StreamSummary {
    pub fn capture(
        registry: &WorldRegistry,
        slots: &SlotAllocator,
        grid: &GridLayout,
        root: Option<&WorldUrl>,
    ) -> Self {
        let worlds = registry
            .iter()
            .map(|(url, state)| WorldSummary {
                url: url.clone(),
                name: state.display_name().to_string(),
                slot: state.slot(),
                cell: grid.cell_of(state.slot()),
                generation: state.generation(),
                links: state.links().len(),
                dangling: state
                    .links()
                    .iter()
                    .filter(|l| l.placement().is_dangling())
                    .count(),
                asset: if state.renderable().is_some() {
                    AssetStatus::Ready
                } else if state.asset_pending() {
                    AssetStatus::Loading
                } else {
                    AssetStatus::Missing
                },
            })
            .collect();
        Self {
            root: root.cloned(),
            worlds,
            live_slots: slots.live_count(),
            pooled_slots: slots.pooled().collect(),
        }
    }

    pub fn world(&self, url: &WorldUrl) -> Option<&WorldSummary> {
        self.worlds.iter().find(|w| &w.url == url)
    }
}

impl fmt::Display for StreamSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = self.root.as_ref().map(|r| r.as_str()).unwrap_or("<none>");
        writeln!(
            f,
            "Root: {root} worlds={} live_slots={} pooled={:?}",
            self.worlds.len(),
            self.live_slots,
            self.pooled_slots.iter().map(|s| s.index()).collect::<Vec<_>>()
        )?;
        for world in &self.worlds {
            writeln!(f, "  {world}")?;
        }
        Ok(())
    }
}
