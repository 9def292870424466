use std::collections::BTreeMap;

use portalspace_assets::WorldDocument;
use portalspace_common::{LinkId, RenderHandle, Slot, WorldUrl};

use crate::portal::PortalLink;
use crate::slots::SlotAllocator;

/// Loaded state of one world.
#[derive(Debug)]
pub struct WorldState {
    pub(crate) url: WorldUrl,
    pub(crate) document: WorldDocument,
    pub(crate) slot: Slot,
    pub(crate) generation: u64,
    pub(crate) renderable: Option<RenderHandle>,
    pub(crate) asset_pending: bool,
    pub(crate) links: Vec<PortalLink>,
}

impl WorldState {
    pub fn url(&self) -> &WorldUrl {
        &self.url
    }

    pub fn document(&self) -> &WorldDocument {
        &self.document
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// Token identifying this incarnation of the world; a world evicted and
    /// loaded again gets a new one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn renderable(&self) -> Option<RenderHandle> {
        self.renderable
    }

    pub fn asset_pending(&self) -> bool {
        self.asset_pending
    }

    pub fn links(&self) -> &[PortalLink] {
        &self.links
    }

    pub fn display_name(&self) -> &str {
        self.document.display_name(&self.url)
    }

    pub fn link_to(&self, destination: &WorldUrl) -> Option<&PortalLink> {
        self.links.iter().find(|l| l.destination() == destination)
    }

    pub fn has_link_for(&self, descriptor: usize) -> bool {
        self.links.iter().any(|l| l.descriptor() == descriptor)
    }
}

/// Outcome of moving a world into the root slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Promotion {
    /// Slot the promoted world held before.
    pub previous_slot: Slot,
    /// Former root, now holding `previous_slot`.
    pub demoted: Option<WorldUrl>,
}

/// Authoritative map from world URL to loaded state.
///
/// Uses BTreeMap so enumeration order is deterministic.
#[derive(Debug, Default)]
pub struct WorldRegistry {
    worlds: BTreeMap<WorldUrl, WorldState>,
    next_generation: u64,
}

impl WorldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }

    pub fn contains(&self, url: &WorldUrl) -> bool {
        self.worlds.contains_key(url)
    }

    pub fn get(&self, url: &WorldUrl) -> Option<&WorldState> {
        self.worlds.get(url)
    }

    pub fn get_mut(&mut self, url: &WorldUrl) -> Option<&mut WorldState> {
        self.worlds.get_mut(url)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WorldUrl, &WorldState)> {
        self.worlds.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&WorldUrl, &mut WorldState)> {
        self.worlds.iter_mut()
    }

    pub fn urls(&self) -> impl Iterator<Item = &WorldUrl> {
        self.worlds.keys()
    }

    /// Return the world at `url`, creating it at `slot` if absent.
    ///
    /// An existing entry is returned unchanged: its slot and document are
    /// kept and the arguments are dropped.
    pub fn get_or_create(
        &mut self,
        url: WorldUrl,
        document: WorldDocument,
        slot: Slot,
    ) -> &mut WorldState {
        let next_generation = &mut self.next_generation;
        self.worlds.entry(url).or_insert_with_key(|url| {
            *next_generation += 1;
            tracing::debug!(%url, %slot, generation = *next_generation, "world state created");
            WorldState {
                url: url.clone(),
                document,
                slot,
                generation: *next_generation,
                renderable: None,
                asset_pending: false,
                links: Vec::new(),
            }
        })
    }

    /// Remove a world and return its slot to the allocator.
    ///
    /// The caller disposes the returned state's links and renderable.
    pub fn delete(&mut self, url: &WorldUrl, slots: &mut SlotAllocator) -> Option<WorldState> {
        let state = self.worlds.remove(url)?;
        slots.release(state.slot);
        tracing::debug!(%url, slot = %state.slot, "world state deleted");
        Some(state)
    }

    /// URL of the world holding the root slot.
    pub fn root(&self) -> Option<&WorldUrl> {
        self.worlds
            .values()
            .find(|s| s.slot.is_root())
            .map(|s| &s.url)
    }

    /// Move `url` into the root slot.
    ///
    /// The current root, if any, takes over the promoted world's previous
    /// slot. With no current root the previous slot goes back to `slots`.
    pub fn promote_root(&mut self, url: &WorldUrl, slots: &mut SlotAllocator) -> Option<Promotion> {
        let previous_slot = self.worlds.get(url)?.slot;
        if previous_slot.is_root() {
            return Some(Promotion {
                previous_slot,
                demoted: None,
            });
        }

        let demoted = self.root().cloned();
        match &demoted {
            Some(old) => {
                if let Some(state) = self.worlds.get_mut(old) {
                    state.slot = previous_slot;
                }
            }
            None => slots.release(previous_slot),
        }
        if let Some(state) = self.worlds.get_mut(url) {
            state.slot = Slot::ROOT;
        }
        tracing::debug!(%url, %previous_slot, demoted = ?demoted.as_ref().map(|u| u.as_str()), "root promoted");
        Some(Promotion {
            previous_slot,
            demoted,
        })
    }

    /// Find a live link and the world hosting it.
    pub fn find_link(&self, id: LinkId) -> Option<(&WorldState, &PortalLink)> {
        self.worlds
            .values()
            .find_map(|s| s.links.iter().find(|l| l.id() == id).map(|l| (s, l)))
    }

    /// Total links across all worlds.
    pub fn link_count(&self) -> usize {
        self.worlds.values().map(|s| s.links.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portalspace_common::Pose;

    fn url(s: &str) -> WorldUrl {
        WorldUrl::parse(s).unwrap()
    }

    fn doc(splat: &str) -> WorldDocument {
        WorldDocument {
            name: None,
            splat_url: splat.into(),
            spawn: Pose::default(),
            portals: Vec::new(),
        }
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mut reg = WorldRegistry::new();
        let generation = reg.get_or_create(url("a"), doc("a.splat"), Slot(3)).generation();
        let again = reg.get_or_create(url("a"), doc("other.splat"), Slot(7));
        assert_eq!(again.slot(), Slot(3));
        assert_eq!(again.document().splat_url, "a.splat");
        assert_eq!(again.generation(), generation);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn delete_returns_slot_to_pool() {
        let mut slots = SlotAllocator::new();
        let mut reg = WorldRegistry::new();
        let s = slots.allocate();
        reg.get_or_create(url("a"), doc("a"), s);

        let removed = reg.delete(&url("a"), &mut slots).unwrap();
        assert_eq!(removed.slot(), s);
        assert_eq!(slots.pooled().collect::<Vec<_>>(), vec![s]);
        assert!(reg.delete(&url("a"), &mut slots).is_none());
    }

    #[test]
    fn recreated_world_gets_new_generation() {
        let mut slots = SlotAllocator::new();
        let mut reg = WorldRegistry::new();
        let first = reg.get_or_create(url("a"), doc("a"), Slot::ROOT).generation();
        reg.delete(&url("a"), &mut slots);
        let second = reg.get_or_create(url("a"), doc("a"), Slot::ROOT).generation();
        assert_ne!(first, second);
    }

    #[test]
    fn promote_swaps_with_current_root() {
        let mut slots = SlotAllocator::new();
        let mut reg = WorldRegistry::new();
        reg.get_or_create(url("a"), doc("a"), Slot::ROOT);
        let s = slots.allocate();
        reg.get_or_create(url("b"), doc("b"), s);

        let promotion = reg.promote_root(&url("b"), &mut slots).unwrap();
        assert_eq!(promotion.previous_slot, s);
        assert_eq!(promotion.demoted, Some(url("a")));
        assert_eq!(reg.root(), Some(&url("b")));
        assert_eq!(reg.get(&url("a")).unwrap().slot(), s);
        assert!(slots.is_live(s));
    }

    #[test]
    fn promote_without_root_releases_old_slot() {
        let mut slots = SlotAllocator::new();
        let mut reg = WorldRegistry::new();
        let s = slots.allocate();
        reg.get_or_create(url("b"), doc("b"), s);

        let promotion = reg.promote_root(&url("b"), &mut slots).unwrap();
        assert_eq!(promotion.demoted, None);
        assert_eq!(reg.get(&url("b")).unwrap().slot(), Slot::ROOT);
        assert!(!slots.is_live(s));
    }

    #[test]
    fn promote_unknown_world_is_none() {
        let mut slots = SlotAllocator::new();
        let mut reg = WorldRegistry::new();
        assert!(reg.promote_root(&url("x"), &mut slots).is_none());
    }

    #[test]
    fn iteration_is_sorted_by_url() {
        let mut reg = WorldRegistry::new();
        for (i, name) in ["c", "a", "b"].iter().enumerate() {
            reg.get_or_create(url(name), doc(name), Slot(i as u32));
        }
        let urls: Vec<&str> = reg.urls().map(|u| u.as_str()).collect();
        assert_eq!(urls, vec!["a", "b", "c"]);
    }
}
