use std::collections::{BTreeMap, BTreeSet, VecDeque};

use glam::Vec3;
use portalspace_assets::{DocumentSource, WorldDocument};
use portalspace_common::{LinkId, Pose, Slot, WorldUrl};
use portalspace_render::{AssetCompletion, AssetRequest, CrossingEvent, Scene};

use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::grid::GridLayout;
use crate::inspector::StreamSummary;
use crate::portal::{PlacedPortal, PortalLink};
use crate::registry::{WorldRegistry, WorldState};
use crate::slots::SlotAllocator;

/// What one root load changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Worlds fetched and registered during the pass, in load order.
    pub loaded: Vec<WorldUrl>,
    /// Neighbours whose document fetch failed; their links stay dangling.
    pub failed: Vec<WorldUrl>,
    pub links_created: usize,
    pub assets_requested: usize,
}

/// What one eviction pass removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    pub evicted: Vec<WorldUrl>,
    pub links_disposed: usize,
}

/// Result of crossing a portal.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossingOutcome {
    pub old_root: WorldUrl,
    pub new_root: WorldUrl,
    /// Translation to apply to the camera: the new root moved into cell 0.
    pub camera_shift: Vec3,
    pub flush: FlushReport,
    pub load: LoadReport,
}

/// Bookkeeping for one breadth-first expansion from the root.
#[derive(Default)]
struct Expansion {
    /// Slots allocated for destinations not fetched yet.
    pending: BTreeMap<WorldUrl, Slot>,
    failed: BTreeSet<WorldUrl>,
    visited: BTreeSet<WorldUrl>,
    queue: VecDeque<(WorldUrl, u32)>,
    /// Worlds linked this pass, in visit order; assets are requested last.
    linked: Vec<WorldUrl>,
}

/// Keeps the neighbourhood of the current root loaded in shared space.
///
/// All streaming state lives here: the world registry, the slot allocator
/// and the current root. Every mutation takes `&mut self`, so completions
/// from asynchronous collaborators are applied one at a time.
pub struct StreamController<S, R> {
    config: StreamConfig,
    source: S,
    scene: R,
    registry: WorldRegistry,
    slots: SlotAllocator,
    root: Option<WorldUrl>,
    next_link: u64,
}

impl<S: DocumentSource, R: Scene> StreamController<S, R> {
    pub fn new(config: StreamConfig, source: S, scene: R) -> Self {
        config.grid.assert_valid();
        Self {
            config,
            source,
            scene,
            registry: WorldRegistry::new(),
            slots: SlotAllocator::new(),
            root: None,
            next_link: 0,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridLayout {
        &self.config.grid
    }

    pub fn registry(&self) -> &WorldRegistry {
        &self.registry
    }

    pub fn slots(&self) -> &SlotAllocator {
        &self.slots
    }

    pub fn root(&self) -> Option<&WorldUrl> {
        self.root.as_ref()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn scene(&self) -> &R {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut R {
        &mut self.scene
    }

    pub fn summary(&self) -> StreamSummary {
        StreamSummary::capture(
            &self.registry,
            &self.slots,
            &self.config.grid,
            self.root.as_ref(),
        )
    }

    /// Make `url` the root and load everything within `preload_hops` of it.
    ///
    /// `came_from` suppresses the root's portal straight back to the world
    /// just left. A root that is already registered is not fetched again.
    pub fn load_world_as_root(
        &mut self,
        url: &WorldUrl,
        came_from: Option<&WorldUrl>,
    ) -> Result<LoadReport, StreamError> {
        let document = self.fetch_unless_registered(url)?;
        Ok(self.load_root(url, came_from, document))
    }

    /// Handle the camera passing through a portal.
    ///
    /// Entering from the entry side moves the root to the link's
    /// destination; from the exit side, back to the world hosting the link.
    /// If the new root cannot be fetched nothing changes.
    pub fn on_cross(
        &mut self,
        link: LinkId,
        entered_from_entry_side: bool,
    ) -> Result<CrossingOutcome, StreamError> {
        let _span = tracing::info_span!("on_cross", %link, entered_from_entry_side).entered();
        let (owner, portal) = self
            .registry
            .find_link(link)
            .ok_or(StreamError::UnknownLink(link))?;
        let owner_url = owner.url().clone();
        let destination = portal.destination().clone();
        let destination_slot = portal.placement().destination_slot;

        let (new_root, old_root) = if entered_from_entry_side {
            (destination, owner_url)
        } else {
            (owner_url, destination)
        };
        // A dangling destination had no exit to carry the camera from.
        let previous_slot = self
            .registry
            .get(&new_root)
            .map(WorldState::slot)
            .or(destination_slot)
            .unwrap_or(Slot::ROOT);

        let document = self.fetch_unless_registered(&new_root)?;
        let flush = self.flush(&old_root, &new_root);
        let load = self.load_root(&new_root, Some(&old_root), document);

        tracing::info!(from = %old_root, to = %new_root, "portal crossed");
        Ok(CrossingOutcome {
            camera_shift: -self.config.grid.offset(previous_slot),
            old_root,
            new_root,
            flush,
            load,
        })
    }

    pub fn handle_crossing(&mut self, event: CrossingEvent) -> Result<CrossingOutcome, StreamError> {
        self.on_cross(event.link, event.from_entry_side)
    }

    /// Evict every world outside the neighbourhood of `to`.
    ///
    /// `from` and `to` always survive. `from` keeps only its link to `to`,
    /// relabelled with its own name; `to` is left untouched.
    pub fn flush(&mut self, from: &WorldUrl, to: &WorldUrl) -> FlushReport {
        let _span = tracing::info_span!("flush", %from, %to).entered();
        let mut keep = self.reachable(to, self.config.preload_hops);
        keep.insert(from.clone());
        keep.insert(to.clone());

        let departed = self
            .registry
            .get(from)
            .map(|s| s.display_name().to_string())
            .unwrap_or_else(|| from.display_name().to_string());

        let mut report = FlushReport::default();
        let urls: Vec<WorldUrl> = self.registry.urls().cloned().collect();
        for url in urls {
            if url == *to {
                continue;
            }
            if !keep.contains(&url) {
                if let Some(state) = self.registry.delete(&url, &mut self.slots) {
                    report.links_disposed += state.links.len();
                    self.dispose_world(state);
                    report.evicted.push(url);
                }
                continue;
            }

            let Some(state) = self.registry.get_mut(&url) else {
                continue;
            };
            let is_from = url == *from;
            let (mut survivors, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut state.links)
                .into_iter()
                .partition(|l| {
                    if is_from {
                        l.destination() == to
                    } else {
                        keep.contains(l.destination())
                    }
                });
            report.links_disposed += dropped.len();
            for link in dropped {
                link.dispose(&mut self.scene);
            }
            if is_from {
                for link in &mut survivors {
                    link.update_label_text(&mut self.scene, &departed);
                }
            }
            state.links = survivors;
        }

        tracing::info!(
            evicted = report.evicted.len(),
            links_disposed = report.links_disposed,
            remaining = self.registry.len(),
            "flush complete"
        );
        report
    }

    /// Apply a finished asset load.
    ///
    /// Returns `false` when the result was discarded: the world was evicted,
    /// replaced by a newer incarnation, or the load failed.
    pub fn complete_asset(&mut self, completion: AssetCompletion) -> bool {
        let AssetCompletion { request, result } = completion;
        let grid = self.config.grid;
        match self.registry.get_mut(&request.world) {
            Some(state) if state.generation == request.generation && state.asset_pending => {
                state.asset_pending = false;
                match result {
                    Ok(handle) => {
                        state.renderable = Some(handle);
                        self.scene
                            .set_pose(handle, Pose::at(grid.to_shared(Vec3::ZERO, state.slot)));
                        tracing::debug!(world = %request.world, slot = %state.slot, "asset ready");
                        true
                    }
                    Err(e) => {
                        tracing::warn!(world = %request.world, error = %e, "asset load failed");
                        false
                    }
                }
            }
            _ => {
                if let Ok(handle) = result {
                    self.scene.detach(handle);
                }
                tracing::warn!(
                    world = %request.world,
                    generation = request.generation,
                    "discarding late asset completion"
                );
                false
            }
        }
    }

    /// Evict everything, returning every slot to the pool.
    pub fn unload_all(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        let urls: Vec<WorldUrl> = self.registry.urls().cloned().collect();
        for url in urls {
            if let Some(state) = self.registry.delete(&url, &mut self.slots) {
                report.links_disposed += state.links.len();
                self.dispose_world(state);
                report.evicted.push(url);
            }
        }
        self.root = None;
        report
    }

    fn fetch_unless_registered(&self, url: &WorldUrl) -> Result<Option<WorldDocument>, StreamError> {
        if self.registry.contains(url) {
            return Ok(None);
        }
        match self.source.fetch(url) {
            Ok(document) => Ok(Some(document)),
            Err(e) => {
                tracing::warn!(%url, error = %e, "world fetch failed");
                Err(e.into())
            }
        }
    }

    fn load_root(
        &mut self,
        url: &WorldUrl,
        came_from: Option<&WorldUrl>,
        document: Option<WorldDocument>,
    ) -> LoadReport {
        let _span = tracing::info_span!("load_world_as_root", %url).entered();
        self.install_root(url, document);

        let mut report = LoadReport::default();
        self.expand(url, came_from, &mut report);

        tracing::info!(
            root = %url,
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            links = report.links_created,
            worlds = self.registry.len(),
            "root loaded"
        );
        report
    }

    /// Register `url` if a fresh document is given and move it to slot 0.
    fn install_root(&mut self, url: &WorldUrl, document: Option<WorldDocument>) {
        if let Some(document) = document {
            let slot = if self.registry.root().is_none() {
                Slot::ROOT
            } else {
                self.slots.allocate()
            };
            self.registry.get_or_create(url.clone(), document, slot);
        }
        if let Some(promotion) = self.registry.promote_root(url, &mut self.slots) {
            if !promotion.previous_slot.is_root() {
                self.relayout();
            }
        }
        self.root = Some(url.clone());
    }

    /// Breadth-first load and link out to `preload_hops` from the root.
    fn expand(&mut self, root: &WorldUrl, came_from: Option<&WorldUrl>, report: &mut LoadReport) {
        let hops = self.config.preload_hops;
        let mut pass = Expansion::default();
        pass.visited.insert(root.clone());
        pass.queue.push_back((root.clone(), 0));

        while let Some((url, depth)) = pass.queue.pop_front() {
            if !self.registry.contains(&url) {
                let Some(slot) = pass.pending.remove(&url) else {
                    continue;
                };
                match self.source.fetch(&url) {
                    Ok(document) => {
                        self.registry.get_or_create(url.clone(), document, slot);
                        report.loaded.push(url.clone());
                    }
                    Err(e) => {
                        tracing::warn!(%url, error = %e, "neighbour fetch failed; portal left dangling");
                        self.detach_exits_to(&url);
                        self.slots.release(slot);
                        pass.failed.insert(url.clone());
                        report.failed.push(url);
                        continue;
                    }
                }
            }

            let may_allocate = depth < hops;
            let back = if depth == 0 { came_from } else { None };
            self.link_world(&url, back, may_allocate, &mut pass, report);
            pass.linked.push(url.clone());

            if may_allocate {
                for next in self.neighbours(&url) {
                    let known = self.registry.contains(&next) || pass.pending.contains_key(&next);
                    if known && pass.visited.insert(next.clone()) {
                        pass.queue.push_back((next, depth + 1));
                    }
                }
            }
        }

        // Allocated destinations that were never dequeued give their slots back.
        for (url, slot) in std::mem::take(&mut pass.pending) {
            tracing::debug!(%url, %slot, "releasing unused pending slot");
            self.slots.release(slot);
        }
        for url in &pass.linked {
            self.request_asset(url, report);
        }
    }

    /// Create links for `url`'s descriptors that have none yet.
    fn link_world(
        &mut self,
        url: &WorldUrl,
        back: Option<&WorldUrl>,
        may_allocate: bool,
        pass: &mut Expansion,
        report: &mut LoadReport,
    ) {
        let grid = self.config.grid;
        let radius = self.config.portal_radius;
        let Some(state) = self.registry.get(url) else {
            return;
        };
        let host_slot = state.slot;
        let candidates: Vec<(usize, WorldUrl)> = state
            .document
            .destinations(url)
            .into_iter()
            .filter(|(index, _)| !state.has_link_for(*index))
            .collect();

        for (index, destination) in candidates {
            if back == Some(&destination) {
                tracing::trace!(%url, %destination, "skipping portal back to previous root");
                continue;
            }
            if destination == *url {
                continue;
            }
            let (destination_slot, label) = match self.registry.get(&destination) {
                Some(dest) => (dest.slot, dest.display_name().to_string()),
                None => {
                    let slot = if let Some(&slot) = pass.pending.get(&destination) {
                        slot
                    } else if may_allocate && !pass.failed.contains(&destination) {
                        let slot = self.slots.allocate();
                        pass.pending.insert(destination.clone(), slot);
                        slot
                    } else {
                        continue;
                    };
                    (slot, destination.display_name().to_string())
                }
            };

            let id = self.next_link_id();
            let Some(state) = self.registry.get_mut(url) else {
                return;
            };
            let placement = PlacedPortal::place(
                &grid,
                index,
                &state.document.portals[index],
                destination,
                host_slot,
                destination_slot,
            );
            let mut link = PortalLink::new(&mut self.scene, id, placement, radius);
            link.create_label(&mut self.scene, &label);
            link.create_ring(&mut self.scene);
            state.links.push(link);
            report.links_created += 1;
        }
    }

    /// Issue an asset load unless the world has a renderable or one is in
    /// flight.
    fn request_asset(&mut self, url: &WorldUrl, report: &mut LoadReport) {
        let grid = self.config.grid;
        let Some(state) = self.registry.get_mut(url) else {
            return;
        };
        if state.renderable.is_some() || state.asset_pending {
            return;
        }
        state.asset_pending = true;
        let asset_url = url
            .join(&state.document.splat_url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| state.document.splat_url.clone());
        self.scene.load_asset(AssetRequest {
            world: url.clone(),
            generation: state.generation,
            asset_url,
            position: grid.to_shared(Vec3::ZERO, state.slot),
            slot: state.slot,
        });
        report.assets_requested += 1;
    }

    /// Re-place renderables and link visuals after slots moved.
    fn relayout(&mut self) {
        let grid = self.config.grid;
        let slots: BTreeMap<WorldUrl, Slot> = self
            .registry
            .iter()
            .map(|(url, state)| (url.clone(), state.slot))
            .collect();
        for (_, state) in self.registry.iter_mut() {
            if let Some(handle) = state.renderable {
                self.scene
                    .set_pose(handle, Pose::at(grid.to_shared(Vec3::ZERO, state.slot)));
            }
            for link in &mut state.links {
                let placement = link.placement();
                let destination_slot = slots.get(link.destination()).copied();
                if placement.host_slot != state.slot || placement.destination_slot != destination_slot {
                    let moved = placement.moved(&grid, state.slot, destination_slot);
                    link.reposition(&mut self.scene, moved);
                }
            }
        }
    }

    /// Withdraw the exit of every link into `destination`, which no longer
    /// holds a slot.
    fn detach_exits_to(&mut self, destination: &WorldUrl) {
        let grid = self.config.grid;
        for (_, state) in self.registry.iter_mut() {
            for link in &mut state.links {
                if link.destination() == destination && !link.placement().is_dangling() {
                    let dangling = link.placement().moved(&grid, state.slot, None);
                    link.reposition(&mut self.scene, dangling);
                }
            }
        }
    }

    /// Destinations of a registered world: its document's portals plus any
    /// live links.
    fn neighbours(&self, url: &WorldUrl) -> Vec<WorldUrl> {
        let Some(state) = self.registry.get(url) else {
            return Vec::new();
        };
        let mut out: Vec<WorldUrl> = state
            .document
            .destinations(url)
            .into_iter()
            .map(|(_, dest)| dest)
            .chain(state.links.iter().map(|l| l.destination().clone()))
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// URLs within `hops` traversals of `start` through registered worlds.
    fn reachable(&self, start: &WorldUrl, hops: u32) -> BTreeSet<WorldUrl> {
        let mut seen = BTreeSet::from([start.clone()]);
        let mut queue = VecDeque::from([(start.clone(), 0u32)]);
        while let Some((url, depth)) = queue.pop_front() {
            if depth >= hops {
                continue;
            }
            for next in self.neighbours(&url) {
                if seen.insert(next.clone()) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        seen
    }

    fn dispose_world(&mut self, state: WorldState) {
        for link in state.links {
            link.dispose(&mut self.scene);
        }
        if let Some(handle) = state.renderable {
            self.scene.detach(handle);
        }
    }

    fn next_link_id(&mut self) -> LinkId {
        self.next_link += 1;
        LinkId(self.next_link)
    }
}
