use portalspace_assets::PortalDescriptor;
use portalspace_common::{LinkId, Pose, RenderHandle, Slot, WorldUrl};
use portalspace_render::{PortalPair, Scene};

use crate::grid::GridLayout;

/// Shared-space placement derived from one portal descriptor.
///
/// The source document is never rewritten; re-placing after a slot change
/// starts again from the stored local poses. A portal whose destination
/// holds no slot is dangling and has no exit.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPortal {
    /// Index of the descriptor in the host document.
    pub descriptor: usize,
    pub destination: WorldUrl,
    pub local_entry: Pose,
    pub local_exit: Pose,
    pub entry: Pose,
    pub exit: Option<Pose>,
    pub host_slot: Slot,
    pub destination_slot: Option<Slot>,
}

impl PlacedPortal {
    pub fn place(
        grid: &GridLayout,
        descriptor: usize,
        portal: &PortalDescriptor,
        destination: WorldUrl,
        host_slot: Slot,
        destination_slot: Slot,
    ) -> Self {
        let local_entry = portal.start;
        let local_exit = portal.destination.pose;
        Self {
            descriptor,
            destination,
            local_entry,
            local_exit,
            entry: grid.pose_to_shared(local_entry, host_slot),
            exit: Some(grid.pose_to_shared(local_exit, destination_slot)),
            host_slot,
            destination_slot: Some(destination_slot),
        }
    }

    /// Same portal with its endpoints moved to new slots.
    pub fn moved(&self, grid: &GridLayout, host_slot: Slot, destination_slot: Option<Slot>) -> Self {
        Self {
            entry: grid.pose_to_shared(self.local_entry, host_slot),
            exit: destination_slot.map(|slot| grid.pose_to_shared(self.local_exit, slot)),
            host_slot,
            destination_slot,
            ..self.clone()
        }
    }

    pub fn is_dangling(&self) -> bool {
        self.destination_slot.is_none()
    }
}

/// A live, bidirectional connection between the world hosting the entry
/// visual and a destination world.
///
/// Creating a link registers its crossing watch with the scene; `dispose`
/// consumes the link, so a link can only be torn down once.
#[derive(Debug)]
pub struct PortalLink {
    id: LinkId,
    placement: PlacedPortal,
    pair: PortalPair,
    radius: f32,
    label: Option<RenderHandle>,
    label_text: String,
    ring: Option<RenderHandle>,
}

impl PortalLink {
    pub fn new<R: Scene + ?Sized>(
        scene: &mut R,
        id: LinkId,
        placement: PlacedPortal,
        radius: f32,
    ) -> Self {
        let pair = scene.add_portal_pair(radius, placement.entry, placement.exit);
        scene.watch_crossing(id, pair, radius);
        tracing::debug!(%id, destination = %placement.destination, "portal link created");
        Self {
            id,
            placement,
            pair,
            radius,
            label: None,
            label_text: String::new(),
            ring: None,
        }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn destination(&self) -> &WorldUrl {
        &self.placement.destination
    }

    pub fn descriptor(&self) -> usize {
        self.placement.descriptor
    }

    pub fn placement(&self) -> &PlacedPortal {
        &self.placement
    }

    pub fn pair(&self) -> PortalPair {
        self.pair
    }

    pub fn label(&self) -> Option<RenderHandle> {
        self.label
    }

    pub fn label_text(&self) -> &str {
        &self.label_text
    }

    pub fn ring(&self) -> Option<RenderHandle> {
        self.ring
    }

    /// Attach a text label to the entry visual, or retext the existing one.
    pub fn create_label<R: Scene + ?Sized>(&mut self, scene: &mut R, text: &str) {
        match self.label {
            Some(label) => scene.update_label(label, text),
            None => self.label = Some(scene.create_label(self.pair.entry, text)),
        }
        self.label_text = text.to_string();
    }

    pub fn create_ring<R: Scene + ?Sized>(&mut self, scene: &mut R) {
        if self.ring.is_none() {
            self.ring = Some(scene.create_ring(self.pair.entry, self.radius));
        }
    }

    pub fn update_label_text<R: Scene + ?Sized>(&mut self, scene: &mut R, text: &str) {
        if self.label_text == text {
            return;
        }
        self.create_label(scene, text);
    }

    /// Move both visuals to a new placement of the same descriptor.
    ///
    /// The exit visual is created or detached as the destination gains or
    /// loses its slot; the crossing watch follows the pair.
    pub fn reposition<R: Scene + ?Sized>(&mut self, scene: &mut R, placement: PlacedPortal) {
        if placement == self.placement {
            return;
        }
        if placement.entry != self.placement.entry {
            scene.set_pose(self.pair.entry, placement.entry);
        }
        match (self.pair.exit, placement.exit) {
            (Some(handle), Some(exit)) => {
                if Some(exit) != self.placement.exit {
                    scene.set_pose(handle, exit);
                }
            }
            (Some(handle), None) => {
                scene.detach(handle);
                self.pair.exit = None;
                scene.watch_crossing(self.id, self.pair, self.radius);
                tracing::debug!(id = %self.id, destination = %placement.destination, "portal exit withdrawn");
            }
            (None, Some(exit)) => {
                self.pair.exit = Some(scene.add_portal_exit(self.radius, exit));
                scene.watch_crossing(self.id, self.pair, self.radius);
                tracing::debug!(id = %self.id, destination = %placement.destination, "portal exit restored");
            }
            (None, None) => {}
        }
        self.placement = placement;
    }

    /// Detach decorations and visuals and stop crossing notifications.
    pub fn dispose<R: Scene + ?Sized>(self, scene: &mut R) {
        scene.unwatch_crossing(self.id);
        if let Some(label) = self.label {
            scene.detach(label);
        }
        if let Some(ring) = self.ring {
            scene.detach(ring);
        }
        scene.detach(self.pair.entry);
        if let Some(exit) = self.pair.exit {
            scene.detach(exit);
        }
        tracing::debug!(id = %self.id, destination = %self.placement.destination, "portal link disposed");
    }
}
