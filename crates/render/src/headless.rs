use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use glam::Vec3;
use portalspace_common::{LinkId, Pose, RenderHandle};

use crate::scene::{
    AssetCompletion, AssetRequest, CrossingEvent, PortalPair, Scene, SceneError,
};

/// What a headless scene node stands in for.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    World { asset_url: String },
    PortalEntry,
    PortalExit,
    Label { text: String },
    Ring { radius: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub kind: NodeKind,
    pub pose: Pose,
    pub anchor: Option<RenderHandle>,
}

#[derive(Debug, Clone, Copy)]
struct Watch {
    pair: PortalPair,
    radius: f32,
}

/// In-memory scene with no GPU behind it.
///
/// Asset loads queue until [`HeadlessScene::finish_loads`] resolves them,
/// which lets callers interleave completions with other mutations. Camera
/// movement is checked against watched portal planes by
/// [`HeadlessScene::move_camera`].
#[derive(Debug, Default)]
pub struct HeadlessScene {
    next_handle: u64,
    nodes: BTreeMap<RenderHandle, SceneNode>,
    pending: Vec<AssetRequest>,
    watches: BTreeMap<LinkId, Watch>,
    failing_assets: BTreeSet<String>,
    loads_requested: usize,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future load of `asset_url` fail.
    pub fn fail_asset(&mut self, asset_url: impl Into<String>) {
        self.failing_assets.insert(asset_url.into());
    }

    /// Asset requests not yet resolved.
    pub fn pending_loads(&self) -> &[AssetRequest] {
        &self.pending
    }

    /// Total asset loads requested over the scene's lifetime.
    pub fn loads_requested(&self) -> usize {
        self.loads_requested
    }

    /// Resolve every queued asset request, creating world nodes for the
    /// successful ones.
    pub fn finish_loads(&mut self) -> Vec<AssetCompletion> {
        let requests = std::mem::take(&mut self.pending);
        requests
            .into_iter()
            .map(|request| {
                let result = if self.failing_assets.contains(&request.asset_url) {
                    Err(SceneError::AssetUnavailable {
                        asset_url: request.asset_url.clone(),
                    })
                } else {
                    Ok(self.insert(SceneNode {
                        kind: NodeKind::World {
                            asset_url: request.asset_url.clone(),
                        },
                        pose: Pose::at(request.position),
                        anchor: None,
                    }))
                };
                AssetCompletion { request, result }
            })
            .collect()
    }

    pub fn node(&self, handle: RenderHandle) -> Option<&SceneNode> {
        self.nodes.get(&handle)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&RenderHandle, &SceneNode)> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live world renderables.
    pub fn world_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| matches!(n.kind, NodeKind::World { .. }))
            .count()
    }

    pub fn label_text(&self, handle: RenderHandle) -> Option<&str> {
        match self.nodes.get(&handle).map(|n| &n.kind) {
            Some(NodeKind::Label { text }) => Some(text),
            _ => None,
        }
    }

    pub fn watched_links(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.watches.keys().copied()
    }

    pub fn is_watched(&self, link: LinkId) -> bool {
        self.watches.contains_key(&link)
    }

    /// Move the camera along the segment `from -> to` and report every
    /// watched portal plane it passes through within the portal radius.
    pub fn move_camera(&self, from: Vec3, to: Vec3) -> Vec<CrossingEvent> {
        let mut events = Vec::new();
        for (&link, watch) in &self.watches {
            let sides = [(Some(watch.pair.entry), true), (watch.pair.exit, false)];
            for (handle, from_entry_side) in sides {
                let Some(node) = handle.and_then(|h| self.nodes.get(&h)) else {
                    continue;
                };
                if segment_crosses_disc(from, to, node.pose, watch.radius) {
                    events.push(CrossingEvent {
                        link,
                        from_entry_side,
                    });
                }
            }
        }
        events
    }

    /// Human-readable dump of the scene, one node per line.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Scene (nodes={}, pending loads={}, watched={}) ===",
            self.nodes.len(),
            self.pending.len(),
            self.watches.len()
        );
        for (handle, node) in &self.nodes {
            let p = node.pose.position;
            let _ = writeln!(
                out,
                "  [{}] {:?} pos=({:.2}, {:.2}, {:.2})",
                handle.0, node.kind, p.x, p.y, p.z
            );
        }
        out
    }

    fn insert(&mut self, node: SceneNode) -> RenderHandle {
        self.next_handle += 1;
        let handle = RenderHandle(self.next_handle);
        self.nodes.insert(handle, node);
        handle
    }
}

impl Scene for HeadlessScene {
    fn load_asset(&mut self, request: AssetRequest) {
        tracing::trace!(world = %request.world, slot = %request.slot, "asset load queued");
        self.loads_requested += 1;
        self.pending.push(request);
    }

    fn add_portal_pair(&mut self, radius: f32, entry: Pose, exit: Option<Pose>) -> PortalPair {
        let entry = self.insert(SceneNode {
            kind: NodeKind::PortalEntry,
            pose: entry,
            anchor: None,
        });
        let exit = exit.map(|pose| self.add_portal_exit(radius, pose));
        PortalPair { entry, exit }
    }

    fn add_portal_exit(&mut self, _radius: f32, exit: Pose) -> RenderHandle {
        self.insert(SceneNode {
            kind: NodeKind::PortalExit,
            pose: exit,
            anchor: None,
        })
    }

    fn set_pose(&mut self, handle: RenderHandle, pose: Pose) {
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.pose = pose;
        }
        for node in self.nodes.values_mut() {
            if node.anchor == Some(handle) {
                node.pose = pose;
            }
        }
    }

    fn watch_crossing(&mut self, link: LinkId, pair: PortalPair, radius: f32) {
        self.watches.insert(link, Watch { pair, radius });
    }

    fn unwatch_crossing(&mut self, link: LinkId) {
        self.watches.remove(&link);
    }

    fn create_label(&mut self, anchor: RenderHandle, text: &str) -> RenderHandle {
        let pose = self.nodes.get(&anchor).map(|n| n.pose).unwrap_or_default();
        self.insert(SceneNode {
            kind: NodeKind::Label {
                text: text.to_string(),
            },
            pose,
            anchor: Some(anchor),
        })
    }

    fn update_label(&mut self, label: RenderHandle, text: &str) {
        if let Some(SceneNode {
            kind: NodeKind::Label { text: current },
            ..
        }) = self.nodes.get_mut(&label)
        {
            *current = text.to_string();
        }
    }

    fn create_ring(&mut self, anchor: RenderHandle, radius: f32) -> RenderHandle {
        let pose = self.nodes.get(&anchor).map(|n| n.pose).unwrap_or_default();
        self.insert(SceneNode {
            kind: NodeKind::Ring { radius },
            pose,
            anchor: Some(anchor),
        })
    }

    fn detach(&mut self, handle: RenderHandle) {
        self.nodes.remove(&handle);
    }
}

/// Does the segment pass through the disc of `radius` lying in the plane
/// of `pose` (normal = pose forward)?
fn segment_crosses_disc(from: Vec3, to: Vec3, pose: Pose, radius: f32) -> bool {
    let normal = pose.forward();
    let d0 = (from - pose.position).dot(normal);
    let d1 = (to - pose.position).dot(normal);
    if (d0 > 0.0) == (d1 > 0.0) || d0 == d1 {
        return false;
    }
    let t = d0 / (d0 - d1);
    let hit = from + (to - from) * t;
    hit.distance(pose.position) <= radius
}
