use glam::Vec3;
use portalspace_common::{LinkId, Pose, RenderHandle, Slot, WorldUrl};

/// Errors reported back by the rendering collaborator.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("asset unavailable: {asset_url}")]
    AssetUnavailable { asset_url: String },
}

/// Entry and exit visuals of one portal.
///
/// A portal whose destination is not loaded has no exit visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalPair {
    pub entry: RenderHandle,
    pub exit: Option<RenderHandle>,
}

/// A request to load a world's renderable at a shared-space position.
///
/// `generation` identifies the world state that issued the request and must
/// be echoed back in the completion.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRequest {
    pub world: WorldUrl,
    pub generation: u64,
    pub asset_url: String,
    pub position: Vec3,
    pub slot: Slot,
}

/// Result of a finished asset load.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetCompletion {
    pub request: AssetRequest,
    pub result: Result<RenderHandle, SceneError>,
}

/// The camera passed through one of a watched portal's planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossingEvent {
    pub link: LinkId,
    /// `true` when the entry visual was passed, `false` for the exit visual.
    pub from_entry_side: bool,
}

/// Rendering collaborator as seen by the streaming core.
///
/// The scene owns every object behind a [`RenderHandle`]. It never touches
/// streaming state; crossings are reported as [`CrossingEvent`]s for the
/// links registered through [`Scene::watch_crossing`].
pub trait Scene {
    /// Start loading a world's renderable. Completion is delivered later as
    /// an [`AssetCompletion`].
    fn load_asset(&mut self, request: AssetRequest);

    /// Create a portal's entry and, when given, exit visuals, both in
    /// shared space.
    fn add_portal_pair(&mut self, radius: f32, entry: Pose, exit: Option<Pose>) -> PortalPair;

    /// Create an exit visual for a portal that had none.
    fn add_portal_exit(&mut self, radius: f32, exit: Pose) -> RenderHandle;

    fn set_pose(&mut self, handle: RenderHandle, pose: Pose);

    /// Start reporting crossings of `pair` for `link`.
    fn watch_crossing(&mut self, link: LinkId, pair: PortalPair, radius: f32);

    fn unwatch_crossing(&mut self, link: LinkId);

    fn create_label(&mut self, anchor: RenderHandle, text: &str) -> RenderHandle;

    fn update_label(&mut self, label: RenderHandle, text: &str);

    fn create_ring(&mut self, anchor: RenderHandle, radius: f32) -> RenderHandle;

    /// Remove an object from the scene. Unknown handles are ignored.
    fn detach(&mut self, handle: RenderHandle);
}
