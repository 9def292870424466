use portalspace_common::{Pose, WorldUrl};
use serde::{Deserialize, Serialize};

use crate::FetchError;

/// Where a portal leads: the destination world and the arrival pose in that
/// world's own frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalDestination {
    pub url: String,
    #[serde(flatten)]
    pub pose: Pose,
}

/// One portal authored in a world document.
///
/// Both endpoints are expressed in the local frame of the world they sit in.
/// Descriptors are read-only; shared-space placement is derived separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalDescriptor {
    pub start: Pose,
    pub destination: PortalDestination,
}

/// A fetched world document. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldDocument {
    /// Optional display name; falls back to the URL's last segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub splat_url: String,
    /// Spawn pose in the world's local frame.
    #[serde(flatten)]
    pub spawn: Pose,
    #[serde(default)]
    pub portals: Vec<PortalDescriptor>,
}

impl WorldDocument {
    /// Parse a document from JSON text, attributing errors to `url`.
    pub fn from_json(url: &WorldUrl, text: &str) -> Result<Self, FetchError> {
        let doc: WorldDocument = serde_json::from_str(text)?;
        doc.validate(url)?;
        Ok(doc)
    }

    fn validate(&self, url: &WorldUrl) -> Result<(), FetchError> {
        if self.splat_url.trim().is_empty() {
            return Err(FetchError::Malformed {
                url: url.clone(),
                reason: "splatUrl is empty".into(),
            });
        }
        for (i, portal) in self.portals.iter().enumerate() {
            if portal.destination.url.trim().is_empty() {
                return Err(FetchError::Malformed {
                    url: url.clone(),
                    reason: format!("portal {i} has an empty destination url"),
                });
            }
            if !portal.start.position.is_finite() || !portal.destination.pose.position.is_finite()
            {
                return Err(FetchError::Malformed {
                    url: url.clone(),
                    reason: format!("portal {i} has a non-finite position"),
                });
            }
        }
        Ok(())
    }

    /// Display name for labels: explicit `name`, else derived from the URL.
    pub fn display_name<'a>(&'a self, url: &'a WorldUrl) -> &'a str {
        self.name.as_deref().unwrap_or_else(|| url.display_name())
    }

    /// Portal destinations resolved against the document's own URL, in
    /// descriptor order. Unresolvable references are skipped.
    pub fn destinations(&self, url: &WorldUrl) -> Vec<(usize, WorldUrl)> {
        self.portals
            .iter()
            .enumerate()
            .filter_map(|(i, p)| match url.join(&p.destination.url) {
                Ok(dest) => Some((i, dest)),
                Err(e) => {
                    tracing::warn!(%url, portal = i, error = %e, "unresolvable portal destination");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    const GARDEN: &str = r#"{
        "splatUrl": "garden.splat",
        "position": [0, 1.5, 0],
        "rotation": [0, 0, 0, 1],
        "portals": [
            { "start": { "position": [2, 0, -3], "rotation": [0, 0, 0, 1] },
              "destination": { "url": "cave.json", "position": [0, 0, 4], "rotation": [0, 1, 0, 0] } }
        ]
    }"#;

    fn url(s: &str) -> WorldUrl {
        WorldUrl::parse(s).unwrap()
    }

    #[test]
    fn parses_document_shape() {
        let doc = WorldDocument::from_json(&url("worlds/garden.json"), GARDEN).unwrap();
        assert_eq!(doc.splat_url, "garden.splat");
        assert_eq!(doc.spawn.position, Vec3::new(0.0, 1.5, 0.0));
        assert_eq!(doc.portals.len(), 1);
        let p = &doc.portals[0];
        assert_eq!(p.start.position, Vec3::new(2.0, 0.0, -3.0));
        assert_eq!(p.destination.url, "cave.json");
        assert_eq!(p.destination.pose.position, Vec3::new(0.0, 0.0, 4.0));
        assert_eq!(p.destination.pose.rotation, Quat::from_xyzw(0.0, 1.0, 0.0, 0.0));
    }

    #[test]
    fn portals_and_rotation_default() {
        let doc = WorldDocument::from_json(
            &url("a.json"),
            r#"{"splatUrl": "a.splat", "position": [0, 0, 0]}"#,
        )
        .unwrap();
        assert!(doc.portals.is_empty());
        assert_eq!(doc.spawn.rotation, Quat::IDENTITY);
    }

    #[test]
    fn missing_splat_url_is_json_error() {
        let err = WorldDocument::from_json(&url("a.json"), r#"{"position": [0, 0, 0]}"#)
            .unwrap_err();
        assert!(matches!(err, FetchError::Json(_)));
    }

    #[test]
    fn empty_destination_is_malformed() {
        let text = r#"{"splatUrl": "a.splat", "position": [0,0,0], "portals": [
            {"start": {"position": [0,0,0]}, "destination": {"url": "", "position": [0,0,0]}}
        ]}"#;
        let err = WorldDocument::from_json(&url("a.json"), text).unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }

    #[test]
    fn destinations_resolve_relative_to_document() {
        let doc = WorldDocument::from_json(&url("worlds/garden.json"), GARDEN).unwrap();
        let dests = doc.destinations(&url("worlds/garden.json"));
        assert_eq!(dests, vec![(0, url("worlds/cave.json"))]);
    }

    #[test]
    fn display_name_prefers_explicit_name() {
        let u = url("worlds/garden.json");
        let mut doc = WorldDocument::from_json(&u, GARDEN).unwrap();
        assert_eq!(doc.display_name(&u), "garden");
        doc.name = Some("Rose Garden".into());
        assert_eq!(doc.display_name(&u), "Rose Garden");
    }
}
