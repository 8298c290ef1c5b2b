//! The `ngh` hydration descriptor.
//!
//! The server writes one descriptor per component view as a JSON
//! attribute on the component host element. The client parses it back
//! to find the nodes it should claim instead of creating.
//!
//! ```text
//! {"nodes":{"2":"host.firstChild"},
//!  "templates":{"4":"t0"},
//!  "containers":{"4":{"views":[{"template":"t0","numRootNodes":1}],"numRootNodes":1}}}
//! ```
//!
//! Map keys are no-offset node indexes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Host attribute carrying the serialized descriptor.
pub const NGH_ATTR: &str = "ngh";

/// Host attribute opting a component subtree out of hydration.
pub const SKIP_HYDRATION_ATTR: &str = "ngSkipHydration";

/// Hydration data for one view.
///
/// Views inside containers also carry `template` and `numRootNodes`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_root_nodes: Option<usize>,
    /// Node index to navigation path (see [`crate::nav::NodePath`]).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub nodes: IndexMap<usize, String>,
    /// Container index to the template id of the container's own template.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub templates: IndexMap<usize, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub containers: IndexMap<usize, SerializedContainer>,
}

/// Hydration data for one container.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedContainer {
    #[serde(default)]
    pub views: Vec<SerializedView>,
    /// DOM root nodes across all views, not counting the anchor.
    pub num_root_nodes: usize,
}

impl SerializedView {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.templates.is_empty() && self.containers.is_empty()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
