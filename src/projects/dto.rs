use serde::{Deserialize, Serialize};

use crate::{design::ProjectDesign, domain::Domain, scene::SceneDocument, store::ChatEntry};

#[derive(Debug, Deserialize)]
pub struct SubmitProjectRequest {
    pub project: String,
}

/// What the home page shows without a new design.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub username: String,
    pub xp: i64,
    pub streak: i32,
    pub chats: Vec<ChatEntry>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    #[serde(flatten)]
    pub dashboard: Dashboard,
    /// XP earned by this submission; absent when nothing was awarded.
    pub gained: Option<i64>,
    pub domains: Vec<Domain>,
    pub design: Option<ProjectDesign>,
    pub sim_link: Option<String>,
    pub wokwi_diagram: Option<SceneDocument>,
    /// Set when the design could not be generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ProjectResponse {
    pub fn without_design(dashboard: Dashboard, notice: impl Into<String>) -> Self {
        Self {
            dashboard,
            gained: None,
            domains: Vec::new(),
            design: None,
            sim_link: None,
            wokwi_diagram: None,
            notice: Some(notice.into()),
            warnings: Vec::new(),
        }
    }
}
