use time::Date;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::dto::{Dashboard, ProjectResponse};
use crate::{
    design::request_design,
    domain::classify,
    error::PersistenceError,
    scene::generate_scene,
    state::AppState,
};

pub async fn load_dashboard(st: &AppState, user_id: Uuid) -> Result<Dashboard, PersistenceError> {
    let user = st
        .store
        .get_user(user_id)
        .await?
        .ok_or(PersistenceError::UserNotFound(user_id))?;
    let chats = st.store.list_chats(user_id).await?;
    Ok(Dashboard {
        username: user.username,
        xp: user.progress.xp,
        streak: user.progress.streak,
        chats,
    })
}

/// Handle one submitted project idea end to end.
///
/// A failed design leaves every piece of user state untouched. A failed
/// progress write is rolled back by the store, so the response then carries
/// the design but no XP.
#[instrument(skip(st, project))]
pub async fn submit_project(
    st: &AppState,
    user_id: Uuid,
    project: &str,
    today: Date,
) -> Result<ProjectResponse, PersistenceError> {
    let mut dashboard = load_dashboard(st, user_id).await?;

    let design = match request_design(st.designer.as_ref(), project).await {
        Ok(d) => d,
        Err(e) => {
            error!(error = %e, %user_id, "design generation failed");
            return Ok(ProjectResponse::without_design(
                dashboard,
                "Could not generate a design right now. Please try again.",
            ));
        }
    };

    let domains = classify(&design.components);
    let mut warnings = Vec::new();

    let gained = match st.store.score_interaction(user_id, &domains, today).await {
        Ok(scored) => {
            dashboard.xp = scored.progress.xp;
            dashboard.streak = scored.progress.streak;
            Some(scored.xp_gained)
        }
        Err(e) => {
            error!(error = %e, %user_id, "progress update failed, nothing awarded");
            warnings.push(
                "Progress could not be saved; no XP was awarded for this design.".to_string(),
            );
            None
        }
    };

    let (scene, sim_link) = generate_scene(&design.microcontroller, &design.components);

    match st.store.append_chat(user_id, project).await {
        Ok(entry) => dashboard.chats.insert(0, entry),
        Err(e) => {
            warn!(error = %e, %user_id, "append chat failed");
            warnings.push("Project could not be added to your history.".to_string());
        }
    }

    info!(
        %user_id,
        domains = ?domains,
        gained = ?gained,
        parts = scene.parts.len(),
        "project design delivered"
    );

    Ok(ProjectResponse {
        dashboard,
        gained,
        domains: domains.into_iter().collect(),
        design: Some(design),
        sim_link: Some(sim_link.to_string()),
        wokwi_diagram: Some(scene),
        notice: None,
        warnings,
    })
}
