use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, instrument, warn};

use super::dto::{Dashboard, ProjectResponse, SubmitProjectRequest};
use super::services::{load_dashboard, submit_project};
use crate::{auth::services::AuthUser, error::PersistenceError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/projects", get(dashboard).post(create_project))
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Dashboard>, (StatusCode, String)> {
    load_dashboard(&state, user_id)
        .await
        .map(Json)
        .map_err(persistence)
}

#[instrument(skip(state, body))]
pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<SubmitProjectRequest>,
) -> Result<Json<ProjectResponse>, (StatusCode, String)> {
    let project = body.project.trim();
    if project.is_empty() {
        warn!(%user_id, "empty project description");
        return Err((StatusCode::BAD_REQUEST, "project is required".into()));
    }

    let today = OffsetDateTime::now_utc().date();
    submit_project(&state, user_id, project, today)
        .await
        .map(Json)
        .map_err(persistence)
}

fn persistence(e: PersistenceError) -> (StatusCode, String) {
    match e {
        PersistenceError::UserNotFound(_) => (StatusCode::UNAUTHORIZED, "User not found".into()),
        other => {
            error!(error = %other, "persistence failure");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        design::testing::{design_json, CannedDesigner},
        store::memory::MemoryStore,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn blank_project_is_rejected() {
        let (store, user) = MemoryStore::with_user("maker");
        let designer = CannedDesigner::ok(design_json("Uno", &[]));
        let st = AppState::fake(Arc::new(store), Arc::new(designer));
        let body = SubmitProjectRequest { project: "   ".into() };
        let Err((status, _)) = create_project(State(st), AuthUser(user), Json(body)).await else {
            panic!("blank project must be rejected");
        };
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn response_serializes_flat_dashboard_fields() {
        let (store, user) = MemoryStore::with_user("maker");
        let st = AppState::fake(
            Arc::new(store),
            Arc::new(CannedDesigner::ok(design_json("ESP32", &["OLED", "Buzzer"]))),
        );
        let body = SubmitProjectRequest { project: "alarm clock".into() };
        let Json(resp) = create_project(State(st), AuthUser(user), Json(body)).await.unwrap();

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["username"], "maker");
        assert_eq!(json["streak"], 1);
        assert_eq!(json["domains"], serde_json::json!(["display", "actuator"]));
        assert_eq!(json["wokwi_diagram"]["parts"][1]["type"], "wokwi-ssd1306");
        assert_eq!(json["chats"][0]["project"], "alarm clock");
        assert!(json.get("notice").is_none());
    }

    #[test]
    fn missing_user_maps_to_unauthorized() {
        let (status, _) = persistence(PersistenceError::UserNotFound(uuid::Uuid::new_v4()));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = persistence(PersistenceError::UnknownDomain("robotics".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
