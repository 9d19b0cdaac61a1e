use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct InstitutionSummary {
    pub id: String,
    pub name: String,
}

pub async fn list_institutions(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<InstitutionSummary>> {
    let institutions = state
        .institutions
        .list()
        .into_iter()
        .map(|(id, name)| InstitutionSummary {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect();
    Json(institutions)
}
