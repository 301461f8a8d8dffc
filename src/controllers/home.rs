use axum::Json;

#[derive(serde::Serialize)]
pub struct Health {
    pub status: &'static str,
}

#[tracing::instrument(name = "[GET] /")]
pub async fn index() -> Json<Health> {
    Json(Health { status: "ok" })
}
