use serde::Deserialize;

/// Request body for creating a loyalty card.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    pub name: String,
    pub logo: String,
    pub color: String,
    pub total_visits: i32,
}
