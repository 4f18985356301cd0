use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub status: &'static str,
}

/// Body of `PUT /filter`.
#[derive(Deserialize)]
pub struct FilterUpdate {
    pub field: String,
    #[serde(default)]
    pub value: String,
}
