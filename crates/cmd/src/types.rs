use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Deserialize)]
pub struct RefreshResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct FilterUpdate<'a> {
    pub field: &'a str,
    pub value: &'a str,
}

/// Pulls the agent's `{ "error": ... }` message out of a failed response.
pub async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    response
        .json::<ErrorResponse>()
        .await
        .map(|e| e.error)
        .unwrap_or_else(|_| format!("HTTP {status}"))
}
