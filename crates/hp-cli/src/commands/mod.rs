pub mod doctor;
pub mod status;
pub mod task;

/// Build a reqwest client, handling connection errors with a friendly message.
pub fn api_client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Map common reqwest errors to user-friendly messages.
pub fn friendly_error(err: reqwest::Error) -> anyhow::Error {
    if err.is_connect() {
        anyhow::anyhow!(
            "Could not connect to the hephaestus daemon. Is it running?\n  \
             (hint: start it with `hp-daemon` or check --api-url)"
        )
    } else if err.is_timeout() {
        anyhow::anyhow!("Request timed out. The daemon may be overloaded.")
    } else {
        anyhow::anyhow!("API request failed: {err}")
    }
}

/// Extract the `error` field from a JSON error body, if present.
pub fn error_message(body: &serde_json::Value) -> &str {
    body["error"].as_str().unwrap_or("unknown error")
}
