use std::fs;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub register: bool,
}

/// Database auth token, read once at startup. A missing credentials file
/// disables auth on writes instead of failing the boot.
pub fn load_auth_token(path: &str) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(token) => Some(token.trim().to_string()),
        Err(err) => {
            warn!("Failed to read database credentials from {path}: {err}");
            None
        }
    }
}

// The record is nested under its own title inside the pushed object. Odd
// shape, but it is what consumers of the /events collection expect.
fn push_payload(event: &Event) -> Value {
    let mut wrapper = Map::new();
    wrapper.insert(event.title.clone(), json!(event));
    Value::Object(wrapper)
}

/// Append the event under the "/events" collection. The push key is
/// generated by the database; remote failures are logged and swallowed.
pub async fn push_event(client: &Client, database_url: &str, auth: Option<&str>, event: &Event) {
    let endpoint = format!("{}/events.json", database_url.trim_end_matches('/'));

    let mut request = client.post(&endpoint).json(&push_payload(event));
    if let Some(token) = auth {
        request = request.query(&[("auth", token)]);
    }

    match request.send().await {
        Ok(response) if response.status().is_success() => {
            info!("Event '{}' pushed to /events", event.title);
        }
        Ok(response) => {
            warn!(
                "Event push for '{}' rejected with status {}",
                event.title,
                response.status()
            );
        }
        Err(err) => {
            warn!("Event push for '{}' failed: {err}", event.title);
        }
    }
}
