use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use crate::model::DeviceKind;

const GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Failures of the generative upstream. Callers of [`device_info`] never see
/// these; they select the static table instead.
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status: {0}")]
    Status(StatusCode),

    #[error("malformed response: {0}")]
    Malformed(&'static str),

    #[error("invalid JSON payload: {0}")]
    Parse(#[from] serde_json::Error),
}

fn build_prompt(kind: DeviceKind) -> String {
    format!(
        "Provide detailed information about e-waste recycling for a {kind}.\n\
         Format the response as a JSON object with these fields:\n\
         - \"type\": The full name/category of the device\n\
         - \"elements\": The key materials and elements found in this device (comma-separated values)\n\
         - \"environmental_harm\": Environmental impacts if improperly disposed (max 50 words)\n\
         - \"recycling_benefits\": Benefits of properly recycling this device (max 50 words)\n\n\
         Return ONLY the JSON object with no additional text."
    )
}

fn candidate_text(body: &Value) -> Result<&str, EnrichError> {
    body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or(EnrichError::Malformed("no candidate text"))
}

/// Models routinely wrap the JSON in a markdown fence despite the prompt.
fn strip_code_fence(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// One call to the generative API; no retries.
pub async fn describe(
    client: &Client,
    api_key: &str,
    kind: DeviceKind,
) -> Result<Value, EnrichError> {
    let payload = json!({
        "contents": [
            {
                "parts": [
                    { "text": build_prompt(kind) }
                ]
            }
        ]
    });

    let response = client
        .post(GEMINI_URL)
        .query(&[("key", api_key)])
        .json(&payload)
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(EnrichError::Status(response.status()));
    }

    let body: Value = response.json().await?;
    let text = candidate_text(&body)?;

    // Returned as-is on parse success; the four expected fields are not
    // validated.
    Ok(serde_json::from_str(strip_code_fence(text))?)
}

/// Static e-waste table used whenever the generative API fails.
pub fn fallback_info(label: &str) -> Value {
    match label {
        "smartphone" => json!({
            "type": "Smartphone/Mobile Device",
            "elements": "Lithium, Cobalt, Gold, Silver, Copper, Palladium, Rare Earth Elements",
            "environmental_harm": "Contains toxic materials like lead, mercury, and cadmium that can leach into soil and water.",
            "recycling_benefits": "Recycling reduces the need for mining rare earth metals and prevents toxic chemicals from entering ecosystems."
        }),
        "laptop" => json!({
            "type": "Laptop/Computer",
            "elements": "Aluminum, Copper, Gold, Silver, Lead, Mercury, Plastic, Glass, Lithium",
            "environmental_harm": "Computers contain flame retardants and heavy metals that are persistent pollutants.",
            "recycling_benefits": "Recycling 1 million laptops saves energy equivalent to electricity used by 3,657 homes in a year."
        }),
        _ => json!({}),
    }
}

/// Describe a device, degrading to the static table on any upstream failure.
pub async fn device_info(client: &Client, api_key: &str, kind: DeviceKind) -> Value {
    match describe(client, api_key, kind).await {
        Ok(info) => info,
        Err(err) => {
            warn!("Enrichment failed for {kind}, using static table: {err}");
            fallback_info(kind.as_str())
        }
    }
}
