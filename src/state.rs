use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    config::Config,
    events,
    model::{DeviceKind, Model},
};

pub struct AppState {
    pub config: Config,
    /// One inference at a time; the session is not re-entrant.
    pub model: Mutex<Model>,
    pub http: Client,
    pub database_auth: Option<String>,
    /// Most recent classification, shared across all clients. Last write
    /// wins; /analyze reports whatever upload finished last.
    pub last_device: Mutex<Option<DeviceKind>>,
    pub events: Mutex<Vec<Value>>,
    pub blogs: Mutex<Vec<Value>>,
}

impl AppState {
    pub fn new(config: Config, model: Model) -> Arc<Self> {
        let database_auth = events::load_auth_token(&config.firebase_credentials_path);

        Arc::new(Self {
            model: Mutex::new(model),
            http: Client::new(),
            database_auth,
            last_device: Mutex::new(None),
            events: Mutex::new(Vec::new()),
            blogs: Mutex::new(Vec::new()),
            config,
        })
    }
}
