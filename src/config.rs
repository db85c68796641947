use std::{env, fmt::Display, str::FromStr};

use tracing::info;
use uuid::Uuid;

/// Request bodies larger than this are rejected before any handler runs.
pub const MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;

/// Upload extensions accepted by the upload endpoint.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Environment-derived settings, read once at startup.
pub struct Config {
    pub port: u16,
    pub secret_key: String,
    pub upload_dir: String,
    pub model_path: String,
    pub firebase_credentials_path: String,
    pub database_url: String,
    pub gemini_api_key: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", "5000"),
            secret_key: env::var("SECRET_KEY")
                .unwrap_or_else(|_| Uuid::new_v4().simple().to_string()),
            upload_dir: or_default("UPLOAD_FOLDER", "temp_uploads"),
            model_path: or_default("MODEL_PATH", "model/ewaste_graph.pb"),
            firebase_credentials_path: or_default(
                "FIREBASE_CREDENTIALS_PATH",
                "serviceAccountKey.json",
            ),
            database_url: or_default(
                "DATABASE_URL",
                "https://uploads-b9310-default-rtdb.firebaseio.com/",
            ),
            gemini_api_key: env::var("API_KEY").expect("API_KEY environment variable not set"),
        }
    }
}

fn or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    or_default(key, default)
        .parse()
        .unwrap_or_else(|e| panic!("Invalid {key} value: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test that touches process environment; keeps env mutation
    // out of the rest of the suite.
    #[test]
    fn load_falls_back_to_defaults() {
        env::set_var("API_KEY", "test-key");
        for key in [
            "PORT",
            "SECRET_KEY",
            "UPLOAD_FOLDER",
            "MODEL_PATH",
            "FIREBASE_CREDENTIALS_PATH",
            "DATABASE_URL",
        ] {
            env::remove_var(key);
        }

        let config = Config::load();

        assert_eq!(config.port, 5000);
        assert_eq!(config.upload_dir, "temp_uploads");
        assert_eq!(config.model_path, "model/ewaste_graph.pb");
        assert_eq!(config.firebase_credentials_path, "serviceAccountKey.json");
        assert_eq!(
            config.database_url,
            "https://uploads-b9310-default-rtdb.firebaseio.com/"
        );
        assert_eq!(config.gemini_api_key, "test-key");
        // Generated secret keys are 32 hex chars and unique per process start.
        assert_eq!(config.secret_key.len(), 32);
    }
}
