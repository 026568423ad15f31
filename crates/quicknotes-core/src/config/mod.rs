//! Firebase client configuration.
//!
//! Provides `FirebaseConfig`, the public endpoint/key pair needed to talk to
//! Firebase Auth and the Realtime Database, and its validated form
//! `ResolvedFirebaseConfig`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::{is_http_url, normalize_text_option};

/// Collection that holds the notes.
pub const DEFAULT_COLLECTION: &str = "notes";
/// Timeout applied to every auth call and database write/delete.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

pub const ENV_API_KEY: &str = "QUICKNOTES_FIREBASE_API_KEY";
pub const ENV_DATABASE_URL: &str = "QUICKNOTES_DATABASE_URL";
pub const ENV_COLLECTION: &str = "QUICKNOTES_COLLECTION";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Firebase is not configured: missing {0}")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Client configuration as stored in profiles or the environment.
///
/// These are public values shipped with any Firebase client app. Secret
/// credentials must never be stored here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FirebaseConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Validated configuration ready for building clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFirebaseConfig {
    pub api_key: String,
    pub database_url: String,
    pub collection: String,
    pub request_timeout: Duration,
}

impl FirebaseConfig {
    /// Read configuration from `QUICKNOTES_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(ENV_API_KEY).ok(),
            database_url: std::env::var(ENV_DATABASE_URL).ok(),
            collection: std::env::var(ENV_COLLECTION).ok(),
            request_timeout_secs: None,
        }
    }

    /// Fill every unset field of `self` from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            api_key: normalize_text_option(self.api_key)
                .or_else(|| normalize_text_option(fallback.api_key)),
            database_url: normalize_text_option(self.database_url)
                .or_else(|| normalize_text_option(fallback.database_url)),
            collection: normalize_text_option(self.collection)
                .or_else(|| normalize_text_option(fallback.collection)),
            request_timeout_secs: self.request_timeout_secs.or(fallback.request_timeout_secs),
        }
    }

    pub fn resolve(self) -> Result<ResolvedFirebaseConfig, ConfigError> {
        let api_key = normalize_text_option(self.api_key).ok_or(ConfigError::Missing("api_key"))?;
        let database_url = normalize_text_option(self.database_url)
            .ok_or(ConfigError::Missing("database_url"))?;
        if !is_http_url(&database_url) {
            return Err(ConfigError::Invalid(
                "database_url must include http:// or https://".to_string(),
            ));
        }

        let collection = normalize_text_option(self.collection)
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());
        let collection = collection.trim_matches('/').to_string();
        if collection.is_empty() {
            return Err(ConfigError::Invalid("collection must not be empty".to_string()));
        }

        let timeout_secs = match self.request_timeout_secs {
            Some(0) => {
                return Err(ConfigError::Invalid(
                    "request_timeout_secs must be greater than zero".to_string(),
                ))
            }
            Some(secs) => secs,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(ResolvedFirebaseConfig {
            api_key,
            database_url: database_url.trim_end_matches('/').to_string(),
            collection,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Extract the Firebase endpoints from an Android `google-services.json`.
pub fn parse_google_services(payload: &str) -> Result<FirebaseConfig, ConfigError> {
    let services: GoogleServices = serde_json::from_str(payload)
        .map_err(|error| ConfigError::Invalid(format!("invalid google-services.json: {error}")))?;

    let database_url = normalize_text_option(services.project_info.firebase_url)
        .ok_or(ConfigError::Missing("project_info.firebase_url"))?;
    let api_key = services
        .client
        .into_iter()
        .flat_map(|client| client.api_key)
        .find_map(|key| normalize_text_option(Some(key.current_key)))
        .ok_or(ConfigError::Missing("client[].api_key[].current_key"))?;

    Ok(FirebaseConfig {
        api_key: Some(api_key),
        database_url: Some(database_url),
        collection: None,
        request_timeout_secs: None,
    })
}

// ---------------------------------------------------------------------------
// Private
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GoogleServices {
    project_info: GoogleProjectInfo,
    #[serde(default)]
    client: Vec<GoogleClient>,
}

#[derive(Debug, Deserialize)]
struct GoogleProjectInfo {
    #[serde(default)]
    firebase_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleClient {
    #[serde(default)]
    api_key: Vec<GoogleApiKey>,
}

#[derive(Debug, Deserialize)]
struct GoogleApiKey {
    current_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn complete() -> FirebaseConfig {
        FirebaseConfig {
            api_key: Some("key".to_string()),
            database_url: Some("https://demo-default-rtdb.firebaseio.com/".to_string()),
            collection: None,
            request_timeout_secs: None,
        }
    }

    #[test]
    fn resolve_applies_defaults() {
        let resolved = complete().resolve().unwrap();
        assert_eq!(
            resolved,
            ResolvedFirebaseConfig {
                api_key: "key".to_string(),
                database_url: "https://demo-default-rtdb.firebaseio.com".to_string(),
                collection: "notes".to_string(),
                request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            }
        );
    }

    #[test]
    fn resolve_rejects_missing_and_invalid_values() {
        let missing_key = FirebaseConfig {
            api_key: Some("  ".to_string()),
            ..complete()
        };
        assert_eq!(
            missing_key.resolve().unwrap_err(),
            ConfigError::Missing("api_key")
        );

        let bad_url = FirebaseConfig {
            database_url: Some("demo.firebaseio.com".to_string()),
            ..complete()
        };
        assert!(matches!(bad_url.resolve(), Err(ConfigError::Invalid(_))));

        let zero_timeout = FirebaseConfig {
            request_timeout_secs: Some(0),
            ..complete()
        };
        assert!(matches!(zero_timeout.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn or_prefers_self_and_skips_blank_values() {
        let primary = FirebaseConfig {
            api_key: Some(" ".to_string()),
            collection: Some("work-notes".to_string()),
            ..FirebaseConfig::default()
        };
        let merged = primary.or(complete());
        assert_eq!(merged.api_key.as_deref(), Some("key"));
        assert_eq!(merged.collection.as_deref(), Some("work-notes"));
    }

    #[test]
    fn parse_google_services_extracts_endpoints() {
        let payload = r#"
        {
          "project_info": {
            "project_number": "123",
            "firebase_url": "https://quicknotes-demo-default-rtdb.firebaseio.com",
            "project_id": "quicknotes-demo"
          },
          "client": [
            {
              "client_info": { "mobilesdk_app_id": "1:123:android:abc" },
              "api_key": [ { "current_key": "AIzaDemo" } ]
            }
          ],
          "configuration_version": "1"
        }
        "#;

        let config = parse_google_services(payload).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("AIzaDemo"));
        assert_eq!(
            config.database_url.as_deref(),
            Some("https://quicknotes-demo-default-rtdb.firebaseio.com")
        );
    }

    #[test]
    fn parse_google_services_requires_database_url() {
        let payload = r#"{ "project_info": {}, "client": [] }"#;
        assert_eq!(
            parse_google_services(payload).unwrap_err(),
            ConfigError::Missing("project_info.firebase_url")
        );
    }
}
