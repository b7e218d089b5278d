//! Remote client configuration.

use std::path::PathBuf;
use std::time::Duration;

use depotrack_core::RemoteId;

/// Configuration for the Creator client.
///
/// Injected into [`crate::CreatorClient`] and [`crate::TokenManager`] rather
/// than living in process-wide state. Built from the environment in the
/// server binary; constructed directly in tests.
#[derive(Debug, Clone)]
pub struct CreatorConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Data API base, e.g. `https://www.zohoapis.eu`.
    pub api_domain: String,
    /// OAuth2 accounts base, e.g. `https://accounts.zoho.eu`.
    pub accounts_domain: String,
    pub owner_name: String,
    pub app_link_name: String,
    /// Token cache file, read at startup and overwritten on every refresh.
    pub token_file: PathBuf,
    /// Fixed per-request ceiling applied to every outbound call.
    pub request_timeout: Duration,
}

impl CreatorConfig {
    /// Read the configuration from the environment.
    ///
    /// Missing credentials are warned about and left empty: the application
    /// stays usable offline, and remote calls fail with a visible status.
    pub fn from_env() -> Self {
        fn var_or(name: &str, default: &str) -> String {
            std::env::var(name).unwrap_or_else(|_| {
                if default.is_empty() {
                    tracing::warn!("{name} not set; remote mirroring will fail until configured");
                }
                default.to_string()
            })
        }

        Self {
            client_id: var_or("ZOHO_CLIENT_ID", ""),
            client_secret: var_or("ZOHO_CLIENT_SECRET", ""),
            refresh_token: var_or("ZOHO_REFRESH_TOKEN", ""),
            api_domain: var_or("ZOHO_API_DOMAIN", "https://www.zohoapis.eu"),
            accounts_domain: var_or("ZOHO_ACCOUNTS_DOMAIN", "https://accounts.zoho.eu"),
            owner_name: var_or("ZOHO_OWNER_NAME", ""),
            app_link_name: var_or("ZOHO_APP_LINK_NAME", ""),
            token_file: PathBuf::from(var_or("DEPOTRACK_TOKEN_FILE", "token.json")),
            request_timeout: Duration::from_secs(20),
        }
    }

    /// OAuth2 token endpoint.
    pub fn token_url(&self) -> String {
        format!("{}/oauth/v2/token", self.accounts_domain)
    }

    /// Form endpoint for creates.
    pub fn form_url(&self, form: &str) -> String {
        format!(
            "{}/creator/v2/data/{}/{}/form/{}",
            self.api_domain, self.owner_name, self.app_link_name, form
        )
    }

    /// Form record endpoint for updates.
    pub fn form_record_url(&self, form: &str, id: &RemoteId) -> String {
        format!("{}/{}", self.form_url(form), id)
    }

    /// Report record endpoint for reads and deletes.
    pub fn report_record_url(&self, report: &str, id: &RemoteId) -> String {
        format!(
            "{}/creator/v2/data/{}/{}/report/{}/{}",
            self.api_domain, self.owner_name, self.app_link_name, report, id
        )
    }
}

/// The report that lists all records of a form (platform naming convention).
pub fn report_for_form(form: &str) -> String {
    format!("All_{form}")
}
