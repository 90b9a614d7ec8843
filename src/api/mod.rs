// Cluster management API client
//
// Thin authenticated pass-through over the management REST endpoints. The
// session cookie from `/login` is held by the reqwest cookie store; all
// cluster logic stays server-side.

pub mod types;

use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::config::Credentials;
use crate::output::MeshError;

pub use types::*;

const API_PORT: u16 = 4000;

/// Control-job verbs accepted by the client control endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlJob {
    Attach,
    Detach,
}

impl ControlJob {
    pub fn as_api_value(&self) -> &'static str {
        match self {
            ControlJob::Attach => "toBeAttached",
            ControlJob::Detach => "toBeDetached",
        }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl ApiClient {
    pub fn new(server: &str, credentials: Credentials) -> Result<Self, MeshError> {
        // Management planes ship self-signed certificates
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| MeshError::api("/", format!("failed to build HTTP client: {}", e)))?;

        Ok(ApiClient {
            http,
            base_url: format!("https://{}:{}", server.trim(), API_PORT),
            credentials,
        })
    }

    /// Build a client against the configured management server and log in
    pub async fn connect(settings: &crate::Settings) -> Result<Self, MeshError> {
        let client = ApiClient::new(settings.api_server(), settings.api.clone())?;
        client.login().await?;
        Ok(client)
    }

    /// Authenticate the session; fatal for any command requiring API data
    pub async fn login(&self) -> Result<(), MeshError> {
        let url = format!("{}/login", self.base_url);
        debug!(url, "logging in to management API");

        let response = self
            .http
            .post(&url)
            .json(&json!({
                "username": self.credentials.username,
                "password": self.credentials.password,
            }))
            .send()
            .await
            .map_err(|e| MeshError::Api {
                endpoint: "/login".to_string(),
                message: format!("cannot reach management server: {}", e),
                suggestion: Some("Check the manager name set via 'meshctl define manager'".to_string()),
            })?;

        if !response.status().is_success() {
            return Err(MeshError::Api {
                endpoint: "/login".to_string(),
                message: format!("login failed with status {}", response.status()),
                suggestion: Some("Check the API credentials set via 'meshctl define apiuser'".to_string()),
            });
        }

        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, MeshError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url, "GET");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MeshError::api(endpoint, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(MeshError::api(
                endpoint,
                format!("unexpected status {}", response.status()),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| MeshError::api(endpoint, format!("cannot decode response: {}", e)))
    }

    async fn post_json(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, MeshError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url, "POST");

        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| MeshError::api(endpoint, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(MeshError::api(
                endpoint,
                format!("unexpected status {}", response.status()),
            ));
        }

        // Some control endpoints answer with bare `null`
        response
            .json::<serde_json::Value>()
            .await
            .or_else(|_| Ok(serde_json::Value::Null))
    }

    pub async fn get_cluster_status(&self) -> Result<ClusterStatus, MeshError> {
        self.get_json("/status").await
    }

    pub async fn get_space_allocation(&self) -> Result<SpaceAllocation, MeshError> {
        self.get_json("/getSpaceAllocation").await
    }

    pub async fn get_servers(&self) -> Result<Vec<Target>, MeshError> {
        self.get_json("/servers/all/0/0").await
    }

    pub async fn get_clients(&self) -> Result<Vec<Client>, MeshError> {
        self.get_json("/clients/all/0/0").await
    }

    pub async fn get_volumes(&self) -> Result<Vec<Volume>, MeshError> {
        self.get_json("/volumes/all/0/0").await
    }

    pub async fn get_vpgs(&self) -> Result<Vec<Vpg>, MeshError> {
        self.get_json("/volumeProvisioningGroups/all").await
    }

    pub async fn get_drive_classes(&self) -> Result<Vec<DriveClass>, MeshError> {
        self.get_json("/diskClasses/all").await
    }

    pub async fn get_target_classes(&self) -> Result<Vec<TargetClass>, MeshError> {
        self.get_json("/serverClasses/all").await
    }

    /// Target short names, the identifiers used for fleet SSH operations
    pub async fn get_target_list(&self) -> Result<Vec<String>, MeshError> {
        Ok(self
            .get_servers()
            .await?
            .into_iter()
            .map(|t| crate::config::files::short_name(&t.node_id).to_string())
            .collect())
    }

    /// Client short names
    pub async fn get_client_list(&self) -> Result<Vec<String>, MeshError> {
        Ok(self
            .get_clients()
            .await?
            .into_iter()
            .map(|c| crate::config::files::short_name(&c.client_id).to_string())
            .collect())
    }

    /// Request a coordinated shutdown of every target in the cluster
    pub async fn shutdown_all_targets(&self) -> Result<(), MeshError> {
        self.post_json(
            "/servers/setBatchControlJobs",
            &json!({ "control": "shutdownAll" }),
        )
        .await?;
        Ok(())
    }

    /// Submit an attach/detach control job for one volume on one client.
    /// The endpoint answers `null` on success and an error description
    /// otherwise.
    pub async fn set_control_job(
        &self,
        client_id: &str,
        volume: &str,
        job: ControlJob,
    ) -> Result<Option<String>, MeshError> {
        let payload = json!({
            "_id": client_id,
            "controlJobs": [{
                "uuid": volume,
                "control": job.as_api_value(),
            }]
        });

        let response = self.post_json("/clients/setControlJobs", &payload).await?;
        if response.is_null() {
            Ok(None)
        } else {
            Ok(Some(response.to_string()))
        }
    }

    /// Submit a volume create/remove envelope to `/volumes/save`
    pub async fn save_volume(
        &self,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, MeshError> {
        self.post_json("/volumes/save", payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_job_api_values() {
        assert_eq!(ControlJob::Attach.as_api_value(), "toBeAttached");
        assert_eq!(ControlJob::Detach.as_api_value(), "toBeDetached");
    }

    #[test]
    fn test_base_url_uses_management_port() {
        let client = ApiClient::new("mgr1.lab.example.com", Credentials::new("admin", "pw")).unwrap();
        assert_eq!(client.base_url, "https://mgr1.lab.example.com:4000");
    }
}
