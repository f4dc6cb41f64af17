use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONNECTION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CtlError;
use crate::topology::TopologyDescriptor;

/// Field names used to identify the target of `netdel` and `usrdel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// `delete_emunet {emunet_uuid}`, `delete_user {name}`, as the service handlers expect.
    Service,
    /// `delete_emunet {name}`, `delete_user {uuid}`, as the first mocknet shell sent them.
    Legacy,
}

impl Default for WireFormat {
    fn default() -> Self {
        WireFormat::Service
    }
}

/// The `{success, data, message}` envelope every `/v1/` path answers with.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResponseEnvelope {
    pub fn decode(body: &str) -> Result<Self, CtlError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Split the envelope into the payload of a successful call or a service error.
    pub fn into_result(self) -> Result<Option<Value>, CtlError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(CtlError::service(self.message.unwrap_or_default()))
        }
    }
}

#[derive(Serialize)]
struct RegisterUser<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct CreateEmunet<'a> {
    user: &'a str,
    emunet: &'a str,
    capacity: u64,
}

#[derive(Serialize)]
struct ListEmunet<'a> {
    user: &'a str,
}

#[derive(Serialize)]
struct EmunetUuid<'a> {
    emunet_uuid: &'a str,
}

#[derive(Serialize)]
struct LegacyDeleteEmunet<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct LegacyDeleteUser<'a> {
    uuid: &'a str,
}

/// A stateless client of the emunet REST API.
///
/// Every method issues exactly one POST and returns the `data` of the response
/// envelope. Nothing is retried.
#[derive(Clone)]
pub struct EmunetClient {
    http: reqwest::Client,
    base_url: String,
    wire: WireFormat,
}

impl EmunetClient {
    pub fn new<S: Into<String>>(base_url: S, wire: WireFormat) -> Result<Self, CtlError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            http,
            base_url,
            wire,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn register_user(&self, name: &str) -> Result<Option<Value>, CtlError> {
        self.post("register_user", &RegisterUser { name }).await
    }

    pub async fn create_emunet(
        &self,
        user: &str,
        emunet: &str,
        capacity: u64,
    ) -> Result<Option<Value>, CtlError> {
        self.post(
            "create_emunet",
            &CreateEmunet {
                user,
                emunet,
                capacity,
            },
        )
        .await
    }

    pub async fn init_emunet(&self, topology: &TopologyDescriptor) -> Result<Option<Value>, CtlError> {
        self.post("init_emunet", topology).await
    }

    pub async fn update_emunet(&self, topology: &TopologyDescriptor) -> Result<Option<Value>, CtlError> {
        self.post("update_emunet", topology).await
    }

    pub async fn list_all(&self) -> Result<Option<Value>, CtlError> {
        self.send("list_all", None).await
    }

    pub async fn list_emunet(&self, user: &str) -> Result<Option<Value>, CtlError> {
        self.post("list_emunet", &ListEmunet { user }).await
    }

    pub async fn delete_emunet(&self, emunet_uuid: &str) -> Result<Option<Value>, CtlError> {
        match self.wire {
            WireFormat::Service => self.post("delete_emunet", &EmunetUuid { emunet_uuid }).await,
            WireFormat::Legacy => {
                self.post("delete_emunet", &LegacyDeleteEmunet { name: emunet_uuid })
                    .await
            }
        }
    }

    pub async fn delete_user(&self, name: &str) -> Result<Option<Value>, CtlError> {
        match self.wire {
            WireFormat::Service => self.post("delete_user", &RegisterUser { name }).await,
            WireFormat::Legacy => self.post("delete_user", &LegacyDeleteUser { uuid: name }).await,
        }
    }

    pub async fn get_emunet_info(&self, emunet_uuid: &str) -> Result<Option<Value>, CtlError> {
        self.post("get_emunet_info", &EmunetUuid { emunet_uuid })
            .await
    }

    pub async fn get_emunet_state(&self, emunet_uuid: &str) -> Result<Option<Value>, CtlError> {
        self.post("get_emunet_state", &EmunetUuid { emunet_uuid })
            .await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Option<Value>, CtlError> {
        let body = serde_json::to_string(body)?;
        self.send(path, Some(body)).await
    }

    async fn send(&self, path: &str, body: Option<String>) -> Result<Option<Value>, CtlError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, body = body.as_deref().unwrap_or(""), "sending request");

        let mut req = self.http.post(&url);
        if let Some(body) = body {
            req = req.body(body);
        }
        let text = req.send().await?.text().await?;

        let envelope = ResponseEnvelope::decode(&text).map_err(|e| {
            tracing::debug!(%url, response = %text, "response is not a valid envelope");
            e
        })?;
        tracing::debug!(%url, success = envelope.success, "received response");
        envelope.into_result()
    }
}
