//! Sagemcom XMO device transport
//!
//! The modem exposes a JSON-RPC style endpoint at `/cgi/json-req`. Every
//! request carries a session id and an auth key derived from a nonce
//! challenge (MD5 or SHA-512 depending on firmware). The scheduler treats
//! this client as a capability that either returns one fresh device tree
//! or fails; a session is opened per fetch and not reused across cycles.

use crate::config::{EncryptionMethod, ModemSettings};
use async_trait::async_trait;
use md5::Md5;
use rand::Rng;
use serde_json::{json, Value};
use sha2::{Digest, Sha512};
use thiserror::Error;
use tracing::debug;

const API_ENDPOINT: &str = "/cgi/json-req";
const REQUEST_NO_ERROR: &str = "XMO_REQUEST_NO_ERR";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("login rejected: {0}")]
    Auth(String),
    #[error("unexpected api reply: {0}")]
    Protocol(String),
}

/// Capability the scheduler depends on: one fetch, one fresh device tree.
#[async_trait]
pub trait DeviceTransport {
    async fn fetch(&self) -> Result<Value, TransportError>;
}

pub struct SagemcomClient {
    http: reqwest::Client,
    settings: ModemSettings,
}

struct Session {
    id: u64,
    request_id: u64,
    server_nonce: String,
}

impl SagemcomClient {
    pub fn new(settings: &ModemSettings) -> Result<Self, TransportError> {
        // Modems ship self-signed certificates.
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            http,
            settings: settings.clone(),
        })
    }

    fn api_url(&self) -> String {
        let scheme = if self.settings.ssl { "https" } else { "http" };
        format!("{scheme}://{}{API_ENDPOINT}", self.settings.hostname)
    }

    fn hash(&self, input: &str) -> String {
        match self.settings.encryption {
            EncryptionMethod::Md5 => hex::encode(Md5::digest(input.as_bytes())),
            EncryptionMethod::Sha512 => hex::encode(Sha512::digest(input.as_bytes())),
        }
    }

    fn credential_hash(&self, server_nonce: &str) -> String {
        let password_hash = self.hash(&self.settings.password);
        self.hash(&format!(
            "{}:{server_nonce}:{password_hash}",
            self.settings.username
        ))
    }

    fn auth_key(&self, server_nonce: &str, request_id: u64, client_nonce: u32) -> String {
        let credential = self.credential_hash(server_nonce);
        self.hash(&format!(
            "{credential}:{request_id}:{client_nonce}:JSON:{API_ENDPOINT}"
        ))
    }

    async fn request(
        &self,
        session: &mut Session,
        actions: Value,
    ) -> Result<Value, TransportError> {
        let client_nonce: u32 = rand::thread_rng().gen_range(0..500_000);
        let auth_key = self.auth_key(&session.server_nonce, session.request_id, client_nonce);

        let request = json!({
            "request": {
                "id": session.request_id,
                "session-id": session.id.to_string(),
                "priority": true,
                "actions": actions,
                "cnonce": client_nonce,
                "auth-key": auth_key,
            }
        });
        session.request_id += 1;

        debug!(url = %self.api_url(), "sending json-req");
        let response = self
            .http
            .post(self.api_url())
            .form(&[("req", request.to_string())])
            .send()
            .await?
            .error_for_status()?;
        let reply: Value = response.json().await?;

        let error = reply["reply"]["error"]["description"]
            .as_str()
            .unwrap_or("malformed reply");
        if error != REQUEST_NO_ERROR {
            if error.contains("AUTH") || error.contains("LOGIN") {
                return Err(TransportError::Auth(error.to_string()));
            }
            return Err(TransportError::Protocol(error.to_string()));
        }
        Ok(reply)
    }

    async fn login(&self) -> Result<Session, TransportError> {
        let mut session = Session {
            id: 0,
            request_id: 0,
            server_nonce: String::new(),
        };
        let actions = json!([{
            "id": 0,
            "method": "logIn",
            "parameters": {
                "user": self.settings.username,
                "persistent": "true",
                "session-options": {
                    "nss": [{"name": "gtw", "uri": "http://sagemcom.com/gateway-data"}],
                    "language": "ident",
                    "context-flags": {"get-content-name": true, "local-time": true},
                    "capability-depth": 2,
                    "capability-flags": {"name": true, "default-value": false, "restriction": true, "description": false},
                    "time-format": "ISO_8601",
                }
            }
        }]);
        let reply = self.request(&mut session, actions).await?;

        let parameters = &reply["reply"]["actions"][0]["callbacks"][0]["parameters"];
        session.id = parameters["id"]
            .as_u64()
            .ok_or_else(|| TransportError::Auth("login reply carried no session id".to_string()))?;
        session.server_nonce = parameters["nonce"]
            .as_str()
            .ok_or_else(|| TransportError::Auth("login reply carried no nonce".to_string()))?
            .to_string();
        session.request_id = 1;
        debug!(session = session.id, "logged in to modem");
        Ok(session)
    }

    /// Fetch the subtree rooted at `xpath`. Deep xpaths are not supported
    /// by all firmwares, so callers fetch `Device` and walk locally.
    pub async fn get_value(&self, xpath: &str) -> Result<Value, TransportError> {
        let mut session = self.login().await?;
        let actions = json!([{
            "id": 0,
            "method": "getValue",
            "xpath": xpath,
            "options": {},
        }]);
        let reply = self.request(&mut session, actions).await?;
        let value = reply["reply"]["actions"][0]["callbacks"][0]["parameters"]["value"].clone();
        if value.is_null() {
            return Err(TransportError::Protocol(format!(
                "no value returned for xpath {xpath}"
            )));
        }
        Ok(value)
    }
}

#[async_trait]
impl DeviceTransport for SagemcomClient {
    async fn fetch(&self) -> Result<Value, TransportError> {
        self.get_value("Device").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncryptionMethod;

    fn client(encryption: EncryptionMethod) -> SagemcomClient {
        SagemcomClient::new(&ModemSettings {
            hostname: "192.168.100.1".to_string(),
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            encryption,
            ssl: true,
        })
        .unwrap()
    }

    #[test]
    fn sha512_hash_is_hex_encoded() {
        let c = client(EncryptionMethod::Sha512);
        let digest = c.hash("admin");
        assert_eq!(digest.len(), 128);
        assert!(digest.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn md5_hash_is_hex_encoded() {
        let c = client(EncryptionMethod::Md5);
        let digest = c.hash("admin");
        assert_eq!(digest.len(), 32);
    }

    #[test]
    fn auth_key_is_deterministic_for_fixed_inputs() {
        let c = client(EncryptionMethod::Sha512);
        let a = c.auth_key("nonce-123", 7, 42);
        let b = c.auth_key("nonce-123", 7, 42);
        assert_eq!(a, b);
        // any input change must change the key
        assert_ne!(a, c.auth_key("nonce-124", 7, 42));
        assert_ne!(a, c.auth_key("nonce-123", 8, 42));
        assert_ne!(a, c.auth_key("nonce-123", 7, 43));
    }

    #[test]
    fn api_url_respects_ssl_setting() {
        let mut settings = ModemSettings {
            hostname: "192.168.100.1".to_string(),
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            encryption: EncryptionMethod::Sha512,
            ssl: true,
        };
        let c = SagemcomClient::new(&settings).unwrap();
        assert_eq!(c.api_url(), "https://192.168.100.1/cgi/json-req");

        settings.ssl = false;
        let c = SagemcomClient::new(&settings).unwrap();
        assert_eq!(c.api_url(), "http://192.168.100.1/cgi/json-req");
    }
}
