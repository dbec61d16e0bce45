use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The caller's session, handed to the checkout explicitly on every call.
pub struct SessionContext {
    credential: String,
}

impl SessionContext {
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
        }
    }

    /// Stable key for the session that does not reveal the credential.
    pub fn key(&self) -> String {
        format!("{:x}", Sha256::digest(self.credential.as_bytes()))
    }

    pub fn prefill(&self) -> Prefill {
        Prefill::from_credential(&self.credential)
    }
}

/// Form values read from the session credential's claims. Unverified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Prefill {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "cpf", alias = "cnpj", alias = "document_number")]
    pub document: Option<String>,
    #[serde(default, alias = "phone_number")]
    pub phone: Option<String>,
}

impl Prefill {
    /// Never fails: an unreadable credential just yields an empty prefill.
    pub fn from_credential(credential: &str) -> Self {
        match decode_claims(credential) {
            Ok(prefill) => prefill,
            Err(e) => {
                log::debug!("Could not read session claims for prefill: {}", e);
                Prefill::default()
            }
        }
    }
}

fn decode_claims(credential: &str) -> Result<Prefill, anyhow::Error> {
    let token = credential
        .trim()
        .strip_prefix("Bearer ")
        .unwrap_or(credential.trim());

    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("credential has no payload segment"))?;

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;

    Ok(serde_json::from_slice(&bytes)?)
}
