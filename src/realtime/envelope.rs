//! Decode stage of the inbound pipeline: unwrap encrypted envelopes so that
//! nothing past this point ever sees ciphertext.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

use super::transport::ChannelError;

/// Ciphertext lifted out of an envelope, base64 already removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedPayload {
    pub iv: Option<Vec<u8>>,
    pub ciphertext: Vec<u8>,
}

/// Platform-provided cipher. Key agreement and storage live outside this
/// crate.
#[async_trait]
pub trait PayloadDecryptor: Send + Sync {
    async fn decrypt(&self, sealed: SealedPayload) -> Result<Vec<u8>, ChannelError>;
}

/// For deployments that never encrypt; any envelope is rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDecryption;

#[async_trait]
impl PayloadDecryptor for NoDecryption {
    async fn decrypt(&self, _sealed: SealedPayload) -> Result<Vec<u8>, ChannelError> {
        Err(ChannelError::Decrypt(
            "received an encrypted payload but no decryptor is configured".into(),
        ))
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    iv: Option<String>,
    payload: String,
}

/// Lift the ciphertext out of `raw` if it is an envelope
/// (`{"encrypted": true, "iv": "..", "payload": "<base64>"}`).
pub fn sealed_payload(raw: &Value) -> Result<Option<SealedPayload>, ChannelError> {
    if raw.get("encrypted").and_then(Value::as_bool) != Some(true) {
        return Ok(None);
    }
    let envelope: Envelope = serde_json::from_value(raw.clone()).map_err(|source| {
        ChannelError::Payload {
            event: "envelope".into(),
            source,
        }
    })?;
    let decode = |field: &str, text: &str| {
        STANDARD
            .decode(text)
            .map_err(|err| ChannelError::Decrypt(format!("invalid base64 in `{field}`: {err}")))
    };
    let iv = envelope.iv.as_deref().map(|iv| decode("iv", iv)).transpose()?;
    let ciphertext = decode("payload", &envelope.payload)?;
    Ok(Some(SealedPayload { iv, ciphertext }))
}

/// Return the plain JSON payload, decrypting if it arrived in an envelope.
pub async fn open_payload(decryptor: &dyn PayloadDecryptor, raw: Value) -> Result<Value, ChannelError> {
    let Some(sealed) = sealed_payload(&raw)? else {
        return Ok(raw);
    };
    let plain = decryptor.decrypt(sealed).await?;
    serde_json::from_slice(&plain).map_err(|source| ChannelError::Payload {
        event: "decrypted envelope".into(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Reverses the ciphertext bytes; enough to prove the stage runs.
    struct Reverse;

    #[async_trait]
    impl PayloadDecryptor for Reverse {
        async fn decrypt(&self, sealed: SealedPayload) -> Result<Vec<u8>, ChannelError> {
            Ok(sealed.ciphertext.into_iter().rev().collect())
        }
    }

    fn seal(plain: &Value) -> Value {
        let mut bytes = serde_json::to_vec(plain).unwrap();
        bytes.reverse();
        json!({ "encrypted": true, "iv": STANDARD.encode([1u8, 2, 3]), "payload": STANDARD.encode(bytes) })
    }

    #[tokio::test]
    async fn plain_payloads_pass_through() {
        let raw = json!({ "roomId": "r1" });
        assert_eq!(open_payload(&NoDecryption, raw.clone()).await.unwrap(), raw);
        let not_sealed = json!({ "encrypted": false, "payload": "x" });
        assert_eq!(open_payload(&NoDecryption, not_sealed.clone()).await.unwrap(), not_sealed);
    }

    #[tokio::test]
    async fn envelopes_are_unwrapped_by_the_decryptor() {
        let plain = json!({ "roomId": "r1", "session": null });
        let sealed = seal(&plain);
        let lifted = sealed_payload(&sealed).unwrap().unwrap();
        assert_eq!(lifted.iv, Some(vec![1, 2, 3]));
        assert_eq!(open_payload(&Reverse, sealed).await.unwrap(), plain);
    }

    #[tokio::test]
    async fn envelope_without_decryptor_is_an_error() {
        let sealed = seal(&json!({}));
        assert!(matches!(
            open_payload(&NoDecryption, sealed).await,
            Err(ChannelError::Decrypt(_))
        ));
    }

    #[test]
    fn bad_base64_is_reported() {
        let raw = json!({ "encrypted": true, "payload": "***" });
        assert!(matches!(sealed_payload(&raw), Err(ChannelError::Decrypt(_))));
    }
}
