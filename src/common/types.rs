use serde::{Deserialize, Serialize};

/// A chat message as it travels over the relay.
///
/// The relay carries loosely-typed JSON, so every field has a default and
/// `message`/`text` are both accepted on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub text: String,
    /// Client clock, milliseconds since epoch.
    #[serde(default)]
    pub timestamp: i64,
    /// Base58 ed25519 signature by `sender` over [`ChatRecord::signing_bytes`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Identifies a record for de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub sender: String,
    pub timestamp: i64,
}

impl ChatRecord {
    /// Builds an unsigned record the way the compose box does.
    pub fn compose(sender: &str, receiver: &str, body: &str, timestamp: i64) -> Self {
        Self {
            id: format!("{sender}-{timestamp}"),
            sender: sender.to_string(),
            receiver: Some(receiver.to_string()),
            message: body.to_string(),
            text: body.to_string(),
            timestamp,
            signature: None,
        }
    }

    /// The payload, whichever of the two fields the publisher filled in.
    pub fn body(&self) -> &str {
        if self.message.is_empty() {
            &self.text
        } else {
            &self.message
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            sender: self.sender.clone(),
            timestamp: self.timestamp,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.timestamp != 0 && !self.sender.is_empty()
    }

    /// True when `identity` sent or is the addressee of this record.
    pub fn involves(&self, identity: &str) -> bool {
        self.sender == identity || self.receiver.as_deref() == Some(identity)
    }

    /// Canonical bytes covered by the signature:
    /// `[sender, receiver, timestamp, message, text]` as JSON. Only `id` is left out.
    pub fn signing_bytes(&self) -> Vec<u8> {
        // Strings, an optional string and an i64 always serialize.
        serde_json::to_vec(&(
            &self.sender,
            &self.receiver,
            self.timestamp,
            &self.message,
            &self.text,
        ))
        .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_partial_records() {
        let record: ChatRecord =
            serde_json::from_str(r#"{"sender":"A","message":"gm","timestamp":17}"#).unwrap();
        assert_eq!(record.receiver, None);
        assert_eq!(record.body(), "gm");
        assert!(record.is_well_formed());

        let legacy: ChatRecord =
            serde_json::from_str(r#"{"sender":"A","text":"hello","timestamp":18}"#).unwrap();
        assert_eq!(legacy.body(), "hello");
    }

    #[test]
    fn missing_timestamp_is_malformed() {
        let record: ChatRecord = serde_json::from_str(r#"{"sender":"A","message":"x"}"#).unwrap();
        assert!(!record.is_well_formed());
    }

    #[test]
    fn compose_fills_both_payload_fields() {
        let record = ChatRecord::compose("A", "B", "hi", 1000);
        assert_eq!(record.id, "A-1000");
        assert_eq!(record.message, record.text);
        assert!(record.involves("A"));
        assert!(record.involves("B"));
        assert!(!record.involves("C"));
    }

    #[test]
    fn signing_bytes_ignore_only_the_id() {
        let mut a = ChatRecord::compose("A", "B", "hi", 1000);
        let b = a.clone();
        a.id = "other".into();
        assert_eq!(a.signing_bytes(), b.signing_bytes());

        let mut redirected = b.clone();
        redirected.receiver = Some("C".into());
        assert_ne!(redirected.signing_bytes(), b.signing_bytes());

        let mut retexted = b.clone();
        retexted.text = "bye".into();
        assert_ne!(retexted.signing_bytes(), b.signing_bytes());
    }
}
