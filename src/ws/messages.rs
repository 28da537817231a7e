//! Signaling envelopes: inbound client messages and outbound events.
//!
//! Every message is a JSON object with a `type` discriminator. SDP and
//! ICE payloads are opaque [`serde_json::Value`]s; the gateway relays
//! them without interpreting their contents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages a client may send while relaying.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEnvelope {
    /// WebRTC offer for one peer.
    Offer {
        /// Opaque SDP offer.
        offer: Value,
        /// Recipient user id.
        target_id: i64,
    },
    /// WebRTC answer for one peer.
    Answer {
        /// Opaque SDP answer.
        answer: Value,
        /// Recipient user id.
        target_id: i64,
    },
    /// ICE candidate for one peer.
    IceCandidate {
        /// Opaque candidate payload.
        candidate: Value,
        /// Recipient user id.
        target_id: i64,
    },
    /// Sender toggled audio/video; flags are relayed as given.
    MediaState {
        /// Camera on/off, if reported.
        #[serde(default)]
        video_enabled: Option<bool>,
        /// Microphone on/off, if reported.
        #[serde(default)]
        audio_enabled: Option<bool>,
    },
    /// Room-wide chat line.
    ChatMessage {
        /// Chat text. Empty messages are dropped.
        message: String,
    },
}

/// Events the gateway sends to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Sent once to a fully admitted connection.
    Authenticated {
        /// The connection's own user id.
        user_id: i64,
        /// The connection's own display name.
        username: String,
    },
    /// Ids of members already in the room, sent right after admission.
    ExistingUsers {
        /// Other members' user ids (the recipient is excluded).
        users: Vec<i64>,
    },
    /// A user entered the room.
    UserJoined {
        /// Joining user's id.
        user_id: i64,
        /// Joining user's display name.
        user_name: String,
    },
    /// A user's last connection in the room closed.
    UserLeft {
        /// Departing user's id.
        user_id: i64,
    },
    /// Relayed WebRTC offer.
    Offer {
        /// Opaque SDP offer.
        offer: Value,
        /// Originating user id.
        sender_id: i64,
    },
    /// Relayed WebRTC answer.
    Answer {
        /// Opaque SDP answer.
        answer: Value,
        /// Originating user id.
        sender_id: i64,
    },
    /// Relayed ICE candidate.
    IceCandidate {
        /// Opaque candidate payload.
        candidate: Value,
        /// Originating user id.
        sender_id: i64,
    },
    /// A member toggled audio/video.
    MediaStateChanged {
        /// Camera on/off, as reported by the sender.
        video_enabled: Option<bool>,
        /// Microphone on/off, as reported by the sender.
        audio_enabled: Option<bool>,
        /// Originating user id.
        sender_id: i64,
    },
    /// Room-wide chat line.
    ChatMessage {
        /// Originating user id.
        sender_id: i64,
        /// Originating display name.
        sender_name: String,
        /// Chat text.
        message: String,
    },
    /// Admission decision or status for the receiving user.
    AdmissionStatus {
        /// One of `not-registered`, `pending`, `approved`, `rejected`.
        status: String,
        /// Human-readable explanation.
        message: String,
        /// Session the status applies to, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    /// A join request arrived for a session the receiving user hosts.
    NewJoinRequest {
        /// Participant row id of the request.
        participant_id: i64,
        /// Requesting user's display name.
        user_name: String,
        /// Requesting user's id.
        user_id: i64,
    },
    /// A join request the receiving user can see changed status.
    JoinRequestUpdated {
        /// Participant row id of the request.
        participant_id: i64,
        /// Requesting user's display name.
        user_name: String,
        /// New status string.
        status: String,
    },
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn offer_parses_with_target() {
        let text = r#"{"type":"offer","offer":{"sdp":"v=0"},"target_id":7}"#;
        let Ok(env) = serde_json::from_str::<ClientEnvelope>(text) else {
            panic!("offer should parse");
        };
        match env {
            ClientEnvelope::Offer { target_id, .. } => assert_eq!(target_id, 7),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn offer_without_target_is_invalid() {
        let text = r#"{"type":"offer","offer":{"sdp":"v=0"}}"#;
        assert!(serde_json::from_str::<ClientEnvelope>(text).is_err());
    }

    #[test]
    fn media_state_flags_are_optional() {
        let text = r#"{"type":"media-state","audio_enabled":false}"#;
        let Ok(env) = serde_json::from_str::<ClientEnvelope>(text) else {
            panic!("media-state should parse");
        };
        match env {
            ClientEnvelope::MediaState {
                video_enabled,
                audio_enabled,
            } => {
                assert_eq!(video_enabled, None);
                assert_eq!(audio_enabled, Some(false));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_invalid() {
        let text = r#"{"type":"screen-share","on":true}"#;
        assert!(serde_json::from_str::<ClientEnvelope>(text).is_err());
    }

    #[test]
    fn server_events_use_kebab_case_tags() {
        let event = ServerEvent::MediaStateChanged {
            video_enabled: Some(true),
            audio_enabled: None,
            sender_id: 3,
        };
        let Ok(value) = serde_json::to_value(&event) else {
            panic!("serialization failed");
        };
        assert_eq!(value.get("type"), Some(&json!("media-state-changed")));
        assert_eq!(value.get("sender_id"), Some(&json!(3)));
    }

    #[test]
    fn admission_status_omits_missing_session() {
        let event = ServerEvent::AdmissionStatus {
            status: "pending".to_string(),
            message: "awaiting host approval".to_string(),
            session_id: None,
        };
        let Ok(value) = serde_json::to_value(&event) else {
            panic!("serialization failed");
        };
        assert!(value.get("session_id").is_none());
    }

    #[test]
    fn relayed_offer_keeps_payload_opaque() {
        let payload = json!({"sdp": "v=0", "nested": {"k": [1, 2, 3]}});
        let event = ServerEvent::Offer {
            offer: payload.clone(),
            sender_id: 9,
        };
        let Ok(value) = serde_json::to_value(&event) else {
            panic!("serialization failed");
        };
        assert_eq!(value.get("offer"), Some(&payload));
    }
}
