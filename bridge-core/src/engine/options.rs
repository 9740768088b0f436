//! Connect options, decoded from the JSON document the host layer builds.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options for a room connection attempt.
///
/// The host side serializes these as one JSON document per connect call;
/// the bridge decodes them once and hands the struct to the engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// Access token authorizing the connection.
    pub token: String,

    /// Name of the room to join.
    pub room_name: String,

    #[serde(default)]
    pub ice_servers: Vec<IceServer>,

    #[serde(default)]
    pub preferred_audio_codecs: Vec<String>,

    #[serde(default)]
    pub preferred_video_codecs: Vec<String>,

    #[serde(default = "default_true")]
    pub enable_automatic_subscription: bool,

    #[serde(default)]
    pub enable_dominant_speaker: bool,

    #[serde(default)]
    pub enable_network_quality: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IceServer {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ConnectOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_minimal_document() {
        let options =
            ConnectOptions::from_json(r#"{"token":"tk","room_name":"standup"}"#).unwrap();
        assert_eq!(options.room_name, "standup");
        assert!(options.ice_servers.is_empty());
        assert!(options.enable_automatic_subscription);
        assert!(!options.enable_dominant_speaker);
    }

    #[test]
    fn decodes_full_document() {
        let options = ConnectOptions::from_json(
            r#"{
                "token": "tk",
                "room_name": "standup",
                "ice_servers": [{"url": "turn:turn.example.com:3478", "username": "u", "password": "p"}],
                "preferred_audio_codecs": ["opus"],
                "preferred_video_codecs": ["VP8", "H264"],
                "enable_automatic_subscription": false,
                "enable_dominant_speaker": true
            }"#,
        )
        .unwrap();
        assert_eq!(options.ice_servers.len(), 1);
        assert_eq!(options.ice_servers[0].username.as_deref(), Some("u"));
        assert_eq!(options.preferred_video_codecs, vec!["VP8", "H264"]);
        assert!(!options.enable_automatic_subscription);
        assert!(options.enable_dominant_speaker);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(ConnectOptions::from_json("{\"token\":").is_err());
        assert!(ConnectOptions::from_json("{}").is_err());
    }
}
