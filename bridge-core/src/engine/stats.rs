//! Stats report types, encoded to JSON for delivery to the host.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One stats snapshot for a room's peer connection.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsReport {
    pub peer_connection_id: String,
    /// Milliseconds since the epoch at capture time.
    pub timestamp_ms: u64,
    #[serde(default)]
    pub local_audio_track_stats: Vec<LocalTrackStats>,
    #[serde(default)]
    pub local_video_track_stats: Vec<LocalTrackStats>,
    #[serde(default)]
    pub remote_audio_track_stats: Vec<RemoteTrackStats>,
    #[serde(default)]
    pub remote_video_track_stats: Vec<RemoteTrackStats>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LocalTrackStats {
    pub track_sid: String,
    pub codec: String,
    pub packets_lost: i64,
    pub bytes_sent: u64,
    pub packets_sent: u64,
    pub round_trip_time_ms: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RemoteTrackStats {
    pub track_sid: String,
    pub codec: String,
    pub packets_lost: i64,
    pub bytes_received: u64,
    pub packets_received: u64,
    pub jitter_ms: f64,
}

impl StatsReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_round_trips_through_json() {
        let report = StatsReport {
            peer_connection_id: "PC1".into(),
            timestamp_ms: 1_700_000_000_000,
            remote_audio_track_stats: vec![RemoteTrackStats {
                track_sid: "MT1".into(),
                codec: "opus".into(),
                packets_lost: 2,
                bytes_received: 4096,
                packets_received: 128,
                jitter_ms: 3.5,
            }],
            ..Default::default()
        };

        let json = report.to_json().unwrap();
        let back: StatsReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.peer_connection_id, "PC1");
        assert_eq!(back.remote_audio_track_stats.len(), 1);
        assert_eq!(back.remote_audio_track_stats[0].packets_lost, 2);
    }
}
