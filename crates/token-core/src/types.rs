//! Claim set and room specification types

use serde::{Deserialize, Serialize};

/// Room topology requested from the room service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    /// Selective forwarding unit
    Sfu,
    /// Direct peer-to-peer
    P2p,
    /// Peer-to-peer relayed through TURN
    P2pTurn,
}

impl Default for RoomType {
    fn default() -> Self {
        RoomType::Sfu
    }
}

/// Media policy reserved for the room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaControl {
    pub bitrate_reservation_mbps: u32,
}

/// Room specification embedded in the access token
///
/// Field order is the serialization order, which keeps the signed payload
/// deterministic for a given claim set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSpec {
    pub classification_label: String,
    pub max_connections: u32,
    pub media_control: MediaControl,
    #[serde(rename = "type")]
    pub room_type: RoomType,
}

impl Default for RoomSpec {
    fn default() -> Self {
        Self {
            classification_label: "default".to_string(),
            max_connections: 50,
            media_control: MediaControl {
                bitrate_reservation_mbps: 25,
            },
            room_type: RoomType::Sfu,
        }
    }
}

/// JWT claims for room access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub nbf: i64,                 // Not before (unix seconds)
    pub exp: i64,                 // Expiration (unix seconds)
    pub room_id: String,
    pub room_spec: RoomSpec,
    pub connection_id: String,
}

impl TokenClaims {
    /// Whether `now` falls inside the `[nbf, exp]` window
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.nbf <= now && now <= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_spec_default_matches_sample_room() {
        let spec = RoomSpec::default();
        assert_eq!(spec.classification_label, "default");
        assert_eq!(spec.max_connections, 50);
        assert_eq!(spec.media_control.bitrate_reservation_mbps, 25);
        assert_eq!(spec.room_type, RoomType::Sfu);
    }

    #[test]
    fn test_room_spec_serializes_type_key() {
        let json = serde_json::to_value(RoomSpec::default()).unwrap();
        assert_eq!(json["type"], "sfu");
        assert_eq!(json["media_control"]["bitrate_reservation_mbps"], 25);

        let turn = serde_json::to_value(RoomType::P2pTurn).unwrap();
        assert_eq!(turn, "p2p_turn");
    }

    #[test]
    fn test_claims_window() {
        let claims = TokenClaims {
            nbf: 100,
            exp: 200,
            room_id: "room".to_string(),
            room_spec: RoomSpec::default(),
            connection_id: "conn".to_string(),
        };
        assert!(claims.is_valid_at(100));
        assert!(claims.is_valid_at(200));
        assert!(!claims.is_valid_at(99));
        assert!(!claims.is_valid_at(201));
    }
}
