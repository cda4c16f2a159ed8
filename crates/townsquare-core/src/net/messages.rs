use serde::{Deserialize, Serialize};

use crate::player::PlayerId;
use crate::session::{GameVariant, SessionId, SessionSummary};

/// Network message type discriminator (first byte of every frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    Subscribe = 0x01,

    // Server -> Client
    SubscribeResponse = 0x10,

    // Server -> Client (notifications)
    FriendRequestSent = 0x20,
    FriendRequestAccepted = 0x21,
    GameInvite = 0x22,
    GameUpdated = 0x23,
    GameDeleted = 0x24,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Subscribe),
            0x10 => Some(Self::SubscribeResponse),
            0x20 => Some(Self::FriendRequestSent),
            0x21 => Some(Self::FriendRequestAccepted),
            0x22 => Some(Self::GameInvite),
            0x23 => Some(Self::GameUpdated),
            0x24 => Some(Self::GameDeleted),
            _ => None,
        }
    }
}

/// First frame a client sends: join the notification group of `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeMsg {
    pub user_id: PlayerId,
    pub protocol_version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponseMsg {
    pub success: bool,
    pub connection_id: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestSentMsg {
    pub from_user_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestAcceptedMsg {
    pub from_user_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInviteMsg {
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    pub from_user_id: PlayerId,
    pub variant: GameVariant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameUpdatedMsg {
    pub summary: SessionSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDeletedMsg {
    #[serde(rename = "sessionID")]
    pub session_id: SessionId,
    pub by_user_id: PlayerId,
}

/// Messages a client may send on the notification socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Subscribe(SubscribeMsg),
}

/// Messages the server pushes on the notification socket.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    SubscribeResponse(SubscribeResponseMsg),
    FriendRequestSent(FriendRequestSentMsg),
    FriendRequestAccepted(FriendRequestAcceptedMsg),
    GameInvite(GameInviteMsg),
    GameUpdated(Box<GameUpdatedMsg>),
    GameDeleted(GameDeletedMsg),
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::SubscribeResponse(_) => MessageType::SubscribeResponse,
            Self::FriendRequestSent(_) => MessageType::FriendRequestSent,
            Self::FriendRequestAccepted(_) => MessageType::FriendRequestAccepted,
            Self::GameInvite(_) => MessageType::GameInvite,
            Self::GameUpdated(_) => MessageType::GameUpdated,
            Self::GameDeleted(_) => MessageType::GameDeleted,
        }
    }
}
