use serde::{Deserialize, Serialize};

use super::messages::{
    ClientMessage, FriendRequestAcceptedMsg, FriendRequestSentMsg, GameDeletedMsg, GameInviteMsg,
    GameUpdatedMsg, MessageType, ServerMessage, SubscribeMsg, SubscribeResponseMsg,
};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum message payload size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix. Payloads use
/// MessagePack maps (named fields) so browser decoders see property names.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes = rmp_serde::to_vec_named(payload)
        .map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::Subscribe(m) => encode_message(MessageType::Subscribe, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    let msg_type = msg.message_type();
    match msg {
        ServerMessage::SubscribeResponse(m) => encode_message(msg_type, m),
        ServerMessage::FriendRequestSent(m) => encode_message(msg_type, m),
        ServerMessage::FriendRequestAccepted(m) => encode_message(msg_type, m),
        ServerMessage::GameInvite(m) => encode_message(msg_type, m),
        ServerMessage::GameUpdated(m) => encode_message(msg_type, m),
        ServerMessage::GameDeleted(m) => encode_message(msg_type, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    let Some(&first) = data.first() else {
        return Err(ProtocolError::EmptyMessage);
    };
    MessageType::from_byte(first).ok_or(ProtocolError::UnknownMessageType(first))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    match decode_message_type(data)? {
        MessageType::Subscribe => Ok(ClientMessage::Subscribe(decode_payload::<SubscribeMsg>(
            data,
        )?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    match decode_message_type(data)? {
        MessageType::SubscribeResponse => Ok(ServerMessage::SubscribeResponse(decode_payload::<
            SubscribeResponseMsg,
        >(data)?)),
        MessageType::FriendRequestSent => Ok(ServerMessage::FriendRequestSent(decode_payload::<
            FriendRequestSentMsg,
        >(data)?)),
        MessageType::FriendRequestAccepted => Ok(ServerMessage::FriendRequestAccepted(
            decode_payload::<FriendRequestAcceptedMsg>(data)?,
        )),
        MessageType::GameInvite => Ok(ServerMessage::GameInvite(decode_payload::<GameInviteMsg>(
            data,
        )?)),
        MessageType::GameUpdated => Ok(ServerMessage::GameUpdated(Box::new(decode_payload::<
            GameUpdatedMsg,
        >(data)?))),
        MessageType::GameDeleted => Ok(ServerMessage::GameDeleted(decode_payload::<
            GameDeletedMsg,
        >(data)?)),
        MessageType::Subscribe => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
