//! The inbound event model.
//!
//! Batch items from the feed carry no explicit type tag; the kind is
//! sniffed from which top-level key is present. Kinds this build does not
//! know yet still surface, carrying only their sequence id, so the feed
//! keeps advancing across protocol additions.

use crate::{
    codec,
    errors::SchemaError,
    record::Record,
    schema::SchemaRegistry,
    wire::WireValue,
};

/// Family id of the inbound event shapes in [`SchemaRegistry::bot_api`].
pub const UPDATE_FAMILY: &str = "update";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Message,
    EditedMessage,
    ChannelPost,
    EditedChannelPost,
    InlineQuery,
    ChosenInlineResult,
    CallbackQuery,
    Poll,
    PollAnswer,
    Unknown,
}

impl UpdateKind {
    /// Every kind the platform can be asked for, in wire order.
    pub const KNOWN: [UpdateKind; 9] = [
        UpdateKind::Message,
        UpdateKind::EditedMessage,
        UpdateKind::ChannelPost,
        UpdateKind::EditedChannelPost,
        UpdateKind::InlineQuery,
        UpdateKind::ChosenInlineResult,
        UpdateKind::CallbackQuery,
        UpdateKind::Poll,
        UpdateKind::PollAnswer,
    ];

    /// The top-level key that announces this kind in a batch item; doubles
    /// as the allow-list entry for the retrieval call.
    pub fn wire_key(self) -> Option<&'static str> {
        match self {
            UpdateKind::Message => Some("message"),
            UpdateKind::EditedMessage => Some("edited_message"),
            UpdateKind::ChannelPost => Some("channel_post"),
            UpdateKind::EditedChannelPost => Some("edited_channel_post"),
            UpdateKind::InlineQuery => Some("inline_query"),
            UpdateKind::ChosenInlineResult => Some("chosen_inline_result"),
            UpdateKind::CallbackQuery => Some("callback_query"),
            UpdateKind::Poll => Some("poll"),
            UpdateKind::PollAnswer => Some("poll_answer"),
            UpdateKind::Unknown => None,
        }
    }

    pub fn from_wire_key(key: &str) -> UpdateKind {
        UpdateKind::KNOWN
            .into_iter()
            .find(|kind| kind.wire_key() == Some(key))
            .unwrap_or(UpdateKind::Unknown)
    }
}

/// One decoded inbound event. `id` is strictly increasing within one
/// polling session; `payload` is the kind-specific record, absent for
/// kinds this build does not recognize.
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub id: i64,
    pub kind: UpdateKind,
    pub payload: Option<Record>,
}

impl Update {
    pub fn decode(registry: &SchemaRegistry, value: &WireValue) -> Result<Update, SchemaError> {
        let record = codec::decode(registry, UPDATE_FAMILY, value)?;
        Update::from_record(&record)
    }

    pub fn from_record(record: &Record) -> Result<Update, SchemaError> {
        let id = record
            .int("update_id")
            .ok_or_else(|| SchemaError::Missing("update_id".to_string()))?;
        let kind = UpdateKind::from_wire_key(record.variant());
        let payload = kind
            .wire_key()
            .and_then(|key| record.record(key))
            .cloned();
        Ok(Update { id, kind, payload })
    }
}
