//! Platform entity schemas.
//!
//! One declarative table per entity family; the engine in [`crate::codec`]
//! interprets them. Only fields the feed consumes are spelled out — the
//! engine ignores unknown wire keys, so omissions here are tolerated, not
//! failures. Dispatch rules follow the wire format: inbound events and
//! error parameters are sniffed by key presence, chats carry an explicit
//! `type` discriminator, plain entities match unconditionally.

use crate::schema::{Family, Field, FieldKind, Predicate, SchemaRegistry, VariantSchema};

fn req(key: &'static str, kind: FieldKind) -> Field {
    Field::required(key, kind)
}

fn opt(key: &'static str, kind: FieldKind) -> Field {
    Field::optional(key, kind)
}

fn nested(family: &'static str) -> FieldKind {
    FieldKind::Nested(family)
}

fn array(kind: FieldKind) -> FieldKind {
    FieldKind::Array(Box::new(kind))
}

fn single(id: &'static str, fields: Vec<Field>) -> Family {
    Family::new(id, vec![], vec![VariantSchema::new(id, Predicate::Always, fields)])
}

impl SchemaRegistry {
    /// The full platform schema, built once and owned by the caller.
    pub fn bot_api() -> SchemaRegistry {
        let mut reg = SchemaRegistry::new();

        reg.insert(single(
            "user",
            vec![
                req("id", FieldKind::Int),
                opt("is_bot", FieldKind::Bool),
                req("first_name", FieldKind::Str),
                opt("last_name", FieldKind::Str),
                opt("username", FieldKind::Str),
                opt("language_code", FieldKind::Str),
            ],
        ));

        // Chats arrive with an explicit discriminator; the variants carry
        // the per-kind naming fields, the fallback keeps id + type for
        // kinds added after this build.
        reg.insert(Family::new(
            "chat",
            vec![req("id", FieldKind::Int), req("type", FieldKind::Str)],
            vec![
                VariantSchema::new(
                    "private",
                    Predicate::Equals("type", "private"),
                    vec![
                        opt("first_name", FieldKind::Str),
                        opt("last_name", FieldKind::Str),
                        opt("username", FieldKind::Str),
                    ],
                ),
                VariantSchema::new(
                    "group",
                    Predicate::Equals("type", "group"),
                    vec![opt("title", FieldKind::Str)],
                ),
                VariantSchema::new(
                    "supergroup",
                    Predicate::Equals("type", "supergroup"),
                    vec![opt("title", FieldKind::Str), opt("username", FieldKind::Str)],
                ),
                VariantSchema::new(
                    "channel",
                    Predicate::Equals("type", "channel"),
                    vec![opt("title", FieldKind::Str), opt("username", FieldKind::Str)],
                ),
            ],
        ));

        reg.insert(single(
            "photo_size",
            vec![
                req("file_id", FieldKind::Str),
                req("file_unique_id", FieldKind::Str),
                req("width", FieldKind::Int),
                req("height", FieldKind::Int),
                opt("file_size", FieldKind::Int),
            ],
        ));

        reg.insert(single(
            "document",
            vec![
                req("file_id", FieldKind::Str),
                req("file_unique_id", FieldKind::Str),
                opt("thumbnail", nested("photo_size")),
                opt("file_name", FieldKind::Str),
                opt("mime_type", FieldKind::Str),
                opt("file_size", FieldKind::Int),
            ],
        ));

        // Entities with link/mention payloads are tagged; the plain
        // formatting kinds (bold, italic, ...) all fall back to the common
        // offset/length triple.
        reg.insert(Family::new(
            "message_entity",
            vec![
                req("type", FieldKind::Str),
                req("offset", FieldKind::Int),
                req("length", FieldKind::Int),
            ],
            vec![
                VariantSchema::new(
                    "text_link",
                    Predicate::Equals("type", "text_link"),
                    vec![req("url", FieldKind::Str)],
                ),
                VariantSchema::new(
                    "text_mention",
                    Predicate::Equals("type", "text_mention"),
                    vec![req("user", nested("user"))],
                ),
            ],
        ));

        reg.insert(single(
            "message",
            vec![
                req("message_id", FieldKind::Int),
                opt("from", nested("user")),
                req("date", FieldKind::Int),
                req("chat", nested("chat")),
                opt("reply_to_message", nested("message")),
                opt("edit_date", FieldKind::Int),
                opt("media_group_id", FieldKind::Str),
                opt("text", FieldKind::Str),
                opt("entities", array(nested("message_entity"))),
                opt("photo", array(nested("photo_size"))),
                opt("document", nested("document")),
                opt("caption", FieldKind::Str),
            ],
        ));

        reg.insert(single(
            "inline_query",
            vec![
                req("id", FieldKind::Str),
                req("from", nested("user")),
                req("query", FieldKind::Str),
                req("offset", FieldKind::Str),
            ],
        ));

        reg.insert(single(
            "chosen_inline_result",
            vec![
                req("result_id", FieldKind::Str),
                req("from", nested("user")),
                req("query", FieldKind::Str),
                opt("inline_message_id", FieldKind::Str),
            ],
        ));

        reg.insert(single(
            "callback_query",
            vec![
                req("id", FieldKind::Str),
                req("from", nested("user")),
                opt("message", nested("message")),
                opt("inline_message_id", FieldKind::Str),
                opt("chat_instance", FieldKind::Str),
                opt("data", FieldKind::Str),
            ],
        ));

        reg.insert(single(
            "poll_option",
            vec![req("text", FieldKind::Str), req("voter_count", FieldKind::Int)],
        ));

        reg.insert(single(
            "poll",
            vec![
                req("id", FieldKind::Str),
                req("question", FieldKind::Str),
                req("options", array(nested("poll_option"))),
                req("total_voter_count", FieldKind::Int),
                req("is_closed", FieldKind::Bool),
                req("is_anonymous", FieldKind::Bool),
                opt("type", FieldKind::Str),
                opt("allows_multiple_answers", FieldKind::Bool),
            ],
        ));

        reg.insert(single(
            "poll_answer",
            vec![
                req("poll_id", FieldKind::Str),
                req("user", nested("user")),
                req("option_ids", array(FieldKind::Int)),
            ],
        ));

        // Inbound events: no type tag on the wire, so each kind is sniffed
        // by its top-level key, in this declared order.
        let update_variants = [
            ("message", "message"),
            ("edited_message", "message"),
            ("channel_post", "message"),
            ("edited_channel_post", "message"),
            ("inline_query", "inline_query"),
            ("chosen_inline_result", "chosen_inline_result"),
            ("callback_query", "callback_query"),
            ("poll", "poll"),
            ("poll_answer", "poll_answer"),
        ];
        reg.insert(Family::new(
            "update",
            vec![req("update_id", FieldKind::Int)],
            update_variants
                .into_iter()
                .map(|(key, family)| {
                    VariantSchema::new(key, Predicate::HasKey(key), vec![req(key, nested(family))])
                })
                .collect(),
        ));

        reg.insert(Family::new(
            "error_parameters",
            vec![],
            vec![
                VariantSchema::new(
                    "retry_after",
                    Predicate::HasKey("retry_after"),
                    vec![req("retry_after", FieldKind::Int)],
                ),
                VariantSchema::new(
                    "migrate_to_chat_id",
                    Predicate::HasKey("migrate_to_chat_id"),
                    vec![req("migrate_to_chat_id", FieldKind::Int)],
                ),
            ],
        ));

        // Outbound photo parameters: the one logical media field lands on
        // the wire under `photo` or `photo_url` depending on what the value
        // resolved to.
        reg.insert(single(
            "send_photo",
            vec![
                req("chat_id", FieldKind::Int),
                req("photo", FieldKind::Attachment { url_key: "photo_url" }),
                opt("caption", FieldKind::Str),
            ],
        ));

        reg
    }
}
