//! Schema-driven decode/encode engine.
//!
//! One pair of routines interprets every family's declarative schema; no
//! entity type carries a bespoke codec. Decode ignores wire keys the schema
//! does not name, treats absent (or null) optional fields as simply absent,
//! and fails with a [`SchemaError`] value on a missing required field or a
//! mis-shaped one. Encode is the mirror image: only present values are
//! written, in schema order, recursing through nested records and arrays.

use crate::{
    attachment::{AttachmentReference, UploadPart},
    errors::SchemaError,
    record::{value_shape, FieldValue, Record},
    schema::{Field, FieldKind, SchemaRegistry, UNKNOWN_VARIANT},
    wire::{as_object, shape_of, WireObject, WireValue},
};

/// Encode output: the wire object plus any upload parts referenced from it
/// through `attach://` placeholders. Parts travel out-of-band (multipart),
/// never inline in the body.
#[derive(Clone, Debug, PartialEq)]
pub struct Encoded {
    pub body: WireValue,
    pub uploads: Vec<UploadPart>,
}

/// Decode one wire value as a member of `family_id`, dispatching to the
/// first variant whose predicate matches and falling back to the family's
/// unknown shape when none does.
pub fn decode(
    registry: &SchemaRegistry,
    family_id: &str,
    value: &WireValue,
) -> Result<Record, SchemaError> {
    let family = registry.family(family_id)?;
    let obj = as_object(value)?;

    let record = match family.select(obj) {
        Some(variant) => {
            let mut rec = Record::new(family.id, variant.name);
            decode_fields(registry, &family.common, obj, &mut rec)?;
            decode_fields(registry, &variant.fields, obj, &mut rec)?;
            rec
        }
        None => {
            // Protocol addition we don't know yet: keep the identity fields
            // rather than failing the whole batch.
            let mut rec = Record::new(family.id, UNKNOWN_VARIANT);
            decode_fields(registry, &family.common, obj, &mut rec)?;
            rec
        }
    };

    Ok(record)
}

/// Encode a record back to its wire object. Required fields must be
/// present; optional fields equal to their default (absent) are omitted.
pub fn encode(registry: &SchemaRegistry, record: &Record) -> Result<Encoded, SchemaError> {
    let family = registry.family(record.family())?;

    let mut obj = WireObject::new();
    let mut uploads = Vec::new();

    encode_fields(registry, &family.common, record, &mut obj, &mut uploads)?;
    if record.variant() != UNKNOWN_VARIANT {
        let variant = family.variant(record.variant())?;
        encode_fields(registry, &variant.fields, record, &mut obj, &mut uploads)?;
    }

    Ok(Encoded {
        body: WireValue::Object(obj),
        uploads,
    })
}

fn decode_fields(
    registry: &SchemaRegistry,
    fields: &[Field],
    obj: &WireObject,
    rec: &mut Record,
) -> Result<(), SchemaError> {
    for field in fields {
        match decode_field(registry, field, obj)? {
            Some(value) => rec.insert(field.key, value),
            None if field.required => return Err(SchemaError::Missing(field.key.to_string())),
            None => {}
        }
    }
    Ok(())
}

fn decode_field(
    registry: &SchemaRegistry,
    field: &Field,
    obj: &WireObject,
) -> Result<Option<FieldValue>, SchemaError> {
    if let FieldKind::Attachment { url_key } = field.kind {
        // Two wire keys, one logical field. Under the primary key the token
        // is classified by content; the url key can only carry URLs.
        if let Some(value) = present(obj.get(field.key)) {
            let token = expect_str(field.key, value)?;
            return Ok(Some(FieldValue::Attachment(AttachmentReference::classify(
                token,
            ))));
        }
        if let Some(value) = present(obj.get(url_key)) {
            let url = expect_str(url_key, value)?;
            return Ok(Some(FieldValue::Attachment(AttachmentReference::RemoteUrl(
                url.to_string(),
            ))));
        }
        return Ok(None);
    }

    match present(obj.get(field.key)) {
        Some(value) => decode_value(registry, field.key, &field.kind, value).map(Some),
        None => Ok(None),
    }
}

/// `null` on the wire is treated the same as an absent key.
fn present(value: Option<&WireValue>) -> Option<&WireValue> {
    value.filter(|v| !v.is_null())
}

fn expect_str<'v>(key: &str, value: &'v WireValue) -> Result<&'v str, SchemaError> {
    value.as_str().ok_or_else(|| wrong_shape(key, "string", value))
}

fn decode_value(
    registry: &SchemaRegistry,
    key: &str,
    kind: &FieldKind,
    value: &WireValue,
) -> Result<FieldValue, SchemaError> {
    match kind {
        FieldKind::Bool => value
            .as_bool()
            .map(FieldValue::Bool)
            .ok_or_else(|| wrong_shape(key, "bool", value)),
        FieldKind::Int => value
            .as_i64()
            .map(FieldValue::Int)
            .ok_or_else(|| wrong_shape(key, "integer", value)),
        FieldKind::Float => value
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| wrong_shape(key, "number", value)),
        FieldKind::Str => value
            .as_str()
            .map(|s| FieldValue::Str(s.to_string()))
            .ok_or_else(|| wrong_shape(key, "string", value)),
        FieldKind::Nested(family_id) => {
            decode(registry, family_id, value).map(|rec| FieldValue::Record(Box::new(rec)))
        }
        FieldKind::Array(inner) => {
            let items = value
                .as_array()
                .ok_or_else(|| wrong_shape(key, "array", value))?;
            let decoded = items
                .iter()
                .map(|item| decode_value(registry, key, inner, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(FieldValue::Array(decoded))
        }
        // Attachments are handled per-field (two keys); inside an array
        // there is no second key to consult.
        FieldKind::Attachment { .. } => Err(wrong_shape(key, "attachment", value)),
    }
}

fn encode_fields(
    registry: &SchemaRegistry,
    fields: &[Field],
    record: &Record,
    obj: &mut WireObject,
    uploads: &mut Vec<UploadPart>,
) -> Result<(), SchemaError> {
    for field in fields {
        let Some(value) = record.get(field.key) else {
            if field.required {
                return Err(SchemaError::Missing(field.key.to_string()));
            }
            continue;
        };

        if let FieldKind::Attachment { url_key } = field.kind {
            let FieldValue::Attachment(reference) = value else {
                return Err(SchemaError::Field {
                    key: field.key.to_string(),
                    expected: "attachment",
                    found: value_shape(value),
                });
            };
            let (key, wire, part) = reference.render(field.key, url_key);
            obj.insert(key.to_string(), wire);
            uploads.extend(part);
            continue;
        }

        let wire = encode_value(registry, field.key, &field.kind, value, uploads)?;
        obj.insert(field.key.to_string(), wire);
    }
    Ok(())
}

fn encode_value(
    registry: &SchemaRegistry,
    key: &str,
    kind: &FieldKind,
    value: &FieldValue,
    uploads: &mut Vec<UploadPart>,
) -> Result<WireValue, SchemaError> {
    match (kind, value) {
        (FieldKind::Bool, FieldValue::Bool(v)) => Ok(WireValue::Bool(*v)),
        (FieldKind::Int, FieldValue::Int(v)) => Ok(WireValue::from(*v)),
        (FieldKind::Float, FieldValue::Float(v)) => serde_json::Number::from_f64(*v)
            .map(WireValue::Number)
            .ok_or_else(|| SchemaError::Field {
                key: key.to_string(),
                expected: "finite number",
                found: "float",
            }),
        (FieldKind::Str, FieldValue::Str(v)) => Ok(WireValue::String(v.clone())),
        (FieldKind::Nested(family_id), FieldValue::Record(rec)) => {
            if rec.family() != *family_id {
                return Err(SchemaError::Field {
                    key: key.to_string(),
                    expected: *family_id,
                    found: rec.family(),
                });
            }
            let encoded = encode(registry, rec)?;
            uploads.extend(encoded.uploads);
            Ok(encoded.body)
        }
        (FieldKind::Array(inner), FieldValue::Array(items)) => {
            let encoded = items
                .iter()
                .map(|item| encode_value(registry, key, inner, item, uploads))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(WireValue::Array(encoded))
        }
        (_, other) => Err(SchemaError::Field {
            key: key.to_string(),
            expected: kind_shape(kind),
            found: value_shape(other),
        }),
    }
}

fn kind_shape(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Bool => "bool",
        FieldKind::Int => "integer",
        FieldKind::Float => "number",
        FieldKind::Str => "string",
        FieldKind::Nested(_) => "record",
        FieldKind::Array(_) => "array",
        FieldKind::Attachment { .. } => "attachment",
    }
}

fn wrong_shape(key: &str, expected: &'static str, value: &WireValue) -> SchemaError {
    SchemaError::Field {
        key: key.to_string(),
        expected,
        found: shape_of(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Family, Predicate, VariantSchema};
    use serde_json::json;

    /// Small self-contained registry: a `node` family that nests itself and
    /// a sniffed two-variant `event` family with an attachment-bearing
    /// variant.
    fn registry() -> SchemaRegistry {
        let mut reg = SchemaRegistry::new();
        reg.insert(Family::new(
            "node",
            vec![],
            vec![VariantSchema::new(
                "node",
                Predicate::Always,
                vec![
                    Field::required("id", FieldKind::Int),
                    Field::optional("label", FieldKind::Str),
                    Field::optional("parent", FieldKind::Nested("node")),
                    Field::optional("weights", FieldKind::Array(Box::new(FieldKind::Float))),
                ],
            )],
        ));
        reg.insert(Family::new(
            "event",
            vec![Field::required("seq", FieldKind::Int)],
            vec![
                VariantSchema::new(
                    "created",
                    Predicate::HasKey("created"),
                    vec![Field::required("created", FieldKind::Nested("node"))],
                ),
                VariantSchema::new(
                    "renamed",
                    Predicate::HasKey("renamed"),
                    vec![Field::required("renamed", FieldKind::Str)],
                ),
            ],
        ));
        // Outbound parameter shape: single variant, so dispatch does not
        // depend on which of the two attachment keys is present.
        reg.insert(Family::new(
            "post",
            vec![],
            vec![VariantSchema::new(
                "post",
                Predicate::Always,
                vec![
                    Field::required("seq", FieldKind::Int),
                    Field::required("media", FieldKind::Attachment { url_key: "media_url" }),
                    Field::optional("caption", FieldKind::Str),
                ],
            )],
        ));
        reg
    }

    #[test]
    fn decodes_nested_shapes_to_arbitrary_depth() {
        let reg = registry();
        let wire = json!({
            "id": 3,
            "parent": {"id": 2, "parent": {"id": 1, "label": "root"}},
            "weights": [0.5, 2]
        });
        let rec = decode(&reg, "node", &wire).unwrap();
        let parent = rec.record("parent").unwrap();
        let root = parent.record("parent").unwrap();
        assert_eq!(root.int("id"), Some(1));
        assert_eq!(root.str("label"), Some("root"));
        assert_eq!(
            rec.array("weights").unwrap(),
            &[FieldValue::Float(0.5), FieldValue::Float(2.0)]
        );
    }

    #[test]
    fn unknown_wire_keys_are_ignored() {
        let reg = registry();
        let plain = decode(&reg, "node", &json!({"id": 1})).unwrap();
        let extended = decode(
            &reg,
            "node",
            &json!({"id": 1, "brand_new_key": {"x": 1}, "another": 5}),
        )
        .unwrap();
        assert_eq!(plain, extended);
    }

    #[test]
    fn null_counts_as_absent() {
        let reg = registry();
        let rec = decode(&reg, "node", &json!({"id": 1, "label": null})).unwrap();
        assert_eq!(rec.get("label"), None);
    }

    #[test]
    fn missing_required_field_is_an_error_not_a_substitution() {
        let reg = registry();
        let err = decode(&reg, "node", &json!({"label": "x"})).unwrap_err();
        assert_eq!(err, SchemaError::Missing("id".to_string()));
    }

    #[test]
    fn mis_shaped_field_is_reported_with_its_key() {
        let reg = registry();
        let err = decode(&reg, "node", &json!({"id": "seven"})).unwrap_err();
        assert_eq!(
            err,
            SchemaError::Field {
                key: "id".to_string(),
                expected: "integer",
                found: "string"
            }
        );
    }

    #[test]
    fn dispatch_falls_back_to_unknown_and_keeps_identity() {
        let reg = registry();
        let rec = decode(&reg, "event", &json!({"seq": 9, "vanished": {"deep": true}})).unwrap();
        assert_eq!(rec.variant(), UNKNOWN_VARIANT);
        assert_eq!(rec.int("seq"), Some(9));
        assert_eq!(rec.get("vanished"), None);
    }

    #[test]
    fn round_trips_including_recursion_and_fallback() {
        let reg = registry();
        let samples = [
            ("node", json!({"id": 4, "label": "leaf", "parent": {"id": 1}})),
            ("event", json!({"seq": 1, "created": {"id": 10, "weights": [1.5]}})),
            ("event", json!({"seq": 2, "renamed": "n2"})),
            ("event", json!({"seq": 4, "mystery": true})),
            ("post", json!({"seq": 2, "media": "stored-handle_1"})),
            ("post", json!({"seq": 3, "media_url": "https://cdn/x.png", "caption": "hi"})),
        ];
        for (family, wire) in &samples {
            let rec = decode(&reg, family, wire).unwrap();
            let encoded = encode(&reg, &rec).unwrap();
            let again = decode(&reg, family, &encoded.body).unwrap();
            assert_eq!(rec, again, "family {family}, wire {wire}");
        }
    }

    #[test]
    fn encode_emits_exactly_one_attachment_key() {
        let reg = registry();
        let url = Record::new("post", "post")
            .with("seq", 7i64)
            .with("media", AttachmentReference::classify("https://cdn/a.png"));
        let encoded = encode(&reg, &url).unwrap();
        let obj = encoded.body.as_object().unwrap();
        assert!(obj.contains_key("media_url"));
        assert!(!obj.contains_key("media"));

        let handle = Record::new("post", "post")
            .with("seq", 8i64)
            .with("media", AttachmentReference::classify("AgACAbcd"));
        let encoded = encode(&reg, &handle).unwrap();
        let obj = encoded.body.as_object().unwrap();
        assert!(obj.contains_key("media"));
        assert!(!obj.contains_key("media_url"));
    }

    #[test]
    fn inline_uploads_leave_the_body_as_a_placeholder() {
        let reg = registry();
        let rec = Record::new("post", "post")
            .with("seq", 11i64)
            .with("media", AttachmentReference::upload("cat.png", vec![9, 9]));
        let encoded = encode(&reg, &rec).unwrap();
        assert_eq!(
            encoded.body.as_object().unwrap().get("media").unwrap(),
            &json!("attach://cat.png")
        );
        assert_eq!(encoded.uploads.len(), 1);
        assert_eq!(encoded.uploads[0].name, "cat.png");
    }

    #[test]
    fn encode_omits_absent_optionals_and_requires_required() {
        let reg = registry();
        let rec = Record::new("node", "node").with("id", 5i64);
        let encoded = encode(&reg, &rec).unwrap();
        assert_eq!(encoded.body, json!({"id": 5}));

        let empty = Record::new("node", "node");
        assert_eq!(
            encode(&reg, &empty).unwrap_err(),
            SchemaError::Missing("id".to_string())
        );
    }
}
