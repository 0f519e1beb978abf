//! Declarative entity schemas.
//!
//! Every entity family is described by data (an ordered variant list, each
//! variant an ordered field list) instead of one hand-written decode/encode
//! routine per type. The engine in [`crate::codec`] interprets these
//! descriptions; [`crate::botapi`] holds the concrete platform tables.

use std::collections::HashMap;

use crate::{
    errors::SchemaError,
    wire::{WireObject, WireValue},
};

/// Name used for the mandatory fallback taken when no variant predicate
/// matches. Unrecognized shapes decode to this variant with only the
/// family's common fields, so a protocol addition never fails the client.
pub const UNKNOWN_VARIANT: &str = "unknown";

/// How a variant is selected from a wire object. Predicates are evaluated
/// in declared order and the first match wins.
#[derive(Clone, Debug)]
pub enum Predicate {
    /// The wire object contains this key (structural sniffing, for families
    /// the protocol gives no explicit type tag).
    HasKey(&'static str),
    /// A string field equals a literal (explicit discriminator).
    Equals(&'static str, &'static str),
    /// Unconditional match, for single-shape families.
    Always,
}

impl Predicate {
    pub fn matches(&self, obj: &WireObject) -> bool {
        match self {
            Predicate::HasKey(key) => obj.contains_key(*key),
            Predicate::Equals(key, literal) => {
                obj.get(*key).and_then(WireValue::as_str) == Some(*literal)
            }
            Predicate::Always => true,
        }
    }
}

#[derive(Clone, Debug)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Str,
    /// A record of another family, dispatched through the registry. Families
    /// may reference themselves (a message embeds the message it replies to).
    Nested(&'static str),
    Array(Box<FieldKind>),
    /// Media reference with two alternative wire keys for one logical field.
    /// The field's own key carries stored-resource handles and upload
    /// placeholders; `url_key` carries remote URLs. The encoder emits
    /// exactly one of the two per value.
    Attachment { url_key: &'static str },
}

#[derive(Clone, Debug)]
pub struct Field {
    pub key: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

impl Field {
    pub fn required(key: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            required: true,
            kind,
        }
    }

    pub fn optional(key: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            required: false,
            kind,
        }
    }
}

#[derive(Clone, Debug)]
pub struct VariantSchema {
    pub name: &'static str,
    pub predicate: Predicate,
    pub fields: Vec<Field>,
}

impl VariantSchema {
    pub fn new(name: &'static str, predicate: Predicate, fields: Vec<Field>) -> Self {
        Self {
            name,
            predicate,
            fields,
        }
    }
}

/// A closed (but extensibly tolerant) set of mutually exclusive record
/// shapes sharing one dispatch point. `common` fields belong to every
/// variant, including the unknown fallback; at minimum the family's
/// identity field goes here.
#[derive(Clone, Debug)]
pub struct Family {
    pub id: &'static str,
    pub common: Vec<Field>,
    pub variants: Vec<VariantSchema>,
}

impl Family {
    pub fn new(id: &'static str, common: Vec<Field>, variants: Vec<VariantSchema>) -> Self {
        Self {
            id,
            common,
            variants,
        }
    }

    /// First variant whose predicate matches, in declared order.
    pub fn select(&self, obj: &WireObject) -> Option<&VariantSchema> {
        self.variants.iter().find(|v| v.predicate.matches(obj))
    }

    pub fn variant(&self, name: &str) -> Result<&VariantSchema, SchemaError> {
        self.variants
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| SchemaError::UnknownVariant {
                family: self.id.to_string(),
                variant: name.to_string(),
            })
    }
}

/// Caller-owned schema table. Built once at startup, queried by the codec;
/// there is no ambient global registry. Families reference each other by
/// id, so recursive shapes need no special casing.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    families: HashMap<&'static str, Family>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, family: Family) {
        self.families.insert(family.id, family);
    }

    pub fn family(&self, id: &str) -> Result<&Family, SchemaError> {
        self.families
            .get(id)
            .ok_or_else(|| SchemaError::UnknownFamily(id.to_string()))
    }
}
