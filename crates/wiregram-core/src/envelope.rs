//! Result envelope shared by every platform response.
//!
//! Bodies always decode first as `{ok: bool, ...}`. Success hands the raw
//! `result` payload to the caller's own decode; failure becomes
//! [`Error::Api`] with the structured parameters that drive the automatic
//! retry policy in the client crate.

use crate::{
    codec,
    errors::{Error, Result, SchemaError},
    schema::SchemaRegistry,
    wire::{as_object, shape_of, WireValue},
};

/// Structured metadata attached to some platform errors. Recognized kinds
/// each drive one bounded automatic retry; everything else is terminal for
/// the call that saw it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorParameters {
    /// Flood control: repeat the same call after at least this many seconds.
    RetryAfter { seconds: u64 },
    /// The chat was migrated: repeat with the new chat identifier.
    MigrateToChatId { chat_id: i64 },
    /// Absent or unrecognized parameters.
    Unknown,
}

/// Family id of the parameter shapes in [`SchemaRegistry::bot_api`].
pub const ERROR_PARAMETERS_FAMILY: &str = "error_parameters";

/// Unwrap the `{ok, ...}` wrapper, returning the raw `result` payload on
/// success and a typed failure otherwise.
pub fn unwrap_envelope(registry: &SchemaRegistry, body: WireValue) -> Result<WireValue> {
    let obj = as_object(&body)?;

    let ok = match obj.get("ok") {
        None => return Err(SchemaError::Missing("ok".to_string()).into()),
        Some(value) => value.as_bool().ok_or_else(|| SchemaError::Field {
            key: "ok".to_string(),
            expected: "bool",
            found: shape_of(value),
        })?,
    };

    if ok {
        return Ok(obj.get("result").cloned().unwrap_or(WireValue::Null));
    }

    let code = obj
        .get("error_code")
        .and_then(WireValue::as_i64)
        .unwrap_or(0);
    let description = obj
        .get("description")
        .and_then(WireValue::as_str)
        .map(str::to_string);
    let parameters = obj
        .get("parameters")
        .map(|value| decode_parameters(registry, value))
        .unwrap_or(ErrorParameters::Unknown);

    Err(Error::Api {
        code,
        description,
        parameters,
    })
}

/// Dispatch the parameter object through the generic engine. A mis-shaped
/// parameter block never masks the primary error; it just degrades to
/// `Unknown`.
fn decode_parameters(registry: &SchemaRegistry, value: &WireValue) -> ErrorParameters {
    let Ok(rec) = codec::decode(registry, ERROR_PARAMETERS_FAMILY, value) else {
        return ErrorParameters::Unknown;
    };

    match rec.variant() {
        "retry_after" => rec
            .int("retry_after")
            .map(|seconds| ErrorParameters::RetryAfter {
                seconds: seconds.max(0) as u64,
            })
            .unwrap_or(ErrorParameters::Unknown),
        "migrate_to_chat_id" => rec
            .int("migrate_to_chat_id")
            .map(|chat_id| ErrorParameters::MigrateToChatId { chat_id })
            .unwrap_or(ErrorParameters::Unknown),
        _ => ErrorParameters::Unknown,
    }
}
