//! Envelope unwrapping and bounded automatic retries.

use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use wiregram_core::{
    codec,
    envelope::{self, ErrorParameters},
    record::Record,
    schema::SchemaRegistry,
    wire::WireValue,
    Error, Result,
};

use crate::transport::Transport;

/// Upper bound on automatic retries for one logical call. The platform's
/// retry metadata could otherwise chain a misbehaving server into an
/// unbounded loop.
const MAX_RETRIES: usize = 1;

/// One platform call: send the parameters, unwrap the envelope, hand back
/// the raw `result` payload.
pub async fn invoke(
    transport: &dyn Transport,
    registry: &SchemaRegistry,
    method: &str,
    params: WireValue,
) -> Result<WireValue> {
    let body = transport.call(method, params, Vec::new()).await?;
    envelope::unwrap_envelope(registry, body)
}

/// Like [`invoke`], but encoding an outbound parameter record first, with
/// any inline uploads carried out-of-band.
pub async fn invoke_record(
    transport: &dyn Transport,
    registry: &SchemaRegistry,
    method: &str,
    record: &Record,
) -> Result<WireValue> {
    let encoded = codec::encode(registry, record)?;
    let body = transport.call(method, encoded.body, encoded.uploads).await?;
    envelope::unwrap_envelope(registry, body)
}

/// [`invoke`], honoring the platform's structured retry hints, once each:
/// flood-control waits are slept out before repeating the same call, and a
/// group-to-supergroup migration repeats it with the chat id replaced.
/// Every other failure is returned as-is.
pub async fn invoke_resilient(
    transport: &dyn Transport,
    registry: &SchemaRegistry,
    method: &str,
    mut params: WireValue,
) -> Result<WireValue> {
    let mut attempts = 0usize;
    loop {
        match invoke(transport, registry, method, params.clone()).await {
            Err(Error::Api {
                parameters: ErrorParameters::RetryAfter { seconds },
                ..
            }) if attempts < MAX_RETRIES => {
                attempts += 1;
                debug!(method, seconds, "flood control, retrying after wait");
                sleep(Duration::from_secs(seconds)).await;
            }
            Err(Error::Api {
                parameters: ErrorParameters::MigrateToChatId { chat_id },
                ..
            }) if attempts < MAX_RETRIES => {
                attempts += 1;
                debug!(method, chat_id, "chat migrated, retrying with new id");
                if let Some(obj) = params.as_object_mut() {
                    obj.insert("chat_id".to_string(), WireValue::from(chat_id));
                }
            }
            other => return other,
        }
    }
}
