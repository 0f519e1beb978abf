//! Test doubles shared by the client test modules.

use std::{
    collections::VecDeque,
    sync::Mutex,
};

use async_trait::async_trait;
use serde_json::json;

use wiregram_core::{
    attachment::UploadPart,
    wire::WireValue,
    Error, Result,
};

use crate::{feed::ErrorSink, transport::Transport};

/// Scripted transport: answers calls from a queue and records every request.
/// Once the script runs out it keeps answering with an empty batch, so a
/// feed under test can idle until it is cancelled.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<WireValue>>>,
    calls: Mutex<Vec<(String, WireValue)>>,
    upload_names: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<WireValue>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
            upload_names: Mutex::new(Vec::new()),
        }
    }

    /// A successful envelope around `result`.
    pub fn ok(result: WireValue) -> Result<WireValue> {
        Ok(json!({"ok": true, "result": result}))
    }

    /// A failed envelope with structured parameters.
    pub fn api_error(code: i64, parameters: WireValue) -> Result<WireValue> {
        Ok(json!({
            "ok": false,
            "error_code": code,
            "description": "scripted failure",
            "parameters": parameters
        }))
    }

    pub fn transport_error() -> Result<WireValue> {
        Err(Error::Transport("connection reset".to_string()))
    }

    pub fn calls(&self) -> Vec<(String, WireValue)> {
        self.calls.lock().unwrap().clone()
    }

    /// Names of every out-of-band part seen so far, across all calls.
    pub fn upload_names(&self) -> Vec<String> {
        self.upload_names.lock().unwrap().clone()
    }

    /// The `offset` parameter of every recorded call, in order.
    pub fn offsets(&self) -> Vec<Option<i64>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.get("offset").and_then(WireValue::as_i64))
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(
        &self,
        method: &str,
        body: WireValue,
        uploads: Vec<UploadPart>,
    ) -> Result<WireValue> {
        self.calls.lock().unwrap().push((method.to_string(), body));
        self.upload_names
            .lock()
            .unwrap()
            .extend(uploads.into_iter().map(|part| part.name));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Self::ok(json!([])))
    }
}

/// Error sink that keeps the rendered messages for assertions.
#[derive(Default)]
pub struct RecordingSink {
    errors: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl ErrorSink for RecordingSink {
    fn on_error(&self, error: &Error) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}
