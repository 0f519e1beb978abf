//! Transport port and the reqwest implementation.

use async_trait::async_trait;

use wiregram_core::{
    attachment::UploadPart,
    wire::{WireValue, WireObject},
    Error, Result,
};

/// One platform call: POST `<base>/bot<token>/<method>`.
///
/// Implementations return the parsed response body without interpreting the
/// result envelope; envelope handling stays with the caller so tests can
/// fake the transport at the wire level. Stateless per call — one instance
/// is shared read-only across the whole process.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(
        &self,
        method: &str,
        body: WireValue,
        uploads: Vec<UploadPart>,
    ) -> Result<WireValue>;
}

pub struct HttpTransport {
    http: reqwest::Client,
    base: String,
    token: String,
}

impl HttpTransport {
    pub fn new(base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.into(),
            token: token.into(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base.trim_end_matches('/'),
            self.token,
            method
        )
    }

    /// Scalars travel as their bare text; structured values are embedded as
    /// JSON inside the form field.
    fn form_value(value: &WireValue) -> String {
        match value {
            WireValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        method: &str,
        body: WireValue,
        uploads: Vec<UploadPart>,
    ) -> Result<WireValue> {
        let fields: WireObject = body.as_object().cloned().unwrap_or_default();
        let request = self.http.post(self.url(method));

        let response = if uploads.is_empty() {
            let form: Vec<(String, String)> = fields
                .iter()
                .map(|(key, value)| (key.clone(), Self::form_value(value)))
                .collect();
            request.form(&form).send().await
        } else {
            let mut form = reqwest::multipart::Form::new();
            for (key, value) in &fields {
                form = form.text(key.clone(), Self::form_value(value));
            }
            for part in uploads {
                form = form.part(
                    part.name,
                    reqwest::multipart::Part::bytes(part.bytes).file_name(part.file_name),
                );
            }
            request.multipart(form).send().await
        }
        .map_err(|e| Error::Transport(format!("request failed: {e}")))?;

        // Failures still arrive as an envelope body, so the HTTP status is
        // not consulted here.
        response
            .json::<WireValue>()
            .await
            .map_err(|e| Error::Transport(format!("invalid response body: {e}")))
    }
}
