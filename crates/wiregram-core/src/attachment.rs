//! Outbound media references.

use crate::wire::WireValue;

/// The resolved representation of an outbound media value: a token for a
/// resource the platform already stores, a URL the platform fetches itself,
/// or raw bytes uploaded alongside the request.
///
/// Exactly one case; constructed once, never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachmentReference {
    Handle(String),
    RemoteUrl(String),
    InlineUpload { name: String, bytes: Vec<u8> },
}

/// One out-of-band multipart part referenced from the request body by an
/// `attach://<name>` placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadPart {
    pub name: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl AttachmentReference {
    /// Classify a string token. Stored-resource handles are opaque URL-safe
    /// tokens; anything with structure (dots, slashes, colons, whitespace)
    /// has to be a URL.
    pub fn classify(token: &str) -> Self {
        let is_handle = !token.is_empty()
            && token
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if is_handle {
            AttachmentReference::Handle(token.to_string())
        } else {
            AttachmentReference::RemoteUrl(token.to_string())
        }
    }

    /// Raw bytes plus a file name; bypasses classification entirely.
    pub fn upload(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        AttachmentReference::InlineUpload {
            name: name.into(),
            bytes,
        }
    }

    /// Render to the wire: the chosen key, its value, and the side-channel
    /// part when the bytes travel out-of-band. Handles and URLs write the
    /// same logical field under different keys; exactly one key is emitted.
    pub fn render(
        &self,
        key: &'static str,
        url_key: &'static str,
    ) -> (&'static str, WireValue, Option<UploadPart>) {
        match self {
            AttachmentReference::Handle(token) => {
                (key, WireValue::String(token.clone()), None)
            }
            AttachmentReference::RemoteUrl(url) => {
                (url_key, WireValue::String(url.clone()), None)
            }
            AttachmentReference::InlineUpload { name, bytes } => (
                key,
                WireValue::String(format!("attach://{name}")),
                Some(UploadPart {
                    name: name.clone(),
                    file_name: name.clone(),
                    bytes: bytes.clone(),
                }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_safe_tokens_are_handles() {
        assert_eq!(
            AttachmentReference::classify("abcDEF123_-"),
            AttachmentReference::Handle("abcDEF123_-".to_string())
        );
    }

    #[test]
    fn structured_strings_are_urls() {
        for token in ["https://x/y.png", "a.b", "a/b", "a b", "file:x", ""] {
            assert_eq!(
                AttachmentReference::classify(token),
                AttachmentReference::RemoteUrl(token.to_string()),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn render_picks_one_key_per_case() {
        let (key, value, part) =
            AttachmentReference::classify("AgACAbcd").render("photo", "photo_url");
        assert_eq!((key, value, part), ("photo", WireValue::String("AgACAbcd".into()), None));

        let (key, value, part) =
            AttachmentReference::classify("https://x/y.png").render("photo", "photo_url");
        assert_eq!(key, "photo_url");
        assert_eq!(value, WireValue::String("https://x/y.png".into()));
        assert!(part.is_none());
    }

    #[test]
    fn uploads_render_a_placeholder_and_a_part() {
        let upload = AttachmentReference::upload("shot.png", vec![1, 2, 3]);
        let (key, value, part) = upload.render("photo", "photo_url");
        assert_eq!(key, "photo");
        assert_eq!(value, WireValue::String("attach://shot.png".into()));
        let part = part.unwrap();
        assert_eq!(part.name, "shot.png");
        assert_eq!(part.bytes, vec![1, 2, 3]);
    }
}
