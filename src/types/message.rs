//! Gemini `contents` wire format: roles, turns and content parts.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::types::file::RemoteFileHandle;

/// Turn author as the generateContent API names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One unit of a model request.
///
/// Serializes to the externally-tagged shapes the API expects:
/// `{"text": ..}`, `{"inlineData": {"mimeType", "data"}}`, `{"fileData": {"mimeType", "fileUri"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text(String),
    #[serde(rename = "inlineData", rename_all = "camelCase")]
    InlineData { mime_type: String, data: String },
    #[serde(rename = "fileData", rename_all = "camelCase")]
    FileReference { mime_type: String, file_uri: String },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(text.into())
    }

    /// Base64-encode `bytes` into an inline part.
    pub fn inline(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        ContentPart::InlineData {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Reference a file previously staged through the remote file API.
    pub fn file_reference(handle: &RemoteFileHandle) -> Self {
        ContentPart::FileReference {
            mime_type: handle.mime_type.clone(),
            file_uri: handle.uri.clone(),
        }
    }
}

/// A role-tagged sequence of parts; the element type of `contents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl Content {
    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    /// Single user turn holding only `text`.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![ContentPart::text(text)])
    }
}

/// One entry of the caller-held chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

impl From<&ConversationTurn> for Content {
    fn from(turn: &ConversationTurn) -> Self {
        Content {
            role: turn.role,
            parts: vec![ContentPart::text(turn.text.clone())],
        }
    }
}

/// Convert caller history to `contents`, preserving order.
pub fn history_to_contents(history: &[ConversationTurn]) -> Vec<Content> {
    history.iter().map(Content::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parts_serialize_to_gemini_shapes() {
        let text = serde_json::to_value(ContentPart::text("hi")).unwrap();
        assert_eq!(text, json!({"text": "hi"}));

        let inline = serde_json::to_value(ContentPart::inline(b"abc", "image/png")).unwrap();
        assert_eq!(
            inline,
            json!({"inlineData": {"mimeType": "image/png", "data": "YWJj"}})
        );

        let handle = RemoteFileHandle {
            remote_id: "files/abc".into(),
            uri: "https://example.test/files/abc".into(),
            mime_type: "video/mp4".into(),
        };
        let file = serde_json::to_value(ContentPart::file_reference(&handle)).unwrap();
        assert_eq!(
            file,
            json!({"fileData": {"mimeType": "video/mp4", "fileUri": "https://example.test/files/abc"}})
        );
    }

    #[test]
    fn history_keeps_order_and_roles() {
        let history = vec![
            ConversationTurn::user("Hello"),
            ConversationTurn::model("Hi there"),
            ConversationTurn::user("How are you?"),
        ];
        let contents = history_to_contents(&history);
        let v = serde_json::to_value(&contents).unwrap();
        assert_eq!(v[0]["role"], "user");
        assert_eq!(v[1]["role"], "model");
        assert_eq!(v[1]["parts"][0]["text"], "Hi there");
        assert_eq!(v[2]["parts"][0]["text"], "How are you?");
    }

    #[test]
    fn turn_rejects_unknown_role() {
        let err = serde_json::from_value::<ConversationTurn>(json!({"role": "assistant", "text": "x"}));
        assert!(err.is_err());
    }
}
