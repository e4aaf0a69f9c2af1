use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whether an attachment is an opaque file or an image with a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// Any file the user attached.
    File,
    /// An image, usually carrying an inline base64 preview.
    Image,
}

/// An attachment as reported by the collection agent.
///
/// The wire names (`path`, `type`, `size`, `data`) are part of the agent
/// contract and must not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Identifier unique within the session.
    pub id: String,
    /// Display file name.
    pub name: String,
    /// Absolute path to the original bytes.
    #[serde(rename = "path")]
    pub source_path: PathBuf,
    /// Attachment kind.
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    /// Size of the source when the agent produced the record.
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Self-describing `data:` URI preview, images only.
    #[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<String>,
}

/// An attachment after it has been copied into session storage.
///
/// `stored_path` stays in-process only: callers see `name`, `type`, `size`
/// and `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedAttachment {
    /// File name inside the session directory.
    pub name: String,
    /// Attachment kind.
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    /// Size of the persisted copy.
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Preview carried over from the agent, images only.
    #[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<String>,
    /// Where the copy lives on disk.
    #[serde(skip)]
    pub stored_path: PathBuf,
}

impl PersistedAttachment {
    /// Split the inline `data:<mime>;base64,<payload>` preview into its MIME
    /// type and base64 payload.
    pub fn inline_image(&self) -> Option<(&str, &str)> {
        if self.kind != AttachmentKind::Image {
            return None;
        }
        let rest = self.inline_data.as_deref()?.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mime = header.strip_suffix(";base64")?;
        if mime.is_empty() || payload.is_empty() {
            return None;
        }
        Some((mime, payload))
    }
}

/// The final output of a feedback session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackResult {
    /// Free-form feedback text; may be empty.
    #[serde(rename = "interactive_feedback")]
    pub text: String,
    /// Ingested attachments in the order the agent reported them.
    #[serde(default)]
    pub attachments: Vec<PersistedAttachment>,
}

impl FeedbackResult {
    /// The result of a session the user dismissed without submitting.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when there is neither text nor any attachment.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.attachments.is_empty()
    }
}

/// The document a collection agent writes into its result channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPayload {
    /// Feedback text.
    pub interactive_feedback: String,
    /// Attachments in transient form. Older agents omit the field.
    #[serde(default)]
    pub attachments: Vec<AttachmentRecord>,
}

impl ChannelPayload {
    /// A payload with text only.
    pub fn text(feedback: impl Into<String>) -> Self {
        Self {
            interactive_feedback: feedback.into(),
            attachments: Vec::new(),
        }
    }
}
