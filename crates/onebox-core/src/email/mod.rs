//! Email document model shared by both search backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category assigned by the external classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Category label, e.g. `Interested` or `Spam`
    pub category: String,
    /// Model confidence in `[0, 1]`, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Classification {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Attachment metadata. Attachment bodies are never indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Validation failure for a caller-supplied document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("email id must not be empty")]
    MissingId,
}

/// A single email as stored in the keyword and vector backends.
///
/// The `id` is the identity in both stores; indexing the same id twice
/// overwrites the previous copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailDocument {
    pub id: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl EmailDocument {
    /// Create a document with the given id, subject and body. Everything else
    /// starts empty and the date is set to now.
    pub fn new(id: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            account_id: String::new(),
            folder: "INBOX".to_string(),
            subject: subject.into(),
            from: String::new(),
            to: Vec::new(),
            cc: Vec::new(),
            date: Utc::now(),
            body: body.into(),
            html: None,
            classification: None,
            attachments: Vec::new(),
            thread_id: None,
            in_reply_to: None,
            provider: None,
        }
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to.push(to.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Text sent to the semantic backend: subject and body, trimmed.
    pub fn vector_content(&self) -> String {
        format!("{}\n\n{}", self.subject.trim(), self.body.trim())
            .trim()
            .to_string()
    }

    /// Reject documents that cannot be addressed in either backend.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.id.trim().is_empty() {
            return Err(DocumentError::MissingId);
        }
        Ok(())
    }

    pub fn category(&self) -> Option<&str> {
        self.classification.as_ref().map(|c| c.category.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_content_joins_subject_and_body() {
        let doc = EmailDocument::new("e-1", "  Invoice due ", "Please pay by Friday.\n");
        assert_eq!(doc.vector_content(), "Invoice due\n\nPlease pay by Friday.");
    }

    #[test]
    fn vector_content_of_blank_email_is_empty() {
        let doc = EmailDocument::new("e-1", "   ", "\n\t");
        assert!(doc.vector_content().is_empty());
    }

    #[test]
    fn validate_rejects_blank_id() {
        assert_eq!(
            EmailDocument::new("  ", "s", "b").validate(),
            Err(DocumentError::MissingId)
        );
        assert!(EmailDocument::new("e-1", "s", "b").validate().is_ok());
    }

    #[test]
    fn deserializes_with_missing_optional_fields() {
        let doc: EmailDocument = serde_json::from_value(serde_json::json!({
            "id": "e-7",
            "subject": "Hello",
            "date": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(doc.id, "e-7");
        assert!(doc.to.is_empty());
        assert!(doc.classification.is_none());
        assert_eq!(doc.category(), None);
    }

    #[test]
    fn builder_sets_classification() {
        let doc = EmailDocument::new("e-1", "s", "b")
            .with_classification(Classification::new("Interested").with_confidence(0.92));
        assert_eq!(doc.category(), Some("Interested"));
    }

    proptest::proptest! {
        #[test]
        fn vector_content_is_trimmed(subject in "\\PC{0,40}", body in "\\PC{0,80}") {
            let content = EmailDocument::new("e-1", subject, body).vector_content();
            proptest::prop_assert_eq!(content.trim(), content.as_str());
        }
    }
}
