use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompanyInfo {
    #[serde(default)]
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCompanyName {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KnowledgeSummary {
    #[serde(default)]
    pub knowledge_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeUpload {
    pub knowledge_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateCall {
    pub phone_number: String,
    pub user_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InitiateCallReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConversationHistory {
    #[serde(default)]
    pub formatted_text: Option<String>,
}

/// Error body shapes the backend uses: `{detail}` for HTTP errors, `{error}`
/// for call failures.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        if let Some(detail) = &self.detail {
            return match detail {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            };
        }
        self.error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_tolerates_missing_fields() {
        let reply: InitiateCallReply = serde_json::from_str(r#"{"success": false, "error": "busy"}"#).unwrap();
        assert!(!reply.success);
        assert_eq!(reply.call_sid, None);
        assert_eq!(reply.error.as_deref(), Some("busy"));
    }

    #[test]
    fn error_body_prefers_detail() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": "CallSid missing", "error": "x"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("CallSid missing"));
        let body: ErrorBody = serde_json::from_str(r#"{"detail": [{"loc": ["body"]}]}"#).unwrap();
        assert!(body.message().unwrap().contains("loc"));
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.message(), None);
    }
}
