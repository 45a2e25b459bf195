use async_trait::async_trait;

use crate::error::Result;

/// Company identity and knowledge endpoints.
#[async_trait]
pub trait DirectoryBackend: Send + Sync {
    /// Raw company name as the backend reports it, `None` when absent.
    async fn company_name(&self) -> Result<Option<String>>;
    async fn set_company_name(&self, name: &str) -> Result<()>;
    /// Raw summary, possibly the "not set" sentinel.
    async fn knowledge_summary(&self) -> Result<Option<String>>;
    async fn upload_knowledge(&self, text: &str) -> Result<()>;
}

/// Call initiation and transcript endpoints.
#[async_trait]
pub trait CallBackend: Send + Sync {
    /// Returns the call SID on success. A backend-reported failure is a
    /// `ClientError::Service` carrying the backend's message.
    async fn initiate_call(&self, user_name: &str, phone_number: &str) -> Result<String>;
    /// Returns the formatted transcript, `None` when the backend has none.
    async fn conversation_history(&self, call_sid: &str) -> Result<Option<String>>;
}
