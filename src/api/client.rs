use async_trait::async_trait;
use reqwest::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::api::backend::{CallBackend, DirectoryBackend};
use crate::api::models::{
    CompanyInfo, ConversationHistory, ErrorBody, InitiateCall, InitiateCallReply, KnowledgeSummary,
    KnowledgeUpload, SetCompanyName,
};
use crate::error::{ClientError, Result};
use crate::utils::{mask_phone, normalize_url};

/// HTTP client for the agent backend. Every path is resolved against a
/// fixed base origin.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub http: HttpClient,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(15))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self { http, base: Self::parse_base(base_url)? })
    }

    fn parse_base(base_url: &str) -> Result<Url> {
        let mut url = Url::parse(&normalize_url(base_url))
            .map_err(|e| ClientError::Validation(format!("invalid base url: {}", e)))?;
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ClientError::Validation(format!("invalid base url: no host in {:?}", base_url)));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| ClientError::Validation(format!("invalid endpoint {}: {}", path, e)))
    }

    /// Turns a non-success response into a `Service` error, keeping the
    /// backend's `detail`/`error` text when the body carries one.
    async fn service_error(resp: Response) -> ClientError {
        let status = resp.status().as_u16();
        let detail = match resp.json::<ErrorBody>().await {
            Ok(body) => body.message(),
            Err(_) => None,
        };
        ClientError::service(status, detail)
    }

    async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::service_error(resp).await);
        }
        resp.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                ClientError::service(status.as_u16(), Some(format!("malformed response: {}", e)))
            } else {
                ClientError::from(e)
            }
        })
    }

    async fn expect_success(resp: Response) -> Result<()> {
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::service_error(resp).await)
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        log::debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        Self::read_json(resp).await
    }
}

#[async_trait]
impl DirectoryBackend for ApiClient {
    async fn company_name(&self) -> Result<Option<String>> {
        let info: CompanyInfo = self.get("company_info").await?;
        Ok(info.company_name)
    }

    async fn set_company_name(&self, name: &str) -> Result<()> {
        let url = self.endpoint("company_info")?;
        let body = SetCompanyName { name: name.to_string() };
        let resp = self.http.post(url).json(&body).send().await?;
        Self::expect_success(resp).await
    }

    async fn knowledge_summary(&self) -> Result<Option<String>> {
        let summary: KnowledgeSummary = self.get("get_knowledge").await?;
        Ok(summary.knowledge_summary)
    }

    async fn upload_knowledge(&self, text: &str) -> Result<()> {
        let url = self.endpoint("upload_knowledge")?;
        let body = KnowledgeUpload { knowledge_text: text.to_string() };
        log::debug!("uploading {} chars of knowledge", text.len());
        let resp = self.http.post(url).json(&body).send().await?;
        Self::expect_success(resp).await
    }
}

#[async_trait]
impl CallBackend for ApiClient {
    async fn initiate_call(&self, user_name: &str, phone_number: &str) -> Result<String> {
        let url = self.endpoint("initiate_call")?;
        let body = InitiateCall {
            phone_number: phone_number.to_string(),
            user_name: user_name.to_string(),
        };
        log::debug!("POST {} for {}", url, mask_phone(phone_number));
        let resp = self.http.post(url).json(&body).send().await?;
        let status = resp.status().as_u16();
        let reply: InitiateCallReply = Self::read_json(resp).await?;
        match reply.call_sid {
            Some(sid) if reply.success && !sid.is_empty() => Ok(sid),
            _ => Err(ClientError::service(status, reply.error)),
        }
    }

    async fn conversation_history(&self, call_sid: &str) -> Result<Option<String>> {
        let mut url = self.endpoint("get_conversation_history")?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation("base url cannot carry a path".into()))?
            .push(call_sid);
        log::debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        let history: ConversationHistory = Self::read_json(resp).await?;
        Ok(history.formatted_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_resolve_under_base() {
        let client = ApiClient::new("localhost:8000").unwrap();
        assert_eq!(client.endpoint("company_info").unwrap().as_str(), "http://localhost:8000/company_info");

        let client = ApiClient::new("https://agent.example.com/v2").unwrap();
        assert_eq!(
            client.endpoint("get_knowledge").unwrap().as_str(),
            "https://agent.example.com/v2/get_knowledge"
        );
    }

    #[test]
    fn bad_base_is_rejected() {
        assert!(matches!(ApiClient::new("http://"), Err(ClientError::Validation(_))));
        assert!(matches!(ApiClient::new("https:///"), Err(ClientError::Validation(_))));
        assert!(matches!(ApiClient::new("  "), Err(ClientError::Validation(_))));
    }
}
