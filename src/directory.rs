use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::DirectoryBackend;
use crate::error::{ClientError, Result};
use crate::utils::is_blank;

/// Shown wherever a company name is displayed but none has been set.
pub const NAME_PLACEHOLDER: &str = "Not Set";
const KNOWLEDGE_SENTINEL: &str = "No knowledge summary available";

/// Local copy of the backend's company record, already normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub knowledge_summary: Option<String>,
}

impl CompanyProfile {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(NAME_PLACEHOLDER)
    }

    /// Seed for a name input field.
    pub fn editable_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn knowledge(&self) -> &str {
        self.knowledge_summary.as_deref().unwrap_or("")
    }
}

/// The backend reports "Not Set" for a missing name.
fn normalize_name(raw: Option<String>) -> Option<String> {
    raw.filter(|n| !n.is_empty() && n != NAME_PLACEHOLDER)
}

fn normalize_knowledge(raw: Option<String>) -> Option<String> {
    raw.filter(|k| !is_blank(k) && !k.trim_start().starts_with(KNOWLEDGE_SENTINEL))
}

pub struct CompanyDirectoryClient {
    backend: Arc<dyn DirectoryBackend>,
    cache: Mutex<CompanyProfile>,
}

impl CompanyDirectoryClient {
    pub fn new(backend: Arc<dyn DirectoryBackend>) -> Self {
        Self { backend, cache: Mutex::new(CompanyProfile::default()) }
    }

    fn cache(&self) -> MutexGuard<'_, CompanyProfile> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cached(&self) -> CompanyProfile {
        self.cache().clone()
    }

    pub async fn fetch_profile(&self) -> Result<CompanyProfile> {
        let (name, knowledge) = tokio::try_join!(self.backend.company_name(), self.backend.knowledge_summary())?;
        let profile = CompanyProfile {
            name: normalize_name(name),
            knowledge_summary: normalize_knowledge(knowledge),
        };
        *self.cache() = profile.clone();
        Ok(profile)
    }

    pub async fn refresh_name(&self) -> Result<Option<String>> {
        let name = normalize_name(self.backend.company_name().await?);
        self.cache().name = name.clone();
        Ok(name)
    }

    pub async fn refresh_knowledge(&self) -> Result<Option<String>> {
        let knowledge = normalize_knowledge(self.backend.knowledge_summary().await?);
        self.cache().knowledge_summary = knowledge.clone();
        Ok(knowledge)
    }

    /// Applied to the cache as soon as the backend accepts it; no re-fetch.
    pub async fn update_name(&self, new_name: &str) -> Result<()> {
        if is_blank(new_name) {
            return Err(ClientError::Validation("Company name cannot be empty.".into()));
        }
        self.backend.set_company_name(new_name).await?;
        self.cache().name = Some(new_name.to_string());
        log::info!("company name updated");
        Ok(())
    }

    /// The backend may rewrite knowledge text, so the cache is re-fetched
    /// after the upload rather than set locally. If only the re-fetch fails,
    /// the uploaded text is cached and a `Resync` error is returned.
    pub async fn update_knowledge(&self, text: &str) -> Result<()> {
        if is_blank(text) {
            return Err(ClientError::Validation("Please enter knowledge text.".into()));
        }
        self.backend.upload_knowledge(text).await?;
        log::info!("knowledge uploaded ({} chars)", text.len());
        match self.refresh_knowledge().await {
            Ok(_) => Ok(()),
            Err(e) => {
                log::warn!("knowledge re-fetch failed: {}", e);
                self.cache().knowledge_summary = normalize_knowledge(Some(text.trim().to_string()));
                Err(ClientError::Resync(Box::new(e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeBackend;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn fetch_normalizes_sentinels() {
        let fake = FakeBackend::with_profile(Some("Not Set"), Some("No knowledge summary available yet."));
        let dir = CompanyDirectoryClient::new(fake);
        let profile = dir.fetch_profile().await.unwrap();
        assert_eq!(profile, CompanyProfile::default());
        assert_eq!(profile.display_name(), "Not Set");
        assert_eq!(profile.editable_name(), "");
        assert_eq!(profile.knowledge(), "");
    }

    #[tokio::test]
    async fn fetch_failure_is_reported() {
        let fake = FakeBackend::with_profile(Some("Acme"), None);
        *fake.directory_error.lock().unwrap() = Some(ClientError::service(500, None));
        let dir = CompanyDirectoryClient::new(fake);
        assert_eq!(dir.fetch_profile().await, Err(ClientError::service(500, None)));
    }

    #[tokio::test]
    async fn blank_inputs_never_reach_backend() {
        let fake = FakeBackend::new();
        let dir = CompanyDirectoryClient::new(fake.clone());
        assert!(matches!(dir.update_name("   ").await, Err(ClientError::Validation(_))));
        assert!(matches!(dir.update_knowledge("").await, Err(ClientError::Validation(_))));
        assert!(matches!(dir.update_knowledge("  ").await, Err(ClientError::Validation(_))));
        assert_eq!(fake.name_requests.load(Ordering::SeqCst), 0);
        assert_eq!(fake.uploads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn name_update_is_optimistic() {
        let fake = FakeBackend::new();
        let dir = CompanyDirectoryClient::new(fake.clone());
        dir.update_name("Acme").await.unwrap();
        assert_eq!(dir.cached().display_name(), "Acme");
        assert_eq!(fake.name_requests.load(Ordering::SeqCst), 1);
        assert_eq!(dir.fetch_profile().await.unwrap().name.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn knowledge_update_resyncs() {
        let fake = FakeBackend::new();
        fn summarize(t: &str) -> String {
            format!("Summary: {}", t.trim())
        }
        *fake.summarize.lock().unwrap() = Some(summarize);
        let dir = CompanyDirectoryClient::new(fake.clone());
        dir.update_knowledge(" widgets ").await.unwrap();
        assert_eq!(dir.cached().knowledge(), "Summary: widgets");
        assert_eq!(fake.knowledge_requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_resync_keeps_upload() {
        let fake = FakeBackend::new();
        let dir = CompanyDirectoryClient::new(fake.clone());
        *fake.directory_error.lock().unwrap() = Some(ClientError::Network("reset".into()));
        let err = dir.update_knowledge("widgets").await.unwrap_err();
        assert!(matches!(err, ClientError::Resync(_)));
        assert_eq!(dir.cached().knowledge(), "widgets");
    }
}
