use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::{ApiClient, CallBackend, DirectoryBackend};
use crate::config::Settings;
use crate::controllers::{lock, CallRequestController, KnowledgeEditController};
use crate::credentials::CredentialVerifier;
use crate::directory::CompanyDirectoryClient;
use crate::error::{ClientError, Result};
use crate::guard::{Access, AccessGuard, Route};
use crate::session::{Role, Session, SessionStore};
use crate::storage::SessionStorage;

/// Heading on the call page when the company has no usable name.
pub const DEFAULT_COMPANY_HEADING: &str = "Our Company";

/// Outcome of opening a protected page.
pub enum Navigation<T> {
    Show(T),
    Redirect(Route),
}

impl<T> Navigation<T> {
    pub fn page(self) -> Option<T> {
        match self {
            Navigation::Show(page) => Some(page),
            Navigation::Redirect(_) => None,
        }
    }
}

/// Wires sessions, the guard and the backend together. Each page is built
/// fresh on every navigation, after the guard has been consulted.
pub struct App {
    settings: Settings,
    guard: AccessGuard,
    directory_backend: Arc<dyn DirectoryBackend>,
    call_backend: Arc<dyn CallBackend>,
}

impl App {
    pub fn new(
        settings: Settings,
        storage: Box<dyn SessionStorage>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Result<Self> {
        let api = Arc::new(ApiClient::with_timeout(
            &settings.base_url,
            Duration::from_secs(settings.request_timeout_secs),
        )?);
        Ok(Self::with_backend(settings, storage, verifier, api))
    }

    pub fn with_backend<B>(
        settings: Settings,
        storage: Box<dyn SessionStorage>,
        verifier: Arc<dyn CredentialVerifier>,
        backend: Arc<B>,
    ) -> Self
    where
        B: DirectoryBackend + CallBackend + 'static,
    {
        let sessions = Arc::new(SessionStore::new(storage, settings.session_ttl_secs));
        Self {
            guard: AccessGuard::new(sessions, verifier),
            directory_backend: backend.clone(),
            call_backend: backend,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn current_session(&self) -> Option<Session> {
        self.guard.sessions().current()
    }

    pub fn is_authenticated(&self, role: Role) -> bool {
        self.guard.sessions().is_authenticated(role)
    }

    pub fn sign_in(&self, portal: Role, username: &str, password: &str) -> Result<Route> {
        self.guard.sign_in(portal, username, password)
    }

    pub fn sign_out(&self, role: Role) -> Result<Route> {
        self.guard.sign_out(role)
    }

    pub async fn open_company_dashboard(&self) -> Navigation<CompanyDashboard> {
        match self.guard.check(Role::Company) {
            Access::Redirect(route) => Navigation::Redirect(route),
            Access::Granted(_) => {
                let dashboard = CompanyDashboard::new(self.directory_backend.clone());
                dashboard.load().await;
                Navigation::Show(dashboard)
            }
        }
    }

    pub async fn open_call_page(&self) -> Navigation<CallRequestPage> {
        match self.guard.check(Role::User) {
            Access::Redirect(route) => Navigation::Redirect(route),
            Access::Granted(_) => {
                let directory = CompanyDirectoryClient::new(self.directory_backend.clone());
                let heading = match directory.refresh_name().await {
                    Ok(Some(name)) => name,
                    Ok(None) => DEFAULT_COMPANY_HEADING.to_string(),
                    Err(e) => {
                        log::warn!("could not fetch company name: {}", e);
                        DEFAULT_COMPANY_HEADING.to_string()
                    }
                };
                let calls = CallRequestController::new(self.call_backend.clone(), self.settings.resubmit_policy);
                Navigation::Show(CallRequestPage { company_name: heading, calls })
            }
        }
    }
}

#[derive(Debug, Default)]
struct NameForm {
    draft: String,
    status: Option<String>,
}

/// Administrator page: company name form plus the knowledge editor.
pub struct CompanyDashboard {
    directory: Arc<CompanyDirectoryClient>,
    knowledge: KnowledgeEditController,
    name: Mutex<NameForm>,
}

impl CompanyDashboard {
    fn new(backend: Arc<dyn DirectoryBackend>) -> Self {
        let directory = Arc::new(CompanyDirectoryClient::new(backend));
        Self {
            knowledge: KnowledgeEditController::new(directory.clone()),
            directory,
            name: Mutex::new(NameForm::default()),
        }
    }

    /// Fetches name and knowledge. Failures end up in the status lines.
    pub async fn load(&self) {
        let (name, _) = tokio::join!(self.directory.refresh_name(), self.knowledge.load());
        let mut form = lock(&self.name);
        match name {
            Ok(name) => form.draft = name.unwrap_or_default(),
            Err(ClientError::Service { .. }) => form.status = Some("Failed to fetch company name.".into()),
            Err(e) => form.status = Some(format!("Error: {}", e.detail())),
        }
    }

    pub fn company_name(&self) -> String {
        self.directory.cached().display_name().to_string()
    }

    pub fn name_draft(&self) -> String {
        lock(&self.name).draft.clone()
    }

    pub fn set_name_draft(&self, draft: &str) {
        lock(&self.name).draft = draft.to_string();
    }

    pub fn name_status(&self) -> Option<String> {
        lock(&self.name).status.clone()
    }

    pub async fn submit_name(&self) -> Result<()> {
        let draft = {
            let mut form = lock(&self.name);
            form.status = Some("Updating...".into());
            form.draft.clone()
        };
        let outcome = self.directory.update_name(&draft).await;
        let mut form = lock(&self.name);
        form.status = Some(match &outcome {
            Ok(()) => "Company name updated!".to_string(),
            Err(ClientError::Validation(msg)) => msg.clone(),
            Err(e) => format!("Error: {}", e.detail()),
        });
        outcome
    }

    pub fn knowledge(&self) -> &KnowledgeEditController {
        &self.knowledge
    }
}

/// End-user page: company heading plus the call controller.
pub struct CallRequestPage {
    company_name: String,
    calls: CallRequestController,
}

impl CallRequestPage {
    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn calls(&self) -> &CallRequestController {
        &self.calls
    }
}
