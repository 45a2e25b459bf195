use std::sync::{Arc, Mutex};

use super::{lock, InFlight};
use crate::directory::CompanyDirectoryClient;
use crate::error::{ClientError, Result};
use crate::utils::is_blank;

const EMPTY_TEXT: &str = "Please enter knowledge text.";
const PROCESSING: &str = "Processing...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgeMode {
    Viewing,
    Editing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeView {
    pub mode: KnowledgeMode,
    pub saved: String,
    pub buffer: String,
    pub status: Option<String>,
    pub uploading: bool,
}

impl KnowledgeView {
    /// The edit surface is live only while editing and nothing is uploading.
    pub fn is_editable(&self) -> bool {
        self.mode == KnowledgeMode::Editing && !self.uploading
    }
}

#[derive(Debug, Default)]
struct KnowledgeInner {
    saved: String,
    buffer: String,
    editing: bool,
    status: Option<String>,
    uploading: bool,
    generation: u64,
}

impl KnowledgeInner {
    // With nothing saved there is nothing to view.
    fn mode(&self) -> KnowledgeMode {
        if self.editing || self.saved.is_empty() {
            KnowledgeMode::Editing
        } else {
            KnowledgeMode::Viewing
        }
    }
}

/// View/edit toggle and upload workflow for the company knowledge base.
pub struct KnowledgeEditController {
    directory: Arc<CompanyDirectoryClient>,
    state: Mutex<KnowledgeInner>,
}

impl KnowledgeEditController {
    /// Starts from whatever the directory has cached.
    pub fn new(directory: Arc<CompanyDirectoryClient>) -> Self {
        let saved = directory.cached().knowledge().to_string();
        Self {
            directory,
            state: Mutex::new(KnowledgeInner { saved, ..KnowledgeInner::default() }),
        }
    }

    pub fn snapshot(&self) -> KnowledgeView {
        let st = lock(&self.state);
        KnowledgeView {
            mode: st.mode(),
            saved: st.saved.clone(),
            buffer: st.buffer.clone(),
            status: st.status.clone(),
            uploading: st.uploading,
        }
    }

    pub fn mode(&self) -> KnowledgeMode {
        lock(&self.state).mode()
    }

    /// Pulls the saved summary from the backend. Refused while an upload is
    /// in flight, since the upload re-fetches the summary itself.
    pub async fn load(&self) -> Result<()> {
        let generation = {
            let mut st = lock(&self.state);
            if st.uploading {
                return Err(ClientError::Busy);
            }
            st.generation += 1;
            st.generation
        };
        let outcome = self.directory.refresh_knowledge().await;

        let mut st = lock(&self.state);
        if st.generation != generation {
            log::debug!("dropping superseded knowledge load");
            return Err(ClientError::Superseded);
        }
        match outcome {
            Ok(knowledge) => {
                st.saved = knowledge.unwrap_or_default();
                Ok(())
            }
            Err(e) => {
                st.status = Some(if e.is_network() {
                    format!("Error fetching knowledge: {}", e.detail())
                } else {
                    "No knowledge summary available.".to_string()
                });
                Err(e)
            }
        }
    }

    /// Viewing -> Editing, seeding the buffer with the saved text. Returns
    /// false when there is nothing to switch from.
    pub fn begin_edit(&self) -> bool {
        let mut st = lock(&self.state);
        if st.mode() != KnowledgeMode::Viewing || st.uploading {
            return false;
        }
        st.editing = true;
        st.buffer = st.saved.clone();
        true
    }

    /// Replaces the edit buffer. Refused while viewing or uploading.
    pub fn set_buffer(&self, text: &str) -> bool {
        let mut st = lock(&self.state);
        if st.mode() != KnowledgeMode::Editing || st.uploading {
            return false;
        }
        st.buffer = text.to_string();
        true
    }

    /// Uploads the edit buffer. On success the controller returns to
    /// viewing the server's copy; on failure it stays in editing with the
    /// buffer intact.
    pub async fn upload(&self) -> Result<()> {
        let (text, generation) = {
            let mut st = lock(&self.state);
            if st.uploading {
                return Err(ClientError::Busy);
            }
            if is_blank(&st.buffer) {
                st.status = Some(EMPTY_TEXT.to_string());
                return Err(ClientError::Validation(EMPTY_TEXT.to_string()));
            }
            st.uploading = true;
            st.generation += 1;
            st.status = Some(PROCESSING.to_string());
            (st.buffer.clone(), st.generation)
        };

        let _in_flight = InFlight::new(&self.state, move |st: &mut KnowledgeInner| {
            st.uploading = false;
            if st.status.as_deref() == Some(PROCESSING) {
                st.status = (st.generation == generation).then(|| "Error: upload interrupted".to_string());
            }
        });

        let outcome = self.directory.update_knowledge(&text).await;

        let mut st = lock(&self.state);
        if st.generation != generation {
            log::debug!("dropping superseded knowledge upload result");
            return Err(ClientError::Superseded);
        }
        match outcome {
            Ok(()) => {
                st.saved = self.directory.cached().knowledge().to_string();
                st.editing = false;
                st.buffer.clear();
                st.status = Some("Knowledge updated successfully!".to_string());
                Ok(())
            }
            Err(ClientError::Resync(inner)) => {
                st.saved = self.directory.cached().knowledge().to_string();
                st.editing = false;
                st.buffer.clear();
                st.status = Some(format!("Knowledge updated, but refreshing it failed: {}", inner.detail()));
                Err(ClientError::Resync(inner))
            }
            Err(e) => {
                st.status = Some(format!("Error: {}", e.detail()));
                Err(e)
            }
        }
    }
}
