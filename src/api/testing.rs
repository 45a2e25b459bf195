//! In-memory backend for unit tests. Each operation can be gated so a test
//! holds a request in flight while it pokes at the controller.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::api::backend::{CallBackend, DirectoryBackend};
use crate::error::{ClientError, Result};

#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

impl Gate {
    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[derive(Default)]
pub struct FakeBackend {
    pub company_name: Mutex<Option<String>>,
    pub knowledge: Mutex<Option<String>>,
    pub directory_error: Mutex<Option<ClientError>>,
    pub upload_error: Mutex<Option<ClientError>>,
    /// Applied to stored knowledge, mimicking server-side summarization.
    pub summarize: Mutex<Option<fn(&str) -> String>>,
    pub call_replies: Mutex<Vec<Result<String>>>,
    pub transcript_reply: Mutex<Option<Result<Option<String>>>>,
    pub call_gate: Mutex<Option<Arc<Gate>>>,
    pub transcript_gate: Mutex<Option<Arc<Gate>>>,
    pub upload_gate: Mutex<Option<Arc<Gate>>>,
    pub name_requests: AtomicUsize,
    pub knowledge_requests: AtomicUsize,
    pub uploads: AtomicUsize,
    pub call_requests: AtomicUsize,
    pub transcript_requests: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_profile(name: Option<&str>, knowledge: Option<&str>) -> Arc<Self> {
        let fake = Self::default();
        *fake.company_name.lock().unwrap() = name.map(str::to_string);
        *fake.knowledge.lock().unwrap() = knowledge.map(str::to_string);
        Arc::new(fake)
    }

    pub fn queue_call(&self, reply: Result<String>) {
        self.call_replies.lock().unwrap().push(reply);
    }

    pub fn set_transcript(&self, reply: Result<Option<String>>) {
        *self.transcript_reply.lock().unwrap() = Some(reply);
    }

    pub fn gate(slot: &Mutex<Option<Arc<Gate>>>) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *slot.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn take_gate(slot: &Mutex<Option<Arc<Gate>>>) -> Option<Arc<Gate>> {
        slot.lock().unwrap().take()
    }

    fn directory_error(&self) -> Result<()> {
        match self.directory_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DirectoryBackend for FakeBackend {
    async fn company_name(&self) -> Result<Option<String>> {
        self.name_requests.fetch_add(1, Ordering::SeqCst);
        self.directory_error()?;
        Ok(self.company_name.lock().unwrap().clone())
    }

    async fn set_company_name(&self, name: &str) -> Result<()> {
        self.name_requests.fetch_add(1, Ordering::SeqCst);
        self.directory_error()?;
        *self.company_name.lock().unwrap() = Some(name.to_string());
        Ok(())
    }

    async fn knowledge_summary(&self) -> Result<Option<String>> {
        self.knowledge_requests.fetch_add(1, Ordering::SeqCst);
        self.directory_error()?;
        Ok(self.knowledge.lock().unwrap().clone())
    }

    async fn upload_knowledge(&self, text: &str) -> Result<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = Self::take_gate(&self.upload_gate) {
            gate.pass().await;
        }
        if let Some(e) = self.upload_error.lock().unwrap().clone() {
            return Err(e);
        }
        let stored = match *self.summarize.lock().unwrap() {
            Some(f) => f(text),
            None => text.trim().to_string(),
        };
        *self.knowledge.lock().unwrap() = Some(stored);
        Ok(())
    }
}

#[async_trait]
impl CallBackend for FakeBackend {
    async fn initiate_call(&self, _user_name: &str, _phone_number: &str) -> Result<String> {
        let n = self.call_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = Self::take_gate(&self.call_gate) {
            gate.pass().await;
        }
        let mut replies = self.call_replies.lock().unwrap();
        if replies.is_empty() {
            Ok(format!("CA{}", n + 1))
        } else {
            replies.remove(0)
        }
    }

    async fn conversation_history(&self, call_sid: &str) -> Result<Option<String>> {
        self.transcript_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = Self::take_gate(&self.transcript_gate) {
            gate.pass().await;
        }
        match self.transcript_reply.lock().unwrap().clone() {
            Some(reply) => reply,
            None => Ok(Some(format!("Agent: hello from {}", call_sid))),
        }
    }
}
