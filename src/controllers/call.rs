use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use super::{lock, InFlight};
use crate::api::CallBackend;
use crate::error::{ClientError, Result};
use crate::utils::{is_blank, mask_phone};

const MISSING_FIELDS: &str = "Please enter your name and phone number.";
const CALL_FALLBACK: &str = "Failed to initiate call.";
const NO_LOG: &str = "No log available.";

/// What happens to a displayed call when a new one is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResubmitPolicy {
    /// Drop the previous SID and transcript.
    #[default]
    Discard,
    /// Keep the previous SID and any fetched transcript in `CallView::previous`.
    Retain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStatus {
    Idle,
    Submitting,
    Active(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptState {
    NotFetched,
    Fetching,
    Available(String),
    FetchFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub user_name: String,
    pub phone_number: String,
    pub status: CallStatus,
}

impl CallRequest {
    pub fn call_sid(&self) -> Option<&str> {
        match &self.status {
            CallStatus::Active(sid) => Some(sid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PastCall {
    pub call_sid: String,
    pub transcript: Option<String>,
}

/// Snapshot for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallView {
    pub request: Option<CallRequest>,
    pub transcript: TranscriptState,
    pub status_line: Option<String>,
    pub log_line: Option<String>,
    pub previous: Option<PastCall>,
    pub submitting: bool,
    pub fetching_log: bool,
}

impl CallView {
    pub fn status(&self) -> CallStatus {
        self.request.as_ref().map_or(CallStatus::Idle, |r| r.status.clone())
    }

    pub fn call_sid(&self) -> Option<&str> {
        self.request.as_ref().and_then(CallRequest::call_sid)
    }
}

#[derive(Debug)]
struct CallInner {
    request: Option<CallRequest>,
    transcript: TranscriptState,
    status_line: Option<String>,
    log_line: Option<String>,
    previous: Option<PastCall>,
    submitting: bool,
    fetching_log: bool,
    /// Bumped by every submission and reset; responses tagged with an older
    /// value are dropped.
    generation: u64,
}

impl Default for CallInner {
    fn default() -> Self {
        Self {
            request: None,
            transcript: TranscriptState::NotFetched,
            status_line: None,
            log_line: None,
            previous: None,
            submitting: false,
            fetching_log: false,
            generation: 0,
        }
    }
}

impl CallInner {
    fn call_sid(&self) -> Option<&str> {
        self.request.as_ref().and_then(CallRequest::call_sid)
    }

    fn set_status(&mut self, status: CallStatus) {
        if let Some(request) = self.request.as_mut() {
            request.status = status;
        }
    }
}

/// Drives one call request from submission to transcript retrieval.
pub struct CallRequestController {
    backend: Arc<dyn CallBackend>,
    policy: ResubmitPolicy,
    state: Mutex<CallInner>,
}

impl CallRequestController {
    pub fn new(backend: Arc<dyn CallBackend>, policy: ResubmitPolicy) -> Self {
        Self { backend, policy, state: Mutex::new(CallInner::default()) }
    }

    pub fn snapshot(&self) -> CallView {
        let st = lock(&self.state);
        CallView {
            request: st.request.clone(),
            transcript: st.transcript.clone(),
            status_line: st.status_line.clone(),
            log_line: st.log_line.clone(),
            previous: st.previous.clone(),
            submitting: st.submitting,
            fetching_log: st.fetching_log,
        }
    }

    pub fn status(&self) -> CallStatus {
        lock(&self.state).request.as_ref().map_or(CallStatus::Idle, |r| r.status.clone())
    }

    pub fn call_sid(&self) -> Option<String> {
        lock(&self.state).call_sid().map(str::to_string)
    }

    /// Back to `Idle`. Anything still in flight will be ignored when it lands.
    pub fn reset(&self) {
        let mut st = lock(&self.state);
        let generation = st.generation + 1;
        let (submitting, fetching_log) = (st.submitting, st.fetching_log);
        *st = CallInner { generation, submitting, fetching_log, ..CallInner::default() };
    }

    /// Requests a call. A new submission always replaces the displayed call;
    /// only one submission may be outstanding.
    pub async fn submit(&self, user_name: &str, phone_number: &str) -> Result<String> {
        let generation = {
            let mut st = lock(&self.state);
            if is_blank(user_name) || is_blank(phone_number) {
                st.status_line = Some(MISSING_FIELDS.to_string());
                return Err(ClientError::Validation(MISSING_FIELDS.to_string()));
            }
            if st.submitting {
                return Err(ClientError::Busy);
            }
            let prior_sid = st.call_sid().map(str::to_string);
            let previous = match (self.policy, prior_sid) {
                (ResubmitPolicy::Retain, Some(call_sid)) => Some(PastCall {
                    call_sid,
                    transcript: match &st.transcript {
                        TranscriptState::Available(text) => Some(text.clone()),
                        _ => None,
                    },
                }),
                (ResubmitPolicy::Retain, None) => st.previous.take(),
                (ResubmitPolicy::Discard, _) => None,
            };
            st.generation += 1;
            st.submitting = true;
            st.previous = previous;
            st.request = Some(CallRequest {
                user_name: user_name.to_string(),
                phone_number: phone_number.to_string(),
                status: CallStatus::Submitting,
            });
            st.transcript = TranscriptState::NotFetched;
            st.log_line = None;
            st.status_line = Some("Initiating call...".to_string());
            st.generation
        };

        let _in_flight = InFlight::new(&self.state, move |st: &mut CallInner| {
            st.submitting = false;
            let interrupted = st.generation == generation
                && st.request.as_ref().is_some_and(|r| r.status == CallStatus::Submitting);
            if interrupted {
                st.set_status(CallStatus::Failed("Call request was interrupted.".into()));
                st.status_line = Some("Error: Call request was interrupted.".into());
            }
        });

        log::info!("requesting call to {}", mask_phone(phone_number));
        let outcome = self.backend.initiate_call(user_name, phone_number).await;

        let mut st = lock(&self.state);
        if st.generation != generation {
            log::debug!("ignoring call response for superseded request {}", generation);
            return Err(ClientError::Superseded);
        }
        match outcome {
            Ok(sid) => {
                log::info!("call active: {}", sid);
                st.set_status(CallStatus::Active(sid.clone()));
                st.status_line = Some(format!("Call initiated! Call SID: {}", sid));
                Ok(sid)
            }
            Err(e) => {
                let message = match &e {
                    ClientError::Service { detail: Some(detail), .. } => detail.clone(),
                    ClientError::Service { detail: None, .. } => CALL_FALLBACK.to_string(),
                    other => other.detail(),
                };
                log::warn!("call request failed: {}", message);
                st.set_status(CallStatus::Failed(message.clone()));
                st.status_line = Some(format!("Error: {}", message));
                Err(e)
            }
        }
    }

    /// Fetches the transcript of the active call. Does not change the call's
    /// own status.
    pub async fn fetch_transcript(&self) -> Result<String> {
        let (sid, generation) = {
            let mut st = lock(&self.state);
            let sid = match st.call_sid() {
                Some(sid) => sid.to_string(),
                None => {
                    st.log_line = Some(ClientError::MissingCallSid.to_string());
                    return Err(ClientError::MissingCallSid);
                }
            };
            if st.fetching_log {
                return Err(ClientError::Busy);
            }
            st.fetching_log = true;
            st.transcript = TranscriptState::Fetching;
            st.log_line = Some("Fetching log...".to_string());
            (sid, st.generation)
        };

        let _in_flight = InFlight::new(&self.state, move |st: &mut CallInner| {
            st.fetching_log = false;
            if st.generation == generation && st.transcript == TranscriptState::Fetching {
                st.transcript = TranscriptState::FetchFailed("interrupted".into());
                st.log_line = Some("Error: interrupted".into());
            }
        });

        let outcome = self.backend.conversation_history(&sid).await;

        let mut st = lock(&self.state);
        if st.generation != generation {
            log::debug!("ignoring transcript for {}: a newer call replaced it", sid);
            return Err(ClientError::Superseded);
        }
        match outcome {
            Ok(text) => {
                let text = text.filter(|t| !is_blank(t)).unwrap_or_else(|| NO_LOG.to_string());
                st.transcript = TranscriptState::Available(text.clone());
                st.log_line = Some(text.clone());
                Ok(text)
            }
            Err(e) => {
                let detail = e.detail();
                log::warn!("transcript fetch for {} failed: {}", sid, detail);
                st.transcript = TranscriptState::FetchFailed(detail.clone());
                st.log_line = Some(format!("Error: {}", detail));
                Err(e)
            }
        }
    }
}
