//! Runtime session records and the result type of every runtime call.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};

use crate::runtime::errors::{NO_ERROR, RuntimeError, error_diagnostic, error_string};

/// Standard revision selecting the data model and error table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Revision {
    #[serde(rename = "1.2")]
    Scorm12,
    #[default]
    #[serde(rename = "2004")]
    Scorm2004,
}

impl Revision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scorm12 => "1.2",
            Self::Scorm2004 => "2004",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "1.2" => Some(Self::Scorm12),
            "2004" => Some(Self::Scorm2004),
            _ => None,
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs for a new runtime session. Optional fields fall back to the
/// service defaults or the registry's element defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateSessionParams {
    pub package_id: String,
    pub learner_id: String,
    pub learner_name: String,
    pub attempt_id: String,
    pub sco_id: String,
    pub revision: Revision,
    /// Data model saved by an earlier session of the same attempt.
    pub previous_data: Option<BTreeMap<String, String>>,
    pub launch_data: Option<String>,
    pub mastery_score: Option<f64>,
    pub max_time_allowed: Option<String>,
    pub credit: Option<String>,
    pub mode: Option<String>,
    pub entry: Option<String>,
    pub completion_threshold: Option<f64>,
    pub scaled_passing_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Created,
    Initialized,
    Terminated,
}

/// One launched attempt of a leaf activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSession {
    pub id: String,
    pub package_id: String,
    pub learner_id: String,
    pub learner_name: String,
    pub attempt_id: String,
    pub sco_id: String,
    pub revision: Revision,
    pub data_model: BTreeMap<String, String>,
    /// Data model as it stood right after creation.
    pub original_data_model: BTreeMap<String, String>,
    pub state: SessionState,
    pub last_error: String,
    pub last_error_string: String,
    pub last_diagnostic: String,
    pub created_at: DateTime<Utc>,
    pub last_access_time: DateTime<Utc>,
}

impl RuntimeSession {
    pub(crate) fn new(params: &CreateSessionParams, data_model: BTreeMap<String, String>) -> Self {
        let now = Utc::now();
        let revision = params.revision;
        Self {
            id: generate_session_id(),
            package_id: params.package_id.clone(),
            learner_id: params.learner_id.clone(),
            learner_name: params.learner_name.clone(),
            attempt_id: params.attempt_id.clone(),
            sco_id: params.sco_id.clone(),
            revision,
            original_data_model: data_model.clone(),
            data_model,
            state: SessionState::Created,
            last_error: NO_ERROR.to_string(),
            last_error_string: error_string(revision, NO_ERROR).unwrap_or_default().to_string(),
            last_diagnostic: String::new(),
            created_at: now,
            last_access_time: now,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state == SessionState::Initialized
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// Store the outcome of a call as the session's last error and turn it
    /// into the caller-facing result.
    pub(crate) fn record(&mut self, outcome: Result<Option<String>, Fault>) -> RuntimeResult {
        self.last_access_time = Utc::now();
        match outcome {
            Ok(value) => {
                self.last_error = NO_ERROR.to_string();
                self.last_error_string = error_string(self.revision, NO_ERROR).unwrap_or_default().to_string();
                self.last_diagnostic = String::new();
                RuntimeResult::ok(value)
            }
            Err(fault) => {
                let code = fault.kind.code(self.revision);
                let message = error_string(self.revision, code).unwrap_or_default();
                let diagnostic = fault
                    .detail
                    .unwrap_or_else(|| error_diagnostic(self.revision, code).unwrap_or_default().to_string());
                self.last_error = code.to_string();
                self.last_error_string = message.to_string();
                self.last_diagnostic = diagnostic.clone();
                RuntimeResult {
                    success: false,
                    value: None,
                    error_code: code.to_string(),
                    error_string: Some(message.to_string()),
                    diagnostic: Some(diagnostic),
                }
            }
        }
    }
}

/// A failed runtime call: the error kind plus an optional call-specific
/// diagnostic that replaces the table's generic one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fault {
    pub kind: RuntimeError,
    pub detail: Option<String>,
}

impl Fault {
    pub fn new(kind: RuntimeError, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
        }
    }
}

impl From<RuntimeError> for Fault {
    fn from(kind: RuntimeError) -> Self {
        Self { kind, detail: None }
    }
}

/// Result of every runtime call; expected failures never surface as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub error_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl RuntimeResult {
    pub fn ok(value: Option<String>) -> Self {
        Self {
            success: true,
            value,
            error_code: NO_ERROR.to_string(),
            error_string: None,
            diagnostic: None,
        }
    }

    /// The call named a session id the service does not hold.
    pub fn unknown_session(session_id: &str) -> Self {
        Self {
            success: false,
            value: None,
            error_code: "101".to_string(),
            error_string: Some("General Exception".to_string()),
            diagnostic: Some(format!("unknown session '{session_id}'")),
        }
    }
}

fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(12)
        .collect::<String>()
        .to_lowercase();
    format!("sess-{suffix}")
}
