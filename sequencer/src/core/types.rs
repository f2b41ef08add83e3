//! Shared request and result types for the sequencing pipeline.
//!
//! These define stable contracts between the engine and its callers. Wire
//! names are camelCase to match the standard's vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::exceptions::SequencingException;

/// Navigation verbs a learner or content can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationVerb {
    Start,
    ResumeAll,
    Continue,
    Previous,
    Choice,
    Jump,
    Exit,
    ExitAll,
    SuspendAll,
    Abandon,
    AbandonAll,
}

impl NavigationVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ResumeAll => "resumeAll",
            Self::Continue => "continue",
            Self::Previous => "previous",
            Self::Choice => "choice",
            Self::Jump => "jump",
            Self::Exit => "exit",
            Self::ExitAll => "exitAll",
            Self::SuspendAll => "suspendAll",
            Self::Abandon => "abandon",
            Self::AbandonAll => "abandonAll",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let verb = match raw {
            "start" => Self::Start,
            "resumeAll" => Self::ResumeAll,
            "continue" => Self::Continue,
            "previous" => Self::Previous,
            "choice" => Self::Choice,
            "jump" => Self::Jump,
            "exit" => Self::Exit,
            "exitAll" => Self::ExitAll,
            "suspendAll" => Self::SuspendAll,
            "abandon" => Self::Abandon,
            "abandonAll" => Self::AbandonAll,
            _ => return None,
        };
        Some(verb)
    }
}

impl fmt::Display for NavigationVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Navigation event raised against the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationRequest {
    pub request: NavigationVerb,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_activity_id: Option<String>,
}

impl NavigationRequest {
    pub fn new(request: NavigationVerb) -> Self {
        Self {
            request,
            target_activity_id: None,
        }
    }

    pub fn choice(target: impl Into<String>) -> Self {
        Self {
            request: NavigationVerb::Choice,
            target_activity_id: Some(target.into()),
        }
    }

    pub fn jump(target: impl Into<String>) -> Self {
        Self {
            request: NavigationVerb::Jump,
            target_activity_id: Some(target.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationRequest {
    Exit,
    ExitParent,
    ExitAll,
    SuspendAll,
    Abandon,
    AbandonAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencingRequest {
    Start,
    ResumeAll,
    Continue,
    Previous,
    Choice(String),
    Jump(String),
    Retry,
    Exit,
}

/// Flow direction through the activity tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Resolved outcome of one navigation request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    /// True when a leaf activity was resolved and its attempt begun.
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_url: Option<String>,
    /// Sequencing exception code, e.g. `NB.2.1-2`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_text: Option<String>,
    /// True when the request ended the sequencing session (exit all, suspend
    /// all, abandon all, or flowing past the last activity).
    #[serde(default)]
    pub end_sequencing_session: bool,
}

impl DeliveryRequest {
    pub fn deliver(activity_id: String, launch_url: Option<String>) -> Self {
        Self {
            valid: true,
            activity_id: Some(activity_id),
            launch_url,
            ..Self::default()
        }
    }

    pub fn exception(exc: SequencingException) -> Self {
        Self {
            exception: Some(exc.code().to_string()),
            exception_text: Some(exc.to_string()),
            ..Self::default()
        }
    }

    pub fn session_ended() -> Self {
        Self {
            end_sequencing_session: true,
            ..Self::default()
        }
    }

    /// No delivery and no error: the learner has to pick the next activity.
    pub fn idle() -> Self {
        Self::default()
    }
}

/// Learner results reported by delivered content when its runtime session ends.
///
/// `None` fields were not reported and leave tracking untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReport {
    pub completed: Option<bool>,
    pub satisfied: Option<bool>,
    /// Scaled score in `[-1, 1]`, used as the primary objective's measure.
    pub scaled_score: Option<f64>,
    pub session_seconds: Option<f64>,
}
