//! Runtime Session Service: the in-memory authority over per-attempt data
//! models.
//!
//! Every call returns a [`RuntimeResult`] and records it as the session's
//! last error. Sessions move `created → initialized → terminated`; reads and
//! writes are legal only while initialized.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, info, instrument, warn};

use crate::runtime::duration::{add_iso8601_durations, add_scorm12_times};
use crate::runtime::errors::{NO_ERROR, RuntimeError};
use crate::runtime::registry::{self, Element, ValueKind, key_pattern};
use crate::runtime::session::{CreateSessionParams, Fault, Revision, RuntimeResult, RuntimeSession, SessionState};

/// Values applied to new sessions whose parameters leave them unset.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDefaults {
    pub revision: Revision,
    pub credit: String,
    pub mode: String,
    pub completion_threshold: Option<f64>,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            revision: Revision::default(),
            credit: "credit".to_string(),
            mode: "normal".to_string(),
            completion_threshold: None,
        }
    }
}

impl SessionDefaults {
    /// Empty parameters for the default revision.
    pub fn params(&self) -> CreateSessionParams {
        CreateSessionParams {
            revision: self.revision,
            ..CreateSessionParams::default()
        }
    }
}

/// Element keys whose names differ between revisions.
struct Keys {
    learner_id: &'static str,
    learner_name: &'static str,
    credit: &'static str,
    mode: &'static str,
    entry: &'static str,
    exit: &'static str,
    session_time: &'static str,
    total_time: &'static str,
    location: &'static str,
    suspend_data: &'static str,
    launch_data: &'static str,
    max_time_allowed: &'static str,
}

const SCORM12_KEYS: Keys = Keys {
    learner_id: "cmi.core.student_id",
    learner_name: "cmi.core.student_name",
    credit: "cmi.core.credit",
    mode: "cmi.core.lesson_mode",
    entry: "cmi.core.entry",
    exit: "cmi.core.exit",
    session_time: "cmi.core.session_time",
    total_time: "cmi.core.total_time",
    location: "cmi.core.lesson_location",
    suspend_data: "cmi.suspend_data",
    launch_data: "cmi.launch_data",
    max_time_allowed: "cmi.student_data.max_time_allowed",
};

const SCORM2004_KEYS: Keys = Keys {
    learner_id: "cmi.learner_id",
    learner_name: "cmi.learner_name",
    credit: "cmi.credit",
    mode: "cmi.mode",
    entry: "cmi.entry",
    exit: "cmi.exit",
    session_time: "cmi.session_time",
    total_time: "cmi.total_time",
    location: "cmi.location",
    suspend_data: "cmi.suspend_data",
    launch_data: "cmi.launch_data",
    max_time_allowed: "cmi.max_time_allowed",
};

fn keys(revision: Revision) -> &'static Keys {
    match revision {
        Revision::Scorm12 => &SCORM12_KEYS,
        Revision::Scorm2004 => &SCORM2004_KEYS,
    }
}

const NAV_REQUEST_KEY: &str = "adl.nav.request";

#[derive(Debug, Default)]
pub struct RuntimeSessionService {
    sessions: HashMap<String, RuntimeSession>,
    defaults: SessionDefaults,
}

impl RuntimeSessionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: SessionDefaults) -> Self {
        Self {
            sessions: HashMap::new(),
            defaults,
        }
    }

    pub fn defaults(&self) -> &SessionDefaults {
        &self.defaults
    }

    pub fn session(&self, session_id: &str) -> Option<&RuntimeSession> {
        self.sessions.get(session_id)
    }

    /// Drop a session, handing it back for persistence.
    pub fn remove_session(&mut self, session_id: &str) -> Option<RuntimeSession> {
        self.sessions.remove(session_id)
    }

    /// Allocate a session seeded with the revision's defaults, the learner
    /// identity, and any data saved by an earlier session.
    #[instrument(skip_all, fields(sco_id = %params.sco_id, revision = %params.revision))]
    pub fn create_session(&mut self, params: CreateSessionParams) -> &RuntimeSession {
        let data_model = seed_data_model(&params, &self.defaults);
        let session = RuntimeSession::new(&params, data_model);
        info!(
            session_id = %session.id,
            resumed = params.previous_data.is_some(),
            "created runtime session"
        );
        let id = session.id.clone();
        self.sessions.entry(id).or_insert(session)
    }

    pub fn initialize(&mut self, session_id: &str) -> RuntimeResult {
        self.with_session(session_id, |session| match session.state {
            SessionState::Created => {
                session.state = SessionState::Initialized;
                info!(session_id = %session.id, "runtime session initialized");
                Ok(None)
            }
            // Revision 1.2 treats a repeated initialize as a no-op.
            SessionState::Initialized => match session.revision {
                Revision::Scorm12 => Ok(None),
                Revision::Scorm2004 => Err(RuntimeError::AlreadyInitialized.into()),
            },
            SessionState::Terminated => Err(RuntimeError::ContentInstanceTerminated.into()),
        })
    }

    /// Close the session: fold session time into total time and, on a
    /// `logout` exit, discard resumable state.
    pub fn terminate(&mut self, session_id: &str) -> RuntimeResult {
        self.with_session(session_id, |session| match session.state {
            SessionState::Created => Err(RuntimeError::TerminationBeforeInit.into()),
            SessionState::Terminated => Err(RuntimeError::TerminationAfterTermination.into()),
            SessionState::Initialized => {
                accumulate_session_time(session)?;
                let keys = keys(session.revision);
                let exit = session.data_model.get(keys.exit).cloned().unwrap_or_default();
                if exit == "logout" {
                    reset_element(session, keys.suspend_data);
                    reset_element(session, keys.location);
                }
                session.state = SessionState::Terminated;
                info!(
                    session_id = %session.id,
                    exit = %exit,
                    total_time = ?session.data_model.get(keys.total_time),
                    "runtime session terminated"
                );
                Ok(None)
            }
        })
    }

    pub fn get_value(&mut self, session_id: &str, key: &str) -> RuntimeResult {
        self.with_session(session_id, |session| read_element(session, key).map(Some))
    }

    pub fn set_value(&mut self, session_id: &str, key: &str, value: &str) -> RuntimeResult {
        self.with_session(session_id, |session| {
            write_element(session, key, value)?;
            debug!(session_id = %session.id, key, value, "set data model element");
            Ok(None)
        })
    }

    /// Validate that the session may be committed. Persisting the data model
    /// is the caller's job; see [`get_modified_data`](Self::get_modified_data).
    pub fn commit(&mut self, session_id: &str) -> RuntimeResult {
        self.with_session(session_id, |session| match session.state {
            SessionState::Created => Err(RuntimeError::CommitBeforeInit.into()),
            SessionState::Terminated => Err(RuntimeError::CommitAfterTermination.into()),
            SessionState::Initialized => {
                info!(session_id = %session.id, "runtime session committed");
                Ok(None)
            }
        })
    }

    pub fn get_last_error(&self, session_id: &str) -> String {
        self.sessions
            .get(session_id)
            .map_or_else(|| NO_ERROR.to_string(), |session| session.last_error.clone())
    }

    pub fn get_error_string(&self, session_id: &str) -> String {
        match self.sessions.get(session_id) {
            Some(session) => session.last_error_string.clone(),
            None => "No Error".to_string(),
        }
    }

    pub fn get_diagnostic(&self, session_id: &str) -> String {
        self.sessions
            .get(session_id)
            .map(|session| session.last_diagnostic.clone())
            .unwrap_or_default()
    }

    /// Elements whose value differs from the data model at creation.
    pub fn get_modified_data(&self, session_id: &str) -> BTreeMap<String, String> {
        let Some(session) = self.sessions.get(session_id) else {
            return BTreeMap::new();
        };
        session
            .data_model
            .iter()
            .filter(|(key, value)| session.original_data_model.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn with_session(
        &mut self,
        session_id: &str,
        op: impl FnOnce(&mut RuntimeSession) -> Result<Option<String>, Fault>,
    ) -> RuntimeResult {
        let Some(session) = self.sessions.get_mut(session_id) else {
            warn!(session_id, "unknown runtime session");
            return RuntimeResult::unknown_session(session_id);
        };
        let outcome = op(session);
        if let Err(fault) = &outcome {
            debug!(session_id, kind = ?fault.kind, detail = ?fault.detail, "runtime call failed");
        }
        session.record(outcome)
    }
}

fn seed_data_model(params: &CreateSessionParams, defaults: &SessionDefaults) -> BTreeMap<String, String> {
    let revision = params.revision;
    let keys = keys(revision);
    let mut model: BTreeMap<String, String> = registry::defaults(revision)
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    let mut set = |key: &str, value: String| {
        model.insert(key.to_string(), value);
    };
    set(keys.learner_id, params.learner_id.clone());
    set(keys.learner_name, params.learner_name.clone());
    set(keys.credit, params.credit.clone().unwrap_or_else(|| defaults.credit.clone()));
    set(keys.mode, params.mode.clone().unwrap_or_else(|| defaults.mode.clone()));
    if let Some(entry) = &params.entry {
        set(keys.entry, entry.clone());
    }
    if let Some(launch_data) = &params.launch_data {
        set(keys.launch_data, launch_data.clone());
    }
    if let Some(max_time_allowed) = &params.max_time_allowed {
        set(keys.max_time_allowed, max_time_allowed.clone());
    }
    match revision {
        Revision::Scorm12 => {
            if let Some(mastery_score) = params.mastery_score {
                set("cmi.student_data.mastery_score", mastery_score.to_string());
            }
        }
        Revision::Scorm2004 => {
            if let Some(threshold) = params.completion_threshold.or(defaults.completion_threshold) {
                set("cmi.completion_threshold", threshold.to_string());
            }
            if let Some(score) = params.scaled_passing_score {
                set("cmi.scaled_passing_score", score.to_string());
            }
        }
    }

    if let Some(previous) = &params.previous_data {
        // Per-session outputs start fresh on resume; identity comes from the launch.
        let skipped = [
            keys.exit,
            keys.session_time,
            NAV_REQUEST_KEY,
            keys.learner_id,
            keys.learner_name,
        ];
        for (key, value) in previous {
            if !skipped.contains(&key.as_str()) {
                set(key, value.clone());
            }
        }
        set(keys.entry, "resume".to_string());
    }
    model
}

fn accumulate_session_time(session: &mut RuntimeSession) -> Result<(), Fault> {
    let keys = keys(session.revision);
    let Some(session_time) = session.data_model.get(keys.session_time) else {
        return Ok(());
    };
    let total_time = session.data_model.get(keys.total_time).map(String::as_str);
    let sum = match session.revision {
        Revision::Scorm12 => add_scorm12_times(total_time.unwrap_or("0000:00:00.00"), session_time),
        Revision::Scorm2004 => add_iso8601_durations(total_time.unwrap_or("PT0S"), session_time),
    }
    .map_err(|err| Fault::new(RuntimeError::General, err.to_string()))?;
    session.data_model.insert(keys.total_time.to_string(), sum);
    Ok(())
}

/// Put an element back to its registry default, or unset it if it has none.
fn reset_element(session: &mut RuntimeSession, key: &str) {
    match registry::lookup(session.revision, key).and_then(|element| element.default) {
        Some(default) => {
            session.data_model.insert(key.to_string(), default.to_string());
        }
        None => {
            session.data_model.remove(key);
        }
    }
}

fn undefined(key: &str) -> Fault {
    Fault::new(RuntimeError::UndefinedElement, format!("'{key}' is not a data model element"))
}

fn read_element(session: &RuntimeSession, key: &str) -> Result<String, Fault> {
    match session.state {
        SessionState::Created => return Err(RuntimeError::RetrieveBeforeInit.into()),
        SessionState::Terminated => return Err(RuntimeError::RetrieveAfterTermination.into()),
        SessionState::Initialized => {}
    }
    let revision = session.revision;
    if key.is_empty() {
        let kind = match revision {
            Revision::Scorm12 => RuntimeError::InvalidArgument,
            Revision::Scorm2004 => RuntimeError::GeneralGet,
        };
        return Err(Fault::new(kind, "element name is empty"));
    }

    if let Some(parent) = key.strip_suffix("._children") {
        return match registry::lookup(revision, key) {
            Some(Element {
                kind: ValueKind::Children(children),
                ..
            }) => Ok(children.to_string()),
            _ if registry::is_known_prefix(revision, &key_pattern(parent)) => Err(Fault::new(
                RuntimeError::NoChildren,
                format!("'{parent}' does not have children"),
            )),
            _ => Err(undefined(key)),
        };
    }
    if let Some(array) = key.strip_suffix("._count") {
        return match registry::lookup(revision, key) {
            Some(element) if element.kind == ValueKind::Count => {
                check_indices_exist(&session.data_model, array)?;
                Ok(array_count(&session.data_model, array).to_string())
            }
            _ if registry::is_known_prefix(revision, &key_pattern(array)) => {
                Err(Fault::new(RuntimeError::NoCount, format!("'{array}' is not an array")))
            }
            _ => Err(undefined(key)),
        };
    }

    let element = registry::lookup(revision, key).ok_or_else(|| undefined(key))?;
    if !element.readable() {
        return Err(Fault::new(RuntimeError::WriteOnly, format!("'{key}' is write only")));
    }
    if let Some(value) = session.data_model.get(key) {
        return Ok(value.clone());
    }
    if element.is_keyword()
        && let Some(default) = element.default
    {
        return Ok(default.to_string());
    }
    check_indices_exist(&session.data_model, key)?;
    match revision {
        Revision::Scorm12 => Ok(String::new()),
        Revision::Scorm2004 => Err(Fault::new(
            RuntimeError::ValueNotInitialized,
            format!("'{key}' has not been set"),
        )),
    }
}

fn write_element(session: &mut RuntimeSession, key: &str, value: &str) -> Result<(), Fault> {
    match session.state {
        SessionState::Created => return Err(RuntimeError::StoreBeforeInit.into()),
        SessionState::Terminated => return Err(RuntimeError::StoreAfterTermination.into()),
        SessionState::Initialized => {}
    }
    let revision = session.revision;
    if key.is_empty() {
        let kind = match revision {
            Revision::Scorm12 => RuntimeError::InvalidArgument,
            Revision::Scorm2004 => RuntimeError::GeneralSet,
        };
        return Err(Fault::new(kind, "element name is empty"));
    }

    let element = registry::lookup(revision, key).ok_or_else(|| undefined(key))?;
    if element.is_keyword() {
        return Err(Fault::new(RuntimeError::KeywordSet, format!("'{key}' is a keyword")));
    }
    if !element.writable() {
        return Err(Fault::new(RuntimeError::ReadOnly, format!("'{key}' is read only")));
    }

    for index in array_indices(key) {
        let count = array_count(&session.data_model, index.array);
        if index.index > count {
            let kind = match revision {
                Revision::Scorm12 => RuntimeError::InvalidArgument,
                Revision::Scorm2004 => RuntimeError::GeneralSet,
            };
            return Err(Fault::new(
                kind,
                format!("'{}' has {count} elements; index {} skips ahead", index.array, index.index),
            ));
        }
        if index.index == count
            && index.rest != "id"
            && registry::array_requires_id(revision, &key_pattern(index.array))
        {
            return Err(Fault::new(
                RuntimeError::DependencyNotEstablished,
                format!("'{}.{}.id' must be set first", index.array, index.index),
            ));
        }
    }

    element
        .kind
        .validate(value)
        .map_err(|kind| Fault::new(kind, format!("'{value}' is not a valid value for '{key}'")))?;
    if revision == Revision::Scorm12 && key == "cmi.core.lesson_status" && value == "not attempted" {
        return Err(Fault::new(
            RuntimeError::TypeMismatch,
            "content may not set lesson_status to 'not attempted'",
        ));
    }

    session.data_model.insert(key.to_string(), value.to_string());
    apply_derived_status(session, key, value);
    Ok(())
}

/// Status elements recomputed from a newly written score or progress value.
fn apply_derived_status(session: &mut RuntimeSession, key: &str, value: &str) {
    let Ok(number) = value.trim().parse::<f64>() else {
        return;
    };
    let read_real = |session: &RuntimeSession, key: &str| {
        session
            .data_model
            .get(key)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
    };
    let (target, status) = match (session.revision, key) {
        (Revision::Scorm2004, "cmi.score.scaled") => {
            let Some(threshold) = read_real(session, "cmi.scaled_passing_score") else {
                return;
            };
            let status = if number >= threshold { "passed" } else { "failed" };
            ("cmi.success_status", status)
        }
        (Revision::Scorm2004, "cmi.progress_measure") => {
            let Some(threshold) = read_real(session, "cmi.completion_threshold") else {
                return;
            };
            let status = if number >= threshold { "completed" } else { "incomplete" };
            ("cmi.completion_status", status)
        }
        (Revision::Scorm12, "cmi.core.score.raw") => {
            let credit = session.data_model.get("cmi.core.credit").map(String::as_str);
            let Some(mastery) = read_real(session, "cmi.student_data.mastery_score") else {
                return;
            };
            if credit != Some("credit") {
                return;
            }
            let status = if number >= mastery { "passed" } else { "failed" };
            ("cmi.core.lesson_status", status)
        }
        _ => return,
    };
    debug!(session_id = %session.id, key, target, status, "derived status from score");
    session.data_model.insert(target.to_string(), status.to_string());
}

/// One numeric segment of a key: the array it indexes, the index, and the
/// remainder of the key after it.
#[derive(Debug, PartialEq, Eq)]
struct ArrayIndex<'a> {
    array: &'a str,
    index: usize,
    rest: &'a str,
}

fn array_indices(key: &str) -> Vec<ArrayIndex<'_>> {
    let mut indices = Vec::new();
    let mut start = 0;
    for segment in key.split('.') {
        let end = start + segment.len();
        if start > 0
            && !segment.is_empty()
            && segment.bytes().all(|b| b.is_ascii_digit())
            && let Ok(index) = segment.parse()
        {
            indices.push(ArrayIndex {
                array: &key[..start - 1],
                index,
                rest: key.get(end + 1..).unwrap_or(""),
            });
        }
        start = end + 1;
    }
    indices
}

/// Number of elements stored under the concrete array key `array`.
fn array_count(model: &BTreeMap<String, String>, array: &str) -> usize {
    let prefix = format!("{array}.");
    model
        .keys()
        .filter_map(|key| key.strip_prefix(&prefix))
        .filter_map(|rest| rest.split('.').next())
        .filter(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
        .collect::<BTreeSet<_>>()
        .len()
}

/// Fails when `key` indexes past the end of any array it passes through.
fn check_indices_exist(model: &BTreeMap<String, String>, key: &str) -> Result<(), Fault> {
    for index in array_indices(key) {
        let count = array_count(model, index.array);
        if index.index >= count {
            return Err(Fault::new(
                RuntimeError::GeneralGet,
                format!("'{}' has {count} elements; index {} is out of range", index.array, index.index),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{initialized_session, session_params};

    fn session_2004(service: &mut RuntimeSessionService) -> String {
        let params = CreateSessionParams {
            scaled_passing_score: Some(0.8),
            completion_threshold: Some(0.75),
            ..session_params(Revision::Scorm2004)
        };
        initialized_session(service, params)
    }

    fn assert_code(result: &RuntimeResult, code: &str) {
        assert!(!result.success, "expected failure {code}, got {result:?}");
        assert_eq!(result.error_code, code, "{result:?}");
    }

    /// A scaled score at or above the passing score passes; below fails.
    #[test]
    fn scaled_score_derives_success_status() {
        let mut service = RuntimeSessionService::new();
        let id = session_2004(&mut service);

        assert!(service.set_value(&id, "cmi.score.scaled", "0.9").success);
        assert_eq!(service.get_value(&id, "cmi.success_status").value.as_deref(), Some("passed"));

        assert!(service.set_value(&id, "cmi.score.scaled", "0.5").success);
        assert_eq!(service.get_value(&id, "cmi.success_status").value.as_deref(), Some("failed"));
    }

    #[test]
    fn progress_measure_derives_completion_status() {
        let mut service = RuntimeSessionService::new();
        let id = session_2004(&mut service);

        service.set_value(&id, "cmi.progress_measure", "0.5");
        assert_eq!(
            service.get_value(&id, "cmi.completion_status").value.as_deref(),
            Some("incomplete")
        );
        service.set_value(&id, "cmi.progress_measure", "0.75");
        assert_eq!(
            service.get_value(&id, "cmi.completion_status").value.as_deref(),
            Some("completed")
        );
    }

    #[test]
    fn mastery_score_derives_lesson_status() {
        let mut service = RuntimeSessionService::new();
        let params = CreateSessionParams {
            mastery_score: Some(80.0),
            ..session_params(Revision::Scorm12)
        };
        let id = initialized_session(&mut service, params);

        assert!(service.set_value(&id, "cmi.core.score.raw", "85").success);
        assert_eq!(
            service.get_value(&id, "cmi.core.lesson_status").value.as_deref(),
            Some("passed")
        );
    }

    #[test]
    fn no_credit_sessions_keep_lesson_status() {
        let mut service = RuntimeSessionService::new();
        let params = CreateSessionParams {
            mastery_score: Some(80.0),
            credit: Some("no-credit".to_string()),
            ..session_params(Revision::Scorm12)
        };
        let id = initialized_session(&mut service, params);

        service.set_value(&id, "cmi.core.score.raw", "40");
        assert_eq!(
            service.get_value(&id, "cmi.core.lesson_status").value.as_deref(),
            Some("not attempted")
        );
    }

    /// Reads before initialize fail with each revision's own code.
    #[test]
    fn get_before_initialize_is_rejected() {
        let mut service = RuntimeSessionService::new();
        for (revision, code) in [(Revision::Scorm12, "301"), (Revision::Scorm2004, "122")] {
            let id = service.create_session(session_params(revision)).id.clone();
            let result = service.get_value(&id, "cmi.suspend_data");
            assert_code(&result, code);
            assert_eq!(service.get_last_error(&id), code);
        }
    }

    #[test]
    fn repeated_initialize_differs_by_revision() {
        let mut service = RuntimeSessionService::new();
        let old = initialized_session(&mut service, session_params(Revision::Scorm12));
        assert!(service.initialize(&old).success);

        let new = initialized_session(&mut service, session_params(Revision::Scorm2004));
        assert_code(&service.initialize(&new), "103");

        assert!(service.terminate(&new).success);
        assert_code(&service.initialize(&new), "104");
        assert_code(&service.terminate(&new), "113");
        assert_code(&service.get_value(&new, "cmi.location"), "123");
        assert_code(&service.set_value(&new, "cmi.location", "p1"), "133");
        assert_code(&service.commit(&new), "143");
    }

    #[test]
    fn lifecycle_calls_before_initialize() {
        let mut service = RuntimeSessionService::new();
        let id = service.create_session(session_params(Revision::Scorm2004)).id.clone();
        assert_code(&service.terminate(&id), "112");
        assert_code(&service.set_value(&id, "cmi.location", "p1"), "132");
        assert_code(&service.commit(&id), "142");
        assert!(service.initialize(&id).success);
        assert!(service.commit(&id).success);
    }

    #[test]
    fn terminate_accumulates_session_time() {
        let mut service = RuntimeSessionService::new();
        let id = session_2004(&mut service);
        service.set_value(&id, "cmi.session_time", "PT1H30M");
        assert!(service.terminate(&id).success);
        let session = service.session(&id).expect("session");
        assert_eq!(session.data_model["cmi.total_time"], "PT1H30M");

        let params = CreateSessionParams {
            previous_data: Some(BTreeMap::from([(
                "cmi.core.total_time".to_string(),
                "0000:10:00.00".to_string(),
            )])),
            ..session_params(Revision::Scorm12)
        };
        let id = initialized_session(&mut service, params);
        service.set_value(&id, "cmi.core.session_time", "0000:05:30.00");
        service.terminate(&id);
        let session = service.session(&id).expect("session");
        assert_eq!(session.data_model["cmi.core.total_time"], "0000:15:30.00");
    }

    #[test]
    fn logout_clears_resumable_state() {
        let mut service = RuntimeSessionService::new();
        for (exit, kept) in [("logout", false), ("suspend", true)] {
            let id = session_2004(&mut service);
            service.set_value(&id, "cmi.location", "page-3");
            service.set_value(&id, "cmi.suspend_data", "abc");
            service.set_value(&id, "cmi.exit", exit);
            service.terminate(&id);
            let model = &service.session(&id).expect("session").data_model;
            assert_eq!(model.contains_key("cmi.location"), kept, "{exit}");
            assert_eq!(model.contains_key("cmi.suspend_data"), kept, "{exit}");
        }
    }

    #[test]
    fn access_rules_map_to_revision_codes() {
        let mut service = RuntimeSessionService::new();
        let new = session_2004(&mut service);
        assert_code(&service.set_value(&new, "cmi.learner_id", "x"), "404");
        assert_code(&service.get_value(&new, "cmi.exit"), "405");
        assert_code(&service.get_value(&new, "cmi.bogus"), "401");
        assert_code(&service.set_value(&new, "cmi.objectives._count", "2"), "404");
        assert_code(&service.get_value(&new, "cmi.location"), "403");

        let old = initialized_session(&mut service, session_params(Revision::Scorm12));
        assert_code(&service.set_value(&old, "cmi.core.credit", "no-credit"), "403");
        assert_code(&service.get_value(&old, "cmi.core.exit"), "404");
        assert_code(&service.get_value(&old, "cmi.core.bogus"), "401");
        assert_code(&service.set_value(&old, "cmi.core._children", "x"), "402");
        assert_eq!(service.get_value(&old, "cmi.comments").value.as_deref(), Some(""));
    }

    #[test]
    fn keywords_are_computed() {
        let mut service = RuntimeSessionService::new();
        let id = session_2004(&mut service);
        assert_eq!(
            service.get_value(&id, "cmi.score._children").value.as_deref(),
            Some("scaled,raw,min,max")
        );
        assert_eq!(service.get_value(&id, "cmi.objectives._count").value.as_deref(), Some("0"));
        assert!(service.set_value(&id, "cmi.objectives.0.id", "obj-1").success);
        assert!(service.set_value(&id, "cmi.objectives.0.score.scaled", "0.5").success);
        assert_eq!(service.get_value(&id, "cmi.objectives._count").value.as_deref(), Some("1"));
        assert_eq!(service.get_value(&id, "cmi._version").value.as_deref(), Some("1.0"));
        assert_code(&service.get_value(&id, "cmi.learner_id._children"), "301");

        let old = initialized_session(&mut service, session_params(Revision::Scorm12));
        assert_code(&service.get_value(&old, "cmi.core.student_id._children"), "202");
        assert_code(&service.get_value(&old, "cmi.core._count"), "203");
    }

    /// New array entries are appended at `_count` and begin with their id.
    #[test]
    fn array_entries_are_appended_in_order() {
        let mut service = RuntimeSessionService::new();
        let id = session_2004(&mut service);
        assert_code(&service.set_value(&id, "cmi.objectives.1.id", "obj-2"), "351");
        assert_code(&service.set_value(&id, "cmi.objectives.0.score.scaled", "0.5"), "408");
        assert_code(&service.get_value(&id, "cmi.objectives.0.id"), "301");
        assert!(service.set_value(&id, "cmi.comments_from_learner.0.comment", "hi").success);

        let old = initialized_session(&mut service, session_params(Revision::Scorm12));
        assert_code(&service.set_value(&old, "cmi.objectives.0.status", "passed"), "201");
        assert_code(&service.set_value(&old, "cmi.interactions.3.id", "q1"), "201");
    }

    #[test]
    fn values_are_validated_before_storing() {
        let mut service = RuntimeSessionService::new();
        let id = session_2004(&mut service);
        assert_code(&service.set_value(&id, "cmi.score.scaled", "abc"), "406");
        assert_code(&service.set_value(&id, "cmi.score.scaled", "2"), "407");
        assert_code(&service.set_value(&id, "cmi.completion_status", "done"), "406");
        assert_code(&service.set_value(&id, "adl.nav.request", "sideways"), "406");
        assert!(service.set_value(&id, "adl.nav.request", "{target=a}choice").success);
        assert_code(&service.get_value(&id, "cmi.score.scaled"), "403");

        let old = initialized_session(&mut service, session_params(Revision::Scorm12));
        assert_code(&service.set_value(&old, "cmi.core.lesson_status", "not attempted"), "405");
        assert_code(&service.set_value(&old, "cmi.core.score.raw", "150"), "405");
    }

    /// Resuming overlays saved data, forces `entry` to resume, and starts
    /// the per-session outputs fresh.
    #[test]
    fn resume_overlays_previous_data() {
        let mut service = RuntimeSessionService::new();
        let previous = BTreeMap::from([
            ("cmi.location".to_string(), "page-7".to_string()),
            ("cmi.exit".to_string(), "suspend".to_string()),
        ]);
        let params = CreateSessionParams {
            previous_data: Some(previous),
            ..session_params(Revision::Scorm2004)
        };
        let id = initialized_session(&mut service, params);

        assert_eq!(service.get_value(&id, "cmi.entry").value.as_deref(), Some("resume"));
        assert_eq!(service.get_value(&id, "cmi.location").value.as_deref(), Some("page-7"));
        let model = &service.session(&id).expect("session").data_model;
        assert_eq!(model.get("cmi.exit").map(String::as_str), Some(""));
    }

    /// Saved data from another launch never replaces the learner identity.
    #[test]
    fn resume_keeps_launch_identity_over_saved_data() {
        let mut service = RuntimeSessionService::new();
        for (revision, id_key, name_key) in [
            (Revision::Scorm2004, "cmi.learner_id", "cmi.learner_name"),
            (Revision::Scorm12, "cmi.core.student_id", "cmi.core.student_name"),
        ] {
            let previous = BTreeMap::from([
                (id_key.to_string(), "someone-else".to_string()),
                (name_key.to_string(), "Else, Someone".to_string()),
                ("cmi.suspend_data".to_string(), "saved".to_string()),
            ]);
            let params = CreateSessionParams {
                previous_data: Some(previous),
                ..session_params(revision)
            };
            let id = initialized_session(&mut service, params);

            assert_eq!(service.get_value(&id, id_key).value.as_deref(), Some("learner-1"));
            assert_eq!(service.get_value(&id, name_key).value.as_deref(), Some("Doe, Jane"));
            assert_eq!(service.get_value(&id, "cmi.suspend_data").value.as_deref(), Some("saved"));
        }
    }

    #[test]
    fn modified_data_lists_only_changes() {
        let mut service = RuntimeSessionService::new();
        let id = session_2004(&mut service);
        service.set_value(&id, "cmi.location", "page-2");
        service.set_value(&id, "cmi.completion_status", "unknown");

        let modified = service.get_modified_data(&id);
        assert_eq!(
            modified,
            BTreeMap::from([("cmi.location".to_string(), "page-2".to_string())])
        );
    }

    #[test]
    fn unknown_sessions_report_a_general_error() {
        let mut service = RuntimeSessionService::new();
        let result = service.get_value("sess-missing", "cmi.location");
        assert_code(&result, "101");
        assert!(result.diagnostic.as_deref().is_some_and(|d| d.contains("unknown session")));
        assert_eq!(service.get_last_error("sess-missing"), "0");
        assert_eq!(service.get_error_string("sess-missing"), "No Error");
        assert!(service.get_modified_data("sess-missing").is_empty());
    }

    #[test]
    fn defaults_fill_unset_parameters() {
        let defaults = SessionDefaults {
            mode: "review".to_string(),
            completion_threshold: Some(0.5),
            ..SessionDefaults::default()
        };
        let mut service = RuntimeSessionService::with_defaults(defaults);
        let params = service.defaults().params();
        let id = initialized_session(&mut service, params);
        assert_eq!(service.get_value(&id, "cmi.mode").value.as_deref(), Some("review"));
        assert_eq!(
            service.get_value(&id, "cmi.completion_threshold").value.as_deref(),
            Some("0.5")
        );
    }

    #[test]
    fn array_indices_split_nested_keys() {
        let indices = array_indices("cmi.interactions.2.objectives.0.id");
        assert_eq!(
            indices,
            vec![
                ArrayIndex {
                    array: "cmi.interactions",
                    index: 2,
                    rest: "objectives.0.id"
                },
                ArrayIndex {
                    array: "cmi.interactions.2.objectives",
                    index: 0,
                    rest: "id"
                },
            ]
        );
    }
}
