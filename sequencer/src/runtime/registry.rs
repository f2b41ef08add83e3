//! Data Model Registry: the closed set of runtime elements for each revision.
//!
//! Element keys are matched by shape. Numeric array indices in a key are
//! replaced by `n` (`cmi.objectives.3.score.raw` → `cmi.objectives.n.score.raw`)
//! and the result is looked up in the revision's table. `_children` and
//! `_count` keywords are table entries too; their values are computed by the
//! session service rather than stored.

use std::sync::LazyLock;

use regex::Regex;

use crate::runtime::duration::{
    is_scorm12_time_of_day, is_timestamp, parse_iso8601_duration, parse_scorm12_time,
};
use crate::runtime::errors::RuntimeError;
use crate::runtime::session::Revision;

static LANGUAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]{1,8}(-[A-Za-z0-9]{1,8})*)?$").unwrap());

static NAV_REQUEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(continue|previous|exit|exitAll|abandon|abandonAll|suspendAll|_none_|\{target=[^\s{}]+\}(choice|jump))$",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    Text { max: usize },
    /// Non-empty, whitespace-free identifier.
    Identifier { max: usize },
    Real { min: Option<f64>, max: Option<f64> },
    Integer { min: i64, max: i64 },
    /// Revision 1.2 score: blank, or a decimal in `[0, 100]`.
    Score12,
    Vocabulary(&'static [&'static str]),
    /// A vocabulary token or a real number.
    VocabularyOrReal(&'static [&'static str]),
    /// Revision 2004 `time (second,10,0)` timestamp.
    Timestamp,
    /// Revision 2004 ISO-8601 duration.
    TimeInterval,
    /// Revision 1.2 `HHHH:MM:SS.SS` timespan.
    Timespan,
    /// Revision 1.2 `HH:MM:SS` time of day.
    TimeOfDay,
    Language,
    NavRequest,
    /// `_children` keyword with its comma-separated child list.
    Children(&'static str),
    /// `_count` keyword of an array.
    Count,
}

impl ValueKind {
    /// Check `value` against this kind's format, vocabulary and bounds.
    pub fn validate(&self, value: &str) -> Result<(), RuntimeError> {
        match *self {
            Self::Text { max } => check_len(value, max),
            Self::Identifier { max } => {
                if value.is_empty() || value.chars().any(char::is_whitespace) {
                    return Err(RuntimeError::TypeMismatch);
                }
                check_len(value, max)
            }
            Self::Real { min, max } => {
                let number = parse_real(value)?;
                if min.is_some_and(|min| number < min) || max.is_some_and(|max| number > max) {
                    return Err(RuntimeError::ValueOutOfRange);
                }
                Ok(())
            }
            Self::Integer { min, max } => {
                let number: i64 = value.trim().parse().map_err(|_| RuntimeError::TypeMismatch)?;
                if !(min..=max).contains(&number) {
                    return Err(RuntimeError::ValueOutOfRange);
                }
                Ok(())
            }
            Self::Score12 => {
                if value.is_empty() {
                    return Ok(());
                }
                Self::Real {
                    min: Some(0.0),
                    max: Some(100.0),
                }
                .validate(value)
            }
            Self::Vocabulary(words) => matches(words.contains(&value)),
            Self::VocabularyOrReal(words) => matches(words.contains(&value) || parse_real(value).is_ok()),
            Self::Timestamp => matches(is_timestamp(value)),
            Self::TimeInterval => matches(parse_iso8601_duration(value).is_ok()),
            Self::Timespan => matches(parse_scorm12_time(value).is_ok()),
            Self::TimeOfDay => matches(is_scorm12_time_of_day(value)),
            Self::Language => matches(LANGUAGE_RE.is_match(value)),
            Self::NavRequest => matches(NAV_REQUEST_RE.is_match(value)),
            Self::Children(_) | Self::Count => Err(RuntimeError::KeywordSet),
        }
    }
}

fn matches(ok: bool) -> Result<(), RuntimeError> {
    if ok { Ok(()) } else { Err(RuntimeError::TypeMismatch) }
}

fn check_len(value: &str, max: usize) -> Result<(), RuntimeError> {
    if value.chars().count() > max {
        Err(RuntimeError::ValueOutOfRange)
    } else {
        Ok(())
    }
}

fn parse_real(value: &str) -> Result<f64, RuntimeError> {
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err(RuntimeError::TypeMismatch),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    /// Key shape, with `n` standing for any array index.
    pub pattern: &'static str,
    pub access: Access,
    pub kind: ValueKind,
    pub default: Option<&'static str>,
}

impl Element {
    const fn new(pattern: &'static str, access: Access, kind: ValueKind) -> Self {
        Self {
            pattern,
            access,
            kind,
            default: None,
        }
    }

    const fn default_value(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    pub fn readable(&self) -> bool {
        self.access != Access::WriteOnly
    }

    pub fn writable(&self) -> bool {
        self.access != Access::ReadOnly
    }

    /// Keywords and fixed values whose content is computed, never stored.
    pub fn is_keyword(&self) -> bool {
        matches!(self.kind, ValueKind::Children(_) | ValueKind::Count) || self.pattern == "cmi._version"
    }
}

const RO: Access = Access::ReadOnly;
const WO: Access = Access::WriteOnly;
const RW: Access = Access::ReadWrite;

const fn text(max: usize) -> ValueKind {
    ValueKind::Text { max }
}

const fn id(max: usize) -> ValueKind {
    ValueKind::Identifier { max }
}

const fn real(min: Option<f64>, max: Option<f64>) -> ValueKind {
    ValueKind::Real { min, max }
}

const ANY_REAL: ValueKind = real(None, None);
const UNIT_REAL: ValueKind = real(Some(0.0), Some(1.0));
const SCALED_REAL: ValueKind = real(Some(-1.0), Some(1.0));

const CREDIT: &[&str] = &["credit", "no-credit"];
const ENTRY: &[&str] = &["ab-initio", "resume", ""];
const MODE: &[&str] = &["browse", "normal", "review"];

const LESSON_STATUS: &[&str] = &[
    "passed",
    "completed",
    "failed",
    "incomplete",
    "browsed",
    "not attempted",
];
const EXIT_12: &[&str] = &["time-out", "suspend", "logout", ""];
const INTERACTION_TYPE_12: &[&str] = &[
    "true-false",
    "choice",
    "fill-in",
    "matching",
    "performance",
    "sequencing",
    "likert",
    "numeric",
];
const RESULT_12: &[&str] = &["correct", "wrong", "unanticipated", "neutral"];

const COMPLETION_STATUS: &[&str] = &["completed", "incomplete", "not attempted", "unknown"];
const SUCCESS_STATUS: &[&str] = &["passed", "failed", "unknown"];
const EXIT_2004: &[&str] = &["time-out", "suspend", "logout", "normal", ""];
const TIME_LIMIT_ACTION: &[&str] = &[
    "exit,message",
    "continue,message",
    "exit,no message",
    "continue,no message",
];
const AUDIO_CAPTIONING: &[&str] = &["-1", "0", "1"];
const INTERACTION_TYPE_2004: &[&str] = &[
    "true-false",
    "choice",
    "fill-in",
    "long-fill-in",
    "matching",
    "performance",
    "sequencing",
    "likert",
    "numeric",
    "other",
];
const RESULT_2004: &[&str] = &["correct", "incorrect", "unanticipated", "neutral"];

static SCORM12_ELEMENTS: &[Element] = &[
    Element::new("cmi._version", RO, text(10)).default_value("3.4"),
    Element::new(
        "cmi.core._children",
        RO,
        ValueKind::Children(
            "student_id,student_name,lesson_location,credit,lesson_status,entry,score,total_time,lesson_mode,exit,session_time",
        ),
    ),
    Element::new("cmi.core.student_id", RO, id(255)),
    Element::new("cmi.core.student_name", RO, text(255)),
    Element::new("cmi.core.lesson_location", RW, text(255)).default_value(""),
    Element::new("cmi.core.credit", RO, ValueKind::Vocabulary(CREDIT)).default_value("credit"),
    Element::new("cmi.core.lesson_status", RW, ValueKind::Vocabulary(LESSON_STATUS))
        .default_value("not attempted"),
    Element::new("cmi.core.entry", RO, ValueKind::Vocabulary(ENTRY)).default_value("ab-initio"),
    Element::new("cmi.core.score._children", RO, ValueKind::Children("raw,min,max")),
    Element::new("cmi.core.score.raw", RW, ValueKind::Score12).default_value(""),
    Element::new("cmi.core.score.min", RW, ValueKind::Score12).default_value(""),
    Element::new("cmi.core.score.max", RW, ValueKind::Score12).default_value(""),
    Element::new("cmi.core.total_time", RO, ValueKind::Timespan).default_value("0000:00:00.00"),
    Element::new("cmi.core.lesson_mode", RO, ValueKind::Vocabulary(MODE)).default_value("normal"),
    Element::new("cmi.core.exit", WO, ValueKind::Vocabulary(EXIT_12)).default_value(""),
    Element::new("cmi.core.session_time", WO, ValueKind::Timespan),
    Element::new("cmi.suspend_data", RW, text(4096)).default_value(""),
    Element::new("cmi.launch_data", RO, text(4096)).default_value(""),
    Element::new("cmi.comments", RW, text(4096)).default_value(""),
    Element::new("cmi.comments_from_lms", RO, text(4096)).default_value(""),
    Element::new("cmi.objectives._children", RO, ValueKind::Children("id,score,status")),
    Element::new("cmi.objectives._count", RO, ValueKind::Count),
    Element::new("cmi.objectives.n.id", RW, id(255)),
    Element::new("cmi.objectives.n.score._children", RO, ValueKind::Children("raw,min,max")),
    Element::new("cmi.objectives.n.score.raw", RW, ValueKind::Score12),
    Element::new("cmi.objectives.n.score.min", RW, ValueKind::Score12),
    Element::new("cmi.objectives.n.score.max", RW, ValueKind::Score12),
    Element::new("cmi.objectives.n.status", RW, ValueKind::Vocabulary(LESSON_STATUS)),
    Element::new(
        "cmi.student_data._children",
        RO,
        ValueKind::Children("mastery_score,max_time_allowed,time_limit_action"),
    ),
    Element::new("cmi.student_data.mastery_score", RO, ValueKind::Score12).default_value(""),
    Element::new("cmi.student_data.max_time_allowed", RO, ValueKind::Timespan).default_value(""),
    Element::new("cmi.student_data.time_limit_action", RO, ValueKind::Vocabulary(TIME_LIMIT_ACTION))
        .default_value(""),
    Element::new(
        "cmi.student_preference._children",
        RO,
        ValueKind::Children("audio,language,speed,text"),
    ),
    Element::new("cmi.student_preference.audio", RW, ValueKind::Integer { min: -1, max: 100 })
        .default_value("0"),
    Element::new("cmi.student_preference.language", RW, text(255)).default_value(""),
    Element::new("cmi.student_preference.speed", RW, ValueKind::Integer { min: -100, max: 100 })
        .default_value("0"),
    Element::new("cmi.student_preference.text", RW, ValueKind::Integer { min: -1, max: 1 })
        .default_value("0"),
    Element::new(
        "cmi.interactions._children",
        RO,
        ValueKind::Children(
            "id,objectives,time,type,correct_responses,weighting,student_response,result,latency",
        ),
    ),
    Element::new("cmi.interactions._count", RO, ValueKind::Count),
    Element::new("cmi.interactions.n.id", WO, id(255)),
    Element::new("cmi.interactions.n.objectives._count", RO, ValueKind::Count),
    Element::new("cmi.interactions.n.objectives.n.id", WO, id(255)),
    Element::new("cmi.interactions.n.time", WO, ValueKind::TimeOfDay),
    Element::new("cmi.interactions.n.type", WO, ValueKind::Vocabulary(INTERACTION_TYPE_12)),
    Element::new("cmi.interactions.n.correct_responses._count", RO, ValueKind::Count),
    Element::new("cmi.interactions.n.correct_responses.n.pattern", WO, text(255)),
    Element::new("cmi.interactions.n.weighting", WO, ANY_REAL),
    Element::new("cmi.interactions.n.student_response", WO, text(255)),
    Element::new("cmi.interactions.n.result", WO, ValueKind::VocabularyOrReal(RESULT_12)),
    Element::new("cmi.interactions.n.latency", WO, ValueKind::Timespan),
];

static SCORM2004_ELEMENTS: &[Element] = &[
    Element::new("cmi._version", RO, text(10)).default_value("1.0"),
    Element::new(
        "cmi.comments_from_learner._children",
        RO,
        ValueKind::Children("comment,location,timestamp"),
    ),
    Element::new("cmi.comments_from_learner._count", RO, ValueKind::Count),
    Element::new("cmi.comments_from_learner.n.comment", RW, text(4000)),
    Element::new("cmi.comments_from_learner.n.location", RW, text(250)),
    Element::new("cmi.comments_from_learner.n.timestamp", RW, ValueKind::Timestamp),
    Element::new(
        "cmi.comments_from_lms._children",
        RO,
        ValueKind::Children("comment,location,timestamp"),
    ),
    Element::new("cmi.comments_from_lms._count", RO, ValueKind::Count),
    Element::new("cmi.comments_from_lms.n.comment", RO, text(4000)),
    Element::new("cmi.comments_from_lms.n.location", RO, text(250)),
    Element::new("cmi.comments_from_lms.n.timestamp", RO, ValueKind::Timestamp),
    Element::new("cmi.completion_status", RW, ValueKind::Vocabulary(COMPLETION_STATUS))
        .default_value("unknown"),
    Element::new("cmi.completion_threshold", RO, UNIT_REAL),
    Element::new("cmi.credit", RO, ValueKind::Vocabulary(CREDIT)).default_value("credit"),
    Element::new("cmi.entry", RO, ValueKind::Vocabulary(ENTRY)).default_value("ab-initio"),
    Element::new("cmi.exit", WO, ValueKind::Vocabulary(EXIT_2004)).default_value(""),
    Element::new(
        "cmi.interactions._children",
        RO,
        ValueKind::Children(
            "id,type,objectives,timestamp,correct_responses,weighting,learner_response,result,latency,description",
        ),
    ),
    Element::new("cmi.interactions._count", RO, ValueKind::Count),
    Element::new("cmi.interactions.n.id", RW, id(4000)),
    Element::new("cmi.interactions.n.type", RW, ValueKind::Vocabulary(INTERACTION_TYPE_2004)),
    Element::new("cmi.interactions.n.objectives._count", RO, ValueKind::Count),
    Element::new("cmi.interactions.n.objectives.n.id", RW, id(4000)),
    Element::new("cmi.interactions.n.timestamp", RW, ValueKind::Timestamp),
    Element::new("cmi.interactions.n.correct_responses._count", RO, ValueKind::Count),
    Element::new("cmi.interactions.n.correct_responses.n.pattern", RW, text(4000)),
    Element::new("cmi.interactions.n.weighting", RW, ANY_REAL),
    Element::new("cmi.interactions.n.learner_response", RW, text(4000)),
    Element::new("cmi.interactions.n.result", RW, ValueKind::VocabularyOrReal(RESULT_2004)),
    Element::new("cmi.interactions.n.latency", RW, ValueKind::TimeInterval),
    Element::new("cmi.interactions.n.description", RW, text(250)),
    Element::new("cmi.launch_data", RO, text(4000)).default_value(""),
    Element::new("cmi.learner_id", RO, id(4000)),
    Element::new("cmi.learner_name", RO, text(250)),
    Element::new(
        "cmi.learner_preference._children",
        RO,
        ValueKind::Children("audio_level,language,delivery_speed,audio_captioning"),
    ),
    Element::new("cmi.learner_preference.audio_level", RW, real(Some(0.0), None)).default_value("1"),
    Element::new("cmi.learner_preference.language", RW, ValueKind::Language).default_value(""),
    Element::new("cmi.learner_preference.delivery_speed", RW, real(Some(0.0), None))
        .default_value("1"),
    Element::new(
        "cmi.learner_preference.audio_captioning",
        RW,
        ValueKind::Vocabulary(AUDIO_CAPTIONING),
    )
    .default_value("0"),
    Element::new("cmi.location", RW, text(1000)),
    Element::new("cmi.max_time_allowed", RO, ValueKind::TimeInterval),
    Element::new("cmi.mode", RO, ValueKind::Vocabulary(MODE)).default_value("normal"),
    Element::new(
        "cmi.objectives._children",
        RO,
        ValueKind::Children("id,score,success_status,completion_status,progress_measure,description"),
    ),
    Element::new("cmi.objectives._count", RO, ValueKind::Count),
    Element::new("cmi.objectives.n.id", RW, id(4000)),
    Element::new(
        "cmi.objectives.n.score._children",
        RO,
        ValueKind::Children("scaled,raw,min,max"),
    ),
    Element::new("cmi.objectives.n.score.scaled", RW, SCALED_REAL),
    Element::new("cmi.objectives.n.score.raw", RW, ANY_REAL),
    Element::new("cmi.objectives.n.score.min", RW, ANY_REAL),
    Element::new("cmi.objectives.n.score.max", RW, ANY_REAL),
    Element::new("cmi.objectives.n.success_status", RW, ValueKind::Vocabulary(SUCCESS_STATUS)),
    Element::new(
        "cmi.objectives.n.completion_status",
        RW,
        ValueKind::Vocabulary(COMPLETION_STATUS),
    ),
    Element::new("cmi.objectives.n.progress_measure", RW, UNIT_REAL),
    Element::new("cmi.objectives.n.description", RW, text(250)),
    Element::new("cmi.progress_measure", RW, UNIT_REAL),
    Element::new("cmi.scaled_passing_score", RO, SCALED_REAL),
    Element::new("cmi.score._children", RO, ValueKind::Children("scaled,raw,min,max")),
    Element::new("cmi.score.scaled", RW, SCALED_REAL),
    Element::new("cmi.score.raw", RW, ANY_REAL),
    Element::new("cmi.score.min", RW, ANY_REAL),
    Element::new("cmi.score.max", RW, ANY_REAL),
    Element::new("cmi.session_time", WO, ValueKind::TimeInterval),
    Element::new("cmi.success_status", RW, ValueKind::Vocabulary(SUCCESS_STATUS))
        .default_value("unknown"),
    Element::new("cmi.suspend_data", RW, text(64000)),
    Element::new("cmi.time_limit_action", RO, ValueKind::Vocabulary(TIME_LIMIT_ACTION))
        .default_value("continue,no message"),
    Element::new("cmi.total_time", RO, ValueKind::TimeInterval).default_value("PT0H0M0S"),
    Element::new("adl.nav.request", RW, ValueKind::NavRequest).default_value("_none_"),
];

/// Every element of `revision`'s data model.
pub fn elements(revision: Revision) -> &'static [Element] {
    match revision {
        Revision::Scorm12 => SCORM12_ELEMENTS,
        Revision::Scorm2004 => SCORM2004_ELEMENTS,
    }
}

/// Key shape of `key`: every all-digit segment becomes `n`.
pub fn key_pattern(key: &str) -> String {
    key.split('.')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "n"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

pub fn lookup(revision: Revision, key: &str) -> Option<&'static Element> {
    let pattern = key_pattern(key);
    elements(revision).iter().find(|element| element.pattern == pattern)
}

/// True when `pattern` (already in key-shape form) names an element or a
/// parent of elements, e.g. `cmi.core` or `cmi.objectives.n.score`.
pub fn is_known_prefix(revision: Revision, pattern: &str) -> bool {
    let dotted = format!("{pattern}.");
    elements(revision)
        .iter()
        .any(|element| element.pattern == pattern || element.pattern.starts_with(&dotted))
}

/// True when `array` (key-shape form, e.g. `cmi.interactions.n.objectives`)
/// is an array whose new entries must start with an `id`.
pub fn array_requires_id(revision: Revision, array: &str) -> bool {
    let id_pattern = format!("{array}.n.id");
    elements(revision).iter().any(|element| element.pattern == id_pattern)
}

/// Elements with a default value and no array index; these seed every new session.
pub fn defaults(revision: Revision) -> impl Iterator<Item = (&'static str, &'static str)> {
    elements(revision).iter().filter_map(|element| {
        let default = element.default?;
        (!element.pattern.contains(".n.") && !element.is_keyword()).then_some((element.pattern, default))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_indices_resolve_to_patterns() {
        assert_eq!(
            key_pattern("cmi.interactions.12.objectives.0.id"),
            "cmi.interactions.n.objectives.n.id"
        );
        let element = lookup(Revision::Scorm2004, "cmi.objectives.3.score.scaled").expect("element");
        assert_eq!(element.kind, SCALED_REAL);
        assert!(lookup(Revision::Scorm2004, "cmi.core.lesson_status").is_none());
        assert!(lookup(Revision::Scorm12, "cmi.core.lesson_status").is_some());
    }

    #[test]
    fn real_bounds_distinguish_type_and_range() {
        assert_eq!(SCALED_REAL.validate("abc"), Err(RuntimeError::TypeMismatch));
        assert_eq!(SCALED_REAL.validate("1.5"), Err(RuntimeError::ValueOutOfRange));
        assert_eq!(SCALED_REAL.validate("-0.25"), Ok(()));
    }

    #[test]
    fn scorm12_score_accepts_blank() {
        assert_eq!(ValueKind::Score12.validate(""), Ok(()));
        assert_eq!(ValueKind::Score12.validate("101"), Err(RuntimeError::ValueOutOfRange));
    }

    #[test]
    fn nav_request_vocabulary() {
        for ok in ["continue", "_none_", "{target=sco-2}choice", "{target=x}jump"] {
            assert_eq!(ValueKind::NavRequest.validate(ok), Ok(()), "{ok}");
        }
        for bad in ["choice", "{target=}choice", "start"] {
            assert!(ValueKind::NavRequest.validate(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn interaction_result_accepts_vocabulary_or_number() {
        let kind = ValueKind::VocabularyOrReal(RESULT_2004);
        assert_eq!(kind.validate("incorrect"), Ok(()));
        assert_eq!(kind.validate("0.75"), Ok(()));
        assert_eq!(kind.validate("wrong"), Err(RuntimeError::TypeMismatch));
    }

    #[test]
    fn defaults_skip_arrays_and_keywords() {
        let seeded: Vec<_> = defaults(Revision::Scorm2004).collect();
        assert!(seeded.contains(&("cmi.completion_status", "unknown")));
        assert!(seeded.contains(&("adl.nav.request", "_none_")));
        assert!(seeded.iter().all(|(key, _)| !key.contains("_count") && *key != "cmi._version"));
    }

    #[test]
    fn arrays_requiring_ids() {
        assert!(array_requires_id(Revision::Scorm2004, "cmi.objectives"));
        assert!(array_requires_id(Revision::Scorm12, "cmi.interactions.n.objectives"));
        assert!(!array_requires_id(Revision::Scorm2004, "cmi.comments_from_learner"));
        assert!(!array_requires_id(
            Revision::Scorm2004,
            "cmi.interactions.n.correct_responses"
        ));
    }

    #[test]
    fn known_prefixes_cover_parent_groups() {
        assert!(is_known_prefix(Revision::Scorm12, "cmi.core"));
        assert!(is_known_prefix(Revision::Scorm2004, "cmi.objectives.n.score"));
        assert!(!is_known_prefix(Revision::Scorm2004, "cmi.bogus"));
    }
}
