//! Translate a runtime session's data model into the results the sequencing
//! engine records against the delivered activity.

use crate::core::types::AttemptReport;
use crate::runtime::duration::{parse_iso8601_duration, parse_scorm12_time};
use crate::runtime::session::{Revision, RuntimeSession};

pub fn attempt_report(session: &RuntimeSession) -> AttemptReport {
    match session.revision {
        Revision::Scorm12 => scorm12_report(session),
        Revision::Scorm2004 => scorm2004_report(session),
    }
}

fn value<'a>(session: &'a RuntimeSession, key: &str) -> Option<&'a str> {
    session
        .data_model
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn real(session: &RuntimeSession, key: &str) -> Option<f64> {
    value(session, key).and_then(|raw| raw.trim().parse::<f64>().ok())
}

fn scorm12_report(session: &RuntimeSession) -> AttemptReport {
    let (completed, satisfied) = match value(session, "cmi.core.lesson_status") {
        Some("passed") => (Some(true), Some(true)),
        Some("failed") => (Some(true), Some(false)),
        Some("completed") => (Some(true), None),
        Some("incomplete") => (Some(false), None),
        _ => (None, None),
    };

    // Raw scores are normalized against max (default 100) and min (default 0).
    let scaled_score = real(session, "cmi.core.score.raw").and_then(|raw| {
        let min = real(session, "cmi.core.score.min").unwrap_or(0.0);
        let max = real(session, "cmi.core.score.max").unwrap_or(100.0);
        (max > min).then(|| ((raw - min) / (max - min)).clamp(-1.0, 1.0))
    });

    AttemptReport {
        completed,
        satisfied,
        scaled_score,
        session_seconds: value(session, "cmi.core.session_time").and_then(|raw| parse_scorm12_time(raw).ok()),
    }
}

fn scorm2004_report(session: &RuntimeSession) -> AttemptReport {
    let completed = match value(session, "cmi.completion_status") {
        Some("completed") => Some(true),
        Some("incomplete") => Some(false),
        _ => None,
    };
    let satisfied = match value(session, "cmi.success_status") {
        Some("passed") => Some(true),
        Some("failed") => Some(false),
        _ => None,
    };
    AttemptReport {
        completed,
        satisfied,
        scaled_score: real(session, "cmi.score.scaled"),
        session_seconds: value(session, "cmi.session_time").and_then(|raw| parse_iso8601_duration(raw).ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::service::RuntimeSessionService;
    use crate::test_support::{initialized_session, session_params};

    #[test]
    fn scorm2004_report_reads_status_and_score() {
        let mut service = RuntimeSessionService::new();
        let id = initialized_session(&mut service, session_params(Revision::Scorm2004));
        service.set_value(&id, "cmi.completion_status", "completed");
        service.set_value(&id, "cmi.success_status", "failed");
        service.set_value(&id, "cmi.score.scaled", "0.25");
        service.set_value(&id, "cmi.session_time", "PT2M");

        let report = attempt_report(service.session(&id).expect("session"));
        assert_eq!(
            report,
            AttemptReport {
                completed: Some(true),
                satisfied: Some(false),
                scaled_score: Some(0.25),
                session_seconds: Some(120.0),
            }
        );
    }

    /// Raw 1.2 scores are scaled against the reported range.
    #[test]
    fn scorm12_report_scales_raw_score() {
        let mut service = RuntimeSessionService::new();
        let id = initialized_session(&mut service, session_params(Revision::Scorm12));
        service.set_value(&id, "cmi.core.lesson_status", "passed");
        service.set_value(&id, "cmi.core.score.raw", "40");
        service.set_value(&id, "cmi.core.score.max", "50");

        let report = attempt_report(service.session(&id).expect("session"));
        assert_eq!(report.completed, Some(true));
        assert_eq!(report.satisfied, Some(true));
        assert_eq!(report.scaled_score, Some(0.8));
        assert_eq!(report.session_seconds, None);
    }

    #[test]
    fn untouched_session_reports_nothing() {
        let mut service = RuntimeSessionService::new();
        let id = initialized_session(&mut service, session_params(Revision::Scorm12));
        let report = attempt_report(service.session(&id).expect("session"));
        assert_eq!(report, AttemptReport::default());
    }
}
