//! Runtime error kinds and the two revision-specific numeric code tables.
//!
//! Codes are a wire contract with content and must not be renumbered.

use crate::runtime::session::Revision;

/// Revision-independent failure kinds raised by the session service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeError {
    General,
    AlreadyInitialized,
    ContentInstanceTerminated,
    TerminationBeforeInit,
    TerminationAfterTermination,
    RetrieveBeforeInit,
    RetrieveAfterTermination,
    StoreBeforeInit,
    StoreAfterTermination,
    CommitBeforeInit,
    CommitAfterTermination,
    InvalidArgument,
    GeneralGet,
    GeneralSet,
    UndefinedElement,
    ValueNotInitialized,
    ReadOnly,
    WriteOnly,
    /// Setting one of the computed `_children`/`_count`/`_version` keywords.
    KeywordSet,
    NoChildren,
    NoCount,
    TypeMismatch,
    ValueOutOfRange,
    DependencyNotEstablished,
}

impl RuntimeError {
    pub fn code(self, revision: Revision) -> &'static str {
        match revision {
            Revision::Scorm12 => self.scorm12_code(),
            Revision::Scorm2004 => self.scorm2004_code(),
        }
    }

    fn scorm12_code(self) -> &'static str {
        match self {
            Self::InvalidArgument | Self::DependencyNotEstablished => "201",
            Self::NoChildren => "202",
            Self::NoCount => "203",
            Self::TerminationBeforeInit
            | Self::RetrieveBeforeInit
            | Self::StoreBeforeInit
            | Self::CommitBeforeInit => "301",
            Self::UndefinedElement => "401",
            Self::KeywordSet => "402",
            Self::ReadOnly => "403",
            Self::WriteOnly => "404",
            Self::TypeMismatch | Self::ValueOutOfRange => "405",
            Self::General
            | Self::AlreadyInitialized
            | Self::ContentInstanceTerminated
            | Self::TerminationAfterTermination
            | Self::RetrieveAfterTermination
            | Self::StoreAfterTermination
            | Self::CommitAfterTermination
            | Self::GeneralGet
            | Self::GeneralSet
            | Self::ValueNotInitialized => "101",
        }
    }

    fn scorm2004_code(self) -> &'static str {
        match self {
            Self::General => "101",
            Self::AlreadyInitialized => "103",
            Self::ContentInstanceTerminated => "104",
            Self::TerminationBeforeInit => "112",
            Self::TerminationAfterTermination => "113",
            Self::RetrieveBeforeInit => "122",
            Self::RetrieveAfterTermination => "123",
            Self::StoreBeforeInit => "132",
            Self::StoreAfterTermination => "133",
            Self::CommitBeforeInit => "142",
            Self::CommitAfterTermination => "143",
            Self::InvalidArgument => "201",
            Self::GeneralGet | Self::NoChildren | Self::NoCount => "301",
            Self::GeneralSet => "351",
            Self::UndefinedElement => "401",
            Self::ValueNotInitialized => "403",
            Self::ReadOnly | Self::KeywordSet => "404",
            Self::WriteOnly => "405",
            Self::TypeMismatch => "406",
            Self::ValueOutOfRange => "407",
            Self::DependencyNotEstablished => "408",
        }
    }
}

pub const NO_ERROR: &str = "0";

const SCORM12_ERRORS: &[(&str, &str, &str)] = &[
    ("0", "No error", "No error occurred, the previous API call was successful."),
    ("101", "General Exception", "An unexpected error was encountered."),
    ("201", "Invalid argument error", "The argument is not valid for this call."),
    (
        "202",
        "Element cannot have children",
        "The element does not support the _children keyword.",
    ),
    (
        "203",
        "Element not an array - cannot have count",
        "The element does not support the _count keyword.",
    ),
    ("301", "Not initialized", "The API call was made before LMSInitialize."),
    ("401", "Not implemented error", "The data model element is not implemented."),
    (
        "402",
        "Invalid set value, element is a keyword",
        "Keyword elements such as _children and _count cannot be set.",
    ),
    ("403", "Element is read only", "The data model element cannot be set."),
    ("404", "Element is write only", "The data model element cannot be read."),
    ("405", "Incorrect Data Type", "The value does not match the element's data type."),
];

const SCORM2004_ERRORS: &[(&str, &str, &str)] = &[
    ("0", "No Error", "No error occurred, the previous API call was successful."),
    ("101", "General Exception", "An unexpected error was encountered."),
    ("102", "General Initialization Failure", "Initialize could not be completed."),
    ("103", "Already Initialized", "Initialize was called after a successful Initialize."),
    (
        "104",
        "Content Instance Terminated",
        "Initialize was called after Terminate.",
    ),
    ("111", "General Termination Failure", "Terminate could not be completed."),
    ("112", "Termination Before Initialization", "Terminate was called before Initialize."),
    ("113", "Termination After Termination", "Terminate was called after Terminate."),
    ("122", "Retrieve Data Before Initialization", "GetValue was called before Initialize."),
    ("123", "Retrieve Data After Termination", "GetValue was called after Terminate."),
    ("132", "Store Data Before Initialization", "SetValue was called before Initialize."),
    ("133", "Store Data After Termination", "SetValue was called after Terminate."),
    ("142", "Commit Before Initialization", "Commit was called before Initialize."),
    ("143", "Commit After Termination", "Commit was called after Terminate."),
    ("201", "General Argument Error", "An invalid argument was passed to an API method."),
    ("301", "General Get Failure", "GetValue could not be completed."),
    ("351", "General Set Failure", "SetValue could not be completed."),
    ("391", "General Commit Failure", "Commit could not be completed."),
    (
        "401",
        "Undefined Data Model Element",
        "The data model element name is not defined.",
    ),
    (
        "402",
        "Unimplemented Data Model Element",
        "The data model element is defined but not implemented.",
    ),
    (
        "403",
        "Data Model Element Value Not Initialized",
        "The data model element has not been given a value.",
    ),
    ("404", "Data Model Element Is Read Only", "The data model element cannot be set."),
    ("405", "Data Model Element Is Write Only", "The data model element cannot be read."),
    (
        "406",
        "Data Model Element Type Mismatch",
        "The value does not match the element's data type.",
    ),
    (
        "407",
        "Data Model Element Value Out Of Range",
        "The value is outside the element's allowed range.",
    ),
    (
        "408",
        "Data Model Dependency Not Established",
        "An element this value depends on has not been set.",
    ),
];

fn table(revision: Revision) -> &'static [(&'static str, &'static str, &'static str)] {
    match revision {
        Revision::Scorm12 => SCORM12_ERRORS,
        Revision::Scorm2004 => SCORM2004_ERRORS,
    }
}

/// Human-readable message for `code`, if the revision defines it.
pub fn error_string(revision: Revision, code: &str) -> Option<&'static str> {
    table(revision)
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, message, _)| *message)
}

pub fn error_diagnostic(revision: Revision, code: &str) -> Option<&'static str> {
    table(revision)
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, _, diagnostic)| *diagnostic)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[RuntimeError] = &[
        RuntimeError::General,
        RuntimeError::AlreadyInitialized,
        RuntimeError::ContentInstanceTerminated,
        RuntimeError::TerminationBeforeInit,
        RuntimeError::TerminationAfterTermination,
        RuntimeError::RetrieveBeforeInit,
        RuntimeError::RetrieveAfterTermination,
        RuntimeError::StoreBeforeInit,
        RuntimeError::StoreAfterTermination,
        RuntimeError::CommitBeforeInit,
        RuntimeError::CommitAfterTermination,
        RuntimeError::InvalidArgument,
        RuntimeError::GeneralGet,
        RuntimeError::GeneralSet,
        RuntimeError::UndefinedElement,
        RuntimeError::ValueNotInitialized,
        RuntimeError::ReadOnly,
        RuntimeError::WriteOnly,
        RuntimeError::KeywordSet,
        RuntimeError::NoChildren,
        RuntimeError::NoCount,
        RuntimeError::TypeMismatch,
        RuntimeError::ValueOutOfRange,
        RuntimeError::DependencyNotEstablished,
    ];

    /// Every kind maps to a code present in its revision's table.
    #[test]
    fn every_kind_maps_into_its_table() {
        for revision in [Revision::Scorm12, Revision::Scorm2004] {
            for kind in ALL {
                let code = kind.code(revision);
                assert!(
                    error_string(revision, code).is_some(),
                    "{kind:?} -> {code} missing for {revision:?}"
                );
            }
        }
    }

    #[test]
    fn not_initialized_codes_differ_by_revision() {
        assert_eq!(RuntimeError::RetrieveBeforeInit.code(Revision::Scorm12), "301");
        assert_eq!(RuntimeError::RetrieveBeforeInit.code(Revision::Scorm2004), "122");
    }

    #[test]
    fn unknown_codes_have_no_message() {
        assert_eq!(error_string(Revision::Scorm12, "408"), None);
        assert_eq!(
            error_string(Revision::Scorm2004, NO_ERROR),
            Some("No Error")
        );
    }
}
