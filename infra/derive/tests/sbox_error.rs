use std::borrow::Cow;

#[sbox_derive::sbox_error]
pub enum ProbeError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Rejected{}: {reason}", format_context(.context))]
    Rejected { reason: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn failing_io() -> Result<(), std::io::Error> {
    Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
}

#[test]
fn sbox_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/sbox_error_pass.rs");
    t.pass("tests/ui/sbox_service_pass.rs");
}

#[test]
fn source_errors_convert_and_carry_context() {
    let err = failing_io().context("Reading snapshot").unwrap_err();
    assert!(matches!(err, ProbeError::Io { .. }));
    assert_eq!(err.to_string(), "IO error (Reading snapshot): missing");
}

#[test]
fn context_overwrites_on_own_result() {
    let result: Result<(), ProbeError> =
        Err(ProbeError::Rejected { reason: "locked".into(), context: None });
    let err = result.context("Saving folder").unwrap_err();
    assert_eq!(err.to_string(), "Rejected (Saving folder): locked");
}

#[test]
fn strings_become_internal_errors() {
    let from_str: ProbeError = "boom".into();
    let from_string: ProbeError = String::from("bang").into();
    assert!(matches!(from_str, ProbeError::Internal { .. }));
    assert_eq!(from_string.to_string(), "Internal error: bang");
}

#[test]
fn variant_name_reports_the_variant() {
    let err: ProbeError = "boom".into();
    assert_eq!(err.variant_name(), "Internal");
    let err = ProbeError::Rejected { reason: "x".into(), context: None };
    assert_eq!(err.variant_name(), "Rejected");
}
