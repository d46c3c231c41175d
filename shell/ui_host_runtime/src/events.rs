use crate::descriptor::{Action, Params};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    #[default]
    Info,
    Warning,
}

impl Severity {
    pub fn parse_or(raw: Option<&str>, default: Severity) -> Severity {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("success") => Severity::Success,
            Some("error") => Severity::Error,
            Some("info") => Severity::Info,
            Some("warning") => Severity::Warning,
            _ => default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub message: String,
    pub severity: Severity,
}

impl Toast {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitReason {
    /// Back was requested on the entry page.
    Back,
    /// A validated submission was handed to the host.
    Submitted,
}

/// Signal from a mini-app session to the host shell.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Toast(Toast),
    /// Action the session does not own, passed through unmodified.
    Forward(Action),
    /// Validated `@submitForm` parameters for the host to send.
    Submit(Params),
    Exit(ExitReason),
}

pub trait HostSink {
    fn emit(&mut self, event: HostEvent);
}

impl HostSink for Vec<HostEvent> {
    fn emit(&mut self, event: HostEvent) {
        self.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::known(Some("warning"), Severity::Warning)]
    #[case::uppercase(Some("ERROR"), Severity::Error)]
    #[case::unknown(Some("celebration"), Severity::Success)]
    #[case::absent(None, Severity::Success)]
    fn severity_parsing_falls_back(#[case] raw: Option<&str>, #[case] expected: Severity) {
        assert_eq!(Severity::parse_or(raw, Severity::Success), expected);
    }

    #[test]
    fn toast_serializes_severity_lowercase() {
        let encoded =
            serde_json::to_value(Toast::new("Saved", Severity::Success)).expect("encode toast");
        assert_eq!(
            encoded,
            serde_json::json!({ "message": "Saved", "severity": "success" })
        );
    }
}
