use std::fmt;

/// Per-test outcome as recorded by the test runner (`testStatus`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceStatus {
    Success,
    Failure,
    /// `XCTExpectFailure` matched: the test passed by failing.
    ExpectedFailure,
    Skipped,
    /// Repetitions disagreed.
    Mixed,
    Unknown,
}

impl SourceStatus {
    pub const ALL: [Self; 6] = [
        Self::Success,
        Self::Failure,
        Self::ExpectedFailure,
        Self::Skipped,
        Self::Mixed,
        Self::Unknown,
    ];

    /// Parse the exact text used by `xcresulttool`. Anything else is `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == raw)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
            Self::ExpectedFailure => "Expected Failure",
            Self::Skipped => "Skipped",
            Self::Mixed => "Mixed",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_exact() {
        assert_eq!(SourceStatus::parse("Success"), Some(SourceStatus::Success));
        assert_eq!(
            SourceStatus::parse("Expected Failure"),
            Some(SourceStatus::ExpectedFailure)
        );
        assert_eq!(SourceStatus::parse("success"), None);
        assert_eq!(SourceStatus::parse("Flaky"), None);
        assert_eq!(SourceStatus::parse(""), None);
    }

    #[test]
    fn every_status_parses_back() {
        for status in SourceStatus::ALL {
            assert_eq!(SourceStatus::parse(status.as_str()), Some(status));
        }
    }
}
