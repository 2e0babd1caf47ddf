use std::fmt;

/// Status reported by the workload under test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Pass,
    Running,
    Fail,
    /// Anything outside the vocabulary; treated like `Running`.
    Unrecognized(String),
}

impl Status {
    pub const PASS: &'static str = "pass";
    pub const RUNNING: &'static str = "running";
    pub const FAIL: &'static str = "fail";

    /// Parse a raw response body. Surrounding whitespace is ignored, the
    /// comparison itself is exact.
    pub fn parse(body: &str) -> Self {
        match body.trim() {
            Self::PASS => Self::Pass,
            Self::RUNNING => Self::Running,
            Self::FAIL => Self::Fail,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str(Self::PASS),
            Self::Running => f.write_str(Self::RUNNING),
            Self::Fail => f.write_str(Self::FAIL),
            Self::Unrecognized(other) => write!(f, "{other:?}"),
        }
    }
}

/// What to ask the status endpoint for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProbeQuery {
    /// Current state, one of the [`Status`] sentinels.
    Status,
    /// Free-form details, read once a run has failed or timed out.
    Read,
}

impl ProbeQuery {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Read => "read",
        }
    }
}

impl fmt::Display for ProbeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}
