//! Subject/run identity and class label derivation
//!
//! Source identifiers follow the `{subject}_{subjectrun}` convention, e.g.
//! `S001_S001R01`. The run token decides the label.

use crate::config::constants::labels::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subject and run parsed from a source identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    pub run: String,
}

impl Identity {
    /// Split on `_`: first token is the subject, second the run.
    /// A missing run becomes `"unknown"`; further tokens are ignored.
    pub fn parse(source_id: &str) -> Self {
        let mut parts = source_id.split(IDENTITY_DELIMITER);
        let subject = parts.next().unwrap_or_default().to_string();
        let run = parts.next().unwrap_or(UNKNOWN_RUN).to_string();

        Self { subject, run }
    }
}

/// Brain state class of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Rest,
    Motor,
    Unknown,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Rest => "rest",
            Label::Motor => "motor",
            Label::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rest" => Ok(Label::Rest),
            "motor" => Ok(Label::Motor),
            "unknown" => Ok(Label::Unknown),
            other => Err(format!("unrecognized label '{}'", other)),
        }
    }
}

/// How run codes are compared against the run token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelMatching {
    /// The run token contains the code anywhere (`S001R010` contains `R01`)
    #[default]
    Substring,
    /// The trailing `R<digits>` code of the run token equals the code
    ExactRunCode,
}

/// Run code lists deciding the label; rest is checked before motor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelRules {
    pub matching: LabelMatching,
    pub rest: Vec<String>,
    pub motor: Vec<String>,
}

impl LabelRules {
    pub fn label(&self, run: &str) -> Label {
        if self.matches_any(run, &self.rest) {
            Label::Rest
        } else if self.matches_any(run, &self.motor) {
            Label::Motor
        } else {
            Label::Unknown
        }
    }

    pub fn label_for(&self, identity: &Identity) -> Label {
        self.label(&identity.run)
    }

    fn matches_any(&self, run: &str, codes: &[String]) -> bool {
        match self.matching {
            LabelMatching::Substring => codes.iter().any(|code| run.contains(code.as_str())),
            LabelMatching::ExactRunCode => match run_code(run) {
                Some(code) => codes.iter().any(|c| c == code),
                None => false,
            },
        }
    }
}

impl Default for LabelRules {
    fn default() -> Self {
        Self {
            matching: LabelMatching::default(),
            rest: REST_RUNS.iter().map(|s| s.to_string()).collect(),
            motor: MOTOR_RUNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Trailing `R<digits>` suffix of a run token
fn run_code(run: &str) -> Option<&str> {
    let digits = run.len() - run.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let start = run.len().checked_sub(digits + 1)?;
    run.get(start..).filter(|code| code.starts_with('R'))
}
