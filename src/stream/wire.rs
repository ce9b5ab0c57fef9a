//! Wire payloads carried inside `data:` records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Executive-function capacity estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfCapacity {
    High,
    Moderate,
    Low,
}

/// How the learner processes instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStyle {
    Standard,
    HighFriction,
    Literal,
}

/// Preferred coaching voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachTone {
    Challenger,
    Reassuring,
    Objective,
}

/// How the learner plans their own work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetacognitionStyle {
    Planner,
    Adjuster,
    AntiPlanner,
}

/// Final calibration result produced at the end of the dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub ef_capacity: EfCapacity,
    pub processing_style: ProcessingStyle,
    pub coach_tone: CoachTone,
    pub metacognition_style: MetacognitionStyle,
}

impl EfCapacity {
    pub fn as_str(self) -> &'static str {
        match self {
            EfCapacity::High => "high",
            EfCapacity::Moderate => "moderate",
            EfCapacity::Low => "low",
        }
    }
}

impl ProcessingStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStyle::Standard => "standard",
            ProcessingStyle::HighFriction => "high_friction",
            ProcessingStyle::Literal => "literal",
        }
    }
}

impl CoachTone {
    pub fn as_str(self) -> &'static str {
        match self {
            CoachTone::Challenger => "challenger",
            CoachTone::Reassuring => "reassuring",
            CoachTone::Objective => "objective",
        }
    }
}

impl MetacognitionStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            MetacognitionStyle::Planner => "planner",
            MetacognitionStyle::Adjuster => "adjuster",
            MetacognitionStyle::AntiPlanner => "anti_planner",
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EF {} · processing {} · tone {} · metacognition {}",
            self.ef_capacity.as_str(),
            self.processing_style.as_str(),
            self.coach_tone.as_str(),
            self.metacognition_style.as_str()
        )
    }
}

/// A single `data:` payload, discriminated by its `type` field
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum WirePayload {
    Text {
        #[serde(default)]
        content: Option<String>,
    },
    NeuroMetricsFinalized {
        result: Metrics,
    },
    Error {
        #[serde(default, alias = "message")]
        detail: Option<String>,
    },
    End,
    /// Forward compatibility: record types this build does not know about
    #[serde(other)]
    Unknown,
}
