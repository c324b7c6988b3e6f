//! Core types for the session layer.

use serde::{Deserialize, Serialize};

/// The kind of one blackbox output, as declared by `BB_OUTPUT_TYPE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputType {
    /// The objective value to minimize.
    Objective,
    /// A relaxable constraint (progressive barrier), feasible when `<= 0`.
    PbConstraint,
    /// An unrelaxable constraint (extreme barrier), feasible when `<= 0`.
    EbConstraint,
}

impl OutputType {
    /// The configuration tag for this output kind.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Objective => "OBJ",
            Self::PbConstraint => "PB",
            Self::EbConstraint => "EB",
        }
    }
}

impl core::fmt::Display for OutputType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Why a driving loop stopped issuing suggest calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The cumulative evaluation budget would be exceeded.
    BudgetExhausted,
    /// The frame size fell below the configured minimum.
    MinFrameSize,
    /// The fixed iteration ceiling was reached.
    IterationLimit,
    /// The session produced no candidates even after bootstrap resampling.
    NoCandidates,
}

impl core::fmt::Display for StopReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let reason = match self {
            Self::BudgetExhausted => "evaluation budget exhausted",
            Self::MinFrameSize => "minimum frame size reached",
            Self::IterationLimit => "iteration limit reached",
            Self::NoCandidates => "no candidates suggested",
        };
        write!(f, "{reason}")
    }
}
