use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Named pipeline stages, executed strictly in order. The display form is
/// the stage tag recorded on failed jobs (`extract: ...`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Derive,
    Summarize,
    Finalize,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Stage::Extract => write!(f, "extract"),
            Stage::Derive => write!(f, "derive"),
            Stage::Summarize => write!(f, "summarize"),
            Stage::Finalize => write!(f, "finalize"),
        }
    }
}

/// Output of classification: which stages run for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingPlan {
    /// Text-like content that skips extraction and derivative generation.
    pub fast_track: bool,
    pub stages: Vec<Stage>,
}

impl ProcessingPlan {
    /// Abbreviated plan for text-like MIME types: direct summarize only.
    pub fn fast_track() -> Self {
        Self {
            fast_track: true,
            stages: vec![Stage::Summarize, Stage::Finalize],
        }
    }

    /// Full plan for everything else.
    pub fn full() -> Self {
        Self {
            fast_track: false,
            stages: vec![Stage::Extract, Stage::Derive, Stage::Summarize, Stage::Finalize],
        }
    }

    pub fn runs(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}
