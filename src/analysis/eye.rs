// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Eye-gaze test tally.
//!
//! The client runs the gaze test and reports how many of the prompted
//! directions the patient followed. Any miss flags the test.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AnalysisError;
use crate::detection::{Classification, Verdict};

/// Directions prompted by a full test (four cardinal, four diagonal).
pub const DEFAULT_GAZE_DIRECTIONS: u32 = 8;

fn default_total() -> u32 {
    DEFAULT_GAZE_DIRECTIONS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GazeTally {
    pub matched_directions: u32,
    #[serde(default = "default_total")]
    pub total_directions: u32,
}

impl GazeTally {
    /// Confidence is the share of directions agreeing with the verdict.
    pub fn verdict(&self) -> Result<Verdict, AnalysisError> {
        let GazeTally {
            matched_directions: matched,
            total_directions: total,
        } = *self;
        if total == 0 {
            return Err(AnalysisError::insufficient("gaze test must prompt at least one direction"));
        }
        if matched > total {
            return Err(AnalysisError::insufficient(format!(
                "matched directions ({matched}) exceed prompted directions ({total})"
            )));
        }

        let note = format!("Matched {matched}/{total} gaze directions");
        let verdict = if matched == total {
            Verdict::new(Classification::Normal, 1.0)
        } else {
            let missed = f64::from(total - matched);
            Verdict::new(Classification::StrokeDetected, missed / f64::from(total))
        };
        Ok(verdict.with_notes(note))
    }
}
