// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance test analysis.
//!
//! Four features are computed over the whole sample:
//!
//! | Feature | Definition |
//! |---------|------------|
//! | path length | sum of norms of consecutive accel differences |
//! | sway area | `(max x - min x) * (max y - min y)` of accel |
//! | angular variance | mean of the per-axis population variance of gyro |
//! | jerkiness | mean norm of consecutive accel differences |
//!
//! A sample is flagged when any feature exceeds its threshold. Thresholds are
//! compared against unrounded values; rounding is for presentation only.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AnalysisError;
use crate::detection::{Classification, Verdict};

/// Accelerometer and gyroscope readings captured at the same cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MotionSample {
    pub accel: Vec<[f64; 3]>,
    pub gyro: Vec<[f64; 3]>,
}

/// Upper bounds above which a feature flags the sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceThresholds {
    pub sway_area: f64,
    pub path_length: f64,
    pub angular_variance: f64,
    pub jerkiness: f64,
}

impl Default for BalanceThresholds {
    fn default() -> Self {
        Self {
            sway_area: 0.15,
            path_length: 15.0,
            angular_variance: 0.002,
            jerkiness: 0.2,
        }
    }
}

/// Feature vector, rounded for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BalanceFeatures {
    pub path_length: f64,
    pub sway_area: f64,
    pub angular_variance: f64,
    pub jerkiness: f64,
}

/// Outcome of [`analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BalanceReport {
    pub features: BalanceFeatures,
    pub stroke_detected: bool,
    /// Names of the features that exceeded their threshold.
    pub exceeded: Vec<String>,
}

impl BalanceReport {
    /// Wrap the report into a verdict carrying `confidence`.
    pub fn to_verdict(&self, confidence: f64) -> Verdict {
        let verdict = Verdict::new(Classification::from_flag(self.stroke_detected), confidence);
        if self.exceeded.is_empty() {
            verdict.with_notes("Good balance")
        } else {
            verdict.with_notes(format!("Poor balance: {} above threshold", self.exceeded.join(", ")))
        }
    }
}

/// Compute features and apply the threshold rule.
pub fn analyze(sample: &MotionSample, thresholds: &BalanceThresholds) -> Result<BalanceReport, AnalysisError> {
    let n = sample.accel.len();
    if n < 2 || sample.gyro.len() != n {
        return Err(AnalysisError::insufficient(format!(
            "balance sample needs at least 2 readings per channel with equal lengths (accel: {}, gyro: {})",
            n,
            sample.gyro.len()
        )));
    }
    if sample.accel.iter().chain(&sample.gyro).flatten().any(|v| !v.is_finite()) {
        return Err(AnalysisError::insufficient("balance sample contains non-finite readings"));
    }

    let steps: Vec<f64> = sample
        .accel
        .windows(2)
        .map(|pair| norm(sub(pair[1], pair[0])))
        .collect();
    let path_length: f64 = steps.iter().sum();
    let jerkiness = path_length / steps.len() as f64;

    let (x_min, x_max) = range(sample.accel.iter().map(|a| a[0]));
    let (y_min, y_max) = range(sample.accel.iter().map(|a| a[1]));
    let sway_area = (x_max - x_min) * (y_max - y_min);

    let angular_variance = (0..3)
        .map(|axis| population_variance(sample.gyro.iter().map(|g| g[axis])))
        .sum::<f64>()
        / 3.0;

    let mut exceeded = Vec::new();
    if sway_area > thresholds.sway_area {
        exceeded.push("sway_area".to_string());
    }
    if path_length > thresholds.path_length {
        exceeded.push("path_length".to_string());
    }
    if angular_variance > thresholds.angular_variance {
        exceeded.push("angular_variance".to_string());
    }
    if jerkiness > thresholds.jerkiness {
        exceeded.push("jerkiness".to_string());
    }

    Ok(BalanceReport {
        features: BalanceFeatures {
            path_length: round_to(path_length, 2),
            sway_area: round_to(sway_area, 2),
            angular_variance: round_to(angular_variance, 5),
            jerkiness: round_to(jerkiness, 5),
        },
        stroke_detected: !exceeded.is_empty(),
        exceeded,
    })
}

/// [`analyze`] bound to configured thresholds and rule confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceAnalyzer {
    thresholds: BalanceThresholds,
    rule_confidence: f64,
}

impl BalanceAnalyzer {
    pub fn new(thresholds: BalanceThresholds, rule_confidence: f64) -> Self {
        Self {
            thresholds,
            rule_confidence,
        }
    }

    pub fn analyze(&self, sample: &MotionSample) -> Result<(BalanceReport, Verdict), AnalysisError> {
        let report = analyze(sample, &self.thresholds)?;
        let verdict = report.to_verdict(self.rule_confidence);
        Ok((report, verdict))
    }
}

impl Default for BalanceAnalyzer {
    fn default() -> Self {
        Self::new(BalanceThresholds::default(), 1.0)
    }
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn population_variance(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let (count, sum) = values.clone().fold((0usize, 0.0), |(c, s), v| (c + 1, s + v));
    let mean = sum / count as f64;
    values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
