// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! StrokeSense Server - Stroke Symptom Screening Backend
//!
//! Patients authenticate, keep a clinical profile, submit balance, speech
//! and eye-gaze tests, and every verdict is persisted into a per-patient
//! detection history.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Password login and JWT sessions
//! - `analysis` - Balance rule, speech classifier adapter, gaze tally
//! - `detection` - Verdict normalization and history
//! - `storage` - Document store (JSON files on disk, in-memory for tests)
//! - `notify` - Emergency contact alerts
//! - `model_fetch` - Startup download of classifier model files

pub mod analysis;
pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod detection;
pub mod error;
pub mod model_fetch;
pub mod models;
pub mod notify;
pub mod state;
pub mod storage;
