// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request log middleware.
//!
//! Every served request is summarized into the `logs` collection. The write
//! happens on a detached task after the response is produced; a failed write
//! is logged and otherwise ignored.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::state::AppState;
use crate::storage::{RequestLogRepository, StoredRequestLog};

pub async fn record(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().to_string();
    let timestamp = state.clock.now();
    let started = Instant::now();

    let response = next.run(request).await;

    let entry = StoredRequestLog {
        path,
        method,
        timestamp,
        duration: started.elapsed().as_secs_f64(),
        status_code: response.status().as_u16(),
    };
    let store = state.store.clone();
    tokio::spawn(async move {
        if let Err(e) = RequestLogRepository::new(store.as_ref()).insert(&entry).await {
            tracing::warn!(path = %entry.path, error = %e, "failed to persist request log");
        }
    });

    response
}
