// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Slurred-speech classification.
//!
//! The model runs out of process. [`HttpSpeechClassifier`] posts the raw
//! upload to `CLASSIFIER_URL` and expects
//! `{"result": "stroke_detected" | "normal", "confidence_score": f64}` back.
//! [`SpeechAnalyzer`] bounds every call with the configured timeout and
//! checks what comes back.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Deserialize;
use url::Url;

use super::AnalysisError;
use crate::detection::{Classification, Verdict};

/// Default upper bound on one classifier call.
pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(15);

/// Classifier answer.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SpeechClassification {
    pub result: Classification,
    pub confidence_score: f64,
}

#[async_trait]
pub trait SpeechClassifier: Send + Sync {
    async fn classify(&self, audio: Vec<u8>) -> Result<SpeechClassification, AnalysisError>;
}

/// Classifier reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSpeechClassifier {
    url: Url,
    http: Client,
}

impl HttpSpeechClassifier {
    pub fn new(url: Url) -> Result<Self, AnalysisError> {
        let http = Client::builder()
            .build()
            .map_err(|e| AnalysisError::Classifier(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { url, http })
    }
}

#[async_trait]
impl SpeechClassifier for HttpSpeechClassifier {
    async fn classify(&self, audio: Vec<u8>) -> Result<SpeechClassification, AnalysisError> {
        let response = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(audio)
            .send()
            .await
            .map_err(|e| AnalysisError::Classifier(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Classifier(format!(
                "classifier returned {status}: {body}"
            )));
        }

        response
            .json::<SpeechClassification>()
            .await
            .map_err(|e| AnalysisError::InvalidClassifierOutput(e.to_string()))
    }
}

/// Validates input, applies the timeout and checks the classifier output.
#[derive(Clone)]
pub struct SpeechAnalyzer {
    classifier: Option<Arc<dyn SpeechClassifier>>,
    timeout: Duration,
}

impl SpeechAnalyzer {
    pub fn new(classifier: Arc<dyn SpeechClassifier>, timeout: Duration) -> Self {
        Self {
            classifier: Some(classifier),
            timeout,
        }
    }

    /// Analyzer whose every call fails with `ClassifierUnavailable`.
    pub fn unavailable() -> Self {
        Self {
            classifier: None,
            timeout: DEFAULT_CLASSIFIER_TIMEOUT,
        }
    }

    pub fn is_available(&self) -> bool {
        self.classifier.is_some()
    }

    pub async fn analyze(&self, audio: Vec<u8>) -> Result<Verdict, AnalysisError> {
        if audio.is_empty() {
            return Err(AnalysisError::insufficient("audio upload is empty"));
        }
        let classifier = self
            .classifier
            .as_ref()
            .ok_or(AnalysisError::ClassifierUnavailable)?;

        let size = audio.len();
        let classification = tokio::time::timeout(self.timeout, classifier.classify(audio))
            .await
            .map_err(|_| {
                tracing::warn!(timeout = ?self.timeout, size, "speech classifier timed out");
                AnalysisError::UpstreamTimeout(self.timeout)
            })??;

        let confidence = classification.confidence_score;
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(AnalysisError::InvalidClassifierOutput(format!(
                "confidence {confidence} is outside [0, 1]"
            )));
        }

        tracing::debug!(size, result = %classification.result, confidence, "speech classified");
        Ok(Verdict::new(classification.result, confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Bytes, routing::post, Json, Router};

    struct FixedClassifier(SpeechClassification);

    #[async_trait]
    impl SpeechClassifier for FixedClassifier {
        async fn classify(&self, _audio: Vec<u8>) -> Result<SpeechClassification, AnalysisError> {
            Ok(self.0)
        }
    }

    struct StalledClassifier;

    #[async_trait]
    impl SpeechClassifier for StalledClassifier {
        async fn classify(&self, _audio: Vec<u8>) -> Result<SpeechClassification, AnalysisError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(AnalysisError::Classifier("unreachable".to_string()))
        }
    }

    fn fixed(result: Classification, confidence_score: f64) -> SpeechAnalyzer {
        SpeechAnalyzer::new(
            Arc::new(FixedClassifier(SpeechClassification {
                result,
                confidence_score,
            })),
            DEFAULT_CLASSIFIER_TIMEOUT,
        )
    }

    #[tokio::test]
    async fn classification_becomes_verdict() {
        let verdict = fixed(Classification::StrokeDetected, 0.9731)
            .analyze(vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(verdict.classification, Classification::StrokeDetected);
        assert_eq!(verdict.confidence, 0.9731);
    }

    #[tokio::test]
    async fn empty_audio_is_rejected_before_classifying() {
        let err = SpeechAnalyzer::unavailable().analyze(Vec::new()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(_)));
    }

    #[tokio::test]
    async fn missing_classifier_is_unavailable() {
        let err = SpeechAnalyzer::unavailable().analyze(vec![0]).await.unwrap_err();
        assert!(matches!(err, AnalysisError::ClassifierUnavailable));
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_invalid_output() {
        let err = fixed(Classification::Normal, 1.2)
            .analyze(vec![0])
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidClassifierOutput(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_classifier_times_out() {
        let analyzer = SpeechAnalyzer::new(Arc::new(StalledClassifier), Duration::from_millis(50));
        let err = analyzer.analyze(vec![0]).await.unwrap_err();
        assert!(matches!(err, AnalysisError::UpstreamTimeout(_)));
    }

    async fn serve(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/classify")).unwrap()
    }

    #[tokio::test]
    async fn http_classifier_posts_raw_audio() {
        let router = Router::new().route(
            "/classify",
            post(|body: Bytes| async move {
                let result = if body.len() > 2 { "stroke_detected" } else { "normal" };
                Json(serde_json::json!({"result": result, "confidence_score": 0.75}))
            }),
        );
        let classifier = HttpSpeechClassifier::new(serve(router).await).unwrap();

        let classification = classifier.classify(vec![1, 2, 3]).await.unwrap();
        assert_eq!(classification.result, Classification::StrokeDetected);
        assert_eq!(classification.confidence_score, 0.75);
    }

    #[tokio::test]
    async fn http_classifier_reports_upstream_failure() {
        let router = Router::new().route(
            "/classify",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
        );
        let classifier = HttpSpeechClassifier::new(serve(router).await).unwrap();

        let err = classifier.classify(vec![1]).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Classifier(_)));
    }

    #[tokio::test]
    async fn http_classifier_rejects_unknown_labels() {
        let router = Router::new().route(
            "/classify",
            post(|| async { Json(serde_json::json!({"result": "maybe", "confidence_score": 0.5})) }),
        );
        let classifier = HttpSpeechClassifier::new(serve(router).await).unwrap();

        let err = classifier.classify(vec![1]).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidClassifierOutput(_)));
    }
}
