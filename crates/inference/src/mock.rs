use crate::error::InferenceError;
use crate::provider::{InferenceRequest, ModelProvider};
use async_trait::async_trait;
use refine_protocol::{Category, Finding, LineRange, Severity};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

/// Emit one finding per payload line containing the needle, at that line.
#[derive(Debug, Clone)]
struct MarkerRule {
    needle: String,
    category: Category,
    severity: Severity,
    message: String,
}

/// Deterministic in-process model for tests and offline runs.
///
/// Counts calls so tests can assert how often the model capability was
/// actually invoked (cache hits must not be).
#[derive(Default)]
pub struct MockProvider {
    fixed: Vec<Finding>,
    marker: Option<MarkerRule>,
    delay: Option<Duration>,
    transient_failures: AtomicU32,
    fatal: Option<String>,
    fatal_when_contains: Option<String>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Provider that reports nothing
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Provider that reports the given findings for every chunk
    #[must_use]
    pub fn returning(findings: Vec<Finding>) -> Self {
        Self {
            fixed: findings,
            ..Self::default()
        }
    }

    /// Builder: fail the first `count` calls with a transient error
    #[must_use]
    pub fn failing_transient(self, count: u32) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Builder: fail every call fatally
    #[must_use]
    pub fn always_fatal(mut self, message: impl Into<String>) -> Self {
        self.fatal = Some(message.into());
        self
    }

    /// Builder: fail fatally for payloads containing the pattern
    #[must_use]
    pub fn fatal_when_contains(mut self, pattern: impl Into<String>) -> Self {
        self.fatal_when_contains = Some(pattern.into());
        self
    }

    /// Builder: report a finding on every payload line containing `needle`
    #[must_use]
    pub fn flagging(
        mut self,
        needle: impl Into<String>,
        category: Category,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        self.marker = Some(MarkerRule {
            needle: needle.into(),
            category,
            severity,
            message: message.into(),
        });
        self
    }

    /// Builder: sleep before answering, to exercise timeouts and budgets
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn infer(&self, request: &InferenceRequest) -> Result<Vec<Finding>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(InferenceError::transient("induced transient failure"));
        }

        if let Some(message) = &self.fatal {
            return Err(InferenceError::fatal(message.clone()));
        }

        if let Some(pattern) = &self.fatal_when_contains {
            if request.code.contains(pattern) {
                return Err(InferenceError::fatal(format!(
                    "capability rejected payload containing {pattern:?}"
                )));
            }
        }

        let mut findings = self.fixed.clone();
        if let Some(rule) = &self.marker {
            for (idx, line) in request.code.lines().enumerate() {
                if line.contains(&rule.needle) {
                    findings.push(Finding::new(
                        rule.category,
                        rule.severity,
                        LineRange::line(idx + 1),
                        rule.message.clone(),
                    ));
                }
            }
        }

        Ok(findings)
    }

    fn model_id(&self) -> &str {
        "mock-model-v1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use refine_protocol::AnalysisFocus;

    fn request(code: &str) -> InferenceRequest {
        InferenceRequest {
            code: code.to_string(),
            language: "rust".to_string(),
            focus: AnalysisFocus::Comprehensive,
            oversized: false,
        }
    }

    #[tokio::test]
    async fn counts_calls() {
        let provider = MockProvider::empty();
        assert_eq!(provider.call_count(), 0);
        provider.infer(&request("a")).await.unwrap();
        provider.infer(&request("b")).await.unwrap();
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn transient_budget_then_success() {
        let provider = MockProvider::empty().failing_transient(2);

        assert!(matches!(
            provider.infer(&request("x")).await,
            Err(InferenceError::Transient(_))
        ));
        assert!(matches!(
            provider.infer(&request("x")).await,
            Err(InferenceError::Transient(_))
        ));
        assert!(provider.infer(&request("x")).await.is_ok());
    }

    #[tokio::test]
    async fn marker_pins_findings_to_local_lines() {
        let provider = MockProvider::empty().flagging(
            "todo!()",
            Category::Bug,
            Severity::High,
            "unimplemented stub",
        );

        let findings = provider
            .infer(&request("fn a() {}\nfn b() { todo!() }\n"))
            .await
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].range, LineRange::line(2));
    }
}
