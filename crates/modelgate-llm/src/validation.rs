//! Validated calls - consensus, then independent verification
//!
//! Each attempt samples the vendor's `high` model three times with the same
//! prompt. Only byte-identical samples go on to the `budget` model, which
//! either restates the answer or replies with [`REJECTION_SENTINEL`]. The
//! budget model's reply is the final answer.
//!
//! Attempts run strictly one after another; the three samples of one attempt
//! are independent and may run concurrently.

use futures::future::join_all;
use std::sync::Arc;
use tracing::Span;

use crate::cost::CostLedger;
use crate::error::{LLMError, Result};
use crate::registry::{ModelDescriptor, ModelRegistry};
use crate::router::ModelDispatcher;
use crate::types::*;

/// Upper bound on attempts per validated call
pub const MAX_ATTEMPTS: u32 = 5;
/// High-model samples drawn per attempt
pub const SAMPLES_PER_ATTEMPT: usize = 3;
/// Verification reply meaning "reject"
pub const REJECTION_SENTINEL: &str = "%FALSE%";

/// Prompt handed to the budget model.
pub fn verification_prompt(prompt: &str, samples: &[String]) -> String {
    let mut text = String::from(
        "You are a validation expert. I will give you an original prompt and three AI responses. \n\
         Your task is to check if all three responses are identical and valid.\n\n",
    );
    text.push_str(&format!("Original prompt: {}\n\n", prompt));
    for (i, sample) in samples.iter().enumerate() {
        text.push_str(&format!("Response {}: {}\n", i + 1, sample));
    }
    text.push_str(&format!(
        "\nIf all three responses are identical and valid, respond with the correct answer only.\n\
         If they are not identical or invalid, respond with exactly: {}\n\n\
         Your response:",
        REJECTION_SENTINEL
    ));
    text
}

/// Outcome of the verification step
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    /// Budget model's (trimmed) answer
    Confirmed(String),
    Rejected,
}

/// Record of one completed attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationAttempt {
    /// 1-based
    pub index: u32,
    pub samples: Vec<String>,
    pub agreement: bool,
    /// `None` when the samples disagreed
    pub verification: Option<Verification>,
    pub incremental_cost: f64,
}

/// How the loop proceeds after an attempt
enum AttemptVerdict {
    Validated(String),
    Retry(RetryReason),
    Fatal(LLMError),
}

enum RetryReason {
    Disagreement,
    Rejected,
    CallFailed(LLMError),
}

/// Runs the consensus-then-verify loop
pub struct ValidationOrchestrator {
    registry: Arc<ModelRegistry>,
    dispatcher: Arc<dyn ModelDispatcher>,
    temperature: f32,
    concurrent_samples: bool,
    span: Span,
}

impl ValidationOrchestrator {
    pub fn new(registry: Arc<ModelRegistry>, dispatcher: Arc<dyn ModelDispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
            temperature: CallRequest::DEFAULT_TEMPERATURE,
            concurrent_samples: true,
            span: Span::none(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_concurrent_samples(mut self, concurrent: bool) -> Self {
        self.concurrent_samples = concurrent;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Run a validated call against `vendor`.
    ///
    /// Returns `Ok` with status `ValidationFailed` when every attempt ended in
    /// disagreement, rejection or an absorbed call failure. Returns `Err` for
    /// configuration problems and for a call failure on the final attempt.
    pub async fn validated_call(
        &self,
        vendor: Vendor,
        prompt: &str,
        cost_tracking: bool,
    ) -> Result<ValidationResult> {
        let (high, budget) = self.resolve_models(vendor)?;

        tracing::info!(
            parent: &self.span,
            vendor = %vendor,
            high_model = %high.name,
            budget_model = %budget.name,
            "Starting validated call"
        );

        let mut ledger = CostLedger::default();

        for attempt in 1..=MAX_ATTEMPTS {
            tracing::info!(parent: &self.span, attempt, "Validation attempt {}/{}", attempt, MAX_ATTEMPTS);

            let outcome = self
                .run_attempt(attempt, high, budget, prompt, cost_tracking, &mut ledger)
                .await;

            if let Ok(ref record) = outcome {
                tracing::debug!(
                    parent: &self.span,
                    attempt = record.index,
                    agreement = record.agreement,
                    samples = ?record.samples,
                    incremental_cost = record.incremental_cost,
                    "Attempt finished"
                );
            }

            match Self::judge(attempt, outcome) {
                AttemptVerdict::Validated(answer) => {
                    tracing::info!(
                        parent: &self.span,
                        attempt,
                        total_cost = ledger.total(),
                        priced_calls = ledger.priced_calls(),
                        "Validation successful after {} attempt(s)",
                        attempt
                    );
                    return Ok(ValidationResult {
                        prompt: prompt.to_string(),
                        response: answer,
                        model_label: format!("{} (validated by {})", high.name, budget.name),
                        status: ValidationStatus::Validated,
                        attempts_used: attempt,
                        total_cost: cost_tracking.then(|| ledger.total()),
                    });
                }
                AttemptVerdict::Retry(RetryReason::Disagreement) => {
                    tracing::warn!(parent: &self.span, attempt, "Responses not identical - retrying");
                }
                AttemptVerdict::Retry(RetryReason::Rejected) => {
                    tracing::warn!(parent: &self.span, attempt, "Verification rejected the responses");
                }
                AttemptVerdict::Retry(RetryReason::CallFailed(e)) => {
                    tracing::error!(parent: &self.span, attempt, vendor = %vendor, "Error on attempt {}: {}", attempt, e);
                }
                AttemptVerdict::Fatal(e) => {
                    tracing::error!(
                        parent: &self.span,
                        attempt,
                        vendor = %vendor,
                        total_cost = ledger.total(),
                        "Validated call aborted: {}",
                        e
                    );
                    if !e.is_call_failure() {
                        return Err(e);
                    }
                    return Err(LLMError::ValidationAborted {
                        vendor,
                        attempt,
                        source: Box::new(e),
                    });
                }
            }
        }

        let message = format!(
            "Failed to get validated response after {} attempts for vendor: {}",
            MAX_ATTEMPTS, vendor
        );
        tracing::error!(
            parent: &self.span,
            total_cost = ledger.total(),
            priced_calls = ledger.priced_calls(),
            "{}",
            message
        );

        Ok(ValidationResult {
            prompt: prompt.to_string(),
            response: format!("ERROR: {}", message),
            model_label: format!("{} (validation failed)", high.name),
            status: ValidationStatus::ValidationFailed,
            attempts_used: MAX_ATTEMPTS,
            total_cost: cost_tracking.then(|| ledger.total()),
        })
    }

    fn resolve_models(&self, vendor: Vendor) -> Result<(&ModelDescriptor, &ModelDescriptor)> {
        let lookup = |role| {
            self.registry
                .first_by_vendor_and_role(vendor, role)
                .map_err(|e| {
                    tracing::error!(parent: &self.span, vendor = %vendor, role = %role, "{}", e);
                    e
                })
        };
        Ok((lookup(ModelRole::High)?, lookup(ModelRole::Budget)?))
    }

    fn judge(attempt: u32, outcome: Result<ValidationAttempt>) -> AttemptVerdict {
        match outcome {
            Err(e) if attempt == MAX_ATTEMPTS || !e.is_call_failure() => AttemptVerdict::Fatal(e),
            Err(e) => AttemptVerdict::Retry(RetryReason::CallFailed(e)),
            Ok(record) => match record.verification {
                Some(Verification::Confirmed(answer)) => AttemptVerdict::Validated(answer),
                Some(Verification::Rejected) => AttemptVerdict::Retry(RetryReason::Rejected),
                None => AttemptVerdict::Retry(RetryReason::Disagreement),
            },
        }
    }

    async fn run_attempt(
        &self,
        index: u32,
        high: &ModelDescriptor,
        budget: &ModelDescriptor,
        prompt: &str,
        cost_tracking: bool,
        ledger: &mut CostLedger,
    ) -> Result<ValidationAttempt> {
        let before = ledger.total();

        let sample_request = CallRequest::new(high.name.clone(), prompt)
            .with_temperature(self.temperature)
            .with_cost_tracking(cost_tracking);
        let samples = self.sample(sample_request, ledger).await?;

        let agreement = samples.windows(2).all(|pair| pair[0] == pair[1]);
        if !agreement {
            return Ok(ValidationAttempt {
                index,
                samples,
                agreement,
                verification: None,
                incremental_cost: ledger.total() - before,
            });
        }

        tracing::info!(parent: &self.span, attempt = index, "All samples identical - verifying with {}", budget.name);

        let verify_request = CallRequest::new(budget.name.clone(), verification_prompt(prompt, &samples))
            .with_temperature(self.temperature)
            .with_cost_tracking(cost_tracking);
        let verdict = self.dispatcher.dispatch(verify_request).await?;
        ledger.record(verdict.cost);

        let reply = verdict.response_text.trim();
        let verification = if reply == REJECTION_SENTINEL {
            Verification::Rejected
        } else {
            Verification::Confirmed(reply.to_string())
        };

        Ok(ValidationAttempt {
            index,
            samples,
            agreement,
            verification: Some(verification),
            incremental_cost: ledger.total() - before,
        })
    }

    /// Draw the samples, recording the cost of every call that returned.
    async fn sample(&self, request: CallRequest, ledger: &mut CostLedger) -> Result<Vec<String>> {
        let outcomes: Vec<Result<CallResult>> = if self.concurrent_samples {
            join_all((0..SAMPLES_PER_ATTEMPT).map(|_| self.dispatcher.dispatch(request.clone()))).await
        } else {
            let mut outcomes = Vec::with_capacity(SAMPLES_PER_ATTEMPT);
            for _ in 0..SAMPLES_PER_ATTEMPT {
                let outcome = self.dispatcher.dispatch(request.clone()).await;
                let failed = outcome.is_err();
                outcomes.push(outcome);
                if failed {
                    break;
                }
            }
            outcomes
        };

        for result in outcomes.iter().flatten() {
            ledger.record(result.cost);
        }

        outcomes
            .into_iter()
            .map(|outcome| outcome.map(|result| result.response_text))
            .collect()
    }
}
