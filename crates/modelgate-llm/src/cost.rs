//! Call pricing
//!
//! Cost is `input_tokens * price_in + output_tokens * price_out`. Vendors that
//! report usage are priced from their own counts; the rest use the chars / 4
//! estimate, so costs from different vendors are not comparable at that
//! precision.

use tracing::Span;

use crate::registry::ModelDescriptor;
use crate::types::TokenUsage;

/// Single-call cost above which a warning is logged
pub const COST_WARNING_THRESHOLD: f64 = 0.01;

/// Rough token count: four characters per token, rounded down.
pub fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() / 4) as u32
}

/// Price `usage` at the descriptor's per-token rates.
pub fn price_usage(model: &ModelDescriptor, usage: &TokenUsage) -> f64 {
    f64::from(usage.input_tokens) * model.price_per_input_token
        + f64::from(usage.output_tokens) * model.price_per_output_token
}

/// Price a finished call when tracking was requested, warning on expensive calls.
pub(crate) fn settle(
    model: &ModelDescriptor,
    usage: &TokenUsage,
    cost_tracking: bool,
    span: &Span,
) -> Option<f64> {
    if !cost_tracking {
        return None;
    }

    let cost = price_usage(model, usage);
    if cost > COST_WARNING_THRESHOLD {
        tracing::warn!(
            parent: span,
            model = %model.name,
            cost,
            tokens = usage.total(),
            estimated = usage.estimated,
            "High cost API call: ${:.6} for {} tokens",
            cost,
            usage.total()
        );
    }
    Some(cost)
}

/// Running cost total of one validated call.
///
/// Only ever adds non-negative amounts, so the total never decreases.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostLedger {
    total: f64,
    priced_calls: u32,
}

impl CostLedger {
    pub fn record(&mut self, cost: Option<f64>) {
        if let Some(cost) = cost {
            self.total += cost.max(0.0);
            self.priced_calls += 1;
        }
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn priced_calls(&self) -> u32 {
        self.priced_calls
    }
}
