//! Gateway - the two public entry points
//!
//! `simple_call` is a single routed call. `checked_call` runs the
//! consensus-then-verify loop for a vendor.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::Span;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::registry::ModelDescriptor;
use crate::router::{ModelDispatcher, Router};
use crate::types::*;
use crate::validation::ValidationOrchestrator;

/// Facade over the router and the validation loop
pub struct Gateway {
    router: Arc<Router>,
    orchestrator: ValidationOrchestrator,
    temperature: f32,
    span: Span,
}

impl Gateway {
    /// Wire up a gateway from configuration.
    ///
    /// Loads secrets, the catalog and one adapter per catalog vendor. Fails
    /// if any of those vendors has no API key.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        config.load_secrets()?;
        let registry = Arc::new(config.models.load_registry()?);
        let span = tracing::info_span!("gateway");
        let router_span = tracing::info_span!(parent: &span, "router");
        let router = Router::from_config(registry, config, router_span)?;
        Ok(Self::new(Arc::new(router), config).with_span(span))
    }

    /// Build a gateway around an existing router
    pub fn new(router: Arc<Router>, config: &GatewayConfig) -> Self {
        let dispatcher: Arc<dyn ModelDispatcher> = router.clone();
        let orchestrator = ValidationOrchestrator::new(router.registry().clone(), dispatcher)
            .with_temperature(config.request.temperature)
            .with_concurrent_samples(config.validation.concurrent_samples);
        Self {
            router,
            orchestrator,
            temperature: config.request.temperature,
            span: Span::none(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.orchestrator = self
            .orchestrator
            .with_span(tracing::info_span!(parent: &span, "validation"));
        self.span = span;
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// One call to `model_name` at the configured temperature.
    pub async fn simple_call(
        &self,
        model_name: &str,
        prompt: &str,
        cost_tracking: bool,
    ) -> Result<SimpleCallResult> {
        let request = CallRequest::new(model_name, prompt)
            .with_temperature(self.temperature)
            .with_cost_tracking(cost_tracking);
        self.simple_call_with(request).await
    }

    /// One call with full control over the request
    pub async fn simple_call_with(&self, request: CallRequest) -> Result<SimpleCallResult> {
        tracing::info!(parent: &self.span, model = %request.model_name, "Simple call");

        let prompt = request.prompt.clone();
        let result = self.router.dispatch(request).await?;

        tracing::info!(
            parent: &self.span,
            model_used = %result.model_used,
            finish_reason = ?result.finish_reason,
            input_tokens = result.usage.input_tokens,
            output_tokens = result.usage.output_tokens,
            "Simple call completed"
        );
        if let Some(cost) = result.cost {
            tracing::info!(parent: &self.span, cost, "Call cost: ${:.6}", cost);
        }

        Ok(SimpleCallResult {
            prompt,
            response: result.response_text,
            model_used: result.model_used,
            finish_reason: result.finish_reason,
            cost: result.cost,
        })
    }

    /// Validated call against `vendor`'s high and budget models.
    pub async fn checked_call(
        &self,
        vendor: Vendor,
        prompt: &str,
        cost_tracking: bool,
    ) -> Result<ValidationResult> {
        let call_id = Uuid::new_v4();
        let span = tracing::info_span!(parent: &self.span, "checked_call", %call_id, vendor = %vendor);
        tracing::info!(parent: &span, "Checked call");

        let result = self
            .orchestrator
            .validated_call(vendor, prompt, cost_tracking)
            .await
            .map_err(|e| {
                tracing::error!(parent: &span, "Checked call failed: {}", e);
                e
            })?;

        tracing::info!(
            parent: &span,
            status = %result.status,
            attempts = result.attempts_used,
            model = %result.model_label,
            "Checked call finished"
        );
        if let Some(total) = result.total_cost {
            tracing::info!(parent: &span, total_cost = total, "Total validation cost: ${:.6}", total);
        }
        Ok(result)
    }

    /// Catalog model names grouped by vendor
    pub fn list_models_by_vendor(&self) -> BTreeMap<Vendor, Vec<String>> {
        self.router.list_models_by_vendor()
    }

    pub fn describe_model(&self, name: &str) -> Result<&ModelDescriptor> {
        self.router.describe_model(name)
    }
}
