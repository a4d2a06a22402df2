//! Router - resolves model names to vendors and dispatches calls

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::Span;

use crate::config::GatewayConfig;
use crate::error::{LLMError, Result};
use crate::providers::VendorAdapter;
use crate::registry::{ModelDescriptor, ModelRegistry};
use crate::types::*;

/// Anything that can serve a [`CallRequest`] by catalog model name
#[async_trait]
pub trait ModelDispatcher: Send + Sync {
    async fn dispatch(&self, request: CallRequest) -> Result<CallResult>;
}

/// The Router owns the registry and one adapter per enabled vendor
pub struct Router {
    registry: Arc<ModelRegistry>,
    adapters: HashMap<Vendor, Arc<dyn VendorAdapter>>,
    span: Span,
}

impl Router {
    /// Create a router with no adapters registered
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            adapters: HashMap::new(),
            span: Span::none(),
        }
    }

    /// Create a router with an adapter for every vendor the catalog references.
    ///
    /// A missing API key for any of those vendors fails here, at startup.
    pub fn from_config(registry: Arc<ModelRegistry>, config: &GatewayConfig, span: Span) -> Result<Self> {
        let mut router = Self::new(registry).with_span(span);
        for vendor in router.registry.vendors() {
            let adapter_span = tracing::info_span!(parent: &router.span, "adapter", vendor = %vendor);
            let adapter = config.build_adapter(vendor, adapter_span)?;
            router = router.with_adapter(adapter);
        }
        tracing::info!(
            parent: &router.span,
            vendors = router.adapters.len(),
            models = router.registry.len(),
            "Router ready"
        );
        Ok(router)
    }

    /// Register (or replace) the adapter for its vendor
    pub fn with_adapter(mut self, adapter: Arc<dyn VendorAdapter>) -> Self {
        self.adapters.insert(adapter.vendor(), adapter);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Check if an adapter is registered for `vendor`
    pub fn supports(&self, vendor: Vendor) -> bool {
        self.adapters.contains_key(&vendor)
    }

    /// All catalog model names grouped by vendor
    pub fn list_models_by_vendor(&self) -> BTreeMap<Vendor, Vec<String>> {
        self.registry.grouped_by_vendor()
    }

    pub fn describe_model(&self, name: &str) -> Result<&ModelDescriptor> {
        self.registry.get_by_name(name)
    }

    fn resolve(&self, model_name: &str) -> Result<(&ModelDescriptor, &Arc<dyn VendorAdapter>)> {
        let model = self.registry.get_by_name(model_name).map_err(|e| {
            tracing::error!(parent: &self.span, model = %model_name, "{}", e);
            e
        })?;

        let adapter = self.adapters.get(&model.vendor).ok_or_else(|| {
            let e = LLMError::UnsupportedVendor {
                vendor: model.vendor.to_string(),
            };
            tracing::error!(parent: &self.span, model = %model_name, vendor = %model.vendor, "{}", e);
            e
        })?;

        Ok((model, adapter))
    }
}

#[async_trait]
impl ModelDispatcher for Router {
    async fn dispatch(&self, request: CallRequest) -> Result<CallResult> {
        request.validate()?;
        let (model, adapter) = self.resolve(&request.model_name)?;

        tracing::debug!(
            parent: &self.span,
            model = %model.name,
            vendor = %model.vendor,
            vendor_model_id = %model.vendor_model_id,
            "Dispatching call"
        );

        adapter.call(model, &request).await.map_err(|e| {
            let routed = LLMError::RoutedCallFailed {
                model: model.name.clone(),
                vendor: model.vendor,
                source: Box::new(e),
            };
            tracing::error!(parent: &self.span, model = %model.name, vendor = %model.vendor, "{}", routed);
            routed
        })
    }
}
