//! Call commands - simple and checked

use colored::*;

use modelgate_llm::{CallRequest, Gateway, GatewayConfig, Vendor};

use crate::display;

/// Flags of the `simple` command
pub struct SimpleOptions {
    pub cost: bool,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub json: bool,
}

/// Run a single routed call
pub async fn run_simple(
    config: &GatewayConfig,
    model: &str,
    prompt: &str,
    options: SimpleOptions,
) -> anyhow::Result<()> {
    let gateway = Gateway::from_config(config)?;

    let mut request = CallRequest::new(model, prompt)
        .with_temperature(options.temperature.unwrap_or(config.request.temperature))
        .with_cost_tracking(options.cost);
    if let Some(system) = options.system {
        request = request.with_system(system);
    }
    if let Some(max_tokens) = options.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }

    let result = gateway.simple_call_with(request).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", display::simple_result(model, &result));
    Ok(())
}

/// Run a validated call; exhaustion is reported and exits non-zero
pub async fn run_checked(
    config: &GatewayConfig,
    vendor: &str,
    prompt: &str,
    cost: bool,
    json: bool,
) -> anyhow::Result<()> {
    let vendor: Vendor = vendor.parse()?;
    let gateway = Gateway::from_config(config)?;

    let result = gateway.checked_call(vendor, prompt, cost).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", display::checked_result(vendor.as_str(), &result));
    }

    if !result.is_validated() {
        anyhow::bail!(
            "no validated answer from {} ({})",
            vendor,
            result.status.to_string().yellow()
        );
    }
    Ok(())
}
