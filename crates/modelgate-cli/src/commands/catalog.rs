//! Catalog commands - no API keys required

use colored::*;

use modelgate_llm::GatewayConfig;

use crate::display;

/// List catalog models grouped by vendor
pub fn list_models(config: &GatewayConfig) -> anyhow::Result<()> {
    let registry = config.models.load_registry()?;

    println!("{}", display::banner("Models"));
    for (vendor, names) in registry.grouped_by_vendor() {
        println!();
        println!("  {}", vendor.to_string().bright_white().bold());
        for name in names {
            let model = registry.get_by_name(&name)?;
            println!(
                "    {:<18} {:<32} {}",
                name.bright_cyan(),
                model.vendor_model_id,
                model.role.to_string().bright_black()
            );
        }
    }
    println!();
    Ok(())
}

/// Show one catalog entry
pub fn describe(config: &GatewayConfig, name: &str) -> anyhow::Result<()> {
    let registry = config.models.load_registry()?;
    let model = registry.get_by_name(name)?;

    println!("{}", display::descriptor(model));
    println!();
    Ok(())
}
