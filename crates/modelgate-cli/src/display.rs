//! Terminal rendering of call results and catalog entries
//!
//! Renderers build strings; commands decide when to print them.

use colored::*;

use modelgate_llm::{ModelDescriptor, SimpleCallResult, ValidationResult, ValidationStatus};

const RULE_WIDTH: usize = 60;
const LABEL_WIDTH: usize = 16;

fn rule() -> String {
    "─".repeat(RULE_WIDTH).bright_black().to_string()
}

/// Title between two rules
pub fn banner(title: &str) -> String {
    format!("\n{}\n {}\n{}", rule(), title.bright_white().bold(), rule())
}

/// Label padded to a fixed column, then the value
pub fn field(label: &str, value: &str) -> String {
    format!("  {:<width$} {}", label, value.bright_cyan(), width = LABEL_WIDTH)
}

/// Dollar amount at per-token precision
pub fn dollars(amount: f64) -> String {
    format!("${:.6}", amount)
}

/// Model reply, indented and set off by blank lines
pub fn reply(text: &str) -> String {
    let body: Vec<String> = text.lines().map(|line| format!("    {}", line)).collect();
    format!("\n{}\n", body.join("\n"))
}

/// One-line verdict of a validated call
pub fn verdict(status: ValidationStatus, attempts: u32) -> String {
    match status {
        ValidationStatus::Validated => format!(
            "  {} validated after {} attempt(s)",
            "●".bright_green(),
            attempts
        ),
        ValidationStatus::ValidationFailed => format!(
            "  {} {}",
            "●".bright_red(),
            format!("no agreement after {} attempts", attempts).bright_red()
        ),
    }
}

pub fn simple_result(model: &str, result: &SimpleCallResult) -> String {
    let mut lines = vec![
        banner(&format!("{} -> {}", model, result.model_used)),
        reply(&result.response),
        field("finish", &result.finish_reason.to_string()),
    ];
    if let Some(cost) = result.cost {
        lines.push(field("cost", &dollars(cost)));
    }
    lines.join("\n")
}

pub fn checked_result(vendor: &str, result: &ValidationResult) -> String {
    let mut lines = vec![
        banner(&format!("checked call / {}", vendor)),
        verdict(result.status, result.attempts_used),
        reply(&result.response),
        field("models", &result.model_label),
    ];
    if let Some(total) = result.total_cost {
        lines.push(field("total cost", &dollars(total)));
    }
    lines.join("\n")
}

pub fn descriptor(model: &ModelDescriptor) -> String {
    [
        banner(&model.name),
        field("vendor", model.vendor.as_str()),
        field("vendor model", &model.vendor_model_id),
        field("role", &model.role.to_string()),
        field("input", &per_million(model.price_per_input_token)),
        field("output", &per_million(model.price_per_output_token)),
    ]
    .join("\n")
}

fn per_million(price_per_token: f64) -> String {
    format!("${:.2} / 1M tokens", price_per_token * 1_000_000.0)
}
