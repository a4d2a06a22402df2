//! ModelGate LLM - Uniform Vendor Access with Validated Calls
//!
//! This crate puts OpenAI, Anthropic and Gemini behind one call shape:
//!
//! ## Layers
//! - [`registry`]: the model catalog (name -> vendor, vendor model id, role, prices)
//! - [`providers`]: one [`VendorAdapter`] per vendor, normalizing request and reply
//! - [`router`]: resolves a model name to its vendor and dispatches
//! - [`validation`]: the consensus-then-verify retry loop behind checked calls
//! - [`gateway`]: the public entry points, `simple_call` and `checked_call`
//!
//! ## Checked calls
//!
//! 1. Three samples from the vendor's `high` model must be byte-identical
//! 2. A `budget` model verifies them, answering or replying `%FALSE%`
//! 3. At most five attempts; exhaustion is a normal `validation_failed` result
//! 4. A provider fault on the last attempt is an error, not a result

pub mod config;
pub mod cost;
pub mod error;
pub mod gateway;
pub mod providers;
pub mod registry;
pub mod router;
pub mod types;
pub mod validation;

#[cfg(test)]
mod log_capture;

pub use self::config::*;
pub use cost::*;
pub use error::*;
pub use gateway::*;
pub use providers::*;
pub use registry::*;
pub use router::*;
pub use types::*;
pub use validation::*;
