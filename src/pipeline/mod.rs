// src/pipeline/mod.rs

//! Pipeline entry points.
//!
//! - `run_pipeline`: connectivity check, then one run
//! - `run_monitor`: fetch → filter-new → notify → persist

pub mod filter;
pub mod notify;
pub mod run;

pub use filter::filter_new;
pub use notify::{DeliveryOutcome, DeliveryPlan, OutboundMessage, compose_messages, deliver};
pub use run::{RunReport, run_monitor, run_pipeline};
