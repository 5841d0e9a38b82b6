//! Synthetic telecom-payment dataset generator.
//!
//! Builds users and their devices, cards, ips, applications and
//! transactions from a seeded stream, joins them to transaction grain,
//! reconciles country codes and dates, then decides a status and error
//! code for every transaction.

pub mod alignment;
pub mod config;
pub mod engine;
pub mod entity_counts;
pub mod error;
pub mod name_generator;
pub mod pool;
pub mod record;
pub mod reference;
pub mod rejection_rates;
pub mod rng;
pub mod sampling;
pub mod shared_graph;
pub mod status_engine;
pub mod transaction_assembly;
pub mod types;
pub mod user_assembly;
