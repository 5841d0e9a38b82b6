//! payments-runner: headless generator for synthetic telecom payments data.
//!
//! Usage:
//!   payments-runner --n-users 1000 --use-random-seed 1 --seed 42
//!   payments-runner --n-itr 4 --data-dir ./data --out payments.json

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use telecom_payments_core::{
    config::{GeneratorConfig, InputParams},
    engine::{GeneratorEngine, RunOutput},
    record::{TransactionRecord, UserRecord},
    reference::ReferenceData,
};

#[derive(Serialize)]
struct OutputTables<'a> {
    user_data: &'a [UserRecord],
    trans_data: &'a [TransactionRecord],
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let defaults = InputParams::default();
    let input = InputParams {
        n_users: parse_arg(&args, "--n-users", defaults.n_users)?,
        use_random_seed: parse_arg(&args, "--use-random-seed", defaults.use_random_seed)?,
        seed: parse_arg(&args, "--seed", defaults.seed)?,
        n_iterations: parse_arg(&args, "--n-itr", defaults.n_iterations)?,
        n_applications: parse_arg(&args, "--n-applications", defaults.n_applications)?,
        registration_start_date: parse_str(&args, "--registration-start-date")
            .unwrap_or(&defaults.registration_start_date)
            .to_string(),
        registration_end_date: parse_str(&args, "--registration-end-date")
            .unwrap_or(&defaults.registration_end_date)
            .to_string(),
        transaction_start_date: parse_str(&args, "--transaction-start-date")
            .unwrap_or(&defaults.transaction_start_date)
            .to_string(),
        transaction_end_date: parse_str(&args, "--transaction-end-date")
            .unwrap_or(&defaults.transaction_end_date)
            .to_string(),
    };
    let data_dir = parse_str(&args, "--data-dir").unwrap_or("./data");
    let out = parse_str(&args, "--out");

    let params = input.validate()?;
    log::info!("input parameters: {input:?}");

    println!("payments-runner");
    println!("  users:        {}", params.n_users);
    println!("  iterations:   {}", params.n_iterations);
    println!("  applications: {}", params.n_applications);
    match params.seed {
        Some(seed) => println!("  seed:         {seed}"),
        None => println!("  seed:         (entropy)"),
    }
    println!("  registration: {} .. {}", params.registration_start, params.registration_end);
    println!("  transactions: {} .. {}", params.transaction_start, params.transaction_end);
    println!("  data_dir:     {data_dir}");
    println!();

    let config = load_config(data_dir)?;
    let reference = ReferenceData::load(data_dir)?;
    let engine = GeneratorEngine::new(params, config, reference)?;

    let started = chrono::Local::now();
    let output = engine.run()?;
    let elapsed = chrono::Local::now() - started;

    print_summary(&output, elapsed.num_milliseconds());

    if let Some(path) = out {
        let tables = OutputTables {
            user_data: &output.user_data,
            trans_data: &output.trans_data,
        };
        let json = serde_json::to_string_pretty(&tables)?;
        std::fs::write(path, json).with_context(|| format!("cannot write {path}"))?;
        println!("  written to:   {path}");
    }

    Ok(())
}

/// `<data_dir>/model/data_model.json` if present, built-in constants otherwise.
fn load_config(data_dir: &str) -> Result<GeneratorConfig> {
    let path = format!("{data_dir}/model/data_model.json");
    if Path::new(&path).exists() {
        GeneratorConfig::load(data_dir)
    } else {
        log::warn!("{path} not found; using built-in data model");
        Ok(GeneratorConfig::default())
    }
}

fn print_summary(output: &RunOutput, elapsed_ms: i64) {
    let mut statuses: BTreeMap<String, usize> = BTreeMap::new();
    let mut codes: BTreeMap<&'static str, usize> = BTreeMap::new();
    for t in &output.trans_data {
        let status = t
            .transaction_status
            .map(|s| format!("{s:?}").to_lowercase())
            .unwrap_or_else(|| "none".into());
        *statuses.entry(status).or_default() += 1;
        if let Some(code) = t.transaction_error_code {
            *codes.entry(code.code()).or_default() += 1;
        }
    }

    println!("=== RUN SUMMARY ===");
    println!("  iterations ok:  {}", output.iterations_completed);
    println!("  iterations bad: {}", output.iterations_failed);
    println!("  users:          {}", output.user_data.len());
    println!("  transactions:   {}", output.trans_data.len());
    println!("  runtime:        {elapsed_ms} ms");
    if let (Some(first), Some(last)) = (
        output.trans_data.first().and_then(|t| t.transaction_date),
        output.trans_data.last().and_then(|t| t.transaction_date),
    ) {
        println!("  date range:     {first} .. {last}");
    }
    println!();
    println!("=== STATUS ===");
    for (status, n) in &statuses {
        let share = *n as f64 / output.trans_data.len().max(1) as f64 * 100.0;
        println!("  {status:<12} {n:>8}  ({share:.2}%)");
    }
    if !codes.is_empty() {
        println!();
        println!("=== ERROR CODES ===");
        for (code, n) in &codes {
            println!("  {code:<28} {n:>8}");
        }
    }
}

/// The value after `flag`, or `default` when the flag is absent. A value
/// that does not parse is an error naming the flag.
fn parse_arg<T>(args: &[String], flag: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match parse_str(args, flag) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("invalid value '{raw}' for {flag}: {e}")),
        None => Ok(default),
    }
}

fn parse_str<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
