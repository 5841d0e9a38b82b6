use crate::{
    error::{GenError, GenResult},
    record::ErrorCode,
};
use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ── Distribution parameters ────────────────────────────────────────

/// Parameters of the Poisson-power count distribution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PoissonParams {
    pub lambda: f64,
    pub power: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityPoissonParams {
    pub user: PoissonParams,
    pub device: PoissonParams,
    pub card: PoissonParams,
    pub ip: PoissonParams,
    pub application: PoissonParams,
    pub transaction: PoissonParams,
}

/// Proportion of each pool that takes part in a sharing network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedProportions {
    pub device: f64,
    pub card: f64,
    pub ip: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusProportions {
    pub successful: f64,
    pub pending: f64,
    pub rejected: f64,
}

/// Cents knocked off a whole-unit price, e.g. 3.00 - 0.01 = 2.99.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceRemainder {
    pub remainder: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Probability an ip keeps its own country instead of the registration country.
    pub prob_ip_shared: f64,
    /// Probability a card keeps its own country instead of the registration country.
    pub prob_card_shared: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionCodeWeights {
    pub fraud: BTreeMap<ErrorCode, f64>,
    pub connection: BTreeMap<ErrorCode, f64>,
    pub user: BTreeMap<ErrorCode, f64>,
    pub funds: BTreeMap<ErrorCode, f64>,
    pub authentication: BTreeMap<ErrorCode, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionConfig {
    /// Divides the per-row uniform draw; higher means fewer rejections.
    pub scaling_factor: f64,
    /// Rejection rate keyed by number of distinct country codes on a row.
    pub inconsistent_country_rates: BTreeMap<usize, f64>,
    /// Successful share for transactions without a card; the rest are pending.
    pub card_less_successful: f64,
    pub codes: RejectionCodeWeights,
}

// ── Generator config ───────────────────────────────────────────────

/// Every distribution constant of the data model, enumerated once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub identity_byte_length: usize,
    pub poisson: EntityPoissonParams,
    pub shared_proportions: SharedProportions,
    pub card_null_rate: f64,
    pub card_types: BTreeMap<String, f64>,
    pub payment_channels: BTreeMap<String, f64>,
    pub transaction_status: StatusProportions,
    pub non_card_methods: BTreeMap<String, f64>,
    pub amount_scale: f64,
    pub price_remainders: Vec<PriceRemainder>,
    pub alignment: AlignmentConfig,
    pub rejection: RejectionConfig,
}

fn weights<K: Ord + Clone>(pairs: &[(K, f64)]) -> BTreeMap<K, f64> {
    pairs.iter().cloned().collect()
}

fn code_weights(w: [f64; 5]) -> BTreeMap<ErrorCode, f64> {
    ErrorCode::ALL.iter().copied().zip(w).collect()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            identity_byte_length: 16,
            poisson: EntityPoissonParams {
                user: PoissonParams { lambda: 20.0, power: 1 },
                device: PoissonParams { lambda: 0.2, power: 2 },
                card: PoissonParams { lambda: 0.1, power: 2 },
                ip: PoissonParams { lambda: 1.3, power: 2 },
                application: PoissonParams { lambda: 1.0, power: 2 },
                transaction: PoissonParams { lambda: 5.0, power: 2 },
            },
            shared_proportions: SharedProportions {
                device: 0.01,
                card: 0.005,
                ip: 0.05,
            },
            card_null_rate: 0.05,
            card_types: weights(&[("visa".to_string(), 0.5), ("mastercard".to_string(), 0.5)]),
            payment_channels: weights(&[
                ("paypal".to_string(), 0.40),
                ("adyen".to_string(), 0.15),
                ("appstore".to_string(), 0.25),
                ("worldpay".to_string(), 0.15),
                ("docomo".to_string(), 0.05),
            ]),
            transaction_status: StatusProportions {
                successful: 0.94,
                pending: 0.03,
                rejected: 0.03,
            },
            non_card_methods: weights(&[("wallet".to_string(), 0.95), ("points".to_string(), 0.05)]),
            amount_scale: 2.0,
            price_remainders: vec![
                PriceRemainder { remainder: 0.01, weight: 0.40 },
                PriceRemainder { remainder: 0.50, weight: 0.10 },
                PriceRemainder { remainder: 0.45, weight: 0.10 },
                PriceRemainder { remainder: 0.51, weight: 0.10 },
                PriceRemainder { remainder: 0.41, weight: 0.10 },
                PriceRemainder { remainder: 0.71, weight: 0.10 },
                PriceRemainder { remainder: 1.00, weight: 0.10 },
            ],
            alignment: AlignmentConfig {
                prob_ip_shared: 0.05,
                prob_card_shared: 0.01,
            },
            rejection: RejectionConfig {
                scaling_factor: 2.0,
                inconsistent_country_rates: weights(&[(1, 0.001), (2, 0.005), (3, 0.01)]),
                card_less_successful: 0.98,
                codes: RejectionCodeWeights {
                    // Order: timeout, fraud, authentication, cancelled, funds
                    fraud: code_weights([0.10, 0.55, 0.20, 0.05, 0.10]),
                    connection: code_weights([0.45, 0.10, 0.20, 0.15, 0.10]),
                    user: code_weights([0.05, 0.10, 0.10, 0.45, 0.30]),
                    funds: code_weights([0.10, 0.10, 0.10, 0.25, 0.45]),
                    authentication: code_weights([0.25, 0.05, 0.45, 0.15, 0.10]),
                },
            },
        }
    }
}

impl GeneratorConfig {
    /// Load from `<data_dir>/model/data_model.json`.
    /// Missing keys fall back to `GeneratorConfig::default()`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/model/data_model.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: GeneratorConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(config)
    }

    pub fn validate(&self) -> GenResult<()> {
        if self.identity_byte_length == 0 {
            return Err(GenError::Configuration(
                "identity_byte_length must be >= 1".into(),
            ));
        }
        let poisson = &self.poisson;
        for (name, p) in [
            ("user", poisson.user),
            ("device", poisson.device),
            ("card", poisson.card),
            ("ip", poisson.ip),
            ("application", poisson.application),
            ("transaction", poisson.transaction),
        ] {
            if !p.lambda.is_finite() || p.lambda < 0.0 {
                return Err(GenError::Configuration(format!(
                    "Invalid {name} lambda {}; must be >= 0.",
                    p.lambda
                )));
            }
        }
        for (name, p) in [
            ("shared device proportion", self.shared_proportions.device),
            ("shared card proportion", self.shared_proportions.card),
            ("shared ip proportion", self.shared_proportions.ip),
            ("card null rate", self.card_null_rate),
            ("ip alignment probability", self.alignment.prob_ip_shared),
            ("card alignment probability", self.alignment.prob_card_shared),
            ("card-less successful share", self.rejection.card_less_successful),
        ] {
            check_probability(name, p)?;
        }
        check_weights("card_types", self.card_types.values())?;
        check_weights("payment_channels", self.payment_channels.values())?;
        check_weights("non_card_methods", self.non_card_methods.values())?;
        check_weights("price_remainders", self.price_remainders.iter().map(|r| &r.weight))?;
        let status = &self.transaction_status;
        check_weights(
            "transaction_status",
            [status.successful, status.pending, status.rejected].iter(),
        )?;
        if status.successful + status.pending <= 0.0 {
            return Err(GenError::Configuration(
                "transaction_status: successful + pending must be > 0".into(),
            ));
        }
        if !(self.rejection.scaling_factor > 0.0) {
            return Err(GenError::Configuration(format!(
                "Invalid rejection scaling factor {}; must be > 0.",
                self.rejection.scaling_factor
            )));
        }
        let codes = &self.rejection.codes;
        for (name, table) in [
            ("fraud", &codes.fraud),
            ("connection", &codes.connection),
            ("user", &codes.user),
            ("funds", &codes.funds),
            ("authentication", &codes.authentication),
        ] {
            check_weights(&format!("rejection codes ({name})"), table.values())?;
        }
        if !(self.amount_scale > 0.0) {
            return Err(GenError::Configuration(format!(
                "Invalid amount scale {}; must be > 0.",
                self.amount_scale
            )));
        }
        Ok(())
    }
}

fn check_probability(name: &str, p: f64) -> GenResult<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(GenError::Configuration(format!(
            "Invalid {name} {p}; must be within [0, 1]."
        )));
    }
    Ok(())
}

fn check_weights<'a>(name: &str, values: impl Iterator<Item = &'a f64>) -> GenResult<()> {
    let mut total = 0.0;
    for v in values {
        if !v.is_finite() || *v < 0.0 {
            return Err(GenError::Configuration(format!(
                "{name}: weight {v} must be finite and >= 0"
            )));
        }
        total += v;
    }
    if total <= 0.0 {
        return Err(GenError::Configuration(format!(
            "{name}: weights must sum to a positive total"
        )));
    }
    Ok(())
}

// ── Programme parameters ───────────────────────────────────────────

/// Raw programme input as supplied by a command line or API layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputParams {
    pub n_users: i64,
    pub use_random_seed: i64,
    pub seed: u64,
    pub n_iterations: i64,
    pub n_applications: i64,
    pub registration_start_date: String,
    pub registration_end_date: String,
    pub transaction_start_date: String,
    pub transaction_end_date: String,
}

impl Default for InputParams {
    fn default() -> Self {
        let today = Local::now().date_naive();
        let fmt = |d: NaiveDate| d.format(DATE_FORMAT).to_string();
        Self {
            n_users: 100,
            use_random_seed: 0,
            seed: 42,
            n_iterations: 1,
            n_applications: 20_000,
            registration_start_date: fmt(today - Duration::days(731)),
            registration_end_date: fmt(today - Duration::days(366)),
            transaction_start_date: fmt(today - Duration::days(365)),
            transaction_end_date: fmt(today),
        }
    }
}

/// Validated, typed programme parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgrammeParams {
    pub n_users: usize,
    /// None means every iteration is seeded from entropy.
    pub seed: Option<u64>,
    pub n_iterations: usize,
    pub n_applications: usize,
    pub registration_start: NaiveDate,
    pub registration_end: NaiveDate,
    pub transaction_start: NaiveDate,
    pub transaction_end: NaiveDate,
}

impl InputParams {
    /// Fails fast with a descriptive message before any sampling occurs.
    pub fn validate(&self) -> GenResult<ProgrammeParams> {
        let n_users = positive("n_users", self.n_users)?;
        if !matches!(self.use_random_seed, 0 | 1) {
            return Err(GenError::Configuration(format!(
                "Invalid use_random_seed value {}; must be either 0 or 1.",
                self.use_random_seed
            )));
        }
        let n_iterations = positive("n_iterations", self.n_iterations)?;
        let n_applications = positive("n_applications", self.n_applications)?;

        let registration_start = parse_date("registration_start_date", &self.registration_start_date)?;
        let registration_end = parse_date("registration_end_date", &self.registration_end_date)?;
        let transaction_start = parse_date("transaction_start_date", &self.transaction_start_date)?;
        let transaction_end = parse_date("transaction_end_date", &self.transaction_end_date)?;
        ordered_window("registration", registration_start, registration_end)?;
        ordered_window("transaction", transaction_start, transaction_end)?;

        Ok(ProgrammeParams {
            n_users,
            seed: (self.use_random_seed == 1).then_some(self.seed),
            n_iterations,
            n_applications,
            registration_start,
            registration_end,
            transaction_start,
            transaction_end,
        })
    }
}

impl ProgrammeParams {
    /// Length of the transaction window in years (inclusive of both ends).
    pub fn transaction_timescale(&self) -> f64 {
        ((self.transaction_end - self.transaction_start).num_days() + 1) as f64 / 365.0
    }
}

fn positive(name: &str, value: i64) -> GenResult<usize> {
    if value < 1 {
        return Err(GenError::Configuration(format!(
            "Invalid {name} parameter value {value}; must be an integer >= 1."
        )));
    }
    Ok(value as usize)
}

fn parse_date(name: &str, value: &str) -> GenResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| {
        GenError::Configuration(format!(
            "Invalid {name} value '{value}'; must be of the form YYYY-MM-DD ({e})."
        ))
    })
}

fn ordered_window(name: &str, start: NaiveDate, end: NaiveDate) -> GenResult<()> {
    if start > end {
        return Err(GenError::Configuration(format!(
            "Invalid {name} window: start {start} is after end {end}."
        )));
    }
    Ok(())
}
