//! The generation engine.
//!
//! EXECUTION ORDER per iteration (fixed, never reordered; each stage
//! consumes the iteration's single RNG stream in turn):
//!   1. User pool
//!   2. Entity counts
//!   3. Device, card, ip, transaction, application pools
//!   4. Iteration hash
//!   5. User assembly
//!   6. Transaction assembly
//!   7. Country alignment, then ip and card majority passes
//!   8. Date alignment
//!   9. Rejection rates and status cascade
//!
//! RULES:
//!   - One iteration owns one `GenRng`; iterations share nothing mutable.
//!   - At most one worker per core; results are collected in iteration order.
//!   - A failed iteration is logged and dropped; it is never retried.

use crate::{
    alignment::{align_country_codes, align_dates, canonicalize_entity_countries, CountryColumn},
    config::{GeneratorConfig, InputParams, ProgrammeParams},
    entity_counts::EntityCounts,
    error::{GenError, GenResult},
    pool::{
        ApplicationPool, CardPool, DevicePool, EntityPool, EntityPools, IpPool, TransactionPool,
        UserPool,
    },
    record::{TransactionRecord, UserRecord},
    reference::ReferenceData,
    rejection_rates::RejectionRates,
    rng::{GenRng, RngBank},
    status_engine::assign_statuses,
    transaction_assembly::assemble_transactions,
    user_assembly::{assemble_users, gen_itr_hash},
};
use rayon::prelude::*;
use std::collections::HashMap;

/// Tables produced by one iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IterationOutput {
    pub user_data: Vec<UserRecord>,
    pub trans_data: Vec<TransactionRecord>,
}

/// Concatenated output of a whole run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutput {
    pub user_data: Vec<UserRecord>,
    pub trans_data: Vec<TransactionRecord>,
    pub iterations_completed: usize,
    pub iterations_failed: usize,
}

pub struct GeneratorEngine {
    pub params: ProgrammeParams,
    pub config: GeneratorConfig,
    pub reference: ReferenceData,
}

impl GeneratorEngine {
    /// Validates the model configuration before any sampling.
    pub fn new(
        params: ProgrammeParams,
        config: GeneratorConfig,
        reference: ReferenceData,
    ) -> GenResult<Self> {
        config.validate()?;
        reference.validate()?;
        Ok(Self {
            params,
            config,
            reference,
        })
    }

    /// Small seeded engine over the built-in test reference set.
    pub fn build_test(seed: u64, n_users: usize) -> GenResult<Self> {
        let params = InputParams {
            n_users: n_users as i64,
            use_random_seed: 1,
            seed,
            n_iterations: 1,
            n_applications: 200,
            registration_start_date: "2021-01-01".into(),
            registration_end_date: "2021-12-31".into(),
            transaction_start_date: "2022-01-01".into(),
            transaction_end_date: "2022-12-31".into(),
        }
        .validate()?;
        Self::new(params, GeneratorConfig::default(), ReferenceData::default_test())
    }

    pub fn rng_bank(&self) -> RngBank {
        match self.params.seed {
            Some(seed) => RngBank::new(seed),
            None => RngBank::unseeded(),
        }
    }

    /// Build every pool for one iteration.
    pub fn build_pools(&self, rng: &mut GenRng) -> GenResult<(EntityCounts, EntityPools)> {
        let (params, config, reference) = (&self.params, &self.config, &self.reference);

        let user = UserPool::generate(rng, params, config, reference)?;
        let counts = EntityCounts::generate(
            rng,
            user.identities(),
            config,
            params.transaction_timescale(),
        )?;
        let totals = counts.totals();
        log::debug!("entity totals: {totals:?}");

        let device = DevicePool::generate(rng, totals.devices, config, reference)?;
        let card = CardPool::generate(rng, totals.cards, config, reference)?;
        let ip = IpPool::generate(rng, totals.ips, config, reference)?;
        let transaction = TransactionPool::generate(rng, totals.transactions, params, config)?;
        let application = ApplicationPool::generate(rng, params.n_applications, config)?;

        Ok((
            counts,
            EntityPools {
                user,
                device,
                card,
                ip,
                transaction,
                application,
            },
        ))
    }

    /// Generate one complete dataset from `rng`.
    pub fn run_iteration(&self, rng: &mut GenRng) -> GenResult<IterationOutput> {
        let config = &self.config;
        let country_map = self.reference.country_code_map();

        let (counts, pools) = self.build_pools(rng)?;
        log::info!(
            "[{}] pools built: {} users, {} transactions",
            rng.name,
            pools.user.len(),
            pools.transaction.len()
        );

        let itr_hash = gen_itr_hash(rng);
        let user_data = assemble_users(rng, &counts, &pools, &country_map, &itr_hash)?;
        let mut trans_data = assemble_transactions(rng, &user_data, &pools, config, &country_map)?;

        align_country_codes(rng, &mut trans_data, &config.alignment);
        canonicalize_entity_countries(&mut trans_data, CountryColumn::Ip);
        canonicalize_entity_countries(&mut trans_data, CountryColumn::Card);
        align_dates(rng, &mut trans_data, &self.params);

        let rates = RejectionRates::compute(&trans_data, &self.reference);
        assign_statuses(rng, &mut trans_data, &rates, config)?;

        trans_data.sort_by_key(|t| t.transaction_date);
        log::info!(
            "[{}] iteration {itr_hash}: {} users, {} transactions",
            rng.name,
            user_data.len(),
            trans_data.len()
        );
        Ok(IterationOutput {
            user_data,
            trans_data,
        })
    }

    /// Run every iteration on a pool sized to the available cores.
    pub fn run(&self) -> GenResult<RunOutput> {
        let workers = std::thread::available_parallelism().map_or(1, |n| n.get());
        self.run_with_workers(workers)
    }

    /// Run iterations on at most `workers` threads, then concatenate in
    /// iteration order and re-sort. Fails only if no iteration succeeds.
    /// Output does not depend on `workers`.
    pub fn run_with_workers(&self, workers: usize) -> GenResult<RunOutput> {
        let bank = self.rng_bank();
        let n = self.params.n_iterations;
        let workers = workers.clamp(1, n.max(1));
        log::info!(
            "running {n} iteration(s) on {workers} worker(s), {}",
            if bank.is_seeded() { "seeded" } else { "unseeded" }
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| GenError::Configuration(format!("cannot build worker pool: {e}")))?;
        let results: Vec<GenResult<IterationOutput>> = pool.install(|| {
            (0..n as u64)
                .into_par_iter()
                .map(|i| self.run_iteration(&mut bank.for_iteration(i)))
                .collect()
        });

        let mut output = RunOutput::default();
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(it) => {
                    output.user_data.extend(it.user_data);
                    output.trans_data.extend(it.trans_data);
                    output.iterations_completed += 1;
                }
                Err(e) => {
                    log::error!("iteration {i} failed and is excluded: {e}");
                    output.iterations_failed += 1;
                }
            }
        }
        if output.iterations_completed == 0 {
            return Err(GenError::InvariantViolation(format!(
                "all {n} iteration(s) failed"
            )));
        }

        output.user_data.sort_by(|a, b| a.uid.cmp(&b.uid));
        output.trans_data.sort_by_key(|t| t.transaction_date);
        warn_on_uid_collisions(&output.user_data);
        Ok(output)
    }
}

/// Iterations draw identities independently, so the same uid can turn
/// up in two of them. Collisions are reported, not reconciled.
fn warn_on_uid_collisions(users: &[UserRecord]) {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    let mut collisions = 0usize;
    for user in users {
        if let Some(other) = owners.insert(&user.uid, &user.itr_hash) {
            if other != user.itr_hash {
                collisions += 1;
            }
        }
    }
    if collisions > 0 {
        log::warn!("{collisions} uid(s) appear in more than one iteration");
    }
}
