use super::{EntityPool, PoolCore};
use crate::{
    config::{GeneratorConfig, PriceRemainder, ProgrammeParams, StatusProportions},
    error::GenResult,
    record::TransactionStatus,
    rng::GenRng,
    sampling::{sample_dates, IdKind},
    types::{EntityKind, IdHash},
};
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct TransactionPool {
    core: PoolCore,
    pub dates: HashMap<IdHash, NaiveDate>,
    /// Baseline status before the decision engine runs.
    pub statuses: HashMap<IdHash, TransactionStatus>,
    pub amounts: HashMap<IdHash, f64>,
}

impl TransactionPool {
    pub fn generate(
        rng: &mut GenRng,
        n: usize,
        params: &ProgrammeParams,
        config: &GeneratorConfig,
    ) -> GenResult<Self> {
        let core = PoolCore::generate(
            rng,
            EntityKind::Transaction,
            IdKind::Hash,
            n,
            config.poisson.transaction,
            config.identity_byte_length,
        )?;
        let dates = sample_dates(
            rng,
            &core.identities,
            params.transaction_start,
            params.transaction_end,
        );
        let statuses = sample_statuses(rng, &core.identities, &config.transaction_status);
        let amounts = gen_transaction_amounts(
            rng,
            &core.identities,
            config.amount_scale,
            &config.price_remainders,
        )?;
        Ok(Self {
            core,
            dates,
            statuses,
            amounts,
        })
    }
}

impl EntityPool for TransactionPool {
    fn core(&self) -> &PoolCore {
        &self.core
    }
}

fn sample_statuses(
    rng: &mut GenRng,
    identities: &[IdHash],
    proportions: &StatusProportions,
) -> HashMap<IdHash, TransactionStatus> {
    let table = [
        (TransactionStatus::Successful, proportions.successful),
        (TransactionStatus::Pending, proportions.pending),
        (TransactionStatus::Rejected, proportions.rejected),
    ];
    let weights: Vec<f64> = table.iter().map(|(_, w)| *w).collect();
    identities
        .iter()
        .map(|id| (id.clone(), table[rng.weighted_index(&weights)].0))
        .collect()
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Store-style prices: `round2(|N(0, scale)|^2)` lifted to the next whole
/// unit, minus a weighted remainder (e.g. 3 - 0.01 = 2.99), floored at 0.
/// Zero stays zero and draws no remainder.
pub fn gen_transaction_amounts(
    rng: &mut GenRng,
    identities: &[IdHash],
    scale: f64,
    remainders: &[PriceRemainder],
) -> GenResult<HashMap<IdHash, f64>> {
    let weights: Vec<f64> = remainders.iter().map(|r| r.weight).collect();
    let mut amounts = HashMap::with_capacity(identities.len());
    for id in identities {
        let base = round2(rng.normal(0.0, scale)?.abs().powi(2));
        let amount = if base == 0.0 || remainders.is_empty() {
            base
        } else {
            let remainder = remainders[rng.weighted_index(&weights)].remainder;
            round2((base.ceil() - remainder).max(0.0))
        };
        amounts.insert(id.clone(), amount);
    }
    Ok(amounts)
}
