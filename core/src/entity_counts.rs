//! Per-user entity counts.

use crate::{
    config::{GeneratorConfig, PoissonParams},
    error::GenResult,
    rng::GenRng,
    sampling::sample_poisson_power,
    types::Uid,
};
use serde::{Deserialize, Serialize};

/// One row per user: how many of each entity type the user owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCountRow {
    pub uid: Uid,
    pub n_devices: usize,
    pub n_cards: usize,
    pub n_ips: usize,
    pub n_transactions: usize,
    pub n_applications: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EntityCounts {
    pub rows: Vec<EntityCountRow>,
}

/// Column sums, used to size the entity pools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityTotals {
    pub devices: usize,
    pub cards: usize,
    pub ips: usize,
    pub transactions: usize,
    pub applications: usize,
}

fn draw(rng: &mut GenRng, params: PoissonParams, n: usize) -> GenResult<Vec<usize>> {
    Ok(sample_poisson_power(rng, params.lambda, n, params.power)?
        .into_iter()
        .map(|c| c as usize)
        .collect())
}

impl EntityCounts {
    /// Users are visited in a random permutation; counts are then drawn
    /// one full column at a time in the order device, card, ip,
    /// transaction, application. Transaction counts are scaled by the
    /// window length in years and truncated, so a short window can
    /// leave a user with none.
    pub fn generate(
        rng: &mut GenRng,
        user_ids: &[Uid],
        config: &GeneratorConfig,
        transaction_timescale: f64,
    ) -> GenResult<Self> {
        let n = user_ids.len();
        let order = rng.permutation(n);
        let poisson = &config.poisson;
        let devices = draw(rng, poisson.device, n)?;
        let cards = draw(rng, poisson.card, n)?;
        let ips = draw(rng, poisson.ip, n)?;
        let transactions = draw(rng, poisson.transaction, n)?;
        let applications = draw(rng, poisson.application, n)?;

        let rows = order
            .into_iter()
            .enumerate()
            .map(|(i, u)| EntityCountRow {
                uid: user_ids[u].clone(),
                n_devices: devices[i],
                n_cards: cards[i],
                n_ips: ips[i],
                n_transactions: (transactions[i] as f64 * transaction_timescale) as usize,
                n_applications: applications[i],
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn totals(&self) -> EntityTotals {
        self.rows.iter().fold(EntityTotals::default(), |t, r| EntityTotals {
            devices: t.devices + r.n_devices,
            cards: t.cards + r.n_cards,
            ips: t.ips + r.n_ips,
            transactions: t.transactions + r.n_transactions,
            applications: t.applications + r.n_applications,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn uids(n: usize) -> Vec<Uid> {
        (0..n).map(|i| format!("{i:016}")).collect()
    }

    #[test]
    fn every_user_appears_once() {
        let ids = uids(100);
        let counts = EntityCounts::generate(&mut GenRng::seeded(42), &ids, &GeneratorConfig::default(), 1.0).unwrap();
        let seen: HashSet<&Uid> = counts.rows.iter().map(|r| &r.uid).collect();
        assert_eq!(seen.len(), 100);
        assert!(counts.rows.iter().all(|r| r.n_devices >= 1 && r.n_cards >= 1 && r.n_ips >= 1));
    }

    #[test]
    fn short_window_scales_transactions_down() {
        let ids = uids(50);
        let config = GeneratorConfig::default();
        let full = EntityCounts::generate(&mut GenRng::seeded(8), &ids, &config, 1.0).unwrap();
        let tenth = EntityCounts::generate(&mut GenRng::seeded(8), &ids, &config, 0.1).unwrap();
        for (a, b) in full.rows.iter().zip(&tenth.rows) {
            assert_eq!(a.uid, b.uid);
            assert_eq!(b.n_transactions, (a.n_transactions as f64 * 0.1) as usize);
        }
    }

    #[test]
    fn totals_sum_columns() {
        let counts = EntityCounts {
            rows: vec![
                EntityCountRow { uid: "a".into(), n_devices: 1, n_cards: 2, n_ips: 3, n_transactions: 4, n_applications: 5 },
                EntityCountRow { uid: "b".into(), n_devices: 1, n_cards: 1, n_ips: 1, n_transactions: 0, n_applications: 2 },
            ],
        };
        assert_eq!(
            counts.totals(),
            EntityTotals { devices: 2, cards: 3, ips: 4, transactions: 4, applications: 7 }
        );
    }
}
