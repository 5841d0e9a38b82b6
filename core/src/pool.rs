//! Entity pools: one per entity type, each owning its identities,
//! global popularity counts and type-specific attribute maps.
//!
//! RULE: a pool is built once from the iteration's RNG and is
//! immutable afterwards.

pub mod application;
pub mod card;
pub mod device;
pub mod ip;
pub mod transaction;
pub mod user;

pub use application::ApplicationPool;
pub use card::CardPool;
pub use device::DevicePool;
pub use ip::IpPool;
pub use transaction::TransactionPool;
pub use user::UserPool;

use crate::{
    config::PoissonParams,
    error::{GenError, GenResult},
    reference::ReferenceData,
    rng::GenRng,
    sampling::{counts_to_proportions, IdKind, IdentityCounts},
    shared_graph,
    types::{CountryNumeric, EntityKind, IdHash, SharedIdMap},
};
use std::collections::HashMap;

const PROPORTION_TOLERANCE: f64 = 1e-9;

/// State every pool carries regardless of type.
#[derive(Debug, Clone)]
pub struct PoolCore {
    pub kind: EntityKind,
    /// Allocation order. All downstream iteration goes through this list.
    pub identities: Vec<IdHash>,
    pub counts: HashMap<IdHash, u64>,
    pub proportions: HashMap<IdHash, f64>,
}

impl PoolCore {
    pub fn generate(
        rng: &mut GenRng,
        kind: EntityKind,
        id_kind: IdKind,
        n: usize,
        params: PoissonParams,
        byte_length: usize,
    ) -> GenResult<Self> {
        let IdentityCounts { identities, counts } =
            IdentityCounts::generate(rng, id_kind, n, params, byte_length)?;
        let proportions = counts_to_proportions(&counts);
        check_proportions(kind.name(), &proportions)?;
        log::debug!("pool {}: {} identities", kind.name(), identities.len());
        Ok(Self {
            kind,
            identities,
            counts,
            proportions,
        })
    }
}

fn check_proportions(name: &str, proportions: &HashMap<IdHash, f64>) -> GenResult<()> {
    if proportions.is_empty() {
        return Ok(());
    }
    let total: f64 = proportions.values().sum();
    if (total - 1.0).abs() > PROPORTION_TOLERANCE {
        return Err(GenError::InvariantViolation(format!(
            "{name} proportions sum to {total}, expected 1.0"
        )));
    }
    Ok(())
}

/// Every pool one iteration needs, built in a fixed order.
#[derive(Debug, Clone)]
pub struct EntityPools {
    pub user: UserPool,
    pub device: DevicePool,
    pub card: CardPool,
    pub ip: IpPool,
    pub transaction: TransactionPool,
    pub application: ApplicationPool,
}

/// Read access shared by all pools.
pub trait EntityPool {
    fn core(&self) -> &PoolCore;

    /// Sharing networks, for pools that have them.
    fn shared_map(&self) -> Option<&SharedIdMap> {
        None
    }

    fn kind(&self) -> EntityKind {
        self.core().kind
    }

    fn identities(&self) -> &[IdHash] {
        &self.core().identities
    }

    fn len(&self) -> usize {
        self.core().identities.len()
    }

    fn is_empty(&self) -> bool {
        self.core().identities.is_empty()
    }

    /// The canonical identity after applying the sharing networks.
    fn canonical<'a>(&'a self, id: &'a str) -> &'a str {
        match self.shared_map() {
            Some(map) => shared_graph::canonical(map, id),
            None => id,
        }
    }
}

/// One ISO numeric country per identity, weighted by population.
pub fn assign_country_codes(
    rng: &mut GenRng,
    identities: &[IdHash],
    reference: &ReferenceData,
) -> GenResult<HashMap<IdHash, CountryNumeric>> {
    let proportions = reference.population_proportions()?;
    let weights: Vec<f64> = proportions.iter().map(|(_, p)| *p).collect();
    Ok(identities
        .iter()
        .map(|id| {
            let i = rng.weighted_index(&weights);
            (id.clone(), proportions[i].0)
        })
        .collect())
}
