use super::{EntityPool, PoolCore};
use crate::{
    config::GeneratorConfig,
    error::GenResult,
    rng::GenRng,
    sampling::{sample_categories, IdKind},
    types::{EntityKind, IdHash},
};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ApplicationPool {
    core: PoolCore,
    pub payment_channels: HashMap<IdHash, String>,
}

impl ApplicationPool {
    pub fn generate(rng: &mut GenRng, n: usize, config: &GeneratorConfig) -> GenResult<Self> {
        let core = PoolCore::generate(
            rng,
            EntityKind::Application,
            IdKind::Hash,
            n,
            config.poisson.application,
            config.identity_byte_length,
        )?;
        let table: Vec<(&str, f64)> = config
            .payment_channels
            .iter()
            .map(|(k, w)| (k.as_str(), *w))
            .collect();
        let payment_channels = sample_categories(rng, &core.identities, &table);
        Ok(Self {
            core,
            payment_channels,
        })
    }

    /// Application popularity weights in allocation order.
    pub fn weights(&self) -> Vec<f64> {
        self.core
            .identities
            .iter()
            .map(|id| self.core.proportions.get(id).copied().unwrap_or(0.0))
            .collect()
    }
}

impl EntityPool for ApplicationPool {
    fn core(&self) -> &PoolCore {
        &self.core
    }
}
