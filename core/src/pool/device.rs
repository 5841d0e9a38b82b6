use super::{EntityPool, PoolCore};
use crate::{
    config::GeneratorConfig,
    error::GenResult,
    reference::ReferenceData,
    rng::GenRng,
    sampling::{sample_categories, IdKind},
    shared_graph::build_shared_map,
    types::{EntityKind, IdHash, SharedIdMap},
};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct DevicePool {
    core: PoolCore,
    /// Smartphone model per device.
    pub device_types: HashMap<IdHash, String>,
    pub shared_map: SharedIdMap,
}

impl DevicePool {
    pub fn generate(
        rng: &mut GenRng,
        n: usize,
        config: &GeneratorConfig,
        reference: &ReferenceData,
    ) -> GenResult<Self> {
        let core = PoolCore::generate(
            rng,
            EntityKind::Device,
            IdKind::Hash,
            n,
            config.poisson.device,
            config.identity_byte_length,
        )?;
        let device_types = sample_categories(rng, &core.identities, &reference.device_popularity());
        let shared_map = build_shared_map(rng, &core.identities, config.shared_proportions.device)?;
        Ok(Self {
            core,
            device_types,
            shared_map,
        })
    }
}

impl EntityPool for DevicePool {
    fn core(&self) -> &PoolCore {
        &self.core
    }

    fn shared_map(&self) -> Option<&SharedIdMap> {
        Some(&self.shared_map)
    }
}
