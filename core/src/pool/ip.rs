use super::{assign_country_codes, EntityPool, PoolCore};
use crate::{
    config::GeneratorConfig,
    error::GenResult,
    reference::ReferenceData,
    rng::GenRng,
    sampling::IdKind,
    shared_graph::build_shared_map,
    types::{CountryNumeric, EntityKind, IdHash, SharedIdMap},
};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct IpPool {
    core: PoolCore,
    pub country_codes: HashMap<IdHash, CountryNumeric>,
    pub shared_map: SharedIdMap,
}

impl IpPool {
    pub fn generate(
        rng: &mut GenRng,
        n: usize,
        config: &GeneratorConfig,
        reference: &ReferenceData,
    ) -> GenResult<Self> {
        let core = PoolCore::generate(
            rng,
            EntityKind::Ip,
            IdKind::Hash,
            n,
            config.poisson.ip,
            config.identity_byte_length,
        )?;
        let country_codes = assign_country_codes(rng, &core.identities, reference)?;
        let shared_map = build_shared_map(rng, &core.identities, config.shared_proportions.ip)?;
        Ok(Self {
            core,
            country_codes,
            shared_map,
        })
    }
}

impl EntityPool for IpPool {
    fn core(&self) -> &PoolCore {
        &self.core
    }

    fn shared_map(&self) -> Option<&SharedIdMap> {
        Some(&self.shared_map)
    }
}
