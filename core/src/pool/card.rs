use super::{assign_country_codes, EntityPool, PoolCore};
use crate::{
    config::GeneratorConfig,
    error::GenResult,
    reference::ReferenceData,
    rng::GenRng,
    sampling::{sample_categories, IdKind},
    shared_graph::build_shared_map,
    types::{CountryNumeric, EntityKind, IdHash, SharedIdMap},
};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct CardPool {
    core: PoolCore,
    pub card_types: HashMap<IdHash, String>,
    pub country_codes: HashMap<IdHash, CountryNumeric>,
    pub shared_map: SharedIdMap,
}

impl CardPool {
    pub fn generate(
        rng: &mut GenRng,
        n: usize,
        config: &GeneratorConfig,
        reference: &ReferenceData,
    ) -> GenResult<Self> {
        let core = PoolCore::generate(
            rng,
            EntityKind::Card,
            IdKind::Hash,
            n,
            config.poisson.card,
            config.identity_byte_length,
        )?;
        let table: Vec<(&str, f64)> = config
            .card_types
            .iter()
            .map(|(k, w)| (k.as_str(), *w))
            .collect();
        let card_types = sample_categories(rng, &core.identities, &table);
        let country_codes = assign_country_codes(rng, &core.identities, reference)?;
        let shared_map = build_shared_map(rng, &core.identities, config.shared_proportions.card)?;
        Ok(Self {
            core,
            card_types,
            country_codes,
            shared_map,
        })
    }
}

impl EntityPool for CardPool {
    fn core(&self) -> &PoolCore {
        &self.core
    }

    fn shared_map(&self) -> Option<&SharedIdMap> {
        Some(&self.shared_map)
    }
}
