use super::{assign_country_codes, EntityPool, PoolCore};
use crate::{
    config::{GeneratorConfig, ProgrammeParams},
    error::GenResult,
    name_generator::NameGenerator,
    reference::ReferenceData,
    rng::GenRng,
    sampling::{sample_categories, sample_dates, IdKind},
    types::{CountryNumeric, EntityKind, Uid},
};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Users with their demographic attributes, keyed by raw uid.
#[derive(Debug, Clone)]
pub struct UserPool {
    core: PoolCore,
    pub country_codes: HashMap<Uid, CountryNumeric>,
    pub first_names: HashMap<Uid, String>,
    pub last_names: HashMap<Uid, String>,
    pub email_domains: HashMap<Uid, String>,
    pub registration_dates: HashMap<Uid, NaiveDate>,
}

impl UserPool {
    pub fn generate(
        rng: &mut GenRng,
        params: &ProgrammeParams,
        config: &GeneratorConfig,
        reference: &ReferenceData,
    ) -> GenResult<Self> {
        let core = PoolCore::generate(
            rng,
            EntityKind::User,
            IdKind::Id,
            params.n_users,
            config.poisson.user,
            config.identity_byte_length,
        )?;
        let ids = &core.identities;
        let country_codes = assign_country_codes(rng, ids, reference)?;
        let first_names = NameGenerator::assign_names(rng, ids, &country_codes, &reference.first_names)?;
        let last_names = NameGenerator::assign_names(rng, ids, &country_codes, &reference.last_names)?;
        let email_domains = sample_categories(rng, ids, &reference.email_domain_proportions());
        let registration_dates =
            sample_dates(rng, ids, params.registration_start, params.registration_end);
        Ok(Self {
            core,
            country_codes,
            first_names,
            last_names,
            email_domains,
            registration_dates,
        })
    }
}

impl EntityPool for UserPool {
    fn core(&self) -> &PoolCore {
        &self.core
    }
}
