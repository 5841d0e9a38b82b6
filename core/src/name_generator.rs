//! Country-conditioned name assignment.
//!
//! Names are drawn from the reference name tables restricted to each
//! user's country. Every user gets one independent draw (with
//! replacement), so two users in the same country may share a name.

use crate::{
    error::{GenError, GenResult},
    reference::{NameRecord, ReferenceData},
    rng::GenRng,
    types::{CountryNumeric, Uid},
};
use std::collections::{BTreeMap, HashMap};

pub struct NameGenerator;

impl NameGenerator {
    /// One name per user, drawn from `names` for that user's country.
    ///
    /// Users are grouped by country in ascending country order and then
    /// by their position in `user_ids`, which fixes stream consumption.
    /// A country with users but no names is a reference data error.
    pub fn assign_names(
        rng: &mut GenRng,
        user_ids: &[Uid],
        countries: &HashMap<Uid, CountryNumeric>,
        names: &[NameRecord],
    ) -> GenResult<HashMap<Uid, String>> {
        let by_country = ReferenceData::names_by_country(names);

        let mut groups: BTreeMap<CountryNumeric, Vec<&Uid>> = BTreeMap::new();
        for uid in user_ids {
            let country = countries.get(uid).ok_or_else(|| {
                GenError::InvariantViolation(format!("user {uid} has no country"))
            })?;
            groups.entry(*country).or_default().push(uid);
        }

        let mut assigned = HashMap::with_capacity(user_ids.len());
        for (country, members) in groups {
            let candidates = by_country.get(&country).filter(|c| !c.is_empty()).ok_or_else(|| {
                GenError::reference("names", format!("no names for country {country}"))
            })?;
            for uid in members {
                let name = candidates[rng.index_below(candidates.len())];
                assigned.insert(uid.clone(), name.to_string());
            }
        }
        Ok(assigned)
    }
}
