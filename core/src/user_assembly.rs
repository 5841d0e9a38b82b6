//! User-grain rows: demographics plus one identity list per entity type.

use crate::{
    entity_counts::EntityCounts,
    error::{GenError, GenResult},
    pool::{EntityPool, EntityPools},
    record::UserRecord,
    rng::GenRng,
    types::{CountryAlpha, CountryNumeric, IdHash},
};
use chrono::NaiveDate;
use std::collections::HashMap;

const USERID_PREFIX_LEN: usize = 11;
const USERID_UID_DIGITS: usize = 5;

/// `YYYYMMDD` + country code, zero padded to 11 characters, followed by
/// the last five digits of the raw uid.
pub fn derive_userid(registration_date: NaiveDate, country: CountryNumeric, uid: &str) -> String {
    let prefix = format!("{}{}", registration_date.format("%Y%m%d"), country);
    let pad = "0".repeat(prefix.len().abs_diff(USERID_PREFIX_LEN));
    let tail = uid
        .char_indices()
        .rev()
        .nth(USERID_UID_DIGITS - 1)
        .map(|(i, _)| &uid[i..])
        .unwrap_or(uid);
    format!("{prefix}{pad}{tail}")
}

/// Per-iteration tag, built from bytes of the iteration's own stream.
pub fn gen_itr_hash(rng: &mut GenRng) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .simple()
        .to_string()
}

/// Carve `pool` into consecutive slices sized by `counts`, remapping
/// each identity to its canonical form.
fn consecutive_slices<P: EntityPool>(
    pool: &P,
    counts: impl Iterator<Item = usize>,
) -> GenResult<Vec<Vec<IdHash>>> {
    let ids = pool.identities();
    let mut start = 0;
    let mut slices = Vec::new();
    for n in counts {
        let end = start + n;
        let slice = ids.get(start..end).ok_or_else(|| {
            GenError::InvariantViolation(format!(
                "{} pool has {} identities, counts need at least {end}",
                pool.kind().name(),
                ids.len()
            ))
        })?;
        slices.push(slice.iter().map(|id| pool.canonical(id).to_string()).collect());
        start = end;
    }
    if start != ids.len() {
        return Err(GenError::InvariantViolation(format!(
            "{} pool has {} identities but counts sum to {start}",
            pool.kind().name(),
            ids.len()
        )));
    }
    Ok(slices)
}

/// Draw every user's applications at once, weighted by popularity and
/// with replacement, then split the draws consecutively.
fn application_lists(
    rng: &mut GenRng,
    pools: &EntityPools,
    counts: &EntityCounts,
) -> Vec<Vec<IdHash>> {
    let ids = pools.application.identities();
    let weights = pools.application.weights();
    counts
        .rows
        .iter()
        .map(|row| {
            if ids.is_empty() {
                return Vec::new();
            }
            (0..row.n_applications)
                .map(|_| ids[rng.weighted_index(&weights)].clone())
                .collect()
        })
        .collect()
}

/// One row per user in entity-count order.
pub fn assemble_users(
    rng: &mut GenRng,
    counts: &EntityCounts,
    pools: &EntityPools,
    country_map: &HashMap<CountryNumeric, CountryAlpha>,
    itr_hash: &str,
) -> GenResult<Vec<UserRecord>> {
    let rows = &counts.rows;
    let devices = consecutive_slices(&pools.device, rows.iter().map(|r| r.n_devices))?;
    let cards = consecutive_slices(&pools.card, rows.iter().map(|r| r.n_cards))?;
    let ips = consecutive_slices(&pools.ip, rows.iter().map(|r| r.n_ips))?;
    let transactions = consecutive_slices(&pools.transaction, rows.iter().map(|r| r.n_transactions))?;
    let applications = application_lists(rng, pools, counts);

    let user = &pools.user;
    let lists = devices
        .into_iter()
        .zip(cards)
        .zip(ips)
        .zip(transactions)
        .zip(applications);

    rows.iter()
        .zip(lists)
        .map(|(row, ((((device_hashes, card_hashes), ip_hashes), transaction_hashes), application_hashes))| {
            let uid = &row.uid;
            let registration_date = user.registration_dates.get(uid).copied();
            let country = user.country_codes.get(uid).copied();
            let userid = match (registration_date, country) {
                (Some(date), Some(code)) => derive_userid(date, code, uid),
                _ => {
                    return Err(GenError::InvariantViolation(format!(
                        "user {uid} is missing a registration date or country"
                    )))
                }
            };
            Ok(UserRecord {
                userid,
                first_name: user.first_names.get(uid).cloned(),
                last_name: user.last_names.get(uid).cloned(),
                registration_date,
                registration_country_code: country.and_then(|c| country_map.get(&c).cloned()),
                uid: uid.clone(),
                email_domain: user.email_domains.get(uid).cloned(),
                device_hashes,
                card_hashes,
                ip_hashes,
                transaction_hashes,
                application_hashes,
                itr_hash: itr_hash.to_string(),
            })
        })
        .collect()
}
