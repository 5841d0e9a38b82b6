//! Explode user rows to transaction grain and join entity attributes.
//!
//! Each per-row selection is done as one full pass over all rows, so
//! every column consumes a contiguous block of the stream.

use crate::{
    config::GeneratorConfig,
    error::GenResult,
    pool::{EntityPool, EntityPools},
    record::{TransactionRecord, UserRecord},
    rng::GenRng,
    types::{CountryAlpha, CountryNumeric, IdHash},
};
use std::collections::HashMap;

pub const CARD_PAYMENT_METHOD: &str = "card";

fn lookup_country(
    codes: &HashMap<IdHash, CountryNumeric>,
    country_map: &HashMap<CountryNumeric, CountryAlpha>,
    id: Option<&IdHash>,
) -> Option<CountryAlpha> {
    id.and_then(|h| codes.get(h))
        .and_then(|c| country_map.get(c))
        .cloned()
}

/// One uniform pick per row from that row's user list.
fn pick_per_row<F>(rng: &mut GenRng, owners: &[&UserRecord], list: F) -> Vec<Option<IdHash>>
where
    F: Fn(&UserRecord) -> &[IdHash],
{
    owners.iter().map(|&u| rng.pick(list(u)).cloned()).collect()
}

pub fn assemble_transactions(
    rng: &mut GenRng,
    users: &[UserRecord],
    pools: &EntityPools,
    config: &GeneratorConfig,
    country_map: &HashMap<CountryNumeric, CountryAlpha>,
) -> GenResult<Vec<TransactionRecord>> {
    // explode; users without transactions drop out here
    let mut owners: Vec<&UserRecord> = Vec::new();
    let mut transaction_hashes: Vec<&IdHash> = Vec::new();
    for user in users {
        for hash in &user.transaction_hashes {
            owners.push(user);
            transaction_hashes.push(hash);
        }
    }

    let devices = pick_per_row(rng, &owners, |u| &u.device_hashes);
    let mut cards = pick_per_row(rng, &owners, |u| &u.card_hashes);
    let ips = pick_per_row(rng, &owners, |u| &u.ip_hashes);
    let applications = pick_per_row(rng, &owners, |u| &u.application_hashes);

    for card in cards.iter_mut() {
        if rng.chance(config.card_null_rate) {
            *card = None;
        }
    }

    let remap = |pool: &dyn EntityPool, ids: Vec<Option<IdHash>>| -> Vec<Option<IdHash>> {
        ids.into_iter()
            .map(|id| id.map(|h| pool.canonical(&h).to_string()))
            .collect()
    };
    let devices = remap(&pools.device, devices);
    let cards = remap(&pools.card, cards);
    let ips = remap(&pools.ip, ips);

    let mut rows: Vec<TransactionRecord> = Vec::with_capacity(owners.len());
    for (i, user) in owners.iter().enumerate() {
        let transaction_hash = transaction_hashes[i];
        let device_hash = devices[i].clone();
        let card_hash = cards[i].clone();
        let ip_hash = ips[i].clone();
        let application_hash = applications[i].clone();
        rows.push(TransactionRecord {
            userid: user.userid.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            registration_date: user.registration_date,
            registration_country_code: user.registration_country_code.clone(),
            uid: user.uid.clone(),
            email_domain: user.email_domain.clone(),
            device_type: device_hash
                .as_ref()
                .and_then(|h| pools.device.device_types.get(h))
                .cloned(),
            device_hash,
            card_type: card_hash
                .as_ref()
                .and_then(|h| pools.card.card_types.get(h))
                .cloned(),
            card_country_code: lookup_country(&pools.card.country_codes, country_map, card_hash.as_ref()),
            card_hash,
            ip_country_code: lookup_country(&pools.ip.country_codes, country_map, ip_hash.as_ref()),
            ip_hash,
            card_payment_channel: application_hash
                .as_ref()
                .and_then(|h| pools.application.payment_channels.get(h))
                .cloned(),
            application_hash,
            transaction_hash: transaction_hash.clone(),
            transaction_date: pools.transaction.dates.get(transaction_hash).copied(),
            transaction_amount: pools.transaction.amounts.get(transaction_hash).copied(),
            transaction_payment_method: Some(CARD_PAYMENT_METHOD.to_string()),
            transaction_status: None,
            transaction_error_code: None,
            itr_hash: user.itr_hash.clone(),
        });
    }

    for row in rows.iter_mut() {
        let zero_amount = row.has_zero_amount();
        if zero_amount || row.card_hash.is_none() {
            row.card_payment_channel = None;
        }
        if zero_amount {
            row.card_hash = None;
            row.card_type = None;
            row.card_country_code = None;
        }
    }

    let methods: Vec<(&str, f64)> = config
        .non_card_methods
        .iter()
        .map(|(k, w)| (k.as_str(), *w))
        .collect();
    let method_weights: Vec<f64> = methods.iter().map(|(_, w)| *w).collect();
    for row in rows.iter_mut() {
        if row.card_hash.is_none() {
            let i = rng.weighted_index(&method_weights);
            row.transaction_payment_method = Some(methods[i].0.to_string());
        }
        if row.has_zero_amount() {
            row.transaction_payment_method = None;
        }
    }

    log::debug!("assembled {} transaction rows from {} users", rows.len(), users.len());
    Ok(rows)
}
