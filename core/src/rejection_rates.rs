//! Risk lookup tables derived from the assembled transaction table.

use crate::{
    record::TransactionRecord,
    reference::ReferenceData,
    types::{CountryAlpha, IdHash, Uid},
};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RejectionRates {
    /// Crime index share per reference country.
    pub country: HashMap<CountryAlpha, f64>,
    /// Rarer domains score higher.
    pub email_domain: HashMap<String, f64>,
    pub shared_devices: HashMap<IdHash, f64>,
    pub shared_ips: HashMap<IdHash, f64>,
    pub shared_cards: HashMap<IdHash, f64>,
    /// Distinct devices per user, keyed by uid.
    pub device_occurrence: HashMap<Uid, f64>,
    pub ip_occurrence: HashMap<Uid, f64>,
    pub card_occurrence: HashMap<Uid, f64>,
}

fn normalise<K: Eq + Hash>(values: HashMap<K, f64>) -> HashMap<K, f64> {
    let total: f64 = values.values().sum();
    values
        .into_iter()
        .map(|(k, v)| (k, if total > 0.0 { v / total } else { 0.0 }))
        .collect()
}

/// Distinct users per entity identity.
fn shared_rates<F>(rows: &[TransactionRecord], id: F) -> HashMap<IdHash, f64>
where
    F: Fn(&TransactionRecord) -> Option<&IdHash>,
{
    let mut users: HashMap<&IdHash, HashSet<&Uid>> = HashMap::new();
    for row in rows {
        if let Some(h) = id(row) {
            users.entry(h).or_default().insert(&row.uid);
        }
    }
    normalise(
        users
            .into_iter()
            .map(|(h, u)| (h.clone(), u.len() as f64))
            .collect(),
    )
}

/// Distinct non-null entity identities per user.
fn occurrence_rates<F>(rows: &[TransactionRecord], id: F) -> HashMap<Uid, f64>
where
    F: Fn(&TransactionRecord) -> Option<&IdHash>,
{
    let mut entities: HashMap<&Uid, HashSet<&IdHash>> = HashMap::new();
    for row in rows {
        let seen = entities.entry(&row.uid).or_default();
        if let Some(h) = id(row) {
            seen.insert(h);
        }
    }
    normalise(
        entities
            .into_iter()
            .map(|(u, e)| (u.clone(), e.len() as f64))
            .collect(),
    )
}

impl RejectionRates {
    pub fn compute(rows: &[TransactionRecord], reference: &ReferenceData) -> Self {
        let crime: HashMap<&str, f64> = reference
            .crime_index
            .iter()
            .map(|c| (c.country_code.as_str(), c.crime_index))
            .collect();
        let country = normalise(
            reference
                .countries
                .iter()
                .map(|c| {
                    let index = crime.get(c.iso_alpha2.as_str()).copied().unwrap_or_else(|| {
                        log::warn!("no crime index for {}; using 0", c.iso_alpha2);
                        0.0
                    });
                    (c.iso_alpha2.clone(), index)
                })
                .collect(),
        );

        let email_domain = normalise(
            reference
                .email_domain_proportions()
                .into_iter()
                .map(|(domain, p)| (domain.to_string(), 1.0 - p))
                .collect(),
        );

        Self {
            country,
            email_domain,
            shared_devices: shared_rates(rows, |r| r.device_hash.as_ref()),
            shared_ips: shared_rates(rows, |r| r.ip_hash.as_ref()),
            shared_cards: shared_rates(rows, |r| r.card_hash.as_ref()),
            device_occurrence: occurrence_rates(rows, |r| r.device_hash.as_ref()),
            ip_occurrence: occurrence_rates(rows, |r| r.ip_hash.as_ref()),
            card_occurrence: occurrence_rates(rows, |r| r.card_hash.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(uid: &str, device: Option<&str>) -> TransactionRecord {
        TransactionRecord {
            userid: format!("user-{uid}"),
            first_name: None,
            last_name: None,
            registration_date: None,
            registration_country_code: None,
            uid: uid.into(),
            email_domain: None,
            device_hash: device.map(String::from),
            device_type: None,
            card_hash: None,
            card_type: None,
            card_country_code: None,
            ip_hash: None,
            ip_country_code: None,
            application_hash: None,
            transaction_hash: "t".into(),
            transaction_date: None,
            transaction_amount: None,
            transaction_payment_method: None,
            card_payment_channel: None,
            transaction_status: None,
            transaction_error_code: None,
            itr_hash: "x".into(),
        }
    }

    #[test]
    fn country_rates_follow_crime_index() {
        let rates = RejectionRates::compute(&[], &ReferenceData::default_test());
        let total: f64 = rates.country.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(rates.country["FR"] > rates.country["DE"]);
    }

    #[test]
    fn rare_domains_are_riskier() {
        let rates = RejectionRates::compute(&[], &ReferenceData::default_test());
        assert!(rates.email_domain["eircom.net"] > rates.email_domain["gmail.com"]);
    }

    #[test]
    fn shared_devices_weighted_by_distinct_users() {
        let rows = vec![
            tx("1", Some("d1")),
            tx("1", Some("d1")),
            tx("2", Some("d1")),
            tx("3", Some("d2")),
            tx("3", None),
        ];
        let rates = RejectionRates::compute(&rows, &ReferenceData::default_test());
        assert!((rates.shared_devices["d1"] - 2.0 / 3.0).abs() < 1e-12);
        assert!((rates.shared_devices["d2"] - 1.0 / 3.0).abs() < 1e-12);
        // every user gets an occurrence entry
        assert_eq!(rates.device_occurrence.len(), 3);
        assert!((rates.device_occurrence["3"] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(rates.card_occurrence["1"], 0.0);
    }
}
