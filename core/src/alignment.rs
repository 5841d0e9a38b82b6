//! Post-assembly reconciliation of country codes and dates.

use crate::{
    config::{AlignmentConfig, ProgrammeParams},
    record::TransactionRecord,
    rng::GenRng,
    types::{CountryAlpha, IdHash},
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Row-wise country alignment. One uniform per row decides both the ip
/// and the card column: a column keeps its own country when the draw is
/// within its probability, else takes the registration country. Null
/// columns stay null.
pub fn align_country_codes(rng: &mut GenRng, rows: &mut [TransactionRecord], config: &AlignmentConfig) {
    for row in rows.iter_mut() {
        let u = rng.next_f64();
        if row.ip_country_code.is_some() && u > config.prob_ip_shared {
            row.ip_country_code = row.registration_country_code.clone();
        }
        if row.card_country_code.is_some() && u > config.prob_card_shared {
            row.card_country_code = row.registration_country_code.clone();
        }
    }
}

/// Entity columns that carry their own country.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountryColumn {
    Ip,
    Card,
}

impl CountryColumn {
    fn id(self, row: &TransactionRecord) -> Option<&IdHash> {
        match self {
            Self::Ip => row.ip_hash.as_ref(),
            Self::Card => row.card_hash.as_ref(),
        }
    }

    fn country(self, row: &TransactionRecord) -> Option<&CountryAlpha> {
        match self {
            Self::Ip => row.ip_country_code.as_ref(),
            Self::Card => row.card_country_code.as_ref(),
        }
    }

    fn set_country(self, row: &mut TransactionRecord, value: CountryAlpha) {
        match self {
            Self::Ip => row.ip_country_code = Some(value),
            Self::Card => row.card_country_code = Some(value),
        }
    }
}

/// Give every ip (or card) the most frequent country seen across its
/// rows. Ties go to the greatest code. Identities never seen with a
/// country are left alone. Applying this twice changes nothing.
pub fn canonicalize_entity_countries(rows: &mut [TransactionRecord], column: CountryColumn) {
    let mut tallies: HashMap<&IdHash, BTreeMap<&CountryAlpha, usize>> = HashMap::new();
    for row in rows.iter() {
        if let (Some(id), Some(country)) = (column.id(row), column.country(row)) {
            *tallies.entry(id).or_default().entry(country).or_default() += 1;
        }
    }

    let majority: HashMap<IdHash, CountryAlpha> = tallies
        .into_iter()
        .filter_map(|(id, counts)| {
            // max_by_key keeps the last maximum, i.e. the greatest code
            counts
                .into_iter()
                .max_by_key(|(_, n)| *n)
                .map(|(country, _)| (id.clone(), country.clone()))
        })
        .collect();

    for row in rows.iter_mut() {
        let Some(country) = column.id(row).and_then(|id| majority.get(id)) else {
            continue;
        };
        column.set_country(row, country.clone());
    }
}

/// When the registration window overlaps the transaction window, move
/// each transaction date to a uniform day in
/// `[max(registration, transaction date), transaction_end]`. A row with
/// no such day keeps its original date; dates are never moved backwards.
pub fn align_dates(rng: &mut GenRng, rows: &mut [TransactionRecord], params: &ProgrammeParams) {
    if params.registration_end <= params.transaction_start {
        return;
    }
    let candidates: Vec<NaiveDate> = params
        .transaction_start
        .iter_days()
        .take_while(|d| *d <= params.transaction_end)
        .collect();

    let mut unplaceable = 0usize;
    for row in rows.iter_mut() {
        let floor = match (row.registration_date, row.transaction_date) {
            (Some(r), Some(t)) => r.max(t),
            (Some(d), None) | (None, Some(d)) => d,
            (None, None) => continue,
        };
        let first_valid = candidates.partition_point(|d| *d < floor);
        match rng.pick(&candidates[first_valid..]) {
            Some(date) => row.transaction_date = Some(*date),
            None => unplaceable += 1,
        }
    }
    if unplaceable > 0 {
        log::warn!(
            "{unplaceable} transaction(s) have no date on or after registration before {}; dates kept",
            params.transaction_end
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TransactionRecord;

    fn row(reg: Option<&str>, ip: Option<&str>, card: Option<&str>) -> TransactionRecord {
        TransactionRecord {
            userid: "u".into(),
            first_name: None,
            last_name: None,
            registration_date: None,
            registration_country_code: reg.map(String::from),
            uid: "1".into(),
            email_domain: None,
            device_hash: None,
            device_type: None,
            card_hash: card.map(|_| "c1".to_string()),
            card_type: None,
            card_country_code: card.map(String::from),
            ip_hash: ip.map(|_| "i1".to_string()),
            ip_country_code: ip.map(String::from),
            application_hash: None,
            transaction_hash: "t".into(),
            transaction_date: None,
            transaction_amount: Some(1.99),
            transaction_payment_method: None,
            card_payment_channel: None,
            transaction_status: None,
            transaction_error_code: None,
            itr_hash: "x".into(),
        }
    }

    #[test]
    fn zero_probability_always_takes_registration() {
        let config = AlignmentConfig { prob_ip_shared: 0.0, prob_card_shared: 0.0 };
        let mut rows = vec![row(Some("IE"), Some("DE"), Some("FR")); 20];
        align_country_codes(&mut GenRng::seeded(1), &mut rows, &config);
        for r in &rows {
            assert_eq!(r.ip_country_code.as_deref(), Some("IE"));
            assert_eq!(r.card_country_code.as_deref(), Some("IE"));
        }
    }

    #[test]
    fn nulls_stay_null() {
        let config = AlignmentConfig { prob_ip_shared: 0.0, prob_card_shared: 0.0 };
        let mut rows = vec![row(Some("IE"), None, None)];
        align_country_codes(&mut GenRng::seeded(1), &mut rows, &config);
        assert_eq!(rows[0].ip_country_code, None);
        assert_eq!(rows[0].card_country_code, None);
    }

    #[test]
    fn majority_wins_and_ties_go_to_greatest_code() {
        let mut rows = vec![
            row(None, Some("DE"), None),
            row(None, Some("FR"), None),
            row(None, Some("FR"), None),
        ];
        canonicalize_entity_countries(&mut rows, CountryColumn::Ip);
        assert!(rows.iter().all(|r| r.ip_country_code.as_deref() == Some("FR")));

        let mut tied = vec![row(None, Some("DE"), None), row(None, Some("IT"), None)];
        canonicalize_entity_countries(&mut tied, CountryColumn::Ip);
        assert!(tied.iter().all(|r| r.ip_country_code.as_deref() == Some("IT")));
    }

    #[test]
    fn dates_never_precede_registration() {
        let params = crate::config::InputParams {
            registration_start_date: "2021-01-01".into(),
            registration_end_date: "2021-06-30".into(),
            transaction_start_date: "2021-03-01".into(),
            transaction_end_date: "2021-12-31".into(),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let mut rows: Vec<TransactionRecord> = (0..50)
            .map(|i| {
                let mut r = row(None, None, None);
                r.registration_date = NaiveDate::from_ymd_opt(2021, 1 + (i % 6) as u32, 15);
                r.transaction_date = NaiveDate::from_ymd_opt(2021, 3, 1 + (i % 28) as u32);
                r
            })
            .collect();
        align_dates(&mut GenRng::seeded(4), &mut rows, &params);
        for r in &rows {
            let d = r.transaction_date.unwrap();
            assert!(d >= r.registration_date.unwrap());
            assert!(d <= params.transaction_end);
        }
    }

    #[test]
    fn dates_never_move_backwards() {
        let params = crate::config::InputParams {
            registration_start_date: "2021-01-01".into(),
            registration_end_date: "2022-06-30".into(),
            transaction_start_date: "2021-03-01".into(),
            transaction_end_date: "2021-12-31".into(),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);

        // transaction on the last day of the window
        let mut on_last_day = row(None, None, None);
        on_last_day.registration_date = date(2021, 5, 1);
        on_last_day.transaction_date = date(2021, 12, 31);
        // registered after the transaction window closes
        let mut late_registration = row(None, None, None);
        late_registration.registration_date = date(2022, 3, 1);
        late_registration.transaction_date = date(2021, 6, 1);

        for seed in 0..20 {
            let mut rows = vec![on_last_day.clone(), late_registration.clone()];
            align_dates(&mut GenRng::seeded(seed), &mut rows, &params);
            assert_eq!(rows[0].transaction_date, date(2021, 12, 31));
            assert_eq!(rows[1].transaction_date, date(2021, 6, 1));
        }
    }
}
