//! Transaction status decision cascade.
//!
//! Card transactions run through an ordered list of risk checks that
//! share one uniform draw. The first check whose risk meets the scaled
//! threshold rejects the transaction and picks an error code from that
//! check's category. Card-less transactions skip the cascade.

use crate::{
    config::{GeneratorConfig, RejectionCodeWeights},
    error::{GenError, GenResult},
    record::{ErrorCode, TransactionRecord, TransactionStatus},
    rejection_rates::RejectionRates,
    rng::GenRng,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CascadeStep {
    Country,
    EmailDomain,
    InconsistentCountry,
    SharedDevice,
    SharedIp,
    SharedCard,
    DeviceOccurrence,
    IpOccurrence,
    CardOccurrence,
}

/// Evaluation order.
pub const CASCADE: [CascadeStep; 9] = [
    CascadeStep::Country,
    CascadeStep::EmailDomain,
    CascadeStep::InconsistentCountry,
    CascadeStep::SharedDevice,
    CascadeStep::SharedIp,
    CascadeStep::SharedCard,
    CascadeStep::DeviceOccurrence,
    CascadeStep::IpOccurrence,
    CascadeStep::CardOccurrence,
];

/// Failure mode a triggered step points at; selects the error code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionCategory {
    Fraud,
    Connection,
    User,
    Funds,
    Authentication,
}

impl CascadeStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::EmailDomain => "email_domain",
            Self::InconsistentCountry => "inconsistent_country",
            Self::SharedDevice => "shared_device",
            Self::SharedIp => "shared_ip",
            Self::SharedCard => "shared_card",
            Self::DeviceOccurrence => "device_occurrence",
            Self::IpOccurrence => "ip_occurrence",
            Self::CardOccurrence => "card_occurrence",
        }
    }

    pub fn category(&self) -> RejectionCategory {
        match self {
            Self::Country | Self::SharedDevice | Self::SharedIp | Self::SharedCard => {
                RejectionCategory::Fraud
            }
            Self::EmailDomain => RejectionCategory::Authentication,
            Self::InconsistentCountry | Self::IpOccurrence => RejectionCategory::Connection,
            Self::DeviceOccurrence => RejectionCategory::User,
            Self::CardOccurrence => RejectionCategory::Funds,
        }
    }
}

impl RejectionCategory {
    pub fn code_weights<'a>(&self, codes: &'a RejectionCodeWeights) -> &'a BTreeMap<ErrorCode, f64> {
        match self {
            Self::Fraud => &codes.fraud,
            Self::Connection => &codes.connection,
            Self::User => &codes.user,
            Self::Funds => &codes.funds,
            Self::Authentication => &codes.authentication,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDecision {
    pub status: TransactionStatus,
    pub error_code: Option<ErrorCode>,
    /// The step that rejected the transaction, if any.
    pub trigger: Option<CascadeStep>,
}

fn required<K, Q>(table: &HashMap<K, f64>, key: &Q, step: CascadeStep) -> GenResult<f64>
where
    K: std::borrow::Borrow<Q> + Eq + std::hash::Hash,
    Q: std::fmt::Display + Eq + std::hash::Hash + ?Sized,
{
    table.get(key).copied().ok_or_else(|| {
        GenError::InvariantViolation(format!("no {} rejection rate for '{key}'", step.name()))
    })
}

/// Risk for one step, or None when the row lacks the input the step needs.
fn step_risk(
    step: CascadeStep,
    rng: &mut GenRng,
    row: &TransactionRecord,
    rates: &RejectionRates,
    config: &GeneratorConfig,
) -> GenResult<Option<f64>> {
    let risk = match step {
        CascadeStep::Country => {
            let present: Vec<&str> = row.country_codes().into_iter().flatten().collect();
            match rng.pick(&present) {
                Some(code) => Some(required(&rates.country, *code, step)?),
                None => None,
            }
        }
        CascadeStep::EmailDomain => match &row.email_domain {
            Some(domain) => Some(required(&rates.email_domain, domain.as_str(), step)?),
            None => None,
        },
        CascadeStep::InconsistentCountry => {
            let distinct: BTreeSet<&str> = row.country_codes().into_iter().flatten().collect();
            if distinct.is_empty() {
                None
            } else {
                let rate = config
                    .rejection
                    .inconsistent_country_rates
                    .get(&distinct.len())
                    .copied()
                    .ok_or_else(|| {
                        GenError::InvariantViolation(format!(
                            "no rejection rate for {} distinct country codes",
                            distinct.len()
                        ))
                    })?;
                Some(rate)
            }
        }
        CascadeStep::SharedDevice => match &row.device_hash {
            Some(h) => Some(required(&rates.shared_devices, h.as_str(), step)?),
            None => None,
        },
        CascadeStep::SharedIp => match &row.ip_hash {
            Some(h) => Some(required(&rates.shared_ips, h.as_str(), step)?),
            None => None,
        },
        CascadeStep::SharedCard => match &row.card_hash {
            Some(h) => Some(required(&rates.shared_cards, h.as_str(), step)?),
            None => None,
        },
        CascadeStep::DeviceOccurrence => Some(required(&rates.device_occurrence, row.uid.as_str(), step)?),
        CascadeStep::IpOccurrence => Some(required(&rates.ip_occurrence, row.uid.as_str(), step)?),
        CascadeStep::CardOccurrence => Some(required(&rates.card_occurrence, row.uid.as_str(), step)?),
    };
    Ok(risk)
}

fn draw_error_code(rng: &mut GenRng, table: &BTreeMap<ErrorCode, f64>) -> Option<ErrorCode> {
    let codes: Vec<ErrorCode> = table.keys().copied().collect();
    let weights: Vec<f64> = table.values().copied().collect();
    if codes.is_empty() {
        return None;
    }
    Some(codes[rng.weighted_index(&weights)])
}

/// Decide status and error code for one row.
pub fn decide_status(
    rng: &mut GenRng,
    row: &TransactionRecord,
    rates: &RejectionRates,
    config: &GeneratorConfig,
) -> GenResult<StatusDecision> {
    if row.card_hash.is_none() {
        let status = if rng.chance(config.rejection.card_less_successful) {
            TransactionStatus::Successful
        } else {
            TransactionStatus::Pending
        };
        return Ok(StatusDecision { status, error_code: None, trigger: None });
    }

    let threshold = rng.next_f64() / config.rejection.scaling_factor;
    for step in CASCADE {
        let Some(risk) = step_risk(step, rng, row, rates, config)? else {
            continue;
        };
        if risk >= threshold {
            let table = step.category().code_weights(&config.rejection.codes);
            return Ok(StatusDecision {
                status: TransactionStatus::Rejected,
                error_code: draw_error_code(rng, table),
                trigger: Some(step),
            });
        }
    }

    let baseline = &config.transaction_status;
    let status = match rng.weighted_index(&[baseline.successful, baseline.pending]) {
        0 => TransactionStatus::Successful,
        _ => TransactionStatus::Pending,
    };
    Ok(StatusDecision { status, error_code: None, trigger: None })
}

/// Run the cascade over every row in order, writing status and error code.
pub fn assign_statuses(
    rng: &mut GenRng,
    rows: &mut [TransactionRecord],
    rates: &RejectionRates,
    config: &GeneratorConfig,
) -> GenResult<()> {
    let mut rejected = 0usize;
    for row in rows.iter_mut() {
        let decision = decide_status(rng, row, rates, config)?;
        if decision.status == TransactionStatus::Rejected {
            rejected += 1;
        }
        row.transaction_status = Some(decision.status);
        row.transaction_error_code = decision.error_code;
    }
    log::debug!("status: {rejected} of {} transactions rejected", rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceData;

    fn card_row() -> TransactionRecord {
        TransactionRecord {
            userid: "u1".into(),
            first_name: Some("Anna".into()),
            last_name: Some("Muller".into()),
            registration_date: None,
            registration_country_code: Some("DE".into()),
            uid: "1".into(),
            email_domain: Some("gmail.com".into()),
            device_hash: Some("d1".into()),
            device_type: None,
            card_hash: Some("c1".into()),
            card_type: Some("visa".into()),
            card_country_code: Some("DE".into()),
            ip_hash: Some("i1".into()),
            ip_country_code: Some("DE".into()),
            application_hash: None,
            transaction_hash: "t1".into(),
            transaction_date: None,
            transaction_amount: Some(2.99),
            transaction_payment_method: Some("card".into()),
            card_payment_channel: Some("paypal".into()),
            transaction_status: None,
            transaction_error_code: None,
            itr_hash: "x".into(),
        }
    }

    #[test]
    fn every_step_has_a_category_table() {
        let codes = GeneratorConfig::default().rejection.codes;
        for step in CASCADE {
            assert_eq!(step.category().code_weights(&codes).len(), 5);
        }
    }

    #[test]
    fn card_less_rows_never_rejected() {
        let mut row = card_row();
        row.card_hash = None;
        let rates = RejectionRates::default();
        let config = GeneratorConfig::default();
        let mut rng = GenRng::seeded(42);
        for _ in 0..200 {
            let d = decide_status(&mut rng, &row, &rates, &config).unwrap();
            assert_ne!(d.status, TransactionStatus::Rejected);
            assert_eq!(d.error_code, None);
        }
    }

    #[test]
    fn certain_country_risk_rejects_as_fraud() {
        let row = card_row();
        let mut rates = RejectionRates::compute(&[row.clone()], &ReferenceData::default_test());
        rates.country.insert("DE".into(), 1.0);
        let mut config = GeneratorConfig::default();
        // threshold u / 2 < 0.5 <= 1.0, so the first step always fires
        config.rejection.scaling_factor = 2.0;
        let mut rng = GenRng::seeded(1);
        let d = decide_status(&mut rng, &row, &rates, &config).unwrap();
        assert_eq!(d.status, TransactionStatus::Rejected);
        assert_eq!(d.trigger, Some(CascadeStep::Country));
        assert!(d.error_code.is_some());
    }

    #[test]
    fn missing_rate_key_is_invariant_violation() {
        let row = card_row();
        let mut rates = RejectionRates::compute(&[row.clone()], &ReferenceData::default_test());
        rates.country.clear();
        let err = decide_status(&mut GenRng::seeded(1), &row, &rates, &GeneratorConfig::default()).unwrap_err();
        assert!(matches!(err, GenError::InvariantViolation(_)));
    }

    #[test]
    fn tiny_threshold_rejects_every_card_row() {
        let row = card_row();
        let rates = RejectionRates::compute(&[row.clone()], &ReferenceData::default_test());
        let mut config = GeneratorConfig::default();
        config.rejection.scaling_factor = 1e12;
        let mut rng = GenRng::seeded(3);
        let mut rows = vec![row; 100];
        assign_statuses(&mut rng, &mut rows, &rates, &config).unwrap();
        // with a tiny threshold every row trips the first check
        assert!(rows.iter().all(|r| r.transaction_status == Some(TransactionStatus::Rejected)));
    }
}
