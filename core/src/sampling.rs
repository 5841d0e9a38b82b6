//! Count and identity sampling primitives.
//!
//! Every function takes the iteration's `GenRng` explicitly; call order
//! determines stream consumption, so callers must keep it fixed.

use crate::{
    config::PoissonParams,
    error::{GenError, GenResult},
    rng::GenRng,
    types::IdHash,
};
use chrono::{Duration, NaiveDate};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

const HASH_ALPHABET: &[u8] = b"0123456789abcdef";
const ID_ALPHABET: &[u8] = b"0123456789";

/// Shape of a generated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Digits plus the first six lowercase letters.
    Hash,
    /// Digits only.
    Id,
}

impl IdKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Id => "id",
        }
    }

    fn alphabet(&self) -> &'static [u8] {
        match self {
            Self::Hash => HASH_ALPHABET,
            Self::Id => ID_ALPHABET,
        }
    }
}

/// Sum over p in 1..=power of Poisson(lambda)^p, plus one.
///
/// Each exponent gets its own full vector of `size` draws, drawn in
/// exponent order.
pub fn sample_poisson_power(
    rng: &mut GenRng,
    lambda: f64,
    size: usize,
    power: u32,
) -> GenResult<Vec<u64>> {
    if !lambda.is_finite() || lambda < 0.0 {
        return Err(GenError::Configuration(format!(
            "Invalid poisson lambda {lambda}; must be >= 0."
        )));
    }
    let mut totals = vec![1u64; size];
    for p in 1..=power {
        for total in totals.iter_mut() {
            let draw = rng.poisson(lambda)?;
            *total = total.saturating_add(draw.saturating_pow(p));
        }
    }
    Ok(totals)
}

/// `n` fixed-length identities drawn character by character.
///
/// Duplicates are a hard error; they are never silently dropped.
pub fn allocate_identities(
    rng: &mut GenRng,
    kind: IdKind,
    n: usize,
    byte_length: usize,
) -> GenResult<Vec<IdHash>> {
    let alphabet = kind.alphabet();
    let identities: Vec<IdHash> = (0..n)
        .map(|_| {
            (0..byte_length)
                .map(|_| alphabet[rng.index_below(alphabet.len())] as char)
                .collect()
        })
        .collect();

    let unique: HashSet<&IdHash> = identities.iter().collect();
    if unique.len() != identities.len() {
        return Err(GenError::NonUniqueIdentity {
            kind: kind.name(),
            n,
            byte_length,
        });
    }
    Ok(identities)
}

/// Divide each count by the total. Empty in, empty out.
pub fn counts_to_proportions<K: Clone + Eq + Hash>(counts: &HashMap<K, u64>) -> HashMap<K, f64> {
    let total: u64 = counts.values().sum();
    if counts.is_empty() || total == 0 {
        return HashMap::new();
    }
    counts
        .iter()
        .map(|(k, c)| (k.clone(), *c as f64 / total as f64))
        .collect()
}

/// Identities in allocation order together with their occurrence counts.
#[derive(Debug, Clone, Default)]
pub struct IdentityCounts {
    pub identities: Vec<IdHash>,
    pub counts: HashMap<IdHash, u64>,
}

impl IdentityCounts {
    /// Allocate `n` identities, then draw one Poisson-power count for each.
    pub fn generate(
        rng: &mut GenRng,
        kind: IdKind,
        n: usize,
        params: PoissonParams,
        byte_length: usize,
    ) -> GenResult<Self> {
        let identities = allocate_identities(rng, kind, n, byte_length)?;
        let draws = sample_poisson_power(rng, params.lambda, n, params.power)?;
        let counts = identities.iter().cloned().zip(draws).collect();
        Ok(Self { identities, counts })
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

/// One uniform date in [start, end] per identity.
pub fn sample_dates(
    rng: &mut GenRng,
    identities: &[IdHash],
    start: NaiveDate,
    end: NaiveDate,
) -> HashMap<IdHash, NaiveDate> {
    let span = (end - start).num_days().max(0) as u64 + 1;
    identities
        .iter()
        .map(|id| {
            let offset = rng.next_u64_below(span) as i64;
            (id.clone(), start + Duration::days(offset))
        })
        .collect()
}

/// One category per identity, drawn with replacement from `(label, weight)`.
pub fn sample_categories<S: AsRef<str>>(
    rng: &mut GenRng,
    identities: &[IdHash],
    table: &[(S, f64)],
) -> HashMap<IdHash, String> {
    let weights: Vec<f64> = table.iter().map(|(_, w)| *w).collect();
    identities
        .iter()
        .map(|id| {
            let i = rng.weighted_index(&weights);
            (id.clone(), table[i].0.as_ref().to_string())
        })
        .collect()
}
