//! Shared-identity networks.
//!
//! A fraction of a pool's identities is grouped into a handful of
//! randomly sized networks; every member of a network maps to the same
//! representative. Downstream this shows up as one device, card or ip
//! being used by several otherwise unrelated users.

use crate::{
    error::{GenError, GenResult},
    rng::GenRng,
    types::{IdHash, SharedIdMap},
};

/// Number of identities that take part in sharing.
pub fn shared_subset_size(n: usize, shared_proportion: f64) -> usize {
    (n as f64 * shared_proportion).round() as usize
}

/// Build the identity -> representative map for one pool.
///
/// Stream order: subset draw, one uniform weight per network, one
/// network draw per member, one representative draw per network.
pub fn build_shared_map(
    rng: &mut GenRng,
    identities: &[IdHash],
    shared_proportion: f64,
) -> GenResult<SharedIdMap> {
    if !(0.0..=1.0).contains(&shared_proportion) {
        return Err(GenError::Configuration(format!(
            "Invalid shared proportion {shared_proportion}; must be within [0, 1]."
        )));
    }
    let subset_size = shared_subset_size(identities.len(), shared_proportion);
    let mut shared_map = SharedIdMap::with_capacity(subset_size);
    if subset_size == 0 {
        return Ok(shared_map);
    }

    let subset: Vec<&IdHash> = rng
        .sample_indices(identities.len(), subset_size)
        .into_iter()
        .map(|i| &identities[i])
        .collect();

    let n_networks = (subset_size as f64).sqrt().ceil() as usize;
    let raw: Vec<f64> = (0..n_networks).map(|_| rng.next_f64()).collect();
    let total: f64 = raw.iter().sum();
    let network_weights: Vec<f64> = if total > 0.0 {
        raw.iter().map(|w| w / total).collect()
    } else {
        vec![1.0 / n_networks as f64; n_networks]
    };

    let mut networks: Vec<Vec<&IdHash>> = vec![Vec::new(); n_networks];
    for member in &subset {
        let g = rng.weighted_index(&network_weights);
        networks[g].push(*member);
    }

    for members in networks.iter().filter(|m| !m.is_empty()) {
        let representative = members[rng.index_below(members.len())];
        for member in members {
            shared_map.insert((*member).clone(), representative.clone());
        }
    }

    log::debug!(
        "shared: {} of {} identities in {} networks",
        shared_map.len(),
        identities.len(),
        networks.iter().filter(|m| !m.is_empty()).count()
    );
    Ok(shared_map)
}

/// Canonical identity: the representative if shared, else itself.
pub fn canonical<'a>(shared_map: &'a SharedIdMap, id: &'a str) -> &'a str {
    shared_map.get(id).map(String::as_str).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("id{i:04}")).collect()
    }

    #[test]
    fn zero_proportion_gives_empty_map() {
        for seed in 0..10 {
            let mut rng = GenRng::seeded(seed);
            let map = build_shared_map(&mut rng, &ids(1000), 0.0).unwrap();
            assert!(map.is_empty());
        }
    }

    #[test]
    fn map_size_and_domain() {
        let pool = ids(1000);
        let mut rng = GenRng::seeded(42);
        let map = build_shared_map(&mut rng, &pool, 0.05).unwrap();
        assert_eq!(map.len(), 50);
        let members: HashSet<&String> = pool.iter().collect();
        assert!(map.keys().all(|k| members.contains(k)));
        assert!(map.values().all(|v| members.contains(v)));
    }

    #[test]
    fn representatives_are_fixed_points() {
        let mut rng = GenRng::seeded(7);
        let map = build_shared_map(&mut rng, &ids(400), 0.25).unwrap();
        for rep in map.values() {
            assert_eq!(map.get(rep), Some(rep));
        }
    }

    #[test]
    fn network_count_bounded_by_sqrt() {
        let mut rng = GenRng::seeded(11);
        let map = build_shared_map(&mut rng, &ids(400), 0.25).unwrap();
        let mut sizes: HashMap<&String, usize> = HashMap::new();
        for rep in map.values() {
            *sizes.entry(rep).or_default() += 1;
        }
        // 100 shared identities spread over at most ceil(sqrt(100)) = 10 networks
        assert!(sizes.len() <= 10);
        assert_eq!(sizes.values().sum::<usize>(), 100);
    }

    #[test]
    fn small_pool_rounds_to_nothing() {
        let mut rng = GenRng::seeded(42);
        let map = build_shared_map(&mut rng, &ids(4), 0.05).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn canonical_falls_back_to_self() {
        let mut map = SharedIdMap::new();
        map.insert("a".into(), "b".into());
        assert_eq!(canonical(&map, "a"), "b");
        assert_eq!(canonical(&map, "z"), "z");
    }
}
