//! Entity pool invariants over a full seeded build.

use std::collections::HashSet;
use telecom_payments_core::{
    engine::GeneratorEngine,
    pool::EntityPool,
    reference::ReferenceData,
    rng::GenRng,
};

fn assert_pool_invariants<P: EntityPool>(pool: &P) {
    let name = pool.kind().name();
    let core = pool.core();
    let unique: HashSet<&String> = core.identities.iter().collect();
    assert_eq!(unique.len(), core.identities.len(), "{name}: duplicate identities");
    if core.identities.is_empty() {
        assert!(core.proportions.is_empty(), "{name}: empty pool with proportions");
    } else {
        let total: f64 = core.proportions.values().sum();
        assert!((total - 1.0).abs() < 1e-9, "{name}: proportions sum to {total}");
    }
    if let Some(map) = pool.shared_map() {
        assert!(map.keys().all(|k| unique.contains(k)), "{name}: shared key outside pool");
        assert!(map.values().all(|v| unique.contains(v)), "{name}: shared value outside pool");
    }
}

#[test]
fn every_pool_satisfies_invariants() {
    let engine = GeneratorEngine::build_test(42, 200).unwrap();
    let (counts, pools) = engine.build_pools(&mut GenRng::seeded(42)).unwrap();
    assert_pool_invariants(&pools.user);
    assert_pool_invariants(&pools.device);
    assert_pool_invariants(&pools.card);
    assert_pool_invariants(&pools.ip);
    assert_pool_invariants(&pools.transaction);
    assert_pool_invariants(&pools.application);

    let totals = counts.totals();
    assert_eq!(pools.device.len(), totals.devices);
    assert_eq!(pools.card.len(), totals.cards);
    assert_eq!(pools.ip.len(), totals.ips);
    assert_eq!(pools.transaction.len(), totals.transactions);
    assert_eq!(pools.application.len(), 200);
}

#[test]
fn shared_map_size_matches_rounded_proportion() {
    let engine = GeneratorEngine::build_test(7, 300).unwrap();
    let (_, pools) = engine.build_pools(&mut GenRng::seeded(7)).unwrap();
    let config = &engine.config.shared_proportions;
    let expected = |n: usize, p: f64| (n as f64 * p).round() as usize;
    assert_eq!(pools.ip.shared_map.len(), expected(pools.ip.len(), config.ip));
    assert_eq!(pools.device.shared_map.len(), expected(pools.device.len(), config.device));
    assert_eq!(pools.card.shared_map.len(), expected(pools.card.len(), config.card));
}

#[test]
fn user_attributes_are_complete_and_consistent() {
    let engine = GeneratorEngine::build_test(3, 120).unwrap();
    let (_, pools) = engine.build_pools(&mut GenRng::seeded(3)).unwrap();
    let user = &pools.user;
    let first_names = ReferenceData::names_by_country(&engine.reference.first_names);
    for uid in user.identities() {
        assert_eq!(uid.len(), 16);
        assert!(uid.bytes().all(|b| b.is_ascii_digit()));
        let country = user.country_codes[uid];
        assert!(first_names[&country].contains(&user.first_names[uid].as_str()));
        let date = user.registration_dates[uid];
        assert!(date >= engine.params.registration_start && date <= engine.params.registration_end);
        assert!(user.email_domains.contains_key(uid));
    }
}

#[test]
fn device_types_are_android_models() {
    let engine = GeneratorEngine::build_test(11, 80).unwrap();
    let (_, pools) = engine.build_pools(&mut GenRng::seeded(11)).unwrap();
    let android: HashSet<&str> = engine
        .reference
        .android_smartphones()
        .into_iter()
        .map(|p| p.model.as_str())
        .collect();
    assert!(pools.device.device_types.values().all(|m| android.contains(m.as_str())));
}
