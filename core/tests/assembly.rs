//! User and transaction assembly.

use std::collections::{HashMap, HashSet};
use telecom_payments_core::{
    engine::GeneratorEngine,
    pool::EntityPool,
    record::{TransactionRecord, UserRecord},
    rng::GenRng,
    transaction_assembly::{assemble_transactions, CARD_PAYMENT_METHOD},
    user_assembly::assemble_users,
};

/// Assembled tables with the first `n_zero` transactions forced to a
/// zero amount.
fn assemble(seed: u64, n_users: usize, n_zero: usize) -> (Vec<UserRecord>, Vec<TransactionRecord>) {
    let engine = GeneratorEngine::build_test(seed, n_users).unwrap();
    let mut rng = GenRng::seeded(seed);
    let (counts, mut pools) = engine.build_pools(&mut rng).unwrap();
    let zeroed: Vec<String> = pools.transaction.identities().iter().take(n_zero).cloned().collect();
    for id in zeroed {
        pools.transaction.amounts.insert(id, 0.0);
    }
    let country_map = engine.reference.country_code_map();
    let users = assemble_users(&mut rng, &counts, &pools, &country_map, "itr").unwrap();
    let trans = assemble_transactions(&mut rng, &users, &pools, &engine.config, &country_map).unwrap();
    (users, trans)
}

#[test]
fn zero_amount_nulls_card_and_payment_fields() {
    let (_, trans) = assemble(42, 80, 25);
    let zero: Vec<&TransactionRecord> = trans.iter().filter(|t| t.has_zero_amount()).collect();
    assert!(zero.len() >= 25);
    for t in zero {
        assert_eq!(t.card_hash, None);
        assert_eq!(t.card_type, None);
        assert_eq!(t.card_country_code, None);
        assert_eq!(t.card_payment_channel, None);
        assert_eq!(t.transaction_payment_method, None);
    }
}

#[test]
fn card_less_rows_use_wallet_or_points() {
    let (_, trans) = assemble(9, 150, 0);
    let card_less: Vec<&TransactionRecord> = trans
        .iter()
        .filter(|t| t.card_hash.is_none() && !t.has_zero_amount())
        .collect();
    // 5% null injection over a few thousand rows
    assert!(!card_less.is_empty());
    for t in card_less {
        let method = t.transaction_payment_method.as_deref();
        assert!(matches!(method, Some("wallet") | Some("points")), "got {method:?}");
        assert_eq!(t.card_payment_channel, None);
    }
    for t in trans.iter().filter(|t| t.card_hash.is_some()) {
        assert_eq!(t.transaction_payment_method.as_deref(), Some(CARD_PAYMENT_METHOD));
        assert!(t.card_type.is_some());
    }
}

#[test]
fn every_transaction_hash_exploded_once() {
    let (users, trans) = assemble(5, 60, 0);
    let expected: usize = users.iter().map(|u| u.transaction_hashes.len()).sum();
    assert_eq!(trans.len(), expected);
    let unique: HashSet<&String> = trans.iter().map(|t| &t.transaction_hash).collect();
    assert_eq!(unique.len(), expected);

    let with_transactions: HashSet<&String> = users
        .iter()
        .filter(|u| !u.transaction_hashes.is_empty())
        .map(|u| &u.uid)
        .collect();
    let in_trans: HashSet<&String> = trans.iter().map(|t| &t.uid).collect();
    assert_eq!(with_transactions, in_trans);
}

#[test]
fn selected_entities_come_from_the_users_lists() {
    let (users, trans) = assemble(13, 60, 0);
    let by_uid: HashMap<&String, &UserRecord> = users.iter().map(|u| (&u.uid, u)).collect();
    for t in &trans {
        let user = by_uid[&t.uid];
        if let Some(d) = &t.device_hash {
            assert!(user.device_hashes.contains(d));
        }
        if let Some(i) = &t.ip_hash {
            assert!(user.ip_hashes.contains(i));
        }
        if let Some(a) = &t.application_hash {
            assert!(user.application_hashes.contains(a));
        }
        assert_eq!(t.userid, user.userid);
        assert_eq!(t.itr_hash, "itr");
    }
}

#[test]
fn user_lists_hold_canonical_identities() {
    let engine = GeneratorEngine::build_test(21, 400).unwrap();
    let mut rng = GenRng::seeded(21);
    let (counts, pools) = engine.build_pools(&mut rng).unwrap();
    let country_map = engine.reference.country_code_map();
    let users = assemble_users(&mut rng, &counts, &pools, &country_map, "itr").unwrap();
    for u in &users {
        for ip in &u.ip_hashes {
            assert_eq!(pools.ip.canonical(ip), ip.as_str());
        }
        for d in &u.device_hashes {
            assert_eq!(pools.device.canonical(d), d.as_str());
        }
        assert_eq!(u.userid.len(), 16);
        assert!(u.userid.ends_with(&u.uid[u.uid.len() - 5..]));
    }
}
