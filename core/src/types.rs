//! Shared primitive types used across the entire generator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An opaque identity for one entity instance (device, card, ip, ...).
pub type IdHash = String;

/// The raw numeric user identity.
pub type Uid = String;

/// ISO 3166 numeric country code, as carried by the reference tables.
pub type CountryNumeric = u16;

/// ISO 3166 alpha-2 country code, as exposed in the output tables.
pub type CountryAlpha = String;

/// Partial identity -> canonical identity mapping. Absent key means the
/// identity is its own canonical identity.
pub type SharedIdMap = HashMap<IdHash, IdHash>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Device,
    Card,
    Ip,
    Transaction,
    Application,
}

impl EntityKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Device => "device",
            Self::Card => "card",
            Self::Ip => "ip",
            Self::Transaction => "transaction",
            Self::Application => "application",
        }
    }
}
