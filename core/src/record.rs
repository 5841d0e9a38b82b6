//! Output rows: one per user (pre-explosion) and one per transaction.
//!
//! Field order on the structs is the output column order.

use crate::types::{CountryAlpha, IdHash, Uid};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Successful,
    Pending,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "E900:ConnectionTimeout")]
    ConnectionTimeout,
    #[serde(rename = "E901:SuspectedFraud")]
    SuspectedFraud,
    #[serde(rename = "E902:AuthenticationFailure")]
    AuthenticationFailure,
    #[serde(rename = "E903:UserCancelled")]
    UserCancelled,
    #[serde(rename = "E904:InsufficientFunds")]
    InsufficientFunds,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 5] = [
        Self::ConnectionTimeout,
        Self::SuspectedFraud,
        Self::AuthenticationFailure,
        Self::UserCancelled,
        Self::InsufficientFunds,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::ConnectionTimeout => "E900:ConnectionTimeout",
            Self::SuspectedFraud => "E901:SuspectedFraud",
            Self::AuthenticationFailure => "E902:AuthenticationFailure",
            Self::UserCancelled => "E903:UserCancelled",
            Self::InsufficientFunds => "E904:InsufficientFunds",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub userid: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub registration_date: Option<NaiveDate>,
    pub registration_country_code: Option<CountryAlpha>,
    pub uid: Uid,
    pub email_domain: Option<String>,
    pub device_hashes: Vec<IdHash>,
    pub card_hashes: Vec<IdHash>,
    pub ip_hashes: Vec<IdHash>,
    pub transaction_hashes: Vec<IdHash>,
    pub application_hashes: Vec<IdHash>,
    pub itr_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    // user
    pub userid: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub registration_date: Option<NaiveDate>,
    pub registration_country_code: Option<CountryAlpha>,
    pub uid: Uid,
    pub email_domain: Option<String>,
    // device
    pub device_hash: Option<IdHash>,
    pub device_type: Option<String>,
    // card
    pub card_hash: Option<IdHash>,
    pub card_type: Option<String>,
    pub card_country_code: Option<CountryAlpha>,
    // ip
    pub ip_hash: Option<IdHash>,
    pub ip_country_code: Option<CountryAlpha>,
    // application
    pub application_hash: Option<IdHash>,
    // transaction
    pub transaction_hash: IdHash,
    pub transaction_date: Option<NaiveDate>,
    pub transaction_amount: Option<f64>,
    pub transaction_payment_method: Option<String>,
    pub card_payment_channel: Option<String>,
    pub transaction_status: Option<TransactionStatus>,
    pub transaction_error_code: Option<ErrorCode>,
    pub itr_hash: String,
}

impl TransactionRecord {
    /// Registration, ip and card country, in that order.
    pub fn country_codes(&self) -> [Option<&str>; 3] {
        [
            self.registration_country_code.as_deref(),
            self.ip_country_code.as_deref(),
            self.card_country_code.as_deref(),
        ]
    }

    pub fn has_zero_amount(&self) -> bool {
        self.transaction_amount == Some(0.0)
    }
}
