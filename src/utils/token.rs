use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Random uppercase alphanumeric suffix.
pub fn random_suffix(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

/// `SATLY-YYYYMMDD-XXXXXXXX`
pub fn certificate_id(at: DateTime<Utc>) -> String {
    format!("SATLY-{}-{}", at.format("%Y%m%d"), random_suffix(8))
}

/// `PAY-YYYYMMDDHHMMSS-XXXXXXXX`
pub fn transaction_id(at: DateTime<Utc>) -> String {
    format!("PAY-{}-{}", at.format("%Y%m%d%H%M%S"), random_suffix(8))
}
