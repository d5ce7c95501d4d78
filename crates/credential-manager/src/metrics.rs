//! Credential lifecycle counters
//!
//! - `oauth_access_token_lookups_total` (counter): label `result` = hit | expired | miss
//! - `oauth_refresh_total` (counter): label `outcome` = success | failure
//!
//! No recorder is installed here; without one the calls are no-ops.

pub(crate) fn record_lookup(result: &'static str) {
    metrics::counter!("oauth_access_token_lookups_total", "result" => result).increment(1);
}

pub(crate) fn record_refresh(outcome: &'static str) {
    metrics::counter!("oauth_refresh_total", "outcome" => outcome).increment(1);
}
