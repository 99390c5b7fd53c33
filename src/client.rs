//! HTTP client construction.
//!
//! One client is built per run and shared (via `reqwest::Client`'s internal
//! `Arc`) across every worker task, so connections are pooled the way the
//! underlying transport already intends.

/// Build the client used for every request issued during a run. There is
/// no global default timeout — each step applies its own `timeout` field,
/// if present, per request.
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_usable_client() {
        assert!(build_client().is_ok());
    }
}
