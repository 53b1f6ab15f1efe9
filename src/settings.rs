use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::worker::PollConfig;

/// Tracks submitted user operations until they are mined and reports the
/// resulting transaction to the guardian.
#[derive(Debug, Clone, Parser)]
#[command(name = "userop-tracker", version)]
pub struct Settings {
    /// Bundler base url; lookups go to `<base>/<chain>`.
    #[arg(long, env = "BUNDLER_URL")]
    pub bundler_url: Url,

    /// Guardian endpoint receiving mined transaction hashes.
    #[arg(long, env = "GUARDIAN_URL")]
    pub guardian_url: Url,

    #[arg(long = "listen", env = "LISTEN_ADDR", default_value = "0.0.0.0:12004")]
    pub listen_addr: SocketAddr,

    /// Give up on an operation this long after it was submitted.
    #[arg(long, env = "MAX_WAIT_SECS", default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_wait_secs: u64,

    /// Minimum gap between two lookups of the same operation.
    #[arg(long, env = "MIN_INTERVAL_SECS", default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub min_interval_secs: u64,

    /// Timeout applied to every bundler and guardian request.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub request_timeout_secs: u64,

    #[arg(long, env = "PRUNE_INTERVAL_SECS", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub prune_interval_secs: u64,

    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

impl Settings {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            max_wait: Duration::from_secs(self.max_wait_secs),
            min_interval: Duration::from_secs(self.min_interval_secs),
            prune_interval: Duration::from_secs(self.prune_interval_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 5] = [
        "userop-tracker",
        "--bundler-url",
        "http://bundler.local/bundler",
        "--guardian-url",
        "http://guardian.local/guardian/update/txn/",
    ];

    #[test]
    fn defaults_match_service_contract() {
        let settings = Settings::try_parse_from(REQUIRED).unwrap();
        assert_eq!(settings.listen_addr, "0.0.0.0:12004".parse().unwrap());
        assert_eq!(settings.poll_config(), PollConfig::default());
        assert_eq!(settings.request_timeout(), Duration::from_secs(10));
        assert!(!settings.log_json);
    }

    #[test]
    fn durations_can_be_overridden() {
        let args = REQUIRED
            .iter()
            .copied()
            .chain(["--max-wait-secs", "120", "--min-interval-secs", "2"]);
        let config = Settings::try_parse_from(args).unwrap().poll_config();
        assert_eq!(config.max_wait, Duration::from_secs(120));
        assert_eq!(config.min_interval, Duration::from_secs(2));
    }

    #[test]
    fn rejects_zero_interval_and_bad_urls() {
        let zero = REQUIRED.iter().copied().chain(["--min-interval-secs", "0"]);
        assert!(Settings::try_parse_from(zero).is_err());

        assert!(Settings::try_parse_from([
            "userop-tracker",
            "--bundler-url",
            "not a url",
            "--guardian-url",
            "http://guardian.local/",
        ])
        .is_err());
    }
}
