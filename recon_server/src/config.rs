use std::{env, time::Duration};

use log::*;
use provider_tools::ProviderConfig;
use recon_common::{parse_boolean_flag, Points, Secret};
use recon_engine::DEFAULT_MIN_WITHDRAWAL;

const DEFAULT_RECON_HOST: &str = "127.0.0.1";
const DEFAULT_RECON_PORT: u16 = 8460;
const DEFAULT_SIGNATURE_HEADER: &str = "X-Paycrest-Signature";
const DEFAULT_USER_HEADER: &str = "X-Authenticated-User";
const DEFAULT_ROLES_HEADER: &str = "X-Authenticated-Roles";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);
const DEFAULT_POLL_BATCH_SIZE: i64 = 50;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub webhook: WebhookConfig,
    pub identity: IdentityConfig,
    pub poll: PollConfig,
    /// The smallest withdrawal a user may request.
    pub min_withdrawal: Points,
    /// Provider API configuration, used by the poller.
    pub provider: ProviderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RECON_HOST.to_string(),
            port: DEFAULT_RECON_PORT,
            database_url: String::default(),
            webhook: WebhookConfig::default(),
            identity: IdentityConfig::default(),
            poll: PollConfig::default(),
            min_withdrawal: Points::from(DEFAULT_MIN_WITHDRAWAL),
            provider: ProviderConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("RECON_HOST").ok().unwrap_or_else(|| DEFAULT_RECON_HOST.into());
        let port = env::var("RECON_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for RECON_PORT. {e} Using the default, {DEFAULT_RECON_PORT}, \
                         instead."
                    );
                    DEFAULT_RECON_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_RECON_PORT);
        let database_url = env::var("RECON_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ RECON_DATABASE_URL is not set. Please set it to the URL for the reconciliation database.");
            String::default()
        });
        let min_withdrawal = env::var("RECON_MIN_WITHDRAWAL_POINTS")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for RECON_MIN_WITHDRAWAL_POINTS. {e}"))
                    .ok()
            })
            .map(Points::from)
            .unwrap_or_else(|| {
                info!("🪛️ RECON_MIN_WITHDRAWAL_POINTS is not set. Using the default of {DEFAULT_MIN_WITHDRAWAL}.");
                Points::from(DEFAULT_MIN_WITHDRAWAL)
            });
        Self {
            host,
            port,
            database_url,
            webhook: WebhookConfig::from_env_or_defaults(),
            identity: IdentityConfig::from_env_or_defaults(),
            poll: PollConfig::from_env_or_defaults(),
            min_withdrawal,
            provider: ProviderConfig::new_from_env_or_default(),
        }
    }
}

//-------------------------------------------------  WebhookConfig  ----------------------------------------------------
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// The shared secret the provider signs webhook bodies with.
    pub secret: Secret<String>,
    /// Header carrying the signature. Header lookups are case-insensitive.
    pub signature_header: String,
    /// If false, signatures are not checked at all. **DANGER**
    pub signature_checks: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: Secret::default(),
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            signature_checks: true,
        }
    }
}

impl WebhookConfig {
    pub fn from_env_or_defaults() -> Self {
        let secret = env::var("RECON_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ RECON_WEBHOOK_SECRET is not set. Please set it to the signing secret shared with the provider. \
                 Every webhook call will be rejected until you do."
            );
            String::default()
        });
        let signature_header =
            env::var("RECON_WEBHOOK_SIGNATURE_HEADER").ok().unwrap_or_else(|| DEFAULT_SIGNATURE_HEADER.to_string());
        let signature_checks = parse_boolean_flag(env::var("RECON_WEBHOOK_SIGNATURE_CHECKS").ok(), true);
        if !signature_checks {
            warn!("🚨️ Webhook signature checks are DISABLED. Anyone can forge status updates. Do not run like this in production.");
        }
        Self { secret: Secret::new(secret), signature_header, signature_checks }
    }
}

//-------------------------------------------------  IdentityConfig  ---------------------------------------------------
/// Names of the headers the upstream gateway uses to pass on the authenticated identity.
#[derive(Clone, Debug)]
pub struct IdentityConfig {
    pub user_header: String,
    pub roles_header: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { user_header: DEFAULT_USER_HEADER.to_string(), roles_header: DEFAULT_ROLES_HEADER.to_string() }
    }
}

impl IdentityConfig {
    pub fn from_env_or_defaults() -> Self {
        let user_header = env::var("RECON_USER_HEADER").ok().unwrap_or_else(|| DEFAULT_USER_HEADER.to_string());
        let roles_header = env::var("RECON_ROLES_HEADER").ok().unwrap_or_else(|| DEFAULT_ROLES_HEADER.to_string());
        Self { user_header, roles_header }
    }
}

//-------------------------------------------------  PollConfig  -------------------------------------------------------
#[derive(Clone, Copy, Debug)]
pub struct PollConfig {
    /// Time between poll sweeps. A zero interval disables the poll worker.
    pub interval: Duration,
    /// The maximum number of open transactions polled per sweep.
    pub batch_size: i64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval: DEFAULT_POLL_INTERVAL, batch_size: DEFAULT_POLL_BATCH_SIZE }
    }
}

impl PollConfig {
    pub fn from_env_or_defaults() -> Self {
        let interval = env::var("RECON_POLL_INTERVAL")
            .map_err(|_| {
                info!(
                    "🪛️ RECON_POLL_INTERVAL is not set. Using the default value of {}s.",
                    DEFAULT_POLL_INTERVAL.as_secs()
                )
            })
            .and_then(|s| {
                s.parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| warn!("🪛️ Invalid configuration value for RECON_POLL_INTERVAL. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        let batch_size = env::var("RECON_POLL_BATCH_SIZE")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .ok()
                    .filter(|n| *n > 0)
                    .or_else(|| {
                        warn!("🪛️ RECON_POLL_BATCH_SIZE must be a positive integer, not {s}");
                        None
                    })
            })
            .unwrap_or(DEFAULT_POLL_BATCH_SIZE);
        Self { interval, batch_size }
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }
}
