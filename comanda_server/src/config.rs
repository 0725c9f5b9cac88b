use std::env;

use chrono::Duration;
use chrono_tz::Tz;
use comanda_common::{env_flag, Secret};
use comanda_engine::DEFAULT_FEED_MAX_ORDERS;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use whatsapp_tools::WhatsAppConfig;

use crate::errors::ServerError;

const DEFAULT_COMANDA_HOST: &str = "127.0.0.1";
const DEFAULT_COMANDA_PORT: u16 = 8380;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/comanda.db";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Sao_Paulo;
const DEFAULT_COUNTRY_CODE: &str = "55";
const DEFAULT_FEED_INTERVAL_SECS: u64 = 5;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// The timezone that business days (display id sequences) and billing months are counted in.
    pub timezone: Tz,
    /// Prefixed to customer phone numbers that were entered without one.
    pub default_country_code: String,
    pub feed: FeedConfig,
    pub whatsapp: WhatsAppConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_COMANDA_HOST.to_string(),
            port: DEFAULT_COMANDA_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            timezone: DEFAULT_TIMEZONE,
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            feed: FeedConfig::default(),
            whatsapp: WhatsAppConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("COMANDA_HOST").ok().unwrap_or_else(|| DEFAULT_COMANDA_HOST.into());
        let port = env::var("COMANDA_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for COMANDA_PORT. {e} Using the default, {DEFAULT_COMANDA_PORT}, \
                         instead."
                    );
                    DEFAULT_COMANDA_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_COMANDA_PORT);
        let database_url = env::var("COMANDA_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ COMANDA_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::from_env_or_default();
        let use_x_forwarded_for = env_flag("COMANDA_USE_X_FORWARDED_FOR", false);
        let use_forwarded = env_flag("COMANDA_USE_FORWARDED", false);
        let timezone = configure_timezone(env::var("COMANDA_TIMEZONE").ok());
        let default_country_code = env::var("COMANDA_DEFAULT_COUNTRY_CODE")
            .ok()
            .map(|s| s.trim().trim_start_matches('+').to_string())
            .filter(|s| {
                let valid = !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
                if !valid {
                    warn!("🪛️ COMANDA_DEFAULT_COUNTRY_CODE '{s}' is not a numeric country code. Using the default.");
                }
                valid
            })
            .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string());
        let feed = FeedConfig::from_env_or_default();
        let whatsapp = WhatsAppConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            auth,
            use_x_forwarded_for,
            use_forwarded,
            timezone,
            default_country_code,
            feed,
            whatsapp,
        }
    }
}

fn configure_timezone(value: Option<String>) -> Tz {
    match value {
        Some(s) => s.trim().parse::<Tz>().unwrap_or_else(|e| {
            warn!("🪛️ COMANDA_TIMEZONE '{s}' is not a valid timezone. {e}. Using {DEFAULT_TIMEZONE} instead.");
            DEFAULT_TIMEZONE
        }),
        None => {
            info!("🪛️ COMANDA_TIMEZONE is not set. Using {DEFAULT_TIMEZONE}.");
            DEFAULT_TIMEZONE
        },
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HMAC key that session tokens are signed with
    pub session_secret: Secret<String>,
    pub session_ttl: Duration,
    /// The HMAC key that internal callers sign `X-Tenant-Id` headers with. The header is ignored when this is `None`.
    pub internal_secret: Option<Secret<String>>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: Secret::new(random_secret()),
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            internal_secret: None,
        }
    }
}

impl AuthConfig {
    pub fn from_env_or_default() -> Self {
        let session_secret = match Self::try_session_secret_from_env() {
            Ok(secret) => secret,
            Err(e) => {
                warn!(
                    "🪛️ {e}. A random session key will be used. Sessions will not survive a restart, nor be shared \
                     between server instances."
                );
                Secret::new(random_secret())
            },
        };
        let session_ttl = env::var("COMANDA_SESSION_TTL_HOURS")
            .ok()
            .map(|s| match s.parse::<i64>() {
                Ok(h) if h > 0 => Duration::hours(h),
                _ => {
                    warn!(
                        "🪛️ COMANDA_SESSION_TTL_HOURS '{s}' is not a positive number of hours. Using \
                         {DEFAULT_SESSION_TTL_HOURS}."
                    );
                    Duration::hours(DEFAULT_SESSION_TTL_HOURS)
                },
            })
            .unwrap_or_else(|| Duration::hours(DEFAULT_SESSION_TTL_HOURS));
        let internal_secret = Secret::from_env("COMANDA_INTERNAL_SECRET");
        if internal_secret.is_none() {
            info!("🪛️ COMANDA_INTERNAL_SECRET is not set. X-Tenant-Id headers will be ignored.");
        }
        Self { session_secret, session_ttl, internal_secret }
    }

    fn try_session_secret_from_env() -> Result<Secret<String>, ServerError> {
        let secret = env::var("COMANDA_SESSION_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [COMANDA_SESSION_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "COMANDA_SESSION_SECRET must be at least 32 characters long".to_string(),
            ));
        }
        Ok(Secret::new(secret))
    }
}

fn random_secret() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(64).map(char::from).collect()
}

//-------------------------------------------------  FeedConfig  -------------------------------------------------------
#[derive(Clone, Copy, Debug)]
pub struct FeedConfig {
    /// Time between two snapshots of the live order feed
    pub interval: std::time::Duration,
    pub max_orders: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval: std::time::Duration::from_secs(DEFAULT_FEED_INTERVAL_SECS),
            max_orders: DEFAULT_FEED_MAX_ORDERS,
        }
    }
}

impl FeedConfig {
    pub fn from_env_or_default() -> Self {
        let interval = env::var("COMANDA_FEED_INTERVAL_SECS")
            .ok()
            .and_then(|s| match s.parse::<u64>() {
                Ok(secs) if secs > 0 => Some(secs),
                _ => {
                    warn!("🪛️ COMANDA_FEED_INTERVAL_SECS '{s}' is invalid. Using {DEFAULT_FEED_INTERVAL_SECS}s.");
                    None
                },
            })
            .unwrap_or(DEFAULT_FEED_INTERVAL_SECS);
        let max_orders = env::var("COMANDA_FEED_MAX_ORDERS")
            .ok()
            .and_then(|s| match s.parse::<i64>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    warn!("🪛️ COMANDA_FEED_MAX_ORDERS '{s}' is invalid. Using {DEFAULT_FEED_MAX_ORDERS}.");
                    None
                },
            })
            .unwrap_or(DEFAULT_FEED_MAX_ORDERS);
        Self { interval: std::time::Duration::from_secs(interval), max_orders }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that handlers need at request time. Secrets are kept out of it.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub session_ttl: Duration,
    pub feed_interval: std::time::Duration,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            session_ttl: config.auth.session_ttl,
            feed_interval: config.feed.interval,
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}
