use std::{env, net::IpAddr, time::Duration};

use checkout_common::{parse_boolean_flag, Secret, DEFAULT_CURRENCY_CODE};
use checkout_engine::fulfilment::FulfilmentConfig;
use gateway_tools::GatewayConfig;
use log::*;

const DEFAULT_SFC_HOST: &str = "127.0.0.1";
const DEFAULT_SFC_PORT: u16 = 8470;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// ISO code of the currency used for every gateway order
    pub currency: String,
    pub gateway: GatewayConfig,
    /// The HMAC key for gateway webhooks. This is a different key to the gateway API secret.
    pub webhook_secret: Secret<String>,
    /// If supplied, requests against the webhook endpoint will be checked against a whitelist of gateway IP addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub gateway_whitelist: Option<Vec<IpAddr>>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the connection's
    /// remote address.
    pub use_forwarded: bool,
    /// Bearer token for the back-office routes. When empty, the back-office routes reject every request.
    pub admin_token: Secret<String>,
    pub smtp: Option<SmtpConfig>,
    pub fulfilment: FulfilmentConfig,
    /// Capacity of each event hook channel
    pub event_buffer_size: usize,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Secret<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SFC_HOST.to_string(),
            port: DEFAULT_SFC_PORT,
            database_url: String::default(),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            gateway: GatewayConfig::default(),
            webhook_secret: Secret::default(),
            gateway_whitelist: None,
            use_x_forwarded_for: false,
            use_forwarded: false,
            admin_token: Secret::default(),
            smtp: None,
            fulfilment: FulfilmentConfig::default(),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SFC_HOST").ok().unwrap_or_else(|| DEFAULT_SFC_HOST.into());
        let port = env::var("SFC_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SFC_PORT. {e} Using the default, {DEFAULT_SFC_PORT}, instead."
                    );
                    DEFAULT_SFC_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SFC_PORT);
        let database_url = env::var("SFC_DATABASE_URL").ok().unwrap_or_else(|| {
            let url = checkout_engine::db_url();
            warn!("🪛️ SFC_DATABASE_URL is not set. Using {url}.");
            url
        });
        let currency = env::var("SFC_CURRENCY").ok().unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());
        let gateway = GatewayConfig::new_from_env_or_default();
        let webhook_secret = env::var("SFC_GATEWAY_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ SFC_GATEWAY_WEBHOOK_SECRET is not set. Please set it to the webhook secret configured on the \
                 gateway dashboard. Every webhook will be rejected until you do."
            );
            String::default()
        });
        let gateway_whitelist = env::var("SFC_GATEWAY_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        log_whitelist(&gateway_whitelist);
        let use_x_forwarded_for = parse_boolean_flag(env::var("SFC_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SFC_USE_FORWARDED").ok(), false);
        let admin_token = env::var("SFC_ADMIN_TOKEN").ok().unwrap_or_else(|| {
            warn!("🪛️ SFC_ADMIN_TOKEN is not set. The back-office routes will reject every request.");
            String::default()
        });
        let smtp = SmtpConfig::from_env();
        let fulfilment = fulfilment_config_from_env();
        let event_buffer_size = env::var("SFC_EVENT_BUFFER_SIZE")
            .ok()
            .and_then(|s| {
                s.parse::<usize>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for SFC_EVENT_BUFFER_SIZE. {e}"))
                    .ok()
            })
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
        Self {
            host,
            port,
            database_url,
            currency,
            gateway,
            webhook_secret: Secret::new(webhook_secret),
            gateway_whitelist,
            use_x_forwarded_for,
            use_forwarded,
            admin_token: Secret::new(admin_token),
            smtp,
            fulfilment,
            event_buffer_size,
        }
    }

    /// The bound on the remote order-creation call.
    pub fn gateway_timeout(&self) -> Duration {
        self.gateway.timeout
    }
}

impl SmtpConfig {
    /// Outbound mail is optional. Without `SFC_SMTP_HOST`, invoices are rendered but not emailed.
    pub fn from_env() -> Option<Self> {
        let host = match env::var("SFC_SMTP_HOST") {
            Ok(h) if !h.trim().is_empty() => h,
            _ => {
                info!("🪛️ SFC_SMTP_HOST is not set. Invoices will not be emailed.");
                return None;
            },
        };
        let port = env::var("SFC_SMTP_PORT")
            .ok()
            .and_then(|s| {
                s.parse::<u16>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for SFC_SMTP_PORT. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_SMTP_PORT);
        let username = env::var("SFC_SMTP_USERNAME").ok().filter(|s| !s.is_empty());
        let password = Secret::new(env::var("SFC_SMTP_PASSWORD").unwrap_or_default());
        Some(Self { host, port, username, password })
    }
}

fn fulfilment_config_from_env() -> FulfilmentConfig {
    let defaults = FulfilmentConfig::default();
    let store_name = env::var("SFC_STORE_NAME").ok().unwrap_or(defaults.store_name);
    let mail_from = env::var("SFC_MAIL_FROM").ok().unwrap_or_else(|| {
        info!("🪛️ SFC_MAIL_FROM is not set. Invoices will be sent from {}", defaults.mail_from);
        defaults.mail_from
    });
    FulfilmentConfig { store_name, mail_from }
}

/// Parses a comma-separated list of IP addresses. "none", "false" and "0" disable the whitelist. Invalid entries are
/// skipped.
pub fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Gateway IP whitelist is disabled. If this is not what you want, set SFC_GATEWAY_IP_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse()
                .map_err(|e| {
                    warn!("🪛️ Ignoring invalid IP address ({s}) in SFC_GATEWAY_IP_WHITELIST: {e}");
                })
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

fn log_whitelist(whitelist: &Option<Vec<IpAddr>>) {
    match whitelist {
        Some(whitelist) if whitelist.is_empty() => {
            warn!(
                "🚨️ The gateway IP whitelist was configured, but is empty. The server will run, but won't accept any \
                 webhooks."
            );
        },
        None => {
            info!("🪛️ No gateway IP whitelist is set. Only signature validation will be used for webhooks.");
        },
        Some(v) => {
            let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
            info!("🪛️ Gateway IP whitelist: {addrs}");
        },
    }
}
