use anyhow::{Ok, Result};

use super::config_model::{Database, DotEnvyConfig, MercadoPago, Reconciliation, Server};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let mercado_pago = MercadoPago {
        base_url: std::env::var("MERCADO_PAGO_BASE_URL")
            .unwrap_or_else(|_| "https://api.mercadopago.com".to_string()),
        access_token: std::env::var("MERCADO_PAGO_ACCESS_TOKEN")
            .expect("MERCADO_PAGO_ACCESS_TOKEN is invalid"),
        search_limit: std::env::var("MERCADO_PAGO_SEARCH_LIMIT")
            .unwrap_or_else(|_| "20".to_string())
            .parse()?,
    };

    let reconciliation = Reconciliation {
        lookup_max_attempts: std::env::var("RECONCILE_LOOKUP_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".to_string())
            .parse()?,
        lookup_retry_delay_ms: std::env::var("RECONCILE_LOOKUP_RETRY_DELAY_MS")
            .unwrap_or_else(|_| "2000".to_string())
            .parse()?,
        cache_ttl_seconds: std::env::var("RECONCILE_CACHE_TTL_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()?,
    };

    Ok(DotEnvyConfig {
        server,
        database,
        mercado_pago,
        reconciliation,
    })
}
