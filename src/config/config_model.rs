#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub mercado_pago: MercadoPago,
    pub reconciliation: Reconciliation,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct MercadoPago {
    pub base_url: String,
    pub access_token: String,
    pub search_limit: u32,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub lookup_max_attempts: u32,
    pub lookup_retry_delay_ms: u64,
    pub cache_ttl_seconds: i64,
}
