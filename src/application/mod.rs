pub mod payment_lookup;
pub mod ttl_cache;
pub mod usecases;
