use crate::redis_client::RedisClient;

pub mod availability;

#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    availability_ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, availability_ttl_seconds: u64) -> Self {
        Self {
            redis,
            availability_ttl_seconds,
        }
    }
}
