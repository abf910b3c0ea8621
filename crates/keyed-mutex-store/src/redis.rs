//! Redis store adapter.

use std::time::Duration;

use fred::prelude::*;
use fred::types::CustomCommand;
use keyed_mutex_core::error::{LockError, LockResult};
use keyed_mutex_core::store::StoreAdapter;
use keyed_mutex_core::token::Token;

/// A single Redis node used as a lock store.
///
/// For quorum locking, connect one `RedisStore` per independent node
/// (ideally 3 or 5); replicas of one primary are not independent.
#[derive(Clone)]
pub struct RedisStore {
    client: RedisClient,
}

impl RedisStore {
    /// Lua script deleting the key only if it holds the caller's token.
    const COMPARE_AND_DELETE_LUA: &'static str = r#"
        if redis.call('get', KEYS[1]) == ARGV[1] then
            return redis.call('del', KEYS[1])
        end
        return 0
    "#;

    /// Returns a new builder for connecting one node.
    pub fn builder() -> RedisStoreBuilder {
        RedisStoreBuilder::new()
    }

    /// Wraps an existing, already connected client.
    pub fn from_client(client: RedisClient) -> Self {
        Self { client }
    }

    /// Connects to the node at `url`.
    pub async fn connect(url: &str) -> LockResult<Self> {
        Self::builder().url(url).build().await
    }

    /// Connects to every node in `urls`, in order.
    pub async fn connect_all(urls: &[impl AsRef<str>]) -> LockResult<Vec<Self>> {
        let mut stores = Vec::with_capacity(urls.len());
        for url in urls {
            stores.push(Self::connect(url.as_ref()).await?);
        }
        Ok(stores)
    }

    pub fn client(&self) -> &RedisClient {
        &self.client
    }
}

/// Builder for a [`RedisStore`].
pub struct RedisStoreBuilder {
    url: Option<String>,
    client: Option<RedisClient>,
}

impl RedisStoreBuilder {
    /// Creates a new builder with no node configured.
    pub fn new() -> Self {
        Self {
            url: None,
            client: None,
        }
    }

    /// Sets the node URL, e.g. `redis://node-a:6379`.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Uses an existing client instead of connecting from a URL.
    pub fn client(mut self, client: RedisClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Connects and builds the store.
    ///
    /// # Errors
    ///
    /// * `LockError::Configuration` - neither or both of URL and client set,
    ///   or the URL does not parse
    /// * `LockError::Adapter` - the node could not be reached
    pub async fn build(self) -> LockResult<RedisStore> {
        let url = match (self.url, self.client) {
            (None, Some(client)) => return Ok(RedisStore { client }),
            (Some(url), None) => url,
            (None, None) => {
                return Err(LockError::Configuration(
                    "no Redis URL or client provided".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(LockError::Configuration(
                    "set either a Redis URL or a client, not both".to_string(),
                ));
            }
        };

        let config = RedisConfig::from_url(&url).map_err(|e| {
            LockError::Configuration(format!("invalid Redis URL '{url}': {e}"))
        })?;

        let client = RedisClient::new(config, None, None, None);
        client.connect();
        client
            .wait_for_connect()
            .await
            .map_err(|e| {
                LockError::adapter(format!("failed to connect to Redis at '{url}': {e}"))
            })?;

        Ok(RedisStore { client })
    }
}

impl Default for RedisStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn redis_error(operation: &str, error: RedisError) -> LockError {
    LockError::adapter(format!("Redis {operation} failed: {error}"))
}

impl StoreAdapter for RedisStore {
    async fn put_if_absent(&self, key: &str, token: &Token, ttl: Duration) -> LockResult<bool> {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX).max(1);

        // SET NX returns OK if the key was set, nil if it already exists
        let result: Option<String> = self
            .client
            .set(
                key,
                token.as_str(),
                Some(Expiration::PX(ttl_millis)),
                Some(SetOptions::NX),
                false,
            )
            .await
            .map_err(|e| redis_error("SET NX", e))?;

        Ok(result.is_some())
    }

    async fn compare_and_delete(&self, key: &str, expected: &Token) -> LockResult<bool> {
        let args: Vec<RedisValue> = vec![
            Self::COMPARE_AND_DELETE_LUA.into(),
            1_i64.into(), // numkeys
            key.into(),
            expected.as_str().into(),
        ];

        let cmd = CustomCommand::new_static("EVAL", None, false);
        let removed: i64 = self
            .client
            .custom(cmd, args)
            .await
            .map_err(|e| redis_error("EVAL (compare-and-delete)", e))?;

        Ok(removed == 1)
    }

    async fn delete(&self, key: &str) -> LockResult<bool> {
        let removed: i64 = self
            .client
            .del(key)
            .await
            .map_err(|e| redis_error("DEL", e))?;

        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builder_requires_a_node() {
        let result = RedisStore::builder().build().await;
        assert!(matches!(result, Err(LockError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_builder_rejects_malformed_url() {
        let result = RedisStore::builder().url("not a url").build().await;
        assert!(matches!(result, Err(LockError::Configuration(_))));
    }
}
