//! # Redis
//!
//! Production [`ResultBackend`].
//!
//! ## Layout
//!
//! - `{db}:{collection}:{id}`: one hash per result
//!   (`accept_email`, `email`, `email_verification_token`, `traits`, `created_at`)
//! - `{db}:{collection}:ids`: set of every stored result id
//! - `{db}:statistics`: the counter hash (`cumulative_visitors`, `cumulative_shares`)
//!
//! Single-record mutations run as Lua scripts or `MULTI` pipelines so each one
//! is applied atomically. Counters use `HINCRBY`, which creates the hash on
//! first use; a counter past `i64::MAX` restarts at zero.

use crate::{
    ResultBackend,
    config::CoreConfig,
    result::{QuizResult, ResultInput, TraitScores},
    statistics::{Counter, Statistics},
};
use chrono::{DateTime, Utc};
use redis::{
    AsyncCommands, Client, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

const FIELD_ACCEPT_EMAIL: &str = "accept_email";
const FIELD_EMAIL: &str = "email";
const FIELD_TOKEN: &str = "email_verification_token";
const FIELD_TRAITS: &str = "traits";
const FIELD_CREATED_AT: &str = "created_at";

// HSET the given field/value pairs only if the hash exists.
const HSET_IF_EXISTS: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('HSET', KEYS[1], unpack(ARGV))
return 1
";

// ARGV[1] = traits json, ARGV[2] = requested accept_email ("1"/"0").
// accept_email may only go from 1 to 0.
const RESULT_UPDATE: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return 0
end
redis.call('HSET', KEYS[1], 'traits', ARGV[1])
if ARGV[2] == '0' then
    redis.call('HSET', KEYS[1], 'accept_email', '0')
end
return 1
";

// ARGV[1] = counter field. Wraps to 0 instead of failing on i64 overflow.
const COUNTER_INCREMENT: &str = r"
local ok, value = pcall(redis.call, 'HINCRBY', KEYS[1], ARGV[1], 1)
if ok then
    return value
end
local message = type(value) == 'table' and value.err or tostring(value)
if not string.find(message, 'overflow', 1, true) then
    return redis.error_reply(message)
end
redis.call('HSET', KEYS[1], ARGV[1], 0)
return 0
";

/// Redis backend errors.
#[derive(Debug, Error)]
pub enum RedisBackendError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Redis backend. Cheap to clone; clones share one multiplexed connection.
#[derive(Clone)]
pub struct RedisBackend {
    connection: ConnectionManager,
    keys: KeySpace,
    hset_if_exists: Script,
    result_update: Script,
    counter_increment: Script,
}

impl RedisBackend {
    /// Connect using the store settings from config.
    pub async fn connect(config: &CoreConfig) -> Result<Self, RedisBackendError> {
        let manager_config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(config.store_timeout)
            .set_response_timeout(config.store_timeout);

        let client = Client::open(config.store_uri.as_str())?;
        let connection = client
            .get_connection_manager_with_config(manager_config)
            .await?;

        tracing::info!(
            db = %config.store_db_name,
            collection = %config.store_collection,
            "connected to redis"
        );

        Ok(Self {
            connection,
            keys: KeySpace::new(&config.store_db_name, &config.store_collection),
            hset_if_exists: Script::new(HSET_IF_EXISTS),
            result_update: Script::new(RESULT_UPDATE),
            counter_increment: Script::new(COUNTER_INCREMENT),
        })
    }

    async fn result_load(
        &self,
        connection: &mut ConnectionManager,
        id: Uuid,
    ) -> Result<Option<QuizResult>, RedisBackendError> {
        let key = self.keys.result(id);
        let fields: HashMap<String, String> = connection.hgetall(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        result_decode(&key, id, fields).map(Some)
    }
}

impl ResultBackend for RedisBackend {
    type Error = RedisBackendError;

    async fn result_create(&self, input: &ResultInput) -> Result<QuizResult, Self::Error> {
        let result = QuizResult::from_input(Uuid::new_v4(), input);
        let fields = result_encode(&result)?;

        let mut connection = self.connection.clone();
        redis::pipe()
            .atomic()
            .hset_multiple(self.keys.result(result.id), &fields)
            .ignore()
            .sadd(self.keys.index(), result.id.to_string())
            .ignore()
            .query_async::<()>(&mut connection)
            .await?;

        Ok(result)
    }

    async fn result_get(&self, id: Uuid) -> Result<Option<QuizResult>, Self::Error> {
        let mut connection = self.connection.clone();
        self.result_load(&mut connection, id).await
    }

    async fn result_list(&self) -> Result<Vec<QuizResult>, Self::Error> {
        let mut connection = self.connection.clone();
        let members: Vec<String> = connection.smembers(self.keys.index()).await?;

        let mut results = Vec::with_capacity(members.len());
        for member in members {
            let id = Uuid::parse_str(&member).map_err(|e| RedisBackendError::Corrupt {
                key: self.keys.index(),
                reason: e.to_string(),
            })?;
            // Deleted between SMEMBERS and HGETALL.
            if let Some(result) = self.result_load(&mut connection, id).await? {
                results.push(result);
            }
        }

        results.sort_by_key(|r| r.created_at);
        Ok(results)
    }

    async fn result_update(&self, id: Uuid, input: &ResultInput) -> Result<bool, Self::Error> {
        let traits = serde_json::to_string(&input.traits)?;
        let mut connection = self.connection.clone();
        let updated: i64 = self
            .result_update
            .key(self.keys.result(id))
            .arg(traits)
            .arg(flag_encode(input.accept_email))
            .invoke_async(&mut connection)
            .await?;
        Ok(updated == 1)
    }

    async fn result_delete(&self, id: Uuid) -> Result<bool, Self::Error> {
        let mut connection = self.connection.clone();
        let (deleted, _): (i64, i64) = redis::pipe()
            .atomic()
            .del(self.keys.result(id))
            .srem(self.keys.index(), id.to_string())
            .query_async(&mut connection)
            .await?;
        Ok(deleted == 1)
    }

    async fn verification_token_set(&self, id: Uuid, token_hash: &str) -> Result<bool, Self::Error> {
        let mut connection = self.connection.clone();
        let updated: i64 = self
            .hset_if_exists
            .key(self.keys.result(id))
            .arg(FIELD_TOKEN)
            .arg(token_hash)
            .invoke_async(&mut connection)
            .await?;
        Ok(updated == 1)
    }

    async fn email_bind(&self, id: Uuid, email: &str) -> Result<bool, Self::Error> {
        let mut connection = self.connection.clone();
        let updated: i64 = self
            .hset_if_exists
            .key(self.keys.result(id))
            .arg(FIELD_EMAIL)
            .arg(email)
            .arg(FIELD_ACCEPT_EMAIL)
            .arg(flag_encode(false))
            .invoke_async(&mut connection)
            .await?;
        Ok(updated == 1)
    }

    async fn statistics_get(&self) -> Result<Option<Statistics>, Self::Error> {
        let key = self.keys.statistics();
        let mut connection = self.connection.clone();
        let fields: HashMap<String, String> = connection.hgetall(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }

        let read = |counter: Counter| -> Result<u64, RedisBackendError> {
            fields
                .get(counter.as_str())
                .map(|v| v.parse::<u64>())
                .transpose()
                .map(Option::unwrap_or_default)
                .map_err(|e| RedisBackendError::Corrupt {
                    key: key.clone(),
                    reason: format!("{}: {e}", counter.as_str()),
                })
        };

        Ok(Some(Statistics {
            cumulative_visitors: read(Counter::Visitors)?,
            cumulative_shares: read(Counter::Shares)?,
        }))
    }

    async fn statistics_increment(&self, counter: Counter) -> Result<(), Self::Error> {
        let mut connection = self.connection.clone();
        let _: i64 = self
            .counter_increment
            .key(self.keys.statistics())
            .arg(counter.as_str())
            .invoke_async(&mut connection)
            .await?;
        Ok(())
    }
}

/// Key naming for one database/collection pair.
#[derive(Debug, Clone, PartialEq, Eq)]
struct KeySpace {
    db: String,
    collection: String,
}

impl KeySpace {
    fn new(db: &str, collection: &str) -> Self {
        Self {
            db: db.to_owned(),
            collection: collection.to_owned(),
        }
    }

    fn result(&self, id: Uuid) -> String {
        format!("{}:{}:{}", self.db, self.collection, id)
    }

    fn index(&self) -> String {
        format!("{}:{}:ids", self.db, self.collection)
    }

    fn statistics(&self) -> String {
        format!("{}:statistics", self.db)
    }
}

fn flag_encode(flag: bool) -> &'static str {
    if flag { "1" } else { "0" }
}

fn result_encode(result: &QuizResult) -> Result<Vec<(&'static str, String)>, RedisBackendError> {
    let mut fields = vec![
        (FIELD_ACCEPT_EMAIL, flag_encode(result.accept_email).to_owned()),
        (FIELD_TRAITS, serde_json::to_string(&result.traits)?),
        (FIELD_CREATED_AT, result.created_at.to_rfc3339()),
    ];
    if let Some(email) = &result.email {
        fields.push((FIELD_EMAIL, email.clone()));
    }
    if let Some(token) = &result.email_verification_token {
        fields.push((FIELD_TOKEN, token.clone()));
    }
    Ok(fields)
}

fn result_decode(
    key: &str,
    id: Uuid,
    mut fields: HashMap<String, String>,
) -> Result<QuizResult, RedisBackendError> {
    let corrupt = |reason: String| RedisBackendError::Corrupt {
        key: key.to_owned(),
        reason,
    };

    let accept_email = match fields.get(FIELD_ACCEPT_EMAIL).map(String::as_str) {
        Some("1") => true,
        Some("0") => false,
        other => return Err(corrupt(format!("accept_email = {other:?}"))),
    };
    let traits: TraitScores = fields
        .get(FIELD_TRAITS)
        .ok_or_else(|| corrupt("missing traits".to_string()))
        .and_then(|raw| serde_json::from_str(raw).map_err(|e| corrupt(e.to_string())))?;
    let created_at = fields
        .get(FIELD_CREATED_AT)
        .ok_or_else(|| corrupt("missing created_at".to_string()))
        .and_then(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| corrupt(e.to_string()))
        })?;

    Ok(QuizResult {
        id,
        accept_email,
        email: fields.remove(FIELD_EMAIL),
        email_verification_token: fields.remove(FIELD_TOKEN),
        traits,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BackendContext;

    // Set to a disposable Redis instance, e.g. `redis://127.0.0.1:6379/15`,
    // to run the store checks. Each backend gets its own key prefix.
    const TEST_STORE_URI: &str = "PASULOL_TEST_STORE_URI";

    struct RedisContext;

    impl BackendContext for RedisContext {
        type Backend = RedisBackend;

        async fn spawn() -> Option<RedisBackend> {
            let Ok(store_uri) = std::env::var(TEST_STORE_URI) else {
                eprintln!("{TEST_STORE_URI} not set, skipping redis store check");
                return None;
            };
            let config = CoreConfig {
                store_uri,
                store_db_name: format!("PasulolCoreTest-{}", Uuid::new_v4()),
                ..CoreConfig::default()
            };
            Some(RedisBackend::connect(&config).await.expect("connect to test redis"))
        }
    }

    crate::backend_suite!(RedisContext);

    #[tokio::test]
    async fn counter_wraps_to_zero_past_i64_max() {
        let Some(backend) = RedisContext::spawn().await else { return };
        let mut connection = backend.connection.clone();
        let _: () = connection
            .hset(
                backend.keys.statistics(),
                Counter::Visitors.as_str(),
                i64::MAX,
            )
            .await
            .unwrap();

        backend.statistics_increment(Counter::Visitors).await.unwrap();

        let stats = backend.statistics_get().await.unwrap().unwrap();
        assert_eq!(stats.cumulative_visitors, 0);

        backend.statistics_increment(Counter::Visitors).await.unwrap();
        let stats = backend.statistics_get().await.unwrap().unwrap();
        assert_eq!(stats.cumulative_visitors, 1);
    }

    #[tokio::test]
    async fn counter_increment_surfaces_corrupt_values() {
        let Some(backend) = RedisContext::spawn().await else { return };
        let mut connection = backend.connection.clone();
        let _: () = connection
            .hset(backend.keys.statistics(), Counter::Shares.as_str(), "many")
            .await
            .unwrap();

        assert!(backend.statistics_increment(Counter::Shares).await.is_err());
    }

    fn stored(result: &QuizResult) -> HashMap<String, String> {
        result_encode(result)
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn keys_are_namespaced_by_db_and_collection() {
        let keys = KeySpace::new("PasulolCoreAPI", "results");
        let id = Uuid::nil();

        assert_eq!(
            keys.result(id),
            "PasulolCoreAPI:results:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(keys.index(), "PasulolCoreAPI:results:ids");
        assert_eq!(keys.statistics(), "PasulolCoreAPI:statistics");
    }

    #[test]
    fn fresh_records_store_no_email_fields() {
        let input = ResultInput {
            accept_email: true,
            traits: TraitScores::default(),
        };
        let result = QuizResult::from_input(Uuid::new_v4(), &input);

        let fields = stored(&result);
        assert!(!fields.contains_key(FIELD_EMAIL));
        assert!(!fields.contains_key(FIELD_TOKEN));
        assert_eq!(fields[FIELD_ACCEPT_EMAIL], "1");
    }

    #[test]
    fn decode_restores_verified_records() {
        let input = ResultInput {
            accept_email: true,
            traits: TraitScores {
                head_center: 4,
                ..Default::default()
            },
        };
        let mut result = QuizResult::from_input(Uuid::new_v4(), &input);
        result.accept_email = false;
        result.email = Some("a@x.com".to_string());
        result.email_verification_token = Some("digest".to_string());

        let decoded = result_decode("k", result.id, stored(&result)).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn decode_rejects_records_without_flag() {
        let mut fields = HashMap::new();
        fields.insert(FIELD_TRAITS.to_string(), "{}".to_string());

        let error = result_decode("k", Uuid::nil(), fields).unwrap_err();
        assert!(matches!(error, RedisBackendError::Corrupt { .. }));
    }
}
