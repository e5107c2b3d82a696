use parking_lot::Mutex;
use redis::{Commands, Connection, ErrorKind, RedisError};
use tracing::debug;

use super::{OrderedStore, RawEntry, StoreError};
use crate::config::RedisConfig;

/// A store backed by a Redis server, one sorted set per key.
///
/// Requests are serialized over a single connection. Wrap the store in an
/// `Arc` to share it between threads, or open one per thread for
/// parallelism.
pub struct RedisStore {
    conn: Mutex<Connection>,
}

impl core::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl From<RedisError> for StoreError {
    fn from(error: RedisError) -> Self {
        let mismatched = error.kind() == ErrorKind::TypeError
            || error.code() == Some("WRONGTYPE")
            || error.detail().is_some_and(|detail| detail.contains("not a number"));
        if mismatched {
            StoreError::Inconsistent(error.to_string())
        } else {
            StoreError::Unavailable(Box::new(error))
        }
    }
}

/// Renders a score bound the way `ZRANGEBYSCORE` expects it.
fn bound(score: f64) -> String {
    match score {
        s if s.is_infinite() && s > 0.0 => "+inf".to_owned(),
        s if s.is_infinite() => "-inf".to_owned(),
        s => s.to_string(),
    }
}

fn parse_score(raw: &[u8]) -> Result<f64, StoreError> {
    core::str::from_utf8(raw)
        .ok()
        .and_then(|text| text.parse::<f64>().ok())
        .filter(|score| !score.is_nan())
        .ok_or_else(|| StoreError::Inconsistent(format!("unparseable score {:?}", raw.escape_ascii().to_string())))
}

/// Pairs up a flat `member, score, member, score, …` WITHSCORES reply.
fn pairs(reply: Vec<Vec<u8>>) -> Result<Vec<RawEntry>, StoreError> {
    if reply.len() % 2 != 0 {
        return Err(StoreError::Inconsistent("WITHSCORES reply has a dangling member".to_owned()));
    }
    let mut entries = Vec::with_capacity(reply.len() / 2);
    let mut reply = reply.into_iter();
    while let (Some(member), Some(score)) = (reply.next(), reply.next()) {
        entries.push((member, parse_score(&score)?));
    }
    Ok(entries)
}

impl RedisStore {
    /// Connects to the server described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the URL is invalid or the
    /// server cannot be reached.
    pub fn open(config: &RedisConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.url.as_str())?;
        let conn = match config.timeout() {
            Some(timeout) => {
                let conn = client.get_connection_with_timeout(timeout)?;
                conn.set_read_timeout(Some(timeout))?;
                conn.set_write_timeout(Some(timeout))?;
                conn
            }
            None => client.get_connection()?,
        };
        debug!(url = %config.url, timeout_ms = ?config.timeout_ms, "connected to redis");
        Ok(Self::from_connection(conn))
    }

    /// Wraps an already established connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }
}

impl OrderedStore for RedisStore {
    fn put(&self, key: &str, member: &[u8], score: f64) -> Result<(), StoreError> {
        Ok(self.conn.lock().zadd(key, member, score)?)
    }

    fn put_many(&self, key: &str, entries: &[RawEntry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let items: Vec<(f64, &[u8])> = entries.iter().map(|(member, score)| (*score, member.as_slice())).collect();
        Ok(self.conn.lock().zadd_multiple(key, &items[..])?)
    }

    fn incr(&self, key: &str, member: &[u8], amount: f64) -> Result<f64, StoreError> {
        let score: Vec<u8> = self.conn.lock().zincr(key, member, amount)?;
        parse_score(&score)
    }

    fn remove(&self, key: &str, member: &[u8]) -> Result<(), StoreError> {
        Ok(self.conn.lock().zrem(key, member)?)
    }

    fn remove_many(&self, key: &str, members: &[Vec<u8>]) -> Result<(), StoreError> {
        if members.is_empty() {
            return Ok(());
        }
        Ok(self.conn.lock().zrem(key, members)?)
    }

    fn score_of(&self, key: &str, member: &[u8]) -> Result<Option<f64>, StoreError> {
        let score: Option<Vec<u8>> = self.conn.lock().zscore(key, member)?;
        score.as_deref().map(parse_score).transpose()
    }

    fn rank_of(&self, key: &str, member: &[u8], reverse: bool) -> Result<Option<usize>, StoreError> {
        let mut conn = self.conn.lock();
        let rank: Option<usize> = if reverse { conn.zrevrank(key, member)? } else { conn.zrank(key, member)? };
        Ok(rank)
    }

    fn size(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.conn.lock().zcard(key)?)
    }

    fn range_by_rank(&self, key: &str, start: isize, stop: isize, reverse: bool) -> Result<Vec<RawEntry>, StoreError> {
        let mut conn = self.conn.lock();
        let reply: Vec<Vec<u8>> = if reverse {
            conn.zrevrange_withscores(key, start, stop)?
        } else {
            conn.zrange_withscores(key, start, stop)?
        };
        pairs(reply)
    }

    fn range_by_score(&self, key: &str, min: f64, max: f64, reverse: bool) -> Result<Vec<RawEntry>, StoreError> {
        let mut conn = self.conn.lock();
        let reply: Vec<Vec<u8>> = if reverse {
            conn.zrevrangebyscore_withscores(key, bound(max), bound(min))?
        } else {
            conn.zrangebyscore_withscores(key, bound(min), bound(max))?
        };
        pairs(reply)
    }

    fn count_by_score(&self, key: &str, min: f64, max: f64) -> Result<usize, StoreError> {
        Ok(self.conn.lock().zcount(key, bound(min), bound(max))?)
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        Ok(self.conn.lock().del(key)?)
    }

    fn replace(&self, key: &str, entries: &[RawEntry]) -> Result<(), StoreError> {
        let mut pipe = redis::pipe();
        pipe.atomic().del(key).ignore();
        if !entries.is_empty() {
            let items: Vec<(f64, &[u8])> = entries.iter().map(|(member, score)| (*score, member.as_slice())).collect();
            pipe.zadd_multiple(key, &items[..]).ignore();
        }
        pipe.query::<()>(&mut *self.conn.lock())?;
        Ok(())
    }

    fn copy_snapshot(&self, key: &str, new_key: &str) -> Result<(), StoreError> {
        redis::pipe()
            .atomic()
            .del(new_key)
            .ignore()
            .cmd("ZUNIONSTORE")
            .arg(new_key)
            .arg(1)
            .arg(key)
            .ignore()
            .query::<()>(&mut *self.conn.lock())?;
        Ok(())
    }
}
