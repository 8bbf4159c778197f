//! Core partitioner trait definitions.

use crate::error::{Error, Result};
use crate::token::Token;

/// A partitioner converts keys into tokens for placement on the hash ring.
///
/// Partitioners are stateless and thread-safe, allowing concurrent
/// token generation without synchronization overhead.
pub trait Partitioner: Send + Sync + 'static {
    /// Hashes raw key bytes onto the ring.
    ///
    /// Implementations must be deterministic and spread keys roughly
    /// uniformly over the whole signed 64-bit range.
    fn partition(&self, key: &[u8]) -> Token;

    /// Returns the name of this partitioner.
    fn name(&self) -> &'static str;

    /// Computes the token of a partition key.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidKey`] when `key` is empty.
    fn token(&self, key: &str) -> Result<Token> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }
        Ok(self.partition(key.as_bytes()))
    }

    /// Minimum token value for this partitioner.
    fn min_token(&self) -> Token {
        Token::MIN
    }

    /// Maximum token value for this partitioner.
    fn max_token(&self) -> Token {
        Token::MAX
    }
}
