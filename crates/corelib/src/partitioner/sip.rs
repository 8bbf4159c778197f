//! SipHash partitioner implementation.

use crate::partitioner::traits::Partitioner;
use crate::token::Token;
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Fixed SipHash keys so tokens are stable across processes and releases.
const KEY0: u64 = 0x5ca1_ab1e_0b5e_55ed;
const KEY1: u64 = 0x0dd_ba11_c0ff_ee00;

/// Default partitioner: SipHash-1-3 of the key bytes, reinterpreted as `i64`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SipPartitioner;

impl Partitioner for SipPartitioner {
    fn partition(&self, key: &[u8]) -> Token {
        let mut hasher = SipHasher13::new_with_keys(KEY0, KEY1);
        hasher.write(key);
        Token(hasher.finish() as i64)
    }

    fn name(&self) -> &'static str {
        "SipPartitioner"
    }
}
