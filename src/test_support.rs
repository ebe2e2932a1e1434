//! A minimal in-memory [`Host`] used only by this crate's own unit tests.
//! Real embedders bring their own state-backed implementation; this one
//! exists so `analysis`/`interpreter` tests don't need one.

#![cfg(test)]

use std::collections::HashMap;

use bytes::Bytes;

use crate::host::{AccessStatus, CallOutcome, CallParams, Host};
use crate::word::{Address, Hash, Word};

/// A zero-state [`Host`] for tests that exercise pure stack/gas/memory logic
/// and never actually touch the host (block/tx reads all return defaults,
/// state-mutating calls are no-ops). Cheaper to stand up than [`MockHost`]
/// when a test's handler never reaches the host at all.
#[derive(Debug, Default)]
pub(crate) struct NullHost;

impl Host for NullHost {
    fn code_of(&self, _address: Address) -> Bytes {
        Bytes::new()
    }

    fn code_hash_of(&self, _address: Address) -> Hash {
        Hash::zero()
    }

    fn code_size_of(&self, _address: Address) -> u64 {
        0
    }

    fn balance_of(&self, _address: Address) -> Word {
        Word::zero()
    }

    fn nonce_of(&self, _address: Address) -> u64 {
        0
    }

    fn exists(&self, _address: Address) -> bool {
        false
    }

    fn sload(&mut self, _address: Address, _key: Word) -> Word {
        Word::zero()
    }

    fn sstore(&mut self, _address: Address, _key: Word, _value: Word) {}

    fn tload(&mut self, _address: Address, _key: Word) -> Word {
        Word::zero()
    }

    fn tstore(&mut self, _address: Address, _key: Word, _value: Word) {}

    fn original_value(&self, _address: Address, _key: Word) -> Word {
        Word::zero()
    }

    fn add_gas_refund(&mut self, _delta: i64) {}

    fn access_address(&mut self, _address: Address) -> AccessStatus {
        AccessStatus::Warm
    }

    fn access_storage(&mut self, _address: Address, _key: Word) -> AccessStatus {
        AccessStatus::Warm
    }

    fn keccak256(&self, _data: &[u8]) -> Hash {
        Hash::zero()
    }

    fn emit_log(&mut self, _address: Address, _topics: &[Word], _data: Bytes) {}

    fn call(&mut self, _params: CallParams) -> CallOutcome {
        CallOutcome {
            success: true,
            gas_left: 0,
            output: Bytes::new(),
            created_address: None,
        }
    }

    fn block_number(&self) -> u64 {
        0
    }

    fn block_timestamp(&self) -> u64 {
        0
    }

    fn block_coinbase(&self) -> Address {
        Address::zero()
    }

    fn block_basefee(&self) -> Word {
        Word::zero()
    }

    fn block_prevrandao(&self) -> Word {
        Word::zero()
    }

    fn block_gaslimit(&self) -> u64 {
        30_000_000
    }

    fn block_chainid(&self) -> u64 {
        1
    }

    fn tx_origin(&self) -> Address {
        Address::zero()
    }

    fn tx_gasprice(&self) -> Word {
        Word::zero()
    }

    fn blob_hashes(&self) -> &[Hash] {
        &[]
    }

    fn blob_basefee(&self) -> Word {
        Word::zero()
    }

    fn block_hash(&self, _block_number: u64) -> Hash {
        Hash::zero()
    }

    fn mark_selfdestruct(&mut self, _address: Address, _beneficiary: Address) {}

    fn is_eip150(&self) -> bool {
        true
    }

    fn is_eip158(&self) -> bool {
        true
    }

    fn is_eip1559(&self) -> bool {
        true
    }

    fn is_berlin(&self) -> bool {
        true
    }

    fn is_shanghai(&self) -> bool {
        true
    }

    fn is_cancun(&self) -> bool {
        true
    }

    fn is_eip3860(&self) -> bool {
        true
    }

    fn is_eof(&self) -> bool {
        false
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockHost {
    pub code: HashMap<Address, Bytes>,
    pub balances: HashMap<Address, Word>,
    pub storage: HashMap<(Address, Word), Word>,
    pub original_storage: HashMap<(Address, Word), Word>,
    pub transient: HashMap<(Address, Word), Word>,
    pub warm_addresses: std::collections::HashSet<Address>,
    pub warm_storage: std::collections::HashSet<(Address, Word)>,
    pub logs: Vec<(Address, Vec<Word>, Bytes)>,
    pub refund: i64,
    pub next_call: Option<CallOutcome>,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub chain_id: u64,
}

impl Host for MockHost {
    fn code_of(&self, address: Address) -> Bytes {
        self.code.get(&address).cloned().unwrap_or_default()
    }

    fn code_hash_of(&self, address: Address) -> Hash {
        let code = self.code_of(address);
        Hash::from_low_u64_be(u64::from(!code.is_empty()))
    }

    fn code_size_of(&self, address: Address) -> u64 {
        u64::try_from(self.code_of(address).len()).unwrap_or(u64::MAX)
    }

    fn balance_of(&self, address: Address) -> Word {
        self.balances.get(&address).copied().unwrap_or_default()
    }

    fn nonce_of(&self, _address: Address) -> u64 {
        0
    }

    fn exists(&self, address: Address) -> bool {
        self.code.contains_key(&address) || self.balances.contains_key(&address)
    }

    fn sload(&mut self, address: Address, key: Word) -> Word {
        self.storage.get(&(address, key)).copied().unwrap_or_default()
    }

    fn sstore(&mut self, address: Address, key: Word, value: Word) {
        self.storage.insert((address, key), value);
    }

    fn tload(&mut self, address: Address, key: Word) -> Word {
        self.transient.get(&(address, key)).copied().unwrap_or_default()
    }

    fn tstore(&mut self, address: Address, key: Word, value: Word) {
        self.transient.insert((address, key), value);
    }

    fn original_value(&self, address: Address, key: Word) -> Word {
        self.original_storage
            .get(&(address, key))
            .copied()
            .unwrap_or_default()
    }

    fn add_gas_refund(&mut self, delta: i64) {
        self.refund += delta;
    }

    fn access_address(&mut self, address: Address) -> AccessStatus {
        if self.warm_addresses.insert(address) {
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        }
    }

    fn access_storage(&mut self, address: Address, key: Word) -> AccessStatus {
        if self.warm_storage.insert((address, key)) {
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        }
    }

    fn keccak256(&self, data: &[u8]) -> Hash {
        // Not a real hash; good enough to exercise SHA3 call sites in tests
        // without pulling a hashing crate into this test double.
        let mut acc: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in data {
            acc ^= u64::from(*byte);
            acc = acc.wrapping_mul(0x0000_0100_0000_01B3);
        }
        Hash::from_low_u64_be(acc)
    }

    fn emit_log(&mut self, address: Address, topics: &[Word], data: Bytes) {
        self.logs.push((address, topics.to_vec(), data));
    }

    fn call(&mut self, _params: CallParams) -> CallOutcome {
        self.next_call.clone().unwrap_or(CallOutcome {
            success: true,
            gas_left: 0,
            output: Bytes::new(),
            created_address: None,
        })
    }

    fn block_number(&self) -> u64 {
        self.block_number
    }

    fn block_timestamp(&self) -> u64 {
        self.block_timestamp
    }

    fn block_coinbase(&self) -> Address {
        Address::zero()
    }

    fn block_basefee(&self) -> Word {
        Word::zero()
    }

    fn block_prevrandao(&self) -> Word {
        Word::zero()
    }

    fn block_gaslimit(&self) -> u64 {
        30_000_000
    }

    fn block_chainid(&self) -> u64 {
        self.chain_id
    }

    fn tx_origin(&self) -> Address {
        Address::zero()
    }

    fn tx_gasprice(&self) -> Word {
        Word::zero()
    }

    fn blob_hashes(&self) -> &[Hash] {
        &[]
    }

    fn blob_basefee(&self) -> Word {
        Word::zero()
    }

    fn block_hash(&self, _block_number: u64) -> Hash {
        Hash::zero()
    }

    fn mark_selfdestruct(&mut self, _address: Address, _beneficiary: Address) {}

    fn is_eip150(&self) -> bool {
        true
    }

    fn is_eip158(&self) -> bool {
        true
    }

    fn is_eip1559(&self) -> bool {
        true
    }

    fn is_berlin(&self) -> bool {
        true
    }

    fn is_shanghai(&self) -> bool {
        true
    }

    fn is_cancun(&self) -> bool {
        true
    }

    fn is_eip3860(&self) -> bool {
        true
    }

    fn is_eof(&self) -> bool {
        false
    }
}
