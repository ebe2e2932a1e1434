//! External interfaces (§6).
//!
//! Everything in this module is a seam, not an implementation: persistent
//! state, cryptography, and host/chain environment are deliberately out of
//! scope (§1). This trait is the narrow synchronous boundary the
//! interpreter calls through; a real node wires a concrete `Host` backed by
//! its state database, precompile set, and block context.

use bytes::Bytes;

use crate::word::{Address, Hash, Word};

/// Warm/cold classification of an address or storage slot (EIP-2929).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Cold,
    Warm,
}

impl AccessStatus {
    #[inline]
    pub const fn is_cold(self) -> bool {
        matches!(self, AccessStatus::Cold)
    }
}

/// Which CALL-family or CREATE-family operation a subcall request
/// originated from; the Host needs this to apply the right semantics
/// (value transfer, code context, staticness).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Create,
    Create2,
}

/// Parameters for a subcall or contract creation, handed to
/// [`Host::call`].
#[derive(Debug, Clone)]
pub struct CallParams {
    pub kind: CallKind,
    pub caller: Address,
    /// Callee for CALL-family; ignored (a fresh address is derived by the
    /// Host) for CREATE-family.
    pub target: Address,
    pub value: Word,
    pub input: Bytes,
    pub gas_limit: u64,
    pub is_static: bool,
    /// CREATE2 salt; `None` for every other kind.
    pub salt: Option<Word>,
}

/// Result of a subcall or contract creation.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub success: bool,
    pub gas_left: u64,
    pub output: Bytes,
    /// Address of the newly created contract, for CREATE/CREATE2.
    pub created_address: Option<Address>,
}

/// The complete set of capabilities the interpreter needs from its
/// embedder. All methods are synchronous per §5 (subcalls block the
/// caller's dispatch loop until the callee's completes).
pub trait Host {
    // --- Bytecode resolution ---
    fn code_of(&self, address: Address) -> Bytes;
    fn code_hash_of(&self, address: Address) -> Hash;
    fn code_size_of(&self, address: Address) -> u64;

    // --- Balance / nonce ---
    fn balance_of(&self, address: Address) -> Word;
    fn nonce_of(&self, address: Address) -> u64;
    fn exists(&self, address: Address) -> bool;

    // --- Storage ---
    fn sload(&mut self, address: Address, key: Word) -> Word;
    fn sstore(&mut self, address: Address, key: Word, value: Word);
    fn tload(&mut self, address: Address, key: Word) -> Word;
    fn tstore(&mut self, address: Address, key: Word, value: Word);
    /// The slot's value at the start of the current transaction, needed by
    /// the EIP-2200/3529 SSTORE gas/refund computation.
    fn original_value(&self, address: Address, key: Word) -> Word;
    /// Apply a signed refund-counter delta (EIP-3529). The interpreter
    /// computes the delta per SSTORE (`gas::sstore_refund_delta`); the
    /// running total across a transaction is the Host's ledger to own.
    fn add_gas_refund(&mut self, delta: i64);

    // --- Access set (EIP-2929) ---
    fn access_address(&mut self, address: Address) -> AccessStatus;
    fn access_storage(&mut self, address: Address, key: Word) -> AccessStatus;

    // --- Hashing ---
    fn keccak256(&self, data: &[u8]) -> Hash;

    // --- Logs ---
    fn emit_log(&mut self, address: Address, topics: &[Word], data: Bytes);

    // --- Subcalls / creation ---
    fn call(&mut self, params: CallParams) -> CallOutcome;

    // --- Environment / block ---
    fn block_number(&self) -> u64;
    fn block_timestamp(&self) -> u64;
    fn block_coinbase(&self) -> Address;
    fn block_basefee(&self) -> Word;
    fn block_prevrandao(&self) -> Word;
    fn block_gaslimit(&self) -> u64;
    fn block_chainid(&self) -> u64;
    fn tx_origin(&self) -> Address;
    fn tx_gasprice(&self) -> Word;
    fn blob_hashes(&self) -> &[Hash];
    fn blob_basefee(&self) -> Word;
    /// Hash of the requested ancestor block, or zero if out of the
    /// available window (BLOCKHASH semantics).
    fn block_hash(&self, block_number: u64) -> Hash;

    // --- Selfdestruct scheduling ---
    fn mark_selfdestruct(&mut self, address: Address, beneficiary: Address);

    // --- Ruleset / hardfork flags ---
    fn is_eip150(&self) -> bool;
    fn is_eip158(&self) -> bool;
    fn is_eip1559(&self) -> bool;
    fn is_berlin(&self) -> bool;
    fn is_shanghai(&self) -> bool;
    fn is_cancun(&self) -> bool;
    fn is_eip3860(&self) -> bool;
    fn is_eof(&self) -> bool;
}
