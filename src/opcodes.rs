//! Opcode identifiers and the static `(pops, pushes, base_gas)` table the
//! block analyzer (C2) walks to compute per-block stack and gas metadata.
//!
//! Mirrors the teacher crate's `Opcode` enum + `From<u8>` lookup-table
//! pattern: a `#[repr(u8)]` enum for the human-readable name (handy in
//! tracing and error messages) plus a `const` array indexed directly by the
//! raw byte for the hot path, instead of a `match` over 256 arms.

use strum::EnumString;

/// One EVM opcode. Only opcodes this engine implements are named; any other
/// byte decodes to `InvalidOpcode` at instruction-build time (O-4: EOF and
/// other not-yet-assigned opcodes are treated as undefined).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, strum::Display)]
#[allow(non_camel_case_types)]
pub enum Opcode {
    STOP = 0x00,
    ADD = 0x01,
    MUL = 0x02,
    SUB = 0x03,
    DIV = 0x04,
    SDIV = 0x05,
    MOD = 0x06,
    SMOD = 0x07,
    ADDMOD = 0x08,
    MULMOD = 0x09,
    EXP = 0x0A,
    SIGNEXTEND = 0x0B,

    LT = 0x10,
    GT = 0x11,
    SLT = 0x12,
    SGT = 0x13,
    EQ = 0x14,
    ISZERO = 0x15,
    AND = 0x16,
    OR = 0x17,
    XOR = 0x18,
    NOT = 0x19,
    BYTE = 0x1A,
    SHL = 0x1B,
    SHR = 0x1C,
    SAR = 0x1D,

    SHA3 = 0x20,

    ADDRESS = 0x30,
    BALANCE = 0x31,
    ORIGIN = 0x32,
    CALLER = 0x33,
    CALLVALUE = 0x34,
    CALLDATALOAD = 0x35,
    CALLDATASIZE = 0x36,
    CALLDATACOPY = 0x37,
    CODESIZE = 0x38,
    CODECOPY = 0x39,
    GASPRICE = 0x3A,
    EXTCODESIZE = 0x3B,
    EXTCODECOPY = 0x3C,
    RETURNDATASIZE = 0x3D,
    RETURNDATACOPY = 0x3E,
    EXTCODEHASH = 0x3F,

    BLOCKHASH = 0x40,
    COINBASE = 0x41,
    TIMESTAMP = 0x42,
    NUMBER = 0x43,
    PREVRANDAO = 0x44,
    GASLIMIT = 0x45,
    CHAINID = 0x46,
    SELFBALANCE = 0x47,
    BASEFEE = 0x48,
    BLOBHASH = 0x49,
    BLOBBASEFEE = 0x4A,

    POP = 0x50,
    MLOAD = 0x51,
    MSTORE = 0x52,
    MSTORE8 = 0x53,
    SLOAD = 0x54,
    SSTORE = 0x55,
    JUMP = 0x56,
    JUMPI = 0x57,
    PC = 0x58,
    MSIZE = 0x59,
    GAS = 0x5A,
    JUMPDEST = 0x5B,
    TLOAD = 0x5C,
    TSTORE = 0x5D,
    MCOPY = 0x5E,

    PUSH0 = 0x5F,
    PUSH1 = 0x60,
    PUSH2 = 0x61,
    PUSH3 = 0x62,
    PUSH4 = 0x63,
    PUSH5 = 0x64,
    PUSH6 = 0x65,
    PUSH7 = 0x66,
    PUSH8 = 0x67,
    PUSH9 = 0x68,
    PUSH10 = 0x69,
    PUSH11 = 0x6A,
    PUSH12 = 0x6B,
    PUSH13 = 0x6C,
    PUSH14 = 0x6D,
    PUSH15 = 0x6E,
    PUSH16 = 0x6F,
    PUSH17 = 0x70,
    PUSH18 = 0x71,
    PUSH19 = 0x72,
    PUSH20 = 0x73,
    PUSH21 = 0x74,
    PUSH22 = 0x75,
    PUSH23 = 0x76,
    PUSH24 = 0x77,
    PUSH25 = 0x78,
    PUSH26 = 0x79,
    PUSH27 = 0x7A,
    PUSH28 = 0x7B,
    PUSH29 = 0x7C,
    PUSH30 = 0x7D,
    PUSH31 = 0x7E,
    PUSH32 = 0x7F,

    DUP1 = 0x80,
    DUP2 = 0x81,
    DUP3 = 0x82,
    DUP4 = 0x83,
    DUP5 = 0x84,
    DUP6 = 0x85,
    DUP7 = 0x86,
    DUP8 = 0x87,
    DUP9 = 0x88,
    DUP10 = 0x89,
    DUP11 = 0x8A,
    DUP12 = 0x8B,
    DUP13 = 0x8C,
    DUP14 = 0x8D,
    DUP15 = 0x8E,
    DUP16 = 0x8F,

    SWAP1 = 0x90,
    SWAP2 = 0x91,
    SWAP3 = 0x92,
    SWAP4 = 0x93,
    SWAP5 = 0x94,
    SWAP6 = 0x95,
    SWAP7 = 0x96,
    SWAP8 = 0x97,
    SWAP9 = 0x98,
    SWAP10 = 0x99,
    SWAP11 = 0x9A,
    SWAP12 = 0x9B,
    SWAP13 = 0x9C,
    SWAP14 = 0x9D,
    SWAP15 = 0x9E,
    SWAP16 = 0x9F,

    LOG0 = 0xA0,
    LOG1 = 0xA1,
    LOG2 = 0xA2,
    LOG3 = 0xA3,
    LOG4 = 0xA4,

    CREATE = 0xF0,
    CALL = 0xF1,
    CALLCODE = 0xF2,
    RETURN = 0xF3,
    DELEGATECALL = 0xF4,
    CREATE2 = 0xF5,
    STATICCALL = 0xFA,
    REVERT = 0xFD,
    INVALID = 0xFE,
    SELFDESTRUCT = 0xFF,
}

impl Opcode {
    /// Raw opcode byte. Enum-to-discriminant conversion has no `as`-free
    /// equivalent for a fieldless `#[repr(u8)]` enum.
    #[inline]
    #[allow(clippy::as_conversions)]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn is_push(self) -> bool {
        matches!(self.byte(), 0x5F..=0x7F)
    }

    /// Number of immediate bytes a PUSH opcode consumes (0 for PUSH0).
    #[inline]
    #[allow(clippy::arithmetic_side_effects, clippy::as_conversions)]
    pub const fn push_immediate_len(self) -> usize {
        let byte = self.byte();
        if byte == Opcode::PUSH0.byte() {
            0
        } else if byte >= Opcode::PUSH1.byte() && byte <= Opcode::PUSH32.byte() {
            (byte - Opcode::PUSH1.byte() + 1) as usize
        } else {
            0
        }
    }

    #[inline]
    pub const fn is_dup(self) -> bool {
        matches!(self.byte(), 0x80..=0x8F)
    }

    #[inline]
    pub const fn is_swap(self) -> bool {
        matches!(self.byte(), 0x90..=0x9F)
    }

    #[inline]
    pub const fn is_log(self) -> bool {
        matches!(self.byte(), 0xA0..=0xA4)
    }

    /// Opcodes after which the current basic block always ends, per §4.2
    /// rule 2 (unless the opcode is JUMPI, handled by rule 3 instead).
    #[inline]
    pub const fn is_terminator(self) -> bool {
        matches!(
            self,
            Opcode::STOP
                | Opcode::RETURN
                | Opcode::REVERT
                | Opcode::SELFDESTRUCT
                | Opcode::JUMP
                | Opcode::INVALID
        )
    }
}

/// Per-opcode static metadata consulted by the block analyzer.
#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub pops: u16,
    pub pushes: u16,
    pub base_gas: u32,
}

const fn info(pops: u16, pushes: u16, base_gas: u32) -> OpInfo {
    OpInfo {
        pops,
        pushes,
        base_gas,
    }
}

/// Gas tier constants (Yellow Paper naming), reused when building the info
/// table below and by `gas.rs` for dynamic-cost computations.
pub mod tier {
    pub const ZERO: u32 = 0;
    pub const BASE: u32 = 2;
    pub const VERYLOW: u32 = 3;
    pub const LOW: u32 = 5;
    pub const MID: u32 = 8;
    pub const HIGH: u32 = 10;
    pub const JUMPDEST: u32 = 1;
    pub const WARM_ACCESS: u32 = 100;
    pub const COLD_ACCOUNT_ACCESS: u32 = 2600;
    pub const COLD_SLOAD: u32 = 2100;
}

/// Lookup table for every defined opcode byte; `None` means undefined (and
/// therefore `InvalidOpcode` at analysis time). Dynamic-gas opcodes carry
/// only their *base* tier here — the handler adds the runtime component
/// per §4.2's gas-correction protocol.
#[allow(clippy::as_conversions, clippy::arithmetic_side_effects)]
pub const fn opcode_info(byte: u8) -> Option<OpInfo> {
    use tier::*;
    match byte {
        0x00 => Some(info(0, 0, ZERO)), // STOP
        0x01 => Some(info(2, 1, VERYLOW)), // ADD
        0x02 => Some(info(2, 1, LOW)), // MUL
        0x03 => Some(info(2, 1, VERYLOW)), // SUB
        0x04 => Some(info(2, 1, LOW)), // DIV
        0x05 => Some(info(2, 1, LOW)), // SDIV
        0x06 => Some(info(2, 1, LOW)), // MOD
        0x07 => Some(info(2, 1, LOW)), // SMOD
        0x08 => Some(info(3, 1, MID)), // ADDMOD
        0x09 => Some(info(3, 1, MID)), // MULMOD
        0x0A => Some(info(2, 1, HIGH)), // EXP (dynamic component added by handler)
        0x0B => Some(info(2, 1, LOW)), // SIGNEXTEND

        0x10 => Some(info(2, 1, VERYLOW)), // LT
        0x11 => Some(info(2, 1, VERYLOW)), // GT
        0x12 => Some(info(2, 1, VERYLOW)), // SLT
        0x13 => Some(info(2, 1, VERYLOW)), // SGT
        0x14 => Some(info(2, 1, VERYLOW)), // EQ
        0x15 => Some(info(1, 1, VERYLOW)), // ISZERO
        0x16 => Some(info(2, 1, VERYLOW)), // AND
        0x17 => Some(info(2, 1, VERYLOW)), // OR
        0x18 => Some(info(2, 1, VERYLOW)), // XOR
        0x19 => Some(info(1, 1, VERYLOW)), // NOT
        0x1A => Some(info(2, 1, VERYLOW)), // BYTE
        0x1B => Some(info(2, 1, VERYLOW)), // SHL
        0x1C => Some(info(2, 1, VERYLOW)), // SHR
        0x1D => Some(info(2, 1, VERYLOW)), // SAR

        0x20 => Some(info(2, 1, 30)), // SHA3 (+6/word, dynamic)

        0x30 => Some(info(0, 1, BASE)), // ADDRESS
        0x31 => Some(info(1, 1, WARM_ACCESS)), // BALANCE (cold surcharge dynamic)
        0x32 => Some(info(0, 1, BASE)), // ORIGIN
        0x33 => Some(info(0, 1, BASE)), // CALLER
        0x34 => Some(info(0, 1, BASE)), // CALLVALUE
        0x35 => Some(info(1, 1, VERYLOW)), // CALLDATALOAD
        0x36 => Some(info(0, 1, BASE)), // CALLDATASIZE
        0x37 => Some(info(3, 0, VERYLOW)), // CALLDATACOPY (+3/word dynamic)
        0x38 => Some(info(0, 1, BASE)), // CODESIZE
        0x39 => Some(info(3, 0, VERYLOW)), // CODECOPY (+3/word dynamic)
        0x3A => Some(info(0, 1, BASE)), // GASPRICE
        0x3B => Some(info(1, 1, WARM_ACCESS)), // EXTCODESIZE (cold surcharge)
        0x3C => Some(info(4, 0, WARM_ACCESS)), // EXTCODECOPY (cold + copy dynamic)
        0x3D => Some(info(0, 1, BASE)), // RETURNDATASIZE
        0x3E => Some(info(3, 0, VERYLOW)), // RETURNDATACOPY (+3/word dynamic)
        0x3F => Some(info(1, 1, WARM_ACCESS)), // EXTCODEHASH (cold surcharge)

        0x40 => Some(info(1, 1, 20)), // BLOCKHASH
        0x41 => Some(info(0, 1, BASE)), // COINBASE
        0x42 => Some(info(0, 1, BASE)), // TIMESTAMP
        0x43 => Some(info(0, 1, BASE)), // NUMBER
        0x44 => Some(info(0, 1, BASE)), // PREVRANDAO
        0x45 => Some(info(0, 1, BASE)), // GASLIMIT
        0x46 => Some(info(0, 1, BASE)), // CHAINID
        0x47 => Some(info(0, 1, LOW)), // SELFBALANCE
        0x48 => Some(info(0, 1, BASE)), // BASEFEE
        0x49 => Some(info(1, 1, VERYLOW)), // BLOBHASH
        0x4A => Some(info(0, 1, BASE)), // BLOBBASEFEE

        0x50 => Some(info(1, 0, BASE)), // POP
        0x51 => Some(info(1, 1, VERYLOW)), // MLOAD (+expansion dynamic)
        0x52 => Some(info(2, 0, VERYLOW)), // MSTORE
        0x53 => Some(info(2, 0, VERYLOW)), // MSTORE8
        0x54 => Some(info(1, 1, WARM_ACCESS)), // SLOAD (cold surcharge)
        0x55 => Some(info(2, 0, 0)), // SSTORE (fully dynamic, EIP-2200/2929)
        0x56 => Some(info(1, 0, MID)), // JUMP
        0x57 => Some(info(2, 0, HIGH)), // JUMPI
        0x58 => Some(info(0, 1, BASE)), // PC
        0x59 => Some(info(0, 1, BASE)), // MSIZE
        0x5A => Some(info(0, 1, BASE)), // GAS
        0x5B => Some(info(0, 0, JUMPDEST)), // JUMPDEST
        0x5C => Some(info(1, 1, 100)), // TLOAD
        0x5D => Some(info(2, 0, 100)), // TSTORE
        0x5E => Some(info(3, 0, VERYLOW)), // MCOPY (+3/word dynamic)

        0x5F => Some(info(0, 1, BASE)), // PUSH0
        b if b >= 0x60 && b <= 0x7F => Some(info(0, 1, VERYLOW)), // PUSH1..PUSH32
        b if b >= 0x80 && b <= 0x8F => {
            // DUPn pushes a copy on top, so net effect is pops=n, pushes=n+1.
            let n = (b - 0x80 + 1) as u16;
            Some(info(n, n + 1, VERYLOW))
        }
        b if b >= 0x90 && b <= 0x9F => {
            let n = (b - 0x90 + 2) as u16;
            Some(info(n, n, VERYLOW))
        }

        0xA0 => Some(info(2, 0, 375)), // LOG0 (+375/topic +8/byte dynamic)
        0xA1 => Some(info(3, 0, 375)),
        0xA2 => Some(info(4, 0, 375)),
        0xA3 => Some(info(5, 0, 375)),
        0xA4 => Some(info(6, 0, 375)),

        0xF0 => Some(info(3, 1, 32000)), // CREATE (+init-code dynamic)
        0xF1 => Some(info(7, 1, WARM_ACCESS)), // CALL (cold/value/new-account dynamic)
        0xF2 => Some(info(7, 1, WARM_ACCESS)), // CALLCODE
        0xF3 => Some(info(2, 0, ZERO)), // RETURN (+expansion dynamic)
        0xF4 => Some(info(6, 1, WARM_ACCESS)), // DELEGATECALL
        0xF5 => Some(info(4, 1, 32000)), // CREATE2
        0xFA => Some(info(6, 1, WARM_ACCESS)), // STATICCALL
        0xFD => Some(info(2, 0, ZERO)), // REVERT (+expansion dynamic)
        0xFE => Some(info(0, 0, ZERO)), // INVALID
        0xFF => Some(info(1, 0, 5000)), // SELFDESTRUCT (+surcharges dynamic)

        _ => None,
    }
}
