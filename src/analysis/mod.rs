//! C3: Instruction Stream Builder, and the `Analysis` artifact it produces
//! (§3, §4.3).
//!
//! Consumes C2's basic blocks and emits the flat Instruction Record stream:
//! a `BEGINBLOCK` record at each block head (absorbing the `JUMPDEST` byte
//! that headed it, if any), the `push_values` side table for PUSH9..PUSH32,
//! resolved static jump targets, and the two PC<->instruction-index maps.
//!
//! Grounded on the teacher's `jit::analyzer`/`jit::optimizer` pipeline,
//! which performs the same "walk blocks in program order, flatten to a
//! linear op list, resolve branch targets to block entry points" pass
//! ahead of codegen; this builder does the interpreter-record equivalent
//! instead of emitting LLVM IR.

mod block;
mod instruction;

use std::collections::HashMap;

use bitvec::prelude::BitVec;
use bitvec::prelude::Lsb0;
use bytes::Bytes;

use crate::bytecode::scan;
use crate::config::Config;
use crate::constants::NO_INSTRUCTION;
use crate::errors::{InternalError, VMError};
use crate::interpreter::{begin_block, handlers};
use crate::opcodes::{opcode_info, Opcode};
use crate::word::Word;

pub use instruction::{resolve_push_value, InstrArg, Instruction, JumpKind, OpFn, StepOutcome};

use block::{build_blocks, Block, BlockOp};

/// The immutable artifact produced by analyzing one bytecode buffer against
/// one [`Config`] (§3 "Analysis artifact"). Construct once per distinct
/// (code, fork) pair — it never changes for the lifetime of a call — and
/// share it by reference across every [`crate::frame::Frame`] that executes
/// it; nothing here is mutated after [`Analysis::build`] returns.
#[derive(Debug)]
pub struct Analysis {
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) push_values: Vec<Word>,
    jumpdests: BitVec<u8, Lsb0>,
    code: Bytes,
    code_len: usize,
    pc_to_instruction_index: Vec<u32>,
    instruction_index_to_pc: Vec<u32>,
    /// Fork-fixed gas-schedule knobs a handler needs at runtime but a
    /// `Frame` doesn't otherwise carry (§4.2: EXP's per-byte cost, CREATE's
    /// init-code size cap) — copied out of `Config` once here so handlers
    /// don't need a `Config` reference of their own.
    exp_byte_gas: u32,
    max_initcode_size: usize,
    max_code_size: usize,
}

impl Analysis {
    /// Run C1 → C2 → C3 over `code` for the given [`Config`]. Never fails on
    /// well-formed bytecode of bounded length; the only error paths are
    /// internal invariant violations (a bug in this builder, not a property
    /// of `code`).
    pub fn build(code: &[u8], config: &Config) -> Result<Self, VMError> {
        let code_map = scan(code);
        let blocks = build_blocks(code, &code_map, config);
        let (jumpdests, code_len) = code_map.into_jumpdest_bits();
        assemble(code, blocks, jumpdests, code_len, config)
    }

    #[inline]
    pub(crate) fn instruction(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Membership test for C4's dynamic JUMP/JUMPI validation (§4.4):
    /// whether `pc` is a valid `JUMPDEST` — a code byte (not PUSH data)
    /// whose opcode is `0x5B`.
    #[inline]
    pub(crate) fn is_valid_jumpdest(&self, pc: usize) -> bool {
        self.jumpdests.get(pc).is_some_and(|bit| *bit)
    }

    /// Instruction index implementing the opcode originally at `pc`, or
    /// `None` for PUSH-data bytes and dead-eliminated instructions (§3
    /// `pc_to_instruction_index`).
    #[inline]
    pub(crate) fn pc_to_instruction_index(&self, pc: usize) -> Option<usize> {
        match self.pc_to_instruction_index.get(pc) {
            Some(&NO_INSTRUCTION) | None => None,
            Some(&idx) => Some(idx as usize),
        }
    }

    /// Inverse of [`Self::pc_to_instruction_index`], consulted by the `PC`
    /// opcode and by tracing.
    #[inline]
    pub(crate) fn instruction_index_to_pc(&self, index: usize) -> Option<usize> {
        match self.instruction_index_to_pc.get(index) {
            Some(&NO_INSTRUCTION) | None => None,
            Some(&pc) => Some(pc as usize),
        }
    }

    #[inline]
    pub(crate) fn code_len(&self) -> usize {
        self.code_len
    }

    /// The original bytecode buffer, for CODESIZE/CODECOPY (§4.5) — the
    /// only handlers that need the raw bytes rather than the decoded
    /// instruction stream.
    #[inline]
    pub(crate) fn code(&self) -> &[u8] {
        &self.code
    }

    #[inline]
    pub(crate) fn exp_byte_gas(&self) -> u32 {
        self.exp_byte_gas
    }

    #[inline]
    pub(crate) fn max_initcode_size(&self) -> usize {
        self.max_initcode_size
    }

    #[inline]
    pub(crate) fn max_code_size(&self) -> usize {
        self.max_code_size
    }
}

/// Pass 2 of C3: given C2's blocks plus the scanner's jumpdest bitmap,
/// compute every block's head instruction index (pass 2a, pure arithmetic
/// over block sizes — no jump resolution needed yet), then emit the flat
/// instruction stream, resolving static jumps against the index map built
/// in 2a (pass 2b).
fn assemble(
    code: &[u8],
    blocks: Vec<Block>,
    jumpdests: BitVec<u8, Lsb0>,
    scanned_len: usize,
    config: &Config,
) -> Result<Analysis, VMError> {
    let code_len = code.len();
    debug_assert_eq!(code_len, scanned_len);
    let code = Bytes::copy_from_slice(code);
    let exp_byte_gas = config.fork.exp_byte_gas();
    let max_initcode_size = config.max_initcode_size;
    let max_code_size = config.max_code_size;

    if blocks.is_empty() {
        // §8 boundary behavior: empty bytecode analyzes to exactly
        // `[BEGINBLOCK(0,0,0), STOP]`.
        return Ok(Analysis {
            instructions: vec![
                Instruction::new(begin_block, InstrArg::block_info(0, 0, 0)),
                Instruction::new(handlers::control::op_stop, InstrArg::NONE),
            ],
            push_values: Vec::new(),
            jumpdests,
            code,
            code_len,
            pc_to_instruction_index: Vec::new(),
            instruction_index_to_pc: vec![NO_INSTRUCTION, NO_INSTRUCTION],
            exp_byte_gas,
            max_initcode_size,
            max_code_size,
        });
    }

    // Pass 2a: block head indices, keyed both by block position and by the
    // block's starting PC (every JUMPDEST is some block's start_pc, per C2
    // rule 4 — this map is exactly what a static-jump pattern resolves
    // against).
    let mut pc_to_head: HashMap<usize, u32> = HashMap::with_capacity(blocks.len());
    let mut cursor: u32 = 0;
    for block in &blocks {
        pc_to_head.insert(block.start_pc, cursor);
        let body_len = block
            .ops
            .len()
            .checked_sub(usize::from(block.starts_with_jumpdest()))
            .ok_or(InternalError::Underflow)?;
        let block_len = u32::try_from(body_len)
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or(InternalError::Overflow)?;
        cursor = cursor.checked_add(block_len).ok_or(InternalError::Overflow)?;
    }
    #[allow(clippy::indexing_slicing)]
    let trailing_stop = !blocks[blocks.len() - 1].ends_in_terminator();
    let total_len = usize::try_from(cursor)
        .map_err(|_| InternalError::TypeConversion)?
        .checked_add(usize::from(trailing_stop))
        .ok_or(InternalError::Overflow)?;

    let mut instructions = Vec::with_capacity(total_len);
    let mut push_values = Vec::new();
    let mut pc_to_instruction_index = vec![NO_INSTRUCTION; code_len];
    let mut instruction_index_to_pc = vec![NO_INSTRUCTION; total_len];

    for block in &blocks {
        let beginblock_index =
            u32::try_from(instructions.len()).map_err(|_| InternalError::TypeConversion)?;
        instructions.push(Instruction::new(
            begin_block,
            InstrArg::block_info(block.gas_cost, block.stack_req, block.stack_max_growth),
        ));
        #[allow(clippy::indexing_slicing)]
        {
            pc_to_instruction_index[block.start_pc] = beginblock_index;
            instruction_index_to_pc[beginblock_index as usize] =
                u32::try_from(block.start_pc).map_err(|_| InternalError::TypeConversion)?;
        }

        let starts_with_jumpdest = block.starts_with_jumpdest();
        let mut cum: u64 = 0;
        for (k, op) in block.ops.iter().enumerate() {
            let base_gas = opcode_info(op.opcode).map(|info| info.base_gas).unwrap_or(0);
            cum = cum.saturating_add(u64::from(base_gas));

            if k == 0 && starts_with_jumpdest {
                continue;
            }

            let idx =
                u32::try_from(instructions.len()).map_err(|_| InternalError::TypeConversion)?;
            #[allow(clippy::indexing_slicing)]
            {
                pc_to_instruction_index[op.pc] = idx;
                instruction_index_to_pc[idx as usize] =
                    u32::try_from(op.pc).map_err(|_| InternalError::TypeConversion)?;
            }

            let correction = u64::from(block.gas_cost).saturating_sub(cum);
            let (handler, arg) =
                build_instruction(op, k, block, &pc_to_head, correction, &mut push_values)?;
            instructions.push(Instruction::new(handler, arg));
        }
    }

    if trailing_stop {
        instructions.push(Instruction::new(handlers::control::op_stop, InstrArg::NONE));
    }

    Ok(Analysis {
        instructions,
        push_values,
        jumpdests,
        code,
        code_len,
        pc_to_instruction_index,
        instruction_index_to_pc,
        exp_byte_gas,
        max_initcode_size,
        max_code_size,
    })
}

/// Number of PUSH immediate bytes for `byte`, or `None` if it isn't PUSH1..32
/// (PUSH0 carries no immediate and is handled by the small-push path below).
#[inline]
fn push_data_len(byte: u8) -> Option<usize> {
    if (0x60..=0x7F).contains(&byte) {
        Some(usize::from(byte - 0x60 + 1))
    } else {
        None
    }
}

/// Build the `(handler, arg)` pair for one non-absorbed block op. `k` is
/// this op's index within `block.ops`; used to look left for the
/// immediately-adjacent `PUSHn` pattern O-2 restricts static jump
/// recognition to.
#[allow(clippy::too_many_lines)]
fn build_instruction(
    op: &BlockOp,
    k: usize,
    block: &Block,
    pc_to_head: &HashMap<usize, u32>,
    correction: u64,
    push_values: &mut Vec<Word>,
) -> Result<(OpFn, InstrArg), VMError> {
    let byte = op.opcode;

    if byte == Opcode::PUSH0.byte() {
        return Ok((handlers::stack_memory::op_push_small, InstrArg::small_push(0)));
    }
    if let Some(len) = push_data_len(byte) {
        let value = op.push_value.unwrap_or_default();
        return Ok(if len <= 8 {
            (
                handlers::stack_memory::op_push_small,
                InstrArg::small_push(value.low_u64()),
            )
        } else {
            let index = u32::try_from(push_values.len()).map_err(|_| InternalError::Overflow)?;
            push_values.push(value);
            (handlers::stack_memory::op_push_large, InstrArg::large_push(index))
        });
    }
    if byte == Opcode::JUMP.byte() || byte == Opcode::JUMPI.byte() {
        return Ok(build_jump(byte, k, block, pc_to_head));
    }
    if (0x80..=0x8F).contains(&byte) {
        let depth = u64::from(byte - Opcode::DUP1.byte());
        return Ok((handlers::stack_memory::op_dup, InstrArg::raw(depth)));
    }
    if (0x90..=0x9F).contains(&byte) {
        let depth = u64::from(byte - Opcode::SWAP1.byte()) + 1;
        return Ok((handlers::stack_memory::op_swap, InstrArg::raw(depth)));
    }
    if (0xA0..=0xA4).contains(&byte) {
        let topics = u64::from(byte - Opcode::LOG0.byte());
        let correction = i64::try_from(correction).unwrap_or(i64::MAX);
        return Ok((handlers::system::op_log, InstrArg::log_info(topics, correction)));
    }

    let corrected = InstrArg::raw(correction);
    let none = InstrArg::NONE;

    Ok(match byte {
        0x00 => (handlers::control::op_stop, none),
        0x01 => (handlers::arithmetic::op_add, none),
        0x02 => (handlers::arithmetic::op_mul, none),
        0x03 => (handlers::arithmetic::op_sub, none),
        0x04 => (handlers::arithmetic::op_div, none),
        0x05 => (handlers::arithmetic::op_sdiv, none),
        0x06 => (handlers::arithmetic::op_mod, none),
        0x07 => (handlers::arithmetic::op_smod, none),
        0x08 => (handlers::arithmetic::op_addmod, none),
        0x09 => (handlers::arithmetic::op_mulmod, none),
        0x0A => (handlers::arithmetic::op_exp, none),
        0x0B => (handlers::arithmetic::op_signextend, none),

        0x10 => (handlers::bitwise::op_lt, none),
        0x11 => (handlers::bitwise::op_gt, none),
        0x12 => (handlers::bitwise::op_slt, none),
        0x13 => (handlers::bitwise::op_sgt, none),
        0x14 => (handlers::bitwise::op_eq, none),
        0x15 => (handlers::bitwise::op_iszero, none),
        0x16 => (handlers::bitwise::op_and, none),
        0x17 => (handlers::bitwise::op_or, none),
        0x18 => (handlers::bitwise::op_xor, none),
        0x19 => (handlers::bitwise::op_not, none),
        0x1A => (handlers::bitwise::op_byte, none),
        0x1B => (handlers::bitwise::op_shl, none),
        0x1C => (handlers::bitwise::op_shr, none),
        0x1D => (handlers::bitwise::op_sar, none),

        0x20 => (handlers::stack_memory::op_sha3, none),

        0x30 => (handlers::environment::op_address, none),
        0x31 => (handlers::environment::op_balance, none),
        0x32 => (handlers::environment::op_origin, none),
        0x33 => (handlers::environment::op_caller, none),
        0x34 => (handlers::environment::op_callvalue, none),
        0x35 => (handlers::environment::op_calldataload, none),
        0x36 => (handlers::environment::op_calldatasize, none),
        0x37 => (handlers::environment::op_calldatacopy, none),
        0x38 => (handlers::environment::op_codesize, none),
        0x39 => (handlers::environment::op_codecopy, none),
        0x3A => (handlers::environment::op_gasprice, none),
        0x3B => (handlers::environment::op_extcodesize, none),
        0x3C => (handlers::environment::op_extcodecopy, none),
        0x3D => (handlers::environment::op_returndatasize, none),
        0x3E => (handlers::environment::op_returndatacopy, none),
        0x3F => (handlers::environment::op_extcodehash, none),

        0x40 => (handlers::environment::op_blockhash, none),
        0x41 => (handlers::environment::op_coinbase, none),
        0x42 => (handlers::environment::op_timestamp, none),
        0x43 => (handlers::environment::op_number, none),
        0x44 => (handlers::environment::op_prevrandao, none),
        0x45 => (handlers::environment::op_gaslimit, none),
        0x46 => (handlers::environment::op_chainid, none),
        0x47 => (handlers::environment::op_selfbalance, none),
        0x48 => (handlers::environment::op_basefee, none),
        0x49 => (handlers::environment::op_blobhash, none),
        0x4A => (handlers::environment::op_blobbasefee, none),

        0x50 => (handlers::stack_memory::op_pop, none),
        0x51 => (handlers::stack_memory::op_mload, none),
        0x52 => (handlers::stack_memory::op_mstore, none),
        0x53 => (handlers::stack_memory::op_mstore8, none),
        0x54 => (handlers::storage::op_sload, none),
        0x55 => (handlers::storage::op_sstore, none),
        0x58 => (handlers::control::op_pc, InstrArg::raw(u64::try_from(op.pc).map_err(|_| InternalError::TypeConversion)?)),
        0x59 => (handlers::stack_memory::op_msize, none),
        0x5A => (handlers::control::op_gas, corrected),
        0x5C => (handlers::storage::op_tload, none),
        0x5D => (handlers::storage::op_tstore, none),
        0x5E => (handlers::stack_memory::op_mcopy, none),

        0xF0 => (handlers::system::op_create, corrected),
        0xF1 => (handlers::system::op_call, corrected),
        0xF2 => (handlers::system::op_callcode, corrected),
        0xF4 => (handlers::system::op_delegatecall, corrected),
        0xF5 => (handlers::system::op_create2, corrected),
        0xFA => (handlers::system::op_staticcall, corrected),
        0xF3 => (handlers::control::op_return, none),
        0xFD => (handlers::control::op_revert, none),
        0xFF => (handlers::system::op_selfdestruct, none),

        // 0xFE (INVALID) and any byte the opcode table doesn't define
        // (O-4: EOF/undefined) share the same halting behavior.
        _ => (handlers::control::op_invalid_opcode, none),
    })
}

/// O-2: recognize the static-jump pattern — `PUSHn <imm>` as the
/// *immediately preceding* op in the same block, nothing between them —
/// and resolve it to the target block's head index. Any other shape
/// (no preceding push, push value isn't a valid in-code `JUMPDEST`, or the
/// push is in a different block) falls back to a dynamic jump.
fn build_jump(
    byte: u8,
    k: usize,
    block: &Block,
    pc_to_head: &HashMap<usize, u32>,
) -> (OpFn, InstrArg) {
    let is_jumpi = byte == Opcode::JUMPI.byte();
    let resolved = (k > 0)
        .then(|| block.ops.get(k - 1))
        .flatten()
        .and_then(|prev| prev.push_value)
        .and_then(crate::word::word_to_usize)
        .and_then(|target_pc| pc_to_head.get(&target_pc).copied());

    match (resolved, is_jumpi) {
        (Some(index), false) => (
            handlers::control::op_jump_static,
            InstrArg::jump_target(index, JumpKind::Static),
        ),
        (Some(index), true) => (
            handlers::control::op_jumpi_static,
            InstrArg::jump_target(index, JumpKind::ConditionalStatic),
        ),
        (None, false) => (handlers::control::op_jump_dynamic, InstrArg::NONE),
        (None, true) => (handlers::control::op_jumpi_dynamic, InstrArg::NONE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn empty_bytecode_is_beginblock_then_stop() {
        let analysis = Analysis::build(&[], &Config::default()).unwrap();
        assert_eq!(analysis.len(), 2);
    }

    #[test]
    fn straight_line_code_ends_with_synthesized_stop() {
        // PUSH1 1, PUSH1 2, ADD (no terminator in source)
        let code = [0x60, 0x01, 0x60, 0x02, 0x01];
        let analysis = Analysis::build(&code, &Config::default()).unwrap();
        // BEGINBLOCK, PUSH1, PUSH1, ADD, synthesized STOP
        assert_eq!(analysis.len(), 5);
    }

    #[test]
    fn code_ending_in_stop_has_no_synthesized_extra() {
        let code = [0x60, 0x01, 0x00]; // PUSH1 1, STOP
        let analysis = Analysis::build(&code, &Config::default()).unwrap();
        assert_eq!(analysis.len(), 3); // BEGINBLOCK, PUSH1, STOP
    }

    #[test]
    fn static_jump_is_resolved_to_beginblock() {
        // PUSH1 3, JUMP, INVALID(dead), JUMPDEST, STOP — S6 from spec.md
        let code = [0x60, 0x03, 0x56, 0xFE, 0x5B, 0x00];
        let analysis = Analysis::build(&code, &Config::default()).unwrap();
        // block 0: BEGINBLOCK, PUSH1, JUMP(static)  -> 3 instructions
        // block 1: BEGINBLOCK(absorbs JUMPDEST), STOP -> 2 instructions
        assert_eq!(analysis.len(), 5);
        let (_, arg) = match analysis.instruction(2) {
            Some(Instruction { arg, .. }) => (0, *arg),
            None => panic!("missing instruction"),
        };
        let (index, kind) = arg.as_jump_target();
        assert_eq!(index, 3);
        assert_eq!(kind, JumpKind::Static);
    }

    #[test]
    fn jump_to_non_jumpdest_is_dynamic() {
        // PUSH1 5, JUMP, STOP, PUSH1 0x42 — S3 from spec.md (PC 5 is code
        // inside the trailing PUSH1, not a JUMPDEST).
        let code = [0x60, 0x05, 0x56, 0x00, 0x60, 0x42];
        let analysis = Analysis::build(&code, &Config::default()).unwrap();
        let (index, kind) = match analysis.instruction(2) {
            Some(Instruction { arg, .. }) => arg.as_jump_target(),
            None => panic!("missing instruction"),
        };
        assert_eq!(kind, JumpKind::Dynamic);
        assert_eq!(index, 0); // unused for dynamic jumps
    }

    #[test]
    fn pc_mapping_round_trips() {
        let code = [0x60, 0x01, 0x60, 0x02, 0x01, 0x00];
        let analysis = Analysis::build(&code, &Config::default()).unwrap();
        let idx = analysis.pc_to_instruction_index(2).unwrap();
        assert_eq!(analysis.instruction_index_to_pc(idx), Some(2));
    }

    #[test]
    fn push_data_byte_has_no_instruction_mapping() {
        let code = [0x60, 0x01, 0x00];
        let analysis = Analysis::build(&code, &Config::default()).unwrap();
        assert_eq!(analysis.pc_to_instruction_index(1), None);
    }
}
