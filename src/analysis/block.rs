//! C2: segment scanned bytecode into basic blocks and precompute each
//! block's aggregate gas cost and stack requirements (§4.2).
//!
//! Grounded on the teacher's `jit::analyzer::analyze_bytecode`, which walks
//! the same terminator/JUMPDEST boundaries to find block starts; this
//! generalizes that walk to also fold in O-1's gas-cap splitting and to
//! compute the `(stack_req, stack_max_growth)` pair C3 packs into each
//! block's `BEGINBLOCK` record, using the same running-min/running-max
//! technique real bytecode-analysis interpreters use to validate a whole
//! block's stack usage in one check instead of per instruction.

use crate::bytecode::CodeMap;
use crate::config::Config;
use crate::opcodes::{opcode_info, Opcode};
use crate::word::Word;

const JUMPI_BYTE: u8 = 0x57;

/// One decoded instruction within a block, still indexed by its original
/// program counter. `push_value` is populated only for PUSH1..PUSH32 (and
/// is `None`, meaningfully zero, for PUSH0).
#[derive(Debug, Clone)]
pub(crate) struct BlockOp {
    pub pc: usize,
    pub opcode: u8,
    pub push_value: Option<Word>,
}

/// A basic block: a maximal run of instructions that always execute
/// together once entered, plus the aggregate metadata C3 packs into the
/// `BEGINBLOCK` record that heads it.
#[derive(Debug, Clone)]
pub(crate) struct Block {
    pub start_pc: usize,
    pub ops: Vec<BlockOp>,
    /// Sum of every op's static base gas cost in this block (O-1: capped
    /// so the sum never exceeds `Config::block_gas_cost_cap`; the block is
    /// split before the instruction that would push it over).
    pub gas_cost: u32,
    /// Minimum stack depth the frame must have on entry for every pop in
    /// this block to succeed, computed without per-instruction checks.
    pub stack_req: i16,
    /// Maximum net stack growth reached at any point in the block relative
    /// to its entry depth, used to validate against the stack limit once.
    pub stack_max_growth: i16,
}

impl Block {
    /// Whether this block's last op always halts or diverts control flow —
    /// the complement is exactly the "ran off the end of the bytecode"
    /// case C3 must close with a synthesized `STOP` (§4.3).
    #[inline]
    pub(crate) fn ends_in_terminator(&self) -> bool {
        self.ops
            .last()
            .is_some_and(|op| is_terminator_byte(op.opcode))
    }

    /// Whether this block's head op is the `JUMPDEST` that the block's
    /// synthesized `BEGINBLOCK` record absorbs (§4.3: "`JUMPDEST` becomes a
    /// `BEGINBLOCK` record").
    #[inline]
    pub(crate) fn starts_with_jumpdest(&self) -> bool {
        self.ops
            .first()
            .is_some_and(|op| op.opcode == Opcode::JUMPDEST.byte())
    }
}

/// Whether `byte` always ends a basic block when executed (§4.2 rule 2),
/// including bytes the opcode table doesn't define — an undefined opcode
/// behaves like `INVALID` (O-4).
#[inline]
fn is_terminator_byte(byte: u8) -> bool {
    match opcode_info(byte) {
        None => true,
        Some(_) => {
            matches!(
                byte,
                b if b == Opcode::STOP.byte()
                    || b == Opcode::RETURN.byte()
                    || b == Opcode::REVERT.byte()
                    || b == Opcode::SELFDESTRUCT.byte()
                    || b == Opcode::JUMP.byte()
                    || b == Opcode::INVALID.byte()
            )
        }
    }
}

#[inline]
fn push_immediate_len(byte: u8) -> usize {
    if (0x60..=0x7F).contains(&byte) {
        usize::from(byte - 0x60 + 1)
    } else {
        0
    }
}

/// Run C2 over a C1 [`CodeMap`], producing every live basic block in
/// program order. Dead code — bytes after a true terminator up to (but
/// excluding) the next `JUMPDEST` — is walked over but never materialized
/// into a block (§4.2 rule 2's dead-code elimination).
pub(crate) fn build_blocks(code: &[u8], code_map: &CodeMap, config: &Config) -> Vec<Block> {
    let len = code.len();
    let cap = u64::from(config.block_gas_cost_cap);
    let mut blocks = Vec::new();
    let mut pc = 0usize;

    while pc < len {
        if !code_map.is_code(pc) {
            pc += 1;
            continue;
        }

        let start_pc = pc;
        let mut ops = Vec::new();
        let mut gas_sum: u64 = 0;
        let mut stack_change: i32 = 0;
        let mut min_stack: i32 = 0;
        let mut max_stack: i32 = 0;
        let mut ended_on_terminator = false;

        while pc < len {
            if pc != start_pc && code_map.is_jumpdest(pc) {
                break;
            }

            #[allow(clippy::indexing_slicing)]
            let byte = code[pc];
            let info = opcode_info(byte);
            let (pops, pushes, base_gas) = match info {
                Some(oi) => (oi.pops, oi.pushes, oi.base_gas),
                None => (0u16, 0u16, 0u32),
            };

            if !ops.is_empty() && gas_sum.saturating_add(u64::from(base_gas)) > cap {
                break;
            }
            gas_sum = gas_sum.saturating_add(u64::from(base_gas));

            stack_change -= i32::from(pops);
            if stack_change < min_stack {
                min_stack = stack_change;
            }
            stack_change += i32::from(pushes);
            if stack_change > max_stack {
                max_stack = stack_change;
            }

            let push_len = push_immediate_len(byte);
            let push_value = if push_len > 0 {
                let data_start = pc.saturating_add(1);
                let data_end = (data_start.saturating_add(push_len)).min(len);
                #[allow(clippy::indexing_slicing)]
                let bytes = &code[data_start..data_end];
                Some(Word::from_big_endian(bytes))
            } else {
                None
            };

            ops.push(BlockOp {
                pc,
                opcode: byte,
                push_value,
            });

            let is_terminator = is_terminator_byte(byte);
            let is_jumpi = byte == JUMPI_BYTE;
            pc = pc.saturating_add(1).saturating_add(push_len).min(len);

            if is_terminator {
                ended_on_terminator = true;
                break;
            }
            if is_jumpi {
                break;
            }
        }

        #[allow(clippy::as_conversions)]
        let gas_cost = gas_sum.min(u64::from(u32::MAX)) as u32;
        #[allow(clippy::as_conversions)]
        let stack_req = (-min_stack).clamp(0, i32::from(i16::MAX)) as i16;
        #[allow(clippy::as_conversions)]
        let stack_max_growth = max_stack.clamp(0, i32::from(i16::MAX)) as i16;

        blocks.push(Block {
            start_pc,
            ops,
            gas_cost,
            stack_req,
            stack_max_growth,
        });

        if ended_on_terminator {
            while pc < len && !code_map.is_jumpdest(pc) {
                pc += 1;
            }
        }
    }

    blocks
}
