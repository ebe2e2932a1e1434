//! Per-opcode handler implementations, grouped the way the teacher crate's
//! `opcode_handlers/` directory groups them (§4.4, §4.5). Each module is a
//! flat collection of `fn(&mut Frame, &Instruction, &Analysis, &mut dyn
//! Host) -> Result<StepOutcome, VMError>` handlers; `analysis::build_instruction`
//! is the sole place that wires an opcode byte to the function pointer C3
//! bakes into its Instruction Record.

pub(crate) mod arithmetic;
pub(crate) mod bitwise;
pub(crate) mod control;
pub(crate) mod environment;
pub(crate) mod stack_memory;
pub(crate) mod storage;
pub(crate) mod system;
