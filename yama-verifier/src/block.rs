use std::collections::BTreeSet;

use yama_model::Op;

/// A maximal straight-line run of instructions `[start, end)` with a single
/// entry point. Blocks are partitioned at every branch target and every
/// instruction immediately after a branch or exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Block {
    pub start: usize,
    pub end: usize,
}

impl Block {
    pub fn last_pc(&self) -> usize {
        self.end - 1
    }
}

fn branch_target(pc: usize, delta: i32) -> Option<usize> {
    let target = pc as i64 + 1 + delta as i64;
    if target < 0 {
        None
    } else {
        Some(target as usize)
    }
}

/// Partitions a flat instruction sequence into basic blocks.
///
/// Leaders are: instruction 0, every in-bounds branch target, and every
/// instruction immediately following a block terminator. Out-of-bounds
/// branch targets are *not* filtered out here — they surface as
/// `verif_puts_PC_out_of_bounds` when `successors` is asked to resolve them.
pub fn partition(ops: &[Op]) -> Vec<Block> {
    let mut leaders = BTreeSet::new();
    leaders.insert(0);
    for (pc, op) in ops.iter().enumerate() {
        if op.is_branch() {
            let delta = match op {
                Op::Jump { delta } => *delta,
                Op::JumpTrue { delta, .. } => *delta,
                Op::JumpFalse { delta, .. } => *delta,
                _ => unreachable!(),
            };
            if let Some(target) = branch_target(pc, delta) {
                if target < ops.len() {
                    leaders.insert(target);
                }
            }
        }
        if op.is_block_terminator() && pc + 1 < ops.len() {
            leaders.insert(pc + 1);
        }
    }
    let mut leaders: Vec<usize> = leaders.into_iter().collect();
    leaders.push(ops.len());
    leaders
        .windows(2)
        .map(|w| Block {
            start: w[0],
            end: w[1],
        })
        .collect()
}

/// A block's successor edges, computed from its final instruction.
///
/// `Term` edges (branch targets, explicit or implicit fallthrough) and the
/// empty vec for a `ret`-terminated block (no successors — a true exit).
pub enum Successors {
    /// Resolved successor block-start program counters.
    Targets(Vec<usize>),
    /// A branch target or fallthrough landed out of bounds.
    OutOfBounds,
    /// The block falls off the end of the program without a `ret`.
    FallsOffEnd,
}

pub fn successors(ops: &[Op], block: Block) -> Successors {
    let last_pc = block.last_pc();
    match &ops[last_pc] {
        Op::Jump { delta } => match branch_target(last_pc, *delta) {
            Some(t) if t < ops.len() => Successors::Targets(vec![t]),
            _ => Successors::OutOfBounds,
        },
        Op::JumpTrue { delta, .. } | Op::JumpFalse { delta, .. } => {
            let target = match branch_target(last_pc, *delta) {
                Some(t) if t < ops.len() => t,
                _ => return Successors::OutOfBounds,
            };
            if last_pc + 1 < ops.len() {
                Successors::Targets(vec![target, last_pc + 1])
            } else {
                Successors::FallsOffEnd
            }
        }
        Op::Ret { .. } => Successors::Targets(vec![]),
        _ => {
            if last_pc + 1 < ops.len() {
                Successors::Targets(vec![last_pc + 1])
            } else {
                Successors::FallsOffEnd
            }
        }
    }
}
