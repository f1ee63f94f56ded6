use crate::signal::VerifierSignal;
use crate::types::VType;

/// A per-block register environment: a dense small-vector of live register
/// types with a monotonic "live top" cursor. `slots` always holds exactly
/// the live registers `R(0..live_top)`; there is no separate cursor field
/// because `slots.len()` *is* the cursor.
///
/// `PartialEq`/`Eq` give the strict-equality join required on block entry:
/// two environments "agree" iff this derive says they're equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Env {
    slots: Vec<VType>,
    max_locals: u16,
}

impl Env {
    pub fn new(max_locals: u16) -> Self {
        Self {
            slots: Vec::new(),
            max_locals,
        }
    }

    pub fn live_top(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, index: u16) -> Option<&VType> {
        self.slots.get(index as usize)
    }

    /// Slice of the top `count` live registers, lowest index first.
    pub fn top_slice(&self, count: usize) -> Option<&[VType]> {
        let len = self.slots.len();
        if count > len {
            return None;
        }
        Some(&self.slots[len - count..])
    }

    pub fn top(&self) -> Result<&VType, VerifierSignal> {
        self.slots.last().ok_or(VerifierSignal::RTopDoesNotExist)
    }

    /// Overwrites an existing, in-bounds register's type in place.
    pub fn reinit_existing(&mut self, index: u16, ty: VType) {
        self.slots[index as usize] = ty;
    }

    /// Pushes a new top-of-stack register. Fails if doing so would exceed
    /// `max_locals`.
    pub fn push(&mut self, ty: VType) -> Result<u16, VerifierSignal> {
        if self.slots.len() >= self.max_locals as usize {
            return Err(VerifierSignal::PushingOverflows);
        }
        self.slots.push(ty);
        Ok((self.slots.len() - 1) as u16)
    }

    /// Pops `count` registers from the live top. Fails if `count` exceeds
    /// the live height.
    pub fn pop(&mut self, count: usize) -> Result<(), VerifierSignal> {
        if count > self.slots.len() {
            return Err(VerifierSignal::RTopDoesNotExist);
        }
        let new_len = self.slots.len() - count;
        self.slots.truncate(new_len);
        Ok(())
    }
}
