//! Table des portées : locaux déclarés, profondeur lexicale, slots.
//!
//! Slots are positions in the table. `end_scope` truncates the table back to the
//! entries still visible, so slots of a closed block are reused by the next one and
//! resolution can never reach a local whose block has ended.

use smallvec::SmallVec;

/// Maximum number of live locals (slot operands are one byte).
pub const MAX_LOCALS: usize = u8::MAX as usize + 1;

/// A declared local variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    /// Source name.
    pub name: String,
    /// Slot index, stable while the local is visible.
    pub slot: u8,
    /// Depth of the block that declared it (1 = outermost block).
    pub depth: u32,
}

/// Why a declaration was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    /// Same name already declared at the current depth.
    Duplicate,
    /// Every slot is taken.
    TooMany,
}

/// Locals visible at the current point of compilation.
#[derive(Debug, Default)]
pub struct ScopeTable {
    locals: SmallVec<[Local; 8]>,
    depth: u32,
}

impl ScopeTable {
    /// Empty table at global depth.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lexical depth (0 = global).
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// True outside of every block.
    pub const fn is_global(&self) -> bool {
        self.depth == 0
    }

    /// Number of visible locals.
    pub fn len(&self) -> usize {
        self.locals.len()
    }

    /// True when no local is visible.
    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }

    /// Entre dans un bloc.
    pub fn begin_scope(&mut self) {
        self.depth += 1;
    }

    /// Quitte un bloc ; renvoie le nombre de locaux retirés.
    pub fn end_scope(&mut self) -> usize {
        self.depth = self.depth.saturating_sub(1);
        let keep = self.locals.iter().take_while(|l| l.depth <= self.depth).count();
        let dropped = self.locals.len() - keep;
        self.locals.truncate(keep);
        dropped
    }

    /// Declares `name` at the current depth and returns its slot.
    ///
    /// Only the current depth is checked for duplicates: an inner block may shadow
    /// an outer local.
    pub fn declare(&mut self, name: &str) -> Result<u8, ScopeError> {
        let duplicate = self
            .locals
            .iter()
            .rev()
            .take_while(|l| l.depth == self.depth)
            .any(|l| l.name == name);
        if duplicate {
            return Err(ScopeError::Duplicate);
        }
        let slot = u8::try_from(self.locals.len()).map_err(|_| ScopeError::TooMany)?;
        self.locals.push(Local { name: name.to_owned(), slot, depth: self.depth });
        Ok(slot)
    }

    /// Slot of the most recently declared visible local called `name`.
    pub fn resolve(&self, name: &str) -> Option<u8> {
        self.locals
            .iter()
            .rev()
            .find(|l| l.depth <= self.depth && l.name == name)
            .map(|l| l.slot)
    }

    /// Visible locals, oldest first.
    pub fn locals(&self) -> &[Local] {
        &self.locals
    }
}
