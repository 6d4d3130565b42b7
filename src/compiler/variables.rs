//! Variable tables and per-scope stores.
//!
//! Every variable lives in one flat [`VarTable`] for the whole compilation and
//! is referred to by its [`VarId`] handle; IR instructions never hold names or
//! addresses. Scopes are [`VariableStore`]s: ordered named variables plus a
//! reusable scratch pool. Offsets are assigned exactly once, after every scope
//! has folded into the global store.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Stable handle into the compilation's [`VarTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(u32);

/// Everything known about one variable
#[derive(Debug, Clone)]
pub struct VarInfo {
    /// Current name; locals are renamed to a scope-qualified form when their
    /// store folds into the global store
    pub name: String,
    /// Scalar type tag (`int`, `bool`)
    pub ty: String,
    /// Declared with `type*`; holds a word address and indexing reads through
    /// it instead of taking the variable's own address
    pub is_pointer: bool,
    /// Word count; scalars are 1, arrays their element count
    pub size: u16,
    /// Word address, set exactly once at global finalization
    pub offset: Option<u16>,
    /// Drawn from a scratch pool rather than declared
    pub is_scratch: bool,
    /// For scratches: currently allocated and not yet freed
    pub busy: bool,
}

/// The flat table of every variable in a compilation
#[derive(Debug, Default)]
pub struct VarTable {
    vars: Vec<VarInfo>,
}

impl VarTable {
    pub fn new() -> Self {
        VarTable::default()
    }

    fn push(&mut self, info: VarInfo) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(info);
        id
    }

    /// Read access by handle. Handles are only minted by this table, so the
    /// index is always in range.
    pub fn get(&self, id: VarId) -> &VarInfo {
        &self.vars[id.0 as usize]
    }

    fn get_mut(&mut self, id: VarId) -> &mut VarInfo {
        &mut self.vars[id.0 as usize]
    }

    /// Retypes a variable; reused scratch slots adopt the type of the value
    /// they now hold
    pub(crate) fn set_type(&mut self, id: VarId, ty: &str) {
        self.get_mut(id).ty = ty.to_string();
    }

    /// Finalized offset of a variable, or an internal error if offsets have
    /// not been assigned yet
    pub fn offset(&self, id: VarId) -> Result<u16> {
        self.get(id)
            .offset
            .ok_or_else(|| Error::internal(format!("variable `{}` has no offset", self.get(id).name)))
    }
}

/// One scope's variables: named declarations in insertion order plus a
/// reusable scratch pool.
#[derive(Debug)]
pub struct VariableStore {
    /// Scope label used to qualify names at fold time (`main`, `op(+)`)
    label: String,
    named: Vec<VarId>,
    by_name: HashMap<String, VarId>,
    pool: Vec<VarId>,
    allocs: u64,
    frees: u64,
}

impl VariableStore {
    pub fn new(label: impl Into<String>) -> Self {
        VariableStore {
            label: label.into(),
            named: Vec::new(),
            by_name: HashMap::new(),
            pool: Vec::new(),
            allocs: 0,
            frees: 0,
        }
    }

    /// Looks up a named variable in this scope
    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.by_name.get(name).copied()
    }

    /// Declares a named variable. A repeated declaration of the same name
    /// resolves to the existing variable; the type annotation is a definition
    /// point only at first reference.
    pub fn declare(
        &mut self,
        table: &mut VarTable,
        name: &str,
        ty: &str,
        is_pointer: bool,
        size: u16,
    ) -> VarId {
        if let Some(id) = self.lookup(name) {
            return id;
        }
        let id = table.push(VarInfo {
            name: name.to_string(),
            ty: ty.to_string(),
            is_pointer,
            size,
            offset: None,
            is_scratch: false,
            busy: false,
        });
        self.named.push(id);
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Allocates a scratch slot: reuses a free pool entry or mints a new one.
    /// The caller owns the slot until it calls [`VariableStore::free_scratch`].
    pub fn alloc_scratch(&mut self, table: &mut VarTable, ty: &str) -> VarId {
        self.allocs += 1;
        for &id in &self.pool {
            if !table.get(id).busy {
                let info = table.get_mut(id);
                info.busy = true;
                info.ty = ty.to_string();
                return id;
            }
        }
        let id = table.push(VarInfo {
            name: format!("scratch_{}", self.pool.len()),
            ty: ty.to_string(),
            is_pointer: false,
            size: 1,
            offset: None,
            is_scratch: true,
            busy: true,
        });
        self.pool.push(id);
        id
    }

    /// Returns a scratch slot to the pool. Freeing a slot that is not busy or
    /// not from this pool is an internal invariant violation.
    pub fn free_scratch(&mut self, table: &mut VarTable, id: VarId) -> Result<()> {
        if !self.pool.contains(&id) {
            return Err(Error::internal(format!(
                "scratch `{}` freed in scope `{}` that does not own it",
                table.get(id).name,
                self.label
            )));
        }
        let info = table.get_mut(id);
        if !info.busy {
            return Err(Error::internal(format!("scratch `{}` freed twice", info.name)));
        }
        info.busy = false;
        self.frees += 1;
        Ok(())
    }

    /// Allocation counters, for the pool-discipline property tests
    pub fn counters(&self) -> (u64, u64) {
        (self.allocs, self.frees)
    }

    /// Whether this scope's pool owns the scratch slot
    pub fn owns_scratch(&self, id: VarId) -> bool {
        self.pool.contains(&id)
    }

    /// Whether this scope owns the variable, named or scratch
    pub fn owns(&self, id: VarId) -> bool {
        self.named.contains(&id) || self.pool.contains(&id)
    }

    /// Scope label, as used for qualified names
    pub fn label(&self) -> &str {
        &self.label
    }

    /// All variables of this scope in layout order: named first, then the
    /// scratch pool. This is also the push order of the calling convention.
    pub fn layout(&self) -> Vec<VarId> {
        self.named.iter().chain(self.pool.iter()).copied().collect()
    }

    /// Folds this local scope into the global store: verifies no scratch is
    /// still busy, renames every variable to its scope-qualified form, and
    /// appends it to the global layout. `keep` filters which variables
    /// materialize (inline-operator scopes drop substituted-away variables).
    pub fn fold_into(
        &self,
        table: &mut VarTable,
        global: &mut VariableStore,
        keep: impl Fn(VarId) -> bool,
    ) -> Result<()> {
        for &id in &self.pool {
            if table.get(id).busy {
                return Err(Error::ScratchStillBusy {
                    name: format!("{}::{}", self.label, table.get(id).name),
                });
            }
        }
        for id in self.layout() {
            if !keep(id) {
                continue;
            }
            let qualified = format!("{}::{}", self.label, table.get(id).name);
            table.get_mut(id).name = qualified.clone();
            global.named.push(id);
            global.by_name.insert(qualified, id);
        }
        Ok(())
    }

    /// Assigns monotonically increasing word offsets to every variable in
    /// layout order. Address 0 is the machine's program counter, so offsets
    /// start at 1. Returns the first free word past the store.
    pub fn finalize(&self, table: &mut VarTable) -> Result<u16> {
        for &id in &self.pool {
            if table.get(id).busy {
                return Err(Error::ScratchStillBusy {
                    name: table.get(id).name.clone(),
                });
            }
        }
        let mut next: u16 = 1;
        for id in self.layout() {
            let info = table.get_mut(id);
            if info.offset.is_some() {
                return Err(Error::internal(format!(
                    "variable `{}` finalized twice",
                    info.name
                )));
            }
            info.offset = Some(next);
            next += info.size;
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_pool_reuses_freed_slots() {
        let mut table = VarTable::new();
        let mut store = VariableStore::new("test");
        let a = store.alloc_scratch(&mut table, "int");
        store.free_scratch(&mut table, a).unwrap();
        let b = store.alloc_scratch(&mut table, "int");
        assert_eq!(a, b);
        let c = store.alloc_scratch(&mut table, "int");
        assert_ne!(a, c);
        assert_eq!(store.counters(), (3, 1));
    }

    #[test]
    fn finalize_assigns_offsets_from_one_and_arrays_take_their_size() {
        let mut table = VarTable::new();
        let mut store = VariableStore::new("g");
        let a = store.declare(&mut table, "a", "int", false, 1);
        let arr = store.declare(&mut table, "arr", "int", false, 3);
        let b = store.declare(&mut table, "b", "int", false, 1);
        let next = store.finalize(&mut table).unwrap();
        assert_eq!(table.offset(a).unwrap(), 1);
        assert_eq!(table.offset(arr).unwrap(), 2);
        assert_eq!(table.offset(b).unwrap(), 5);
        assert_eq!(next, 6);
    }

    #[test]
    fn finalize_rejects_busy_scratches() {
        let mut table = VarTable::new();
        let mut store = VariableStore::new("g");
        store.alloc_scratch(&mut table, "int");
        match store.finalize(&mut table) {
            Err(Error::ScratchStillBusy { .. }) => {}
            other => panic!("expected busy-scratch error, got {other:?}"),
        }
    }

    #[test]
    fn fold_renames_locals_into_the_global_store() {
        let mut table = VarTable::new();
        let mut global = VariableStore::new("global");
        let mut local = VariableStore::new("main");
        let x = local.declare(&mut table, "x", "int", false, 1);
        local.fold_into(&mut table, &mut global, |_| true).unwrap();
        assert_eq!(table.get(x).name, "main::x");
        assert_eq!(global.lookup("main::x"), Some(x));
    }

    #[test]
    fn redeclaration_resolves_to_the_existing_variable() {
        let mut table = VarTable::new();
        let mut store = VariableStore::new("s");
        let a = store.declare(&mut table, "v", "int", false, 1);
        let b = store.declare(&mut table, "v", "int", false, 1);
        assert_eq!(a, b);
    }
}
