//! Lowering of the typed AST into symbolic IR.
//!
//! Each subroutine body is walked once, producing a flat instruction list and
//! a value handle per sub-expression. Operators are resolved against the
//! declared inline operators and spliced into the call site; subroutine calls
//! stay symbolic until the low-level compiler expands the calling convention.
//! After all bodies are lowered, every local scope folds into the single flat
//! global store and word offsets are assigned exactly once.

use tracing::debug;

use super::ir::{self, Instr, Value};
use super::lowlevel::is_primitive;
use super::variables::{VarId, VarTable, VariableStore};
use crate::error::{Error, Result};
use crate::parser::{Expr, Item, Program, Stmt, SubCall, Target, VarRef};

/// Which scope a lowering walk is writing into
#[derive(Debug, Clone, Copy)]
enum Scope {
    /// A subroutine body, by index
    Sub(usize),
    /// An inline-operator body, by index
    Inline(usize),
}

/// A registered subroutine awaiting lowering
struct SubUnit {
    name: String,
    params: Vec<VarId>,
    rtn_type: Option<String>,
    store: VariableStore,
    body: Vec<Stmt>,
}

/// A registered inline operator
struct InlineUnit {
    symbol: String,
    params: Vec<VarId>,
    param_tys: Vec<String>,
    rtn_type: String,
    is_unsafe: bool,
    body: Vec<Stmt>,
    store: VariableStore,
}

/// Per-subroutine layout facts the low-level compiler needs
#[derive(Debug, Clone)]
pub struct SubMeta {
    /// Subroutine name
    pub name: String,
    /// Parameter slots in declaration order
    pub params: Vec<VarId>,
    /// Every local in layout order; this is the calling convention's push
    /// order
    pub locals: Vec<VarId>,
}

/// The fully lowered, finalized program
#[derive(Debug)]
pub struct LoweredProgram {
    /// Flat instruction stream, `main` first
    pub instrs: Vec<Instr>,
    /// The variable table with every offset assigned
    pub table: VarTable,
    /// Subroutine metadata, in lowering order
    pub subs: Vec<SubMeta>,
    /// Every finalized variable in layout order
    pub layout: Vec<VarId>,
    /// The reserved return-value register
    pub result: VarId,
    /// The reserved stack-pointer register
    pub stack: VarId,
    /// First free word past the finalized globals; the stack grows up from
    /// here
    pub stack_base: u16,
    /// Per-scope (label, allocations, frees) scratch counters
    pub counters: Vec<(String, u64, u64)>,
}

/// Lowers a parsed program into finalized IR
pub struct HighLevelCompiler {
    table: VarTable,
    global: VariableStore,
    subs: Vec<SubUnit>,
    ops: Vec<InlineUnit>,
    instrs: Vec<Instr>,
    next_block: u32,
}

impl Default for HighLevelCompiler {
    fn default() -> Self {
        HighLevelCompiler::new()
    }
}

impl HighLevelCompiler {
    pub fn new() -> Self {
        HighLevelCompiler {
            table: VarTable::new(),
            global: VariableStore::new("global"),
            subs: Vec::new(),
            ops: Vec::new(),
            instrs: Vec::new(),
            next_block: 0,
        }
    }

    /// Runs the whole lowering pass: registration, per-subroutine walks
    /// (`main` first), then whole-program finalization.
    pub fn lower(mut self, program: Program) -> Result<LoweredProgram> {
        self.register(program)?;
        let main = self
            .subs
            .iter()
            .position(|sub| sub.name == "main")
            .ok_or(Error::MissingMain)?;
        let mut order = vec![main];
        order.extend((0..self.subs.len()).filter(|&i| i != main));

        let mut out = Vec::new();
        for i in order {
            let name = self.subs[i].name.clone();
            let body = std::mem::take(&mut self.subs[i].body);
            out.push(Instr::SubStart { name: name.clone() });
            self.lower_stmts(Scope::Sub(i), &body, &mut out)?;
            out.push(Instr::SubEnd { name });
        }
        self.instrs = out;
        self.finalize()
    }

    fn register(&mut self, program: Program) -> Result<()> {
        for item in program.items {
            match item {
                Item::Globals(decl) => {
                    for name in &decl.names {
                        self.global.declare(&mut self.table, name, &decl.ty, false, 1);
                    }
                }
                Item::Sub(def) => {
                    let mut store = VariableStore::new(def.name.clone());
                    let params = def
                        .params
                        .iter()
                        .map(|p| store.declare(&mut self.table, &p.name, &p.ty, p.is_pointer, 1))
                        .collect();
                    self.subs.push(SubUnit {
                        name: def.name,
                        params,
                        rtn_type: def.rtn_type,
                        store,
                        body: def.body,
                    });
                }
                Item::Operator(def) => {
                    if !matches!(def.body.last(), Some(Stmt::Return(_))) {
                        return Err(Error::MalformedOperator {
                            symbol: def.symbol,
                            expected: def.rtn_type,
                        });
                    }
                    let label = format!("op({})_{}", def.symbol, self.ops.len());
                    let mut store = VariableStore::new(label);
                    let mut params = Vec::new();
                    let mut param_tys = Vec::new();
                    for p in &def.params {
                        params.push(store.declare(&mut self.table, &p.name, &p.ty, p.is_pointer, 1));
                        param_tys.push(p.ty.clone());
                    }
                    self.ops.push(InlineUnit {
                        symbol: def.symbol,
                        params,
                        param_tys,
                        rtn_type: def.rtn_type,
                        is_unsafe: def.is_unsafe,
                        body: def.body,
                        store,
                    });
                }
            }
        }
        Ok(())
    }

    fn finalize(mut self) -> Result<LoweredProgram> {
        let subs: Vec<SubMeta> = self
            .subs
            .iter()
            .map(|sub| SubMeta {
                name: sub.name.clone(),
                params: sub.params.clone(),
                locals: sub.store.layout(),
            })
            .collect();

        for unit in &self.subs {
            unit.store.fold_into(&mut self.table, &mut self.global, |_| true)?;
        }
        // Inline-operator locals only materialize when they survived
        // substitution; formals never do.
        for unit in &self.ops {
            let keep: Vec<VarId> = unit
                .store
                .layout()
                .into_iter()
                .filter(|id| {
                    !unit.params.contains(id) && ir::mention_count(&self.instrs, *id) > 0
                })
                .collect();
            unit.store
                .fold_into(&mut self.table, &mut self.global, |id| keep.contains(&id))?;
        }

        let result = self.global.declare(&mut self.table, "<result>", "int", false, 1);
        let stack = self.global.declare(&mut self.table, "<stack>", "int", false, 1);
        let stack_base = self.global.finalize(&mut self.table)?;

        let mut counters = vec![{
            let (a, f) = self.global.counters();
            (self.global.label().to_string(), a, f)
        }];
        for unit in &self.subs {
            let (a, f) = unit.store.counters();
            counters.push((unit.store.label().to_string(), a, f));
        }
        for unit in &self.ops {
            let (a, f) = unit.store.counters();
            counters.push((unit.store.label().to_string(), a, f));
        }

        debug!(
            instructions = self.instrs.len(),
            variables = self.global.layout().len(),
            stack_base,
            "lowering complete"
        );

        Ok(LoweredProgram {
            instrs: self.instrs,
            table: self.table,
            subs,
            layout: self.global.layout(),
            result,
            stack,
            stack_base,
            counters,
        })
    }

    // ---- statements ----

    fn lower_stmts(&mut self, scope: Scope, stmts: &[Stmt], out: &mut Vec<Instr>) -> Result<()> {
        for stmt in stmts {
            self.lower_stmt(scope, stmt, out)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, scope: Scope, stmt: &Stmt, out: &mut Vec<Instr>) -> Result<()> {
        match stmt {
            Stmt::Assign { target, value } => self.lower_assign(scope, target, value, out),
            Stmt::ModAssign { target, op, value } => {
                let dest = self.lower_target(scope, target, out)?;
                let value = self.lower_expr(scope, value, None, out)?;
                let dest_ty = self.value_type(&dest)?;
                self.apply_operator(
                    scope,
                    op,
                    vec![dest.clone(), value],
                    Some(&dest_ty),
                    Some(dest.clone()),
                    out,
                )?;
                self.free_if_scratch(scope, &dest)
            }
            Stmt::If { cond, body } => {
                let cond = self.lower_expr(scope, cond, None, out)?;
                let negated = self.apply_operator(scope, "!", vec![cond], Some("bool"), None, out)?;
                let id = self.next_block_id();
                out.push(Instr::IfStart {
                    id,
                    negated: negated.clone(),
                });
                self.free_if_scratch(scope, &negated)?;
                self.lower_stmts(scope, body, out)?;
                out.push(Instr::IfEnd { id });
                Ok(())
            }
            Stmt::While { cond, body } => self.lower_loop(scope, cond, body, None, out),
            Stmt::For {
                setup,
                cond,
                step,
                body,
            } => {
                self.lower_stmt(scope, setup, out)?;
                self.lower_loop(scope, cond, body, Some(step), out)
            }
            Stmt::Return(expr) => {
                let value = self.lower_expr(scope, expr, None, out)?;
                out.push(Instr::Return {
                    value: value.clone(),
                });
                self.free_if_scratch(scope, &value)
            }
            Stmt::Call(call) => {
                let dest = self.lower_call(scope, call, out)?;
                self.free_if_scratch(scope, &dest)
            }
        }
    }

    /// Loop lowering shared by `while` and `for`: the condition is computed
    /// into a pinned scratch above the loop, the entry jumps straight to the
    /// bottom re-check, and the re-check tests whichever copy ran last. The
    /// body therefore never runs when the condition is false on entry.
    fn lower_loop(
        &mut self,
        scope: Scope,
        cond: &Expr,
        body: &[Stmt],
        step: Option<&Stmt>,
        out: &mut Vec<Instr>,
    ) -> Result<()> {
        let id = self.next_block_id();
        let pinned = self.alloc_scratch(scope, "bool");
        let entry = self.lower_expr(scope, cond, None, out)?;
        self.emit_copy(scope, Value::Var(pinned), entry, out)?;
        out.push(Instr::WhileStart { id });
        self.lower_stmts(scope, body, out)?;
        if let Some(step) = step {
            self.lower_stmt(scope, step, out)?;
        }
        let recheck = self.lower_expr(scope, cond, None, out)?;
        self.emit_copy(scope, Value::Var(pinned), recheck, out)?;
        out.push(Instr::WhileEnd {
            id,
            cond: Value::Var(pinned),
        });
        self.free_scratch_id(scope, pinned)
    }

    fn lower_assign(
        &mut self,
        scope: Scope,
        target: &Target,
        value: &Expr,
        out: &mut Vec<Instr>,
    ) -> Result<()> {
        let dest = self.lower_target(scope, target, out)?;
        let dest_ty = self.value_type(&dest)?;
        let start = out.len();
        let handle = self.lower_expr(scope, value, Some(&dest_ty), out)?;

        if let Value::List(elems) = &handle {
            let arr = match &dest {
                Value::Var(id) => *id,
                _ => return Err(Error::internal("array literal assigned through a pointer")),
            };
            let expected = self.table.get(arr).size;
            if elems.len() != expected as usize {
                return Err(Error::ArrayLengthMismatch {
                    name: self.table.get(arr).name.clone(),
                    expected,
                    found: elems.len(),
                });
            }
            let elems = elems.clone();
            out.push(Instr::Assign {
                dest,
                value: handle,
            });
            for elem in &elems {
                self.free_if_scratch(scope, elem)?;
            }
            return Ok(());
        }

        let produced = out.len() > start;
        match &handle {
            Value::Var(s) if produced && self.is_owned_scratch(scope, *s) => {
                let sid = *s;
                let dest_read = dest
                    .backing_var()
                    .map_or(false, |d| ir::mention_count(&out[start..], d) > 0);
                if matches!(dest, Value::Var(_)) && !dest_read {
                    ir::substitute(&mut out[start..], sid, &dest);
                } else if ir::sole_final_dest(&out[start..], sid) {
                    if let Some(slot) = out.last_mut().and_then(ir::dest_of_mut) {
                        *slot = dest.clone();
                    }
                } else {
                    out.push(Instr::Assign {
                        dest: dest.clone(),
                        value: handle.clone(),
                    });
                }
                self.free_scratch_id(scope, sid)?;
            }
            _ => {
                if handle != dest {
                    out.push(Instr::Assign {
                        dest: dest.clone(),
                        value: handle.clone(),
                    });
                }
                self.free_if_scratch(scope, &handle)?;
            }
        }
        self.free_if_scratch(scope, &dest)
    }

    fn lower_target(&mut self, scope: Scope, target: &Target, out: &mut Vec<Instr>) -> Result<Value> {
        match target {
            Target::Var(vref) => Ok(Value::Var(self.get_var(scope, vref)?)),
            Target::Index { name, index } => self.lower_index(scope, name, index, out),
        }
    }

    // ---- expressions ----

    fn lower_expr(
        &mut self,
        scope: Scope,
        expr: &Expr,
        expected: Option<&str>,
        out: &mut Vec<Instr>,
    ) -> Result<Value> {
        match expr {
            Expr::Literal(n) => Ok(Value::Literal(*n)),
            Expr::Var(vref) => Ok(Value::Var(self.get_var(scope, vref)?)),
            Expr::Index { name, index } => self.lower_index(scope, name, index, out),
            Expr::Binary { lhs, op, rhs } => {
                let lhs = self.lower_expr(scope, lhs, None, out)?;
                let rhs = self.lower_expr(scope, rhs, None, out)?;
                self.apply_operator(scope, op, vec![lhs, rhs], expected, None, out)
            }
            Expr::Unary { op, operand } => {
                let operand = self.lower_expr(scope, operand, None, out)?;
                self.apply_operator(scope, op, vec![operand], expected, None, out)
            }
            Expr::Call(call) => self.lower_call(scope, call, out),
            Expr::Array(elems) => {
                let mut handles = Vec::with_capacity(elems.len());
                for elem in elems {
                    handles.push(self.lower_expr(scope, elem, None, out)?);
                }
                Ok(Value::List(handles))
            }
        }
    }

    fn lower_index(
        &mut self,
        scope: Scope,
        name: &str,
        index: &Expr,
        out: &mut Vec<Instr>,
    ) -> Result<Value> {
        let base = self.lookup_named(scope, name)?;
        let elem_ty = self.table.get(base).ty.clone();
        // a pointer variable holds the base address; an array variable is the
        // base address
        let base_v = if self.table.get(base).is_pointer {
            Value::Var(base)
        } else {
            Value::Ref(base)
        };
        let index = self.lower_expr(scope, index, None, out)?;
        let addr = self.alloc_scratch(scope, &elem_ty);
        out.push(Instr::CallSub {
            name: "__ADD__".to_string(),
            args: vec![base_v, index.clone()],
            dest: Value::Var(addr),
        });
        self.free_if_scratch(scope, &index)?;
        Ok(Value::Pointer(addr))
    }

    fn lower_call(&mut self, scope: Scope, call: &SubCall, out: &mut Vec<Instr>) -> Result<Value> {
        let (rtn_type, callee_params) = if is_primitive(&call.name) {
            if call.args.len() != 2 {
                return Err(Error::ArityMismatch {
                    name: call.name.clone(),
                    expected: 2,
                    found: call.args.len(),
                });
            }
            ("int".to_string(), Vec::new())
        } else {
            let sub = self
                .subs
                .iter()
                .find(|sub| sub.name == call.name)
                .ok_or_else(|| Error::UnknownSubroutine {
                    name: call.name.clone(),
                })?;
            if call.args.len() != sub.params.len() {
                return Err(Error::ArityMismatch {
                    name: call.name.clone(),
                    expected: sub.params.len(),
                    found: call.args.len(),
                });
            }
            (
                sub.rtn_type.clone().unwrap_or_else(|| "int".to_string()),
                sub.params.clone(),
            )
        };
        let mut args = Vec::with_capacity(call.args.len());
        for (i, arg) in call.args.iter().enumerate() {
            let value = self.lower_expr(scope, arg, None, out)?;
            let value = match value {
                // arrays decay to their base address
                Value::Var(id) if self.table.get(id).size > 1 => Value::Ref(id),
                // in a recursive call an earlier argument copy overwrites the
                // parameter slot a later argument still reads; stage the read
                // through a scratch before any slot is written
                Value::Var(id) if callee_params.iter().take(i).any(|p| *p == id) => {
                    let ty = self.table.get(id).ty.clone();
                    let staged = self.alloc_scratch(scope, &ty);
                    self.emit_copy(scope, Value::Var(staged), Value::Var(id), out)?;
                    Value::Var(staged)
                }
                other => other,
            };
            args.push(value);
        }
        let dest = self.alloc_scratch(scope, &rtn_type);
        out.push(Instr::CallSub {
            name: call.name.clone(),
            args: args.clone(),
            dest: Value::Var(dest),
        });
        for arg in &args {
            self.free_if_scratch(scope, arg)?;
        }
        Ok(Value::Var(dest))
    }

    /// Resolves an operator application against the declared inline operators
    /// and splices the winning body at the call site.
    fn apply_operator(
        &mut self,
        scope: Scope,
        symbol: &str,
        operands: Vec<Value>,
        expected: Option<&str>,
        forced_dest: Option<Value>,
        out: &mut Vec<Instr>,
    ) -> Result<Value> {
        let mut tys = Vec::with_capacity(operands.len());
        for operand in &operands {
            tys.push(self.value_type(operand)?);
        }
        let idx = self
            .ops
            .iter()
            .position(|op| {
                op.symbol == symbol
                    && op.param_tys == tys
                    && expected.map_or(true, |e| op.rtn_type == e)
            })
            .ok_or_else(|| Error::UnknownOperator {
                symbol: symbol.to_string(),
                operands: tys.join(", "),
                result: expected.unwrap_or("_").to_string(),
            })?;
        let rtn_type = self.ops[idx].rtn_type.clone();
        let is_unsafe = self.ops[idx].is_unsafe;
        let params = self.ops[idx].params.clone();
        let body = self.ops[idx].body.clone();

        // result slot: the forced destination, a reusable fresh scratch
        // operand, or a new scratch adopting the operator's return type
        let dest = if let Some(dest) = forced_dest {
            dest
        } else if let Some(id) = operands
            .iter()
            .filter_map(Value::backing_var)
            .find(|&id| self.is_owned_scratch(scope, id))
        {
            self.table.set_type(id, &rtn_type);
            Value::Var(id)
        } else {
            Value::Var(self.alloc_scratch(scope, &rtn_type))
        };

        // lower the body fresh for this call site, terminal return split off
        let (last, init) = body.split_last().ok_or_else(|| Error::MalformedOperator {
            symbol: symbol.to_string(),
            expected: rtn_type.clone(),
        })?;
        let ret_expr = match last {
            Stmt::Return(expr) => expr,
            _ => {
                return Err(Error::MalformedOperator {
                    symbol: symbol.to_string(),
                    expected: rtn_type,
                })
            }
        };
        let mut buf = Vec::new();
        self.lower_stmts(Scope::Inline(idx), init, &mut buf)?;
        let mut result = self.lower_expr(Scope::Inline(idx), ret_expr, None, &mut buf)?;

        for (pid, actual) in params.iter().zip(&operands) {
            ir::substitute(&mut buf, *pid, actual);
            ir::substitute_value(&mut result, *pid, actual);
        }

        let dest_backing = dest.backing_var();
        let aliases = dest_backing
            .map_or(false, |d| operands.iter().any(|o| o.backing_var() == Some(d)));
        let result_var = match &result {
            Value::Var(id) if !is_unsafe && self.ops[idx].store.owns(*id) => Some(*id),
            _ => None,
        };

        match result_var {
            Some(rid) => {
                let dest_read = dest_backing
                    .map_or(false, |d| ir::mention_count(&buf, d) > 0);
                if matches!(dest, Value::Var(_)) && !aliases && !dest_read {
                    // the return-producing variable never materializes
                    ir::substitute(&mut buf, rid, &dest);
                    out.extend(buf);
                } else if ir::sole_final_dest(&buf, rid) {
                    if let Some(slot) = buf.last_mut().and_then(ir::dest_of_mut) {
                        *slot = dest.clone();
                    }
                    out.extend(buf);
                } else {
                    out.extend(buf);
                    out.push(Instr::Assign {
                        dest: dest.clone(),
                        value: result.clone(),
                    });
                }
                self.free_inline_scratch(idx, rid)?;
            }
            None => {
                out.extend(buf);
                if result != dest {
                    out.push(Instr::Assign {
                        dest: dest.clone(),
                        value: result.clone(),
                    });
                }
                if let Some(id) = result.backing_var() {
                    self.free_inline_scratch(idx, id)?;
                }
            }
        }

        // operands are consumed; the reused result slot stays live
        for operand in &operands {
            if operand.backing_var() == dest_backing {
                continue;
            }
            self.free_if_scratch(scope, operand)?;
        }
        Ok(dest)
    }

    // ---- scope plumbing ----

    fn scope_parts(&mut self, scope: Scope) -> (&mut VariableStore, &mut VarTable) {
        let store = match scope {
            Scope::Sub(i) => &mut self.subs[i].store,
            Scope::Inline(i) => &mut self.ops[i].store,
        };
        (store, &mut self.table)
    }

    fn scope_store(&self, scope: Scope) -> &VariableStore {
        match scope {
            Scope::Sub(i) => &self.subs[i].store,
            Scope::Inline(i) => &self.ops[i].store,
        }
    }

    fn get_var(&mut self, scope: Scope, vref: &VarRef) -> Result<VarId> {
        match vref {
            VarRef::Named(name) => self.lookup_named(scope, name),
            VarRef::Decl(decl) => {
                let size = match decl.size.as_deref() {
                    None => 1,
                    Some(Expr::Literal(n)) if *n > 0 && *n < 65536 => *n as u16,
                    Some(_) => {
                        return Err(Error::NonConstantArraySize {
                            name: decl.name.clone(),
                        })
                    }
                };
                if decl.is_global {
                    Ok(self.global.declare(
                        &mut self.table,
                        &decl.name,
                        &decl.ty,
                        decl.is_pointer,
                        size,
                    ))
                } else {
                    let (store, table) = self.scope_parts(scope);
                    Ok(store.declare(table, &decl.name, &decl.ty, decl.is_pointer, size))
                }
            }
        }
    }

    fn lookup_named(&self, scope: Scope, name: &str) -> Result<VarId> {
        self.scope_store(scope)
            .lookup(name)
            .or_else(|| self.global.lookup(name))
            .ok_or_else(|| Error::UndeclaredVariable {
                name: name.to_string(),
            })
    }

    fn value_type(&self, value: &Value) -> Result<String> {
        match value {
            Value::Literal(_) | Value::Ref(_) => Ok("int".to_string()),
            Value::Var(id) | Value::Pointer(id) => Ok(self.table.get(*id).ty.clone()),
            Value::List(_) => Err(Error::internal("array literal used as a scalar operand")),
        }
    }

    fn alloc_scratch(&mut self, scope: Scope, ty: &str) -> VarId {
        let (store, table) = self.scope_parts(scope);
        store.alloc_scratch(table, ty)
    }

    fn is_owned_scratch(&self, scope: Scope, id: VarId) -> bool {
        let info = self.table.get(id);
        info.is_scratch && info.busy && self.scope_store(scope).owns_scratch(id)
    }

    fn free_scratch_id(&mut self, scope: Scope, id: VarId) -> Result<()> {
        let (store, table) = self.scope_parts(scope);
        store.free_scratch(table, id)
    }

    fn free_if_scratch(&mut self, scope: Scope, value: &Value) -> Result<()> {
        if let Some(id) = value.backing_var() {
            if self.is_owned_scratch(scope, id) {
                self.free_scratch_id(scope, id)?;
            }
        }
        Ok(())
    }

    fn free_inline_scratch(&mut self, idx: usize, id: VarId) -> Result<()> {
        let info = self.table.get(id);
        if info.is_scratch && info.busy && self.ops[idx].store.owns_scratch(id) {
            self.ops[idx].store.free_scratch(&mut self.table, id)?;
        }
        Ok(())
    }

    fn emit_copy(
        &mut self,
        scope: Scope,
        dest: Value,
        value: Value,
        out: &mut Vec<Instr>,
    ) -> Result<()> {
        if value != dest {
            out.push(Instr::Assign {
                dest,
                value: value.clone(),
            });
            self.free_if_scratch(scope, &value)?;
        }
        Ok(())
    }

    fn next_block_id(&mut self) -> u32 {
        let id = self.next_block;
        self.next_block += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const ADD_OP: &str = "operator + (int a, int b) -> int { return __ADD__(a, b); }";

    fn lower_src(src: &str) -> Result<LoweredProgram> {
        HighLevelCompiler::new().lower(parse(src)?)
    }

    #[test]
    fn missing_main_is_fatal() {
        let err = lower_src("sub helper() { int a = 1; }").unwrap_err();
        assert_eq!(err, Error::MissingMain);
    }

    #[test]
    fn unknown_operator_reports_symbol_and_types() {
        let err = lower_src("sub main() { int a = 1 % 2; }").unwrap_err();
        match err {
            Error::UnknownOperator { symbol, operands, .. } => {
                assert_eq!(symbol, "%");
                assert_eq!(operands, "int, int");
            }
            other => panic!("expected unknown operator, got {other:?}"),
        }
    }

    #[test]
    fn inline_operator_application_splices_a_single_primitive() {
        let src = format!("{ADD_OP} sub main() {{ int a = 1 + 2; }}");
        let lowered = lower_src(&src).unwrap();
        let calls: Vec<_> = lowered
            .instrs
            .iter()
            .filter(|i| matches!(i, Instr::CallSub { .. }))
            .collect();
        assert_eq!(calls.len(), 1);
        match calls[0] {
            Instr::CallSub { name, args, .. } => {
                assert_eq!(name, "__ADD__");
                assert_eq!(args, &[Value::Literal(1), Value::Literal(2)]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn assignment_retargets_the_final_destination() {
        let src = format!("{ADD_OP} sub main() {{ int a = 1; a = a + 1; }}");
        let lowered = lower_src(&src).unwrap();
        // the add writes straight into `a`; no copy through a scratch remains
        let copies = lowered
            .instrs
            .iter()
            .filter(|i| matches!(i, Instr::Assign { value: Value::Var(_), .. }))
            .count();
        assert_eq!(copies, 0);
    }

    #[test]
    fn scratch_pools_balance_for_every_scope() {
        let not_op = "operator ! (int a) -> bool { bool r = 1; r = __MNZ__(a, 0); return r; }";
        let src = format!(
            "{ADD_OP} {not_op} sub main() {{ int a = 1 + 2 + 3; if (a) {{ a = a + 1; }} }}"
        );
        let lowered = lower_src(&src).unwrap();
        for (label, allocs, frees) in &lowered.counters {
            assert_eq!(allocs, frees, "scope `{label}` leaked scratches");
        }
    }

    #[test]
    fn undeclared_variable_is_fatal() {
        let err = lower_src("sub main() { int a = b; }").unwrap_err();
        assert_eq!(
            err,
            Error::UndeclaredVariable {
                name: "b".to_string()
            }
        );
    }
}
