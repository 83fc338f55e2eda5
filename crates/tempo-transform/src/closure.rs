//! Closure conversion pass
//!
//! Makes every function's access to enclosing scopes explicit by:
//! 1. Walking each function body in its own scope and collecting the names
//!    it reads from enclosing scopes (its free variables)
//! 2. Rewriting each such reference into a slot of the capture record
//! 3. Registering capture-free functions as known, so calls to them can be
//!    made directly instead of through a closure value
//! 4. Emitting a `makeclosure` in front of every function that does capture,
//!    and appending the capture record to its signature

use log::{debug, trace};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use tempo_mir::{Block, CallKind, FunInst, InstKind, Instruction, Operand};
use tempo_types::{Type, TypeEnv, TypedVal};

use crate::error::{ClosureError, Result};
use crate::scope::{ScopeId, SymbolEnv, VarCategory};

/// Name of the root scope the top-level block is converted in
pub const TOPLEVEL_SCOPE: &str = "toplevel";

/// Which traversal of a function body is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    First,
    /// Re-run over a recursive, capture-free body once its function is known
    Second,
}

/// State threaded through the whole conversion of one compilation unit
pub struct ClosureConverter<'a> {
    env: SymbolEnv,
    type_env: &'a TypeEnv,
    /// Functions proven to capture nothing, with the scope each one's name
    /// is bound in
    known_functions: HashMap<String, ScopeId>,
    /// Functions that received a capture record, in conversion order
    closures: Vec<String>,
}

/// A function scope entered on a converter. Leaving it, including by an
/// early `?` return, restores the scope that was current before.
struct FunctionScope<'c, 'a> {
    cc: &'c mut ClosureConverter<'a>,
    saved: ScopeId,
}

impl<'c, 'a> FunctionScope<'c, 'a> {
    fn enter(cc: &'c mut ClosureConverter<'a>, name: &str) -> Self {
        let saved = cc.env.current();
        cc.env.create_child(name);
        Self { cc, saved }
    }
}

impl<'c, 'a> Deref for FunctionScope<'c, 'a> {
    type Target = ClosureConverter<'a>;

    fn deref(&self) -> &Self::Target {
        self.cc
    }
}

impl<'c, 'a> DerefMut for FunctionScope<'c, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.cc
    }
}

impl Drop for FunctionScope<'_, '_> {
    fn drop(&mut self) {
        self.cc.env.restore(self.saved);
    }
}

impl<'a> ClosureConverter<'a> {
    pub fn new(type_env: &'a TypeEnv) -> Self {
        Self {
            env: SymbolEnv::new(TOPLEVEL_SCOPE),
            type_env,
            known_functions: HashMap::new(),
            closures: Vec::new(),
        }
    }

    pub fn env(&self) -> &SymbolEnv {
        &self.env
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.known_functions.contains_key(name)
    }

    /// True if `name`, read in the current scope, denotes a known function
    /// rather than a parameter or local that shadows it. A name not bound
    /// anywhere yet is a self-reference from inside the function's own body.
    fn resolves_to_known(&self, name: &str) -> bool {
        match self.known_functions.get(name) {
            Some(bound_in) => match self.env.lookup(name) {
                Some((scope, _)) => scope == *bound_in,
                None => true,
            },
            None => false,
        }
    }

    /// Names of all capture-free functions, sorted
    pub fn known_functions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.known_functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of functions that were given a capture record, in the order
    /// they finished converting (inner functions first)
    pub fn closures(&self) -> &[String] {
        &self.closures
    }

    /// Convert every instruction of the top-level block in the root scope.
    pub fn convert_toplevel(&mut self, toplevel: &mut Block) -> Result<()> {
        // Nothing encloses the root scope, so this never collects anything.
        let mut free_variables = Vec::new();
        self.convert_block(toplevel, &mut free_variables, Pass::First)?;
        debug_assert!(free_variables.is_empty());
        Ok(())
    }

    /// If `op` names a value bound only in an enclosing scope, record it in
    /// `free_variables` (once per name) and turn it into a capture slot
    /// referenced from `block_label`.
    ///
    /// Returns whether `op` denotes a capture slot afterwards.
    pub fn gather_free_variable(
        &self,
        op: &mut Operand,
        free_variables: &mut Vec<TypedVal>,
        block_label: &str,
    ) -> Result<bool> {
        if op.is_captured() {
            return Ok(true);
        }
        let name = op.name();
        if !self.env.is_free_variable(name) {
            return Ok(false);
        }
        if !free_variables.iter().any(|v| v.name == name) {
            let ty = self
                .type_env
                .lookup(name)
                .ok_or_else(|| ClosureError::UnresolvedType {
                    name: name.to_string(),
                    block: block_label.to_string(),
                })?;
            free_variables.push(TypedVal::new(name, ty.clone()));
        }
        trace!("capturing `{}` in block `{}`", name, block_label);
        op.capture(block_label);
        Ok(true)
    }

    /// Classify the name an instruction binds its result to. A name already
    /// bound in the current scope is a local redefinition; a name bound only
    /// in an enclosing scope is a write to a captured slot; anything else is
    /// a fresh local.
    pub fn check_lvalue(
        &mut self,
        lv_name: &mut Operand,
        free_variables: &mut Vec<TypedVal>,
        block_label: &str,
    ) -> Result<()> {
        if lv_name.is_captured() {
            return Ok(());
        }
        if self.env.is_variable_set(lv_name.name())
            || !self.gather_free_variable(lv_name, free_variables, block_label)?
        {
            self.env.set_variable(lv_name.name(), VarCategory::Tmp);
        }
        Ok(())
    }

    fn convert_block(
        &mut self,
        block: &mut Block,
        free_variables: &mut Vec<TypedVal>,
        pass: Pass,
    ) -> Result<()> {
        let mut index = 0;
        while index < block.instructions.len() {
            let closure = self
                .convert_instruction(&mut block.instructions[index], &block.label, free_variables, pass)
                .map_err(|e| e.within(&block.instructions[index], &block.label))?;

            if let Some(closure) = closure {
                block.insert_before(index, closure);
                // Step over the new makeclosure; it needs no conversion.
                index += 1;
            }
            index += 1;
        }
        Ok(())
    }

    /// Apply the conversion rule for one instruction. Operands are handled
    /// before the result name; the results of `return` and `if` are never
    /// writes to outer state. Returns a `makeclosure` that has to be placed
    /// right before `inst` when `inst` is a capturing function.
    fn convert_instruction(
        &mut self,
        inst: &mut Instruction,
        block_label: &str,
        free_variables: &mut Vec<TypedVal>,
        pass: Pass,
    ) -> Result<Option<Instruction>> {
        let Instruction { lv_name, ty, kind } = inst;
        match kind {
            InstKind::Number { .. } | InstKind::Alloca => {}
            InstKind::Ref { val } | InstKind::Assign { val } => {
                self.gather_free_variable(val, free_variables, block_label)?;
            }
            InstKind::Return { val } => {
                self.gather_free_variable(val, free_variables, block_label)?;
                return Ok(None);
            }
            InstKind::Time { val, time } => {
                self.gather_free_variable(val, free_variables, block_label)?;
                self.gather_free_variable(time, free_variables, block_label)?;
            }
            InstKind::Op { lhs, rhs, .. } => {
                self.gather_free_variable(lhs, free_variables, block_label)?;
                self.gather_free_variable(rhs, free_variables, block_label)?;
            }
            InstKind::Array { args, .. } => {
                for arg in args {
                    self.gather_free_variable(arg, free_variables, block_label)?;
                }
            }
            InstKind::ArrayAccess { name, index } => {
                self.gather_free_variable(name, free_variables, block_label)?;
                self.gather_free_variable(index, free_variables, block_label)?;
            }
            InstKind::Fcall {
                fname,
                args,
                call_kind,
            } => {
                self.classify_call(fname, call_kind, free_variables, block_label)?;
                for arg in args {
                    self.gather_free_variable(arg, free_variables, block_label)?;
                }
            }
            InstKind::If {
                cond,
                then_block,
                else_block,
            } => {
                // Branches share the enclosing function's scope and captures.
                self.gather_free_variable(cond, free_variables, block_label)?;
                self.convert_block(then_block, free_variables, pass)?;
                self.convert_block(else_block, free_variables, pass)?;
                self.env.set_variable(lv_name.name(), VarCategory::Tmp);
                return Ok(None);
            }
            // Output of this pass, never rewritten again.
            InstKind::MakeClosure { .. } => return Ok(None),
            InstKind::Fun(fun) => {
                return self.convert_function(lv_name, ty, fun, block_label, free_variables, pass)
            }
        }
        self.check_lvalue(lv_name, free_variables, block_label)?;
        Ok(None)
    }

    /// Decide how a call reaches its callee. Calls to known functions become
    /// direct unless a closer binding shadows the function's name; any other
    /// callee is a closure value, which is captured like an ordinary operand
    /// when it lives in an enclosing scope.
    fn classify_call(
        &self,
        fname: &mut Operand,
        call_kind: &mut CallKind,
        free_variables: &mut Vec<TypedVal>,
        block_label: &str,
    ) -> Result<()> {
        if fname.is_captured() {
            return Ok(());
        }
        if self.resolves_to_known(fname.name()) {
            *call_kind = CallKind::Direct;
            return Ok(());
        }
        let callee = fname.name();
        let declared = self.env.lookup(callee).is_some()
            || self.env.is_enclosing_scope(callee)
            || self.type_env.contains(callee);
        if !declared {
            return Err(ClosureError::UnknownCallee {
                callee: callee.to_string(),
                block: block_label.to_string(),
            });
        }
        self.gather_free_variable(fname, free_variables, block_label)?;
        Ok(())
    }

    /// Convert one function definition found in the block labelled
    /// `block_label`, whose enclosing function collects into
    /// `outer_free_variables`.
    fn convert_function(
        &mut self,
        lv_name: &mut Operand,
        ty: &mut Type,
        fun: &mut FunInst,
        block_label: &str,
        outer_free_variables: &mut Vec<TypedVal>,
        pass: Pass,
    ) -> Result<Option<Instruction>> {
        if pass == Pass::Second {
            // Converted on the first pass already. The only function that
            // became known since is the recursive one being re-run.
            let recursive = self.env.scope_name(self.env.current()).to_string();
            reclassify_calls(&mut fun.body, &recursive);
            return Ok(None);
        }

        let name = lv_name.name().to_string();
        debug!("converting function `{}`", name);

        let mut free_variables = Vec::new();
        {
            let mut scope = FunctionScope::enter(self, &name);
            for arg in &fun.args {
                scope.env.set_variable(arg, VarCategory::Arg);
            }
            scope.convert_block(&mut fun.body, &mut free_variables, Pass::First)?;

            if free_variables.is_empty() {
                debug!("`{}` captures nothing, calls to it are direct", name);
                let bound_in = scope.saved;
                scope.known_functions.insert(name.clone(), bound_in);
                if fun.is_recursive {
                    // Self-calls were classified before `name` was known.
                    scope.convert_block(&mut fun.body, &mut free_variables, Pass::Second)?;
                }
            }
        }

        let closure = if free_variables.is_empty() {
            None
        } else {
            Some(self.emit_closure(&name, ty, &mut free_variables, block_label, outer_free_variables)?)
        };
        fun.free_variables = free_variables;

        self.check_lvalue(lv_name, outer_free_variables, block_label)?;
        Ok(closure)
    }

    /// Build the `makeclosure` for a capturing function, extend the
    /// function's signature with its capture record, and give the captures
    /// their per-function names.
    fn emit_closure(
        &mut self,
        name: &str,
        ty: &mut Type,
        free_variables: &mut [TypedVal],
        block_label: &str,
        outer_free_variables: &mut Vec<TypedVal>,
    ) -> Result<Instruction> {
        if !ty.is_function() {
            return Err(ClosureError::NotAFunction {
                name: name.to_string(),
                ty: ty.clone(),
            });
        }
        let capture_type = Type::capture_record(free_variables);
        if let Some(signature) = ty.as_function_mut() {
            signature.arg_types.push(capture_type.clone());
        }

        // The captured values are read where the closure is built, so they
        // may themselves come from further out.
        let mut captures = Vec::with_capacity(free_variables.len());
        for fv in free_variables.iter() {
            let mut capture = Operand::new(fv.name.clone());
            self.gather_free_variable(&mut capture, outer_free_variables, block_label)?;
            captures.push(capture);
        }
        debug!(
            "`{}` captures {} value(s), emitting `{}_cls`",
            name,
            captures.len(),
            name
        );

        let mut closure = Instruction::new(
            format!("{}_cls", name),
            ty.clone(),
            InstKind::MakeClosure {
                fname: name.to_string(),
                captures,
                capture_type,
            },
        );
        self.check_lvalue(&mut closure.lv_name, outer_free_variables, block_label)?;

        for fv in free_variables.iter_mut() {
            fv.name = format!("{}_{}", fv.name, name);
        }
        self.closures.push(name.to_string());
        Ok(closure)
    }
}

/// Mark calls to `name` inside `block` as direct, descending into branches
/// and into nested functions that do not rebind `name`.
fn reclassify_calls(block: &mut Block, name: &str) {
    for inst in &mut block.instructions {
        match &mut inst.kind {
            InstKind::Fcall {
                fname, call_kind, ..
            } => {
                if !fname.is_captured() && fname.name() == name {
                    *call_kind = CallKind::Direct;
                }
            }
            InstKind::If {
                then_block,
                else_block,
                ..
            } => {
                reclassify_calls(then_block, name);
                reclassify_calls(else_block, name);
            }
            InstKind::Fun(fun) => {
                let rebinds = fun.args.iter().any(|a| a == name) || fun.body.find(name).is_some();
                if !rebinds {
                    reclassify_calls(&mut fun.body, name);
                }
            }
            _ => {}
        }
    }
}

