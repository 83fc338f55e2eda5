//! MIR (Mid-level Intermediate Representation) definitions
//!
//! The MIR is a typed, flat instruction form produced from the typed AST.
//! Every instruction binds its result to a name; functions and conditionals
//! own nested blocks.

use serde::{Deserialize, Serialize};
use tempo_types::{Type, TypeEnv, TypedVal};

/// A name read or written by an instruction.
///
/// Operands start out as plain names. Closure conversion turns a name that
/// resolves to an enclosing scope into a `Captured` slot, which later stages
/// read from the closure's capture record instead of the surrounding scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    /// A name resolved in the scope the instruction lives in
    Name(String),
    /// A slot of the enclosing function's capture record
    Captured {
        /// The name as it was bound in the outer scope
        name: String,
        /// Label of the block the capturing reference appears in
        block: String,
    },
}

impl Operand {
    pub fn new(name: impl Into<String>) -> Self {
        Operand::Name(name.into())
    }

    /// The name this operand originally referred to
    pub fn name(&self) -> &str {
        match self {
            Operand::Name(name) => name,
            Operand::Captured { name, .. } => name,
        }
    }

    pub fn is_captured(&self) -> bool {
        matches!(self, Operand::Captured { .. })
    }

    /// Mark this operand as a capture-record slot referenced from `block`.
    /// Returns false if it was already captured.
    pub fn capture(&mut self, block: &str) -> bool {
        match self {
            Operand::Name(name) => {
                let name = std::mem::take(name);
                *self = Operand::Captured {
                    name,
                    block: block.to_string(),
                };
                true
            }
            Operand::Captured { .. } => false,
        }
    }
}

impl From<&str> for Operand {
    fn from(name: &str) -> Self {
        Operand::Name(name.to_string())
    }
}

impl From<String> for Operand {
    fn from(name: String) -> Self {
        Operand::Name(name)
    }
}

/// How a call site reaches its callee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Callee is statically known and needs no closure record
    Direct,
    /// Callee is reached through a closure value at runtime
    #[default]
    Indirect,
}

/// A labelled, ordered sequence of instructions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub label: String,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl Block {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            instructions: Vec::new(),
        }
    }

    pub fn with_instructions(label: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        Self {
            label: label.into(),
            instructions,
        }
    }

    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    /// Insert `inst` so that it ends up at `index`, shifting the instruction
    /// currently there (and everything after it) back by one.
    ///
    /// # Panics
    ///
    /// Panics if `index` is past the end of the block. Callers insert in
    /// front of an instruction they are visiting, so `index` is always in
    /// range.
    pub fn insert_before(&mut self, index: usize, inst: Instruction) {
        self.instructions.insert(index, inst);
    }

    /// Remove and return the instruction at `index`, or `None` if the block
    /// is shorter than that.
    pub fn take(&mut self, index: usize) -> Option<Instruction> {
        if index < self.instructions.len() {
            Some(self.instructions.remove(index))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Find a direct-child instruction by its result name
    pub fn find(&self, lv_name: &str) -> Option<&Instruction> {
        self.instructions.iter().find(|i| i.lv_name.name() == lv_name)
    }
}

/// A single MIR instruction: a result name, its type, and what computes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Name the result is bound to
    pub lv_name: Operand,
    /// Type of the result
    pub ty: Type,
    #[serde(flatten)]
    pub kind: InstKind,
}

/// The closed set of instruction kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstKind {
    /// Load a numeric literal
    Number { value: f64 },
    /// Reserve a named storage slot of the instruction's type
    Alloca,
    /// Take a reference to a named value
    Ref { val: Operand },
    /// Overwrite an existing binding's storage
    Assign { val: Operand },
    /// Stamp a value with a logical time
    Time { val: Operand, time: Operand },
    /// Binary operation
    Op {
        lhs: Operand,
        op: String,
        rhs: Operand,
    },
    /// Function definition
    Fun(FunInst),
    /// Build a closure value from a function and its captured record
    MakeClosure {
        fname: String,
        captures: Vec<Operand>,
        capture_type: Type,
    },
    /// Function application
    Fcall {
        fname: Operand,
        #[serde(default)]
        args: Vec<Operand>,
        #[serde(default)]
        call_kind: CallKind,
    },
    /// Array construction
    Array {
        name: String,
        #[serde(default)]
        args: Vec<Operand>,
    },
    /// Indexed array read
    ArrayAccess { name: Operand, index: Operand },
    /// Conditional with both branches
    If {
        cond: Operand,
        then_block: Block,
        else_block: Block,
    },
    /// Function result
    Return { val: Operand },
}

/// A function definition. Owns its body block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunInst {
    /// Parameter names in order
    pub args: Vec<String>,
    pub body: Block,
    #[serde(default)]
    pub is_recursive: bool,
    /// Captured free variables, deduplicated by name, in discovery order
    #[serde(default)]
    pub free_variables: Vec<TypedVal>,
}

impl FunInst {
    pub fn new(args: &[&str], body: Block) -> Self {
        Self {
            args: args.iter().map(|a| a.to_string()).collect(),
            body,
            is_recursive: false,
            free_variables: Vec::new(),
        }
    }
}

fn operands(names: &[&str]) -> Vec<Operand> {
    names.iter().map(|n| Operand::from(*n)).collect()
}

impl Instruction {
    pub fn new(lv_name: impl Into<Operand>, ty: Type, kind: InstKind) -> Self {
        Self {
            lv_name: lv_name.into(),
            ty,
            kind,
        }
    }

    pub fn number(lv_name: &str, ty: Type, value: f64) -> Self {
        Self::new(lv_name, ty, InstKind::Number { value })
    }

    pub fn alloca(lv_name: &str, ty: Type) -> Self {
        Self::new(lv_name, ty, InstKind::Alloca)
    }

    pub fn reference(lv_name: &str, ty: Type, val: &str) -> Self {
        Self::new(lv_name, ty, InstKind::Ref { val: val.into() })
    }

    pub fn assign(lv_name: &str, ty: Type, val: &str) -> Self {
        Self::new(lv_name, ty, InstKind::Assign { val: val.into() })
    }

    pub fn time(lv_name: &str, ty: Type, val: &str, time: &str) -> Self {
        Self::new(
            lv_name,
            ty,
            InstKind::Time {
                val: val.into(),
                time: time.into(),
            },
        )
    }

    pub fn op(lv_name: &str, ty: Type, lhs: &str, op: &str, rhs: &str) -> Self {
        Self::new(
            lv_name,
            ty,
            InstKind::Op {
                lhs: lhs.into(),
                op: op.to_string(),
                rhs: rhs.into(),
            },
        )
    }

    pub fn fun(lv_name: &str, ty: Type, args: &[&str], body: Block) -> Self {
        Self::new(lv_name, ty, InstKind::Fun(FunInst::new(args, body)))
    }

    /// A function definition that calls itself
    pub fn rec_fun(lv_name: &str, ty: Type, args: &[&str], body: Block) -> Self {
        let mut fun = FunInst::new(args, body);
        fun.is_recursive = true;
        Self::new(lv_name, ty, InstKind::Fun(fun))
    }

    pub fn fcall(lv_name: &str, ty: Type, fname: &str, args: &[&str]) -> Self {
        Self::new(
            lv_name,
            ty,
            InstKind::Fcall {
                fname: fname.into(),
                args: operands(args),
                call_kind: CallKind::Indirect,
            },
        )
    }

    pub fn array(lv_name: &str, ty: Type, name: &str, args: &[&str]) -> Self {
        Self::new(
            lv_name,
            ty,
            InstKind::Array {
                name: name.to_string(),
                args: operands(args),
            },
        )
    }

    pub fn array_access(lv_name: &str, ty: Type, name: &str, index: &str) -> Self {
        Self::new(
            lv_name,
            ty,
            InstKind::ArrayAccess {
                name: name.into(),
                index: index.into(),
            },
        )
    }

    pub fn if_else(lv_name: &str, ty: Type, cond: &str, then_block: Block, else_block: Block) -> Self {
        Self::new(
            lv_name,
            ty,
            InstKind::If {
                cond: cond.into(),
                then_block,
                else_block,
            },
        )
    }

    pub fn ret(lv_name: &str, ty: Type, val: &str) -> Self {
        Self::new(lv_name, ty, InstKind::Return { val: val.into() })
    }

    /// Short name of the instruction kind, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            InstKind::Number { .. } => "number",
            InstKind::Alloca => "alloca",
            InstKind::Ref { .. } => "ref",
            InstKind::Assign { .. } => "assign",
            InstKind::Time { .. } => "time",
            InstKind::Op { .. } => "op",
            InstKind::Fun(_) => "fun",
            InstKind::MakeClosure { .. } => "makeclosure",
            InstKind::Fcall { .. } => "fcall",
            InstKind::Array { .. } => "array",
            InstKind::ArrayAccess { .. } => "arrayaccess",
            InstKind::If { .. } => "if",
            InstKind::Return { .. } => "return",
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, InstKind::Fun(_))
    }

    pub fn as_fun(&self) -> Option<&FunInst> {
        match &self.kind {
            InstKind::Fun(fun) => Some(fun),
            _ => None,
        }
    }

    pub fn as_fun_mut(&mut self) -> Option<&mut FunInst> {
        match &mut self.kind {
            InstKind::Fun(fun) => Some(fun),
            _ => None,
        }
    }

    /// Call kind of an application, `None` for any other instruction
    pub fn call_kind(&self) -> Option<CallKind> {
        match &self.kind {
            InstKind::Fcall { call_kind, .. } => Some(*call_kind),
            _ => None,
        }
    }
}

/// One compilation unit as handed over by the type checker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirUnit {
    pub toplevel: Block,
    #[serde(default)]
    pub types: TypeEnv,
}
