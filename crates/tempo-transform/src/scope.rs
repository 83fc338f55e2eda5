//! Lexical scope chain used while converting closures
//!
//! Scopes form a tree that is walked depth-first exactly once: entering a
//! function pushes a child of the current scope, leaving it restores the
//! handle saved on entry. Scopes are kept in an arena and never revisited
//! after exit.

use std::collections::HashMap;

/// How a name came to be bound in a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarCategory {
    /// Function parameter
    Arg,
    /// Result of an instruction
    Tmp,
    /// Named storage declared by the source program
    Var,
}

/// Handle to one scope of a [`SymbolEnv`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug)]
struct Scope {
    name: String,
    parent: Option<ScopeId>,
    vars: HashMap<String, VarCategory>,
}

/// Hierarchical name resolution
#[derive(Debug)]
pub struct SymbolEnv {
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl SymbolEnv {
    /// Create an environment holding only a root scope.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            scopes: vec![Scope {
                name: root.into(),
                parent: None,
                vars: HashMap::new(),
            }],
            current: ScopeId(0),
        }
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Push a new scope whose parent is the current one and make it current.
    pub fn create_child(&mut self, name: impl Into<String>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            name: name.into(),
            parent: Some(self.current),
            vars: HashMap::new(),
        });
        self.current = id;
        id
    }

    /// Make `handle` the current scope again. Used to leave a child scope.
    pub fn restore(&mut self, handle: ScopeId) {
        debug_assert!(handle.0 < self.scopes.len());
        self.current = handle;
    }

    /// Bind `name` in the current scope, replacing any binding it already
    /// has there. Ancestor bindings are left alone.
    pub fn set_variable(&mut self, name: &str, category: VarCategory) {
        let current = self.current.0;
        self.scopes[current].vars.insert(name.to_string(), category);
    }

    /// True iff `name` is bound in the current scope itself.
    pub fn is_variable_set(&self, name: &str) -> bool {
        self.scope(self.current).vars.contains_key(name)
    }

    /// True iff `name` is not bound in the current scope but is bound in
    /// one of its ancestors.
    pub fn is_free_variable(&self, name: &str) -> bool {
        !self.is_variable_set(name) && self.ancestors().any(|s| s.vars.contains_key(name))
    }

    /// Nearest binding of `name`, searching outwards from the current scope.
    pub fn lookup(&self, name: &str) -> Option<(ScopeId, VarCategory)> {
        let mut id = Some(self.current);
        while let Some(scope_id) = id {
            let scope = self.scope(scope_id);
            if let Some(category) = scope.vars.get(name) {
                return Some((scope_id, *category));
            }
            id = scope.parent;
        }
        None
    }

    /// True if `name` is the name of the current scope or of an enclosing one.
    /// Functions are named after the scope they open, so this is how a body
    /// refers to the function it is nested in.
    pub fn is_enclosing_scope(&self, name: &str) -> bool {
        self.scope(self.current).name == name || self.ancestors().any(|s| s.name == name)
    }

    pub fn scope_name(&self, id: ScopeId) -> &str {
        &self.scope(id).name
    }

    fn ancestors(&self) -> impl Iterator<Item = &Scope> + '_ {
        let mut next = self.scope(self.current).parent;
        std::iter::from_fn(move || {
            let id = next?;
            let scope = self.scope(id);
            next = scope.parent;
            Some(scope)
        })
    }
}
