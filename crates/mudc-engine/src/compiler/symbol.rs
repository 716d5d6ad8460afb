//! Global symbol table.
//!
//! One flat namespace maps names to their current meaning for the whole
//! compilation. The original used a fixed 512-bucket chained hash; this is
//! a growable `FxHashMap`, which keeps the O(1) lookups without the
//! overflow hazard. Symbols are never removed, only redefined.

use crate::compiler::error::CompileError;
use crate::compiler::value::Value;
use crate::parser::{Expr, Span};
use rustc_hash::FxHashMap;

/// What a name currently means.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolDef {
    /// An evaluated value bound by assignment.
    Variable(Value),
    /// An unevaluated expression, re-evaluated at each mention.
    Macro(Expr),
    /// A class registered by `define`, payload is the class id.
    Class(u8),
    /// An instantiated object bound by `use`.
    Object { class: u8, noid: u8 },
    /// Declared but meaningless (placeholder binding).
    None,
}

impl SymbolDef {
    fn kind_name(&self) -> &'static str {
        match self {
            SymbolDef::Variable(_) => "variable",
            SymbolDef::Macro(_) => "macro",
            SymbolDef::Class(_) => "class",
            SymbolDef::Object { .. } => "object",
            SymbolDef::None => "none",
        }
    }

    /// Variables, macros, and placeholders may be rebound freely;
    /// classes and objects may not (unless the shadow policy allows it).
    fn reassignable(&self) -> bool {
        matches!(
            self,
            SymbolDef::Variable(_) | SymbolDef::Macro(_) | SymbolDef::None
        )
    }
}

/// One entry in the symbol table.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    /// Sequential code number, stable for the compilation.
    pub code: u32,
    pub def: SymbolDef,
}

impl Symbol {
    pub fn kind_name(&self) -> &'static str {
        self.def.kind_name()
    }
}

/// Redefinition policy for class- and object-kind symbols.
///
/// The variable/macro rebinding rule is fixed; this only governs the
/// kinds the original left ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedefinePolicy {
    /// Redefining a class or object name is a `DuplicateSymbol` error.
    #[default]
    Error,
    /// A later definition shadows the earlier one.
    Shadow,
}

/// Global name-to-meaning mapping.
#[derive(Debug, Default)]
pub struct SymbolTable {
    map: FxHashMap<String, Symbol>,
    next_code: u32,
    policy: RedefinePolicy,
}

impl SymbolTable {
    pub fn new(policy: RedefinePolicy) -> Self {
        Self {
            map: FxHashMap::default(),
            next_code: 0,
            policy,
        }
    }

    /// Bind `name` to `def`.
    ///
    /// Fails with `DuplicateSymbol` when the existing binding is not
    /// compatible with redefinition under the current policy. A rebound
    /// symbol keeps its original code number.
    pub fn declare(&mut self, name: &str, def: SymbolDef, span: Span) -> Result<(), CompileError> {
        if let Some(existing) = self.map.get_mut(name) {
            if existing.def.reassignable() || self.policy == RedefinePolicy::Shadow {
                existing.def = def;
                return Ok(());
            }
            return Err(CompileError::DuplicateSymbol {
                name: name.to_string(),
                span,
            });
        }
        let code = self.next_code;
        self.next_code += 1;
        self.map.insert(
            name.to_string(),
            Symbol {
                name: name.to_string(),
                code,
                def,
            },
        );
        Ok(())
    }

    /// Current binding for `name`, or `None` when unbound.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.map.get(name)
    }

    /// Whether a `declare` of `name` would succeed. Lets callers check
    /// before building state a failed declaration would orphan.
    pub fn can_declare(&self, name: &str) -> bool {
        match self.map.get(name) {
            Some(existing) => existing.def.reassignable() || self.policy == RedefinePolicy::Shadow,
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::dummy()
    }

    #[test]
    fn variables_may_be_reassigned() {
        let mut table = SymbolTable::new(RedefinePolicy::Error);
        table
            .declare("depth", SymbolDef::Variable(Value::Int(1)), span())
            .unwrap();
        table
            .declare("depth", SymbolDef::Variable(Value::Int(2)), span())
            .unwrap();
        assert_eq!(
            table.lookup("depth").unwrap().def,
            SymbolDef::Variable(Value::Int(2))
        );
    }

    #[test]
    fn classes_may_not_be_redefined_by_default() {
        let mut table = SymbolTable::new(RedefinePolicy::Error);
        table.declare("ghost", SymbolDef::Class(5), span()).unwrap();
        let err = table
            .declare("ghost", SymbolDef::Class(6), span())
            .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateSymbol { .. }));
    }

    #[test]
    fn shadow_policy_allows_class_redefinition() {
        let mut table = SymbolTable::new(RedefinePolicy::Shadow);
        table.declare("ghost", SymbolDef::Class(5), span()).unwrap();
        table.declare("ghost", SymbolDef::Class(6), span()).unwrap();
        assert_eq!(table.lookup("ghost").unwrap().def, SymbolDef::Class(6));
    }

    #[test]
    fn code_numbers_are_sequential_and_stable() {
        let mut table = SymbolTable::new(RedefinePolicy::Error);
        table
            .declare("a", SymbolDef::Variable(Value::Int(0)), span())
            .unwrap();
        table
            .declare("b", SymbolDef::Variable(Value::Int(0)), span())
            .unwrap();
        table
            .declare("a", SymbolDef::Variable(Value::Int(9)), span())
            .unwrap();
        assert_eq!(table.lookup("a").unwrap().code, 0);
        assert_eq!(table.lookup("b").unwrap().code, 1);
    }

    #[test]
    fn lookup_of_unbound_name_is_none() {
        let table = SymbolTable::new(RedefinePolicy::Error);
        assert!(table.lookup("nothing").is_none());
    }
}
