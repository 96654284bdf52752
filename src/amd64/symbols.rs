//! Flat variable table: each declared name owns one 8-byte slot below `%rbp`.

use tracing::debug;

use crate::amd64::CodegenError;
use crate::lang::Span;

/// Largest number of variables one program may declare.
pub const MAX_VARIABLES: usize = 100;
/// Bytes reserved per variable.
pub const SLOT_SIZE: i64 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Symbol {
    name: String,
    offset: i64,
}

#[derive(Debug, Clone)]
pub struct VarTable {
    entries: Vec<Symbol>,
    next_offset: i64,
    capacity: usize,
}

impl Default for VarTable {
    fn default() -> Self {
        Self::new()
    }
}

impl VarTable {
    pub fn new() -> Self {
        Self::with_capacity(MAX_VARIABLES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        VarTable {
            entries: Vec::new(),
            next_offset: 0,
            capacity,
        }
    }

    /// Allocate the next slot for `name` and return its frame offset.
    pub fn declare(&mut self, name: &str, span: &Span) -> Result<i64, CodegenError> {
        if self.entries.len() >= self.capacity {
            return Err(CodegenError::TooManyVariables {
                capacity: self.capacity,
                span: span.clone(),
            });
        }
        if self.entries.iter().any(|sym| sym.name == name) {
            return Err(CodegenError::DuplicateVariable {
                name: name.to_string(),
                span: span.clone(),
            });
        }

        self.next_offset -= SLOT_SIZE;
        self.entries.push(Symbol {
            name: name.to_string(),
            offset: self.next_offset,
        });
        debug!(name, offset = self.next_offset, "declared variable");
        Ok(self.next_offset)
    }

    /// Offset of the first entry named `name`.
    pub fn lookup(&self, name: &str, span: &Span) -> Result<i64, CodegenError> {
        self.entries
            .iter()
            .find(|sym| sym.name == name)
            .map(|sym| sym.offset)
            .ok_or_else(|| CodegenError::UndefinedVariable {
                name: name.to_string(),
                span: span.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::default()
    }

    #[test]
    fn offsets_descend_by_slot_size() {
        let mut table = VarTable::new();
        let offsets: Vec<i64> = ["a", "b", "c"]
            .iter()
            .map(|name| table.declare(name, &span()).unwrap())
            .collect();
        assert_eq!(offsets, vec![-8, -16, -24]);
        assert_eq!(table.lookup("b", &span()).unwrap(), -16);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn undefined_lookup_names_the_variable() {
        let table = VarTable::new();
        let err = table.lookup("ghost", &span()).unwrap_err();
        assert!(matches!(err, CodegenError::UndefinedVariable { ref name, .. } if name == "ghost"));
        assert_eq!(err.to_string(), "undefined variable 'ghost'");
    }

    #[test]
    fn fills_exactly_to_capacity() {
        let mut table = VarTable::new();
        for idx in 0..MAX_VARIABLES {
            let offset = table.declare(&format!("v{idx}"), &span()).unwrap();
            assert_eq!(offset, -SLOT_SIZE * (idx as i64 + 1));
        }
        assert_eq!(table.len(), table.capacity());

        let err = table.declare("overflow", &span()).unwrap_err();
        assert!(matches!(
            err,
            CodegenError::TooManyVariables {
                capacity: MAX_VARIABLES,
                ..
            }
        ));
        assert_eq!(table.len(), MAX_VARIABLES);
    }

    #[test]
    fn rejects_redeclaration() {
        let mut table = VarTable::with_capacity(4);
        table.declare("x", &span()).unwrap();
        let err = table.declare("x", &span()).unwrap_err();
        assert!(matches!(err, CodegenError::DuplicateVariable { ref name, .. } if name == "x"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.declare("y", &span()).unwrap(), -16);
    }
}
