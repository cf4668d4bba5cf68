//! Tuple declarations: the ordered variable/constant slots of a set or
//! relation tuple.

use crate::utils::errors::{PolyError, PolyResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One slot of a tuple declaration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TupleElem {
    /// A bound variable name
    Var(String),
    /// A fixed integer constant
    Const(i64),
}

/// An ordered declaration of tuple positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TupleDecl {
    elems: Vec<TupleElem>,
}

impl TupleDecl {
    /// An empty declaration.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A declaration of `size` positions with default names `__tv0..`.
    pub fn with_size(size: usize) -> Self {
        Self {
            elems: (0..size).map(|i| TupleElem::Var(format!("__tv{}", i))).collect(),
        }
    }

    /// A declaration from explicit variable names.
    pub fn from_names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            elems: names.into_iter().map(|n| TupleElem::Var(n.into())).collect(),
        }
    }

    /// Number of positions.
    pub fn size(&self) -> usize {
        self.elems.len()
    }

    /// Concatenate two declarations, preserving order.
    pub fn concat(&self, other: &TupleDecl) -> TupleDecl {
        let mut elems = self.elems.clone();
        elems.extend(other.elems.iter().cloned());
        TupleDecl { elems }
    }

    /// Append a variable position.
    pub fn append_var(&mut self, name: impl Into<String>) {
        self.elems.push(TupleElem::Var(name.into()));
    }

    /// Append a constant position.
    pub fn append_const(&mut self, value: i64) {
        self.elems.push(TupleElem::Const(value));
    }

    /// Set one position. Constants are immutable once set: writing a
    /// conflicting constant fails with `TupleDeclConflict`, and writing a
    /// variable over a constant leaves the constant in place.
    pub fn set_elem(&mut self, position: usize, elem: TupleElem) -> PolyResult<()> {
        if let TupleElem::Const(existing) = self.elems[position] {
            match elem {
                TupleElem::Const(v) if v != existing => {
                    return Err(PolyError::TupleDeclConflict {
                        position,
                        existing,
                        attempted: v,
                    });
                }
                _ => return Ok(()),
            }
        }
        self.elems[position] = elem;
        Ok(())
    }

    /// Copy one slot from another declaration.
    pub fn copy_elem(&mut self, src: &TupleDecl, src_pos: usize, dst_pos: usize) -> PolyResult<()> {
        self.set_elem(dst_pos, src.elems[src_pos].clone())
    }

    /// Whether the position holds a constant.
    pub fn elem_is_const(&self, position: usize) -> bool {
        matches!(self.elems[position], TupleElem::Const(_))
    }

    /// The constant at the position, if any.
    pub fn elem_const_val(&self, position: usize) -> Option<i64> {
        match self.elems[position] {
            TupleElem::Const(v) => Some(v),
            TupleElem::Var(_) => None,
        }
    }

    /// The printed form of the position: the variable name, or the constant.
    pub fn elem_var_string(&self, position: usize) -> String {
        match &self.elems[position] {
            TupleElem::Var(name) => name.clone(),
            TupleElem::Const(v) => v.to_string(),
        }
    }

    /// Find the position of a variable name.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.elems.iter().position(|e| matches!(e, TupleElem::Var(n) if n == name))
    }

    /// Drop the positions in `[start, end)`, preserving the order of the
    /// remaining ones.
    pub fn drop_range(&self, start: usize, end: usize) -> TupleDecl {
        let mut elems = Vec::with_capacity(self.size().saturating_sub(end - start));
        for (i, e) in self.elems.iter().enumerate() {
            if i < start || i >= end {
                elems.push(e.clone());
            }
        }
        TupleDecl { elems }
    }

    /// Render as `[a, b]`, or as `[a] -> [b, c]` when a split point is given.
    pub fn to_string_with_arrow(&self, split_at: Option<usize>) -> String {
        let render = |range: std::ops::Range<usize>| -> String {
            let parts: Vec<String> = range.map(|i| self.elem_var_string(i)).collect();
            format!("[{}]", parts.join(", "))
        };
        match split_at {
            Some(at) => format!("{} -> {}", render(0..at), render(at..self.size())),
            None => render(0..self.size()),
        }
    }
}

impl fmt::Display for TupleDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_with_arrow(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_preserves_order() {
        let a = TupleDecl::from_names(["i", "j"]);
        let b = TupleDecl::from_names(["k"]);
        let c = a.concat(&b);
        assert_eq!(c.size(), 3);
        assert_eq!(c.elem_var_string(2), "k");
        assert_eq!(c.to_string_with_arrow(Some(2)), "[i, j] -> [k]");
    }

    #[test]
    fn test_constant_conflict() {
        let mut d = TupleDecl::from_names(["i"]);
        d.set_elem(0, TupleElem::Const(3)).unwrap();
        // same constant is fine
        d.set_elem(0, TupleElem::Const(3)).unwrap();
        // a variable write leaves the constant in place
        d.set_elem(0, TupleElem::Var("x".into())).unwrap();
        assert_eq!(d.elem_const_val(0), Some(3));
        // a different constant conflicts
        let err = d.set_elem(0, TupleElem::Const(4)).unwrap_err();
        assert!(matches!(err, PolyError::TupleDeclConflict { existing: 3, attempted: 4, .. }));
    }

    #[test]
    fn test_drop_range() {
        let d = TupleDecl::from_names(["i", "j", "k", "l"]);
        let dropped = d.drop_range(1, 3);
        assert_eq!(dropped.to_string_with_arrow(None), "[i, l]");
    }

    #[test]
    fn test_copy_elem() {
        let src = TupleDecl::from_names(["a", "b"]);
        let mut dst = TupleDecl::with_size(2);
        dst.copy_elem(&src, 1, 0).unwrap();
        assert_eq!(dst.elem_var_string(0), "b");
    }

    #[test]
    fn test_position_of() {
        let d = TupleDecl::from_names(["i", "j"]);
        assert_eq!(d.position_of("j"), Some(1));
        assert_eq!(d.position_of("z"), None);
    }
}
