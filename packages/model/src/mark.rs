//! # Marks
//!
//! Inline annotations attached to text and inline leaves. A node's marks
//! form a set ordered by mark rank with no duplicates; adding a mark
//! displaces any mark it conflicts with through `excludes`.

use std::fmt;

use crate::schema::{Attrs, MarkType};

#[derive(Clone)]
pub struct Mark {
    ty: MarkType,
    attrs: Attrs,
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.attrs == other.attrs
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attrs.is_empty() {
            write!(f, "{}", self.ty.name())
        } else {
            write!(f, "{}{:?}", self.ty.name(), self.attrs)
        }
    }
}

impl Mark {
    pub(crate) fn new(ty: MarkType, attrs: Attrs) -> Self {
        Self { ty, attrs }
    }

    pub fn mark_type(&self) -> &MarkType {
        &self.ty
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Add this mark to `set`, removing marks it conflicts with. Returns
    /// the set unchanged when an equal mark is already present.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut out = Vec::with_capacity(set.len() + 1);
        let mut placed = false;
        for other in set {
            if other == self {
                return set.to_vec();
            }
            if self.ty.excludes(&other.ty) || other.ty.excludes(&self.ty) {
                continue;
            }
            if !placed && other.ty.rank() > self.ty.rank() {
                out.push(self.clone());
                placed = true;
            }
            out.push(other.clone());
        }
        if !placed {
            out.push(self.clone());
        }
        out
    }

    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| *m != self).cloned().collect()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.iter().any(|m| m == self)
    }

    /// Compare two mark sets
    pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
    }

    /// Build a well-formed set from an arbitrary list
    pub fn normalize_set(marks: Vec<Mark>) -> Vec<Mark> {
        let mut set: Vec<Mark> = Vec::with_capacity(marks.len());
        for mark in marks {
            set = mark.add_to_set(&set);
        }
        set
    }
}
