// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Structural diffing for model values.

`PartialEq` says *whether* two values differ; [`FindMismatch`] says *where*.
The first difference found is reported as a [`Mismatch`] whose path reads
like an accessor chain, e.g.

```text
ComponentArray(Pop1).dynamics_properties.dynamics_properties.sub_components[Proj2].sub_components[pls].properties[weight]
```
*/

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub path: String,
    pub detail: String,
}

impl Mismatch {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            detail: detail.into(),
        }
    }

    /// Prefix the path with `segment` (`Type(name)`, `.field` or `[key]`)
    pub fn within(mut self, segment: impl AsRef<str>) -> Self {
        self.path.insert_str(0, segment.as_ref());
        self
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.detail)
        } else {
            write!(f, "{}: {}", self.path, self.detail)
        }
    }
}

pub trait FindMismatch {
    /// First difference between `self` and `other`, or `None` when equal
    fn find_mismatch(&self, other: &Self) -> Option<Mismatch>;

    /// Same as [`find_mismatch`](Self::find_mismatch) but with the path
    /// relative to a containing value, so only the root carries a type label
    fn nested_mismatch(&self, other: &Self) -> Option<Mismatch> {
        self.find_mismatch(other)
    }
}

/// Compare with `PartialEq` and report both values on difference
#[macro_export]
macro_rules! impl_leaf_mismatch {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::mismatch::FindMismatch for $ty {
                fn find_mismatch(&self, other: &Self) -> Option<$crate::mismatch::Mismatch> {
                    if self == other {
                        None
                    } else {
                        Some($crate::mismatch::Mismatch::new(format!("{:?} != {:?}", self, other)))
                    }
                }
            }
        )*
    };
}

/// Field-by-field comparison for a struct
///
/// `label` is an expression evaluated on the value that names it at the root
/// of the path (typically `format!("Type({})", value.name)`).
#[macro_export]
macro_rules! impl_find_mismatch {
    ($ty:ty, |$this:ident| $label:expr, [$($field:ident),* $(,)?]) => {
        impl $crate::mismatch::FindMismatch for $ty {
            fn find_mismatch(&self, other: &Self) -> Option<$crate::mismatch::Mismatch> {
                $crate::mismatch::FindMismatch::nested_mismatch(self, other).map(|mismatch| {
                    let $this = self;
                    let label: String = $label;
                    mismatch.within(label)
                })
            }

            fn nested_mismatch(&self, other: &Self) -> Option<$crate::mismatch::Mismatch> {
                $(
                    if let Some(mismatch) = $crate::mismatch::FindMismatch::nested_mismatch(
                        &self.$field,
                        &other.$field,
                    ) {
                        return Some(mismatch.within(concat!(".", stringify!($field))));
                    }
                )*
                None
            }
        }
    };
}

impl_leaf_mismatch!(String, bool, usize, u64, i8, f64);

impl<K, V> FindMismatch for BTreeMap<K, V>
where
    K: Ord + fmt::Debug + fmt::Display,
    V: FindMismatch,
{
    fn find_mismatch(&self, other: &Self) -> Option<Mismatch> {
        let only_self: Vec<&K> = self.keys().filter(|k| !other.contains_key(*k)).collect();
        let only_other: Vec<&K> = other.keys().filter(|k| !self.contains_key(*k)).collect();
        if !only_self.is_empty() || !only_other.is_empty() {
            return Some(Mismatch::new(format!(
                "keys only in left: {:?}, only in right: {:?}",
                only_self, only_other
            )));
        }
        self.iter().find_map(|(key, value)| {
            other
                .get(key)
                .and_then(|other_value| value.nested_mismatch(other_value))
                .map(|m| m.within(format!("[{}]", key)))
        })
    }
}

impl<T> FindMismatch for BTreeSet<T>
where
    T: Ord + fmt::Debug,
{
    fn find_mismatch(&self, other: &Self) -> Option<Mismatch> {
        let only_self: Vec<&T> = self.difference(other).collect();
        let only_other: Vec<&T> = other.difference(self).collect();
        if only_self.is_empty() && only_other.is_empty() {
            None
        } else {
            Some(Mismatch::new(format!(
                "only in left: {:?}, only in right: {:?}",
                only_self, only_other
            )))
        }
    }
}

impl<T: FindMismatch> FindMismatch for Vec<T> {
    fn find_mismatch(&self, other: &Self) -> Option<Mismatch> {
        if self.len() != other.len() {
            return Some(Mismatch::new(format!(
                "length {} != {}",
                self.len(),
                other.len()
            )));
        }
        self.iter()
            .zip(other)
            .enumerate()
            .find_map(|(i, (a, b))| a.nested_mismatch(b).map(|m| m.within(format!("[{}]", i))))
    }
}

impl<T: FindMismatch + fmt::Debug> FindMismatch for Option<T> {
    fn find_mismatch(&self, other: &Self) -> Option<Mismatch> {
        match (self, other) {
            (None, None) => None,
            (Some(a), Some(b)) => a.nested_mismatch(b),
            _ => Some(Mismatch::new(format!("{:?} != {:?}", self, other))),
        }
    }
}

impl<T: FindMismatch + ?Sized> FindMismatch for Arc<T> {
    fn find_mismatch(&self, other: &Self) -> Option<Mismatch> {
        if Arc::ptr_eq(self, other) {
            return None;
        }
        (**self).nested_mismatch(other)
    }
}

impl<T: FindMismatch + ?Sized> FindMismatch for Box<T> {
    fn find_mismatch(&self, other: &Self) -> Option<Mismatch> {
        (**self).nested_mismatch(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Leaf {
        name: String,
        values: BTreeMap<String, f64>,
    }

    crate::impl_find_mismatch!(Leaf, |leaf| format!("Leaf({})", leaf.name), [name, values]);

    #[test]
    fn test_equal_values_have_no_mismatch() {
        let a = Leaf {
            name: "a".into(),
            values: [("x".to_string(), 1.0)].into_iter().collect(),
        };
        assert_eq!(a.find_mismatch(&a.clone()), None);
    }

    #[test]
    fn test_mismatch_path() {
        let a = Leaf {
            name: "a".into(),
            values: [("x".to_string(), 1.0)].into_iter().collect(),
        };
        let mut b = a.clone();
        b.values.insert("x".to_string(), 2.0);
        let mismatch = a.find_mismatch(&b).unwrap();
        assert_eq!(mismatch.path, "Leaf(a).values[x]");
        assert_eq!(mismatch.detail, "1.0 != 2.0");
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Tree {
        name: String,
        leaves: BTreeMap<String, Leaf>,
    }

    crate::impl_find_mismatch!(Tree, |tree| format!("Tree({})", tree.name), [name, leaves]);

    #[test]
    fn test_nested_path_has_single_label() {
        let leaf = Leaf {
            name: "a".into(),
            values: [("x".to_string(), 1.0)].into_iter().collect(),
        };
        let mut other_leaf = leaf.clone();
        other_leaf.values.insert("x".to_string(), 3.0);
        let left = Tree {
            name: "t".into(),
            leaves: [("a".to_string(), leaf)].into_iter().collect(),
        };
        let right = Tree {
            name: "t".into(),
            leaves: [("a".to_string(), other_leaf)].into_iter().collect(),
        };
        let mismatch = left.find_mismatch(&right).unwrap();
        assert_eq!(mismatch.path, "Tree(t).leaves[a].values[x]");
    }

    #[test]
    fn test_key_mismatch() {
        let left: BTreeMap<String, f64> = [("x".to_string(), 1.0)].into_iter().collect();
        let right: BTreeMap<String, f64> = [("y".to_string(), 1.0)].into_iter().collect();
        let mismatch = left.find_mismatch(&right).unwrap();
        assert!(mismatch.detail.contains("\"x\""));
        assert!(mismatch.to_string().starts_with("keys only in left"));
    }

    #[test]
    fn test_vec_length() {
        assert_eq!(
            vec![1.0].find_mismatch(&vec![1.0, 2.0]).unwrap().detail,
            "length 1 != 2"
        );
    }
}
