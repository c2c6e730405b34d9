//! Key extraction and ordering for [`RbTree`](crate::RbTree).
//!
//! A tree is parameterised by two pure functions supplied at construction time:
//! a [`KeyOf`] that maps a stored entry to its ordering key, and a [`Compare`]
//! that imposes a strict weak order on those keys. Both must stay consistent for
//! the lifetime of the tree.

/// Maps a stored entry to the key it is ordered by.
///
/// # Examples
///
/// ```
/// use ordtree::compare::KeyOf;
///
/// struct Id;
///
/// struct Account {
///     id: u64,
///     owner: &'static str,
/// }
///
/// impl KeyOf<Account> for Id {
///     type Key = u64;
///
///     fn key<'a>(&self, entry: &'a Account) -> &'a u64 {
///         &entry.id
///     }
/// }
///
/// let account = Account { id: 7, owner: "ada" };
/// assert_eq!(*Id.key(&account), 7);
/// ```
pub trait KeyOf<T> {
    /// The key type entries are ordered by.
    type Key: ?Sized;

    /// Returns the key of `entry`.
    fn key<'a>(&self, entry: &'a T) -> &'a Self::Key;
}

/// A strict weak order on keys.
///
/// `less(a, b)` must be irreflexive and transitive, and incomparability must be
/// transitive. Keys `a` and `b` are *equivalent* when neither is less than the other.
///
/// Any `Fn(&K, &K) -> bool` closure is a comparator.
///
/// # Examples
///
/// ```
/// use ordtree::compare::{Compare, Greater, Less};
///
/// assert!(Less.less(&1, &2));
/// assert!(Greater.less(&2, &1));
///
/// let by_len = |a: &&str, b: &&str| a.len() < b.len();
/// assert!(by_len.less(&"ab", &"abc"));
/// ```
pub trait Compare<K: ?Sized> {
    /// Returns `true` if `a` is ordered strictly before `b`.
    fn less(&self, a: &K, b: &K) -> bool;
}

/// Uses the entry itself as its key, for set-like trees.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Identity;

impl<T> KeyOf<T> for Identity {
    type Key = T;

    #[inline]
    fn key<'a>(&self, entry: &'a T) -> &'a T {
        entry
    }
}

/// Uses the first field of a `(key, value)` pair as its key, for map-like trees.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct First;

impl<K, V> KeyOf<(K, V)> for First {
    type Key = K;

    #[inline]
    fn key<'a>(&self, entry: &'a (K, V)) -> &'a K {
        &entry.0
    }
}

/// Ascending order by [`Ord`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Less;

impl<K: ?Sized + Ord> Compare<K> for Less {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        a < b
    }
}

/// Descending order by [`Ord`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Greater;

impl<K: ?Sized + Ord> Compare<K> for Greater {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        a > b
    }
}

impl<K: ?Sized, F> Compare<K> for F
where
    F: Fn(&K, &K) -> bool,
{
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        self(a, b)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn identity_and_first() {
        assert_eq!(*Identity.key(&5), 5);
        assert_eq!(*First.key(&("k", 1)), "k");
    }

    #[test]
    fn less_and_greater_are_strict() {
        assert!(Less.less(&1, &2));
        assert!(!Less.less(&2, &2));
        assert!(Greater.less(&3, &2));
        assert!(!Greater.less(&2, &2));
        assert!(Less.less("abc", "abd"));
    }

    #[test]
    fn closures_compare() {
        let by_abs = |a: &i32, b: &i32| a.abs() < b.abs();
        assert!(by_abs.less(&1, &-2));
        assert!(!by_abs.less(&-2, &2));
    }
}
