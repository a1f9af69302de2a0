//! Operators on mutable handles
//!
//! Compound assignment reads the current value (the type's default when
//! absent), applies the operation and writes the result back. The
//! read-modify-write is not atomic: two handles racing on the same key may
//! lose an update.
//!
//! Integer arithmetic is checked, for the operators and for
//! `increment`/`decrement` alike: an operation that would overflow or divide
//! by zero logs a warning and leaves the stored value unchanged.

use std::ops::{
    AddAssign, BitAndAssign, BitOrAssign, BitXorAssign, DivAssign, MulAssign, Not, RemAssign,
    SubAssign,
};

use crate::convert::PreferenceValue;
use crate::preference::{MutablePreference, ReadablePreference};

impl<T: PreferenceValue + Default> MutablePreference<T> {
    /// Write `op(current)`; a `None` result keeps the stored value
    fn checked_update(&self, name: &str, op: impl FnOnce(T) -> Option<T>) {
        match op(self.value().unwrap_or_default()) {
            Some(updated) => self.set(Some(updated)),
            None => tracing::warn!("{} on {} overflowed, value kept", name, self.key()),
        }
    }
}

macro_rules! integer_ops {
    ($($ty:ty),*) => {
        $(
            impl AddAssign<$ty> for MutablePreference<$ty> {
                fn add_assign(&mut self, rhs: $ty) {
                    self.checked_update("add", |v| v.checked_add(rhs));
                }
            }

            impl SubAssign<$ty> for MutablePreference<$ty> {
                fn sub_assign(&mut self, rhs: $ty) {
                    self.checked_update("sub", |v| v.checked_sub(rhs));
                }
            }

            impl MulAssign<$ty> for MutablePreference<$ty> {
                fn mul_assign(&mut self, rhs: $ty) {
                    self.checked_update("mul", |v| v.checked_mul(rhs));
                }
            }

            impl DivAssign<$ty> for MutablePreference<$ty> {
                fn div_assign(&mut self, rhs: $ty) {
                    self.checked_update("div", |v| v.checked_div(rhs));
                }
            }

            impl RemAssign<$ty> for MutablePreference<$ty> {
                fn rem_assign(&mut self, rhs: $ty) {
                    self.checked_update("rem", |v| v.checked_rem(rhs));
                }
            }

            impl BitAndAssign<$ty> for MutablePreference<$ty> {
                fn bitand_assign(&mut self, rhs: $ty) {
                    self.checked_update("bitand", |v| Some(v & rhs));
                }
            }

            impl BitOrAssign<$ty> for MutablePreference<$ty> {
                fn bitor_assign(&mut self, rhs: $ty) {
                    self.checked_update("bitor", |v| Some(v | rhs));
                }
            }

            impl BitXorAssign<$ty> for MutablePreference<$ty> {
                fn bitxor_assign(&mut self, rhs: $ty) {
                    self.checked_update("bitxor", |v| Some(v ^ rhs));
                }
            }

            impl MutablePreference<$ty> {
                /// Add one, starting from zero when absent
                pub fn increment(&self) {
                    self.checked_update("increment", |v| v.checked_add(1));
                }

                /// Subtract one, starting from zero when absent
                pub fn decrement(&self) {
                    self.checked_update("decrement", |v| v.checked_sub(1));
                }
            }
        )*
    };
}

integer_ops!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

macro_rules! float_ops {
    ($($ty:ty),*) => {
        $(
            impl AddAssign<$ty> for MutablePreference<$ty> {
                fn add_assign(&mut self, rhs: $ty) {
                    self.checked_update("add", |v| Some(v + rhs));
                }
            }

            impl SubAssign<$ty> for MutablePreference<$ty> {
                fn sub_assign(&mut self, rhs: $ty) {
                    self.checked_update("sub", |v| Some(v - rhs));
                }
            }

            impl MulAssign<$ty> for MutablePreference<$ty> {
                fn mul_assign(&mut self, rhs: $ty) {
                    self.checked_update("mul", |v| Some(v * rhs));
                }
            }

            impl DivAssign<$ty> for MutablePreference<$ty> {
                fn div_assign(&mut self, rhs: $ty) {
                    self.checked_update("div", |v| Some(v / rhs));
                }
            }

            impl RemAssign<$ty> for MutablePreference<$ty> {
                fn rem_assign(&mut self, rhs: $ty) {
                    self.checked_update("rem", |v| Some(v % rhs));
                }
            }
        )*
    };
}

float_ops!(f32, f64);

/// Values that can be extended in place
pub trait Appendable {
    /// Append `other` to `self`
    fn append_value(&mut self, other: Self);
}

impl Appendable for String {
    fn append_value(&mut self, other: Self) {
        self.push_str(&other);
    }
}

impl<T> Appendable for Vec<T> {
    fn append_value(&mut self, mut other: Self) {
        self.append(&mut other);
    }
}

impl<T: PreferenceValue> MutablePreference<T> {
    /// Whether the current value equals `expected`
    pub fn matches(&self, expected: &T) -> bool
    where
        T: PartialEq,
    {
        self.value().as_ref() == Some(expected)
    }

    /// Whether the current value lies in `range`
    pub fn in_range<R>(&self, range: R) -> bool
    where
        T: PartialOrd,
        R: std::ops::RangeBounds<T>,
    {
        self.value().is_some_and(|v| range.contains(&v))
    }

    /// Append to the current value, starting from the default when absent
    pub fn append(&self, other: T)
    where
        T: Appendable + Default,
    {
        let mut current = self.value().unwrap_or_default();
        current.append_value(other);
        self.set(Some(current));
    }

    /// Replace the value by its complement; absent reads as the default
    pub fn invert_bits(&self)
    where
        T: Default + Not<Output = T>,
    {
        self.set(Some(!self.value().unwrap_or_default()));
    }
}

impl MutablePreference<bool> {
    /// Logical and with `rhs`; absent reads as `false`
    pub fn and_assign(&self, rhs: bool) {
        self.set(Some(self.value().unwrap_or_default() && rhs));
    }

    /// Logical or with `rhs`; absent reads as `false`
    pub fn or_assign(&self, rhs: bool) {
        self.set(Some(self.value().unwrap_or_default() || rhs));
    }

    /// Store the negation of the current value; absent reads as `false`
    pub fn assign_not(&self) {
        self.set(Some(!self.value().unwrap_or_default()));
    }

    /// Logical and of two flags, either of which may live in another backend
    pub fn and<R: ReadablePreference<bool>>(&self, other: &R) -> bool {
        self.value().unwrap_or_default() && other.value().unwrap_or_default()
    }

    /// Logical or of two flags
    pub fn or<R: ReadablePreference<bool>>(&self, other: &R) -> bool {
        self.value().unwrap_or_default() || other.value().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Preferences;
    use crate::dictionary::MutableDictionaryPreferences;
    use crate::preference::MutablePreferenceHandles;
    use crate::value::RawValue;
    use std::sync::Arc;

    fn backend() -> Arc<MutableDictionaryPreferences> {
        Arc::new(MutableDictionaryPreferences::new())
    }

    #[test]
    fn test_add_assign_from_absent() {
        let prefs = backend();
        let mut counter: MutablePreference<i64> = prefs.mutable_preference("counter");

        counter += 1;
        counter += 1;
        assert_eq!(counter.value(), Some(2));
        assert_eq!(prefs.get("counter"), Some(RawValue::Integer(2)));
    }

    #[test]
    fn test_arithmetic_assign() {
        let prefs = backend();
        let mut n: MutablePreference<i64> = prefs.mutable_preference("n");
        n.set_value(10);

        n -= 4;
        n *= 3;
        n /= 2;
        n %= 5;
        assert_eq!(n.value(), Some(4));

        let mut ratio: MutablePreference<f64> = prefs.mutable_preference("ratio");
        ratio += 0.5;
        ratio *= 3.0;
        assert_eq!(ratio.value(), Some(1.5));
    }

    #[test]
    fn test_bit_assign() {
        let prefs = backend();
        let mut mask: MutablePreference<u8> = prefs.mutable_preference("mask");

        mask |= 0b1010;
        mask &= 0b0110;
        mask ^= 0b0001;
        assert_eq!(mask.value(), Some(0b0011));

        mask.invert_bits();
        assert_eq!(mask.value(), Some(0b1111_1100));
    }

    #[test]
    fn test_increment_decrement() {
        let prefs = backend();
        let launches: MutablePreference<u32> = prefs.mutable_preference("launches");

        launches.increment();
        launches.increment();
        launches.decrement();
        assert_eq!(launches.value(), Some(1));
    }

    #[test]
    fn test_overflow_keeps_value() {
        let prefs = backend();
        let mut remaining: MutablePreference<u32> = prefs.mutable_preference("remaining");

        remaining.decrement();
        assert_eq!(remaining.value(), None);

        remaining -= 1;
        assert_eq!(remaining.value(), None);

        let mut small: MutablePreference<u8> = prefs.mutable_preference("small");
        small.set_value(250);
        small += 10;
        small.increment();
        assert_eq!(small.value(), Some(251));

        small /= 0;
        assert_eq!(small.value(), Some(251));
    }

    #[test]
    fn test_bool_ops() {
        let prefs = backend();
        let flag: MutablePreference<bool> = prefs.mutable_preference("flag");

        flag.or_assign(true);
        assert_eq!(flag.value(), Some(true));
        flag.and_assign(false);
        assert_eq!(flag.value(), Some(false));
        flag.assign_not();
        assert_eq!(flag.value(), Some(true));

        let other: MutablePreference<bool> = backend().mutable_preference("other");
        assert!(!flag.and(&other));
        assert!(flag.or(&other));
    }

    #[test]
    fn test_append() {
        let prefs = backend();
        let log: MutablePreference<String> = prefs.mutable_preference("log");
        log.append("a".to_string());
        log.append("b".to_string());
        assert_eq!(log.value(), Some("ab".to_string()));

        let recent: MutablePreference<Vec<String>> = prefs.mutable_preference("recent");
        recent.append(vec!["one".to_string()]);
        recent.append(vec!["two".to_string()]);
        assert_eq!(recent.value(), Some(vec!["one".to_string(), "two".to_string()]));
    }

    #[test]
    fn test_matches_and_range() {
        let prefs = backend();
        let level: MutablePreference<i64> = prefs.mutable_preference("level");
        assert!(!level.matches(&0));
        assert!(!level.in_range(0..10));

        level.set_value(3);
        assert!(level.matches(&3));
        assert!(level.in_range(0..10));
        assert!(!level.in_range(4..=10));
    }
}
