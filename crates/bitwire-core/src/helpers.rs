//! Arithmetic and collection helpers called from hand-written or generated
//! field codecs (array sizing, counts, padding checks).
//!
//! All helpers are pure. Misuse surfaces as [`HelperError`].

use std::any::Any;
use std::collections::VecDeque;
use std::fmt::Display;

use crate::buffer::LengthAware;
use crate::error::HelperError;

/// Total byte length of a sequence of sized messages.
///
/// # Examples
/// ```
/// use bitwire_core::buffer::LengthAware;
/// use bitwire_core::helpers::array_size_in_bytes;
///
/// struct Word;
/// impl LengthAware for Word {
///     fn length_in_bits(&self) -> usize {
///         16
///     }
/// }
///
/// assert_eq!(array_size_in_bytes(&[Word, Word, Word]), 6);
/// ```
pub fn array_size_in_bytes<M: LengthAware>(items: &[M]) -> usize {
    items.iter().map(LengthAware::length_in_bytes).sum()
}

/// Anything with a number of elements.
///
/// Implemented for slices, arrays, `Vec` and `VecDeque`, primitive element
/// types included, so a codec never has to special-case numeric arrays.
pub trait Countable {
    fn element_count(&self) -> usize;
}

impl<T> Countable for [T] {
    fn element_count(&self) -> usize {
        self.len()
    }
}

impl<T, const N: usize> Countable for [T; N] {
    fn element_count(&self) -> usize {
        N
    }
}

impl<T> Countable for Vec<T> {
    fn element_count(&self) -> usize {
        self.len()
    }
}

impl<T> Countable for VecDeque<T> {
    fn element_count(&self) -> usize {
        self.len()
    }
}

impl Countable for str {
    fn element_count(&self) -> usize {
        self.chars().count()
    }
}

/// Number of elements in a collection.
///
/// # Examples
/// ```
/// use bitwire_core::helpers::count;
///
/// assert_eq!(count(&[1u8, 2, 3][..]), 3);
/// assert_eq!(count(&vec![true, false]), 2);
/// ```
pub fn count<C: Countable + ?Sized>(collection: &C) -> usize {
    collection.element_count()
}

/// Character length of a value's display form.
pub fn str_len<T: Display + ?Sized>(value: &T) -> usize {
    value.to_string().chars().count()
}

/// Downcast a dynamically typed value, cloning it out.
///
/// # Examples
/// ```
/// use bitwire_core::helpers::cast;
///
/// let value: Box<dyn std::any::Any> = Box::new(7u16);
/// assert_eq!(cast::<u16>(value.as_ref()), Ok(7));
/// assert!(cast::<u32>(value.as_ref()).is_err());
/// ```
pub fn cast<T: Any + Clone>(value: &dyn Any) -> Result<T, HelperError> {
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or(HelperError::InvalidCast {
            expected: std::any::type_name::<T>(),
        })
}

/// Round up to the next integer.
pub fn ceil(value: f64) -> i64 {
    value.ceil() as i64
}

/// Integer division rounding up; `0` when the divisor is `0`.
pub fn ceil_div(value: usize, divisor: usize) -> usize {
    if divisor == 0 {
        return 0;
    }
    value.div_ceil(divisor)
}

/// `1` when another element follows `index` in a collection of `len`
/// elements, `0` for the last one. Used for separator/padding fields.
///
/// # Examples
/// ```
/// use bitwire_core::helpers::count_if_next;
///
/// assert_eq!(count_if_next(0, 3), Ok(1));
/// assert_eq!(count_if_next(2, 3), Ok(0));
/// assert!(count_if_next(3, 3).is_err());
/// ```
pub fn count_if_next(index: usize, len: usize) -> Result<usize, HelperError> {
    if index >= len {
        return Err(HelperError::IndexOutOfRange { index, len });
    }
    Ok(usize::from(index + 1 < len))
}
