//! Characters and strings.

use crate::gen::Gen;

use std::ops::RangeInclusive;

impl Gen<char> {
    /// Uniform over the code points in `range`. Surrogate code points are not
    /// `char`s; drawing one ends the run as `Filtered`.
    pub fn char_range(range: RangeInclusive<char>) -> Self {
        let (first, last) = range.into_inner();
        assert!(first <= last, "Gen::char_range: empty range {:?}..={:?}", first, last);
        Gen::uint(u64::from(u32::from(first))..=u64::from(u32::from(last)))
            .filter_map(|code| u32::try_from(code).ok().and_then(char::from_u32))
    }

    /// Any Unicode scalar value.
    pub fn any_char() -> Self {
        Gen::char_range('\0'..=char::MAX)
    }
}

impl Gen<String> {
    /// A length from `length`, then that many characters from `chars`.
    pub fn string(length: &Gen<usize>, chars: &Gen<char>) -> Self {
        let chars = chars.clone();
        length.flat_map(move |len| Gen::string_of_len(len, &chars))
    }

    pub fn string_of_len(len: usize, chars: &Gen<char>) -> Self {
        chars.repeat_n(len).map(|cs| cs.into_iter().collect())
    }

    /// Up to five arbitrary characters.
    pub fn small_string() -> Self {
        Gen::string(&Gen::size(0..=5), &Gen::any_char())
    }
}
