#![forbid(unsafe_code)]

//! Position newtypes.
//!
//! Text is addressed three ways: by UTF-8 byte, by rune (`char`), and by
//! terminal column. Each gets its own type; conversions are explicit
//! (`.get()`).

use std::ops::{Add, AddAssign, Sub};

macro_rules! unit {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub usize);

        impl $name {
            /// The raw value.
            #[inline]
            pub const fn get(self) -> usize {
                self.0
            }
        }

        impl Add<usize> for $name {
            type Output = Self;
            #[inline]
            fn add(self, rhs: usize) -> Self {
                Self(self.0 + rhs)
            }
        }

        impl AddAssign<usize> for $name {
            #[inline]
            fn add_assign(&mut self, rhs: usize) {
                self.0 += rhs;
            }
        }

        impl Sub for $name {
            type Output = usize;
            #[inline]
            fn sub(self, rhs: Self) -> usize {
                self.0.saturating_sub(rhs.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

unit!(
    /// Offset into UTF-8 text, in bytes.
    ByteOffset
);
unit!(
    /// Index of a rune (`char`) within a string.
    RuneIndex
);
unit!(
    /// Terminal column, in cells.
    ScreenColumn
);
