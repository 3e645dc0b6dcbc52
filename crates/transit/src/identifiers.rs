//! Type-safe indices into the master index tables.
//!
//! Shapes, routes and headsigns are keyed by dense integers assigned when the
//! binary file is encoded. The indices are only meaningful for the file that
//! produced them.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! impl_index {
    ($name:ident, $repr:ty) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($repr);

        impl $name {
            pub const fn new(value: $repr) -> Self {
                Self(value)
            }

            pub const fn get(self) -> $repr {
                self.0
            }

            /// Position in the backing table.
            pub const fn as_usize(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$repr> for $name {
            fn from(value: $repr) -> Self {
                Self(value)
            }
        }
    };
}

impl_index!(ShapeIndex, u32);
impl_index!(RouteIndex, u16);
impl_index!(HeadsignIndex, u16);
