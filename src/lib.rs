#![doc = include_str!("../README.md")]

#![no_std]

#![warn(
    anonymous_parameters,
    missing_copy_implementations,
    missing_debug_implementations,
    nonstandard_style,
    rust_2018_idioms,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_qualifications,
    variant_size_differences
)]

extern crate alloc;

pub mod grid;
pub mod map;
pub mod queue;
pub mod record;

pub use grid::{Grid, Neighborhood};
pub use map::{Iter, Matches, Tag, TagMap};
pub use queue::Fifo;
pub use record::{Record, Row};
