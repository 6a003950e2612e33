//! # pagevault-common
//!
//! Common types and constants for PageVault.
//!
//! This crate provides the foundational pieces shared by the PageVault
//! storage crates:
//!
//! - **Types**: the [`PageId`](types::PageId) and [`Epoch`](types::Epoch)
//!   identifier newtypes
//! - **Constants**: on-disk format constants (magic bytes, header layout
//!   sizes, reserved page counts)
//!
//! ## Example
//!
//! ```rust
//! use pagevault_common::types::{Epoch, PageId};
//!
//! let page = PageId::new(42);
//! assert_eq!(page.as_u32(), 42);
//! assert!(Epoch::ZERO < Epoch::new(1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{Epoch, PageId};
