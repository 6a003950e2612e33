//! Core types for PageVault.

mod ids;

pub use ids::{Epoch, PageId};
