//! Backing-file I/O for PageVault.
//!
//! The store owns exactly one file and drives it through [`StoreFile`], a
//! thin positioned-I/O adapter: absolute-offset reads and writes, fsync,
//! and length management. Durability reasoning in the store core relies on
//! two properties of this adapter: a write is *not* durable until
//! [`StoreFile::sync`] returns, and `sync` orders all prior writes before
//! any later one.

mod store_file;

pub use store_file::StoreFile;
