//! The `Store` abstraction: a uniform query interface over local,
//! remote, and in-memory package collections, plus package-array
//! filtering utilities the resolver builds on.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod flags;
pub mod id;
pub mod package_array;
pub mod store;

pub use error::{Error, Result};
pub use flags::ResolveFlags;
pub use id::package_id_hash;
pub use package_array::PackageArrayExt;
pub use store::{InMemoryStoreBase, LocalLoader, LocalStore, MetaStore, RemoteLoader, RemoteStore, Store};
