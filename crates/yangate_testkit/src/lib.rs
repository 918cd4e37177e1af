//! # Yangate Testkit
//!
//! Shared test utilities for the yangate crates:
//! - canned schema modules and registries
//! - tree builders for terse fixture construction
//! - temp-dir and in-memory engines with automatic cleanup
//! - sample encoded payloads
//! - property-based generators for trees and values
//!
//! ## Usage
//!
//! ```rust,ignore
//! use yangate_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_engine() {
//!     with_temp_engine(|engine| {
//!         engine.commit(CommitRequest::merge(interfaces_tree())).unwrap();
//!     });
//! }
//! ```

pub mod builders;
pub mod fixtures;
pub mod generators;
pub mod payloads;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::builders::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::payloads::*;
}

pub use builders::*;
pub use fixtures::*;
pub use generators::*;
pub use payloads::*;
