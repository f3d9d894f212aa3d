//! xcresult bundle → Allure report conversion core.
//!
//! Pipeline, leaf first:
//!
//! 1. [`resolver::Resolver`] fetches documents through a [`source::DocumentSource`]
//!    and caches decoded records by identifier.
//! 2. [`walker::GraphWalker`] follows child references depth first and
//!    materializes a [`tree::ResolvedTree`].
//! 3. [`projector::project`] maps the tree onto Allure containers, results,
//!    steps and attachments.
//!
//! [`convert`] runs all three. The crate performs no filesystem or process I/O.

pub mod convert;
pub mod directives;
pub mod fixture;
pub mod identity;
pub mod media;
pub mod projector;
pub mod resolver;
pub mod source;
pub mod status;
pub mod timing;
pub mod tree;
pub mod walker;

pub use convert::{convert, convert_with_stats};
pub use projector::project;
pub use resolver::{Resolver, ResolverStats};
pub use source::{DocumentSource, MemorySource};
pub use tree::ResolvedTree;
pub use walker::GraphWalker;
