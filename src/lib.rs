//! Specbind - metadata extraction and schema bootstrapping for versioned,
//! directive-annotated schema documents.
//!
//! Independent, URL-identified specifications attach typed, validated
//! metadata to the nodes of a parsed schema document through annotations
//! ("directives"). Which specification a given annotation name refers to
//! is resolved through a self-describing bootstrap protocol embedded in
//! the document itself: a well-known first annotation declares the specs
//! the document uses and the local aliases they go by.
//!
//! # Architecture
//!
//! The crate is layered leaf-first:
//!
//! - [`version`] - Version numbers and the compatibility rule
//! - [`spec`] - Spec identity parsed from spec URLs
//! - [`data`] - Extrinsic data store: memoized side channels on nodes
//! - [`fault`] - Data-valued failures with cause chains
//! - [`ast`] - The external parser's node surface
//! - [`metadata`] - Typed metadata codecs (slots) over raw value trees
//! - [`layer`] - Directive binding: registered extractors applied in one
//!   traversal
//! - [`schema`] - The document facade: parse, bootstrap, attach, assert
//! - [`specs`] - Specifications shipped with the crate (the bootstrap
//!   spec)
//!
//! # Correctness Invariants
//!
//! 1. Faults are accumulated, never thrown; only [`Schema::ok`] fails
//!    fast, wrapping everything accumulated
//! 2. Memoized views compute at most once per document and never mutate
//!    the node tree
//! 3. Extractor dispatch order is registration order, deterministic and
//!    caller-visible
//! 4. No metadata is trusted before the document's bootstrap anchor is
//!    resolved
//!
//! [`Schema::ok`]: crate::schema::Schema::ok

pub mod ast;
pub mod data;
pub mod fault;
pub mod layer;
pub mod metadata;
pub mod schema;
pub mod spec;
pub mod specs;
pub mod version;

pub use fault::{sift, Fault, FaultKind};
pub use layer::{Binding, Extract, Extractor, Layer, LayerVisitor, Repetition};
pub use metadata::{obj, Metadata, ObjectShape, RawNode, Slot, SlotExt};
pub use schema::{Schema, SchemaDef, Source, Valid};
pub use spec::Spec;
pub use version::Version;
