//! fault
//!
//! Data-valued failures with cause chains.
//!
//! # Errors Are Data
//!
//! A single document can carry many independent problems: one bad
//! annotation must not hide the next one. Every failure in this crate is
//! therefore a [`Fault`] value that is *accumulated* rather than thrown.
//! Only the facade's validity assertion ([`Schema::ok`]) converts the
//! accumulated list into a fail-fast outcome.
//!
//! A fault carries a stable code, a lazily-formatted message, an optional
//! source descriptor and position, and an ordered chain of causes. The
//! chain is preserved verbatim so a rendering shows the full derivation,
//! e.g. `BadMetadata` → `BadMetadataForm` → `ReadObject` → `ReadField` →
//! `ReadIntRange`.
//!
//! [`Schema::ok`]: crate::schema::Schema::ok
//!
//! # Rendering
//!
//! `Display` renders `"[<CODE>] <file>:<line>:<col>: <message>"`, with any
//! absent location piece elided, followed by each cause on its own
//! `"  - "` line, nested causes indented a further level:
//!
//! ```text
//! [DocumentNotOk] bad.graphql: one or more errors on document
//!   - [ExtraSchema] bad.graphql:4:1: extra schema definition ignored
//! ```

use std::fmt;

use graphql_parser::Pos;
use thiserror::Error;

/// Every failure shape this crate produces.
///
/// The `Display` implementation derived here is the message formatter; it
/// runs only when a message is actually rendered.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FaultKind {
    /// A spec URL could not be parsed at all.
    #[error("could not parse spec url `{url}`")]
    BadSpecUrl { url: String },

    /// A spec URL has no name segment before its version segment.
    #[error("spec url does not specify a name: {url}")]
    NoName { url: String },

    /// A spec URL has no trailing version segment.
    #[error("spec url does not specify a version: {url}")]
    NoVersion { url: String },

    /// A version specifier is not of the form `1.2` or `v1.2`.
    #[error("could not parse version specifier `{input}`")]
    VersionParse { input: String },

    /// The external parser rejected the document source.
    #[error("could not parse document")]
    Parse,

    /// The document has no schema definition.
    #[error("document must contain a schema definition")]
    NoSchemas,

    /// The document has more than one schema definition; extras are
    /// ignored.
    #[error("extra schema definition ignored")]
    ExtraSchema,

    /// No annotation on the schema definition anchors the bootstrap spec.
    #[error("the first using declaration must reference the bootstrap spec itself")]
    NoCore,

    /// The bootstrap anchor declares a different spec identity.
    #[error("bootstrap declaration references `{identity}`, which is not the bootstrap spec")]
    NoCoreSpecIdentity { identity: String },

    /// An annotation sharing the bootstrap name failed to decode as a
    /// using request.
    #[error("could not read using declaration")]
    BadUsingRequest,

    /// Every candidate extractor failed to decode an annotation.
    #[error("could not read metadata")]
    BadMetadata,

    /// One candidate extractor failed to decode an annotation.
    #[error("could not read form `{name}`")]
    BadMetadataForm { name: String },

    /// A named field of an object shape failed to decode.
    #[error("could not read field `{name}`")]
    ReadField { name: String },

    /// An object shape failed to decode; causes hold the field failures.
    #[error("could not read object")]
    ReadObject,

    /// A list failed to decode; causes hold the element failures.
    #[error("could not read list")]
    ReadList,

    /// A numeric literal is not a finite number.
    #[error("expected a finite number, got `{repr}`")]
    ReadNaN { repr: String },

    /// An int literal does not fit the 32-bit int range.
    #[error("int `{repr}` out of range")]
    ReadIntRange { repr: String },

    /// A codec was handed a node kind it cannot read at all.
    #[error("expected {expected}")]
    BadReadNode { expected: &'static str },

    /// A non-null slot received null or nothing.
    #[error("non-null slot received null")]
    ExpectedValue,

    /// The validity assertion failed; causes hold every accumulated
    /// fault.
    #[error("one or more errors on document")]
    DocumentNotOk,

    /// A failure adopted from outside this crate (e.g. the external
    /// parser). Carries its own code; `UnknownError` when the origin has
    /// none.
    #[error("{message}")]
    Foreign { code: String, message: String },
}

impl FaultKind {
    /// The stable code string for this kind.
    pub fn code(&self) -> &str {
        match self {
            FaultKind::BadSpecUrl { .. } => "BadSpecUrl",
            FaultKind::NoName { .. } => "NoName",
            FaultKind::NoVersion { .. } => "NoVersion",
            FaultKind::VersionParse { .. } => "VersionParse",
            FaultKind::Parse => "ParseError",
            FaultKind::NoSchemas => "NoSchemas",
            FaultKind::ExtraSchema => "ExtraSchema",
            FaultKind::NoCore => "NoCore",
            FaultKind::NoCoreSpecIdentity { .. } => "NoCoreSpecIdentity",
            FaultKind::BadUsingRequest => "BadUsingRequest",
            FaultKind::BadMetadata => "BadMetadata",
            FaultKind::BadMetadataForm { .. } => "BadMetadataForm",
            FaultKind::ReadField { .. } => "ReadField",
            FaultKind::ReadObject => "ReadObject",
            FaultKind::ReadList => "ReadList",
            FaultKind::ReadNaN { .. } => "ReadNaN",
            FaultKind::ReadIntRange { .. } => "ReadIntRange",
            FaultKind::BadReadNode { .. } => "BadReadNode",
            FaultKind::ExpectedValue => "ExpectedValue",
            FaultKind::DocumentNotOk => "DocumentNotOk",
            FaultKind::Foreign { code, .. } => code,
        }
    }
}

/// A typed, causally-chained failure value.
///
/// Construct with [`Fault::new`] and refine with the builder methods:
///
/// ```
/// use specbind::fault::{Fault, FaultKind};
///
/// let fault = Fault::new(FaultKind::NoSchemas).with_source("empty.graphql");
/// assert_eq!(fault.code(), "NoSchemas");
/// assert_eq!(
///     fault.to_string(),
///     "[NoSchemas] empty.graphql: document must contain a schema definition",
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    kind: FaultKind,
    source: Option<String>,
    position: Option<Pos>,
    causes: Vec<Fault>,
}

impl Fault {
    /// Create a fault with no location and no causes.
    pub fn new(kind: FaultKind) -> Self {
        Fault {
            kind,
            source: None,
            position: None,
            causes: Vec::new(),
        }
    }

    /// Adopt a failure raised outside this crate as a fault value.
    pub fn adopt(origin: impl fmt::Display) -> Self {
        Fault::new(FaultKind::Foreign {
            code: "UnknownError".to_string(),
            message: origin.to_string(),
        })
    }

    /// Attach the position of the offending node.
    pub fn at(mut self, position: Pos) -> Self {
        self.position = Some(position);
        self
    }

    /// Attach the source descriptor (typically a file name).
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Append causes, preserving their order.
    pub fn caused_by(mut self, causes: impl IntoIterator<Item = Fault>) -> Self {
        self.causes.extend(causes);
        self
    }

    /// The stable code string.
    pub fn code(&self) -> &str {
        self.kind.code()
    }

    /// The failure shape.
    pub fn kind(&self) -> &FaultKind {
        &self.kind
    }

    /// The formatted message, without location or causes.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// The source descriptor, if one was stamped on.
    pub fn source_name(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The position of the offending node, if known.
    pub fn position(&self) -> Option<Pos> {
        self.position
    }

    /// The ordered cause chain.
    pub fn causes(&self) -> &[Fault] {
        &self.causes
    }

    /// `<file>:<line>:<col>` with absent pieces elided; `None` when there
    /// is no location information at all.
    pub fn location(&self) -> Option<String> {
        match (&self.source, self.position) {
            (Some(source), Some(pos)) => Some(format!("{}:{}:{}", source, pos.line, pos.column)),
            (Some(source), None) => Some(source.clone()),
            (None, Some(pos)) => Some(format!("{}:{}", pos.line, pos.column)),
            (None, None) => None,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location() {
            Some(location) => write!(f, "[{}] {}: {}", self.code(), location, self.kind)?,
            None => write!(f, "[{}] {}", self.code(), self.kind)?,
        }
        for cause in &self.causes {
            write!(f, "\n  - {}", cause.to_string().replace('\n', "\n    "))?;
        }
        Ok(())
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.causes
            .first()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// Partition results into `(faults, values)`, preserving the relative
/// order within each partition.
pub fn sift<T>(results: impl IntoIterator<Item = Result<T, Fault>>) -> (Vec<Fault>, Vec<T>) {
    let mut faults = Vec::new();
    let mut values = Vec::new();
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(fault) => faults.push(fault),
        }
    }
    (faults, values)
}
