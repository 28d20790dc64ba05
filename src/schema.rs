//! schema
//!
//! The document facade: parsing, schema location, bootstrap, directive
//! binding, and error collection.
//!
//! # Lifecycle
//!
//! A [`Schema`] advances `Unparsed → Parsed → SchemaLocated →
//! Bootstrapped → (Valid | Invalid)` lazily: each state is entered the
//! first time a memoized view is read, never by an explicit call.
//! [`Schema::parse`] itself does no work.
//!
//! Faults found along the way are accumulated on the document, never
//! thrown, so one pass surfaces every independent problem. Only
//! [`Schema::ok`] converts the accumulated list into a fail-fast
//! `DocumentNotOk`.
//!
//! # Bootstrap
//!
//! The bootstrap is two-phase because the bootstrap annotation's name is
//! not known up front; it is what is being discovered:
//!
//! 1. every schema-definition annotation carrying a `using` argument is
//!    decoded against the bootstrap shape, regardless of its name; the
//!    *anchor* is the first success whose literal name equals its own
//!    declared alias (default: the bootstrap spec's canonical name), and
//!    its identity must be the bootstrap spec's exactly;
//! 2. annotations sharing the anchor's literal name are the document's
//!    using requests. Failed decodes are `BadUsingRequest` faults;
//!    successful decodes are accepted when their own effective alias
//!    matches that name, and excluded otherwise.
//!
//! # Example
//!
//! ```
//! use specbind::schema::Schema;
//! use specbind::specs::core;
//!
//! let schema = Schema::parse(
//!     r#"
//!     schema @core(using: "https://lib.specbind.dev/core/v0.1") { query: Query }
//!     type Query { value: Int }
//!     "#,
//! );
//! schema.attach([core::layer()])?;
//! let valid = schema.ok()?;
//! assert_eq!(valid.using()?.len(), 1);
//! assert_eq!(valid.find(core::using()).len(), 1);
//! # Ok::<(), specbind::fault::Fault>(())
//! ```

use std::ops::Deref;
use std::rc::Rc;
use std::sync::LazyLock;

use crate::ast::{self, Definition, Directive, Document, Pos, SchemaDefinition};
use crate::data::{AnyTarget, Data, Extrinsics, Memo, TargetId};
use crate::fault::{Fault, FaultKind};
use crate::layer::{Binding, Extract, Layer};
use crate::metadata::{obj, Metadata, RawNode, Slot};
use crate::spec::Spec;
use crate::specs::core::{self, Using};

/// Schema source text with an optional descriptor (typically a file
/// name) used in fault locations.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub text: String,
    pub name: Option<String>,
}

impl Source {
    /// Anonymous source text.
    pub fn new(text: impl Into<String>) -> Self {
        Source {
            text: text.into(),
            name: None,
        }
    }

    /// Source text with a descriptor.
    pub fn named(text: impl Into<String>, name: impl Into<String>) -> Self {
        Source {
            text: text.into(),
            name: Some(name.into()),
        }
    }
}

type ParseResult = Result<Rc<Document>, Fault>;

/// Document source parsed once on first access.
static DOCUMENT: LazyLock<Memo<ParseResult, Source>> =
    LazyLock::new(|| Data::declare("document node").or_else(parse_document));

/// The source descriptor, stamped on the parsed document.
static SOURCE_NAME: LazyLock<Data<Option<String>, Document>> =
    LazyLock::new(|| Data::declare("document source"));

/// The bootstrap spec this document must anchor to.
static BOOTSTRAP: LazyLock<Data<Spec, Document>> =
    LazyLock::new(|| Data::declare("bootstrap spec for document"));

/// Faults on each node; the document's own entry accumulates every
/// fault.
static ERRORS: LazyLock<Data<Vec<Fault>, AnyTarget>> =
    LazyLock::new(|| Data::declare("faults on each node"));

/// Index of the schema definition within the document's definitions.
static SCHEMA_DEF: LazyLock<Memo<Option<usize>, Document>> =
    LazyLock::new(|| Data::declare("the schema definition node").or_else(locate_schema));

/// Specs in use by this document.
static USING: LazyLock<Memo<Vec<Using>, Document>> =
    LazyLock::new(|| Data::declare("specs in use by this document").or_else(resolve_using));

fn parse_document(store: &Extrinsics, source: &Source) -> ParseResult {
    match ast::parse(&source.text) {
        Ok(document) => {
            let document = Rc::new(document);
            SOURCE_NAME.set(store, &document, source.name.clone());
            Ok(document)
        }
        Err(origin) => {
            let fault = Fault::new(FaultKind::Parse).caused_by([Fault::adopt(origin)]);
            Err(match &source.name {
                Some(name) => fault.with_source(name.clone()),
                None => fault,
            })
        }
    }
}

/// Stamp the document's source descriptor onto a fault.
fn stamp(store: &Extrinsics, doc: &Document, fault: Fault) -> Fault {
    match SOURCE_NAME.get(store, doc).flatten() {
        Some(name) => fault.with_source(name),
        None => fault,
    }
}

fn push_fault_at(store: &Extrinsics, target: TargetId, fault: Fault) {
    ERRORS.set_if_vacant_at(store, target, Vec::new());
    ERRORS.update_at(store, target, |faults| faults.push(fault));
}

/// Record a fault on the document, stamped with its source descriptor;
/// `node` additionally receives a copy on its own list.
fn report(store: &Extrinsics, doc: &Document, fault: Fault, node: Option<TargetId>) {
    let fault = stamp(store, doc, fault);
    if let Some(node) = node {
        push_fault_at(store, node, fault.clone());
    }
    push_fault_at(store, TargetId::of(doc), fault);
}

fn locate_schema(store: &Extrinsics, doc: &Document) -> Option<usize> {
    let mut found = None;
    for (index, definition) in doc.definitions.iter().enumerate() {
        if let Definition::SchemaDefinition(schema) = definition {
            if found.is_none() {
                found = Some(index);
                continue;
            }
            // Extras are ignored, not merged; the fault lands on both
            // the document and the offending definition.
            report(
                store,
                doc,
                Fault::new(FaultKind::ExtraSchema).at(schema.position),
                Some(TargetId::of(schema)),
            );
        }
    }
    if found.is_none() {
        report(store, doc, Fault::new(FaultKind::NoSchemas), None);
    }
    found
}

fn schema_definition_at(doc: &Document, index: usize) -> Option<&SchemaDefinition> {
    match doc.definitions.get(index) {
        Some(Definition::SchemaDefinition(schema)) => Some(schema),
        _ => None,
    }
}

fn resolve_using(store: &Extrinsics, doc: &Document) -> Vec<Using> {
    let Some(schema) = SCHEMA_DEF
        .get(store, doc)
        .and_then(|index| schema_definition_at(doc, index))
    else {
        return Vec::new();
    };
    let bootstrap = BOOTSTRAP
        .get(store, doc)
        .unwrap_or_else(|| core::spec().clone());

    // Phase 1: decode everything with a `using` argument against the
    // bootstrap shape. Names are ignored; the name is what is being
    // discovered.
    let bootstrap_shape = obj::<Using>();
    let candidates: Vec<(&Directive, Result<Using, Fault>)> = schema
        .directives
        .iter()
        .filter(|directive| Metadata::of_directive(directive).contains("using"))
        .map(|directive| {
            (
                directive,
                bootstrap_shape.deserialize(Some(RawNode::Directive(directive))),
            )
        })
        .collect();

    let anchor = candidates.iter().find(|(directive, result)| match result {
        Ok(using) => {
            directive.name == *using.alias.as_deref().unwrap_or_else(|| bootstrap.name())
        }
        Err(_) => false,
    });
    let Some((anchor_directive, Ok(anchor_using))) = anchor else {
        report(
            store,
            doc,
            Fault::new(FaultKind::NoCore).at(schema.position),
            Some(TargetId::of(schema)),
        );
        return Vec::new();
    };
    if anchor_using.using.identity() != bootstrap.identity() {
        report(
            store,
            doc,
            Fault::new(FaultKind::NoCoreSpecIdentity {
                identity: anchor_using.using.identity().to_string(),
            })
            .at(anchor_directive.position),
            None,
        );
        return Vec::new();
    }

    // Phase 2: with the anchor's literal name known, every annotation
    // sharing it is a using request.
    let mut accepted = Vec::new();
    for (directive, result) in &candidates {
        if directive.name != anchor_directive.name {
            continue;
        }
        match result {
            Err(cause) => report(
                store,
                doc,
                Fault::new(FaultKind::BadUsingRequest)
                    .at(directive.position)
                    .caused_by([cause.clone()]),
                None,
            ),
            Ok(using) if using.local_name() == directive.name => accepted.push(using.clone()),
            // A request whose declared alias is not the name it appears
            // under is not a request for this document.
            Ok(_) => {}
        }
    }
    accepted
}

/// A schema document and everything this crate derives from it.
///
/// All derived views are memoized in the document-scoped extrinsic
/// store; the facade is cheap to construct and does no parsing until a
/// view is read.
#[derive(Debug)]
pub struct Schema {
    source: Source,
    bootstrap: Spec,
    store: Extrinsics,
}

impl Schema {
    /// Wrap source text. No parsing happens yet.
    pub fn new(source: Source) -> Self {
        Schema {
            source,
            bootstrap: core::spec().clone(),
            store: Extrinsics::new(),
        }
    }

    /// Wrap anonymous source text.
    pub fn parse(text: impl Into<String>) -> Self {
        Self::new(Source::new(text))
    }

    /// Wrap source text with a descriptor for fault locations.
    pub fn parse_named(text: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Source::named(text, name))
    }

    /// Designate the bootstrap spec this document must anchor to.
    /// Defaults to [`core::spec`].
    pub fn with_core(mut self, spec: Spec) -> Self {
        self.bootstrap = spec;
        self
    }

    /// The source this schema was constructed from.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The document-scoped extrinsic store.
    pub fn extrinsics(&self) -> &Extrinsics {
        &self.store
    }

    /// The parsed document. Parsing happens on first access; the result
    /// (including failure) is memoized.
    pub fn document(&self) -> Result<Rc<Document>, Fault> {
        let parsed = DOCUMENT.get(&self.store, &self.source);
        if let Ok(doc) = &parsed {
            BOOTSTRAP.set_if_vacant(&self.store, doc, self.bootstrap.clone());
        }
        parsed
    }

    /// The single schema definition, if the document has one. Scans on
    /// first access, recording `NoSchemas` or `ExtraSchema` faults.
    pub fn schema_definition(&self) -> Result<Option<SchemaDef>, Fault> {
        let doc = self.document()?;
        Ok(SCHEMA_DEF.get(&self.store, &doc).map(|index| SchemaDef {
            document: Rc::clone(&doc),
            index,
        }))
    }

    /// The document's resolved using requests, bootstrapping on first
    /// access.
    pub fn using(&self) -> Result<Vec<Using>, Fault> {
        let doc = self.document()?;
        Ok(USING.get(&self.store, &doc))
    }

    /// Every fault accumulated on the document so far. An unparsable
    /// document yields its parse fault.
    ///
    /// This reads the current list; it does not advance the lifecycle.
    pub fn errors(&self) -> Vec<Fault> {
        match self.document() {
            Ok(doc) => ERRORS
                .get_at(&self.store, TargetId::of(&*doc))
                .unwrap_or_default(),
            Err(fault) => vec![fault],
        }
    }

    /// The faults recorded on one node.
    pub fn errors_at(&self, node: TargetId) -> Vec<Fault> {
        ERRORS.get_at(&self.store, node).unwrap_or_default()
    }

    /// Record a fault on the document, stamped with the source
    /// descriptor.
    pub fn report(&self, fault: Fault) {
        if let Ok(doc) = self.document() {
            report(&self.store, &doc, fault, None);
        }
    }

    /// Bind directives: one traversal of every annotation/host pair,
    /// applying each layer under each resolved using request. Faults are
    /// accumulated on the document.
    ///
    /// # Errors
    ///
    /// Fails only when the document itself cannot be parsed.
    pub fn attach<'l>(
        &self,
        layers: impl IntoIterator<Item = &'l Layer>,
    ) -> Result<&Self, Fault> {
        let doc = self.document()?;
        let using = self.using()?;
        let visitors: Vec<_> = layers
            .into_iter()
            .flat_map(|layer| using.iter().filter_map(|request| layer.visitor(request)))
            .collect();
        if visitors.is_empty() {
            return Ok(self);
        }
        ast::each_annotation(&doc, |directive, host| {
            for visitor in &visitors {
                visitor.visit(&self.store, &doc, directive, &host, &mut |fault| {
                    report(&self.store, &doc, fault, None)
                });
            }
        });
        Ok(self)
    }

    /// Every recorded binding for `extract` in this document, in
    /// insertion order.
    pub fn find<S: Slot>(&self, extract: &Extract<S>) -> Vec<Binding<S::Value>>
    where
        S::Value: Clone + 'static,
    {
        match self.document() {
            Ok(doc) => extract.bindings_at(&self.store, TargetId::of(&*doc)),
            Err(_) => Vec::new(),
        }
    }

    /// The column `extract` recorded on `node` (located by identity).
    pub fn read<S: Slot, T>(&self, extract: &Extract<S>, node: &T) -> Vec<S::Value>
    where
        S::Value: Clone + 'static,
    {
        extract.column_at(&self.store, TargetId::of(node))
    }

    /// The singular column value `extract` recorded on `node`.
    pub fn read_one<S: Slot, T>(&self, extract: &Extract<S>, node: &T) -> Option<S::Value>
    where
        S::Value: Clone + 'static,
    {
        self.read(extract, node).pop()
    }

    /// Assert validity: force the bootstrap, then fail with a
    /// `DocumentNotOk` fault wrapping every accumulated fault if any
    /// were recorded.
    pub fn ok(&self) -> Result<Valid<'_>, Fault> {
        let not_ok = |causes: Vec<Fault>| {
            let fault = Fault::new(FaultKind::DocumentNotOk).caused_by(causes);
            match &self.source.name {
                Some(name) => fault.with_source(name.clone()),
                None => fault,
            }
        };

        let doc = match self.document() {
            Ok(doc) => doc,
            Err(fault) => return Err(not_ok(vec![fault])),
        };
        USING.get(&self.store, &doc);
        let errors = self.errors();
        if !errors.is_empty() {
            return Err(not_ok(errors));
        }
        match SCHEMA_DEF.get(&self.store, &doc) {
            Some(index) => Ok(Valid {
                schema: self,
                definition: SchemaDef {
                    document: doc,
                    index,
                },
            }),
            // Unreachable in practice: a missing schema definition
            // records a NoSchemas fault.
            None => Err(not_ok(Vec::new())),
        }
    }
}

/// A handle on the document's schema definition node.
#[derive(Debug, Clone)]
pub struct SchemaDef {
    document: Rc<Document>,
    index: usize,
}

impl SchemaDef {
    /// The schema definition node itself.
    pub fn node(&self) -> &SchemaDefinition {
        match &self.document.definitions[self.index] {
            Definition::SchemaDefinition(schema) => schema,
            _ => unreachable!("schema definition index is derived from this document"),
        }
    }

    /// The definition's source position.
    pub fn position(&self) -> Pos {
        self.node().position
    }

    /// The node's identity, for extrinsic attachment.
    pub fn target_id(&self) -> TargetId {
        TargetId::of(self.node())
    }
}

/// A [`Schema`] that passed [`Schema::ok`]: its schema definition is
/// present and unique, and no faults were accumulated at validation
/// time.
#[derive(Debug)]
pub struct Valid<'a> {
    schema: &'a Schema,
    definition: SchemaDef,
}

impl Valid<'_> {
    /// The guaranteed schema definition.
    pub fn definition(&self) -> &SchemaDef {
        &self.definition
    }
}

impl Deref for Valid<'_> {
    type Target = Schema;

    fn deref(&self) -> &Schema {
        self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORE_SCHEMA: &str = r#"
        schema @core(using: "https://lib.specbind.dev/core/v0.1") { query: Query }
        type Query { value: Int }
    "#;

    #[test]
    fn documents_parse_once_and_memoize() {
        let schema = Schema::parse(CORE_SCHEMA);
        let first = schema.document().unwrap();
        let second = schema.document().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn parse_failures_memoize_too() {
        let schema = Schema::parse_named("schema {", "broken.graphql");
        let first = schema.document().unwrap_err();
        let second = schema.document().unwrap_err();
        assert_eq!(first, second);
        assert_eq!(first.code(), "ParseError");
        assert_eq!(first.source_name(), Some("broken.graphql"));
        assert_eq!(first.causes().len(), 1);
    }

    #[test]
    fn schema_definition_is_located_once() {
        let schema = Schema::parse(CORE_SCHEMA);
        let def = schema.schema_definition().unwrap().unwrap();
        assert_eq!(def.node().directives.len(), 1);
        assert!(schema.errors().is_empty());
    }

    #[test]
    fn ok_narrows_to_a_valid_schema() {
        let schema = Schema::parse(CORE_SCHEMA);
        let valid = schema.ok().unwrap();
        assert_eq!(valid.definition().node().directives.len(), 1);
        // The Deref view reaches the underlying facade.
        assert_eq!(valid.using().unwrap().len(), 1);
    }

    #[test]
    fn reported_faults_are_stamped_with_the_source() {
        let schema = Schema::parse_named(CORE_SCHEMA, "doc.graphql");
        schema.report(Fault::new(FaultKind::BadMetadata));
        let errors = schema.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].source_name(), Some("doc.graphql"));
    }
}
