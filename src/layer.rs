//! layer
//!
//! The directive binding layer: registering a spec's extractors and
//! applying them during a single document traversal.
//!
//! # Dispatch
//!
//! A [`Layer`] groups extractors by spec identity. For each resolved
//! using request, [`Layer::visitor`] filters to extractors whose spec
//! version satisfies the request and indexes them under two names: the
//! qualified `"<local>__<extractor>"` form and the bare local alias.
//!
//! Dispatch is by shape, in registration order: the first extractor
//! whose decode succeeds wins and recording stops there. The order is a
//! first-class part of the contract; several specs may claim the same
//! bare annotation name, and whichever matches shape first is
//! authoritative. When every candidate fails, the visitor reports one
//! `BadMetadata` fault wrapping each candidate's `BadMetadataForm`
//! failure.
//!
//! A built registry is immutable and may be shared read-only across
//! documents and threads.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::{kind_for_location, Directive, DirectiveLocation, Document, HostNode, HostRef, NodeKind};
use crate::data::{AnyTarget, Data, Extrinsics, TargetId};
use crate::fault::{Fault, FaultKind};
use crate::metadata::{RawNode, Slot};
use crate::spec::Spec;
use crate::specs::core::Using;

/// Whether an extractor's annotation may repeat on one host node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetition {
    /// At most one occurrence per host; later occurrences overwrite.
    On,
    /// Any number of occurrences per host; each one appends.
    RepeatableOn,
}

/// A successfully decoded occurrence of a spec's metadata on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding<T> {
    /// The decoded metadata.
    pub data: T,
    /// The matched annotation node.
    pub directive: Directive,
    /// The node the annotation was attached to.
    pub on: HostRef,
}

/// One registered metadata shape: decode attempt plus recording.
///
/// Object safety is the point: a [`Layer`] holds extractors of unrelated
/// value types behind this trait.
pub trait Extractor: Send + Sync {
    /// The spec this extractor belongs to; its version is the minimum
    /// the extractor implements.
    fn spec(&self) -> &Spec;

    /// The extractor's name within its spec.
    fn name(&self) -> &str;

    /// Whether the annotation may repeat per host node.
    fn repeatable(&self) -> bool;

    /// The directive locations this extractor applies to.
    fn locations(&self) -> &[DirectiveLocation];

    /// Decode `directive` and, on success, record the column value and
    /// the binding. A failed decode leaves no trace beyond the returned
    /// fault.
    fn extract(
        &self,
        store: &Extrinsics,
        doc: &Document,
        directive: &Directive,
        host: &HostNode<'_>,
    ) -> Result<(), Fault>;
}

/// A typed extractor: a spec-owned (name, locations, slot) triple with
/// its per-host column and per-document binding index.
///
/// Created with [`Spec::input`]; the channels are declared per extractor
/// value, so two extractors never share columns even when their names
/// collide.
pub struct Extract<S: Slot> {
    spec: Spec,
    name: String,
    repeatable: bool,
    locations: Vec<DirectiveLocation>,
    slot: S,
    column: Data<Vec<S::Value>, AnyTarget>,
    index: Data<Vec<Binding<S::Value>>, Document>,
}

impl Spec {
    /// Declare a metadata shape this spec exports.
    ///
    /// The slot decodes the whole annotation, so it is normally an
    /// [`obj`](crate::metadata::obj) over the shape of the annotation's
    /// arguments.
    ///
    /// ```
    /// use specbind::ast::{DirectiveLocation, RawValue};
    /// use specbind::layer::Repetition;
    /// use specbind::metadata::{obj, Fields, Int, ObjectShape, Slot, SlotExt};
    /// use specbind::spec::Spec;
    /// use specbind::version::Version;
    ///
    /// struct Weight { value: i32 }
    ///
    /// impl ObjectShape for Weight {
    ///     fn from_fields(fields: &mut Fields<'_>) -> Option<Self> {
    ///         let value = fields.get("value", &Int.must());
    ///         Some(Weight { value: value? })
    ///     }
    ///
    ///     fn to_fields(&self) -> Vec<(&'static str, RawValue)> {
    ///         vec![("value", Int.must().serialize(self.value))]
    ///     }
    /// }
    ///
    /// let spec = Spec::new("https://example.com/weights", "weights", Version::new(1, 0));
    /// let weight = spec.input(
    ///     "weight",
    ///     obj::<Weight>(),
    ///     Repetition::On,
    ///     vec![DirectiveLocation::FieldDefinition],
    /// );
    /// assert_eq!(weight.name(), "weight");
    /// ```
    pub fn input<S: Slot>(
        &self,
        name: impl Into<String>,
        slot: S,
        repetition: Repetition,
        locations: Vec<DirectiveLocation>,
    ) -> Extract<S>
    where
        S::Value: Clone + 'static,
    {
        Extract {
            spec: self.clone(),
            name: name.into(),
            repeatable: repetition == Repetition::RepeatableOn,
            locations,
            slot,
            column: Data::declare("metadata column"),
            index: Data::declare("binding index"),
        }
    }
}

impl<S: Slot> Extract<S>
where
    S::Value: Clone + 'static,
{
    /// The owning spec.
    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    /// The extractor's name within its spec.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the annotation may repeat per host node.
    pub fn repeatable(&self) -> bool {
        self.repeatable
    }

    /// The per-document binding index, in insertion order.
    pub fn bindings_at(&self, store: &Extrinsics, doc: TargetId) -> Vec<Binding<S::Value>> {
        self.index.get_at(store, doc).unwrap_or_default()
    }

    /// The column recorded on one host node. Singular extractors keep at
    /// most one entry; repeatable ones keep every occurrence in order.
    pub fn column_at(&self, store: &Extrinsics, node: TargetId) -> Vec<S::Value> {
        self.column.get_at(store, node).unwrap_or_default()
    }
}

impl<S: Slot + Send + Sync> Extractor for Extract<S>
where
    S::Value: Clone + 'static,
{
    fn spec(&self) -> &Spec {
        &self.spec
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn repeatable(&self) -> bool {
        self.repeatable
    }

    fn locations(&self) -> &[DirectiveLocation] {
        &self.locations
    }

    fn extract(
        &self,
        store: &Extrinsics,
        doc: &Document,
        directive: &Directive,
        host: &HostNode<'_>,
    ) -> Result<(), Fault> {
        let data = self
            .slot
            .deserialize(Some(RawNode::Directive(directive)))
            .map_err(|cause| {
                Fault::new(FaultKind::BadMetadataForm {
                    name: self.name.clone(),
                })
                .at(directive.position)
                .caused_by([cause])
            })?;

        let host_id = host.target_id();
        if self.repeatable {
            self.column.set_if_vacant_at(store, host_id, Vec::new());
            self.column
                .update_at(store, host_id, |column| column.push(data.clone()));
        } else {
            self.column.set_at(store, host_id, vec![data.clone()]);
        }

        let doc_id = TargetId::of(doc);
        self.index.set_if_vacant_at(store, doc_id, Vec::new());
        self.index.update_at(store, doc_id, |bindings| {
            bindings.push(Binding {
                data,
                directive: directive.clone(),
                on: host.to_ref(),
            })
        });
        Ok(())
    }
}

/// An immutable registry of extractors, grouped by spec identity in
/// registration order.
#[derive(Default)]
pub struct Layer {
    by_identity: HashMap<String, Vec<Arc<dyn Extractor>>>,
}

impl Layer {
    /// Build a registry. Registration order is preserved within each
    /// spec identity and decides dispatch ties.
    pub fn new(extractors: impl IntoIterator<Item = Arc<dyn Extractor>>) -> Self {
        let mut by_identity: HashMap<String, Vec<Arc<dyn Extractor>>> = HashMap::new();
        for extractor in extractors {
            by_identity
                .entry(extractor.spec().identity().to_string())
                .or_default()
                .push(extractor);
        }
        Layer { by_identity }
    }

    /// The visitor for one resolved using request, or `None` when no
    /// registered extractor serves that spec identity at the requested
    /// version. In that case this layer has nothing to say in that
    /// document.
    pub fn visitor(&self, request: &Using) -> Option<LayerVisitor> {
        let active: Vec<&Arc<dyn Extractor>> = self
            .by_identity
            .get(request.using.identity())?
            .iter()
            .filter(|extractor| {
                extractor
                    .spec()
                    .version()
                    .satisfies(&request.using.version())
            })
            .collect();
        if active.is_empty() {
            return None;
        }

        let local = request.local_name();
        let mut by_name: HashMap<String, HashMap<NodeKind, Vec<Arc<dyn Extractor>>>> =
            HashMap::new();
        for extractor in active {
            let qualified = format!("{local}__{}", extractor.name());
            for location in extractor.locations() {
                let Some(kind) = kind_for_location(location) else {
                    continue;
                };
                for key in [qualified.as_str(), local] {
                    by_name
                        .entry(key.to_string())
                        .or_default()
                        .entry(kind)
                        .or_default()
                        .push(extractor.clone());
                }
            }
        }
        Some(LayerVisitor { by_name })
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut identities: Vec<&String> = self.by_identity.keys().collect();
        identities.sort();
        f.debug_struct("Layer").field("specs", &identities).finish()
    }
}

/// The per-(document × using request) annotation visitor.
pub struct LayerVisitor {
    by_name: HashMap<String, HashMap<NodeKind, Vec<Arc<dyn Extractor>>>>,
}

impl LayerVisitor {
    /// Apply the registered extractors to one annotation/host pair.
    ///
    /// Unknown (name, kind) pairs do nothing: not every annotation is
    /// metadata. Otherwise candidates run in registration order until one
    /// decodes; if none does, a single aggregated fault is reported.
    pub fn visit(
        &self,
        store: &Extrinsics,
        doc: &Document,
        directive: &Directive,
        host: &HostNode<'_>,
        report: &mut dyn FnMut(Fault),
    ) {
        let Some(by_kind) = self.by_name.get(directive.name.as_str()) else {
            return;
        };
        let Some(candidates) = by_kind.get(&host.kind()) else {
            return;
        };
        let mut failures = Vec::new();
        for extractor in candidates {
            match extractor.extract(store, doc, directive, host) {
                Ok(()) => return,
                Err(fault) => failures.push(fault),
            }
        }
        report(
            Fault::new(FaultKind::BadMetadata)
                .at(directive.position)
                .caused_by(failures),
        );
    }
}
