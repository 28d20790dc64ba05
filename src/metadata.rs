//! metadata
//!
//! The typed metadata codec system: bidirectional converters between
//! structured values and raw annotation-argument trees.
//!
//! # Slots
//!
//! A [`Slot`] pairs `serialize` (typed value → raw node) with
//! `deserialize` (raw node → typed value). Base scalars decode a raw node
//! of their matching kind; handed any *other* kind they decode to
//! `Ok(None)`: "wrong shape" at a leaf is "value not present", and the
//! [`must`]/[`or`] combinators decide the final verdict. A genuinely
//! malformed literal (an int outside the 32-bit range, a non-finite
//! float) is a typed fault, not absence.
//!
//! Combinators compose slots into optional, required, defaulted, list,
//! and object forms. All slots are pure values; decoding never
//! short-circuits inside a batch: lists collect every element failure
//! and objects collect every field failure before deciding.
//!
//! [`must`]: SlotExt::must
//! [`or`]: SlotExt::or
//!
//! # Example
//!
//! ```
//! use specbind::ast::RawValue;
//! use specbind::metadata::{Int, RawNode, Slot, SlotExt};
//!
//! let node = RawValue::Int(7.into());
//! assert_eq!(Int.deserialize(Some(RawNode::Value(&node))).unwrap(), Some(7));
//!
//! // A string is not an int: absence, which `or` resolves to a default.
//! let node = RawValue::String("seven".to_string());
//! let slot = Int.or(0);
//! assert_eq!(slot.deserialize(Some(RawNode::Value(&node))).unwrap(), 0);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;

use crate::ast::{Directive, RawValue};
use crate::fault::{Fault, FaultKind};

/// A raw node a codec can read: a literal value or a whole directive
/// (whose arguments form an object-like field set).
#[derive(Debug, Clone, Copy)]
pub enum RawNode<'a> {
    Value(&'a RawValue),
    Directive(&'a Directive),
}

impl RawNode<'_> {
    fn is_null(&self) -> bool {
        matches!(self, RawNode::Value(RawValue::Null))
    }
}

fn absent(node: &Option<RawNode<'_>>) -> bool {
    match node {
        None => true,
        Some(node) => node.is_null(),
    }
}

/// The name → value view over a directive's arguments or an object
/// value's fields. Keys are unique; duplicate names are a document error
/// upstream of this crate.
#[derive(Debug)]
pub struct Metadata<'a> {
    entries: HashMap<&'a str, &'a RawValue>,
}

impl<'a> Metadata<'a> {
    /// The metadata view of a node, or `None` for nodes that carry no
    /// field set (anything but a directive or an object value).
    pub fn of(node: &RawNode<'a>) -> Option<Self> {
        match node {
            RawNode::Directive(directive) => Some(Self::of_directive(directive)),
            RawNode::Value(RawValue::Object(fields)) => Some(Metadata {
                entries: fields
                    .iter()
                    .map(|(name, value)| (name.as_str(), value))
                    .collect(),
            }),
            RawNode::Value(_) => None,
        }
    }

    /// The metadata view of a directive's arguments.
    pub fn of_directive(directive: &'a Directive) -> Self {
        Metadata {
            entries: directive
                .arguments
                .iter()
                .map(|(name, value)| (name.as_str(), value))
                .collect(),
        }
    }

    /// The value bound to `name`, if present.
    pub fn get(&self, name: &str) -> Option<&'a RawValue> {
        self.entries.get(name).copied()
    }

    /// Whether `name` is bound at all.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

/// A bidirectional codec between a typed value and a raw node tree.
pub trait Slot {
    /// The typed value this slot reads and writes.
    type Value;

    /// Encode a value as a raw node.
    fn serialize(&self, value: Self::Value) -> RawValue;

    /// Decode a raw node. Scalars yield `Ok(None)` for absent or
    /// mismatched-kind nodes; malformed literals and shape violations are
    /// faults.
    fn deserialize(&self, node: Option<RawNode<'_>>) -> Result<Self::Value, Fault>;
}

/// Chaining constructors for the slot combinators.
pub trait SlotExt: Slot + Sized {
    /// Accept an explicit null node, mapping null ↔ absence.
    fn maybe(self) -> Maybe<Self> {
        Maybe(self)
    }

    /// Reject null/missing with an `ExpectedValue` fault.
    fn must(self) -> Must<Self> {
        Must(self)
    }

    /// Substitute `value` on absence instead of erroring; inner faults
    /// still propagate.
    fn or<V>(self, value: V) -> Or<Self, V> {
        Or { slot: self, value }
    }

    /// Decode a list of this slot's values, collecting every element
    /// failure.
    fn list(self) -> ListOf<Self> {
        ListOf(self)
    }
}

impl<S: Slot + Sized> SlotExt for S {}

/// The 32-bit int scalar.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int;

impl Slot for Int {
    type Value = Option<i32>;

    fn serialize(&self, value: Option<i32>) -> RawValue {
        match value {
            Some(value) => RawValue::Int(value.into()),
            None => RawValue::Null,
        }
    }

    fn deserialize(&self, node: Option<RawNode<'_>>) -> Result<Option<i32>, Fault> {
        match node {
            Some(RawNode::Value(RawValue::Int(number))) => match number.as_i64() {
                Some(wide) => i32::try_from(wide).map(Some).map_err(|_| {
                    Fault::new(FaultKind::ReadIntRange {
                        repr: wide.to_string(),
                    })
                }),
                None => Err(Fault::new(FaultKind::ReadIntRange {
                    repr: format!("{number:?}"),
                })),
            },
            _ => Ok(None),
        }
    }
}

/// The float scalar. Non-finite values are a decode fault, never a
/// silent coercion.
#[derive(Debug, Clone, Copy, Default)]
pub struct Float;

impl Slot for Float {
    type Value = Option<f64>;

    fn serialize(&self, value: Option<f64>) -> RawValue {
        match value {
            Some(value) => RawValue::Float(value),
            None => RawValue::Null,
        }
    }

    fn deserialize(&self, node: Option<RawNode<'_>>) -> Result<Option<f64>, Fault> {
        match node {
            Some(RawNode::Value(RawValue::Float(value))) => {
                if value.is_finite() {
                    Ok(Some(*value))
                } else {
                    Err(Fault::new(FaultKind::ReadNaN {
                        repr: value.to_string(),
                    }))
                }
            }
            _ => Ok(None),
        }
    }
}

/// The string scalar.
#[derive(Debug, Clone, Copy, Default)]
pub struct Str;

impl Slot for Str {
    type Value = Option<String>;

    fn serialize(&self, value: Option<String>) -> RawValue {
        match value {
            Some(value) => RawValue::String(value),
            None => RawValue::Null,
        }
    }

    fn deserialize(&self, node: Option<RawNode<'_>>) -> Result<Option<String>, Fault> {
        match node {
            Some(RawNode::Value(RawValue::String(value))) => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }
}

/// The boolean scalar.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bool;

impl Slot for Bool {
    type Value = Option<bool>;

    fn serialize(&self, value: Option<bool>) -> RawValue {
        match value {
            Some(value) => RawValue::Boolean(value),
            None => RawValue::Null,
        }
    }

    fn deserialize(&self, node: Option<RawNode<'_>>) -> Result<Option<bool>, Fault> {
        match node {
            Some(RawNode::Value(RawValue::Boolean(value))) => Ok(Some(*value)),
            _ => Ok(None),
        }
    }
}

/// The enum-value scalar, decoding to the value's name.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumVal;

impl Slot for EnumVal {
    type Value = Option<String>;

    fn serialize(&self, value: Option<String>) -> RawValue {
        match value {
            Some(value) => RawValue::Enum(value),
            None => RawValue::Null,
        }
    }

    fn deserialize(&self, node: Option<RawNode<'_>>) -> Result<Option<String>, Fault> {
        match node {
            Some(RawNode::Value(RawValue::Enum(value))) => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }
}

/// A custom scalar carried in a string node, decoded and encoded with
/// plain functions.
pub struct Scalar<T> {
    decode: fn(&str) -> Result<T, Fault>,
    encode: fn(&T) -> String,
}

impl<T> Scalar<T> {
    /// Build a custom scalar from its decode/encode pair.
    pub const fn new(decode: fn(&str) -> Result<T, Fault>, encode: fn(&T) -> String) -> Self {
        Scalar { decode, encode }
    }
}

impl<T> Clone for Scalar<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Scalar<T> {}

impl<T> std::fmt::Debug for Scalar<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scalar").finish_non_exhaustive()
    }
}

impl<T> Slot for Scalar<T> {
    type Value = Option<T>;

    fn serialize(&self, value: Option<T>) -> RawValue {
        match value {
            Some(value) => RawValue::String((self.encode)(&value)),
            None => RawValue::Null,
        }
    }

    fn deserialize(&self, node: Option<RawNode<'_>>) -> Result<Option<T>, Fault> {
        match node {
            Some(RawNode::Value(RawValue::String(repr))) => (self.decode)(repr).map(Some),
            _ => Ok(None),
        }
    }
}

/// Wraps a slot to accept and produce an explicit null node.
#[derive(Debug, Clone, Copy)]
pub struct Maybe<S>(pub S);

impl<S: Slot> Slot for Maybe<S> {
    type Value = Option<S::Value>;

    fn serialize(&self, value: Option<S::Value>) -> RawValue {
        match value {
            Some(value) => self.0.serialize(value),
            None => RawValue::Null,
        }
    }

    fn deserialize(&self, node: Option<RawNode<'_>>) -> Result<Option<S::Value>, Fault> {
        if absent(&node) {
            return Ok(None);
        }
        self.0.deserialize(node).map(Some)
    }
}

/// Rejects null/missing; propagates the inner slot's faults unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Must<S>(pub S);

impl<T, S: Slot<Value = Option<T>>> Slot for Must<S> {
    type Value = T;

    fn serialize(&self, value: T) -> RawValue {
        self.0.serialize(Some(value))
    }

    fn deserialize(&self, node: Option<RawNode<'_>>) -> Result<T, Fault> {
        if absent(&node) {
            return Err(Fault::new(FaultKind::ExpectedValue));
        }
        match self.0.deserialize(node)? {
            Some(value) => Ok(value),
            None => Err(Fault::new(FaultKind::ExpectedValue)),
        }
    }
}

/// Substitutes a fallback on absence; inner faults still propagate.
#[derive(Debug, Clone, Copy)]
pub struct Or<S, V> {
    slot: S,
    value: V,
}

impl<T: Clone, S: Slot<Value = Option<T>>> Slot for Or<S, T> {
    type Value = T;

    fn serialize(&self, value: T) -> RawValue {
        self.slot.serialize(Some(value))
    }

    fn deserialize(&self, node: Option<RawNode<'_>>) -> Result<T, Fault> {
        match self.slot.deserialize(node)? {
            Some(value) => Ok(value),
            None => Ok(self.value.clone()),
        }
    }
}

/// Decodes a list node element by element, collecting every failure into
/// one `ReadList` fault. A non-list node decodes as the empty list.
#[derive(Debug, Clone, Copy)]
pub struct ListOf<S>(pub S);

impl<S: Slot> Slot for ListOf<S> {
    type Value = Vec<S::Value>;

    fn serialize(&self, values: Vec<S::Value>) -> RawValue {
        RawValue::List(
            values
                .into_iter()
                .map(|value| self.0.serialize(value))
                .collect(),
        )
    }

    fn deserialize(&self, node: Option<RawNode<'_>>) -> Result<Vec<S::Value>, Fault> {
        let items = match node {
            Some(RawNode::Value(RawValue::List(items))) => items,
            _ => return Ok(Vec::new()),
        };
        let mut values = Vec::with_capacity(items.len());
        let mut faults = Vec::new();
        for item in items {
            match self.0.deserialize(Some(RawNode::Value(item))) {
                Ok(value) => values.push(value),
                Err(fault) => faults.push(fault),
            }
        }
        if faults.is_empty() {
            Ok(values)
        } else {
            Err(Fault::new(FaultKind::ReadList).caused_by(faults))
        }
    }
}

/// A record type decodable from a metadata field set.
///
/// `from_fields` must read *every* field before combining them so that
/// all field failures are collected in one pass:
///
/// ```ignore
/// fn from_fields(fields: &mut Fields<'_>) -> Option<Self> {
///     let first = fields.get("first", &Int.must());
///     let second = fields.get("second", &Str);
///     Some(Shape { first: first?, second: second? })
/// }
/// ```
pub trait ObjectShape: Sized {
    /// Decode the record from a field set, reporting field failures
    /// through it.
    fn from_fields(fields: &mut Fields<'_>) -> Option<Self>;

    /// Encode the record as named fields, in declaration order.
    fn to_fields(&self) -> Vec<(&'static str, RawValue)>;
}

/// Field-set reader handed to [`ObjectShape::from_fields`]; collects one
/// `ReadField` fault per failing field instead of short-circuiting.
#[derive(Debug)]
pub struct Fields<'a> {
    metadata: Metadata<'a>,
    faults: Vec<Fault>,
}

impl Fields<'_> {
    /// Decode the field `name` with `slot`. A failure is recorded and
    /// reported as `None`.
    pub fn get<S: Slot>(&mut self, name: &'static str, slot: &S) -> Option<S::Value> {
        let node = self.metadata.get(name).map(RawNode::Value);
        match slot.deserialize(node) {
            Ok(value) => Some(value),
            Err(cause) => {
                self.faults.push(
                    Fault::new(FaultKind::ReadField {
                        name: name.to_string(),
                    })
                    .caused_by([cause]),
                );
                None
            }
        }
    }
}

/// The object slot for a record type `R`.
///
/// Decodes a directive's arguments or an object value's fields; any
/// other node kind fails with `BadReadNode`, and field failures are
/// aggregated under a single `ReadObject` fault.
pub struct Obj<R>(PhantomData<fn() -> R>);

/// The object slot for `R`.
pub fn obj<R: ObjectShape>() -> Obj<R> {
    Obj(PhantomData)
}

impl<R> Clone for Obj<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Obj<R> {}

impl<R> Default for Obj<R> {
    fn default() -> Self {
        Obj(PhantomData)
    }
}

impl<R> std::fmt::Debug for Obj<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Obj").finish_non_exhaustive()
    }
}

impl<R: ObjectShape> Slot for Obj<R> {
    type Value = R;

    fn serialize(&self, value: R) -> RawValue {
        RawValue::Object(
            value
                .to_fields()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect::<BTreeMap<String, RawValue>>(),
        )
    }

    fn deserialize(&self, node: Option<RawNode<'_>>) -> Result<R, Fault> {
        let metadata = match node.as_ref().and_then(Metadata::of) {
            Some(metadata) => metadata,
            None => {
                return Err(Fault::new(FaultKind::BadReadNode {
                    expected: "an object value or a directive",
                }))
            }
        };
        let mut fields = Fields {
            metadata,
            faults: Vec::new(),
        };
        let value = R::from_fields(&mut fields);
        match value {
            Some(value) if fields.faults.is_empty() => Ok(value),
            _ => Err(Fault::new(FaultKind::ReadObject).caused_by(fields.faults)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast;

    /// Parse a one-definition test document.
    fn directive_in(source: &str) -> ast::Document {
        ast::parse(source).unwrap()
    }

    fn first_directive(doc: &ast::Document) -> &ast::Directive {
        let mut found = None;
        ast::each_annotation(doc, |directive, _| {
            if found.is_none() {
                found = Some(directive);
            }
        });
        found.expect("test document has a directive")
    }

    fn argument<'a>(doc: &'a ast::Document, name: &str) -> &'a RawValue {
        Metadata::of_directive(first_directive(doc))
            .get(name)
            .expect("argument present")
    }

    #[test]
    fn scalars_decode_their_matching_kind() {
        let doc = directive_in(
            r#"type Q @probe(i: 3, f: 1.5, s: "hi", b: true, e: UP, n: null) { v: Int }"#,
        );
        let value = |name| Some(RawNode::Value(argument(&doc, name)));

        assert_eq!(Int.deserialize(value("i")).unwrap(), Some(3));
        assert_eq!(Float.deserialize(value("f")).unwrap(), Some(1.5));
        assert_eq!(Str.deserialize(value("s")).unwrap(), Some("hi".to_string()));
        assert_eq!(Bool.deserialize(value("b")).unwrap(), Some(true));
        assert_eq!(
            EnumVal.deserialize(value("e")).unwrap(),
            Some("UP".to_string())
        );
    }

    #[test]
    fn mismatched_kinds_decode_as_absence() {
        let doc = directive_in(r#"type Q @probe(s: "not a number") { v: Int }"#);
        let node = Some(RawNode::Value(argument(&doc, "s")));
        assert_eq!(Int.deserialize(node).unwrap(), None);
        assert_eq!(Float.deserialize(node).unwrap(), None);
        assert_eq!(Bool.deserialize(node).unwrap(), None);
        // Ints are not floats: the float slot sees absence, not a value.
        let doc = directive_in("type Q @probe(i: 2) { v: Int }");
        let node = Some(RawNode::Value(argument(&doc, "i")));
        assert_eq!(Float.deserialize(node).unwrap(), None);
    }

    #[test]
    fn out_of_range_ints_fault() {
        let doc = directive_in("type Q @probe(big: 3000000000) { v: Int }");
        let node = Some(RawNode::Value(argument(&doc, "big")));
        let fault = Int.deserialize(node).unwrap_err();
        assert_eq!(fault.code(), "ReadIntRange");
    }

    #[test]
    fn must_rejects_absence_null_and_mismatch() {
        assert_eq!(
            Int.must().deserialize(None).unwrap_err().code(),
            "ExpectedValue"
        );

        let doc = directive_in(r#"type Q @probe(n: null, s: "x") { v: Int }"#);
        let null = Some(RawNode::Value(argument(&doc, "n")));
        assert_eq!(Int.must().deserialize(null).unwrap_err().code(), "ExpectedValue");

        let mismatched = Some(RawNode::Value(argument(&doc, "s")));
        assert_eq!(
            Int.must().deserialize(mismatched).unwrap_err().code(),
            "ExpectedValue"
        );
    }

    #[test]
    fn or_substitutes_only_on_absence() {
        let doc = directive_in("type Q @probe(i: 3, big: 3000000000) { v: Int }");
        let present = Some(RawNode::Value(argument(&doc, "i")));
        assert_eq!(Int.or(7).deserialize(present).unwrap(), 3);
        assert_eq!(Int.or(7).deserialize(None).unwrap(), 7);

        // A malformed literal is not absence: the fault propagates.
        let broken = Some(RawNode::Value(argument(&doc, "big")));
        assert_eq!(
            Int.or(7).deserialize(broken).unwrap_err().code(),
            "ReadIntRange"
        );
    }

    #[test]
    fn maybe_maps_null_to_absence() {
        let doc = directive_in("type Q @probe(n: null) { v: Int }");
        let null = Some(RawNode::Value(argument(&doc, "n")));
        let slot = Int.must().maybe();
        assert_eq!(slot.deserialize(null).unwrap(), None);
        assert_eq!(slot.deserialize(None).unwrap(), None);
    }

    #[test]
    fn lists_collect_every_element_failure() {
        let doc = directive_in(r#"type Q @probe(xs: [1, "two", 3, "four"]) { v: Int }"#);
        let node = Some(RawNode::Value(argument(&doc, "xs")));
        let fault = Int.must().list().deserialize(node).unwrap_err();
        assert_eq!(fault.code(), "ReadList");
        assert_eq!(fault.causes().len(), 2);

        let doc = directive_in("type Q @probe(xs: [1, 2, 3]) { v: Int }");
        let node = Some(RawNode::Value(argument(&doc, "xs")));
        assert_eq!(Int.must().list().deserialize(node).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn non_list_nodes_decode_as_the_empty_list() {
        let doc = directive_in("type Q @probe(i: 1) { v: Int }");
        let node = Some(RawNode::Value(argument(&doc, "i")));
        assert_eq!(Int.must().list().deserialize(node).unwrap(), Vec::<i32>::new());
    }

    #[derive(Debug, PartialEq)]
    struct Pair {
        first: i32,
        second: String,
    }

    impl ObjectShape for Pair {
        fn from_fields(fields: &mut Fields<'_>) -> Option<Self> {
            let first = fields.get("first", &Int.must());
            let second = fields.get("second", &Str.must());
            Some(Pair {
                first: first?,
                second: second?,
            })
        }

        fn to_fields(&self) -> Vec<(&'static str, RawValue)> {
            vec![
                ("first", Int.must().serialize(self.first)),
                ("second", Str.must().serialize(self.second.clone())),
            ]
        }
    }

    #[test]
    fn objects_decode_from_directive_arguments() {
        let doc = directive_in(r#"type Q @pair(first: 1, second: "two") { v: Int }"#);
        let pair = obj::<Pair>()
            .deserialize(Some(RawNode::Directive(first_directive(&doc))))
            .unwrap();
        assert_eq!(
            pair,
            Pair {
                first: 1,
                second: "two".to_string()
            }
        );
    }

    #[test]
    fn objects_decode_from_object_values() {
        let doc = directive_in(r#"type Q @holds(p: { first: 1, second: "two" }) { v: Int }"#);
        let node = Some(RawNode::Value(argument(&doc, "p")));
        let pair = obj::<Pair>().deserialize(node).unwrap();
        assert_eq!(pair.first, 1);
    }

    #[test]
    fn objects_collect_every_field_failure() {
        let doc = directive_in(r#"type Q @pair(first: "one", second: 2) { v: Int }"#);
        let fault = obj::<Pair>()
            .deserialize(Some(RawNode::Directive(first_directive(&doc))))
            .unwrap_err();
        assert_eq!(fault.code(), "ReadObject");
        assert_eq!(fault.causes().len(), 2);
        assert_eq!(fault.causes()[0].code(), "ReadField");
        assert_eq!(fault.causes()[0].causes()[0].code(), "ExpectedValue");
    }

    #[test]
    fn objects_reject_unreadable_nodes() {
        let doc = directive_in("type Q @pair(first: 1) { v: Int }");
        let scalar = Some(RawNode::Value(argument(&doc, "first")));
        let fault = obj::<Pair>().deserialize(scalar).unwrap_err();
        assert_eq!(fault.code(), "BadReadNode");
        assert_eq!(obj::<Pair>().deserialize(None).unwrap_err().code(), "BadReadNode");
    }

    #[test]
    fn serialized_objects_round_trip_field_names() {
        let raw = obj::<Pair>().serialize(Pair {
            first: 4,
            second: "x".to_string(),
        });
        match raw {
            RawValue::Object(fields) => {
                assert_eq!(fields.get("first"), Some(&RawValue::Int(4.into())));
                assert_eq!(
                    fields.get("second"),
                    Some(&RawValue::String("x".to_string()))
                );
            }
            other => panic!("expected an object value, got {other:?}"),
        }
    }

    #[test]
    fn metadata_views_directives_and_objects_only() {
        let doc = directive_in("type Q @probe(i: 1) { v: Int }");
        let scalar = RawNode::Value(argument(&doc, "i"));
        assert!(Metadata::of(&scalar).is_none());
        let directive = RawNode::Directive(first_directive(&doc));
        let metadata = Metadata::of(&directive).unwrap();
        assert!(metadata.contains("i"));
        assert!(!metadata.contains("j"));
    }
}
