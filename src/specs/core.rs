//! specs::core
//!
//! The bootstrap ("core") specification itself.
//!
//! Every document must anchor to a bootstrap spec before any other
//! metadata can be trusted: a schema-definition annotation whose `using`
//! argument names the bootstrap spec fixes the local name under which
//! all further using requests are written. This module defines that
//! spec's canonical identity and its two metadata shapes, [`Using`] and
//! [`Export`], plus the default [`Layer`] carrying both.

use std::sync::{Arc, LazyLock};

use crate::ast::{schema_locations, DirectiveLocation, RawValue};
use crate::layer::{Extract, Extractor, Layer, Repetition};
use crate::metadata::{obj, Bool, Fields, Obj, ObjectShape, Scalar, Slot, SlotExt, Str};
use crate::spec::Spec;
use crate::version::Version;

/// A spec URL carried in a string node.
pub const SPEC_URL: Scalar<Spec> = Scalar::new(Spec::decode, encode_spec);

fn encode_spec(spec: &Spec) -> String {
    spec.to_string()
}

static CORE: LazyLock<Spec> =
    LazyLock::new(|| Spec::new("https://lib.specbind.dev/core", "core", Version::new(0, 1)));

/// The canonical bootstrap spec.
pub fn spec() -> &'static Spec {
    &CORE
}

/// A document's request to use a spec, optionally under a local alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Using {
    /// The requested spec.
    pub using: Spec,
    /// The local alias declared with `as`, if any.
    pub alias: Option<String>,
}

impl Using {
    /// Request `spec` under its own name.
    pub fn new(using: Spec) -> Self {
        Using { using, alias: None }
    }

    /// The name this spec goes by within the document: the declared
    /// alias, or the spec's own name.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.using.name())
    }
}

impl ObjectShape for Using {
    fn from_fields(fields: &mut Fields<'_>) -> Option<Self> {
        let using = fields.get("using", &SPEC_URL.must());
        let alias = fields.get("as", &Str);
        Some(Using {
            using: using?,
            alias: alias?,
        })
    }

    fn to_fields(&self) -> Vec<(&'static str, RawValue)> {
        vec![
            ("using", SPEC_URL.must().serialize(self.using.clone())),
            ("as", Str.serialize(self.alias.clone())),
        ]
    }
}

/// Marks a definition as part of a spec's exported surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Export {
    /// Whether the annotated definition is exported.
    pub export: bool,
}

impl ObjectShape for Export {
    fn from_fields(fields: &mut Fields<'_>) -> Option<Self> {
        let export = fields.get("export", &Bool.must());
        Some(Export { export: export? })
    }

    fn to_fields(&self) -> Vec<(&'static str, RawValue)> {
        vec![("export", Bool.must().serialize(self.export))]
    }
}

static USING: LazyLock<Arc<Extract<Obj<Using>>>> = LazyLock::new(|| {
    Arc::new(spec().input(
        "Using",
        obj::<Using>(),
        Repetition::RepeatableOn,
        vec![DirectiveLocation::Schema],
    ))
});

/// The repeatable using-request extract on schema definitions.
pub fn using() -> &'static Arc<Extract<Obj<Using>>> {
    &USING
}

static EXPORT: LazyLock<Arc<Extract<Obj<Export>>>> = LazyLock::new(|| {
    Arc::new(spec().input(
        "Export",
        obj::<Export>(),
        Repetition::On,
        schema_locations(),
    ))
});

/// The export-marker extract, applicable everywhere.
pub fn export() -> &'static Arc<Extract<Obj<Export>>> {
    &EXPORT
}

static LAYER: LazyLock<Layer> = LazyLock::new(|| {
    Layer::new([
        using().clone() as Arc<dyn Extractor>,
        export().clone() as Arc<dyn Extractor>,
    ])
});

/// The core spec's directive binding layer.
pub fn layer() -> &'static Layer {
    &LAYER
}
