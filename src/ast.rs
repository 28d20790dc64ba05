//! ast
//!
//! The document node surface: aliases over the external parser's AST,
//! plus the uniform views this crate layers on top of it.
//!
//! The parser is a black box (text in, typed node tree with positions
//! out). This crate never constructs or mutates structural nodes; it
//! walks them once per pass and attaches side data keyed by node
//! identity.

use graphql_parser::schema as gql;

use crate::data::TargetId;

pub use graphql_parser::schema::DirectiveLocation;
pub use graphql_parser::Pos;

/// A parsed schema document, owning all of its nodes.
pub type Document = gql::Document<'static, String>;
/// A top-level definition.
pub type Definition = gql::Definition<'static, String>;
/// A type definition.
pub type TypeDefinition = gql::TypeDefinition<'static, String>;
/// The schema definition node.
pub type SchemaDefinition = gql::SchemaDefinition<'static, String>;
/// An annotation ("directive") node: a name plus named arguments.
pub type Directive = gql::Directive<'static, String>;
/// A literal value node (int, float, string, boolean, enum, null, list,
/// or object).
pub type RawValue = gql::Value<'static, String>;
/// A scalar type definition.
pub type ScalarType = gql::ScalarType<'static, String>;
/// An object type definition.
pub type ObjectType = gql::ObjectType<'static, String>;
/// An interface type definition.
pub type InterfaceType = gql::InterfaceType<'static, String>;
/// A union type definition.
pub type UnionType = gql::UnionType<'static, String>;
/// An enum type definition.
pub type EnumType = gql::EnumType<'static, String>;
/// An enum value definition.
pub type EnumValue = gql::EnumValue<'static, String>;
/// An input object type definition.
pub type InputObjectType = gql::InputObjectType<'static, String>;
/// A field definition.
pub type Field = gql::Field<'static, String>;
/// An input value definition (field argument or input object field).
pub type InputValue = gql::InputValue<'static, String>;

/// Parse schema source text into an owned document.
pub fn parse(text: &str) -> Result<Document, gql::ParseError> {
    graphql_parser::parse_schema::<String>(text).map(gql::Document::into_static)
}

/// The structural kind of a node annotations can attach to.
///
/// Argument definitions and input object fields share a kind, mirroring
/// the node tree, where both are input value definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    SchemaDefinition,
    ScalarType,
    ObjectType,
    FieldDefinition,
    InputValueDefinition,
    InterfaceType,
    UnionType,
    EnumType,
    EnumValue,
    InputObjectType,
}

/// The node kind a directive location selects, or `None` for executable
/// locations, which never occur in a schema document.
pub fn kind_for_location(location: &DirectiveLocation) -> Option<NodeKind> {
    match location {
        DirectiveLocation::Schema => Some(NodeKind::SchemaDefinition),
        DirectiveLocation::Scalar => Some(NodeKind::ScalarType),
        DirectiveLocation::Object => Some(NodeKind::ObjectType),
        DirectiveLocation::FieldDefinition => Some(NodeKind::FieldDefinition),
        DirectiveLocation::ArgumentDefinition => Some(NodeKind::InputValueDefinition),
        DirectiveLocation::Interface => Some(NodeKind::InterfaceType),
        DirectiveLocation::Union => Some(NodeKind::UnionType),
        DirectiveLocation::Enum => Some(NodeKind::EnumType),
        DirectiveLocation::EnumValue => Some(NodeKind::EnumValue),
        DirectiveLocation::InputObject => Some(NodeKind::InputObjectType),
        DirectiveLocation::InputFieldDefinition => Some(NodeKind::InputValueDefinition),
        _ => None,
    }
}

/// Every directive location that can occur in a schema document.
pub fn schema_locations() -> Vec<DirectiveLocation> {
    vec![
        DirectiveLocation::Schema,
        DirectiveLocation::Scalar,
        DirectiveLocation::Object,
        DirectiveLocation::FieldDefinition,
        DirectiveLocation::ArgumentDefinition,
        DirectiveLocation::Interface,
        DirectiveLocation::Union,
        DirectiveLocation::Enum,
        DirectiveLocation::EnumValue,
        DirectiveLocation::InputObject,
        DirectiveLocation::InputFieldDefinition,
    ]
}

/// A borrowed view of the node an annotation is attached to.
#[derive(Debug, Clone, Copy)]
pub enum HostNode<'a> {
    Schema(&'a SchemaDefinition),
    Scalar(&'a ScalarType),
    Object(&'a ObjectType),
    Field(&'a Field),
    InputValue(&'a InputValue),
    Interface(&'a InterfaceType),
    Union(&'a UnionType),
    Enum(&'a EnumType),
    EnumValue(&'a EnumValue),
    InputObject(&'a InputObjectType),
}

impl<'a> HostNode<'a> {
    /// The structural kind of the underlying node.
    pub fn kind(&self) -> NodeKind {
        match self {
            HostNode::Schema(_) => NodeKind::SchemaDefinition,
            HostNode::Scalar(_) => NodeKind::ScalarType,
            HostNode::Object(_) => NodeKind::ObjectType,
            HostNode::Field(_) => NodeKind::FieldDefinition,
            HostNode::InputValue(_) => NodeKind::InputValueDefinition,
            HostNode::Interface(_) => NodeKind::InterfaceType,
            HostNode::Union(_) => NodeKind::UnionType,
            HostNode::Enum(_) => NodeKind::EnumType,
            HostNode::EnumValue(_) => NodeKind::EnumValue,
            HostNode::InputObject(_) => NodeKind::InputObjectType,
        }
    }

    /// The node's name; the schema definition has none.
    pub fn name(&self) -> Option<&'a str> {
        match self {
            HostNode::Schema(_) => None,
            HostNode::Scalar(node) => Some(&node.name),
            HostNode::Object(node) => Some(&node.name),
            HostNode::Field(node) => Some(&node.name),
            HostNode::InputValue(node) => Some(&node.name),
            HostNode::Interface(node) => Some(&node.name),
            HostNode::Union(node) => Some(&node.name),
            HostNode::Enum(node) => Some(&node.name),
            HostNode::EnumValue(node) => Some(&node.name),
            HostNode::InputObject(node) => Some(&node.name),
        }
    }

    /// The node's source position.
    pub fn position(&self) -> Pos {
        match self {
            HostNode::Schema(node) => node.position,
            HostNode::Scalar(node) => node.position,
            HostNode::Object(node) => node.position,
            HostNode::Field(node) => node.position,
            HostNode::InputValue(node) => node.position,
            HostNode::Interface(node) => node.position,
            HostNode::Union(node) => node.position,
            HostNode::Enum(node) => node.position,
            HostNode::EnumValue(node) => node.position,
            HostNode::InputObject(node) => node.position,
        }
    }

    /// The identity of the underlying node, for extrinsic attachment.
    pub fn target_id(&self) -> TargetId {
        match self {
            HostNode::Schema(node) => TargetId::of(*node),
            HostNode::Scalar(node) => TargetId::of(*node),
            HostNode::Object(node) => TargetId::of(*node),
            HostNode::Field(node) => TargetId::of(*node),
            HostNode::InputValue(node) => TargetId::of(*node),
            HostNode::Interface(node) => TargetId::of(*node),
            HostNode::Union(node) => TargetId::of(*node),
            HostNode::Enum(node) => TargetId::of(*node),
            HostNode::EnumValue(node) => TargetId::of(*node),
            HostNode::InputObject(node) => TargetId::of(*node),
        }
    }

    /// An owned summary of this host, recorded in bindings.
    pub fn to_ref(&self) -> HostRef {
        HostRef {
            kind: self.kind(),
            name: self.name().map(str::to_string),
            position: self.position(),
        }
    }
}

/// An owned reference to an annotated node: its kind, name, and
/// position.
#[derive(Debug, Clone, PartialEq)]
pub struct HostRef {
    pub kind: NodeKind,
    pub name: Option<String>,
    pub position: Pos,
}

/// Visit every annotation in the document, paired with its host node, in
/// document order.
///
/// Directives on type and schema extensions are not visited: directive
/// locations select base definition kinds only, so no extractor could
/// ever match them.
pub fn each_annotation<'d>(doc: &'d Document, mut visit: impl FnMut(&'d Directive, HostNode<'d>)) {
    for definition in &doc.definitions {
        match definition {
            Definition::SchemaDefinition(schema) => {
                for directive in &schema.directives {
                    visit(directive, HostNode::Schema(schema));
                }
            }
            Definition::TypeDefinition(type_definition) => match type_definition {
                TypeDefinition::Scalar(scalar) => {
                    for directive in &scalar.directives {
                        visit(directive, HostNode::Scalar(scalar));
                    }
                }
                TypeDefinition::Object(object) => {
                    for directive in &object.directives {
                        visit(directive, HostNode::Object(object));
                    }
                    each_field_annotation(&object.fields, &mut visit);
                }
                TypeDefinition::Interface(interface) => {
                    for directive in &interface.directives {
                        visit(directive, HostNode::Interface(interface));
                    }
                    each_field_annotation(&interface.fields, &mut visit);
                }
                TypeDefinition::Union(union_type) => {
                    for directive in &union_type.directives {
                        visit(directive, HostNode::Union(union_type));
                    }
                }
                TypeDefinition::Enum(enum_type) => {
                    for directive in &enum_type.directives {
                        visit(directive, HostNode::Enum(enum_type));
                    }
                    for value in &enum_type.values {
                        for directive in &value.directives {
                            visit(directive, HostNode::EnumValue(value));
                        }
                    }
                }
                TypeDefinition::InputObject(input_object) => {
                    for directive in &input_object.directives {
                        visit(directive, HostNode::InputObject(input_object));
                    }
                    for field in &input_object.fields {
                        for directive in &field.directives {
                            visit(directive, HostNode::InputValue(field));
                        }
                    }
                }
            },
            Definition::DirectiveDefinition(directive_definition) => {
                for argument in &directive_definition.arguments {
                    for directive in &argument.directives {
                        visit(directive, HostNode::InputValue(argument));
                    }
                }
            }
            Definition::TypeExtension(_) => {}
        }
    }
}

fn each_field_annotation<'d>(
    fields: &'d [Field],
    visit: &mut impl FnMut(&'d Directive, HostNode<'d>),
) {
    for field in fields {
        // Arguments precede the field's own directives in source order.
        for argument in &field.arguments {
            for directive in &argument.directives {
                visit(directive, HostNode::InputValue(argument));
            }
        }
        for directive in &field.directives {
            visit(directive, HostNode::Field(field));
        }
    }
}
