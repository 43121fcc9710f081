//! Documentation node model.
//!
//! This module provides the data model the resolver works over:
//! - [`NodeId`]: arena index of a constructed node
//! - [`NodeKind`]: closed set of documentation entity kinds
//! - [`Node`]: one documentation entity with its common fields and a kind-specific [`NodeData`]
//! - [`Children`]: per-kind child collections owned by container nodes
//! - [`TypeLink`] / [`InterfaceRef`]: string references before and after resolution
//!
//! # Ownership
//!
//! Nodes live in a flat arena owned by the resolution context (and later the graph). Every
//! cross-node relationship (`parent`, `namespace`, `extends`, return and parameter types) is a
//! [`NodeId`], never an owning pointer, so the parent/child cycle needs no reference counting.
//!
//! [`Parameter`] and [`TypeParameter`] records are owned inline by their declaring node.
//!
//! # Qualified Names
//!
//! A node's qualified name is `memberOf + "." + name`, or the bare name for roots. Methods are
//! keyed differently in the symbol table: `UPPER(memberOf).UPPER(name)` (see [`method_key`]),
//! since methods are the only kind that can overload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical name given to a method declared without a name (an anonymous call signature).
pub const ANONYMOUS_METHOD_NAME: &str = "()";

// ============================================================================
// ID Types
// ============================================================================

/// Index of a node within the resolution arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new node ID.
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Kind of documentation entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Namespace,
    Interface,
    Class,
    Method,
    Property,
    Event,
    /// Owned by a method; never registered in the symbol table.
    Parameter,
    /// Owned by a class, interface or method; never registered in the symbol table.
    TypeParameter,
}

impl NodeKind {
    /// Stable lowercase name, used in logs, JSON output and storage rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Namespace => "namespace",
            NodeKind::Interface => "interface",
            NodeKind::Class => "class",
            NodeKind::Method => "method",
            NodeKind::Property => "property",
            NodeKind::Event => "event",
            NodeKind::Parameter => "parameter",
            NodeKind::TypeParameter => "type_parameter",
        }
    }

    /// Whether nodes of this kind own [`Children`].
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            NodeKind::Namespace | NodeKind::Interface | NodeKind::Class
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access level declared in the documentation comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

// ============================================================================
// References
// ============================================================================

/// A type reference after resolution against the symbol table.
///
/// The referenced name itself stays on the owning record (`return_type_name`,
/// `type_name`); this only records what the name resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "node", rename_all = "snake_case")]
pub enum TypeLink {
    #[default]
    Unresolved,
    Namespace(NodeId),
    Class(NodeId),
    Interface(NodeId),
    Method(NodeId),
}

impl TypeLink {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, TypeLink::Unresolved)
    }

    /// The referenced node, if resolved.
    pub fn target(&self) -> Option<NodeId> {
        match *self {
            TypeLink::Unresolved => None,
            TypeLink::Namespace(id)
            | TypeLink::Class(id)
            | TypeLink::Interface(id)
            | TypeLink::Method(id) => Some(id),
        }
    }

    /// Kind of the referenced node, if resolved.
    pub fn kind(&self) -> Option<NodeKind> {
        match self {
            TypeLink::Unresolved => None,
            TypeLink::Namespace(_) => Some(NodeKind::Namespace),
            TypeLink::Class(_) => Some(NodeKind::Class),
            TypeLink::Interface(_) => Some(NodeKind::Interface),
            TypeLink::Method(_) => Some(NodeKind::Method),
        }
    }
}

/// An implements/extends entry naming an interface.
///
/// Entries start as placeholders and are replaced by the real interface when its
/// qualified name resolves. A placeholder never carries a node or persisted id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InterfaceRef {
    Placeholder { name: String },
    Resolved { node: NodeId },
}

impl InterfaceRef {
    pub fn placeholder(name: impl Into<String>) -> Self {
        InterfaceRef::Placeholder { name: name.into() }
    }

    /// Always [`NodeKind::Interface`], resolved or not.
    pub fn kind(&self) -> NodeKind {
        NodeKind::Interface
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, InterfaceRef::Resolved { .. })
    }

    pub fn target(&self) -> Option<NodeId> {
        match self {
            InterfaceRef::Placeholder { .. } => None,
            InterfaceRef::Resolved { node } => Some(*node),
        }
    }
}

// ============================================================================
// Owned Records
// ============================================================================

/// A method parameter, owned by its method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Canonical name (optional marker stripped).
    pub name: String,
    /// Declared type as written.
    pub type_name: Option<String>,
    /// What `type_name` resolved to.
    pub type_link: TypeLink,
    /// True when the raw name carried a trailing `?`.
    pub optional: bool,
    pub description: String,
    /// Owning method, set during resolution.
    pub method: Option<NodeId>,
}

impl Parameter {
    /// Create a parameter from its raw declared name.
    ///
    /// A trailing `?` marks the parameter optional and is stripped from the name.
    pub fn new(raw_name: &str) -> Self {
        let trimmed = raw_name.trim();
        let (name, optional) = match trimmed.strip_suffix('?') {
            Some(stripped) => (stripped.trim_end(), true),
            None => (trimmed, false),
        };
        Parameter {
            name: name.to_string(),
            type_name: None,
            type_link: TypeLink::Unresolved,
            optional,
            description: String::new(),
            method: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::Parameter
    }

    pub fn class_type(&self) -> Option<NodeId> {
        match self.type_link {
            TypeLink::Class(id) => Some(id),
            _ => None,
        }
    }

    pub fn interface_type(&self) -> Option<NodeId> {
        match self.type_link {
            TypeLink::Interface(id) => Some(id),
            _ => None,
        }
    }

    pub fn method_type(&self) -> Option<NodeId> {
        match self.type_link {
            TypeLink::Method(id) => Some(id),
            _ => None,
        }
    }
}

/// A generic type parameter declared on a class, interface or method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeParameter {
    pub name: String,
    pub constraint: Option<String>,
    pub description: String,
    /// Declaring node, set during resolution.
    pub owner: Option<NodeId>,
}

impl TypeParameter {
    pub fn new(name: impl Into<String>) -> Self {
        TypeParameter {
            name: name.into(),
            constraint: None,
            description: String::new(),
            owner: None,
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::TypeParameter
    }
}

// ============================================================================
// Child Collections
// ============================================================================

/// Child collections of a container node, keyed by local name.
///
/// Methods are keyed by their upper-cased name and hold every overload in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Children {
    pub namespaces: BTreeMap<String, NodeId>,
    pub interfaces: BTreeMap<String, NodeId>,
    pub classes: BTreeMap<String, NodeId>,
    pub methods: BTreeMap<String, Vec<NodeId>>,
    pub properties: BTreeMap<String, NodeId>,
    pub events: BTreeMap<String, NodeId>,
}

impl Children {
    /// All children in traversal order: namespaces, interfaces, classes, methods, properties, events.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.namespaces
            .values()
            .chain(self.interfaces.values())
            .chain(self.classes.values())
            .chain(self.methods.values().flatten())
            .chain(self.properties.values())
            .chain(self.events.values())
            .copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ids().any(|child| child == id)
    }

    pub fn len(&self) -> usize {
        self.ids().count()
    }

    pub fn is_empty(&self) -> bool {
        self.ids().next().is_none()
    }
}

// ============================================================================
// Kind-specific Data
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceData {
    pub children: Children,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceData {
    /// Extended interfaces, keyed by the name as written.
    pub interfaces: BTreeMap<String, InterfaceRef>,
    pub type_parameters: Vec<TypeParameter>,
    pub children: Children,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassData {
    /// Containing namespace as written; defaults to `memberOf` when absent.
    pub namespace_name: Option<String>,
    pub namespace: Option<NodeId>,
    pub extends_name: Option<String>,
    pub extends: Option<NodeId>,
    /// Implemented interfaces, keyed by the name as written.
    pub interfaces: BTreeMap<String, InterfaceRef>,
    pub type_parameters: Vec<TypeParameter>,
    pub children: Children,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodData {
    /// Parameters in declaration order.
    pub parameters: Vec<Parameter>,
    pub return_type_name: Option<String>,
    pub return_type: TypeLink,
    pub return_description: String,
    pub type_parameters: Vec<TypeParameter>,
}

impl MethodData {
    pub fn return_type_namespace(&self) -> Option<NodeId> {
        match self.return_type {
            TypeLink::Namespace(id) => Some(id),
            _ => None,
        }
    }

    pub fn return_type_class(&self) -> Option<NodeId> {
        match self.return_type {
            TypeLink::Class(id) => Some(id),
            _ => None,
        }
    }

    pub fn return_type_interface(&self) -> Option<NodeId> {
        match self.return_type {
            TypeLink::Interface(id) => Some(id),
            _ => None,
        }
    }

    /// Look up a parameter by canonical name.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyData {
    /// Declared type; resolved by the persistence layer, not by the resolver.
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    /// Payload type as written.
    pub type_name: Option<String>,
}

/// Kind-specific payload of a [`Node`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeData {
    Namespace(NamespaceData),
    Interface(InterfaceData),
    Class(ClassData),
    Method(MethodData),
    Property(PropertyData),
    Event(EventData),
}

// ============================================================================
// Node
// ============================================================================

/// A documentation entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, unique only within the parent's scope.
    pub name: String,
    /// Qualified name of the declared parent. `Some("")` marks a root; `None` means the
    /// record never declared one.
    pub member_of: Option<String>,
    /// Free text; link markup is kept verbatim.
    pub description: String,
    pub remarks: String,
    pub visibility: Visibility,
    pub published: bool,
    pub exported: bool,
    /// Resolved parent, set when the node is attached.
    pub parent: Option<NodeId>,
    /// Persisted identity, assigned by the storage layer.
    pub id: Option<i64>,
    /// True once persisted.
    pub saved: bool,
    #[serde(flatten)]
    pub data: NodeData,
}

impl Node {
    fn with_data(name: impl Into<String>, data: NodeData) -> Self {
        Node {
            name: name.into(),
            member_of: None,
            description: String::new(),
            remarks: String::new(),
            visibility: Visibility::Public,
            published: true,
            exported: true,
            parent: None,
            id: None,
            saved: false,
            data,
        }
    }

    /// Create a namespace. `member_of` stays undefined until set.
    pub fn namespace(name: impl Into<String>) -> Self {
        Self::with_data(name, NodeData::Namespace(NamespaceData::default()))
    }

    /// Create a root namespace (`member_of` set to the empty string).
    pub fn root_namespace(name: impl Into<String>) -> Self {
        Self::namespace(name).with_member_of("")
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_data(name, NodeData::Interface(InterfaceData::default()))
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::with_data(name, NodeData::Class(ClassData::default()))
    }

    /// Create a method. An empty name becomes [`ANONYMOUS_METHOD_NAME`].
    pub fn method(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            ANONYMOUS_METHOD_NAME.to_string()
        } else {
            name
        };
        Self::with_data(name, NodeData::Method(MethodData::default()))
    }

    pub fn property(name: impl Into<String>) -> Self {
        Self::with_data(name, NodeData::Property(PropertyData::default()))
    }

    pub fn event(name: impl Into<String>) -> Self {
        Self::with_data(name, NodeData::Event(EventData::default()))
    }

    // ------------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------------

    pub fn with_member_of(mut self, member_of: impl Into<String>) -> Self {
        self.member_of = Some(member_of.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = remarks.into();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    pub fn with_exported(mut self, exported: bool) -> Self {
        self.exported = exported;
        self
    }

    /// Set the parent class (classes) or add an extended interface (interfaces).
    ///
    /// Ignored for other kinds.
    pub fn with_extends(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        match &mut self.data {
            NodeData::Class(class) => class.extends_name = Some(name),
            NodeData::Interface(interface) => {
                interface
                    .interfaces
                    .insert(name.clone(), InterfaceRef::placeholder(name));
            }
            _ => {}
        }
        self
    }

    /// Add an implemented (classes) or extended (interfaces) interface placeholder.
    ///
    /// Ignored for other kinds.
    pub fn with_interface(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if let Some(interfaces) = self.interfaces_mut() {
            interfaces.insert(name.clone(), InterfaceRef::placeholder(name));
        }
        self
    }

    /// Set a class's containing namespace when it differs from `member_of`.
    pub fn with_namespace_name(mut self, name: impl Into<String>) -> Self {
        if let NodeData::Class(class) = &mut self.data {
            class.namespace_name = Some(name.into());
        }
        self
    }

    pub fn with_return_type(mut self, type_name: impl Into<String>) -> Self {
        if let NodeData::Method(method) = &mut self.data {
            method.return_type_name = Some(type_name.into());
        }
        self
    }

    pub fn with_return_description(mut self, description: impl Into<String>) -> Self {
        if let NodeData::Method(method) = &mut self.data {
            method.return_description = description.into();
        }
        self
    }

    /// Append a parameter, keeping declaration order.
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        if let NodeData::Method(method) = &mut self.data {
            method.parameters.push(parameter);
        }
        self
    }

    pub fn with_type_parameter(mut self, type_parameter: TypeParameter) -> Self {
        if let Some(params) = self.type_parameters_mut() {
            params.push(type_parameter);
        }
        self
    }

    /// Set the declared type of a property or the payload type of an event.
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        match &mut self.data {
            NodeData::Property(property) => property.type_name = Some(type_name.into()),
            NodeData::Event(event) => event.type_name = Some(type_name.into()),
            _ => {}
        }
        self
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Namespace(_) => NodeKind::Namespace,
            NodeData::Interface(_) => NodeKind::Interface,
            NodeData::Class(_) => NodeKind::Class,
            NodeData::Method(_) => NodeKind::Method,
            NodeData::Property(_) => NodeKind::Property,
            NodeData::Event(_) => NodeKind::Event,
        }
    }

    /// Dotted path from a root to this node.
    pub fn qualified_name(&self) -> String {
        qualified_name(self.member_of.as_deref().unwrap_or(""), &self.name)
    }

    /// Key under which this node is registered in the symbol table.
    pub fn symbol_key(&self) -> String {
        match self.data {
            NodeData::Method(_) => method_key(self.member_of.as_deref().unwrap_or(""), &self.name),
            _ => self.qualified_name(),
        }
    }

    /// Key under which this node is stored in its parent's child collection.
    pub fn local_key(&self) -> String {
        match self.data {
            NodeData::Method(_) => self.name.to_uppercase(),
            _ => self.name.clone(),
        }
    }

    pub fn is_root_namespace(&self) -> bool {
        matches!(self.data, NodeData::Namespace(_)) && self.member_of.as_deref() == Some("")
    }

    pub fn children(&self) -> Option<&Children> {
        match &self.data {
            NodeData::Namespace(ns) => Some(&ns.children),
            NodeData::Interface(interface) => Some(&interface.children),
            NodeData::Class(class) => Some(&class.children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Children> {
        match &mut self.data {
            NodeData::Namespace(ns) => Some(&mut ns.children),
            NodeData::Interface(interface) => Some(&mut interface.children),
            NodeData::Class(class) => Some(&mut class.children),
            _ => None,
        }
    }

    /// Implements (classes) or extends (interfaces) entries.
    pub fn interfaces(&self) -> Option<&BTreeMap<String, InterfaceRef>> {
        match &self.data {
            NodeData::Interface(interface) => Some(&interface.interfaces),
            NodeData::Class(class) => Some(&class.interfaces),
            _ => None,
        }
    }

    pub fn interfaces_mut(&mut self) -> Option<&mut BTreeMap<String, InterfaceRef>> {
        match &mut self.data {
            NodeData::Interface(interface) => Some(&mut interface.interfaces),
            NodeData::Class(class) => Some(&mut class.interfaces),
            _ => None,
        }
    }

    pub fn type_parameters(&self) -> &[TypeParameter] {
        match &self.data {
            NodeData::Interface(interface) => &interface.type_parameters,
            NodeData::Class(class) => &class.type_parameters,
            NodeData::Method(method) => &method.type_parameters,
            _ => &[],
        }
    }

    pub fn type_parameters_mut(&mut self) -> Option<&mut Vec<TypeParameter>> {
        match &mut self.data {
            NodeData::Interface(interface) => Some(&mut interface.type_parameters),
            NodeData::Class(class) => Some(&mut class.type_parameters),
            NodeData::Method(method) => Some(&mut method.type_parameters),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassData> {
        match &self.data {
            NodeData::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_interface(&self) -> Option<&InterfaceData> {
        match &self.data {
            NodeData::Interface(interface) => Some(interface),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodData> {
        match &self.data {
            NodeData::Method(method) => Some(method),
            _ => None,
        }
    }

    pub fn as_method_mut(&mut self) -> Option<&mut MethodData> {
        match &mut self.data {
            NodeData::Method(method) => Some(method),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&PropertyData> {
        match &self.data {
            NodeData::Property(property) => Some(property),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&EventData> {
        match &self.data {
            NodeData::Event(event) => Some(event),
            _ => None,
        }
    }
}

// ============================================================================
// Key Helpers
// ============================================================================

/// Join a parent path and a local name.
pub fn qualified_name(member_of: &str, name: &str) -> String {
    if member_of.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", member_of, name)
    }
}

/// Symbol table key for a method: `UPPER(memberOf).UPPER(name)`.
pub fn method_key(member_of: &str, name: &str) -> String {
    qualified_name(&member_of.to_uppercase(), &name.to_uppercase())
}

// ============================================================================
// Tests
// ============================================================================
