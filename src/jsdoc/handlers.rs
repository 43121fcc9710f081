//! Node construction from tag records, one handler per entity kind.
//!
//! Handlers are pure: they read a [`TagRecord`] and return a [`Node`] with every field
//! default-filled. Cross-references stay strings; the resolvers link them later.
//!
//! ## Parent and name
//!
//! `@memberof` (any case) names the parent. Without it, a dotted kind-tag name such as
//! `@class plat.App` is split at the last `.`. A namespace with neither is a root
//! (`memberOf = ""`); any other kind keeps `memberOf` undefined and is dropped during
//! resolution.

use tracing::debug;

use docgraph_core::context::ResolutionContext;
use docgraph_core::error::GraphError;
use docgraph_core::nodes::{Node, NodeKind, Parameter, TypeParameter, Visibility};

use super::tags::{parse_typed, split_type, TagRecord};

/// Builds one kind of node from a tag record.
pub trait NodeHandler: Sync {
    fn kind(&self) -> NodeKind;

    fn build(&self, record: &TagRecord) -> Node;
}

/// The handler for a kind. Parameters and type parameters have none; they are built inline by
/// their declaring node's handler.
pub fn handler_for(kind: NodeKind) -> Option<&'static dyn NodeHandler> {
    match kind {
        NodeKind::Namespace => Some(&NamespaceHandler),
        NodeKind::Interface => Some(&InterfaceHandler),
        NodeKind::Class => Some(&ClassHandler),
        NodeKind::Method => Some(&MethodHandler),
        NodeKind::Property => Some(&PropertyHandler),
        NodeKind::Event => Some(&EventHandler),
        NodeKind::Parameter | NodeKind::TypeParameter => None,
    }
}

/// Build and register a node for every record that declares a kind.
///
/// Records without a kind tag are skipped. Returns the number of nodes registered.
pub fn populate<'a>(
    ctx: &mut ResolutionContext,
    records: impl IntoIterator<Item = &'a TagRecord>,
) -> Result<usize, GraphError> {
    let mut added = 0;
    for record in records {
        let Some(handler) = record.kind().and_then(handler_for) else {
            debug!(line = record.line, "record declares no kind, skipped");
            continue;
        };
        let node = handler.build(record);
        debug!(
            line = record.line,
            kind = %handler.kind(),
            name = %node.name,
            member_of = node.member_of.as_deref().unwrap_or("<undefined>"),
            "node constructed"
        );
        ctx.add(node)?;
        added += 1;
    }
    Ok(added)
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct NamespaceHandler;

impl NodeHandler for NamespaceHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Namespace
    }

    fn build(&self, record: &TagRecord) -> Node {
        let (name, member_of) = declared_name(record, first_word(kind_text(record, &["namespace"])));
        let node = Node::namespace(name).with_member_of(member_of.unwrap_or_default());
        apply_common(node, record)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InterfaceHandler;

impl NodeHandler for InterfaceHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Interface
    }

    fn build(&self, record: &TagRecord) -> Node {
        let (name, member_of) = declared_name(record, first_word(kind_text(record, &["interface"])));
        let mut node = with_member_of(Node::interface(name), member_of);
        for tag in record.tags("extends") {
            if let Some(parent) = type_ref(&tag.text) {
                node = node.with_extends(parent);
            }
        }
        node = with_type_parameters(node, record);
        apply_common(node, record)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClassHandler;

impl NodeHandler for ClassHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Class
    }

    fn build(&self, record: &TagRecord) -> Node {
        let (name, member_of) = declared_name(record, first_word(kind_text(record, &["class"])));
        let mut node = with_member_of(Node::class(name), member_of);

        let parent = record
            .text("extends")
            .or_else(|| record.text("augments"))
            .and_then(type_ref);
        if let Some(parent) = parent {
            node = node.with_extends(parent);
        }
        for tag in record.tags("implements") {
            if let Some(interface) = type_ref(&tag.text) {
                node = node.with_interface(interface);
            }
        }
        node = with_type_parameters(node, record);
        apply_common(node, record)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MethodHandler;

impl NodeHandler for MethodHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Method
    }

    fn build(&self, record: &TagRecord) -> Node {
        let raw = first_word(kind_text(record, &["method", "function"]));
        let (name, member_of) = declared_name(record, raw);
        let mut node = with_member_of(Node::method(name), member_of);

        for tag in record.tags("param") {
            if let Some(parameter) = parameter(&tag.text) {
                node = node.with_parameter(parameter);
            }
        }

        let returns = record.text("returns").or_else(|| record.text("return"));
        if let Some(text) = returns {
            let (type_name, description) = split_type(text);
            if let Some(type_name) = type_name {
                node = node.with_return_type(type_name);
            }
            node = node.with_return_description(description);
        }

        node = with_type_parameters(node, record);
        apply_common(node, record)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PropertyHandler;

impl NodeHandler for PropertyHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Property
    }

    fn build(&self, record: &TagRecord) -> Node {
        let typed = parse_typed(kind_text(record, &["property"]));
        let (name, member_of) = declared_name(record, typed.name.as_deref().unwrap_or(""));
        let mut node = with_member_of(Node::property(name), member_of);

        let type_name = record
            .text("type")
            .and_then(|text| split_type(text).0)
            .or(typed.type_name);
        if let Some(type_name) = type_name {
            node = node.with_type(type_name);
        }
        if record.description.is_empty() && !typed.rest.is_empty() {
            node = node.with_description(typed.rest);
        }
        apply_common(node, record)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EventHandler;

impl NodeHandler for EventHandler {
    fn kind(&self) -> NodeKind {
        NodeKind::Event
    }

    fn build(&self, record: &TagRecord) -> Node {
        let (name, member_of) = declared_name(record, first_word(kind_text(record, &["event"])));
        let mut node = with_member_of(Node::event(name), member_of);
        if let Some(type_name) = record.text("type").and_then(|text| split_type(text).0) {
            node = node.with_type(type_name);
        }
        apply_common(node, record)
    }
}

// ============================================================================
// Field Helpers
// ============================================================================

/// Text of the first tag among `titles`, or "" when the record has none.
fn kind_text<'a>(record: &'a TagRecord, titles: &[&str]) -> &'a str {
    record
        .tags
        .iter()
        .find(|tag| titles.iter().any(|t| tag.title.eq_ignore_ascii_case(t)))
        .map(|tag| tag.text.as_str())
        .unwrap_or("")
}

fn first_word(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

/// Resolve the local name and `memberOf` from `@name`, `@memberof` and a dotted raw name.
fn declared_name(record: &TagRecord, raw: &str) -> (String, Option<String>) {
    let raw = record
        .text("name")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(raw);
    let explicit = record.text("memberof").map(|text| first_word(text).to_string());

    match raw.rsplit_once('.') {
        Some((prefix, local)) if !local.is_empty() => {
            (local.to_string(), explicit.or_else(|| Some(prefix.to_string())))
        }
        _ => (raw.to_string(), explicit),
    }
}

fn with_member_of(node: Node, member_of: Option<String>) -> Node {
    match member_of {
        Some(member_of) => node.with_member_of(member_of),
        None => node,
    }
}

/// `{plat.IBrowser}` or a bare `plat.IBrowser`.
fn type_ref(text: &str) -> Option<String> {
    let (type_name, rest) = split_type(text);
    type_name
        .or_else(|| Some(first_word(&rest).to_string()))
        .filter(|name| !name.is_empty())
}

/// `{T} name desc`, `{T} name? desc` or `{T} [name=default] desc`.
fn parameter(text: &str) -> Option<Parameter> {
    let typed = parse_typed(text);
    let raw = typed.name?;
    let raw = match raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        Some(inner) => {
            let name = inner.split('=').next().unwrap_or(inner);
            format!("{name}?")
        }
        None => raw,
    };

    let mut parameter = Parameter::new(&raw).with_description(typed.rest);
    if let Some(type_name) = typed.type_name {
        parameter = parameter.with_type(type_name);
    }
    Some(parameter)
}

fn with_type_parameters(mut node: Node, record: &TagRecord) -> Node {
    let tags = record.tags("typeparam").chain(record.tags("template"));
    for tag in tags {
        let typed = parse_typed(&tag.text);
        let Some(name) = typed.name else {
            continue;
        };
        let mut param = TypeParameter::new(name).with_description(typed.rest);
        if let Some(constraint) = typed.type_name {
            param = param.with_constraint(constraint);
        }
        node = node.with_type_parameter(param);
    }
    node
}

fn is_false(text: Option<&str>) -> bool {
    text.is_some_and(|t| first_word(t).eq_ignore_ascii_case("false"))
}

/// Description, remarks, visibility and the published/exported flags.
fn apply_common(mut node: Node, record: &TagRecord) -> Node {
    let description = record
        .text("description")
        .filter(|text| !text.is_empty())
        .unwrap_or(record.description.as_str());
    if !description.is_empty() {
        node = node.with_description(description);
    }
    if let Some(remarks) = record.text("remarks") {
        node = node.with_remarks(remarks);
    }

    let private = record.has("private")
        || record
            .text("access")
            .is_some_and(|access| first_word(access) == "private");
    if private {
        node = node.with_visibility(Visibility::Private);
    }

    node.with_published(!is_false(record.text("published")))
        .with_exported(!is_false(record.text("exported")))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsdoc::tags::extract_records;
    use docgraph_core::nodes::InterfaceRef;

    fn record(text: &str) -> TagRecord {
        extract_records(text).unwrap().remove(0)
    }

    fn build(text: &str) -> Node {
        let record = record(text);
        let handler = record.kind().and_then(handler_for).unwrap();
        handler.build(&record)
    }

    mod naming {
        use super::*;

        #[test]
        fn namespace_without_parent_is_root() {
            let node = build("/** @namespace plat */");
            assert_eq!(node.name, "plat");
            assert_eq!(node.member_of.as_deref(), Some(""));
            assert!(node.is_root_namespace());
        }

        #[test]
        fn dotted_name_is_split() {
            let node = build("/** @namespace plat.web */");
            assert_eq!(node.name, "web");
            assert_eq!(node.member_of.as_deref(), Some("plat"));
        }

        #[test]
        fn explicit_member_of_wins() {
            let node = build("/**\n * @class App\n * @memberOf plat.ui\n */");
            assert_eq!(node.name, "App");
            assert_eq!(node.qualified_name(), "plat.ui.App");
        }

        #[test]
        fn class_without_parent_stays_undefined() {
            let node = build("/** @class Lonely */");
            assert_eq!(node.member_of, None);
        }

        #[test]
        fn unnamed_method_is_call_signature() {
            let node = build("/**\n * @method\n * @memberof plat.ICallable\n */");
            assert_eq!(node.name, "()");
        }
    }

    mod common_fields {
        use super::*;

        #[test]
        fn defaults() {
            let node = build("/** Ready.\n * @event ready\n * @memberof plat */");
            assert_eq!(node.description, "Ready.");
            assert_eq!(node.visibility, Visibility::Public);
            assert!(node.published);
            assert!(node.exported);
        }

        #[test]
        fn explicit_flags() {
            let node = build(
                "/**\n * Ignored.\n * @class Hidden\n * @memberof plat\n * @description Real text.\n * @remarks See {@link plat.App}.\n * @private\n * @published false\n * @exported false\n */",
            );
            assert_eq!(node.description, "Real text.");
            assert_eq!(node.remarks, "See {@link plat.App}.");
            assert_eq!(node.visibility, Visibility::Private);
            assert!(!node.published);
            assert!(!node.exported);
        }
    }

    mod kinds {
        use super::*;

        #[test]
        fn class_cross_references() {
            let node = build(
                "/**\n * @class App\n * @memberof plat\n * @extends {plat.Base}\n * @implements {plat.IApp}\n * @implements plat.IDisposable\n * @typeparam {plat.Model} T The model.\n */",
            );
            let class = node.as_class().unwrap();
            assert_eq!(class.extends_name.as_deref(), Some("plat.Base"));
            assert_eq!(
                class.interfaces["plat.IApp"],
                InterfaceRef::placeholder("plat.IApp")
            );
            assert!(class.interfaces.contains_key("plat.IDisposable"));
            assert_eq!(class.type_parameters[0].name, "T");
            assert_eq!(class.type_parameters[0].constraint.as_deref(), Some("plat.Model"));
        }

        #[test]
        fn interface_extends_many() {
            let node = build(
                "/**\n * @interface IBrowser\n * @memberof plat.web\n * @extends {plat.IDisposable}\n * @extends {plat.IEvents}\n */",
            );
            let interfaces = node.interfaces().unwrap();
            assert_eq!(interfaces.len(), 2);
            assert!(interfaces.values().all(|i| !i.is_resolved()));
        }

        #[test]
        fn method_signature() {
            let node = build(
                "/**\n * @method connect\n * @memberof plat.App\n * @param {string} url The address.\n * @param {number} retries? Attempts.\n * @param {plat.Options} [options={}] Settings.\n * @returns {plat.web.IBrowser} The browser.\n */",
            );
            let method = node.as_method().unwrap();
            let names: Vec<_> = method.parameters.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, ["url", "retries", "options"]);
            assert!(!method.parameters[0].optional);
            assert!(method.parameters[1].optional);
            assert!(method.parameters[2].optional);
            assert_eq!(method.parameters[2].type_name.as_deref(), Some("plat.Options"));
            assert_eq!(method.return_type_name.as_deref(), Some("plat.web.IBrowser"));
            assert_eq!(method.return_description, "The browser.");
        }

        #[test]
        fn property_type() {
            let node = build("/** @property {string} title The window title.\n * @memberof plat.App */");
            assert_eq!(node.name, "title");
            assert_eq!(node.as_property().unwrap().type_name.as_deref(), Some("string"));
            assert_eq!(node.description, "The window title.");

            let node = build("/** @property title\n * @memberof plat.App\n * @type {plat.Title} */");
            assert_eq!(node.as_property().unwrap().type_name.as_deref(), Some("plat.Title"));
        }

        #[test]
        fn event_payload() {
            let node = build("/** @event changed\n * @memberof plat.App\n * @type {plat.ChangeEvent} */");
            assert_eq!(node.kind(), NodeKind::Event);
            assert_eq!(node.as_event().unwrap().type_name.as_deref(), Some("plat.ChangeEvent"));
        }
    }

    mod populate_context {
        use super::*;

        #[test]
        fn registers_kinded_records_only() {
            let records = extract_records(
                "/** Prose only. */\n/** @namespace plat */\n/** @class App\n * @memberof plat */",
            )
            .unwrap();
            let mut ctx = ResolutionContext::new();
            assert_eq!(populate(&mut ctx, &records).unwrap(), 2);
            assert_eq!(ctx.len(), 2);
            assert!(ctx.symbols().contains("plat.App"));
        }

        #[test]
        fn duplicate_across_kinds_is_rejected() {
            let records = extract_records(
                "/** @class Thing\n * @memberof plat */\n/** @property Thing\n * @memberof plat */",
            )
            .unwrap();
            let mut ctx = ResolutionContext::new();
            let err = populate(&mut ctx, &records).unwrap_err();
            assert!(matches!(err, GraphError::DuplicateQualifiedName { .. }));
        }

        #[test]
        fn every_kind_has_a_handler() {
            for kind in [
                NodeKind::Namespace,
                NodeKind::Interface,
                NodeKind::Class,
                NodeKind::Method,
                NodeKind::Property,
                NodeKind::Event,
            ] {
                assert_eq!(handler_for(kind).map(|h| h.kind()), Some(kind));
            }
            assert!(handler_for(NodeKind::Parameter).is_none());
        }
    }
}
