//! End-to-end pipeline tests: source tree on disk, in-memory SQLite.

use std::fs;
use std::path::Path;

use docgraph::cli::{build_into, BuildOptions};
use docgraph::error::{DocError, OutputErrorCode};
use docgraph::nodes::NodeKind;
use docgraph::persist::{open_in_memory, EntityTable};
use tempfile::TempDir;

const PLATFORM: &str = r#"
/**
 * The platform root. See {@link plat.App|the app}.
 * @namespace plat
 */

/**
 * Web helpers.
 * @namespace plat.web
 */

/**
 * A browser.
 * @interface IBrowser
 * @memberof plat.web
 * @extends plat.web.INever
 */
"#;

const APP: &str = r#"
/**
 * The application.
 * @class App
 * @memberof plat
 * @implements plat.web.IBrowser
 */

/**
 * Connect to a browser.
 * @method connect
 * @memberof plat.App
 * @param {plat.App} app The app.
 * @param {string} timeout? Milliseconds.
 * @returns {plat.web.IBrowser} The browser.
 */

/**
 * @method acquire
 * @memberof plat
 * @param {string} name
 */

/**
 * @method acquire
 * @memberof plat
 * @param {string} name
 * @param {number} count
 */

/**
 * Never attached.
 * @class Foo
 * @memberof missing.ns
 */
"#;

fn source_tree() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "src/platform.js", PLATFORM);
    write(tmp.path(), "src/app.ts", APP);
    write(tmp.path(), "README.md", "/** @class Ignored */");
    tmp
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn options(root: &Path) -> BuildOptions {
    BuildOptions::new(root)
        .with_link_base("https://docs.example.com/api")
        .with_version("2.1")
        .with_emit_graph(true)
}

#[test]
fn resolves_and_reports_without_persisting() {
    let tmp = source_tree();
    let response = build_into(&options(tmp.path()).with_persist(false), None).unwrap();

    assert_eq!(response.files, ["src/app.ts", "src/platform.js"]);
    assert_eq!(response.roots, ["plat"]);
    assert_eq!(response.nodes.namespaces, 2);
    assert_eq!(response.nodes.classes, 1);
    assert_eq!(response.nodes.methods, 3);
    assert_eq!(response.dropped.len(), 1);
    assert_eq!(response.dropped[0].name, "Foo");
    assert!(response.persisted.is_none());

    let graph = response.graph.unwrap();
    let plat = graph.root_id("plat").unwrap();
    assert_eq!(graph.methods_named(plat, "acquire").len(), 2);

    let connect = graph.node(graph.find("plat.App.connect").unwrap()).unwrap();
    let method = connect.as_method().unwrap();
    let browser = graph.find("plat.web.IBrowser").unwrap();
    assert_eq!(method.return_type_interface(), Some(browser));
    assert!(method.parameter("timeout").unwrap().optional);
}

#[test]
fn persists_every_attached_node() {
    let tmp = source_tree();
    let conn = open_in_memory().unwrap();
    let response = build_into(&options(tmp.path()), Some(conn)).unwrap();

    let summary = response.persisted.unwrap();
    assert_eq!(summary.label, "2.1");
    assert_eq!(summary.created, response.nodes.total());
    assert_eq!(summary.parameters, 5);
    assert_eq!(summary.placeholder_links, 1);

    let graph = response.graph.unwrap();
    for id in graph.walk() {
        let node = graph.node(id).unwrap();
        assert!(node.saved, "{} was not saved", node.qualified_name());
    }
    let foo = graph
        .nodes()
        .find(|(_, node)| node.name == "Foo")
        .map(|(_, node)| node)
        .unwrap();
    assert!(!foo.saved);
    assert!(foo.id.is_none());
}

#[test]
fn stored_descriptions_have_links_rewritten() {
    let tmp = source_tree();
    let mut conn = open_in_memory().unwrap();
    let mut graph = {
        let response = build_into(&options(tmp.path()).with_persist(false), None).unwrap();
        response.graph.unwrap()
    };

    let persister = docgraph::persist::GraphPersister::new(docgraph::persist::VersionInfo {
        label: "2.1".to_string(),
        source_hash: "hash".to_string(),
        link_base: Some("https://docs.example.com/api".to_string()),
    })
    .unwrap();
    let summary = persister.persist(&mut conn, &mut graph).unwrap();

    let plat = graph.root("plat").unwrap();
    assert!(plat.description.contains("{@link plat.App|the app}"));
    let row = EntityTable::Namespaces
        .read(&conn, plat.id.unwrap())
        .unwrap();
    assert_eq!(
        row.description,
        "The platform root. See <a href=\"https://docs.example.com/api/plat.App\">the app</a>."
    );
    assert_eq!(
        docgraph::persist::count_rows(&conn, NodeKind::Method, summary.version_id).unwrap(),
        3
    );
}

#[test]
fn namespace_with_unknown_parent_fails_with_code_3() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "bad.js",
        "/**\n * @namespace web\n * @memberof plat.missing\n */\n",
    );

    let err = build_into(&BuildOptions::new(tmp.path()).with_persist(false), None).unwrap_err();
    match &err {
        DocError::Resolution(resolution) => {
            assert_eq!(resolution.name, "web");
            assert_eq!(resolution.member_of.as_deref(), Some("plat.missing"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(OutputErrorCode::from(&err).code(), 3);
}

#[test]
fn namespace_under_a_property_fails_with_code_3() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "plat.js",
        "/**\n * @namespace plat\n */\n\
         /**\n * @property {string} title\n * @memberof plat\n */\n\
         /**\n * @namespace sub\n * @memberof plat.title\n */\n\
         /**\n * @class Inner\n * @memberof plat.title.sub\n */\n",
    );

    let err = build_into(&BuildOptions::new(tmp.path()).with_persist(false), None).unwrap_err();
    match &err {
        DocError::Resolution(resolution) => {
            assert_eq!(resolution.name, "sub");
            assert_eq!(resolution.member_of.as_deref(), Some("plat.title"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(OutputErrorCode::from(&err).code(), 3);
}

#[test]
fn unterminated_comment_names_the_file() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "broken.js", "/** @namespace plat\n");

    let err = build_into(&BuildOptions::new(tmp.path()).with_persist(false), None).unwrap_err();
    match err {
        DocError::ExtractionError { file, .. } => assert_eq!(file, "broken.js"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn empty_tree_is_invalid_arguments() {
    let tmp = TempDir::new().unwrap();
    let err = build_into(&BuildOptions::new(tmp.path()).with_persist(false), None).unwrap_err();
    assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
}

#[test]
fn missing_source_is_file_not_found() {
    let tmp = TempDir::new().unwrap();
    let err = build_into(
        &BuildOptions::new(tmp.path().join("absent")).with_persist(false),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, DocError::FileNotFound { .. }));
}
