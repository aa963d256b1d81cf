//! Integration tests for sgraph
//!
//! These tests drive the loader, the filtering engine, and the writers together.

use std::path::Path;

use sgraph::{
    load_model, save_model, AttributePolicy, Attributes, FilterOptions, Graph, LoaderConfig,
    ReachabilityPolicy, WriteOptions,
};
use tempfile::TempDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new("sgraph_core=debug,sgraph_formats=debug"))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn write_deps_fixture(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("shop.txt");
    std::fs::write(
        &path,
        "\
/shop/api/orders.py:/shop/db/models.py:import
/shop/api/orders.py:/shop/db/session.py:import
/shop/db/models.py:/vendor/orm/base.py:inherits
/shop/web/views.py:/shop/api/orders.py:call:render
@/shop:type:repository
@/shop/api/orders.py:loc:210
",
    )
    .unwrap();
    path
}

fn paths(graph: &Graph) -> Vec<String> {
    let mut paths: Vec<String> = graph
        .descendants(graph.root())
        .into_iter()
        .map(|id| graph.path(id))
        .collect();
    paths.sort();
    paths
}

/// Load deps text, filter around one package, save as zipped XML, reload.
#[test]
fn test_load_filter_save_reload() -> anyhow::Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let model = load_model(&write_deps_fixture(dir.path()), &LoaderConfig::default())?;
    model.verify()?;

    let api = model.find_element("/shop/api").unwrap();
    let options = FilterOptions::new(
        ReachabilityPolicy::Direct,
        ReachabilityPolicy::Ignore,
        AttributePolicy::IncludeCopy,
    );
    let subgraph = model.filter(api, &options)?;

    let out = dir.path().join("api.xml.zip");
    let report = save_model(&subgraph, &out, &WriteOptions::default())?;
    assert!(report.is_clean());

    let reloaded = load_model(&out, &LoaderConfig::default())?;
    assert_eq!(
        paths(&reloaded),
        vec![
            "/shop",
            "/shop/api",
            "/shop/api/orders.py",
            "/shop/db",
            "/shop/db/models.py",
            "/shop/db/session.py",
        ]
    );
    assert_eq!(reloaded.association_count(), 2);
    let orders = reloaded.find_element("/shop/api/orders.py").unwrap();
    assert_eq!(reloaded.attrs(orders).unwrap().get_str("loc"), Some("210"));
    let shop = reloaded.find_element("/shop").unwrap();
    assert_eq!(reloaded.element_type(shop), Some("repository"));
    Ok(())
}

/// A model survives conversion through every format unchanged.
#[test]
fn test_format_conversion_chain() -> anyhow::Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let original = load_model(&write_deps_fixture(dir.path()), &LoaderConfig::default())?;

    let xml = dir.path().join("shop.xml");
    save_model(&original, &xml, &WriteOptions::default())?;
    let from_xml = load_model(&xml, &LoaderConfig::default())?;

    let deps = dir.path().join("again.txt");
    save_model(&from_xml, &deps, &WriteOptions::default())?;
    let from_deps = load_model(&deps, &LoaderConfig::default())?;

    assert_eq!(paths(&from_deps), paths(&original));
    assert_eq!(from_deps.deptype_counts(), original.deptype_counts());
    let views = from_deps.find_element("/shop/web/views.py").unwrap();
    let outgoing = from_deps.outgoing(views);
    assert_eq!(outgoing[0].attrs.get_str("detail"), Some("render"));
    Ok(())
}

/// Merging two loaded models through the tree API keeps every association.
#[test]
fn test_merge_loaded_models() -> anyhow::Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let mut model = load_model(&write_deps_fixture(dir.path()), &LoaderConfig::default())?;

    // A vendored copy of the ORM that should fold into /vendor/orm
    let copy = model.create_or_get_element("/third_party/orm/base.py");
    let session = model.find_element("/shop/db/session.py").unwrap();
    model.add_association(session, copy, "import", Attributes::new())?;

    let vendor = model.find_element("/vendor/orm").unwrap();
    let third_party = model.find_element("/third_party/orm").unwrap();
    model.merge(vendor, third_party)?;
    model.verify()?;

    let base = model.find_element("/vendor/orm/base.py").unwrap();
    assert_eq!(model.incoming(base).len(), 2);
    assert!(model.find_element("/third_party/orm").is_none());
    Ok(())
}
