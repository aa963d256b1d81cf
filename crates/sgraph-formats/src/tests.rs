//! Unit tests for sgraph-formats

use std::io::Cursor;

use sgraph_core::{AttrValue, Attributes, Graph, StructuralError};
use tempfile::TempDir;

use crate::archive;
use crate::config::LoaderConfig;
use crate::deps::{read_deps_str, to_deps_string};
use crate::error::FormatError;
use crate::loader::{load_model, save_model, ModelFormat, MODEL_PATH_ATTR};
use crate::options::{AssociationTypeRules, AttributeRules, ParseOptions, WriteOptions};
use crate::xml::{read_xml_str, to_xml_string};

fn sample_model() -> Graph {
    let mut graph = Graph::new();
    let main = graph.create_or_get_element("/project/src/main.c");
    let util = graph.create_or_get_element("/project/src/util.c");
    let header = graph.create_or_get_element("/project/include/util.h");
    graph.create_or_get_element("/project/docs");

    let project = graph.find_element("/project").unwrap();
    graph.set_element_type(project, "repository").unwrap();
    graph.set_element_type(main, "file").unwrap();
    graph.set_attribute(main, "loc", 120_i64).unwrap();
    graph.set_attribute(main, "owners", vec!["bob", "alice"]).unwrap();
    graph.set_attribute(util, "note", "uses <stdio.h> & \"quotes\"\nsecond line").unwrap();
    graph.set_attribute(util, "2nd_pass", "yes").unwrap();

    graph
        .add_association(main, util, "function_ref", Attributes::new())
        .unwrap();
    graph.add_association(main, header, "inc", Attributes::new()).unwrap();
    let line: Attributes = [("line", AttrValue::from("12"))].into_iter().collect();
    graph.add_association(util, header, "inc", line).unwrap();
    graph
}

/// Attributes of every element as rendered strings, for comparing models
/// across formats that do not keep value kinds.
fn rendered_attrs(graph: &Graph) -> Vec<String> {
    let mut lines = Vec::new();
    for id in graph.descendants(graph.root()) {
        let path = graph.path(id);
        if let Some(t) = graph.element_type(id) {
            lines.push(format!("{path} type={t}"));
        }
        for (key, value) in graph.attrs(id).unwrap().iter() {
            if let Some(rendered) = value.render() {
                lines.push(format!("{path} {key}={rendered}"));
            }
        }
    }
    lines.sort();
    lines
}

fn edges(graph: &Graph) -> Vec<String> {
    let mut lines: Vec<String> = graph
        .associations()
        .into_iter()
        .map(|a| {
            let attrs: Vec<String> = a.attrs.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!(
                "{} -> {} ({}) [{}]",
                graph.path(a.from),
                graph.path(a.to),
                a.deptype,
                attrs.join(",")
            )
        })
        .collect();
    lines.sort();
    lines
}

fn element_paths(graph: &Graph) -> Vec<String> {
    let mut paths: Vec<String> = graph
        .descendants(graph.root())
        .into_iter()
        .map(|id| graph.path(id))
        .collect();
    paths.sort();
    paths
}

// ── XML ─────────────────────────────────────────────────────

#[test]
fn test_xml_round_trip() {
    let graph = sample_model();
    let (document, report) = to_xml_string(&graph, &WriteOptions::default()).unwrap();
    assert!(report.is_clean());
    assert!(document.contains("<model version=\"2.1\">"));
    assert!(document.contains("&lt;stdio.h&gt; &amp; &quot;quotes&quot;&#10;second line"));
    assert!(document.contains("_2nd_pass=\"yes\""));
    assert!(document.contains("owners=\"alice;bob\""));

    let parsed = read_xml_str(&document, "sample.xml", &ParseOptions::default()).unwrap();
    assert_eq!(element_paths(&parsed), element_paths(&graph));
    assert_eq!(rendered_attrs(&parsed), rendered_attrs(&graph));
    assert_eq!(edges(&parsed), edges(&graph));
    parsed.verify().unwrap();
}

#[test]
fn test_xml_ids_only_on_referenced_elements() {
    let graph = sample_model();
    let (document, _) = to_xml_string(&graph, &WriteOptions::default()).unwrap();
    assert_eq!(document.matches(" i=\"").count(), 2);
    // Two inc targets from different sources stay separate records
    assert_eq!(document.matches("<r ").count(), 3);
}

#[test]
fn test_xml_groups_targets_with_identical_type_and_attrs() {
    let mut graph = Graph::new();
    let a = graph.create_or_get_element("/a");
    for target in ["/b", "/c", "/d"] {
        let to = graph.create_or_get_element(target);
        graph.add_association(a, to, "uses", Attributes::new()).unwrap();
    }
    let (document, _) = to_xml_string(&graph, &WriteOptions::default()).unwrap();
    assert!(document.contains("<r r=\"1,2,3\" t=\"uses\"/>"));

    let parsed = read_xml_str(&document, "grouped.xml", &ParseOptions::default()).unwrap();
    assert_eq!(parsed.association_count(), 3);
}

#[test]
fn test_xml_reads_legacy_attribute_records() {
    let document = r#"<?xml version="1.0" encoding="UTF-8"?>
<model version="2.1">
  <elements>
    <e n="lib" t="dir">
      <a n="owner" v="team-a"/>
      <e i="7" n="x.c"/>
      <e n="y.c">
        <r r="7" t="call">
          <a n="weight" v="3"/>
        </r>
      </e>
    </e>
  </elements>
</model>
"#;
    let graph = read_xml_str(document, "legacy.xml", &ParseOptions::default()).unwrap();
    let lib = graph.find_element("/lib").unwrap();
    assert_eq!(graph.element_type(lib), Some("dir"));
    assert_eq!(graph.attrs(lib).unwrap().get_str("owner"), Some("team-a"));

    let y = graph.find_element("/lib/y.c").unwrap();
    let outgoing = graph.outgoing(y);
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].deptype, "call");
    assert_eq!(outgoing[0].attrs.get_str("weight"), Some("3"));
    assert_eq!(graph.path(outgoing[0].to), "/lib/x.c");
}

#[test]
fn test_xml_forward_reference_resolves() {
    let document = r#"<model version="2.1"><elements>
        <e n="a"><r r="2" t="uses"/></e>
        <e i="2" n="b"/>
    </elements></model>"#;
    let graph = read_xml_str(document, "forward.xml", &ParseOptions::default()).unwrap();
    assert_eq!(edges(&graph), vec!["/a -> /b (uses) []"]);
}

#[test]
fn test_xml_unresolved_reference_is_fatal() {
    let document = r#"<model version="2.1"><elements>
        <e n="a"><e n="b"><r r="99" t="uses"/></e></e>
    </elements></model>"#;
    let err = read_xml_str(document, "broken.xml", &ParseOptions::default()).unwrap_err();
    match err {
        FormatError::UnresolvedReference {
            source_name,
            element_path,
            id,
        } => {
            assert_eq!(source_name, "broken.xml");
            assert_eq!(element_path, "/a/b");
            assert_eq!(id, "99");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_xml_malformed_document() {
    let err = read_xml_str("<model><elements><e n=\"a\"></x>", "bad.xml", &ParseOptions::default())
        .unwrap_err();
    assert!(matches!(err, FormatError::Xml { .. }));
}

#[test]
fn test_xml_duplicate_names_merge_unless_strict() {
    let document = r#"<model version="2.1"><elements>
        <e n="a" x="1"/>
        <e n="a" y="2"/>
    </elements></model>"#;
    let graph = read_xml_str(document, "dup.xml", &ParseOptions::default()).unwrap();
    assert_eq!(graph.element_count(), 1);
    let a = graph.find_element("/a").unwrap();
    assert_eq!(graph.attrs(a).unwrap().len(), 2);

    let strict = ParseOptions {
        strict_names: true,
        ..ParseOptions::default()
    };
    let err = read_xml_str(document, "/data/models/dup.xml", &strict).unwrap_err();
    assert!(matches!(
        err,
        FormatError::InvalidModel { ref source_name, source: StructuralError::DuplicateChild { .. } }
            if source_name == "/data/models/dup.xml"
    ));
    assert!(err.to_string().contains("/data/models/dup.xml"));
}

#[test]
fn test_xml_parse_rules() {
    let document = r#"<model version="2.1"><elements>
        <e n="a" hash="abc" loc="10"><r r="1,2" t="dynamic_function_ref" count="4"/><r r="2" t="inc" count="1"/></e>
        <e i="1" n="b"/>
        <e i="2" n="c"/>
    </elements></model>"#;
    let options = ParseOptions {
        association_types: AssociationTypeRules::new(["IGNORE dynamic_function_ref"]),
        element_attributes: AttributeRules::new(["IGNORE hash"]),
        association_attributes: AttributeRules::new(["IGNORE *"]),
        ..ParseOptions::default()
    };
    let graph = read_xml_str(document, "rules.xml", &options).unwrap();
    assert_eq!(edges(&graph), vec!["/a -> /c (inc) []"]);
    let a = graph.find_element("/a").unwrap();
    assert!(graph.attrs(a).unwrap().get("hash").is_none());
    assert_eq!(graph.attrs(a).unwrap().get_str("loc"), Some("10"));

    let only_root = ParseOptions {
        only_root: true,
        ..ParseOptions::default()
    };
    let graph = read_xml_str(document, "rules.xml", &only_root).unwrap();
    assert_eq!(element_paths(&graph), vec!["/a"]);
}

#[test]
fn test_rule_matching() {
    let ignore = AssociationTypeRules::new(["IGNORE inc"]);
    assert!(!ignore.accepts("inc"));
    assert!(ignore.accepts("call"));

    let accept = AssociationTypeRules::new(["IGNORE call", "inc"]);
    assert!(accept.accepts("inc"));
    assert!(!accept.accepts("call"));
    assert!(!accept.accepts("other"));

    assert!(!AssociationTypeRules::new(["IGNORE *"]).accepts("inc"));
    assert!(AssociationTypeRules::default().accepts(""));

    let attrs = AttributeRules::new(["loc", "hash"]);
    assert!(attrs.accepts("loc"));
    assert!(!attrs.accepts("owner"));
    assert!(AttributeRules::new(["*", "IGNORE hash"]).accepts("owner"));
    assert!(!AttributeRules::new(["*", "IGNORE hash"]).accepts("hash"));
}

#[test]
fn test_xml_unencodable_attributes_are_dropped_and_reported() {
    let mut graph = Graph::new();
    let a = graph.create_or_get_element("/a");
    graph.set_attribute(a, "bad name", "x").unwrap();
    graph.set_attribute(a, "bell", "ring\u{7}").unwrap();
    graph.set_attribute(a, "_tmp_attr_scratch", "skip").unwrap();
    let mut scratch = std::collections::BTreeMap::new();
    scratch.insert("k".to_string(), "v".to_string());
    graph.set_attribute(a, "cache", AttrValue::Map(scratch)).unwrap();
    graph.set_attribute(a, "ok", "fine").unwrap();

    let (document, report) = to_xml_string(&graph, &WriteOptions::default()).unwrap();
    let dropped: Vec<&str> = report.dropped.iter().map(|e| e.attribute.as_str()).collect();
    assert_eq!(dropped, vec!["bad name", "bell"]);
    assert!(report.dropped.iter().all(|e| e.path == "/a"));
    assert!(document.contains("ok=\"fine\""));
    assert!(!document.contains("_tmp_attr_scratch"));
    assert!(!document.contains("cache"));

    let err = to_xml_string(&graph, &WriteOptions { strict: true }).unwrap_err();
    assert!(matches!(err, FormatError::AttributeEncoding(_)));
}

#[test]
fn test_xml_reserved_association_attribute_names() {
    let mut graph = Graph::new();
    let a = graph.create_or_get_element("/a");
    let b = graph.create_or_get_element("/b");
    let attrs: Attributes = [("r", AttrValue::from("x")), ("kind", AttrValue::from("y"))]
        .into_iter()
        .collect();
    graph.add_association(a, b, "uses", attrs).unwrap();

    let (document, report) = to_xml_string(&graph, &WriteOptions::default()).unwrap();
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].attribute, "r");
    assert!(document.contains("<r r=\"1\" t=\"uses\" kind=\"y\"/>"));
}

#[test]
fn test_xml_associations_touching_the_root_are_reported() -> anyhow::Result<()> {
    let mut graph = Graph::new();
    let root = graph.root();
    let b = graph.create_or_get_element("/a/b");
    let c = graph.create_or_get_element("/a/c");
    graph.add_association(b, root, "uses", Attributes::new())?;
    graph.add_association(root, c, "owns", Attributes::new())?;
    graph.add_association(b, c, "uses", Attributes::new())?;

    let (document, report) = to_xml_string(&graph, &WriteOptions::default())?;
    assert!(!report.is_clean());
    let skipped: Vec<&str> = report.skipped.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(skipped, vec!["/a/b -> / (uses)", "/ -> /a/c (owns)"]);
    assert!(report.skipped.iter().all(|e| e.what == "association"));

    let reparsed = read_xml_str(&document, "rooted.xml", &ParseOptions::default())?;
    assert_eq!(edges(&reparsed), vec!["/a/b -> /a/c (uses) []"]);

    let err = to_xml_string(&graph, &WriteOptions { strict: true }).unwrap_err();
    assert!(matches!(err, FormatError::StructureEncoding(ref e) if e.path == "/a/b -> / (uses)"));
    Ok(())
}

#[test]
fn test_streaming_writers_match_string_rendering() {
    let graph = sample_model();
    let options = WriteOptions::default();

    let mut xml_out = Vec::new();
    crate::xml::write_xml(&graph, &mut xml_out, "mem.xml", &options).unwrap();
    assert_eq!(String::from_utf8(xml_out).unwrap(), to_xml_string(&graph, &options).unwrap().0);

    let mut deps_out = Vec::new();
    let report = crate::deps::write_deps(&graph, &mut deps_out, "mem.txt", &options).unwrap();
    assert!(report.is_clean());
    assert_eq!(String::from_utf8(deps_out).unwrap(), to_deps_string(&graph, &options).unwrap().0);
}

// ── Zipped XML ──────────────────────────────────────────────

#[test]
fn test_archive_member_round_trip() {
    let buffer = archive::write_member(Cursor::new(Vec::new()), "model.xml", b"<model/>", "mem").unwrap();
    let contents = archive::read_first_member(Cursor::new(buffer.into_inner()), "mem").unwrap();
    assert_eq!(contents, b"<model/>");
    assert_eq!(archive::member_name(std::path::Path::new("/tmp/out/model.xml.zip")), "model.xml");
}

#[test]
fn test_zipped_xml_round_trip() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("sample.xml.zip");
    let graph = sample_model();

    let report = save_model(&graph, &path, &WriteOptions::default())?;
    assert!(report.is_clean());

    let loaded = load_model(&path, &LoaderConfig::default())?;
    assert_eq!(element_paths(&loaded), element_paths(&graph));
    assert_eq!(rendered_attrs(&loaded), rendered_attrs(&graph));
    assert_eq!(edges(&loaded), edges(&graph));
    assert_eq!(
        loaded.meta_attrs().get(MODEL_PATH_ATTR),
        Some(&path.display().to_string())
    );
    Ok(())
}

#[test]
fn test_corrupt_archive_is_reported() {
    let err = archive::read_first_member(Cursor::new(b"not a zip".to_vec()), "junk.xml.zip").unwrap_err();
    assert!(matches!(err, FormatError::Archive { .. }));
}

// ── Deps ────────────────────────────────────────────────────

#[test]
fn test_deps_parse() {
    let text = "\
/app/main.py:/app/util.py:import:line 3
@@weight:2
/app/main.py:/lib//json.py:import
@/app/main.py:loc:40
@/app/main.py:type:file
@/app/util.py:doc:first<NEWLINE>second
@/app/util.py:empty:
@/ATTRIBUTE_PROPAGATE_FOR_MODEL:loc:sum
@@@analysis:date:2024-05-01
@@@@source:scanner
/app/README
x:/ignored:uses
";
    let graph = read_deps_str(text, "sample.txt", &ParseOptions::default()).unwrap();

    assert_eq!(
        edges(&graph),
        vec![
            "/app/main.py -> /app/util.py (import) [detail=line 3,weight=2]",
            "/app/main.py -> /lib/json.py (import) []",
        ]
    );
    let main = graph.find_element("/app/main.py").unwrap();
    assert_eq!(graph.element_type(main), Some("file"));
    assert_eq!(graph.attrs(main).unwrap().get_str("loc"), Some("40"));
    let util = graph.find_element("/app/util.py").unwrap();
    assert_eq!(graph.attrs(util).unwrap().get_str("doc"), Some("first\nsecond"));
    assert!(graph.attrs(util).unwrap().get("empty").is_none());
    assert!(graph.find_element("/app/README").is_some());
    assert!(graph.find_element("/ATTRIBUTE_PROPAGATE_FOR_MODEL").is_none());
    assert!(graph.find_element("/ignored").is_none());
    assert_eq!(
        graph.model_attrs().get("analysis").and_then(|m| m.get("date")).map(String::as_str),
        Some("2024-05-01")
    );
    assert_eq!(graph.meta_attrs().get("source").map(String::as_str), Some("scanner"));
}

#[test]
fn test_deps_output() {
    let mut graph = Graph::new();
    let a = graph.create_or_get_element("/p/a.c");
    let b = graph.create_or_get_element("/p/b.c");
    graph.create_or_get_element("/p/c.c");
    graph.set_element_type(a, "file").unwrap();
    graph.set_attribute(a, "doc", "one\ntwo").unwrap();
    graph.set_attribute(a, "coupling", 3_i64).unwrap();
    let attrs: Attributes = [("detail", AttrValue::from("l1"))].into_iter().collect();
    graph.add_association(a, b, "call", attrs).unwrap();
    graph.set_meta_attribute("tool", "test");
    graph.set_model_attribute("stats", "files", "3");

    let (text, report) = to_deps_string(&graph, &WriteOptions::default()).unwrap();
    assert!(report.is_clean());
    insta::assert_snapshot!(text, @r###"
    @/p/a.c:doc:one<NEWLINE>two
    @/p/a.c:type:file
    /p/a.c:/p/b.c:call
    @@detail:l1
    /p
    /p/c.c
    @@@@tool:test
    @@@stats:files:3
    "###);
}

#[test]
fn test_deps_round_trip() {
    let graph = sample_model();
    let (text, _) = to_deps_string(&graph, &WriteOptions::default()).unwrap();
    let parsed = read_deps_str(&text, "sample.txt", &ParseOptions::default()).unwrap();
    assert_eq!(element_paths(&parsed), element_paths(&graph));
    assert_eq!(rendered_attrs(&parsed), rendered_attrs(&graph));
    assert_eq!(edges(&parsed), edges(&graph));
}

#[test]
fn test_deps_dependency_on_the_root_is_skipped() {
    let text = "/a/b:/:uses\n/a/b:///:uses\n@@weight:1\n/a/b:/c:uses\n";
    let graph = read_deps_str(text, "rooted.txt", &ParseOptions::default()).unwrap();
    assert_eq!(graph.association_count(), 1);
    assert_eq!(edges(&graph), vec!["/a/b -> /c (uses) []"]);
    assert!(graph.incoming(graph.root()).is_empty());
}

#[test]
fn test_deps_unrepresentable_names_are_reported() -> anyhow::Result<()> {
    let mut graph = Graph::new();
    let odd = graph.create_or_get_element("/x/a:b");
    graph.create_or_get_element("/x/a:b/inner");
    graph.set_attribute(odd, "k", "v")?;
    let ok = graph.create_or_get_element("/x/ok");
    let other = graph.create_or_get_element("/x/other");
    graph.add_association(ok, odd, "uses", Attributes::new())?;
    graph.add_association(ok, other, "weird:type", Attributes::new())?;
    graph.add_association(ok, other, "inc", Attributes::new())?;

    let (text, report) = to_deps_string(&graph, &WriteOptions::default())?;
    let skipped: Vec<(&str, &str)> = report
        .skipped
        .iter()
        .map(|e| (e.what, e.path.as_str()))
        .collect();
    assert_eq!(
        skipped,
        vec![
            ("element", "/x/a:b"),
            ("association", "/x/ok -> /x/a:b (uses)"),
            ("association", "/x/ok -> /x/other (weird:type)"),
        ]
    );
    assert!(report.dropped.is_empty());
    assert!(!text.contains("a:b"));
    assert!(!text.contains("weird"));

    let parsed = read_deps_str(&text, "odd.txt", &ParseOptions::default())?;
    assert_eq!(element_paths(&parsed), vec!["/x", "/x/ok", "/x/other"]);
    assert_eq!(edges(&parsed), vec!["/x/ok -> /x/other (inc) []"]);

    let err = to_deps_string(&graph, &WriteOptions { strict: true }).unwrap_err();
    assert!(matches!(err, FormatError::StructureEncoding(ref e) if e.path == "/x/a:b"));
    Ok(())
}

// ── Loader ──────────────────────────────────────────────────

#[test]
fn test_model_format_detection() {
    use std::path::Path;
    assert_eq!(ModelFormat::from_path(Path::new("m.xml.zip")), ModelFormat::ZippedXml);
    assert_eq!(ModelFormat::from_path(Path::new("dir/M.XML")), ModelFormat::Xml);
    assert_eq!(ModelFormat::from_path(Path::new("deps.txt")), ModelFormat::Deps);
    assert_eq!(ModelFormat::from_path(Path::new("noext")), ModelFormat::Deps);
}

#[test]
fn test_loader_hides_dynamic_references_by_default() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("model.txt");
    std::fs::write(
        &path,
        "/a:/b:dynamic_function_ref\n/a:/c:dynamic_typeref_member\n/a:/d:function_ref\n",
    )?;

    let loaded = load_model(&path, &LoaderConfig::default())?;
    assert_eq!(edges(&loaded), vec!["/a -> /d (function_ref) []"]);

    let everything = LoaderConfig {
        association_types: Vec::new(),
        ..LoaderConfig::default()
    };
    assert_eq!(load_model(&path, &everything)?.association_count(), 3);
    Ok(())
}

#[test]
fn test_failed_strict_save_leaves_no_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("out.xml");
    let mut graph = Graph::new();
    let a = graph.create_or_get_element("/a");
    graph.set_attribute(a, "bad name", "x")?;

    let err = save_model(&graph, &path, &WriteOptions { strict: true }).unwrap_err();
    assert!(matches!(err, FormatError::AttributeEncoding(_)));
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[test]
fn test_save_replaces_existing_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("model.xml");
    std::fs::write(&path, "stale")?;

    save_model(&sample_model(), &path, &WriteOptions::default())?;
    let written = std::fs::read_to_string(&path)?;
    assert!(written.starts_with("<?xml"));
    assert!(written.ends_with("</model>\n"));
    Ok(())
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_model(std::path::Path::new("/nonexistent/model.xml"), &LoaderConfig::default())
        .unwrap_err();
    assert!(matches!(err, FormatError::Io { .. }));
}

// ── Config ──────────────────────────────────────────────────

#[test]
fn test_loader_config_from_toml() {
    let config = LoaderConfig::from_toml_str(
        r#"
association_types = ["inc"]
element_attributes = ["IGNORE hash"]
strict_names = true

[write]
strict = true
"#,
    )
    .unwrap();
    assert_eq!(config.association_types, vec!["inc"]);
    assert!(config.strict_names);
    assert!(!config.only_root);
    assert!(config.write.strict);

    let options = config.parse_options();
    assert!(options.association_types.accepts("inc"));
    assert!(!options.association_types.accepts("call"));
    assert!(!options.element_attributes.accepts("hash"));
}

#[test]
fn test_loader_config_defaults_and_errors() -> anyhow::Result<()> {
    let config = LoaderConfig::from_toml_str("")?;
    assert_eq!(config, LoaderConfig::default());
    assert!(!config.parse_options().association_types.accepts("dynamic_function_ref"));

    assert!(matches!(
        LoaderConfig::from_toml_str("only_root = \"yes\""),
        Err(FormatError::Config(_))
    ));

    let dir = TempDir::new()?;
    let path = dir.path().join("loader.toml");
    std::fs::write(&path, "only_root = true\n")?;
    assert!(LoaderConfig::from_file(&path)?.only_root);
    assert!(LoaderConfig::from_file(&dir.path().join("missing.toml")).is_err());
    Ok(())
}
