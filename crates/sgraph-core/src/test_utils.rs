//! Test utilities for sgraph-core

use crate::graph::Graph;
use crate::model::{Attributes, ElementId};

/// Small web-server-like model:
///
/// ```text
/// /nginx/src/core/nginx.c      --function_ref--> /nginx/src/core/ngx_log.c
/// /nginx/src/core/nginx.c      --inc-->          /nginx/src/os/unix/ngx_files.c
/// /nginx/src/http/ngx_http.c   --inc-->          /nginx/src/core/nginx.c
/// /nginx/src/os/unix/ngx_files.c --function_ref--> /libc/stdio.h
/// ```
pub fn create_nginx_model() -> Graph {
    let mut graph = Graph::new();
    let main = graph.create_or_get_element("/nginx/src/core/nginx.c");
    let log = graph.create_or_get_element("/nginx/src/core/ngx_log.c");
    let files = graph.create_or_get_element("/nginx/src/os/unix/ngx_files.c");
    let http = graph.create_or_get_element("/nginx/src/http/ngx_http.c");
    let stdio = graph.create_or_get_element("/libc/stdio.h");

    let repo = find(&graph, "/nginx");
    graph.set_element_type(repo, "repository").unwrap();
    for file in [main, log, files, http, stdio] {
        graph.set_element_type(file, "file").unwrap();
    }
    graph.set_attribute(main, "loc", 1600_i64).unwrap();
    graph.set_attribute(log, "loc", 700_i64).unwrap();

    graph
        .add_association(main, log, "function_ref", Attributes::new())
        .unwrap();
    graph.add_association(main, files, "inc", Attributes::new()).unwrap();
    graph.add_association(http, main, "inc", Attributes::new()).unwrap();
    graph
        .add_association(files, stdio, "function_ref", Attributes::new())
        .unwrap();
    graph
}

/// Resolve a path that the fixture is known to contain.
pub fn find(graph: &Graph, path: &str) -> ElementId {
    graph
        .find_element(path)
        .unwrap_or_else(|| panic!("missing element {path}"))
}

/// All element paths in pre-order, root excluded.
pub fn paths(graph: &Graph) -> Vec<String> {
    graph
        .descendants(graph.root())
        .into_iter()
        .map(|id| graph.path(id))
        .collect()
}

/// `from -> to (deptype)` lines for every association, sorted.
pub fn edge_lines(graph: &Graph) -> Vec<String> {
    let mut lines: Vec<String> = graph
        .associations()
        .into_iter()
        .map(|a| format!("{} -> {} ({})", graph.path(a.from), graph.path(a.to), a.deptype))
        .collect();
    lines.sort();
    lines
}
