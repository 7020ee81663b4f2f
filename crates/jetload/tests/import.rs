//! Importer integration tests: dedup, caching, classification, injection.

mod common;

use std::sync::Arc;
use std::time::Duration;

use jetload::document::{Region, IMPORT_ID_ATTR};
use jetload::events::drain;
use jetload::{
    Completion, HeadlessDocument, ImportOptions, ImportSource, ImportState, LoaderError,
    LoaderEvent, ResourceKind, Ttl,
};

use common::{names, network, url, MockTransport};

// ─────────────────────── dedup ───────────────────────

#[tokio::test]
async fn test_equivalent_spellings_share_one_request_and_record() {
    let transport = Arc::new(MockTransport::new().ok("js/a.js", "window.a = 1;"));
    let doc = Arc::new(HeadlessDocument::new());
    let net = network(transport.clone(), doc.clone());

    let first = net.import("./js/a.js", ImportOptions::default()).await.unwrap();
    let second = net
        .import("HTTP://LOCALHOST:9876/base//js/../js/a.js", ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(transport.hits("js/a.js"), 1);
    assert_eq!(net.import_records().len(), 1);
    assert_eq!(first.url, second.url);
    assert_eq!(first.source, ImportSource::Network);
    assert_eq!(second.source, ImportSource::AlreadyImported);
    assert_eq!(second.content.as_deref(), Some("window.a = 1;"));
    assert_eq!(doc.executed_scripts().len(), 1);
}

#[tokio::test]
async fn test_concurrent_imports_share_one_request() {
    let transport = Arc::new(
        MockTransport::new()
            .ok("frag.html", "<p>hi</p>")
            .delay("frag.html", 100),
    );
    let net = network(transport.clone(), Arc::new(HeadlessDocument::new()));

    let (a, b) = tokio::join!(
        net.import("frag.html", ImportOptions::default()),
        net.import("./frag.html", ImportOptions::default()),
    );

    assert_eq!(a.unwrap().content, b.unwrap().content);
    assert_eq!(transport.hits("frag.html"), 1);
}

#[tokio::test]
async fn test_concurrent_script_imports_execute_once() {
    let transport = Arc::new(
        MockTransport::new()
            .ok("lib.js", "var lib = {};")
            .delay("lib.js", 50),
    );
    let doc = Arc::new(HeadlessDocument::new());
    let net = network(transport.clone(), doc.clone());

    let results = net
        .import_all(&["lib.js", "./lib.js", "lib.js"], ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(transport.hits("lib.js"), 1);
    assert_eq!(doc.executed_scripts(), vec!["var lib = {};".to_string()]);
}

// ─────────────────────── cache ───────────────────────

#[tokio::test]
async fn test_text_is_cached_and_served_without_network() {
    let transport = Arc::new(MockTransport::new().ok("remote-data/git.svg", "<svg></svg>"));
    let net = network(transport.clone(), Arc::new(HeadlessDocument::new()));
    let mut rx = net.events().subscribe();

    let first = net.import("remote-data/git.svg", ImportOptions::default()).await.unwrap();
    assert_eq!(first.kind, ResourceKind::Text);
    assert_eq!(net.cache_item("remote-data/git.svg"), first.content);

    let second = net.import("remote-data/git.svg", ImportOptions::default()).await.unwrap();
    assert_eq!(second.source, ImportSource::Cache);
    assert_eq!(second.content, first.content);
    assert_eq!(transport.hits("remote-data/git.svg"), 1);

    assert_eq!(names(&drain(&mut rx)), vec!["html.import", "html.import"]);
}

#[tokio::test]
async fn test_bypass_cache_refetches() {
    let transport = Arc::new(MockTransport::new().ok("a.html", "a"));
    let net = network(transport.clone(), Arc::new(HeadlessDocument::new()));

    net.import("a.html", ImportOptions::default()).await.unwrap();
    let again = net.import("a.html", ImportOptions::bypass_cache()).await.unwrap();

    assert_eq!(again.source, ImportSource::Network);
    assert_eq!(transport.hits("a.html"), 2);
}

#[tokio::test]
async fn test_cached_text_expires_after_ttl() {
    let transport = Arc::new(MockTransport::new().ok("a.html", "a"));
    let net = network(transport.clone(), Arc::new(HeadlessDocument::new()));

    net.import("a.html", ImportOptions::with_ttl(Ttl::from_millis(100)))
        .await
        .unwrap();
    assert!(net.cache_item("a.html").is_some());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(net.cache_item("a.html").is_none());

    net.import("a.html", ImportOptions::default()).await.unwrap();
    assert_eq!(transport.hits("a.html"), 2);
}

#[tokio::test]
async fn test_clear_cache_forces_refetch() {
    let transport = Arc::new(MockTransport::new().ok("a.html", "a"));
    let net = network(transport.clone(), Arc::new(HeadlessDocument::new()));

    net.import("a.html", ImportOptions::default()).await.unwrap();
    net.clear_cache();
    assert!(net.cache_item("a.html").is_none());

    net.import("a.html", ImportOptions::default()).await.unwrap();
    assert_eq!(transport.hits("a.html"), 2);
}

#[tokio::test]
async fn test_manual_cache_content_is_served() {
    let transport = Arc::new(MockTransport::new());
    let net = network(transport.clone(), Arc::new(HeadlessDocument::new()));

    net.cache_content("./seeded.html", "<i>seed</i>", None).unwrap();
    let imported = net.import("seeded.html", ImportOptions::default()).await.unwrap();

    assert_eq!(imported.content.as_deref(), Some("<i>seed</i>"));
    assert!(transport.requests().is_empty());
}

// ─────────────────────── scripts & styles ───────────────────────

#[tokio::test]
async fn test_script_is_tagged_and_completes_on_marker() {
    let transport = Arc::new(MockTransport::new().ok("a.js", "var a;"));
    let doc = Arc::new(HeadlessDocument::new());
    let net = network(transport, doc.clone());

    let imported = net.import("a.js", ImportOptions::default()).await.unwrap();

    assert_eq!(imported.kind, ResourceKind::Script);
    assert_eq!(imported.completion, Some(Completion::Marker));
    assert_eq!(imported.content.as_deref(), Some("var a;"));

    let node = doc.find_by_attr(IMPORT_ID_ATTR, &url("a.js")).unwrap();
    assert_eq!(node.tag, "script");
    assert_eq!(doc.nodes(Region::Head).len(), 1);

    let record = net.import_record("a.js").unwrap();
    assert_eq!(record.state, ImportState::Imported);
    assert_eq!(record.kind, ResourceKind::Script);
}

#[tokio::test]
async fn test_script_falls_back_to_timeout_without_marker() {
    let transport = Arc::new(MockTransport::new().ok("slow.js", "var s;"));
    let doc = Arc::new(HeadlessDocument::new());
    doc.withhold_markers(true);
    let net = network(transport, doc);

    let imported = net.import("slow.js", ImportOptions::default()).await.unwrap();
    assert_eq!(imported.completion, Some(Completion::Timeout));
    assert_eq!(
        net.import_record("slow.js").unwrap().state,
        ImportState::Imported
    );
}

#[tokio::test]
async fn test_second_script_import_waits_for_first_completion() {
    let transport = Arc::new(MockTransport::new().ok("s.js", "var s;"));
    let doc = Arc::new(HeadlessDocument::new());
    doc.withhold_markers(true);
    let net = network(transport.clone(), doc.clone());

    let started = tokio::time::Instant::now();
    let first = tokio::spawn({
        let net = net.clone();
        async move { net.import("s.js", ImportOptions::default()).await }
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    // Injected but not yet reported as executed.
    assert_eq!(
        net.import_record("s.js").unwrap().state,
        ImportState::Pending
    );

    let second = net.import("s.js", ImportOptions::default()).await.unwrap();
    let second_done = started.elapsed();
    let first = first.await.unwrap().unwrap();

    assert!(second_done >= Duration::from_millis(90), "resolved after {second_done:?}");
    assert_eq!(second.source, ImportSource::Network);
    assert_eq!(second.completion, Some(Completion::Timeout));
    assert_eq!(first, second);
    assert_eq!(transport.hits("s.js"), 1);
    assert_eq!(doc.executed_scripts().len(), 1);
    assert_eq!(
        net.import_record("s.js").unwrap().state,
        ImportState::Imported
    );
}

#[tokio::test]
async fn test_stylesheet_is_linked_without_fetch() {
    let transport = Arc::new(MockTransport::new());
    let doc = Arc::new(HeadlessDocument::new());
    let net = network(transport.clone(), doc.clone());

    let imported = net.import("css/site.css", ImportOptions::default()).await.unwrap();

    assert_eq!(imported.kind, ResourceKind::Stylesheet);
    assert_eq!(imported.completion, Some(Completion::Marker));
    assert!(transport.requests().is_empty());

    let link = doc.find_by_attr(IMPORT_ID_ATTR, &url("css/site.css")).unwrap();
    assert_eq!(link.attr("rel"), Some("stylesheet"));
    assert_eq!(link.attr("href"), Some(url("css/site.css").as_str()));

    let again = net.import("css/site.css", ImportOptions::default()).await.unwrap();
    assert_eq!(again.source, ImportSource::AlreadyImported);
    assert_eq!(doc.nodes(Region::Head).len(), 1);
}

#[tokio::test]
async fn test_scripts_go_to_body_without_head() {
    let transport = Arc::new(MockTransport::new().ok("a.js", "var a;"));
    let doc = Arc::new(HeadlessDocument::without_head());
    let net = network(transport, doc.clone());

    net.import("a.js", ImportOptions::default()).await.unwrap();
    assert_eq!(doc.nodes(Region::Body).len(), 1);
}

// ─────────────────────── failures ───────────────────────

#[tokio::test]
async fn test_non_200_is_an_error_and_not_recorded() {
    let transport = Arc::new(MockTransport::new().status("gone.js", 404, "nope"));
    let doc = Arc::new(HeadlessDocument::new());
    let net = network(transport.clone(), doc.clone());

    let err = net.import("gone.js", ImportOptions::default()).await.unwrap_err();
    assert_eq!(
        err,
        LoaderError::HttpStatus {
            url: url("gone.js"),
            status: 404
        }
    );
    assert!(net.import_record("gone.js").is_none());
    assert!(doc.executed_scripts().is_empty());

    // Explicit re-invocation goes back to the network.
    let _ = net.import("gone.js", ImportOptions::default()).await;
    assert_eq!(transport.hits("gone.js"), 2);
}

#[tokio::test]
async fn test_batch_keeps_order_and_fails_as_a_whole() {
    let transport = Arc::new(
        MockTransport::new()
            .ok("a.html", "A")
            .delay("a.html", 80)
            .ok("b.html", "B")
            .ok("c.html", "C"),
    );
    let net = network(transport, Arc::new(HeadlessDocument::new()));

    let results = net
        .import_all(&["a.html", "b.html", "c.html"], ImportOptions::default())
        .await
        .unwrap();
    let contents: Vec<_> = results.iter().map(|r| r.content.clone().unwrap()).collect();
    assert_eq!(contents, vec!["A", "B", "C"]);

    let err = net
        .import_all(&["a.html", "missing.html"], ImportOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_invalid_url_is_rejected_before_network() {
    let transport = Arc::new(MockTransport::new());
    let net = network(transport.clone(), Arc::new(HeadlessDocument::new()));

    let err = net.import("  ", ImportOptions::default()).await.unwrap_err();
    assert!(matches!(err, LoaderError::InvalidUrl { .. }));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_empty_text_still_imports() {
    let transport = Arc::new(MockTransport::new().ok("empty.html", ""));
    let net = network(transport, Arc::new(HeadlessDocument::new()));
    let mut rx = net.events().subscribe();

    let imported = net.import("empty.html", ImportOptions::default()).await.unwrap();
    assert_eq!(imported.content.as_deref(), Some(""));
    assert!(matches!(
        drain(&mut rx).as_slice(),
        [LoaderEvent::HtmlImport { content, .. }] if content.is_empty()
    ));
}
