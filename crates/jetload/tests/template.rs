//! Remote template integration tests.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use jetload::events::drain;
use jetload::{
    HeadlessDocument, LoaderError, LoaderEvent, Network, Template, TemplateConfig, TemplateData,
    Ttl,
};

use common::{names, network, url, MockTransport};

const TEST_TEMPLATE: &str = r#"<div id="test">{{data}}</div>"#;

fn data(value: Value) -> TemplateData {
    value.as_object().cloned().unwrap()
}

fn template_network() -> (Arc<MockTransport>, Network) {
    let transport = Arc::new(MockTransport::new().ok("tpl/test.html", TEST_TEMPLATE));
    let net = network(transport.clone(), Arc::new(HeadlessDocument::new()));
    (transport, net)
}

#[tokio::test]
async fn test_local_template_replacement_and_expiry() {
    let (_, net) = template_network();
    let mut rx = net.events().subscribe();

    let config = TemplateConfig::from_value(&json!({ "ttl": 100 })).unwrap();
    let mut template = Template::new(net, config).unwrap();
    template.set_source(TEST_TEMPLATE);

    let output = template.apply(&data(json!({ "data": "it worked" })));
    assert_eq!(output.as_deref(), Some(r#"<div id="test">it worked</div>"#));
    assert_eq!(template.output(), output);

    template.clear_cache();
    assert!(template.source().is_none());
    assert!(template.output().is_none());
    assert!(template.apply(&data(json!({ "data": "x" }))).is_none());

    template.set_source(TEST_TEMPLATE);
    template.apply(&data(json!({ "data": "again" })));
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(!template.is_cached());
    assert!(template.output().is_none());

    assert_eq!(
        names(&drain(&mut rx)),
        vec!["generated", "cache.cleared", "generated", "cache.cleared"]
    );
}

#[tokio::test]
async fn test_generate_from_remote() {
    let (transport, net) = template_network();
    let mut rx = net.events().subscribe();

    let mut template = Template::new(net, TemplateConfig::url("tpl/test.html")).unwrap();
    assert_eq!(template.url(), Some(url("tpl/test.html")));

    let output = template
        .generate(&data(json!({ "data": "remote" })), false)
        .await
        .unwrap();
    assert_eq!(output, r#"<div id="test">remote</div>"#);
    assert_eq!(template.source().as_deref(), Some(TEST_TEMPLATE));

    // Rendering restarts from raw text, so the second pass is independent.
    let output = template
        .generate(&data(json!({ "data": "second" })), false)
        .await
        .unwrap();
    assert_eq!(output, r#"<div id="test">second</div>"#);
    assert_eq!(transport.hits("tpl/test.html"), 1);

    let events = drain(&mut rx);
    assert_eq!(names(&events), vec!["html.import", "generated", "generated"]);
    assert!(matches!(
        &events[1],
        LoaderEvent::Generated { url: Some(u), .. } if *u == url("tpl/test.html")
    ));
}

#[tokio::test]
async fn test_generate_is_idempotent() {
    let (_, net) = template_network();
    let mut template = Template::new(net, TemplateConfig::url("tpl/test.html")).unwrap();
    let values = data(json!({ "data": "same" }));

    let first = template.generate(&values, false).await.unwrap();
    let second = template.generate(&values, false).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_force_pull_goes_to_network() {
    let (transport, net) = template_network();
    let mut template = Template::new(net, TemplateConfig::url("tpl/test.html")).unwrap();

    template.pull(false).await.unwrap();
    template.pull(true).await.unwrap();
    assert_eq!(transport.hits("tpl/test.html"), 2);
}

#[tokio::test]
async fn test_remote_source_expires_and_is_refetched() {
    let (transport, net) = template_network();
    let config = TemplateConfig::from_value(&json!({ "url": "tpl/test.html", "TTL": "100" })).unwrap();
    let mut template = Template::new(net, config).unwrap();

    template.generate(&TemplateData::new(), false).await.unwrap();
    assert!(template.is_cached());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(!template.is_cached());

    template.generate(&TemplateData::new(), false).await.unwrap();
    assert_eq!(transport.hits("tpl/test.html"), 2);
}

#[tokio::test]
async fn test_each_pull_restarts_the_ttl() {
    let (transport, net) = template_network();
    let config = TemplateConfig::from_value(&json!({ "url": "tpl/test.html", "ttl": 300 })).unwrap();
    let mut template = Template::new(net, config).unwrap();
    let values = data(json!({ "data": "x" }));

    template.generate(&values, false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    template.generate(&values, false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(template.is_cached());
    template.generate(&values, false).await.unwrap();
    assert_eq!(transport.hits("tpl/test.html"), 1);
}

#[tokio::test]
async fn test_set_url_clears_cached_source() {
    let transport = Arc::new(
        MockTransport::new()
            .ok("tpl/a.html", "<a>{{v}}</a>")
            .ok("tpl/b.html", "<b>{{v}}</b>"),
    );
    let net = network(transport, Arc::new(HeadlessDocument::new()));
    let mut template = Template::new(net, TemplateConfig::url("tpl/a.html")).unwrap();
    let values = data(json!({ "v": 1 }));

    assert_eq!(template.generate(&values, false).await.unwrap(), "<a>1</a>");

    template.set_url("tpl/a.html").unwrap();
    assert!(template.is_cached());

    template.set_url("tpl/b.html").unwrap();
    assert!(!template.is_cached());
    assert_eq!(template.generate(&values, false).await.unwrap(), "<b>1</b>");
}

#[tokio::test]
async fn test_missing_url_is_an_error() {
    let (_, net) = template_network();
    let mut template = Template::new(net, TemplateConfig::from_value(&json!({})).unwrap()).unwrap();

    let err = template.pull(false).await.unwrap_err();
    assert_eq!(err, LoaderError::MissingTemplateUrl);
}

#[tokio::test]
async fn test_ttl_change_emits_and_validates() {
    let (_, net) = template_network();
    let mut rx = net.events().subscribe();
    let mut template = Template::new(net, TemplateConfig::url("tpl/test.html")).unwrap();

    template.set_ttl_str("500").unwrap();
    assert_eq!(template.ttl(), Ttl::from_millis(500));

    let err = template.set_ttl_str("later").unwrap_err();
    assert!(matches!(err, LoaderError::InvalidTtl(_)));
    assert_eq!(template.ttl(), Ttl::from_millis(500));

    template.set_ttl(Ttl::Never);
    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert!(matches!(
        events[0],
        LoaderEvent::CacheTtlChange { old: 10_000, new: 500, .. }
    ));
    assert!(matches!(
        events[1],
        LoaderEvent::CacheTtlChange { old: 500, new: -1, .. }
    ));
}

#[tokio::test]
async fn test_never_ttl_keeps_source() {
    let (_, net) = template_network();
    let config = TemplateConfig::from_value(&json!({ "url": "tpl/test.html", "ttl": -1 })).unwrap();
    let mut template = Template::new(net, config).unwrap();

    template.pull(false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(template.is_cached());
}

#[tokio::test]
async fn test_network_template_convenience() {
    let (_, net) = template_network();
    let output = net
        .template("./tpl/test.html", &data(json!({ "data": 42 })))
        .await
        .unwrap();
    assert_eq!(output, r#"<div id="test">42</div>"#);
}

#[tokio::test]
async fn test_template_http_error_propagates() {
    let (_, net) = template_network();
    let mut template = Template::new(net, TemplateConfig::url("tpl/missing.html")).unwrap();
    let err = template.generate(&TemplateData::new(), false).await.unwrap_err();
    assert!(matches!(err, LoaderError::HttpStatus { status: 404, .. }));
    assert!(template.output().is_none());
}
