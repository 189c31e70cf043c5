//! End-to-end aggregation passes against mock feed and completion servers.
//!
//! Each test starts its own wiremock servers, so tests run in parallel without
//! sharing state.

use feedbrief::aggregate::Aggregator;
use feedbrief::config::{Config, FetchConfig, NormalizerConfig, SummarizerConfig};
use feedbrief::feed::HttpFeedClient;
use feedbrief::summary::{HttpCompletionClient, Normalizer, Summarizer};
use feedbrief::types::{FeedsResponse, Source};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TECH_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel>
  <title>Tech</title>
  <item>
    <title>新品发布</title>
    <link>https://tech.example.com/launch</link>
    <pubDate>Fri, 01 Mar 2024 08:00:00 GMT</pubDate>
    <content:encoded><![CDATA[<p>公司今天发布了新一代旗舰产品。售价较上一代下调了一成。</p>]]></content:encoded>
  </item>
  <item>
    <title>内部复盘</title>
    <link>https://tech.example.com/review</link>
    <pubDate>Sat, 02 Mar 2024 08:00:00 GMT</pubDate>
    <description>REASONING 这是一篇关于季度经营情况的复盘文章。</description>
  </item>
</channel>
</rss>"#;

const MARKET_FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Markets</title>
  <id>urn:markets</id>
  <updated>2024-03-03T10:00:00Z</updated>
  <entry>
    <title>收盘点评</title>
    <id>urn:m:1</id>
    <link href="https://markets.example.com/close"/>
    <updated>2024-03-03T10:00:00Z</updated>
    <content type="text">A股今日大涨三个百分点。B股全天持平震荡。C股尾盘小幅下跌。</content>
  </entry>
</feed>"#;

async fn feed_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tech.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TECH_FEED))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/markets.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MARKET_FEED))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    server
}

fn sources(server: &MockServer) -> Vec<Source> {
    vec![
        Source::new("tech", format!("{}/tech.xml", server.uri())),
        Source::new("markets", format!("{}/markets.xml", server.uri())),
        Source::new("broken", format!("{}/broken.xml", server.uri())),
    ]
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn online_aggregator(completions: &MockServer) -> Aggregator {
    let http = reqwest::Client::new();
    let client = HttpCompletionClient::new(
        http.clone(),
        &format!("{}/v1", completions.uri()),
        SecretString::from("sk-test"),
        Duration::from_secs(5),
    );
    let summarizer_config = SummarizerConfig {
        retry_delay_ms: 10,
        ..SummarizerConfig::default()
    };
    Aggregator::new(
        Arc::new(HttpFeedClient::new(http, &FetchConfig::default())),
        Summarizer::new(Some(Arc::new(client)), summarizer_config),
        Normalizer::new(&NormalizerConfig::default()).unwrap(),
        5,
    )
}

#[tokio::test]
async fn test_online_pass_normalizes_and_drops_leakage() {
    let feeds = feed_server().await;
    let completions = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("REASONING"))
        .respond_with(completion("好的，我来总结一下。<summary>我在思考这篇复盘的重点。</summary>"))
        .mount(&completions)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion(
            "首先我们分析一下。<summary>新品发布，价格下调。</summary>",
        ))
        .mount(&completions)
        .await;

    let items = online_aggregator(&completions)
        .aggregate(&sources(&feeds))
        .await
        .unwrap();

    let summary: Vec<_> = items
        .iter()
        .map(|i| (i.source.as_str(), i.title.as_str(), i.summary.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("markets", "收盘点评", "新品发布，价格下调。"),
            ("tech", "新品发布", "新品发布，价格下调。"),
        ]
    );
}

#[tokio::test]
async fn test_provider_outage_falls_back_to_extractive() {
    let feeds = feed_server().await;
    let completions = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(9) // 3 entries x (initial + 2 retries)
        .mount(&completions)
        .await;

    let items = online_aggregator(&completions)
        .aggregate(&sources(&feeds))
        .await
        .unwrap();

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].source, "markets");
    assert_eq!(items[0].summary, "A股今日大涨三个百分点。B股全天持平震荡。");
    assert_eq!(items[2].title, "新品发布");
    assert_eq!(
        items[2].summary,
        "公司今天发布了新一代旗舰产品。售价较上一代下调了一成。"
    );
}

#[tokio::test]
async fn test_offline_config_pass_serializes_feeds() {
    let feeds = feed_server().await;
    let config = Config {
        sources: sources(&feeds),
        ..Config::default()
    };

    let aggregator = Aggregator::from_config(&config, true).unwrap();
    let items = aggregator.aggregate(&config.sources).await.unwrap();
    assert_eq!(items.len(), 3);

    let json = serde_json::to_value(FeedsResponse::ok(items)).unwrap();
    assert!(json.get("error").is_none());
    let first = &json["feeds"][0];
    assert_eq!(first["source"], "markets");
    assert_eq!(first["link"], "https://markets.example.com/close");
    assert_eq!(first["pubDate"], "2024-03-03T10:00:00+00:00");
    assert_eq!(first["summary"], "A股今日大涨三个百分点。B股全天持平震荡。");
}

#[tokio::test]
async fn test_no_sources_is_total_failure() {
    let aggregator = Aggregator::from_config(&Config::default(), true).unwrap();
    let err = aggregator.aggregate(&[]).await.unwrap_err();

    let json = serde_json::to_value(FeedsResponse::failed(err.to_string())).unwrap();
    assert_eq!(json["error"], "No feed sources configured");
    assert_eq!(json["feeds"], serde_json::json!([]));
}
