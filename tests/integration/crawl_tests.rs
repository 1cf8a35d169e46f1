//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small news site and run the
//! sitemap, category and article stages end-to-end against a file database.

use newswire::config::{load_config, Config};
use newswire::crawler::Coordinator;
use newswire::output::load_statistics;
use newswire::storage::{lock, open_shared, SharedStorage, SqliteStorage, Storage};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes a configuration pointing every URL at the mock server, then loads it
fn create_test_config(base_url: &str, dir: &TempDir) -> Config {
    let content = format!(
        r#"
[database]
path = "{db}"

[crawler]
user-agent = "TestBot/1.0"
progress-interval = 1

[[website]]
id = 1
name = "Blue Print"
base-url = "{base}"
sitemap-format = "{base}/post-sitemap{{}}.xml"
start-index = 1
end-index = 2
max-workers = 2
batch-size = 2
timeout = 5
retry-delay = 0
max-retries = 2
category-sitemap-url = "{base}/category-sitemap.xml"

[website.selectors]
title = "h1.entry-title"
category = "div.cat-links a"
author = "span.author.vcard a"
published = "time.entry-date.published"
updated = "time.updated"
content = "div.entry-content > p"
"#,
        db = dir.path().join("news.db").display(),
        base = base_url,
    );

    let config_path = dir.path().join("newswire.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    load_config(&config_path).unwrap()
}

fn urlset(locs: &[String]) -> String {
    let urls: String = locs
        .iter()
        .map(|loc| {
            format!(
                "<url><loc>{}</loc><lastmod>2024-05-01T10:00:00+00:00</lastmod></url>",
                loc
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        urls
    )
}

fn article_page(base: &str, title: &str, paragraphs: &[&str], slugs: &[&str]) -> String {
    let categories: String = slugs
        .iter()
        .map(|slug| format!(r#"<a href="{}/category/{}/">{}</a>"#, base, slug, slug))
        .collect();
    let content: String = paragraphs.iter().map(|p| format!("<p>{}</p>", p)).collect();
    format!(
        r#"<html><body>
        <h1 class="entry-title">{title}</h1>
        <div class="cat-links">{categories}</div>
        <span class="author vcard"><a href="{base}/author/desk/">News Desk</a></span>
        <time class="entry-date published" datetime="2024-05-01T10:00:00+01:00">May 1</time>
        <div class="entry-content">{content}</div>
        </body></html>"#
    )
}

async fn mount(server: &MockServer, route: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Serves two sitemaps (the second malformed), a category sitemap and two articles
async fn mount_site(server: &MockServer, first_article_body: &str) {
    let base = server.uri();

    mount(
        server,
        "/category-sitemap.xml",
        200,
        urlset(&[
            format!("{}/category/news/politics/", base),
            format!("{}/category/news/", base),
            format!("{}/category/sports/", base),
        ]),
    )
    .await;

    mount(
        server,
        "/post-sitemap1.xml",
        200,
        urlset(&[
            format!("{}/police-arraign-portable/", base),
            format!("{}/eagles-win/", base),
        ]),
    )
    .await;
    mount(server, "/post-sitemap2.xml", 200, "<urlset><url><loc>".to_string()).await;

    mount(
        server,
        "/police-arraign-portable/",
        200,
        article_page(
            &base,
            "Police arraign Portable",
            &[first_article_body, "Second paragraph."],
            &["news", "news/politics"],
        ),
    )
    .await;
    mount(
        server,
        "/eagles-win/",
        200,
        article_page(&base, "Eagles win", &["Match report."], &["sports", "opinion"]),
    )
    .await;
}

async fn run_all(config: &Config, storage: &SharedStorage) {
    let website = config.website(None).unwrap();
    let coordinator = Coordinator::new(config, website, storage.clone())
        .await
        .unwrap();
    coordinator.run_all().await.unwrap();
}

fn link_rowids(db: &Path) -> Vec<i64> {
    let conn = rusqlite::Connection::open(db).unwrap();
    let mut stmt = conn
        .prepare("SELECT rowid FROM article_categories ORDER BY rowid")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<i64>, _>>()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_pipeline() {
    let server = MockServer::start().await;
    mount_site(&server, "First paragraph.").await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let storage = open_shared(Path::new(&config.database.path)).unwrap();

    let website = config.website(None).unwrap();
    let coordinator = Coordinator::new(&config, website, storage.clone())
        .await
        .unwrap();
    let report = coordinator.run_all().await.unwrap();

    // The malformed sitemap fails alone
    assert_eq!(report.sitemaps.total, 2);
    assert_eq!(report.sitemaps.succeeded, 1);
    assert_eq!(report.sitemaps.failed, 1);

    let categories = report.categories.unwrap();
    assert_eq!(categories.saved, 3);
    assert_eq!(categories.skipped, 0);

    assert_eq!(report.articles.total, 2);
    assert_eq!(report.articles.succeeded, 2);

    let guard = lock(&storage).unwrap();
    let stats = load_statistics(&*guard, 1).unwrap();
    assert_eq!(stats.sitemap_records, 2);
    assert_eq!(stats.valid_sitemap_records, 2);
    assert_eq!(stats.categories, 3);
    assert_eq!(stats.articles, 2);
    // "opinion" has no category row, so its link is skipped
    assert_eq!(stats.links, 3);

    let news = guard.get_category(1, "news").unwrap().unwrap();
    let politics = guard.get_category(1, "news/politics").unwrap().unwrap();
    assert_eq!(politics.parent_id, Some(news.id));
    assert_eq!(news.parent_id, None);

    let article = guard
        .find_article(&format!("{}/police-arraign-portable/", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(article.title, "Police arraign Portable");
    assert_eq!(article.author, "News Desk");
    assert_eq!(article.content, "First paragraph.\n\nSecond paragraph.");
    assert_eq!(article.category_slugs, vec!["news", "news/politics"]);
    assert_eq!(
        article.publish_date.as_deref(),
        Some("2024-05-01T09:00:00+00:00")
    );

    let record = guard
        .get_sitemap_record(1, &format!("{}/eagles-win/", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(record.status_code, Some(200));
    assert_eq!(record.last_modified.as_deref(), Some("2024-05-01T10:00:00Z"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rerun_is_idempotent() {
    let server = MockServer::start().await;
    mount_site(&server, "First paragraph.").await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let db = Path::new(&config.database.path).to_path_buf();
    let storage = open_shared(&db).unwrap();

    run_all(&config, &storage).await;
    let links_before = link_rowids(&db);
    let first = {
        let guard = lock(&storage).unwrap();
        guard
            .find_article(&format!("{}/police-arraign-portable/", server.uri()))
            .unwrap()
            .unwrap()
    };

    run_all(&config, &storage).await;

    let guard = lock(&storage).unwrap();
    let stats = load_statistics(&*guard, 1).unwrap();
    assert_eq!(stats.sitemap_records, 2);
    assert_eq!(stats.categories, 3);
    assert_eq!(stats.articles, 2);
    assert_eq!(link_rowids(&db), links_before);

    let second = guard
        .find_article(&format!("{}/police-arraign-portable/", server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.content_hash, first.content_hash);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_changed_article_is_rewritten() {
    let server = MockServer::start().await;
    mount_site(&server, "First paragraph.").await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let storage = open_shared(Path::new(&config.database.path)).unwrap();
    let url = format!("{}/police-arraign-portable/", server.uri());

    run_all(&config, &storage).await;
    let before = lock(&storage).unwrap().find_article(&url).unwrap().unwrap();

    server.reset().await;
    mount_site(&server, "First paragraph, corrected.").await;
    run_all(&config, &storage).await;

    let guard = lock(&storage).unwrap();
    let after = guard.find_article(&url).unwrap().unwrap();
    assert_eq!(after.id, before.id);
    assert_ne!(after.content_hash, before.content_hash);
    assert_eq!(after.content, "First paragraph, corrected.\n\nSecond paragraph.");
    assert_eq!(guard.count_articles(1).unwrap(), 2);
    assert_eq!(guard.count_links(1).unwrap(), 3);
}

#[tokio::test]
async fn test_data_persists_across_connections() {
    let server = MockServer::start().await;
    mount_site(&server, "First paragraph.").await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    {
        let storage = open_shared(Path::new(&config.database.path)).unwrap();
        let website = config.website(None).unwrap();
        let coordinator = Coordinator::new(&config, website, storage).await.unwrap();
        coordinator.run_sitemaps().await;
    }

    let reopened = SqliteStorage::new(Path::new(&config.database.path)).unwrap();
    assert_eq!(reopened.count_sitemap_records(1, false).unwrap(), 2);
    assert_eq!(
        reopened.article_urls(1).unwrap(),
        vec![
            format!("{}/police-arraign-portable/", server.uri()),
            format!("{}/eagles-win/", server.uri()),
        ]
    );
}
