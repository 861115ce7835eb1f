mod server;

use seoscan::error::AnalysisError;
use seoscan::http_client::build_http_client;
use seoscan::sitemap::SitemapResolver;
use server::{Route, TestServer, TestSite};
use std::time::Duration;
use url::Url;

fn urlset(paths: &[&str]) -> String {
    let urls: String = paths
        .iter()
        .map(|p| format!("<url><loc>{{base}}{}</loc><lastmod>2024-05-01</lastmod></url>", p))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        urls
    )
}

fn sitemap_index(paths: &[&str]) -> String {
    let sitemaps: String = paths
        .iter()
        .map(|p| format!("<sitemap><loc>{{base}}{}</loc></sitemap>", p))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</sitemapindex>"#,
        sitemaps
    )
}

fn resolver(server: &TestServer) -> SitemapResolver {
    SitemapResolver::new(
        build_http_client(Duration::from_secs(5), true).unwrap(),
        Url::parse(&server.base_url).unwrap(),
        Duration::ZERO,
    )
}

#[tokio::test]
async fn test_resolution_is_idempotent_and_sorted() {
    let server = TestSite::new()
        .route("/sitemap.xml", Route::xml(urlset(&["/c", "/a", "/b", "/a"])))
        .start()
        .await;
    let resolver = resolver(&server);

    let (sitemap_url, first) = resolver.get_all_urls().await.unwrap();
    let (_, second) = resolver.get_all_urls().await.unwrap();

    assert_eq!(sitemap_url, server.url("/sitemap.xml"));
    assert_eq!(first, vec![server.url("/a"), server.url("/b"), server.url("/c")]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_nested_sitemap_fetched_once() {
    let server = TestSite::new()
        .route(
            "/sitemap.xml",
            Route::xml(sitemap_index(&["/sitemap-a.xml", "/sitemap-a.xml", "/sitemap-b.xml"])),
        )
        .route("/sitemap-a.xml", Route::xml(urlset(&["/a", "/shared"])))
        // Cycles back to the root and repeats sitemap A
        .route(
            "/sitemap-b.xml",
            Route::xml(sitemap_index(&["/sitemap.xml", "/sitemap-a.xml", "/sitemap-c.xml"])),
        )
        .route("/sitemap-c.xml", Route::xml(urlset(&["/c", "/shared"])))
        .start()
        .await;

    let (_, urls) = resolver(&server).get_all_urls().await.unwrap();

    assert_eq!(
        urls,
        vec![server.url("/a"), server.url("/c"), server.url("/shared")]
    );
    assert_eq!(server.hits_for("GET", "/sitemap.xml"), 1);
    assert_eq!(server.hits_for("GET", "/sitemap-a.xml"), 1);
    assert_eq!(server.hits_for("GET", "/sitemap-b.xml"), 1);
    assert_eq!(server.hits_for("GET", "/sitemap-c.xml"), 1);
}

#[tokio::test]
async fn test_broken_nested_sitemap_is_skipped() {
    let server = TestSite::new()
        .route(
            "/sitemap.xml",
            Route::xml(sitemap_index(&["/broken.xml", "/pages.xml", "/garbage.xml"])),
        )
        .route("/broken.xml", Route::status(500))
        .route("/garbage.xml", Route::xml("<html><body>not a sitemap</body></html>"))
        .route("/pages.xml", Route::xml(urlset(&["/page"])))
        .start()
        .await;

    let (_, urls) = resolver(&server).get_all_urls().await.unwrap();
    assert_eq!(urls, vec![server.url("/page")]);
}

#[tokio::test]
async fn test_well_known_paths_probed_in_order() {
    let server = TestSite::new()
        // Wrong content type is not accepted as a sitemap
        .route("/sitemap.xml", Route::html("<html></html>"))
        .route("/sitemap_index.xml", Route::xml(urlset(&["/from-index"])))
        .start()
        .await;

    let found = resolver(&server).find_sitemap().await;
    assert_eq!(found, Some(server.url("/sitemap_index.xml")));
}

#[tokio::test]
async fn test_robots_sitemap_fallback() {
    let server = TestSite::new()
        .route(
            "/robots.txt",
            Route::text("User-agent: *\nDisallow: /admin\nSitemap: {base}/maps/custom.xml\n"),
        )
        .route("/maps/custom.xml", Route::xml(urlset(&["/x", "/y"])))
        .start()
        .await;

    let (sitemap_url, urls) = resolver(&server).get_all_urls().await.unwrap();
    assert_eq!(sitemap_url, server.url("/maps/custom.xml"));
    assert_eq!(urls, vec![server.url("/x"), server.url("/y")]);
}

#[tokio::test]
async fn test_robots_sitemap_cycle_fetches_root_once() {
    let server = TestSite::new()
        .route(
            "/robots.txt",
            Route::text("User-agent: *\nSitemap: {base}/maps/./index.xml\n"),
        )
        .route(
            "/maps/index.xml",
            Route::xml(sitemap_index(&["/maps/index.xml", "/maps/pages.xml"])),
        )
        .route("/maps/pages.xml", Route::xml(urlset(&["/page"])))
        .start()
        .await;

    let (_, urls) = resolver(&server).get_all_urls().await.unwrap();
    assert_eq!(urls, vec![server.url("/page")]);
    assert_eq!(server.hits_for("GET", "/maps/index.xml"), 1);
    assert_eq!(server.hits_for("GET", "/maps/pages.xml"), 1);
}

#[tokio::test]
async fn test_no_sitemap_is_client_error() {
    let server = TestSite::new().start().await;

    let err = resolver(&server).get_all_urls().await.unwrap_err();
    assert!(matches!(err, AnalysisError::SitemapNotFound(_)));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_empty_sitemap_is_client_error() {
    let server = TestSite::new()
        .route("/sitemap.xml", Route::xml(urlset(&[])))
        .start()
        .await;

    let err = resolver(&server).get_all_urls().await.unwrap_err();
    assert!(matches!(err, AnalysisError::EmptySitemap(_)));
    assert_eq!(err.to_response().status, 400);
}

#[tokio::test]
async fn test_unreadable_root_sitemap() {
    let server = TestSite::new()
        .route("/sitemap.xml", Route::xml("this is not xml at all"))
        .start()
        .await;

    let err = resolver(&server).get_all_urls().await.unwrap_err();
    assert!(matches!(err, AnalysisError::SitemapUnreadable { .. }));
}

#[tokio::test]
async fn test_sitemap_check() {
    let server = TestSite::new()
        .route(
            "/sitemap.xml",
            Route::xml(
                r#"<urlset><url><loc>{base}/a</loc><lastmod>2024-01-01</lastmod></url><url><loc>{base}/b</loc></url></urlset>"#,
            ),
        )
        .route("/empty.xml", Route::xml("<urlset></urlset>"))
        .route("/feed.xml", Route::xml("<rss><channel></channel></rss>"))
        .route("/bad.xml", Route::xml("<urlset><url></urlset>"))
        .start()
        .await;
    let resolver = resolver(&server);

    let check = resolver.check(Some(&server.url("/sitemap.xml"))).await;
    assert!(check.valid);
    assert_eq!(check.issues, vec!["1 of 2 entries have no lastmod date".to_string()]);

    let check = resolver.check(Some(&server.url("/empty.xml"))).await;
    assert!(!check.valid);
    assert_eq!(check.issues, vec!["sitemap is empty".to_string()]);

    let check = resolver.check(Some(&server.url("/feed.xml"))).await;
    assert!(!check.valid);
    assert_eq!(
        check.issues,
        vec!["sitemap has no urlset or sitemapindex root".to_string()]
    );

    let check = resolver.check(Some(&server.url("/bad.xml"))).await;
    assert!(!check.valid);
    assert_eq!(check.issues, vec!["sitemap is not valid XML".to_string()]);

    let check = resolver.check(Some(&server.url("/missing.xml"))).await;
    assert!(!check.valid);
    assert!(check.issues[0].starts_with("sitemap could not be fetched"));
}
