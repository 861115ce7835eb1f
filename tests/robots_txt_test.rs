mod server;

use seoscan::http_client::build_http_client;
use seoscan::robots::check_robots;
use server::{Route, TestSite};
use std::time::Duration;
use url::Url;

fn client() -> reqwest::Client {
    build_http_client(Duration::from_secs(5), true).unwrap()
}

#[tokio::test]
async fn test_complete_robots_txt_has_no_issues() {
    let body = "User-agent: *\nDisallow: /admin\nAllow: /\nSitemap: {base}/sitemap.xml\n";
    let server = TestSite::new()
        .route("/robots.txt", Route::text(body))
        .start()
        .await;

    let check = check_robots(&client(), &Url::parse(&server.url("/blog/")).unwrap()).await;
    assert!(check.exists);
    assert!(check.issues.is_empty(), "{:?}", check.issues);
    assert!(check.content.unwrap().contains(&format!("{}/sitemap.xml", server.base_url)));
}

#[tokio::test]
async fn test_blanket_disallow_is_flagged() {
    let server = TestSite::new()
        .route("/robots.txt", Route::text("User-agent: *\nDisallow: /\n"))
        .start()
        .await;

    let check = check_robots(&client(), &Url::parse(&server.base_url).unwrap()).await;
    assert!(check.exists);
    assert_eq!(
        check.issues,
        vec![
            "robots.txt does not declare a Sitemap".to_string(),
            "robots.txt blocks all crawlers (Disallow: /)".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_missing_directives_are_flagged() {
    let server = TestSite::new()
        .route("/robots.txt", Route::text("# nothing but a comment\n"))
        .start()
        .await;

    let check = check_robots(&client(), &Url::parse(&server.base_url).unwrap()).await;
    assert!(check.exists);
    assert!(check.issues.contains(&"robots.txt has no User-agent directive".to_string()));
    assert!(check.issues.contains(&"robots.txt does not declare a Sitemap".to_string()));
}

#[tokio::test]
async fn test_missing_robots_txt() {
    let server = TestSite::new().start().await;

    let check = check_robots(&client(), &Url::parse(&server.base_url).unwrap()).await;
    assert!(!check.exists);
    assert!(check.content.is_none());
    assert_eq!(check.issues, vec!["robots.txt not found".to_string()]);
}
