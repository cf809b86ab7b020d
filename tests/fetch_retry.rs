mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{CannedResponse, serve};
use rswebstack::{ConfigManager, PageFetcher, RswebstackError};

fn fetcher(max_retries: u32) -> PageFetcher {
    let config = ConfigManager::custom()
        .http_timeout(Duration::from_secs(5))
        .max_retries(max_retries)
        .backoff_factor(0.0)
        .build();
    PageFetcher::new(config).unwrap()
}

#[tokio::test]
async fn test_503_exhausts_retries() {
    let (url, hits) = serve(|_| CannedResponse::new(503, "Service Unavailable")).await;

    let err = fetcher(2).fetch(&url).await.unwrap_err();
    assert!(matches!(err, RswebstackError::FetchFailed(_)));
    assert!(err.is_fatal());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_non_retryable_status_fails_once() {
    let (url, hits) = serve(|_| CannedResponse::new(404, "Not Found")).await;

    let err = fetcher(3).fetch(&url).await.unwrap_err();
    assert!(matches!(err, RswebstackError::FetchFailed(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_recovers_after_transient_failure() {
    let (url, hits) = serve(|n| {
        if n == 0 {
            CannedResponse::new(502, "Bad Gateway")
        } else {
            CannedResponse::new(200, "OK")
                .header("Server", "nginx")
                .header("Set-Cookie", "_ga=GA1.2.3; Path=/")
                .body("<html><body>ok</body></html>")
        }
    })
    .await;

    let page = fetcher(3).fetch(&url).await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(page.status.as_u16(), 200);
    assert_eq!(page.headers.get("server").unwrap(), "nginx");
    assert_eq!(page.cookies.len(), 1);
    assert_eq!(page.cookies[0].name, "_ga");
    assert!(page.body.contains("ok"));
}

#[tokio::test]
async fn test_zero_retries_means_single_attempt() {
    let (url, hits) = serve(|_| CannedResponse::new(500, "Internal Server Error")).await;

    assert!(fetcher(0).fetch(&url).await.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
