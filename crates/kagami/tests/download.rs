use std::num::NonZeroU32;

use kagami::{download::FailureReason, ItemRegistry, ParallelDownloader};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use url::Url;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn items_for(urls: &[String]) -> Vec<kagami::DownloadItem> {
    let mut registry = ItemRegistry::new();
    for url in urls {
        registry.register(Url::parse(url).unwrap());
    }
    registry.into_items()
}

fn downloader(
    output_dir: &std::path::Path,
    retries: u32,
    allowed_domain: Option<String>,
) -> ParallelDownloader {
    ParallelDownloader::new(
        reqwest::Client::new(),
        output_dir.to_path_buf(),
        NonZeroU32::new(4).unwrap(),
        retries,
        allowed_domain,
    )
}

#[tokio::test]
async fn test_download_mirrors_url_path() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/live/video/seg-1.m4s"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"segment-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let out = tempfile::tempdir()?;
    let summary = downloader(out.path(), 0, None)
        .download(items_for(&[format!("{}/live/video/seg-1.m4s", server.uri())]))
        .await?;

    assert_eq!(summary.succeeded, 1);
    assert!(summary.failed.is_empty());

    let dest = out.path().join("live/video/seg-1.m4s");
    assert_eq!(std::fs::read(&dest)?, b"segment-bytes");
    Ok(())
}

#[tokio::test]
async fn test_retry_then_success() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/seg.m4s"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/seg.m4s"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let out = tempfile::tempdir()?;
    // One failure, retries = 1: succeeds on the second attempt.
    let summary = downloader(out.path(), 1, None)
        .download(items_for(&[format!("{}/seg.m4s", server.uri())]))
        .await?;

    assert_eq!(summary.succeeded, 1);
    assert!(summary.failed.is_empty());
    assert_eq!(std::fs::read(out.path().join("seg.m4s"))?, b"ok");
    Ok(())
}

#[tokio::test]
async fn test_retries_exhausted() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/seg.m4s"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let out = tempfile::tempdir()?;
    // retries = 1 means exactly two attempts, then the item is reported failed.
    let summary = downloader(out.path(), 1, None)
        .download(items_for(&[format!("{}/seg.m4s", server.uri())]))
        .await?;

    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed.len(), 1);
    match &summary.failed[0].error {
        Some(FailureReason::Exhausted(error)) => assert!(error.contains("500")),
        other => panic!("unexpected failure reason: {other:?}"),
    }
    assert!(!out.path().join("seg.m4s").exists());
    Ok(())
}

#[tokio::test]
async fn test_domain_gate_rejects_without_network_attempt() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let out = tempfile::tempdir()?;
    let summary = downloader(out.path(), 3, Some("media.example.com".to_string()))
        .download(items_for(&[format!("{}/seg.m4s", server.uri())]))
        .await?;

    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].error, Some(FailureReason::WrongDomain));
    assert_eq!(summary.failed[0].error.as_ref().unwrap().to_string(), "wrong domain");
    Ok(())
}

/// Serves one request whose body is cut off before the declared content
/// length, then closes the connection.
async fn serve_truncated(listener: tokio::net::TcpListener) {
    let (mut socket, _) = listener.accept().await.unwrap();
    let mut buf = [0u8; 1024];
    let _ = socket.read(&mut buf).await;
    socket
        .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1048576\r\nConnection: close\r\n\r\npartial")
        .await
        .unwrap();
    let _ = socket.flush().await;
}

#[tokio::test]
async fn test_interrupted_body_leaves_no_final_file() -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(serve_truncated(listener));

    let out = tempfile::tempdir()?;
    let summary = downloader(out.path(), 0, None)
        .download(items_for(&[format!("http://{addr}/video/seg-1.m4s")]))
        .await?;

    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed.len(), 1);
    // The partial write only ever exists at the temp path.
    assert!(!out.path().join("video/seg-1.m4s").exists());
    assert!(out.path().join("video/seg-1.m4s.part").exists());
    Ok(())
}
