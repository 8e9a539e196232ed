//! HTTP client for the temperature probe.
//!
//! The probe exposes two endpoints: a JSON snapshot of the current reading
//! and rate, and a text stream of `[timestamp, temperature]` pairs recorded
//! after a given timestamp.

pub mod stream;

use async_trait::async_trait;
use common::config::ProbeConfig;
use common::{Error, Result, Snapshot};
use tracing::debug;
use url::Url;

pub use stream::{decode_stream, decode_stream_with};

/// `since` marker asking the stream endpoint for every recorded pair.
pub const SINCE_BEGINNING: &str = "0";

/// Source of probe readings. Implemented over HTTP by [`ProbeClient`].
#[async_trait]
pub trait ProbeSource: Send + Sync {
    /// Fetch the current reading and rate of change.
    async fn fetch_snapshot(&self) -> Result<Snapshot>;

    /// Fetch the raw stream payload recorded after `since`.
    async fn fetch_stream(&self, since: &str) -> Result<String>;
}

/// Probe HTTP client with connection pooling.
#[derive(Debug, Clone)]
pub struct ProbeClient {
    client: reqwest::Client,
    snapshot_url: Url,
    stream_url: Url,
}

impl ProbeClient {
    pub fn new(cfg: &ProbeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("thermowatch/0.1")
            .pool_max_idle_per_host(2)
            .timeout(std::time::Duration::from_secs(cfg.request_timeout_secs))
            .no_proxy()
            .build()
            .map_err(|e| Error::Http(format!("failed to build probe HTTP client: {e}")))?;

        Ok(Self {
            client,
            snapshot_url: endpoint_url(&cfg.base_url, &cfg.snapshot_path)?,
            stream_url: endpoint_url(&cfg.base_url, &cfg.stream_path)?,
        })
    }

    /// URL of the stream endpoint for a given `since` marker.
    pub fn stream_url_for(&self, since: &str) -> Result<Url> {
        let mut url = self.stream_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("stream URL cannot take a path: {}", self.stream_url)))?
            .pop_if_empty()
            .push(since);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response> {
        debug!("Fetching {}", url);

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Http(format!("GET {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http(format!(
                "probe returned {} for {}: {}",
                status.as_u16(),
                url,
                truncate(&body, 500)
            )));
        }

        Ok(resp)
    }
}

#[async_trait]
impl ProbeSource for ProbeClient {
    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let resp = self.get(self.snapshot_url.clone()).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Http(format!("reading snapshot body: {e}")))?;
        let snapshot: Snapshot = serde_json::from_str(&body)?;

        debug!(
            "Snapshot: temperature={:.2} rate={:.3}/min",
            snapshot.temperature, snapshot.rate
        );
        Ok(snapshot)
    }

    async fn fetch_stream(&self, since: &str) -> Result<String> {
        let resp = self.get(self.stream_url_for(since)?).await?;
        resp.text()
            .await
            .map_err(|e| Error::Http(format!("reading stream body: {e}")))
    }
}

fn endpoint_url(base: &str, path: &str) -> Result<Url> {
    let raw = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&raw).map_err(|e| Error::Config(format!("invalid probe URL {raw:?}: {e}")))
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned HTTP response and report the request target.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.expect("accept");
            let (rd, mut wr) = sock.split();
            let mut reader = BufReader::new(rd);

            let mut request_line = String::new();
            reader.read_line(&mut request_line).await.expect("read request");
            loop {
                let mut header = String::new();
                let n = reader.read_line(&mut header).await.expect("read header");
                if n == 0 || header == "\r\n" {
                    break;
                }
            }
            let target = request_line
                .split_whitespace()
                .nth(1)
                .unwrap_or_default()
                .to_string();
            let _ = tx.send(target);

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            wr.write_all(response.as_bytes()).await.expect("write");
            wr.flush().await.expect("flush");
        });

        (format!("http://{addr}"), rx)
    }

    fn client_for(base_url: String) -> ProbeClient {
        ProbeClient::new(&ProbeConfig {
            base_url,
            ..ProbeConfig::default()
        })
        .expect("client should build")
    }

    #[test]
    fn test_endpoint_urls_join_cleanly() {
        let client = client_for("http://probe.local/".into());
        assert_eq!(client.snapshot_url.as_str(), "http://probe.local/data/current");
        assert_eq!(
            client.stream_url_for(SINCE_BEGINNING).unwrap().as_str(),
            "http://probe.local/data/stream/0"
        );
        assert_eq!(
            client.stream_url_for("2024-01-01 10:00:00").unwrap().as_str(),
            "http://probe.local/data/stream/2024-01-01%2010:00:00"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let result = ProbeClient::new(&ProbeConfig {
            base_url: "not a url".into(),
            ..ProbeConfig::default()
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("°°°", 2), "°°");
        assert_eq!(truncate("short", 500), "short");
    }

    #[tokio::test]
    async fn test_fetch_snapshot_parses_string_numbers() {
        let (base, target) =
            serve_once("200 OK", r#"{"temperature": "71.0", "rate": "1.0"}"#).await;
        let snapshot = client_for(base).fetch_snapshot().await.expect("snapshot");

        assert_eq!(target.await.unwrap(), "/data/current");
        assert!((snapshot.temperature - 71.0).abs() < 1e-9);
        assert!((snapshot.rate - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_fetch_snapshot_accepts_device_payload() {
        let (base, _target) = serve_once(
            "200 OK",
            r#"{"heartbeat": 5, "rate": 0.42, "stdev": 0.1, "timestamp": 1704074400, "temperature": 71.5}"#,
        )
        .await;
        let snapshot = client_for(base).fetch_snapshot().await.expect("snapshot");

        assert_eq!(snapshot.temperature, 71.5);
        assert_eq!(snapshot.rate, 0.42);
        assert_eq!(snapshot.stdev, Some(0.1));
    }

    #[tokio::test]
    async fn test_fetch_stream_encodes_since_marker() {
        let (base, target) = serve_once("200 OK", "[[2024-01-01 10:01:00, 71.0]]").await;
        let body = client_for(base)
            .fetch_stream("2024-01-01 10:00:00")
            .await
            .expect("stream");

        assert_eq!(target.await.unwrap(), "/data/stream/2024-01-01%2010:00:00");
        assert_eq!(body, "[[2024-01-01 10:01:00, 71.0]]");
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_error() {
        let (base, _target) = serve_once("503 Service Unavailable", "sensor warming up").await;
        let err = client_for(base).fetch_snapshot().await.unwrap_err();

        match err {
            Error::Http(msg) => {
                assert!(msg.contains("503"), "{msg}");
                assert!(msg.contains("sensor warming up"), "{msg}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_snapshot_is_json_error() {
        let (base, _target) = serve_once("200 OK", "<html></html>").await;
        let err = client_for(base).fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
