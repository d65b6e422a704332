//! Artifact download with per-line progress output
//!
//! Streams one HTTP body into a destination file while re-rendering a
//! progress bar on the owning reporter line. All failure modes are
//! reported on that line; the caller only learns success/failure and is
//! responsible for cleaning up the partial file.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::ui::progress::format_download_line;
use crate::ui::MultiReporter;

/// Redraw cadence for the in-place progress bar
const RENDER_EVERY: Duration = Duration::from_millis(100);

/// What a single download attempt produced
#[derive(Debug, Clone, Copy)]
pub struct DownloadOutcome {
    pub success: bool,
    pub http_status: Option<u16>,
    pub bytes_written: u64,
}

impl DownloadOutcome {
    fn failed(http_status: Option<u16>, bytes_written: u64) -> Self {
        Self {
            success: false,
            http_status,
            bytes_written,
        }
    }
}

/// Download `url` into `dest`, reporting progress and errors on line
/// `index` of the reporter. `index`/`total` reflect the request
/// position for the `[2/3]` counter.
///
/// On failure the partially written file is left in place; the caller
/// decides whether to delete it.
pub async fn download_url(
    client: &Client,
    url: &str,
    dest: &Path,
    pkg: &str,
    version: &str,
    index: usize,
    total: usize,
    reporter: &Arc<MultiReporter>,
) -> DownloadOutcome {
    let mut file = match File::create(dest).await {
        Ok(f) => f,
        Err(err) => {
            reporter.print_err(index, &err.to_string());
            return DownloadOutcome::failed(None, 0);
        }
    };

    reporter.print(index, &format!("Downloading file at {url}"));

    let response = match client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await
    {
        Ok(r) => r,
        Err(err) => {
            reporter.print_err(index, &err.to_string());
            return DownloadOutcome::failed(None, 0);
        }
    };

    let status = response.status();
    if !status.is_success() {
        match status.as_u16() {
            404 | 403 => reporter.print_err(
                index,
                &format!("unable to find {pkg}@{version} on the web at {url}"),
            ),
            _ => reporter.print_err(index, &format!("bad HTTP response: {status}")),
        }
        return DownloadOutcome::failed(Some(status.as_u16()), 0);
    }

    let total_bytes = response.content_length().unwrap_or(0);
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    // Without cursor control there is no bar to re-render; do a plain
    // copy and report one completed line.
    if !reporter.is_ansi() {
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(err) => {
                    reporter.print_err(index, &err.to_string());
                    return DownloadOutcome::failed(Some(status.as_u16()), written);
                }
            };
            if let Err(err) = file.write_all(&chunk).await {
                reporter.print_err(index, &err.to_string());
                return DownloadOutcome::failed(Some(status.as_u16()), written);
            }
            written += chunk.len() as u64;
        }
        if let Err(err) = file.flush().await {
            reporter.print_err(index, &err.to_string());
            return DownloadOutcome::failed(Some(status.as_u16()), written);
        }
        reporter.print(index, &format!("Completed downloading {pkg}"));
        return DownloadOutcome {
            success: true,
            http_status: Some(status.as_u16()),
            bytes_written: written,
        };
    }

    // Byte-driven re-render, throttled to the bar cadence
    let mut last_render: Option<Instant> = None;
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(err) => {
                reporter.print_err(index, &err.to_string());
                return DownloadOutcome::failed(Some(status.as_u16()), written);
            }
        };
        if let Err(err) = file.write_all(&chunk).await {
            reporter.print_err(index, &err.to_string());
            return DownloadOutcome::failed(Some(status.as_u16()), written);
        }
        written += chunk.len() as u64;

        if last_render.is_none_or(|t| t.elapsed() >= RENDER_EVERY) {
            reporter.print(
                index,
                &format_download_line(pkg, index, total, written, total_bytes),
            );
            last_render = Some(Instant::now());
        }
    }

    if let Err(err) = file.flush().await {
        reporter.print_err(index, &err.to_string());
        return DownloadOutcome::failed(Some(status.as_u16()), written);
    }

    // Final frame so the bar never ends short of 100%
    reporter.print(
        index,
        &format_download_line(pkg, index, total, written, total_bytes.max(written)),
    );

    DownloadOutcome {
        success: true,
        http_status: Some(status.as_u16()),
        bytes_written: written,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_download_success_plain_mode() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/jq-1.7.1")
            .with_status(200)
            .with_body(b"jq bytes")
            .create_async()
            .await;

        let buf = SharedBuf::default();
        let reporter = MultiReporter::with_writer(1, Box::new(buf.clone()), false);
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("jq");

        let client = Client::new();
        let url = format!("{}/jq-1.7.1", server.url());
        let outcome =
            download_url(&client, &url, &dest, "jq", "1.7.1", 0, 1, &reporter).await;

        mock.assert_async().await;
        assert!(outcome.success);
        assert_eq!(outcome.http_status, Some(200));
        assert_eq!(outcome.bytes_written, 8);
        assert_eq!(std::fs::read(&dest).unwrap(), b"jq bytes");
        assert!(buf.contents().contains("Completed downloading jq"));
    }

    #[tokio::test]
    async fn test_download_404_reports_friendly_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let buf = SharedBuf::default();
        let reporter = MultiReporter::with_writer(1, Box::new(buf.clone()), false);
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("missing");

        let client = Client::new();
        let url = format!("{}/missing", server.url());
        let outcome =
            download_url(&client, &url, &dest, "ghost", "9.9.9", 0, 1, &reporter).await;

        assert!(!outcome.success);
        assert_eq!(outcome.http_status, Some(404));
        assert!(buf.contents().contains("unable to find ghost@9.9.9"));
    }

    #[tokio::test]
    async fn test_download_500_reports_raw_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/broken")
            .with_status(500)
            .create_async()
            .await;

        let buf = SharedBuf::default();
        let reporter = MultiReporter::with_writer(1, Box::new(buf.clone()), false);
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("broken");

        let client = Client::new();
        let url = format!("{}/broken", server.url());
        let outcome =
            download_url(&client, &url, &dest, "pkg", "1.0.0", 0, 1, &reporter).await;

        assert!(!outcome.success);
        assert_eq!(outcome.http_status, Some(500));
        assert!(buf.contents().contains("bad HTTP response: 500"));
    }

    #[tokio::test]
    async fn test_download_unwritable_dest_fails_fast() {
        let buf = SharedBuf::default();
        let reporter = MultiReporter::with_writer(1, Box::new(buf.clone()), false);

        let client = Client::new();
        let dest = Path::new("/definitely/not/a/dir/file");
        let outcome = download_url(
            &client,
            "http://127.0.0.1:1/never",
            dest,
            "pkg",
            "1.0.0",
            0,
            1,
            &reporter,
        )
        .await;

        assert!(!outcome.success);
        assert_eq!(outcome.http_status, None);
    }

    #[tokio::test]
    async fn test_download_ansi_renders_progress_bar() {
        let mut server = mockito::Server::new_async().await;
        let body = vec![0u8; 64 * 1024];
        server
            .mock("GET", "/blob")
            .with_status(200)
            .with_body(&body)
            .create_async()
            .await;

        let buf = SharedBuf::default();
        let reporter = MultiReporter::with_writer(1, Box::new(buf.clone()), true);
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("blob");

        let client = Client::new();
        let url = format!("{}/blob", server.url());
        let outcome =
            download_url(&client, &url, &dest, "blob", "1.0.0", 0, 1, &reporter).await;

        assert!(outcome.success);
        assert_eq!(outcome.bytes_written, body.len() as u64);
        // final frame reaches 100%
        assert!(buf.contents().contains("100%"));
    }
}
