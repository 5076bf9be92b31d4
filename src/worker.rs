//! The worker side of a page build.
//!
//! `lazysite worker <input>` is started by the pool with the content file
//! as its only argument. It then:
//!
//! 1. waits up to [`LIVENESS_TIMEOUT`] for one `run` message on stdin,
//! 2. builds the page with the context from that message,
//! 3. writes one reply line to stdout and exits 0.
//!
//! Failures of any kind, a missing message included, become an error reply.
//! Logs go to stderr so stdout stays a clean reply channel.

use crate::imaging::SiteProbe;
use crate::page;
use crate::protocol::{self, WorkerMessage};
use crate::types::BuildContext;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// How long a fresh worker waits for its job before giving up.
pub const LIVENESS_TIMEOUT: Duration = Duration::from_millis(1000);

/// The single job a worker will ever receive. Taking it consumes the slot,
/// so a second message is never read.
pub struct JobSlot<R> {
    reader: R,
}

impl<R: AsyncBufRead + Unpin> JobSlot<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the run message, or fail once `window` has passed without one.
    pub async fn take(mut self, window: Duration) -> Result<BuildContext, String> {
        let mut line = String::new();
        let read = tokio::time::timeout(window, self.reader.read_line(&mut line)).await;
        match read {
            Err(_) => Err(format!(
                "no run message received within {} ms",
                window.as_millis()
            )),
            Ok(Err(err)) => Err(format!("unable to read run message: {err}")),
            Ok(Ok(0)) => Err("input closed before a run message arrived".to_string()),
            Ok(Ok(_)) => protocol::decode_run(line.trim_end()).map_err(|e| e.to_string()),
        }
    }
}

/// Run one job: wait for the message, build `input`, produce the reply.
pub async fn serve<R: AsyncBufRead + Unpin>(
    input: &Path,
    slot: JobSlot<R>,
    window: Duration,
) -> WorkerMessage {
    let context = match slot.take(window).await {
        Ok(context) => context,
        Err(message) => {
            tracing::debug!(input = %input.display(), error = %message, "no job");
            return WorkerMessage::error(message);
        }
    };

    let site = &context.config.site;
    let probe = match SiteProbe::new(site.static_path.clone(), &site.images) {
        Ok(probe) => probe,
        Err(err) => return WorkerMessage::error(err.to_string()),
    };

    match page::build_page(input, &context, &probe).await {
        Ok(output) => {
            tracing::debug!(
                input = %output.input_path.display(),
                output = %output.output_path.display(),
                "page built"
            );
            WorkerMessage::result(output)
        }
        Err(err) => {
            tracing::debug!(input = %input.display(), error = %err, "page failed");
            WorkerMessage::error(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{setup_fixtures, site_context};
    use tokio::io::{AsyncWriteExt, BufReader};

    fn slot(bytes: &[u8]) -> JobSlot<&[u8]> {
        JobSlot::new(bytes)
    }

    #[tokio::test]
    async fn take_parses_run_message() {
        let tmp = setup_fixtures();
        let context = site_context(tmp.path());
        let line = format!("{}\n", protocol::encode_run(&context).unwrap());

        let taken = slot(line.as_bytes()).take(LIVENESS_TIMEOUT).await.unwrap();
        assert_eq!(taken, context);
    }

    #[tokio::test]
    async fn take_rejects_other_messages() {
        let err = slot(b"{\"name\":\"ping\"}\n")
            .take(LIVENESS_TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.contains("unknown message 'ping'"));
    }

    #[tokio::test]
    async fn take_fails_on_closed_input() {
        let err = slot(b"").take(LIVENESS_TIMEOUT).await.unwrap_err();
        assert!(err.contains("closed"));
    }

    #[tokio::test]
    async fn take_times_out_when_nothing_arrives() {
        // Keep the writer alive so the read blocks instead of hitting EOF.
        let (_writer, reader) = tokio::io::duplex(64);
        let started = std::time::Instant::now();

        let err = JobSlot::new(BufReader::new(reader))
            .take(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.contains("within 50 ms"));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn serve_builds_the_page() {
        let tmp = setup_fixtures();
        let mut context = site_context(tmp.path());
        context.config.site.images.remote_probe = false;
        let input = context.config.site.content_path.join("page.md");

        let (mut writer, reader) = tokio::io::duplex(64 * 1024);
        writer
            .write_all(format!("{}\n", protocol::encode_run(&context).unwrap()).as_bytes())
            .await
            .unwrap();

        let reply = serve(&input, JobSlot::new(BufReader::new(reader)), LIVENESS_TIMEOUT).await;
        let output = reply.result.expect("result reply");
        assert_eq!(output.input_path, input);
        assert!(output.output_path.exists());
    }

    #[tokio::test]
    async fn serve_reports_build_failures() {
        let tmp = setup_fixtures();
        let context = site_context(tmp.path());
        let input = context.config.site.content_path.join("missing.md");
        let line = format!("{}\n", protocol::encode_run(&context).unwrap());

        let reply = serve(&input, slot(line.as_bytes()), LIVENESS_TIMEOUT).await;
        assert!(reply.result.is_none());
        assert!(reply.error.unwrap().contains("missing.md"));
    }
}
