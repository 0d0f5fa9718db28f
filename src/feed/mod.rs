/// Producer feed - the log-producing subprocess and its line pump
///
/// `spawn_producer` starts the producer (by default `adb logcat -v threadtime`)
/// with stdout piped back to us. `pump_lines` turns that stream into records
/// and publishes them to the hub; a full hub queue slows the pump down, which
/// in turn slows the producer through the pipe.
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::process::{Child, ChildStdout, Command};

use crate::{
    config::FeedConfig,
    errors::{FeedError, HubError},
    logger::{self, LogTag},
    record::parse_line,
    webserver::ws::Hub,
};

// ============================================================================
// PRODUCER PROCESS
// ============================================================================

pub struct ProducerProcess {
    program: String,
    child: Child,
}

/// Spawn the configured producer with a piped stdout
///
/// The child is killed when the handle is dropped.
pub fn spawn_producer(config: &FeedConfig) -> Result<ProducerProcess, FeedError> {
    let child = Command::new(&config.program)
        .args(&config.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| FeedError::Spawn {
            program: config.program.clone(),
            source,
        })?;

    logger::info(
        LogTag::Feed,
        &format!(
            "Producer started: {} {} (pid={})",
            config.program,
            config.args.join(" "),
            child.id().map(|p| p.to_string()).unwrap_or_else(|| "?".to_string())
        ),
    );

    Ok(ProducerProcess {
        program: config.program.clone(),
        child,
    })
}

impl ProducerProcess {
    /// Take the stdout pipe; only the first call returns it
    pub fn take_stdout(&mut self) -> Result<ChildStdout, FeedError> {
        self.child.stdout.take().ok_or(FeedError::NoStdout)
    }

    /// OS process id, None once the child has been reaped
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Kill the producer and reap it; a no-op if it already exited
    pub async fn kill(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                logger::debug(
                    LogTag::Feed,
                    &format!("Producer {} already exited ({})", self.program, status),
                );
                return;
            }
            Ok(None) => {}
            Err(e) => {
                logger::warning(
                    LogTag::Feed,
                    &format!("Producer {} status unavailable: {}", self.program, e),
                );
            }
        }

        match self.child.kill().await {
            Ok(()) => logger::info(LogTag::Feed, &format!("Producer {} stopped", self.program)),
            Err(e) => logger::warning(
                LogTag::Feed,
                &format!("Failed to stop producer {}: {}", self.program, e),
            ),
        }
    }
}

// ============================================================================
// LINE PUMP
// ============================================================================

/// Counters for one pump run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    pub lines: u64,
    pub published: u64,
    /// Lines without a message separator
    pub skipped: u64,
    /// Lines that looked like records but failed to parse
    pub rejected: u64,
}

/// Read lines until the stream ends or the hub stops
///
/// Returns `Ok` only when the hub stopped accepting payloads. End of stream
/// is `FeedError::Ended`.
pub async fn pump_lines<R>(mut reader: R, hub: &Hub) -> Result<FeedSummary, FeedError>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = FeedSummary::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            logger::warning(
                LogTag::Feed,
                &format!(
                    "Producer stream ended (lines={}, published={})",
                    summary.lines, summary.published
                ),
            );
            return Err(FeedError::Ended);
        }
        summary.lines += 1;

        let line = String::from_utf8_lossy(&buf);
        let record = match parse_line(&line) {
            Ok(Some(record)) => record,
            Ok(None) => {
                summary.skipped += 1;
                logger::verbose(LogTag::Feed, &format!("Skipped line: {}", line.trim_end()));
                continue;
            }
            Err(e) => {
                summary.rejected += 1;
                logger::debug(
                    LogTag::Feed,
                    &format!("Unparseable line ({}): {}", e, line.trim_end()),
                );
                continue;
            }
        };

        match hub.publish_record(&record).await {
            Ok(()) => summary.published += 1,
            Err(HubError::Stopped) => {
                logger::debug(
                    LogTag::Feed,
                    &format!("Hub stopped, pump exiting (published={})", summary.published),
                );
                return Ok(summary);
            }
            Err(e) => {
                summary.rejected += 1;
                logger::warning(LogTag::Feed, &format!("Failed to publish record: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::webserver::ws::transport::test_support::ChannelSink;
    use crate::webserver::ws::Subscriber;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, AsyncReadExt, BufReader, ReadBuf};

    const SAMPLE: &str = "--------- beginning of main\n\
        01-02 03:04:05.678  1234  5678 I ActivityManager: Start proc: com.example\n\
        garbage\n\
        13-40 03:04:05.678  1 2 I Tag: bad month\n\
        01-02 03:04:06.000  1234  5679 W Some Tag : spaced: tag\n";

    fn test_hub(capacity: usize) -> Arc<Hub> {
        Hub::new(&HubConfig {
            queue_capacity: capacity,
            ..HubConfig::default()
        })
    }

    #[tokio::test]
    async fn test_pump_publishes_records_and_reports_end() {
        let hub = test_hub(16);
        let (sink, mut rx, _) = ChannelSink::new();
        let subscriber = Arc::new(Subscriber::new(hub.next_subscriber_id(), Box::new(sink)));
        assert!(hub.register(subscriber));
        let runner = tokio::spawn(hub.clone().run());

        let result = pump_lines(BufReader::new(SAMPLE.as_bytes()), &hub).await;
        assert!(matches!(result, Err(FeedError::Ended)));

        let first: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(first["Tag"], "ActivityManager");
        assert_eq!(first["Message"], "Start proc: com.example");
        assert_eq!(first["PID"], "1234");

        let second: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(second["Tag"], "Some Tag");
        assert_eq!(second["Priority"], "W");
        assert_eq!(second["Message"], "spaced: tag");

        hub.shutdown();
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_pump_returns_summary_when_hub_stops() {
        let hub = test_hub(16);
        hub.shutdown();

        let input = "--------- beginning of main\n\
            garbage\n\
            13-40 03:04:05.678  1 2 I Tag: bad month\n\
            short line: here\n\
            01-02 03:04:08.000 1 2 I After: stop\n\
            01-02 03:04:09.000 1 2 I Never: read\n";

        let summary = pump_lines(BufReader::new(input.as_bytes()), &hub)
            .await
            .unwrap();
        assert_eq!(
            summary,
            FeedSummary {
                lines: 5,
                published: 0,
                skipped: 2,
                rejected: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_pump_tolerates_invalid_utf8() {
        let hub = test_hub(4);
        let (sink, mut rx, _) = ChannelSink::new();
        assert!(hub.register(Arc::new(Subscriber::new(
            hub.next_subscriber_id(),
            Box::new(sink)
        ))));
        let runner = tokio::spawn(hub.clone().run());

        let mut input = b"01-02 03:04:05.000 1 2 E Bin: value ".to_vec();
        input.extend_from_slice(&[0xff, 0xfe]);
        input.push(b'\n');

        let result = pump_lines(BufReader::new(&input[..]), &hub).await;
        assert!(matches!(result, Err(FeedError::Ended)));

        let payload: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert!(payload["Message"].as_str().unwrap().starts_with("value "));

        hub.shutdown();
        runner.await.unwrap().unwrap();
    }

    /// Reader whose every read fails, like a producer pipe torn down mid-stream
    struct BrokenPipe;

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "producer pipe closed",
            )))
        }
    }

    #[tokio::test]
    async fn test_pump_read_failure_is_fatal() {
        let hub = test_hub(4);
        let (sink, mut rx, _) = ChannelSink::new();
        assert!(hub.register(Arc::new(Subscriber::new(
            hub.next_subscriber_id(),
            Box::new(sink)
        ))));
        let runner = tokio::spawn(hub.clone().run());

        let input = "01-02 03:04:05.000 1 2 I Before: failure\n".as_bytes();
        let reader = BufReader::new(input.chain(BrokenPipe));

        let result = pump_lines(reader, &hub).await;
        match &result {
            Err(FeedError::Read(e)) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("expected read failure, got {:?}", other),
        }

        let payload: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(payload["Tag"], "Before");

        let err = crate::run::feed_outcome(Ok(result)).unwrap_err();
        assert!(err.contains("Read error"));

        hub.shutdown();
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_spawn_missing_program_fails() {
        let config = FeedConfig {
            program: "/nonexistent/logcast-producer".to_string(),
            args: vec![],
        };
        let err = spawn_producer(&config).err().unwrap();
        assert!(matches!(err, FeedError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_and_pump_real_process() {
        let hub = test_hub(8);
        let (sink, mut rx, _) = ChannelSink::new();
        assert!(hub.register(Arc::new(Subscriber::new(
            hub.next_subscriber_id(),
            Box::new(sink)
        ))));
        let runner = tokio::spawn(hub.clone().run());

        let config = FeedConfig {
            program: "printf".to_string(),
            args: vec!["01-02 03:04:05.000 10 20 D Proc: from child\\n".to_string()],
        };
        let mut producer = spawn_producer(&config).unwrap();
        let stdout = producer.take_stdout().unwrap();
        assert!(matches!(producer.take_stdout(), Err(FeedError::NoStdout)));

        let result = pump_lines(BufReader::new(stdout), &hub).await;
        assert!(matches!(result, Err(FeedError::Ended)));
        producer.kill().await;

        let payload: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(payload["Tag"], "Proc");
        assert_eq!(payload["Message"], "from child");

        hub.shutdown();
        runner.await.unwrap().unwrap();
    }
}
