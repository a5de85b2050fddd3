//! Per-source follower tasks.
//!
//! A tailer owns one long-lived external follow process and copies every
//! complete line it emits into the source's queue, stamped with ingestion
//! time. File sources are followed by name (`tail -F`), so truncation,
//! rotation and recreation are handled by the follower, and a file that
//! does not exist yet is simply waited for. Journal sources subscribe to
//! new entries only.
//!
//! If the follow process cannot be spawned or exits, the tailer ends
//! without error: the source stops producing, but its queue stays valid
//! for the shipper to drain.

use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::logs::queue::EventQueue;
use crate::logs::source::{LogOrigin, LogSource};
use crate::logs::LogEvent;

/// Follows a single source until the source is exhausted or the agent
/// shuts down.
pub struct LogTailer {
    source: LogSource,
    queue: EventQueue,
    cancel: CancellationToken,
}

impl LogTailer {
    #[must_use]
    pub fn new(source: LogSource, queue: EventQueue, cancel: CancellationToken) -> Self {
        LogTailer {
            source,
            queue,
            cancel,
        }
    }

    /// Spawns the follower as a long-lived task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    fn follow_command(&self) -> Command {
        let mut cmd = match &self.source.origin {
            LogOrigin::File(path) => {
                let mut cmd = Command::new("tail");
                // -n 0: no backlog replay; -F: follow by name across rotation
                cmd.args(["-n", "0", "-F"]).arg(path);
                cmd
            }
            LogOrigin::Journal => {
                let mut cmd = Command::new("journalctl");
                cmd.args(["-f", "-n", "0", "--no-pager", "-o", "cat"]);
                cmd
            }
        };
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    async fn run(self) {
        let mut child = match self.follow_command().spawn() {
            Ok(child) => child,
            Err(e) => {
                // Degrade to "no new events" rather than failing the agent
                warn!(
                    "LOGS | Could not start follower for {}: {}",
                    self.source.name, e
                );
                return;
            }
        };

        let Some(stdout) = child.stdout.take() else {
            warn!("LOGS | Follower for {} has no stdout", self.source.name);
            return;
        };
        let mut lines = BufReader::new(stdout).lines();
        debug!("LOGS | Following {}", self.source.name);

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        self.queue.push(LogEvent::now(&line));
                    }
                    Ok(None) => {
                        debug!("LOGS | Follower for {} ended", self.source.name);
                        break;
                    }
                    Err(e) => {
                        debug!("LOGS | Read error on {}: {}", self.source.name, e);
                        break;
                    }
                },
                () = self.cancel.cancelled() => {
                    debug!("LOGS | Stopping follower for {}", self.source.name);
                    break;
                }
            }
        }

        // Kill (if still running) and reap the follow process so shutdown
        // leaves no orphaned subprocesses
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}
