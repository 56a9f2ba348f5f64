//! Running external tools with an optional deadline.

use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::OcrError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs `cmd` to completion, like [`Command::output`]. With a deadline the
/// child is killed once it passes and [`OcrError::Timeout`] is returned.
pub(crate) fn output_until(cmd: &mut Command, deadline: Option<Instant>) -> Result<Output, OcrError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let unavailable = |e: std::io::Error| OcrError::EngineUnavailable(format!("cannot run {}: {}", program, e));

    let Some(deadline) = deadline else {
        return cmd.output().map_err(unavailable);
    };

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(unavailable)?;

    // pipes are drained concurrently so a chatty child cannot block on a full buffer
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Output {
                status,
                stdout: collect(stdout),
                stderr: collect(stderr),
            });
        }

        let now = Instant::now();
        if now >= deadline {
            if let Err(e) = child.kill() {
                log::warn!("[Command] cannot kill {}: {}", program, e);
            }
            if let Err(e) = child.wait() {
                log::warn!("[Command] cannot reap {}: {}", program, e);
            }
            log::warn!("[Command] {} killed at its deadline", program);
            return Err(OcrError::Timeout(format!("{} did not finish in time", program)));
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = pipe.read_to_end(&mut buf) {
                log::warn!("[Command] cannot read child output: {}", e);
            }
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
