//! Application orchestrator: wires the coordinator to the console.

use ftpwatch_coordinator::{Config, Phase, TransferCoordinator};
use ftpwatch_transfer::{Outcome, TransferReport};
use tokio_util::sync::CancellationToken;

/// Runs the watcher until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let server = config.endpoint.address();
    let max_attempts = config.retry.max_attempts;

    let mut coordinator = TransferCoordinator::new(config, cancel.clone());

    // -- Status lines --
    let mut phase = coordinator.phase();
    let notice = tokio::spawn(async move {
        if phase.wait_for(|p| *p == Phase::Watching).await.is_ok() {
            println!("Connected to FTP server {server}.");
            println!("Do not close this window, closing it stops the FTP upload.");
        }
    });

    let printer = coordinator.take_reports().map(|mut reports| {
        tokio::spawn(async move {
            while let Some(report) = reports.recv().await {
                println!("{}", status_line(&report, max_attempts));
            }
        })
    });

    // -- Shutdown signal --
    // The first Ctrl-C lets the upload in flight finish, the second one exits.
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        let mut received = 0u32;
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("cannot listen for Ctrl-C: {e}");
                return;
            }
            received += 1;
            match shutdown_step(received) {
                Shutdown::Graceful => {
                    tracing::info!("SIGINT received, shutting down");
                    println!("Stopping after the current upload. Press Ctrl-C again to quit now.");
                    signal_cancel.cancel();
                }
                Shutdown::Force => {
                    tracing::warn!("second SIGINT received, exiting immediately");
                    std::process::exit(FORCED_EXIT_CODE);
                }
            }
        }
    });

    let result = coordinator.run().await;
    notice.abort();
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    let summary = result?;
    println!(
        "Stopped. {} file(s) uploaded, {} abandoned.",
        summary.succeeded, summary.abandoned
    );
    Ok(())
}

/// Exit status after a forced shutdown (128 + SIGINT).
const FORCED_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shutdown {
    Graceful,
    Force,
}

/// What the `n`th Ctrl-C does.
fn shutdown_step(n: u32) -> Shutdown {
    if n <= 1 {
        Shutdown::Graceful
    } else {
        Shutdown::Force
    }
}

/// One human-readable line per finished file.
fn status_line(report: &TransferReport, max_attempts: u32) -> String {
    match report.outcome {
        Outcome::Succeeded if report.attempts > 1 => format!(
            "File {} uploaded ({} bytes, attempt {}/{max_attempts})",
            report.remote_name, report.bytes, report.attempts
        ),
        Outcome::Succeeded => format!(
            "File {} uploaded ({} bytes)",
            report.remote_name, report.bytes
        ),
        Outcome::Abandoned => format!(
            "File {} could not be uploaded after {} attempt(s), giving up",
            report.source.display(),
            report.attempts
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: Outcome, attempts: u32) -> TransferReport {
        TransferReport {
            source: "/watch/report.txt".into(),
            remote_name: "report.txt".into(),
            outcome,
            attempts,
            bytes: if outcome == Outcome::Succeeded { 10 } else { 0 },
        }
    }

    #[test]
    fn first_try_success_line() {
        assert_eq!(
            status_line(&report(Outcome::Succeeded, 1), 7),
            "File report.txt uploaded (10 bytes)"
        );
    }

    #[test]
    fn retried_success_line() {
        assert_eq!(
            status_line(&report(Outcome::Succeeded, 3), 7),
            "File report.txt uploaded (10 bytes, attempt 3/7)"
        );
    }

    #[test]
    fn second_ctrl_c_forces_exit() {
        assert_eq!(shutdown_step(1), Shutdown::Graceful);
        assert_eq!(shutdown_step(2), Shutdown::Force);
        assert_eq!(shutdown_step(3), Shutdown::Force);
    }

    #[test]
    fn abandoned_line() {
        let line = status_line(&report(Outcome::Abandoned, 7), 7);
        assert!(line.contains("report.txt"));
        assert!(line.contains("after 7 attempt(s)"));
    }
}
