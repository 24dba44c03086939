//! OS signal intake for the main loop.
//!
//! Signals are forwarded into a channel as [`ProcessSignal`] values. Only
//! interrupt, terminate, abort and kill-equivalents end the process; anything
//! else the listener hears is passed through as `Other` and ignored by the loop.

use log::debug;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSignal {
    Interrupt,
    Terminate,
    Abort,
    /// Platform kill-equivalent (console close on Windows). SIGKILL itself
    /// can never be observed by the process.
    Kill,
    Other(&'static str),
}

impl ProcessSignal {
    pub fn is_terminating(self) -> bool {
        !matches!(self, ProcessSignal::Other(_))
    }
}

impl std::fmt::Display for ProcessSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessSignal::Interrupt => f.write_str("SIGINT"),
            ProcessSignal::Terminate => f.write_str("SIGTERM"),
            ProcessSignal::Abort => f.write_str("SIGABRT"),
            ProcessSignal::Kill => f.write_str("SIGKILL"),
            ProcessSignal::Other(name) => f.write_str(name),
        }
    }
}

/// POSIX signal number of SIGABRT
#[cfg(unix)]
const SIGABRT: i32 = 6;

/// Start listening for process signals.
///
/// Must be called from within a tokio runtime.
#[cfg(unix)]
pub fn listen() -> std::io::Result<mpsc::Receiver<ProcessSignal>> {
    use tokio::signal::unix::{signal, SignalKind};

    let (tx, rx) = mpsc::channel(16);
    let kinds = [
        (SignalKind::interrupt(), ProcessSignal::Interrupt),
        (SignalKind::terminate(), ProcessSignal::Terminate),
        (SignalKind::from_raw(SIGABRT), ProcessSignal::Abort),
        (SignalKind::quit(), ProcessSignal::Other("SIGQUIT")),
        (SignalKind::hangup(), ProcessSignal::Other("SIGHUP")),
        (SignalKind::user_defined1(), ProcessSignal::Other("SIGUSR1")),
        (SignalKind::user_defined2(), ProcessSignal::Other("SIGUSR2")),
    ];

    for (kind, mapped) in kinds {
        let mut stream = signal(kind)?;
        let tx = tx.clone();
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                debug!("Received {mapped}");
                if tx.send(mapped).await.is_err() {
                    break;
                }
            }
        });
    }

    Ok(rx)
}

#[cfg(windows)]
pub fn listen() -> std::io::Result<mpsc::Receiver<ProcessSignal>> {
    use tokio::signal::windows::{ctrl_break, ctrl_c, ctrl_close, ctrl_shutdown};

    let (tx, rx) = mpsc::channel(16);

    let mut interrupt = ctrl_c()?;
    let mut brk = ctrl_break()?;
    let mut close = ctrl_close()?;
    let mut shutdown = ctrl_shutdown()?;

    tokio::spawn(async move {
        loop {
            let signal = tokio::select! {
                Some(_) = interrupt.recv() => ProcessSignal::Interrupt,
                Some(_) = brk.recv() => ProcessSignal::Interrupt,
                Some(_) = close.recv() => ProcessSignal::Kill,
                Some(_) = shutdown.recv() => ProcessSignal::Terminate,
                else => break,
            };
            debug!("Received {signal}");
            if tx.send(signal).await.is_err() {
                break;
            }
        }
    });

    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminating_signals() {
        assert!(ProcessSignal::Interrupt.is_terminating());
        assert!(ProcessSignal::Terminate.is_terminating());
        assert!(ProcessSignal::Abort.is_terminating());
        assert!(ProcessSignal::Kill.is_terminating());
        assert!(!ProcessSignal::Other("SIGHUP").is_terminating());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ProcessSignal::Terminate.to_string(), "SIGTERM");
        assert_eq!(ProcessSignal::Other("SIGUSR1").to_string(), "SIGUSR1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_raised_after_listen_is_buffered() {
        let mut rx = listen().unwrap();

        let status = std::process::Command::new("kill")
            .args(["-USR1", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let received = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(received, Some(ProcessSignal::Other("SIGUSR1")));
    }
}
