//! Operator start gate
//!
//! The run starts only after the operator confirms the browser is logged in.
//! Confirmation arrives over a one-shot channel so the session can be set up
//! while the prompt is waiting.

use std::io::{BufRead, BufReader, Read, Write};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::core::{Result, SeiError};

/// One-shot "ready to start" signal
#[derive(Debug)]
pub struct StartGate {
    ready: oneshot::Receiver<()>,
}

impl StartGate {
    /// A gate and the sender that opens it
    pub fn channel() -> (oneshot::Sender<()>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { ready: rx })
    }

    /// A gate that is already open
    pub fn open() -> Self {
        let (tx, gate) = Self::channel();
        let _ = tx.send(());
        gate
    }

    /// Ask on the console and open the gate when the operator presses Enter
    pub fn console(message: impl Into<String>) -> Self {
        let message = message.into();
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{} ", message);
        let _ = stdout.flush();

        Self::from_reader(std::io::stdin())
    }

    /// Open the gate once a line arrives on `input`.
    ///
    /// The read runs on a detached thread that nothing joins, so a pending
    /// read never holds up runtime shutdown. EOF or a read error leaves the
    /// gate closed.
    pub fn from_reader<R>(input: R) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, gate) = Self::channel();

        let spawned = std::thread::Builder::new()
            .name("start-gate".to_string())
            .spawn(move || {
                let mut line = String::new();
                match BufReader::new(input).read_line(&mut line) {
                    Ok(0) | Err(_) => debug!("Start prompt closed without confirmation"),
                    Ok(_) => {
                        let _ = tx.send(());
                    }
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "Could not start the prompt reader");
        }

        gate
    }

    /// Wait for the signal; a dropped sender means the operator gave up
    pub async fn wait(self) -> Result<()> {
        self.ready
            .await
            .map_err(|_| SeiError::Other("Start prompt abandoned".to_string()))
    }
}
