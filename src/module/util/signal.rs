//! Turn SIGINT and SIGTERM into a workflow shutdown.

use std::io;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use crate::module::workflow::Event;

/// Wait for an interrupt on a dedicated thread and send [`Event::Shutdown`] once.
pub fn watch(tx: Sender<Event>) -> io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    thread::Builder::new()
        .name("signal".to_string())
        .spawn(move || {
            runtime.block_on(async {
                if let Err(e) = wait().await {
                    log::error!("Can't listen for signals: {}", e);
                    return;
                }
                log::info!("Interrupt received, shutting down");
                if tx.send(Event::Shutdown).is_err() {
                    log::warn!("Shutdown not delivered, workflow is gone");
                }
            })
        })
}

async fn wait() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = terminate.recv() => Ok(()),
    }
}
