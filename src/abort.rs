/// Abort signal sent when a scheduled run should be terminated.
#[derive(Debug, Clone, PartialEq)]
pub struct AbortSignal {
    pub reason: String,
}

impl AbortSignal {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Resolves when the process receives SIGINT or SIGTERM.
pub async fn shutdown_requested() -> AbortSignal {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            log::warn!("Cannot listen for SIGTERM: {}", e);
            return interrupted().await;
        }
    };

    tokio::select! {
        aborted = interrupted() => aborted,
        _ = terminate.recv() => AbortSignal::new("terminated"),
    }
}

async fn interrupted() -> AbortSignal {
    match tokio::signal::ctrl_c().await {
        Ok(()) => AbortSignal::new("interrupted"),
        Err(e) => {
            log::warn!("Cannot listen for SIGINT: {}", e);
            std::future::pending().await
        }
    }
}
