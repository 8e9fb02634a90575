use tokio_util::sync::CancellationToken;

/// A token that is cancelled on the first Ctrl-C.
///
/// The signal is awaited on a detached background thread with its own
/// single-threaded runtime, so blocking callers of
/// [`crate::ParallelSyncOrchestrator::execute_parallel_sync_with_cancel`] can
/// be interrupted. If the watcher cannot start, the token simply never fires.
pub fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let spawned = std::thread::Builder::new()
        .name("booksim-interrupt".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    tracing::warn!(error = %err, "interrupt watcher unavailable");
                    return;
                }
            };
            runtime.block_on(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::warn!("received ctrl-c, interrupting sync");
                        trigger.cancel();
                    }
                    Err(err) => tracing::warn!(error = %err, "ctrl-c handler failed"),
                }
            });
        });
    if let Err(err) = spawned {
        tracing::warn!(error = %err, "failed to spawn interrupt watcher");
    }
    token
}
