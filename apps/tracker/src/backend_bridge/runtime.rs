//! Backend worker: a dedicated thread running a tokio runtime that owns the
//! session controller and forwards its events to the control thread.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender};
use session_core::{
    ControllerConfig, ControllerError, Operation, PlainHistoryFormatter, QualityRecorder,
    SessionController, SessionEvent, SessionStore, SystemClock,
};
use storage::Storage;
use tokio::sync::broadcast::error::RecvError;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub database_url: String,
    pub controller: ControllerConfig,
}

pub fn launch(
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
    options: BackendOptions,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::error!("failed to build backend runtime: {err}");
                let _ = ui_tx.send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                let _ = ui_tx.send(UiEvent::BackendStopped);
                return;
            }
        };

        runtime.block_on(run_backend(cmd_rx, ui_tx.clone(), options));
        let _ = ui_tx.send(UiEvent::BackendStopped);
    })
}

async fn run_backend(
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
    options: BackendOptions,
) {
    let storage = match Storage::new(&options.database_url).await {
        Ok(storage) => storage,
        Err(err) => {
            tracing::error!(
                database_url = %options.database_url,
                error = %format!("{err:#}"),
                "failed to open session database"
            );
            let _ = ui_tx.send(UiEvent::Error(UiError::from_message(
                UiErrorContext::BackendStartup,
                format!("backend worker startup failure: {err:#}"),
            )));
            return;
        }
    };

    let store: Arc<dyn SessionStore> = Arc::new(storage);
    let controller = SessionController::new_with_dependencies(
        store.clone(),
        Arc::new(PlainHistoryFormatter::local()),
        Arc::new(SystemClock),
        options.controller,
    );
    let recorder = QualityRecorder::new(store);

    let mut events = controller.subscribe();
    let forward_tx = ui_tx.clone();
    let event_task = tokio::spawn(async move {
        loop {
            let evt = match events.recv().await {
                Ok(SessionEvent::StateChanged(snapshot)) => UiEvent::StateChanged(snapshot),
                Ok(SessionEvent::OperationFailed { operation, message }) => {
                    match background_failure(operation, &message) {
                        Some(evt) => evt,
                        None => continue,
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "ui event forwarder lagged behind controller");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if forward_tx.send(evt).is_err() {
                break;
            }
        }
    });

    match controller.snapshot().await {
        Ok(snapshot) => {
            let _ = ui_tx.send(UiEvent::StateChanged(snapshot));
        }
        Err(err) => {
            let _ = ui_tx.send(UiEvent::Error(UiError::from_message(
                UiErrorContext::Tracking,
                err.to_string(),
            )));
        }
    }
    let _ = ui_tx.send(UiEvent::Info("Backend worker ready".to_string()));

    while let Ok(cmd) = cmd_rx.recv() {
        let cmd_name = cmd.name();
        tracing::debug!(command = cmd_name, "processing backend command");
        let result = match cmd {
            BackendCommand::StartSession => controller.start_session().await.map(drop),
            BackendCommand::StopSession => controller.stop_session().await.map(drop),
            BackendCommand::ClearHistory => controller.clear_history().await.map(drop),
            BackendCommand::AcknowledgeNavigation => {
                controller.acknowledge_navigation().await.map(drop)
            }
            BackendCommand::AcknowledgeNotice => controller.acknowledge_notice().await.map(drop),
            BackendCommand::Refresh => controller.refresh().await.map(drop),
            BackendCommand::RateSession { session_id, rating } => {
                match recorder.record(session_id, rating).await {
                    Ok(session) => {
                        let _ = ui_tx.send(UiEvent::Rated(session));
                        controller.refresh().await.map(drop)
                    }
                    Err(err) => {
                        let _ = ui_tx.send(UiEvent::Error(UiError::from_message(
                            UiErrorContext::Rating,
                            err.to_string(),
                        )));
                        Ok(())
                    }
                }
            }
        };

        if let Err(err) = result {
            if let Some(evt) = command_failure(cmd_name, &err) {
                let _ = ui_tx.send(evt);
            }
        }
    }

    controller.shutdown().await;
    event_task.abort();
    tracing::debug!("backend worker stopped");
}

/// Failures of reloads the bridge did not ask for (startup reconciliation and
/// the reload after a write) only reach the UI through the event stream.
/// Everything else is reported from the command result.
fn background_failure(operation: Operation, message: &str) -> Option<UiEvent> {
    (operation == Operation::Refresh).then(|| {
        UiEvent::Error(UiError::from_message(
            UiErrorContext::Tracking,
            format!("{} failed: {message}", operation.as_str()),
        ))
    })
}

fn command_failure(cmd_name: &'static str, err: &ControllerError) -> Option<UiEvent> {
    // These commands end in a controller refresh, whose store failures are
    // already published as refresh failures.
    let ends_in_refresh = matches!(cmd_name, "refresh" | "rate_session");
    if ends_in_refresh && matches!(err, ControllerError::Store(_)) {
        return None;
    }
    Some(UiEvent::Error(UiError::from_message(
        UiErrorContext::Tracking,
        format!("{cmd_name} failed: {err}"),
    )))
}
