//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};
use thiserror::Error;

use crate::backend_bridge::commands::BackendCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("UI command queue is full; please retry")]
    QueueFull,
    #[error("Backend command processor disconnected (possible startup/runtime failure)")]
    Disconnected,
}

pub trait CommandSink {
    fn dispatch(&mut self, cmd: BackendCommand) -> Result<(), DispatchError>;
}

pub struct ChannelCommandSink {
    cmd_tx: Sender<BackendCommand>,
}

impl ChannelCommandSink {
    pub fn new(cmd_tx: Sender<BackendCommand>) -> Self {
        Self { cmd_tx }
    }
}

impl CommandSink for ChannelCommandSink {
    fn dispatch(&mut self, cmd: BackendCommand) -> Result<(), DispatchError> {
        let cmd_name = cmd.name();
        match self.cmd_tx.try_send(cmd) {
            Ok(()) => {
                tracing::debug!(command = cmd_name, "queued ui->backend command");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(DispatchError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(DispatchError::Disconnected),
        }
    }
}
