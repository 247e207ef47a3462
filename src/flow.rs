// vidmeta (video metadata inspector)
// Copyright (C) 2025 Andrew Nissen

use crate::permission::{PERMISSION_NOTICE, PermissionStatus};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    NoPermission,
    PermissionRequested,
    PermissionGranted,
    PermissionDenied,
    FilePickerOpen,
    FileSelected(PathBuf),
    ReportDisplayed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    Click,
    PermissionResult(bool),
    PickerResult(Option<PathBuf>),
    Extracted(Result<String, String>),
}

/// What the driver (CLI or TUI) has to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Nothing,
    RequestPermission,
    OpenPicker,
    Notify(String),
    Extract(PathBuf),
    Render(String),
}

/// Select-a-file flow: permission gate, chooser, synchronous extraction.
#[derive(Debug)]
pub struct SelectionFlow {
    state: FlowState,
    permission: PermissionStatus,
}

impl SelectionFlow {
    pub fn new(permission: PermissionStatus) -> Self {
        Self {
            state: FlowState::NoPermission,
            permission,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(
            self.state,
            FlowState::NoPermission
                | FlowState::PermissionGranted
                | FlowState::PermissionDenied
                | FlowState::ReportDisplayed
        )
    }

    fn transition(&mut self, next: FlowState) {
        tracing::trace!("Selection flow {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn back_to_idle(&mut self) {
        let idle = match self.permission {
            PermissionStatus::Granted => FlowState::PermissionGranted,
            _ => FlowState::NoPermission,
        };
        self.transition(idle);
    }

    pub fn handle(&mut self, event: FlowEvent) -> Effect {
        match event {
            FlowEvent::Click if self.is_idle() => match self.permission {
                PermissionStatus::Granted => {
                    self.transition(FlowState::FilePickerOpen);
                    Effect::OpenPicker
                }
                PermissionStatus::Undetermined => {
                    self.transition(FlowState::PermissionRequested);
                    Effect::RequestPermission
                }
                PermissionStatus::Denied => {
                    self.transition(FlowState::PermissionDenied);
                    self.back_to_idle();
                    Effect::Notify(PERMISSION_NOTICE.to_string())
                }
            },
            FlowEvent::PermissionResult(granted) if self.state == FlowState::PermissionRequested => {
                if granted {
                    self.permission = PermissionStatus::Granted;
                    self.transition(FlowState::FilePickerOpen);
                    Effect::OpenPicker
                } else {
                    // Asking again is allowed on the next click.
                    self.permission = PermissionStatus::Undetermined;
                    self.transition(FlowState::PermissionDenied);
                    self.back_to_idle();
                    Effect::Notify(PERMISSION_NOTICE.to_string())
                }
            }
            FlowEvent::PickerResult(picked) if self.state == FlowState::FilePickerOpen => match picked {
                Some(path) => {
                    self.transition(FlowState::FileSelected(path.clone()));
                    Effect::Extract(path)
                }
                None => {
                    self.back_to_idle();
                    Effect::Nothing
                }
            },
            FlowEvent::Extracted(result) if matches!(self.state, FlowState::FileSelected(_)) => {
                match result {
                    Ok(text) => {
                        self.transition(FlowState::ReportDisplayed);
                        Effect::Render(text)
                    }
                    Err(message) => {
                        self.back_to_idle();
                        Effect::Notify(message)
                    }
                }
            }
            event => {
                tracing::debug!("Ignoring {:?} in state {:?}", event, self.state);
                Effect::Nothing
            }
        }
    }
}
