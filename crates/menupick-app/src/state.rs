// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{OperatorSession, Screen};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub screen: Screen,
    pub session: Option<OperatorSession>,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            screen: Screen::Picker,
            session: None,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    OpenPicker,
    OpenAdmin,
    SignIn(OperatorSession),
    Logout,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ScreenChanged(Screen),
    RedirectedToLogin,
    SignedIn(String),
    SignedOut,
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::OpenPicker => self.switch_to(Screen::Picker),
            AppCommand::OpenAdmin => {
                if self.session.is_some() {
                    return self.switch_to(Screen::Admin);
                }
                let mut events = vec![AppEvent::RedirectedToLogin];
                events.extend(self.switch_to(Screen::Login));
                events
            }
            AppCommand::SignIn(session) => {
                let operator = session.operator().to_owned();
                self.session = Some(session);
                let mut events = vec![AppEvent::SignedIn(operator)];
                events.extend(self.switch_to(Screen::Admin));
                events
            }
            AppCommand::Logout => {
                self.session = None;
                let mut events = vec![AppEvent::SignedOut];
                events.extend(self.switch_to(Screen::Login));
                events.push(self.set_status("signed out"));
                events
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn switch_to(&mut self, screen: Screen) -> Vec<AppEvent> {
        if self.screen == screen {
            return Vec::new();
        }
        self.screen = screen;
        vec![AppEvent::ScreenChanged(screen)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
