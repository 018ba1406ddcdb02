//! Dashboard panels. Each owns its view state and degrades on its own.

pub mod counterfactual;
pub mod fraud;
pub mod galaxy;
pub mod search;
pub mod temporal;
pub mod trust_network;

use serde::Serialize;

use crate::{error::FetchResult, fetch::Fetched};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PanelState<T> {
    #[default]
    Idle,
    Loading,
    Ready { data: T, synthetic: bool },
    Failed { message: String },
}

impl<T> PanelState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            PanelState::Ready { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, PanelState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PanelState::Failed { message } => Some(message),
            _ => None,
        }
    }

    pub fn map<U>(&self, f: impl FnOnce(&T) -> U) -> PanelState<U> {
        match self {
            PanelState::Idle => PanelState::Idle,
            PanelState::Loading => PanelState::Loading,
            PanelState::Ready { data, synthetic } => PanelState::Ready {
                data: f(data),
                synthetic: *synthetic,
            },
            PanelState::Failed { message } => PanelState::Failed {
                message: message.clone(),
            },
        }
    }
}

/// Monotonic request counter; only the newest ticket may land.
#[derive(Debug, Default)]
pub struct Generation(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Generation {
    pub fn issue(&mut self) -> Ticket {
        self.0 += 1;
        Ticket(self.0)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.0 == ticket.0
    }

    /// Outstanding tickets become stale.
    pub fn bump(&mut self) {
        self.0 += 1;
    }
}

#[derive(Debug)]
pub struct Panel<T> {
    state: PanelState<T>,
    generation: Generation,
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Self {
            state: PanelState::Idle,
            generation: Generation::default(),
        }
    }
}

impl<T> Panel<T> {
    pub fn state(&self) -> &PanelState<T> {
        &self.state
    }

    pub fn begin(&mut self) -> Ticket {
        self.state = PanelState::Loading;
        self.generation.issue()
    }

    /// Returns false when a newer request superseded `ticket`; the result is dropped.
    pub fn complete(&mut self, ticket: Ticket, result: FetchResult<Fetched<T>>) -> bool {
        if !self.generation.is_current(ticket) {
            return false;
        }
        self.state = match result {
            Ok(Fetched::Live(data)) => PanelState::Ready {
                data,
                synthetic: false,
            },
            Ok(Fetched::Synthetic(data)) => PanelState::Ready {
                data,
                synthetic: true,
            },
            Ok(Fetched::Skipped) => PanelState::Idle,
            Err(err) => PanelState::Failed {
                message: err.to_string(),
            },
        };
        true
    }

    pub fn reset(&mut self) {
        self.generation.bump();
        self.state = PanelState::Idle;
    }
}
