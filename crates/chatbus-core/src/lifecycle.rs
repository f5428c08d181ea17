use crate::CoreError;
use std::fmt;
use tracing::{error, info};

/// Ownership of the well-known name, as seen by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnershipState {
    Unowned,
    NameRequested,
    NameOwned,
    NameLost,
    Unregistering,
}

impl fmt::Display for OwnershipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OwnershipState::Unowned => "unowned",
            OwnershipState::NameRequested => "name-requested",
            OwnershipState::NameOwned => "name-owned",
            OwnershipState::NameLost => "name-lost",
            OwnershipState::Unregistering => "unregistering",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameEvent {
    Requested,
    Acquired,
    Lost,
    ShutdownRequested,
    Released,
}

impl NameEvent {
    fn target(self) -> OwnershipState {
        match self {
            NameEvent::Requested => OwnershipState::NameRequested,
            NameEvent::Acquired => OwnershipState::NameOwned,
            NameEvent::Lost => OwnershipState::NameLost,
            NameEvent::ShutdownRequested => OwnershipState::Unregistering,
            NameEvent::Released => OwnershipState::Unowned,
        }
    }
}

pub fn validate_transition(from: OwnershipState, to: OwnershipState) -> Result<(), CoreError> {
    use OwnershipState::{NameLost, NameOwned, NameRequested, Unowned, Unregistering};

    let valid = matches!(
        (from, to),
        (Unowned, NameRequested)
            | (NameRequested | NameOwned, NameOwned | NameLost | Unregistering)
            | (NameLost | Unregistering, Unowned)
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Tracks ownership of one well-known name through its lifetime.
#[derive(Debug)]
pub struct LifecycleController {
    name: String,
    state: OwnershipState,
}

impl LifecycleController {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: OwnershipState::Unowned,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> OwnershipState {
        self.state
    }

    /// Losing the name is unrecoverable: without it the service has no identity.
    pub fn is_lost(&self) -> bool {
        self.state == OwnershipState::NameLost
    }

    pub fn apply(&mut self, event: NameEvent) -> Result<OwnershipState, CoreError> {
        let to = event.target();
        validate_transition(self.state, to)?;
        if to != self.state {
            if to == OwnershipState::NameLost {
                error!("lost ownership of {}", self.name);
            } else {
                info!("{}: {} -> {to}", self.name, self.state);
            }
        }
        self.state = to;
        Ok(to)
    }
}
