//! Lifecycle Module
//!
//! Host lifecycle of one proxy version: installing, waiting, activating,
//! activated.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde::Serialize;

use crate::error::{ProxyError, Result};

// == Lifecycle State ==
/// Where a proxy version is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Constructed, install not started
    Parsed,
    /// Install in progress
    Installing,
    /// Installed and waiting to take over
    Installed,
    /// Activation in progress
    Activating,
    /// Active and intercepting requests
    Activated,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct Inner {
    state: LifecycleState,
    skip_waiting: bool,
    clients_claimed: bool,
}

// == Lifecycle ==
/// Shared lifecycle tracker.
#[derive(Debug)]
pub struct Lifecycle {
    inner: RwLock<Inner>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Creates a lifecycle in the `Parsed` state.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                state: LifecycleState::Parsed,
                skip_waiting: false,
                clients_claimed: false,
            }),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> LifecycleState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    /// Requests activation without waiting for clients to close.
    ///
    /// Valid in any state and idempotent.
    pub fn skip_waiting(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .skip_waiting = true;
    }

    /// Returns true once skip-waiting has been requested.
    pub fn skip_waiting_requested(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .skip_waiting
    }

    /// Returns true while installed but not yet activating.
    pub fn is_waiting(&self) -> bool {
        self.state() == LifecycleState::Installed
    }

    /// Marks every open client session as controlled by this version.
    pub fn claim_clients(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clients_claimed = true;
    }

    /// Returns true once open clients have been claimed.
    pub fn clients_claimed(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clients_claimed
    }

    /// Returns true if this version should see fetches.
    pub fn intercepting(&self) -> bool {
        self.state() == LifecycleState::Activated
    }

    // == Transitions ==
    /// Parsed -> Installing
    pub fn begin_install(&self) -> Result<()> {
        self.transition(LifecycleState::Parsed, LifecycleState::Installing)
    }

    /// Installing -> Installed
    pub fn finish_install(&self) -> Result<()> {
        self.transition(LifecycleState::Installing, LifecycleState::Installed)
    }

    /// Installed -> Activating
    pub fn begin_activate(&self) -> Result<()> {
        self.transition(LifecycleState::Installed, LifecycleState::Activating)
    }

    /// Installed -> Activating, only if skip-waiting was requested.
    ///
    /// The check and the transition happen under one lock, so of several
    /// concurrent callers exactly one gets `true`.
    pub fn begin_activate_if_ready(&self) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.state == LifecycleState::Installed && inner.skip_waiting {
            inner.state = LifecycleState::Activating;
            true
        } else {
            false
        }
    }

    /// Activating -> Activated
    pub fn finish_activate(&self) -> Result<()> {
        self.transition(LifecycleState::Activating, LifecycleState::Activated)
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.state != from {
            return Err(ProxyError::InvalidRequest(format!(
                "cannot move to {} from {} (expected {})",
                to, inner.state, from
            )));
        }
        inner.state = to;
        Ok(())
    }
}
