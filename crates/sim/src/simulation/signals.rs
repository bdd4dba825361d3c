//! Lifecycle signals and their subscriber lists.

use super::OrgPosition;
use std::fmt;

/// Kinds of signal a module may subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    BeforeUpdate,
    AfterUpdate,
    OnBirth,
    OnDeath,
    OnPlacement,
}

impl SignalKind {
    pub const ALL: [SignalKind; 5] = [
        SignalKind::BeforeUpdate,
        SignalKind::AfterUpdate,
        SignalKind::OnBirth,
        SignalKind::OnDeath,
        SignalKind::OnPlacement,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A signal occurrence with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    BeforeUpdate { generation: usize },
    AfterUpdate { generation: usize },
    /// An offspring of `parent` was placed at `pos`.
    OnBirth { pos: OrgPosition, parent: OrgPosition },
    /// The organism at `pos` was removed.
    OnDeath { pos: OrgPosition },
    /// An organism now lives at `pos`.
    OnPlacement { pos: OrgPosition },
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::BeforeUpdate { .. } => SignalKind::BeforeUpdate,
            Self::AfterUpdate { .. } => SignalKind::AfterUpdate,
            Self::OnBirth { .. } => SignalKind::OnBirth,
            Self::OnDeath { .. } => SignalKind::OnDeath,
            Self::OnPlacement { .. } => SignalKind::OnPlacement,
        }
    }
}

/// Module indices subscribed to each signal kind, in subscription order.
#[derive(Debug, Clone, Default)]
pub struct SignalTable {
    subscribers: [Vec<usize>; 5],
}

impl SignalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe module `module` to `kind`. Repeated subscriptions are ignored.
    pub fn subscribe(&mut self, kind: SignalKind, module: usize) {
        let list = &mut self.subscribers[kind.index()];
        if !list.contains(&module) {
            list.push(module);
        }
    }

    pub fn subscribers(&self, kind: SignalKind) -> &[usize] {
        &self.subscribers[kind.index()]
    }

    pub fn clear(&mut self) {
        self.subscribers.iter_mut().for_each(Vec::clear);
    }
}
