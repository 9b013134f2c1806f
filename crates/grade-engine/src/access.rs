//! Usage gating.
//!
//! Entitled callers have unlimited use. Everyone else gets a single free
//! use, tracked per caller id for the lifetime of the [`UsageGate`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::{EngineError, EngineResult};

/// Answers whether a caller has a paid entitlement.
pub trait Entitlements: Send + Sync {
    fn is_entitled(&self, caller: &str) -> bool;
}

impl<F> Entitlements for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_entitled(&self, caller: &str) -> bool {
        self(caller)
    }
}

/// Fixed set of entitled callers.
#[derive(Debug, Clone, Default)]
pub struct EntitledSet(HashSet<String>);

impl EntitledSet {
    pub fn new<I, S>(callers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(callers.into_iter().map(Into::into).collect())
    }
}

impl Entitlements for EntitledSet {
    fn is_entitled(&self, caller: &str) -> bool {
        self.0.contains(caller)
    }
}

/// Entitled => unlimited; otherwise one free use per caller.
pub struct UsageGate {
    entitlements: Arc<dyn Entitlements>,
    used: Mutex<HashSet<String>>,
}

impl UsageGate {
    pub fn new(entitlements: Arc<dyn Entitlements>) -> Self {
        Self {
            entitlements,
            used: Mutex::new(HashSet::new()),
        }
    }

    /// Admits `caller` or fails with [`EngineError::NotEntitled`].
    ///
    /// A non-entitled caller's first call consumes their free use.
    pub fn authorize(&self, caller: &str) -> EngineResult<()> {
        if self.entitlements.is_entitled(caller) {
            return Ok(());
        }
        let mut used = self
            .used
            .lock()
            .map_err(|_| EngineError::Store("usage ledger lock poisoned".into()))?;
        if used.insert(caller.to_string()) {
            debug!(caller, "free use consumed");
            Ok(())
        } else {
            Err(EngineError::NotEntitled(caller.to_string()))
        }
    }

    /// Whether `caller` could be admitted now, without consuming anything.
    pub fn would_admit(&self, caller: &str) -> bool {
        self.entitlements.is_entitled(caller)
            || self.used.lock().is_ok_and(|used| !used.contains(caller))
    }
}

impl std::fmt::Debug for UsageGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageGate")
            .field("free_uses_consumed", &self.used.lock().map_or(0, |u| u.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entitled_callers_are_unlimited() {
        let gate = UsageGate::new(Arc::new(EntitledSet::new(["pro"])));
        for _ in 0..5 {
            gate.authorize("pro").unwrap();
        }
    }

    #[test]
    fn single_free_use() {
        let gate = UsageGate::new(Arc::new(|_: &str| false));
        assert!(gate.would_admit("guest"));
        gate.authorize("guest").unwrap();
        assert!(!gate.would_admit("guest"));
        assert!(matches!(gate.authorize("guest"), Err(EngineError::NotEntitled(c)) if c == "guest"));
        gate.authorize("other").unwrap();
    }
}
