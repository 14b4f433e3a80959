use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

/// Archive names currently being imported by some lane.
///
/// A second lane asking for a name that is already held blocks until the
/// holder's [`InFlightGuard`] drops.
#[derive(Default)]
pub(crate) struct InFlight {
    names: Mutex<HashSet<String>>,
    released: Condvar,
}

impl InFlight {
    pub(crate) fn acquire(&self, name: &str) -> InFlightGuard<'_> {
        let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);
        while names.contains(name) {
            tracing::debug!(name, "waiting for in-flight import of the same entry");
            names = self
                .released
                .wait(names)
                .unwrap_or_else(PoisonError::into_inner);
        }
        names.insert(name.to_string());
        InFlightGuard {
            owner: self,
            name: name.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }
}

pub(crate) struct InFlightGuard<'a> {
    owner: &'a InFlight,
    name: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut names = self
            .owner
            .names
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        names.remove(&self.name);
        self.owner.released.notify_all();
    }
}
