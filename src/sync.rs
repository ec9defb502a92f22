//! Current/prior-year pairing. The coordinator owns the pairs; instances
//! never reference each other.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::widget::{FilterState, InstanceId, WidgetInstance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TwinPair {
    pub current: InstanceId,
    pub prior: InstanceId,
}

impl TwinPair {
    pub fn contains(&self, id: InstanceId) -> bool {
        self.current == id || self.prior == id
    }

    pub fn other(&self, id: InstanceId) -> Option<InstanceId> {
        if id == self.current {
            Some(self.prior)
        } else if id == self.prior {
            Some(self.current)
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncCoordinator {
    pairs: Vec<TwinPair>,
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair two instances, replacing any pair either one was part of.
    pub fn register(&mut self, current: InstanceId, prior: InstanceId) -> TwinPair {
        self.pairs
            .retain(|p| !p.contains(current) && !p.contains(prior));
        let pair = TwinPair { current, prior };
        self.pairs.push(pair);
        pair
    }

    pub fn unregister(&mut self, id: InstanceId) -> Option<TwinPair> {
        let pos = self.pairs.iter().position(|p| p.contains(id))?;
        Some(self.pairs.remove(pos))
    }

    pub fn twin_of(&self, id: InstanceId) -> Option<InstanceId> {
        self.pairs.iter().find_map(|p| p.other(id))
    }

    pub fn pairs(&self) -> &[TwinPair] {
        &self.pairs
    }

    /// Set `filter` on `origin` and verbatim on its twin, if any.
    ///
    /// Returns the instances whose state changed, origin first. Rebuilding
    /// them before the next interaction is the caller's job.
    pub fn propagate(
        &self,
        origin: InstanceId,
        filter: &FilterState,
        instances: &mut BTreeMap<InstanceId, WidgetInstance>,
    ) -> Vec<InstanceId> {
        let mut touched = Vec::with_capacity(2);
        for id in std::iter::once(origin).chain(self.twin_of(origin)) {
            if let Some(instance) = instances.get_mut(&id) {
                instance.filter = filter.clone();
                touched.push(id);
            }
        }
        debug!(origin, ?touched, ?filter, "propagated filter state");
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::Role;

    fn instances() -> BTreeMap<InstanceId, WidgetInstance> {
        let mut map = BTreeMap::new();
        map.insert(0, WidgetInstance::new(0, 0, Role::Current));
        map.insert(1, WidgetInstance::new(1, 0, Role::Prior));
        map.insert(2, WidgetInstance::new(2, 1, Role::Current));
        map
    }

    #[test]
    fn twins_are_symmetric() {
        let mut sync = SyncCoordinator::new();
        sync.register(0, 1);
        assert_eq!(sync.twin_of(0), Some(1));
        assert_eq!(sync.twin_of(1), Some(0));
        assert_eq!(sync.twin_of(2), None);
    }

    #[test]
    fn propagation_reaches_the_twin_only() {
        let mut sync = SyncCoordinator::new();
        sync.register(0, 1);
        let mut map = instances();
        let filter = FilterState::Focus {
            path: vec!["Visa".into()],
        };

        let touched = sync.propagate(1, &filter, &mut map);
        assert_eq!(touched, vec![1, 0]);
        assert_eq!(map[&0].filter, filter);
        assert_eq!(map[&1].filter, filter);
        assert_eq!(map[&2].filter, FilterState::Unfiltered);
    }

    #[test]
    fn unregistering_breaks_the_pair() {
        let mut sync = SyncCoordinator::new();
        sync.register(0, 1);
        assert_eq!(sync.unregister(1), Some(TwinPair { current: 0, prior: 1 }));
        assert!(sync.pairs().is_empty());

        let mut map = instances();
        let touched = sync.propagate(0, &FilterState::Node { name: "Tax".into() }, &mut map);
        assert_eq!(touched, vec![0]);
        assert_eq!(map[&1].filter, FilterState::Unfiltered);
    }

    #[test]
    fn re_registering_replaces_the_old_pair() {
        let mut sync = SyncCoordinator::new();
        sync.register(0, 1);
        sync.register(0, 3);
        assert_eq!(sync.pairs().len(), 1);
        assert_eq!(sync.twin_of(0), Some(3));
        assert_eq!(sync.twin_of(1), None);
    }
}
