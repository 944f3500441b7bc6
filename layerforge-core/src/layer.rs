//! The fixed layer/dependency model (spec.md §3 `LayerId`, `LayerSpec`).

use std::collections::BTreeSet;
use std::time::Duration;

/// A numbered transformation layer with fixed semantics.
///
/// `1` Configuration, `2` Patterns, `3` Components, `4` Hydration,
/// `5` Framework-Specific, `6` Testing/Quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum LayerId {
    Configuration = 1,
    Patterns = 2,
    Components = 3,
    Hydration = 4,
    FrameworkSpecific = 5,
    TestingQuality = 6,
}

/// Every layer id, ascending. Used wherever an exhaustive sweep is needed
/// (issue detection, default selection).
pub const ALL_LAYERS: [LayerId; 6] = [
    LayerId::Configuration,
    LayerId::Patterns,
    LayerId::Components,
    LayerId::Hydration,
    LayerId::FrameworkSpecific,
    LayerId::TestingQuality,
];

impl LayerId {
    /// Parse a raw layer number (`1..=6`). Anything else is `None` — the
    /// orchestrator turns this into `EngineError::InvalidRequest`.
    pub fn from_u8(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Configuration),
            2 => Some(Self::Patterns),
            3 => Some(Self::Components),
            4 => Some(Self::Hydration),
            5 => Some(Self::FrameworkSpecific),
            6 => Some(Self::TestingQuality),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Patterns => "patterns",
            Self::Components => "components",
            Self::Hydration => "hydration",
            Self::FrameworkSpecific => "framework-specific",
            Self::TestingQuality => "testing-quality",
        }
    }

    /// The layer ids this layer transitively depends on (spec.md §3).
    pub fn dependencies(self) -> BTreeSet<LayerId> {
        use LayerId::*;
        match self {
            Configuration => BTreeSet::new(),
            Patterns => BTreeSet::from([Configuration]),
            Components => BTreeSet::from([Configuration, Patterns]),
            Hydration => BTreeSet::from([Configuration, Patterns, Components]),
            FrameworkSpecific => {
                BTreeSet::from([Configuration, Patterns, Components, Hydration])
            }
            TestingQuality => BTreeSet::from([
                Configuration,
                Patterns,
                Components,
                Hydration,
                FrameworkSpecific,
            ]),
        }
    }

    /// The strategy this layer prefers (spec.md §4.2): textual layers are
    /// `1`, `2`, `6`; structural-preferred layers are `3`, `4`, `5`.
    pub fn strategy(self) -> Strategy {
        use LayerId::*;
        match self {
            Configuration | Patterns | TestingQuality => Strategy::Textual,
            Components | Hydration | FrameworkSpecific => Strategy::StructuralPreferred,
        }
    }

    /// Whether this layer is critical — its failure aborts the whole
    /// orchestration rather than being recorded and skipped (spec.md §4.1
    /// step 4e). Open question resolved in DESIGN.md: only Configuration is
    /// critical, since every other layer's dependency closure passes
    /// through it and a broken configuration pass would otherwise silently
    /// feed garbage into every later layer.
    pub fn is_critical(self) -> bool {
        matches!(self, LayerId::Configuration)
    }

    /// Default per-layer deadline absent an override (spec.md §4.1 options,
    /// §5 "each layer has a per-layer deadline"). Structural-preferred
    /// layers get a longer budget to cover a structural attempt plus a
    /// textual fallback.
    pub fn default_deadline(self) -> Duration {
        match self.strategy() {
            Strategy::Textual => Duration::from_millis(500),
            Strategy::StructuralPreferred => Duration::from_secs(2),
        }
    }

    pub fn spec(self) -> LayerSpec {
        LayerSpec {
            id: self,
            name: self.name(),
            strategy: self.strategy(),
            critical: self.is_critical(),
            deadline: self.default_deadline(),
            dependencies: self.dependencies(),
        }
    }
}

/// Which code path `LayerRunner` prefers for a layer (spec.md §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Strategy {
    /// Invoke the textual transformer directly.
    Textual,
    /// Attempt the structural (AST) transformer first, falling back to the
    /// textual transformer on any failure of the structural path.
    StructuralPreferred,
}

/// The full, denormalised spec for one layer (spec.md §3 `LayerSpec`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LayerSpec {
    pub id: LayerId,
    pub name: &'static str,
    pub strategy: Strategy,
    pub critical: bool,
    #[serde(with = "duration_millis")]
    pub deadline: Duration,
    pub dependencies: BTreeSet<LayerId>,
}

mod duration_millis {
    use super::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Compute the dependency closure of a requested layer set: the smallest
/// superset that is closed under `dependencies()`, per spec.md §3's
/// invariant that dependencies are transitively closed and acyclic and
/// spec.md §4.1 step 1. Returns the closure in ascending `LayerId` order
/// plus the set of ids that were auto-added beyond what was requested.
pub fn dependency_closure(requested: &BTreeSet<LayerId>) -> (BTreeSet<LayerId>, BTreeSet<LayerId>) {
    let mut closure: BTreeSet<LayerId> = requested.clone();
    for &layer in requested {
        closure.extend(layer.dependencies());
    }
    let auto_added: BTreeSet<LayerId> = closure.difference(requested).copied().collect();
    (closure, auto_added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn dependencies_are_transitively_closed() {
        for layer in ALL_LAYERS {
            let deps = layer.dependencies();
            for dep in &deps {
                assert!(
                    dep.dependencies().is_subset(&deps),
                    "{:?}'s dependency {:?} has deps outside the closure",
                    layer,
                    dep
                );
            }
        }
    }

    #[test]
    fn closure_of_components_is_configuration_patterns_components() {
        let requested = BTreeSet::from([LayerId::Components]);
        let (closure, added) = dependency_closure(&requested);
        assert_eq!(
            closure,
            BTreeSet::from([LayerId::Configuration, LayerId::Patterns, LayerId::Components])
        );
        assert_eq!(added, BTreeSet::from([LayerId::Configuration, LayerId::Patterns]));
    }

    #[test]
    fn closure_is_ascending_and_idempotent() {
        let requested = BTreeSet::from([LayerId::TestingQuality]);
        let (closure, _) = dependency_closure(&requested);
        let ids: Vec<u8> = closure.iter().map(|l| l.as_u8()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        let (closure2, _) = dependency_closure(&closure);
        assert_eq!(closure, closure2);
    }

    fn arb_layer_set() -> impl proptest::strategy::Strategy<Value = BTreeSet<LayerId>> {
        use proptest::prelude::*;
        proptest::collection::btree_set(0u8..ALL_LAYERS.len() as u8, 0..=ALL_LAYERS.len())
            .prop_map(|ids| ids.into_iter().map(|i| ALL_LAYERS[i as usize]).collect())
    }

    proptest::proptest! {
        /// Closing an arbitrary requested set is idempotent: closing again
        /// changes nothing (spec.md §3's "dependencies are transitively
        /// closed" invariant, checked over generated subsets rather than
        /// the six hand-picked ones above).
        #[test]
        fn closure_is_idempotent_over_arbitrary_subsets(requested in arb_layer_set()) {
            let (closure, _) = dependency_closure(&requested);
            let (closure2, _) = dependency_closure(&closure);
            prop_assert_eq!(closure, closure2);
        }

        /// The closure is always a superset of what was requested, and
        /// every member's own dependencies are also in the closure.
        #[test]
        fn closure_is_superset_and_self_contained(requested in arb_layer_set()) {
            let (closure, _) = dependency_closure(&requested);
            prop_assert!(requested.is_subset(&closure));
            for layer in &closure {
                prop_assert!(layer.dependencies().is_subset(&closure));
            }
        }

        /// Closure is monotone: requesting a superset never yields a
        /// smaller closure.
        #[test]
        fn closure_is_monotone(a in arb_layer_set(), b in arb_layer_set()) {
            let union: BTreeSet<LayerId> = a.union(&b).copied().collect();
            let (closure_union, _) = dependency_closure(&union);
            let (closure_a, _) = dependency_closure(&a);
            prop_assert!(closure_a.is_subset(&closure_union));
        }
    }
}
