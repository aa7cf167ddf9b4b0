//! Execution planner - orders units into waves

use crate::identity::ResourceIdentity;
use crate::kind::Unit;
use crate::state::Ensure;
use std::collections::{BTreeMap, HashSet};

/// Units with the same tier and direction; safe to run in parallel
#[derive(Debug)]
pub struct Wave<'a> {
    pub tier: u32,
    pub ensure: Ensure,
    pub units: Vec<&'a Unit>,
}

/// An execution plan: every unit of one run
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    units: Vec<Unit>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, unit: Unit) {
        self.units.push(unit);
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Group units into waves
    ///
    /// Present units run tier by tier, lowest first (parents before
    /// children); absent units follow, highest tier first (children deleted
    /// before parents).
    pub fn waves(&self) -> Vec<Wave<'_>> {
        let mut present: BTreeMap<u32, Vec<&Unit>> = BTreeMap::new();
        let mut absent: BTreeMap<u32, Vec<&Unit>> = BTreeMap::new();
        for unit in &self.units {
            let bucket = match unit.desired.ensure() {
                Ensure::Present => &mut present,
                Ensure::Absent => &mut absent,
            };
            bucket.entry(unit.tier).or_default().push(unit);
        }

        let ups = present.into_iter().map(|(tier, units)| Wave {
            tier,
            ensure: Ensure::Present,
            units,
        });
        let downs = absent.into_iter().rev().map(|(tier, units)| Wave {
            tier,
            ensure: Ensure::Absent,
            units,
        });
        ups.chain(downs).collect()
    }

    /// Identities that appear more than once
    pub fn duplicates(&self) -> Vec<&ResourceIdentity> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for unit in &self.units {
            if !seen.insert(&unit.identity) && !dupes.contains(&&unit.identity) {
                dupes.push(&unit.identity);
            }
        }
        dupes
    }

    /// Filter plan to only include units matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Unit) -> bool,
    {
        Self {
            units: self.units.into_iter().filter(|u| predicate(u)).collect(),
        }
    }

    /// Filter plan to only include units matching a target pattern
    ///
    /// Target format: "kind" or "kind.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, name) = parse_target(t);
                self.filter(|u| matches_filter(u, kind, name))
            }
        }
    }

    /// Total number of units in the plan
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Parse a target string like "kind.name" into (kind, name)
fn parse_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('.') {
        Some((kind, name)) => (kind, Some(name)),
        None => (target, None),
    }
}

/// Check if a unit matches the filter criteria
fn matches_filter(unit: &Unit, kind: &str, name: Option<&str>) -> bool {
    unit.kind() == kind && name.is_none_or(|n| unit.name() == n)
}
