//! Capability algebra: requirements a task needs, capabilities a worker has.
//!
//! A [`Capability`] satisfies a [`Requirement`] when the names match and the
//! capability's value is at least the requirement's value. Requirements
//! marked `consumes` reduce the matching capability's value when a task is
//! committed against it (see [`CapabilityBag::remaining_capabilities`]).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric type shared by every `Requirement`/`Capability` value.
///
/// The spec allows "the underlying numeric type (integers or reals)" as
/// long as implementations commit to one type per name; this crate commits
/// to `f64` everywhere, matching the untyped numerics of the original.
pub type Value = f64;

/// Arithmetic or lookup performed on mismatched names.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("can not combine differently named requirement/capability ({expected} vs {got})")]
    NameMismatch { expected: String, got: String },
}

/// A named, numerically valued resource demand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub consumes: bool,
}

impl Requirement {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self { name: name.into(), value, consumes: false }
    }

    pub fn consuming(name: impl Into<String>, value: Value) -> Self {
        Self { name: name.into(), value, consumes: true }
    }

    /// True iff `capability` has the same name and at least this value.
    pub fn meet(&self, capability: &Capability) -> bool {
        self.name == capability.name && self.value <= capability.value
    }

    /// Accumulate `other`'s value into this requirement's.
    ///
    /// Errors if the names differ — summing unrelated requirements is a
    /// programming error, never a silent no-op.
    pub fn add(&mut self, other: &Requirement) -> Result<(), CapabilityError> {
        if self.name != other.name {
            return Err(CapabilityError::NameMismatch {
                expected: self.name.clone(),
                got: other.name.clone(),
            });
        }
        self.value += other.value;
        Ok(())
    }
}

/// A named, numerically valued resource supply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub value: Value,
}

impl Capability {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self { name: name.into(), value }
    }

    /// True iff `requirement` has the same name and this value is at least
    /// as large.
    pub fn satisfy(&self, requirement: &Requirement) -> bool {
        self.name == requirement.name && self.value >= requirement.value
    }

    /// Subtract `requirement`'s value from this capability's.
    pub fn sub(&mut self, requirement: &Requirement) -> Result<(), CapabilityError> {
        if self.name != requirement.name {
            return Err(CapabilityError::NameMismatch {
                expected: self.name.clone(),
                got: requirement.name.clone(),
            });
        }
        self.value -= requirement.value;
        Ok(())
    }
}

/// Name-keyed set of [`Requirement`]s. Adding a requirement with an
/// existing name accumulates its value into the existing entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Requirements {
    by_name: HashMap<String, Requirement>,
}

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_iter(items: impl IntoIterator<Item = Requirement>) -> Self {
        let mut r = Self::new();
        for item in items {
            r.add(item);
        }
        r
    }

    /// Insert a requirement, accumulating into any existing entry of the
    /// same name.
    pub fn add(&mut self, requirement: Requirement) {
        match self.by_name.get_mut(&requirement.name) {
            Some(existing) => {
                // Names are guaranteed equal by the map key, so this never fails.
                let _ = existing.add(&requirement);
            }
            None => {
                self.by_name.insert(requirement.name.clone(), requirement);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Requirement> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.by_name.values()
    }

    /// True iff every requirement here is met by a same-named capability in
    /// `capabilities` with at least its value. A missing capability is
    /// always unsatisfied.
    pub fn meet(&self, capabilities: &Capabilities) -> bool {
        self.by_name.values().all(|req| match capabilities.get(&req.name) {
            Some(cap) => req.meet(cap),
            None => {
                tracing::debug!(requirement = %req.name, "capability not found for requirement");
                false
            }
        })
    }
}

/// Name-keyed set of [`Capability`] values. Adding a capability with an
/// existing name replaces the existing entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities {
    by_name: HashMap<String, Capability>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_iter(items: impl IntoIterator<Item = Capability>) -> Self {
        let mut c = Self::new();
        for item in items {
            c.add(item);
        }
        c
    }

    /// Insert a capability, overwriting any existing entry of the same name.
    pub fn add(&mut self, capability: Capability) {
        self.by_name.insert(capability.name.clone(), capability);
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.by_name.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Capability> {
        self.by_name.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.by_name.values()
    }

    /// True iff this set satisfies every requirement in `requirements`.
    pub fn satisfy(&self, requirements: &Requirements) -> bool {
        requirements.by_name.values().all(|req| match self.get(&req.name) {
            Some(cap) => cap.satisfy(req),
            None => false,
        })
    }
}

/// Capabilities paired with the requirements already committed against them.
///
/// `remaining()` answers "how much is left" after subtracting every
/// consuming requirement from its matching capability.
#[derive(Clone, Debug, Default)]
pub struct CapabilityBag {
    pub capabilities: Capabilities,
    pub requirements: Requirements,
}

impl CapabilityBag {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities, requirements: Requirements::new() }
    }

    /// Capabilities after subtracting every `consumes` requirement by name.
    pub fn remaining_capabilities(&self) -> Capabilities {
        let mut remaining = self.capabilities.clone();
        for req in self.requirements.iter() {
            if !req.consumes {
                continue;
            }
            if let Some(cap) = remaining.get_mut(&req.name) {
                // Names match by construction (same key), so this never fails.
                let _ = cap.sub(req);
            }
        }
        remaining
    }

    /// True iff the remaining capacity still satisfies `requirements`.
    pub fn can_add(&self, requirements: &Requirements) -> bool {
        self.remaining_capabilities().satisfy(requirements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_meet_capability_s1() {
        // S1: Requirement("water",10).meet(Capability("water",10)) -> true;
        // value 9 -> false; value 20 -> true.
        let req = Requirement::new("water", 10.0);
        assert!(req.meet(&Capability::new("water", 10.0)));
        assert!(!req.meet(&Capability::new("water", 9.0)));
        assert!(req.meet(&Capability::new("water", 20.0)));
    }

    #[test]
    fn meet_and_satisfy_are_duals() {
        let req = Requirement::new("fuel", 5.0);
        let cap = Capability::new("fuel", 5.0);
        assert_eq!(req.meet(&cap), cap.satisfy(&req));
        assert!(req.meet(&cap));
    }

    #[test]
    fn name_mismatch_is_never_met() {
        let req = Requirement::new("water", 1.0);
        let cap = Capability::new("fuel", 100.0);
        assert!(!req.meet(&cap));
        assert!(!cap.satisfy(&req));
    }

    #[test]
    fn requirements_accumulate_by_name() {
        let mut reqs = Requirements::new();
        reqs.add(Requirement::new("water", 3.0));
        reqs.add(Requirement::new("water", 4.0));
        assert_eq!(reqs.get("water").unwrap().value, 7.0);
    }

    #[test]
    fn capabilities_overwrite_by_name() {
        let mut caps = Capabilities::new();
        caps.add(Capability::new("water", 3.0));
        caps.add(Capability::new("water", 4.0));
        assert_eq!(caps.get("water").unwrap().value, 4.0);
    }

    #[test]
    fn capability_sub_rejects_name_mismatch() {
        let mut cap = Capability::new("water", 10.0);
        let err = cap.sub(&Requirement::new("fuel", 1.0)).unwrap_err();
        assert_eq!(
            err,
            CapabilityError::NameMismatch { expected: "water".into(), got: "fuel".into() }
        );
    }

    #[test]
    fn requirements_meet_missing_capability_is_false() {
        let mut reqs = Requirements::new();
        reqs.add(Requirement::new("water", 1.0));
        let caps = Capabilities::new();
        assert!(!reqs.meet(&caps));
    }

    #[test]
    fn capability_bag_can_add_consumes_reduces_remaining() {
        let mut caps = Capabilities::new();
        caps.add(Capability::new("water", 10.0));
        let mut bag = CapabilityBag::new(caps);
        bag.requirements.add(Requirement::consuming("water", 4.0));

        let remaining = bag.remaining_capabilities();
        assert_eq!(remaining.get("water").unwrap().value, 6.0);

        let mut more = Requirements::new();
        more.add(Requirement::new("water", 6.0));
        assert!(bag.can_add(&more));

        let mut too_much = Requirements::new();
        too_much.add(Requirement::new("water", 7.0));
        assert!(!bag.can_add(&too_much));
    }

    #[test]
    fn capability_bag_ignores_non_consuming_requirements() {
        let mut caps = Capabilities::new();
        caps.add(Capability::new("water", 10.0));
        let mut bag = CapabilityBag::new(caps);
        bag.requirements.add(Requirement::new("water", 4.0));

        let remaining = bag.remaining_capabilities();
        assert_eq!(remaining.get("water").unwrap().value, 10.0);
    }
}
