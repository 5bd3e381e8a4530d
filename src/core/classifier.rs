use crate::models::{PreferenceName, PreferenceSet};
use std::collections::BTreeSet;

/// Declared preferences split into the must-haves (hard filters) and the
/// nice-to-haves (scored and explained only).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreferencePartition {
    pub mandatory: BTreeSet<PreferenceName>,
    /// Evaluation order
    pub optional: Vec<PreferenceName>,
}

impl PreferencePartition {
    pub fn is_mandatory(&self, name: PreferenceName) -> bool {
        self.mandatory.contains(&name)
    }

    /// Mandatory preferences among `names`
    pub fn mandatory_among<'a>(&'a self, names: &'a [PreferenceName]) -> impl Iterator<Item = PreferenceName> + 'a {
        names.iter().copied().filter(move |name| self.mandatory.contains(name))
    }
}

/// Split a preference set. The home state is context for tuition, never scored.
pub fn classify(preferences: &PreferenceSet) -> PreferencePartition {
    let mandatory = preferences.must_haves().clone();
    let optional = preferences
        .declared()
        .filter(|name| *name != PreferenceName::HomeState && !mandatory.contains(name))
        .collect();

    PreferencePartition { mandatory, optional }
}
