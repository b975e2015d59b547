//! Named settings and presets.
//!
//! Both catalogs are closed enums, enumerable for discovery endpoints;
//! lookups by name happen through these tables, never by reflection, so an
//! invalid name is a caller error at the boundary and nothing else.

/// A named engine setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    /// Hard cap on fixed-point iterations of a `whileApplicable` plan.
    MaxFixpointIterations,
    /// Drop trivial steps (identity removals) from recorded derivations.
    SkipTrivialSteps,
    /// Verify solution sets by substitution after solving.
    VerifySolutions,
}

/// Value of a setting; the kind is fixed per setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingValue {
    Bool(bool),
    Integer(u32),
}

impl Setting {
    pub const ALL: &'static [Setting] = &[
        Setting::MaxFixpointIterations,
        Setting::SkipTrivialSteps,
        Setting::VerifySolutions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Setting::MaxFixpointIterations => "max_fixpoint_iterations",
            Setting::SkipTrivialSteps => "skip_trivial_steps",
            Setting::VerifySolutions => "verify_solutions",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Setting::MaxFixpointIterations => {
                "Upper bound on iterations of repeat-until-stable plans; exceeding it is \
                 reported as a budget error, distinct from not-applicable"
            }
            Setting::SkipTrivialSteps => {
                "Omit steps that only remove identities (x + 0, x * 1) from the recorded \
                 derivation"
            }
            Setting::VerifySolutions => {
                "After solving, substitute each solution into the original equation and check it"
            }
        }
    }

    pub fn default_value(self) -> SettingValue {
        match self {
            Setting::MaxFixpointIterations => SettingValue::Integer(64),
            Setting::SkipTrivialSteps => SettingValue::Bool(false),
            Setting::VerifySolutions => SettingValue::Bool(false),
        }
    }

    pub fn from_name(name: &str) -> Option<Setting> {
        Setting::ALL.iter().copied().find(|s| s.name() == name)
    }
}

/// A named bundle of settings, resolved once when a context is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// Engine defaults.
    Default,
    /// Full didactic detail: every step recorded, generous iteration room.
    Didactic,
    /// Compact derivations for experienced readers.
    Concise,
    /// Defensive solving: verify solution sets by substitution.
    Careful,
}

impl Preset {
    pub const ALL: &'static [Preset] = &[
        Preset::Default,
        Preset::Didactic,
        Preset::Concise,
        Preset::Careful,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Default => "default",
            Preset::Didactic => "didactic",
            Preset::Concise => "concise",
            Preset::Careful => "careful",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Preset::Default => "Engine defaults",
            Preset::Didactic => "Record every step in full detail",
            Preset::Concise => "Skip trivial steps in recorded derivations",
            Preset::Careful => "Verify solution sets by substitution",
        }
    }

    pub fn settings(self) -> Vec<(Setting, SettingValue)> {
        match self {
            Preset::Default => vec![],
            Preset::Didactic => vec![
                (Setting::SkipTrivialSteps, SettingValue::Bool(false)),
                (Setting::MaxFixpointIterations, SettingValue::Integer(256)),
            ],
            Preset::Concise => vec![(Setting::SkipTrivialSteps, SettingValue::Bool(true))],
            Preset::Careful => vec![(Setting::VerifySolutions, SettingValue::Bool(true))],
        }
    }

    pub fn from_name(name: &str) -> Option<Preset> {
        Preset::ALL.iter().copied().find(|p| p.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup_by_name() {
        assert_eq!(
            Setting::from_name("skip_trivial_steps"),
            Some(Setting::SkipTrivialSteps)
        );
        assert_eq!(Setting::from_name("no_such_setting"), None);
        assert_eq!(Preset::from_name("careful"), Some(Preset::Careful));
        for s in Setting::ALL {
            assert!(!s.description().is_empty());
        }
    }
}
