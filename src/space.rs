//! # Configuration Space
//!
//! Enumerates the feature-flag combinations a sweep evaluates. Two strategies
//! are supported:
//!
//! - **Power set**: every combination of the named flags, `2^k` entries,
//!   all-disabled first and all-enabled last (the first flag is the most
//!   significant bit).
//! - **Scenarios**: a curated, ordered list of named flag subsets such as
//!   "MPSC - 2 Threads".
//!
//! Every `Configuration` carries a value for every flag of its space, in the
//! space's flag order, so report labels always line up with the values that
//! were written into the source.

use serde::Serialize;
use std::fmt;

/// Most flags a power set may span; each configuration costs a full rebuild
pub const MAX_POWER_SET_FLAGS: usize = 16;

/// One point of the configuration space: a value per flag, in flag order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Configuration {
    /// Scenario name, if this configuration came from a curated list
    pub name: Option<String>,
    pub flags: Vec<(String, bool)>,
}

impl Configuration {
    /// The configuration with every flag disabled
    pub fn baseline<S: AsRef<str>>(flag_names: &[S]) -> Self {
        Self {
            name: None,
            flags: flag_names
                .iter()
                .map(|n| (n.as_ref().to_string(), false))
                .collect(),
        }
    }

    /// Whether `flag` is enabled. Flags absent from the configuration are disabled.
    pub fn is_enabled(&self, flag: &str) -> bool {
        self.flags
            .iter()
            .any(|(name, enabled)| name == flag && *enabled)
    }

    pub fn is_baseline(&self) -> bool {
        self.flags.iter().all(|(_, enabled)| !enabled)
    }

    /// Names of the enabled flags, in flag order
    pub fn enabled_flags(&self) -> impl Iterator<Item = &str> {
        self.flags
            .iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(name, _)| name.as_str())
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self
            .flags
            .iter()
            .map(|(name, enabled)| format!("{}: {}", name, enabled))
            .collect::<Vec<_>>()
            .join(", ");

        match &self.name {
            Some(name) => write!(f, "{} ({})", name, values),
            None => write!(f, "{}", values),
        }
    }
}

/// A hand-picked subset of flags to enable, with a display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub enabled: Vec<String>,
}

impl Scenario {
    pub fn new(name: &str, enabled: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            enabled: enabled.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The ring benchmark's four threading/producer modes
    ///
    /// `BP` collapses producer and consumer onto one thread; `MPSC` switches
    /// to multiple producers.
    pub fn ring_modes() -> Vec<Scenario> {
        vec![
            Scenario::new("SPSC - 2 Threads", &[]),
            Scenario::new("MPSC - 2 Threads", &["MPSC"]),
            Scenario::new("SPSC - 1 Thread", &["BP"]),
            Scenario::new("MPSC - 1 Thread", &["MPSC", "BP"]),
        ]
    }
}

/// An ordered, finite sequence of configurations to evaluate
#[derive(Debug, Clone)]
pub struct ConfigurationSpace {
    flag_names: Vec<String>,
    configurations: Vec<Configuration>,
}

impl ConfigurationSpace {
    /// Every combination of `flag_names`
    ///
    /// An empty flag set yields exactly one configuration, the baseline.
    ///
    /// # Panics
    /// If more than `MAX_POWER_SET_FLAGS` flags are given. `DriverConfig`
    /// rejects such flag lists as a usage error.
    pub fn power_set<S: AsRef<str>>(flag_names: &[S]) -> Self {
        let names: Vec<String> = flag_names.iter().map(|n| n.as_ref().to_string()).collect();
        let k = names.len();
        assert!(
            k <= MAX_POWER_SET_FLAGS,
            "power set over {} flags exceeds the limit of {}",
            k,
            MAX_POWER_SET_FLAGS
        );

        let configurations = (0..1usize << k)
            .map(|bits| Configuration {
                name: None,
                flags: names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), (bits >> (k - 1 - i)) & 1 == 1))
                    .collect(),
            })
            .collect();

        Self {
            flag_names: names,
            configurations,
        }
    }

    /// The given scenarios, in order
    ///
    /// Scenario flags outside `flag_names` are ignored here; `DriverConfig`
    /// rejects such scenarios before a space is built.
    pub fn scenarios<S: AsRef<str>>(flag_names: &[S], scenarios: &[Scenario]) -> Self {
        let names: Vec<String> = flag_names.iter().map(|n| n.as_ref().to_string()).collect();

        let configurations = scenarios
            .iter()
            .map(|scenario| Configuration {
                name: Some(scenario.name.clone()),
                flags: names
                    .iter()
                    .map(|name| (name.clone(), scenario.enabled.contains(name)))
                    .collect(),
            })
            .collect();

        Self {
            flag_names: names,
            configurations,
        }
    }

    pub fn flag_names(&self) -> &[String] {
        &self.flag_names
    }

    pub fn baseline(&self) -> Configuration {
        Configuration::baseline(&self.flag_names)
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Configuration> {
        self.configurations.iter()
    }
}

impl<'a> IntoIterator for &'a ConfigurationSpace {
    type Item = &'a Configuration;
    type IntoIter = std::slice::Iter<'a, Configuration>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_power_set_size_and_uniqueness() {
        for k in 0..6 {
            let names: Vec<String> = (0..k).map(|i| format!("FLAG_{}", i)).collect();
            let space = ConfigurationSpace::power_set(&names);
            assert_eq!(space.len(), 1 << k);

            let distinct: HashSet<_> = space.iter().cloned().collect();
            assert_eq!(distinct.len(), 1 << k);
        }
    }

    #[test]
    fn test_power_set_order_matches_product() {
        let space = ConfigurationSpace::power_set(&["MPSC", "BP"]);
        let values: Vec<Vec<bool>> = space
            .iter()
            .map(|c| c.flags.iter().map(|(_, v)| *v).collect())
            .collect();

        assert_eq!(
            values,
            vec![
                vec![false, false],
                vec![false, true],
                vec![true, false],
                vec![true, true],
            ]
        );
        assert!(space.iter().next().unwrap().is_baseline());
    }

    #[test]
    fn test_power_set_at_flag_limit() {
        let names: Vec<String> = (0..MAX_POWER_SET_FLAGS).map(|i| format!("F{}", i)).collect();
        let space = ConfigurationSpace::power_set(&names);
        assert_eq!(space.len(), 1 << MAX_POWER_SET_FLAGS);
        assert!(space.iter().last().unwrap().flags.iter().all(|(_, v)| *v));
    }

    #[test]
    #[should_panic(expected = "exceeds the limit")]
    fn test_power_set_over_flag_limit_panics() {
        let names: Vec<String> = (0..64).map(|i| format!("F{}", i)).collect();
        ConfigurationSpace::power_set(&names);
    }

    #[test]
    fn test_empty_flag_set_yields_baseline_only() {
        let space = ConfigurationSpace::power_set::<&str>(&[]);
        assert_eq!(space.len(), 1);
        assert!(space.iter().next().unwrap().is_baseline());
    }

    #[test]
    fn test_scenarios_preserve_order_and_names() {
        let space = ConfigurationSpace::scenarios(&["MPSC", "BATCHING", "BP"], &Scenario::ring_modes());
        let names: Vec<_> = space.iter().map(|c| c.name.clone().unwrap()).collect();
        assert_eq!(
            names,
            vec![
                "SPSC - 2 Threads",
                "MPSC - 2 Threads",
                "SPSC - 1 Thread",
                "MPSC - 1 Thread"
            ]
        );

        let last = space.iter().last().unwrap();
        assert!(last.is_enabled("MPSC"));
        assert!(last.is_enabled("BP"));
        assert!(!last.is_enabled("BATCHING"));
        assert_eq!(last.enabled_flags().collect::<Vec<_>>(), vec!["MPSC", "BP"]);
    }

    #[test]
    fn test_unknown_flag_defaults_to_disabled() {
        let config = Configuration::baseline(&["MPSC"]);
        assert!(!config.is_enabled("SPSC_OPT"));
    }

    #[test]
    fn test_configuration_display() {
        let space = ConfigurationSpace::power_set(&["MPSC", "BATCHING", "BP"]);
        let third = space.iter().nth(2).unwrap();
        assert_eq!(third.to_string(), "MPSC: false, BATCHING: true, BP: false");

        let space = ConfigurationSpace::scenarios(&["MPSC", "BP"], &Scenario::ring_modes());
        let second = space.iter().nth(1).unwrap();
        assert_eq!(second.to_string(), "MPSC - 2 Threads (MPSC: true, BP: false)");
    }
}
