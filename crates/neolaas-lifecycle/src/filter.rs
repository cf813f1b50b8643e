//! Filter Engine
//!
//! Compiles the host and zone pattern lists from [`ProcessingOptions`] into
//! regular expressions and decides, per machine, whether it takes part in a
//! batch. Evaluation order:
//!
//! 1. hostname against the host include list
//! 2. zone against the zone include list
//! 3. hostname against the host exclude list
//! 4. zone against the zone exclude list
//!
//! Include lists match when any pattern matches. An empty include list
//! follows its dimension's [`EmptyFilterPolicy`]; an empty exclude list
//! excludes nothing.

use crate::machine::Machine;
use crate::options::{EmptyFilterPolicy, PatternLists, ProcessingOptions};
use regex::Regex;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid regular expression '{pattern}' in {dimension} {rule} filter: {source}")]
pub struct FilterError {
    pub dimension: Dimension,
    pub rule: Rule,
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Machine attribute a filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Host,
    Zone,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Host => "hostname",
            Dimension::Zone => "zone",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which list rejected a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Include,
    Exclude,
}

impl Rule {
    pub fn as_str(self) -> &'static str {
        match self {
            Rule::Include => "include",
            Rule::Exclude => "exclude",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compile every pattern, failing on the first invalid one.
pub fn compile_filter(patterns: &[String]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|p| Regex::new(p)).collect()
}

/// True iff any compiled pattern matches `candidate`.
pub fn matches(compiled: &[Regex], candidate: &str) -> bool {
    compiled.iter().any(|re| re.is_match(candidate))
}

fn first_invalid(patterns: &[String]) -> String {
    patterns
        .iter()
        .find(|p| Regex::new(p).is_err())
        .cloned()
        .unwrap_or_default()
}

/// Compiled include/exclude lists for one dimension.
#[derive(Debug, Clone)]
pub struct Filter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    empty_policy: EmptyFilterPolicy,
    /// Source patterns, kept for diagnostics
    lists: PatternLists,
}

impl Filter {
    pub fn compile(
        dimension: Dimension,
        lists: &PatternLists,
        empty_policy: EmptyFilterPolicy,
    ) -> Result<Self, FilterError> {
        let compile = |rule: Rule, patterns: &[String]| {
            compile_filter(patterns).map_err(|source| FilterError {
                dimension,
                rule,
                pattern: first_invalid(patterns),
                source,
            })
        };

        Ok(Self {
            include: compile(Rule::Include, lists.include.as_slice())?,
            exclude: compile(Rule::Exclude, lists.exclude.as_slice())?,
            empty_policy,
            lists: lists.clone(),
        })
    }

    /// Include check, honouring the empty-list policy.
    pub fn included(&self, value: &str) -> bool {
        if self.include.is_empty() {
            return self.empty_policy == EmptyFilterPolicy::IncludeAll;
        }
        matches(&self.include, value)
    }

    pub fn excluded(&self, value: &str) -> bool {
        matches(&self.exclude, value)
    }

    pub fn patterns(&self, rule: Rule) -> &[String] {
        match rule {
            Rule::Include => &self.lists.include,
            Rule::Exclude => &self.lists.exclude,
        }
    }
}

/// Why a machine was left out of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub dimension: Dimension,
    pub rule: Rule,
    pub value: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' did not pass the {} {} filter",
            self.dimension, self.value, self.dimension, self.rule
        )
    }
}

/// Host and zone filters for one batch run.
#[derive(Debug, Clone)]
pub struct FilterSet {
    hosts: Filter,
    zones: Filter,
}

impl FilterSet {
    pub fn compile(options: &ProcessingOptions) -> Result<Self, FilterError> {
        Ok(Self {
            hosts: Filter::compile(Dimension::Host, &options.filter.hosts, options.empty_hosts)?,
            zones: Filter::compile(Dimension::Zone, &options.filter.zones, options.empty_zones)?,
        })
    }

    pub fn hosts(&self) -> &Filter {
        &self.hosts
    }

    pub fn zones(&self) -> &Filter {
        &self.zones
    }

    /// Decide whether `machine` is processed.
    pub fn check(&self, machine: &Machine) -> Result<(), Rejection> {
        let host = machine.hostname();
        let zone = machine.zone();

        let reject = |dimension, rule, value: &str| Rejection {
            dimension,
            rule,
            value: value.to_string(),
        };

        if !self.hosts.included(host) {
            return Err(reject(Dimension::Host, Rule::Include, host));
        }
        if !self.zones.included(zone) {
            return Err(reject(Dimension::Zone, Rule::Include, zone));
        }
        if self.hosts.excluded(host) {
            return Err(reject(Dimension::Host, Rule::Exclude, host));
        }
        if self.zones.excluded(zone) {
            return Err(reject(Dimension::Zone, Rule::Exclude, zone));
        }
        Ok(())
    }

    pub fn filter(&self, dimension: Dimension) -> &Filter {
        match dimension {
            Dimension::Host => &self.hosts,
            Dimension::Zone => &self.zones,
        }
    }
}
