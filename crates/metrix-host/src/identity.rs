//! Metric identity: an owner type plus a name.

use std::cmp::Ordering;
use std::fmt;

/// The type a metric is registered under, captured by its type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Owner {
    full_name: &'static str,
}

impl Owner {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            full_name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified path, e.g. `my_app::worker::Worker`.
    pub fn full_name(&self) -> &'static str {
        self.full_name
    }

    /// Last path segment without generic arguments, e.g. `Worker`.
    pub fn short_name(&self) -> &'static str {
        let base = self
            .full_name
            .split_once('<')
            .map_or(self.full_name, |(head, _)| head);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_name)
    }
}

/// Key under which a metric lives in a store.
///
/// Ordered by name first (ordinal), then by owner path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricIdentity {
    owner: Owner,
    name: String,
}

impl MetricIdentity {
    pub fn new(owner: Owner, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<owner full name>.<name>`
    pub fn cache_key(&self) -> String {
        format!("{}.{}", self.owner.full_name, self.name)
    }
}

impl Ord for MetricIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.owner.full_name.cmp(other.owner.full_name))
    }
}

impl PartialOrd for MetricIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MetricIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner.full_name, self.name)
    }
}
