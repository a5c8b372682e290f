//! Total work (TWork).

use std::collections::BTreeMap;

use crate::resource::ResourceCapacity;
use crate::task::{ResourceKind, Task};

/// Total work of a set of tasks: for each resource kind the time needed to process all the demand on that resource
/// if it were perfectly packed, maximized over resource kinds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TotalWork {
    pub value: f64,
    /// Resource kind which gives the maximum, if any kind has positive capacity.
    pub bottleneck: Option<ResourceKind>,
    /// Work per resource kind with positive capacity.
    pub per_resource: BTreeMap<ResourceKind, f64>,
}

impl TotalWork {
    pub fn new<'a, I>(tasks: I, capacities: &ResourceCapacity) -> Self
    where
        I: IntoIterator<Item = &'a Task> + Clone,
    {
        let mut result = Self::default();
        for (kind, &capacity) in capacities.iter() {
            // kinds without capacity are skipped
            if capacity <= 0. {
                continue;
            }
            let demand: f64 = tasks.clone().into_iter().map(|t| t.work(kind)).sum();
            let work = demand / capacity;
            if result.bottleneck.is_none() || work > result.value {
                result.value = work;
                result.bottleneck = Some(kind.clone());
            }
            result.per_resource.insert(kind.clone(), work);
        }
        result
    }
}

/// Returns TWork of the given tasks.
pub fn total_work<'a, I>(tasks: I, capacities: &ResourceCapacity) -> f64
where
    I: IntoIterator<Item = &'a Task> + Clone,
{
    TotalWork::new(tasks, capacities).value
}
