use std::collections::{BTreeSet, HashMap};

use crate::ClientError;

/// A monitored smart plug, typically a solar micro-inverter.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Appliance {
    pub id: i32,
    pub name: String,
}

/// Look up every requested id in `catalog`, in ascending id order.
///
/// Fails on the first id that has no catalog entry.
pub fn resolve_appliances(
    catalog: &[Appliance],
    ids: &BTreeSet<i32>,
) -> Result<Vec<Appliance>, ClientError> {
    let by_id: HashMap<i32, &Appliance> = catalog.iter().map(|a| (a.id, a)).collect();

    ids.iter()
        .map(|id| {
            by_id
                .get(id)
                .map(|a| (*a).clone())
                .ok_or(ClientError::UnknownAppliance(*id))
        })
        .collect()
}
