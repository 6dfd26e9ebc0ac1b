//! Activity-based costing: cost per activity is its rate times the driver
//! volume consumed.

use crate::{OracleError, require_non_negative};
use std::collections::BTreeMap;

pub fn activity_costs(
    rates: &BTreeMap<String, f64>,
    drivers: &BTreeMap<String, f64>,
) -> Result<BTreeMap<String, f64>, OracleError> {
    if let Some(extra) = drivers.keys().find(|key| !rates.contains_key(*key)) {
        return Err(OracleError::invalid(
            "drivers",
            format!("no rate defined for activity `{extra}`"),
        ));
    }
    rates
        .iter()
        .map(|(activity, rate)| {
            let rate = require_non_negative("rates", *rate)?;
            let volume = drivers.get(activity).ok_or_else(|| {
                OracleError::invalid("drivers", format!("no driver volume for activity `{activity}`"))
            })?;
            Ok((activity.clone(), rate * require_non_negative("drivers", *volume)?))
        })
        .collect()
}

pub fn activity_cost_total(
    rates: &BTreeMap<String, f64>,
    drivers: &BTreeMap<String, f64>,
) -> Result<f64, OracleError> {
    Ok(activity_costs(rates, drivers)?.values().sum())
}
