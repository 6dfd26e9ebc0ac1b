//! Inventory control: order quantities, safety stock, service levels and the
//! two-stage (store then warehouse) stock-out decomposition.

use crate::{OracleError, require_non_negative, require_open_unit, require_positive};
use fgr_stats::{Normal, StatsError, standard_normal_ppf};

fn normal(mean: f64, std: f64) -> Result<Normal, OracleError> {
    require_positive("std", std)?;
    Normal::new(mean, std).map_err(|err| OracleError::from_stats("std", &err))
}

/// Economic order quantity `sqrt(2 D S / H)`.
pub fn eoq(annual_demand: f64, order_cost: f64, holding_cost: f64) -> Result<f64, OracleError> {
    let demand = require_positive("annual_demand", annual_demand)?;
    let order = require_positive("order_cost", order_cost)?;
    let holding = require_positive("holding_cost", holding_cost)?;
    Ok((2.0 * demand * order / holding).sqrt())
}

/// Ordering plus holding cost at order quantity `quantity`.
pub fn total_cost(
    annual_demand: f64,
    order_cost: f64,
    holding_cost: f64,
    quantity: f64,
) -> Result<f64, OracleError> {
    Ok(cost_curve_point(annual_demand, order_cost, holding_cost, quantity)?.total)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostCurvePoint {
    pub quantity: f64,
    pub ordering: f64,
    pub holding: f64,
    pub total: f64,
}

pub fn cost_curve_point(
    annual_demand: f64,
    order_cost: f64,
    holding_cost: f64,
    quantity: f64,
) -> Result<CostCurvePoint, OracleError> {
    let demand = require_positive("annual_demand", annual_demand)?;
    let order = require_positive("order_cost", order_cost)?;
    let holding = require_positive("holding_cost", holding_cost)?;
    let quantity = require_positive("quantity", quantity)?;
    let ordering = demand * order / quantity;
    let holding = holding * quantity / 2.0;
    Ok(CostCurvePoint {
        quantity,
        ordering,
        holding,
        total: ordering + holding,
    })
}

pub fn lead_time_demand(daily_demand: f64, lead_time: f64) -> Result<f64, OracleError> {
    Ok(require_non_negative("daily_demand", daily_demand)?
        * require_non_negative("lead_time", lead_time)?)
}

/// `lead-time demand + safety stock`.
pub fn reorder_point(
    daily_demand: f64,
    lead_time: f64,
    safety_stock: f64,
) -> Result<f64, OracleError> {
    Ok(lead_time_demand(daily_demand, lead_time)?
        + require_non_negative("safety_stock", safety_stock)?)
}

/// Standard normal quantile of a service level in (0, 1).
pub fn z_for_service_level(service_level: f64) -> Result<f64, OracleError> {
    require_open_unit("service_level", service_level)?;
    standard_normal_ppf(service_level)
        .map_err(|err: StatsError| OracleError::from_stats("service_level", &err))
}

/// `z * sigma_d * sqrt(LT)` with a fixed lead time.
pub fn safety_stock_fixed(
    service_level: f64,
    demand_std: f64,
    lead_time: f64,
) -> Result<f64, OracleError> {
    let z = z_for_service_level(service_level)?;
    let sigma = require_positive("demand_std", demand_std)?;
    let lead_time = require_positive("lead_time", lead_time)?;
    Ok(z * sigma * lead_time.sqrt())
}

/// Standard deviation of lead-time demand when both demand and lead time vary:
/// `sqrt(LT * sigma_d^2 + d^2 * sigma_LT^2)`.
pub fn combined_std(
    demand_mean: f64,
    demand_std: f64,
    lead_time_mean: f64,
    lead_time_std: f64,
) -> Result<f64, OracleError> {
    let d = require_non_negative("demand_mean", demand_mean)?;
    let sd = require_positive("demand_std", demand_std)?;
    let lt = require_positive("lead_time_mean", lead_time_mean)?;
    let slt = require_non_negative("lead_time_std", lead_time_std)?;
    Ok((lt * sd * sd + d * d * slt * slt).sqrt())
}

pub fn safety_stock_variable(
    service_level: f64,
    demand_mean: f64,
    demand_std: f64,
    lead_time_mean: f64,
    lead_time_std: f64,
) -> Result<f64, OracleError> {
    let z = z_for_service_level(service_level)?;
    Ok(z * combined_std(demand_mean, demand_std, lead_time_mean, lead_time_std)?)
}

/// Probability that `units` on hand cover normally distributed demand.
pub fn achieved_service_level(units: f64, mean: f64, std: f64) -> Result<f64, OracleError> {
    Ok(normal(mean, std)?.cdf(units))
}

pub fn stockout_probability(units: f64, mean: f64, std: f64) -> Result<f64, OracleError> {
    Ok(normal(mean, std)?.sf(units))
}

/// Mutually exclusive outcomes of serving demand from the store first and the
/// warehouse second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoStage {
    pub store_sufficient: f64,
    pub warehouse_needed: f64,
    pub total_stockout: f64,
}

impl TwoStage {
    #[must_use]
    pub fn as_array(&self) -> [f64; 3] {
        [
            self.store_sufficient,
            self.warehouse_needed,
            self.total_stockout,
        ]
    }
}

/// All three probabilities come from one demand CDF evaluated at the store
/// stock and at the combined stock, so they sum to 1.
pub fn two_stage(
    mean: f64,
    std: f64,
    store_stock: f64,
    warehouse_stock: f64,
) -> Result<TwoStage, OracleError> {
    let dist = normal(mean, std)?;
    let store = require_non_negative("store_stock", store_stock)?;
    let warehouse = require_non_negative("warehouse_stock", warehouse_stock)?;
    let store_sufficient = dist.cdf(store);
    let covered = dist.cdf(store + warehouse);
    Ok(TwoStage {
        store_sufficient,
        warehouse_needed: covered - store_sufficient,
        total_stockout: 1.0 - covered,
    })
}

/// Single-period optimum at the critical ratio
/// `(price - cost) / (price - salvage)` of normal demand.
pub fn newsvendor_quantity(
    price: f64,
    cost: f64,
    salvage: f64,
    mean: f64,
    std: f64,
) -> Result<f64, OracleError> {
    if !(price > cost && cost > salvage) {
        return Err(OracleError::invalid(
            "price",
            format!("need price > cost > salvage, got {price} / {cost} / {salvage}"),
        ));
    }
    let ratio = (price - cost) / (price - salvage);
    normal(mean, std)?
        .ppf(ratio)
        .map_err(|err| OracleError::from_stats("price", &err))
}

/// Volume shares sorted from largest to smallest item with running totals.
#[derive(Debug, Clone, PartialEq)]
pub struct ParetoShares {
    pub shares: Vec<f64>,
    pub cumulative: Vec<f64>,
}

pub fn pareto_shares(volumes: &[f64]) -> Result<ParetoShares, OracleError> {
    let mut sorted = Vec::with_capacity(volumes.len());
    for volume in volumes {
        sorted.push(require_non_negative("volumes", *volume)?);
    }
    let total = sorted.iter().sum::<f64>();
    if total <= 0.0 {
        return Err(OracleError::invalid("volumes", "total volume must be > 0"));
    }
    sorted.sort_by(|a, b| b.total_cmp(a));

    let shares: Vec<f64> = sorted.iter().map(|volume| volume / total).collect();
    let mut running = 0.0;
    let cumulative = shares
        .iter()
        .map(|share| {
            running += share;
            running
        })
        .collect();
    Ok(ParetoShares { shares, cumulative })
}

/// Fraction of total volume held by classes A, B and C.
pub fn abc_shares(a_volume: f64, b_volume: f64, c_volume: f64) -> Result<[f64; 3], OracleError> {
    let volumes = [
        require_non_negative("a_volume", a_volume)?,
        require_non_negative("b_volume", b_volume)?,
        require_non_negative("c_volume", c_volume)?,
    ];
    let total = volumes.iter().sum::<f64>();
    if total <= 0.0 {
        return Err(OracleError::invalid("a_volume", "total volume must be > 0"));
    }
    Ok(volumes.map(|volume| volume / total))
}
