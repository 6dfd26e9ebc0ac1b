//! Reference quantities: which oracle formula to evaluate and which problem
//! parameters feed it.

use fgr_compare::ExpectedValue;
use fgr_oracle::hypothesis::{Tails, TTestSummary, one_sample_t, t_critical, t_test_power, two_sample_t};
use fgr_oracle::{
    OracleError, ParamValue, ProblemInstance, cost, forecasting, inventory, probability,
    regression,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An oracle formula. Each reads its inputs by canonical parameter name
/// (listed on the variant); a [`Quantity`] may rebind any of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "formula", rename_all = "snake_case")]
pub enum Formula {
    /// `value`, passed through unchanged.
    Param,
    /// `favorable`, `total`.
    EventProbability,
    /// `favorable`, `total`, `removed_favorable`, `removed_total`.
    ConditionalProbability,
    /// `population`, `draws`, `group_sizes`, `group_draws`.
    HypergeometricProbability,
    /// `n`, `p`, `k`.
    BinomialProbability,
    BinomialCdf,
    BinomialSf,
    /// `rate`, `k`.
    PoissonProbability,
    PoissonCdf,
    /// `k`, `n`, `p`.
    NormalApproximationCdf,
    /// `probabilities`.
    ComplementSum,
    /// `successes`, `n`, `confidence`; yields `lower` and `upper`.
    WilsonInterval,
    /// `annual_demand`, `order_cost`, `holding_cost`.
    Eoq,
    /// As [`Formula::Eoq`] plus `quantity`.
    TotalCost,
    /// Yields `ordering`, `holding` and `total` at `quantity`.
    CostCurve,
    /// `daily_demand`, `lead_time`.
    LeadTimeDemand,
    /// `daily_demand`, `lead_time`, `safety_stock`.
    ReorderPoint,
    /// `service_level`.
    ZForServiceLevel,
    /// `service_level`, `demand_std`, `lead_time`.
    SafetyStockFixed,
    /// `demand_mean`, `demand_std`, `lead_time_mean`, `lead_time_std`.
    CombinedStd,
    /// `service_level` plus the inputs of [`Formula::CombinedStd`].
    SafetyStockVariable,
    /// `units`, `mean`, `std`.
    AchievedServiceLevel,
    StockoutProbability,
    /// `mean`, `std`, `store_stock`, `warehouse_stock`; yields
    /// `store_sufficient`, `warehouse_needed` and `total_stockout`.
    TwoStage,
    /// `price`, `cost`, `salvage`, `mean`, `std`.
    NewsvendorQuantity,
    /// `volumes`, largest first.
    ParetoShares,
    ParetoCumulative,
    /// `a_volume`, `b_volume`, `c_volume`; yields `A`, `B` and `C`.
    AbcShares,
    /// `samples`, `mu0`; yields the statistic, `df` and the three p-values.
    OneSampleT,
    /// `a`, `b`.
    TwoSampleT {
        #[serde(default)]
        equal_var: bool,
    },
    /// `alpha`, `df`.
    TCritical { tails: Tails },
    /// `effect_size`, `alpha`, `n`.
    TTestPower,
    /// `x`, `y`; yields `slope`, `intercept`, `r_squared` and `mse`.
    OlsFit,
    /// `x`, `y`, `x_new`, `alpha`.
    RegressionIntervals,
    /// `data`, `window` and optionally `weights`.
    MovingAverage,
    /// `data`, `alpha`.
    ExponentialSmoothing,
    /// `forecasts`, `actuals`; yields `mape`, `rmse` and `mae`.
    ForecastAccuracy,
    /// `rates`, `drivers`.
    ActivityCosts,
    ActivityCostTotal,
}

/// A formula together with its parameter bindings.
///
/// `bindings` maps a canonical parameter name to the problem parameter that
/// supplies it; unbound names are looked up as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    #[serde(flatten)]
    pub formula: Formula,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, String>,
}

impl From<Formula> for Quantity {
    fn from(formula: Formula) -> Self {
        Self::new(formula)
    }
}

impl Quantity {
    #[must_use]
    pub fn new(formula: Formula) -> Self {
        Self {
            formula,
            bindings: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn bind(mut self, canonical: impl Into<String>, parameter: impl Into<String>) -> Self {
        self.bindings.insert(canonical.into(), parameter.into());
        self
    }

    pub fn evaluate(&self, problem: &ProblemInstance) -> Result<ExpectedValue, OracleError> {
        let params = Params {
            problem,
            bindings: &self.bindings,
        };
        self.formula.evaluate(&params)
    }
}

struct Params<'a> {
    problem: &'a ProblemInstance,
    bindings: &'a BTreeMap<String, String>,
}

impl<'a> Params<'a> {
    fn name<'n>(&'n self, canonical: &'n str) -> &'n str {
        self.bindings
            .get(canonical)
            .map_or(canonical, String::as_str)
    }

    fn scalar(&self, canonical: &str) -> Result<f64, OracleError> {
        self.problem.scalar(self.name(canonical))
    }

    fn count(&self, canonical: &str) -> Result<u64, OracleError> {
        self.problem.count(self.name(canonical))
    }

    fn counts(&self, canonical: &str) -> Result<Vec<u64>, OracleError> {
        self.problem.counts(self.name(canonical))
    }

    fn array(&self, canonical: &str) -> Result<&'a [f64], OracleError> {
        self.problem.array(self.name(canonical))
    }

    fn optional_array(&self, canonical: &str) -> Result<Option<&'a [f64]>, OracleError> {
        let name = self.name(canonical);
        match self.problem.get(name) {
            None => Ok(None),
            Some(_) => self.problem.array(name).map(Some),
        }
    }

    fn table(&self, canonical: &str) -> Result<&'a BTreeMap<String, f64>, OracleError> {
        self.problem.table(self.name(canonical))
    }
}

fn mapping<const N: usize>(entries: [(&str, f64); N]) -> ExpectedValue {
    ExpectedValue::Mapping(
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
    )
}

fn t_summary(summary: TTestSummary) -> ExpectedValue {
    mapping([
        ("statistic", summary.statistic),
        ("df", summary.df),
        ("p_two_sided", summary.p_two_sided),
        ("p_less", summary.p_less),
        ("p_greater", summary.p_greater),
    ])
}

impl Formula {
    fn evaluate(&self, p: &Params<'_>) -> Result<ExpectedValue, OracleError> {
        let value = match self {
            Self::Param => {
                let name = p.name("value");
                match p.problem.get(name) {
                    Some(ParamValue::Scalar(_)) => p.problem.scalar(name)?.into(),
                    Some(ParamValue::Array(values)) => ExpectedValue::Series(values.clone()),
                    Some(ParamValue::Table(table)) => ExpectedValue::Mapping(table.clone()),
                    None => return Err(OracleError::invalid(name, "parameter is not defined")),
                }
            }
            Self::EventProbability => {
                probability::event_probability(p.count("favorable")?, p.count("total")?)?.into()
            }
            Self::ConditionalProbability => probability::conditional_probability(
                p.count("favorable")?,
                p.count("total")?,
                p.count("removed_favorable")?,
                p.count("removed_total")?,
            )?
            .into(),
            Self::HypergeometricProbability => probability::hypergeometric_probability(
                p.count("population")?,
                p.count("draws")?,
                &p.counts("group_sizes")?,
                &p.counts("group_draws")?,
            )?
            .into(),
            Self::BinomialProbability => {
                probability::binomial_probability(p.count("n")?, p.scalar("p")?, p.count("k")?)?
                    .into()
            }
            Self::BinomialCdf => {
                probability::binomial_cdf(p.count("n")?, p.scalar("p")?, p.count("k")?)?.into()
            }
            Self::BinomialSf => {
                probability::binomial_sf(p.count("n")?, p.scalar("p")?, p.count("k")?)?.into()
            }
            Self::PoissonProbability => {
                probability::poisson_probability(p.scalar("rate")?, p.count("k")?)?.into()
            }
            Self::PoissonCdf => probability::poisson_cdf(p.scalar("rate")?, p.count("k")?)?.into(),
            Self::NormalApproximationCdf => probability::normal_approximation_cdf(
                p.count("k")?,
                p.count("n")?,
                p.scalar("p")?,
            )?
            .into(),
            Self::ComplementSum => probability::complement_sum(p.array("probabilities")?)?.into(),
            Self::WilsonInterval => {
                let (lower, upper) = probability::wilson_interval(
                    p.count("successes")?,
                    p.count("n")?,
                    p.scalar("confidence")?,
                )?;
                mapping([("lower", lower), ("upper", upper)])
            }
            Self::Eoq => inventory::eoq(
                p.scalar("annual_demand")?,
                p.scalar("order_cost")?,
                p.scalar("holding_cost")?,
            )?
            .into(),
            Self::TotalCost => inventory::total_cost(
                p.scalar("annual_demand")?,
                p.scalar("order_cost")?,
                p.scalar("holding_cost")?,
                p.scalar("quantity")?,
            )?
            .into(),
            Self::CostCurve => {
                let point = inventory::cost_curve_point(
                    p.scalar("annual_demand")?,
                    p.scalar("order_cost")?,
                    p.scalar("holding_cost")?,
                    p.scalar("quantity")?,
                )?;
                mapping([
                    ("ordering", point.ordering),
                    ("holding", point.holding),
                    ("total", point.total),
                ])
            }
            Self::LeadTimeDemand => {
                inventory::lead_time_demand(p.scalar("daily_demand")?, p.scalar("lead_time")?)?
                    .into()
            }
            Self::ReorderPoint => inventory::reorder_point(
                p.scalar("daily_demand")?,
                p.scalar("lead_time")?,
                p.scalar("safety_stock")?,
            )?
            .into(),
            Self::ZForServiceLevel => {
                inventory::z_for_service_level(p.scalar("service_level")?)?.into()
            }
            Self::SafetyStockFixed => inventory::safety_stock_fixed(
                p.scalar("service_level")?,
                p.scalar("demand_std")?,
                p.scalar("lead_time")?,
            )?
            .into(),
            Self::CombinedStd => inventory::combined_std(
                p.scalar("demand_mean")?,
                p.scalar("demand_std")?,
                p.scalar("lead_time_mean")?,
                p.scalar("lead_time_std")?,
            )?
            .into(),
            Self::SafetyStockVariable => inventory::safety_stock_variable(
                p.scalar("service_level")?,
                p.scalar("demand_mean")?,
                p.scalar("demand_std")?,
                p.scalar("lead_time_mean")?,
                p.scalar("lead_time_std")?,
            )?
            .into(),
            Self::AchievedServiceLevel => inventory::achieved_service_level(
                p.scalar("units")?,
                p.scalar("mean")?,
                p.scalar("std")?,
            )?
            .into(),
            Self::StockoutProbability => inventory::stockout_probability(
                p.scalar("units")?,
                p.scalar("mean")?,
                p.scalar("std")?,
            )?
            .into(),
            Self::TwoStage => {
                let split = inventory::two_stage(
                    p.scalar("mean")?,
                    p.scalar("std")?,
                    p.scalar("store_stock")?,
                    p.scalar("warehouse_stock")?,
                )?;
                mapping([
                    ("store_sufficient", split.store_sufficient),
                    ("warehouse_needed", split.warehouse_needed),
                    ("total_stockout", split.total_stockout),
                ])
            }
            Self::NewsvendorQuantity => inventory::newsvendor_quantity(
                p.scalar("price")?,
                p.scalar("cost")?,
                p.scalar("salvage")?,
                p.scalar("mean")?,
                p.scalar("std")?,
            )?
            .into(),
            Self::ParetoShares => inventory::pareto_shares(p.array("volumes")?)?.shares.into(),
            Self::ParetoCumulative => {
                inventory::pareto_shares(p.array("volumes")?)?.cumulative.into()
            }
            Self::AbcShares => {
                let [a, b, c] = inventory::abc_shares(
                    p.scalar("a_volume")?,
                    p.scalar("b_volume")?,
                    p.scalar("c_volume")?,
                )?;
                mapping([("A", a), ("B", b), ("C", c)])
            }
            Self::OneSampleT => t_summary(one_sample_t(p.array("samples")?, p.scalar("mu0")?)?),
            Self::TwoSampleT { equal_var } => {
                t_summary(two_sample_t(p.array("a")?, p.array("b")?, *equal_var)?)
            }
            Self::TCritical { tails } => {
                t_critical(p.scalar("alpha")?, p.scalar("df")?, *tails)?.into()
            }
            Self::TTestPower => {
                t_test_power(p.scalar("effect_size")?, p.scalar("alpha")?, p.count("n")?)?.into()
            }
            Self::OlsFit => {
                let fit = regression::ols_fit(p.array("x")?, p.array("y")?)?;
                mapping([
                    ("slope", fit.slope),
                    ("intercept", fit.intercept),
                    ("r_squared", fit.r_squared),
                    ("mse", fit.mse),
                ])
            }
            Self::RegressionIntervals => {
                let fit = regression::ols_fit(p.array("x")?, p.array("y")?)?;
                let bands = regression::intervals(&fit, p.scalar("x_new")?, p.scalar("alpha")?)?;
                mapping([
                    ("prediction", bands.prediction),
                    ("confidence_lower", bands.confidence.0),
                    ("confidence_upper", bands.confidence.1),
                    ("prediction_lower", bands.prediction_interval.0),
                    ("prediction_upper", bands.prediction_interval.1),
                ])
            }
            Self::MovingAverage => {
                let window = usize::try_from(p.count("window")?)
                    .map_err(|_| OracleError::invalid(p.name("window"), "window is too large"))?;
                forecasting::moving_average(p.array("data")?, window, p.optional_array("weights")?)?
                    .into()
            }
            Self::ExponentialSmoothing => {
                forecasting::exponential_smoothing(p.array("data")?, p.scalar("alpha")?)?.into()
            }
            Self::ForecastAccuracy => {
                let accuracy =
                    forecasting::forecast_accuracy(p.array("forecasts")?, p.array("actuals")?)?;
                mapping([
                    ("mape", accuracy.mape),
                    ("rmse", accuracy.rmse),
                    ("mae", accuracy.mae),
                ])
            }
            Self::ActivityCosts => {
                ExpectedValue::Mapping(cost::activity_costs(p.table("rates")?, p.table("drivers")?)?)
            }
            Self::ActivityCostTotal => {
                cost::activity_cost_total(p.table("rates")?, p.table("drivers")?)?.into()
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{Formula, Quantity};
    use fgr_compare::ExpectedValue;
    use fgr_oracle::ProblemInstance;
    use fgr_oracle::hypothesis::Tails;

    fn approx_equal(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn scalar(value: ExpectedValue) -> f64 {
        match value {
            ExpectedValue::Scalar(value) => value,
            other => panic!("expected scalar, got {}", other.shape()),
        }
    }

    #[test]
    fn bindings_redirect_canonical_names() {
        let problem = ProblemInstance::builder()
            .scalar("D", 1200.0)
            .scalar("S", 50.0)
            .scalar("H", 3.0)
            .build();
        let quantity = Quantity::new(Formula::Eoq)
            .bind("annual_demand", "D")
            .bind("order_cost", "S")
            .bind("holding_cost", "H");
        let value = scalar(quantity.evaluate(&problem).expect("eoq"));
        assert!(approx_equal(value, 200.0, 1e-9));

        let err = Quantity::new(Formula::Eoq)
            .evaluate(&problem)
            .expect_err("unbound names are looked up as-is");
        assert_eq!(err.reason_code(), "oracle_invalid_parameter");
        assert!(err.to_string().contains("annual_demand"));
    }

    #[test]
    fn two_stage_yields_named_components() {
        let problem = ProblemInstance::builder()
            .scalar("mean", 75.0)
            .scalar("std", 25.0)
            .scalar("store_stock", 80.0)
            .scalar("warehouse_stock", 40.0)
            .build();
        let ExpectedValue::Mapping(split) = Quantity::new(Formula::TwoStage)
            .evaluate(&problem)
            .expect("two stage")
        else {
            panic!("two stage is a mapping");
        };
        assert!(approx_equal(split["store_sufficient"], 0.579_259_709_439_103_1, 1e-9));
        assert!(approx_equal(split.values().sum::<f64>(), 1.0, 1e-12));
    }

    #[test]
    fn param_passes_arrays_through_as_series() {
        let problem = ProblemInstance::builder()
            .array("classes", [0.75, 0.17, 0.08])
            .build();
        let value = Quantity::new(Formula::Param)
            .bind("value", "classes")
            .evaluate(&problem)
            .expect("param");
        assert_eq!(value, ExpectedValue::Series(vec![0.75, 0.17, 0.08]));
    }

    #[test]
    fn moving_average_weights_are_optional() {
        let problem = ProblemInstance::builder()
            .array("data", [10.0, 12.0, 14.0, 16.0])
            .scalar("window", 2.0)
            .build();
        let ExpectedValue::Series(plain) = Quantity::new(Formula::MovingAverage)
            .evaluate(&problem)
            .expect("moving average")
        else {
            panic!("moving average is a series");
        };
        assert!(plain[0].is_nan());
        assert_eq!(&plain[1..], &[11.0, 13.0, 15.0]);

        let weighted = ProblemInstance::builder()
            .array("data", [10.0, 12.0, 14.0, 16.0])
            .scalar("window", 2.0)
            .array("weights", [0.25, 0.75])
            .build();
        let ExpectedValue::Series(values) = Quantity::new(Formula::MovingAverage)
            .evaluate(&weighted)
            .expect("weighted moving average")
        else {
            panic!("moving average is a series");
        };
        assert!(approx_equal(values[1], 11.5, 1e-12));
    }

    #[test]
    fn quantities_load_from_json() {
        let quantity: Quantity = serde_json::from_str(
            r#"{"formula": "t_critical", "tails": "two", "bindings": {"df": "dof"}}"#,
        )
        .expect("quantity json");
        assert_eq!(quantity.formula, Formula::TCritical { tails: Tails::Two });
        assert_eq!(quantity.bindings["df"], "dof");

        let problem = ProblemInstance::builder()
            .scalar("alpha", 0.05)
            .scalar("dof", 12.0)
            .build();
        let t = scalar(quantity.evaluate(&problem).expect("t critical"));
        assert!(approx_equal(t, 2.178_812_829_667_228, 1e-9));

        let plain: Quantity = serde_json::from_str(r#"{"formula": "eoq"}"#).expect("bare");
        assert!(plain.bindings.is_empty());
        let welch: Quantity =
            serde_json::from_str(r#"{"formula": "two_sample_t"}"#).expect("welch default");
        assert_eq!(welch.formula, Formula::TwoSampleT { equal_var: false });
    }
}
