//! Counting-based probabilities: single and conditional events, multivariate
//! hypergeometric draws, binomial / poisson counts.

use crate::{OracleError, require_open_unit, require_positive, require_unit};
use fgr_stats::{Binomial, Poisson, StatsError, ln_choose, standard_normal_cdf, standard_normal_ppf};

/// `favorable / total`.
pub fn event_probability(favorable: u64, total: u64) -> Result<f64, OracleError> {
    if total == 0 {
        return Err(OracleError::invalid("total", "must be > 0"));
    }
    if favorable > total {
        return Err(OracleError::invalid(
            "favorable",
            format!("subgroup {favorable} exceeds population {total}"),
        ));
    }
    Ok(favorable as f64 / total as f64)
}

/// Probability of a favorable draw after `removed_total` items, of which
/// `removed_favorable` were favorable, have been taken out without replacement.
pub fn conditional_probability(
    favorable: u64,
    total: u64,
    removed_favorable: u64,
    removed_total: u64,
) -> Result<f64, OracleError> {
    if favorable > total {
        return Err(OracleError::invalid(
            "favorable",
            format!("subgroup {favorable} exceeds population {total}"),
        ));
    }
    if removed_total >= total {
        return Err(OracleError::invalid(
            "removed_total",
            format!("removing {removed_total} of {total} leaves nothing to draw"),
        ));
    }
    if removed_favorable > removed_total || removed_favorable > favorable {
        return Err(OracleError::invalid(
            "removed_favorable",
            "cannot remove more favorable items than were drawn or exist",
        ));
    }
    event_probability(favorable - removed_favorable, total - removed_total)
}

/// Multivariate hypergeometric probability of drawing exactly
/// `group_draws[i]` items from each listed group in `draws` draws from
/// `population`; the remaining draws come from the unlisted items.
pub fn hypergeometric_probability(
    population: u64,
    draws: u64,
    group_sizes: &[u64],
    group_draws: &[u64],
) -> Result<f64, OracleError> {
    if group_sizes.len() != group_draws.len() {
        return Err(OracleError::invalid(
            "group_draws",
            "must list one draw count per group",
        ));
    }
    if draws > population {
        return Err(OracleError::invalid(
            "draws",
            format!("{draws} draws exceed population {population}"),
        ));
    }
    let listed = group_sizes
        .iter()
        .try_fold(0_u64, |acc, size| acc.checked_add(*size))
        .filter(|total| *total <= population)
        .ok_or_else(|| OracleError::invalid("group_sizes", "subgroups exceed population"))?;
    let drawn = group_draws
        .iter()
        .try_fold(0_u64, |acc, k| acc.checked_add(*k))
        .filter(|total| *total <= draws)
        .ok_or_else(|| OracleError::invalid("group_draws", "group draws exceed total draws"))?;

    let mut ln_ways = 0.0;
    for (size, k) in group_sizes.iter().zip(group_draws) {
        if k > size {
            return Ok(0.0);
        }
        ln_ways += ln_choose(*size, *k);
    }
    let rest = population - listed;
    let rest_draws = draws - drawn;
    if rest_draws > rest {
        return Ok(0.0);
    }
    ln_ways += ln_choose(rest, rest_draws);
    Ok((ln_ways - ln_choose(population, draws)).exp().min(1.0))
}

fn binomial(n: u64, p: f64) -> Result<Binomial, OracleError> {
    require_unit("p", p)?;
    Binomial::new(n, p).map_err(|err| OracleError::from_stats("p", &err))
}

/// P(X = k) for X ~ Binomial(n, p).
pub fn binomial_probability(n: u64, p: f64, k: u64) -> Result<f64, OracleError> {
    Ok(binomial(n, p)?.pmf(k))
}

/// P(X <= k).
pub fn binomial_cdf(n: u64, p: f64, k: u64) -> Result<f64, OracleError> {
    Ok(binomial(n, p)?.cdf(k))
}

/// P(X > k).
pub fn binomial_sf(n: u64, p: f64, k: u64) -> Result<f64, OracleError> {
    Ok(binomial(n, p)?.sf(k))
}

fn poisson(rate: f64) -> Result<Poisson, OracleError> {
    require_positive("rate", rate)?;
    Poisson::new(rate).map_err(|err| OracleError::from_stats("rate", &err))
}

pub fn poisson_probability(rate: f64, k: u64) -> Result<f64, OracleError> {
    Ok(poisson(rate)?.pmf(k))
}

pub fn poisson_cdf(rate: f64, k: u64) -> Result<f64, OracleError> {
    Ok(poisson(rate)?.cdf(k))
}

/// Normal approximation to `P(X <= k)` with continuity correction.
pub fn normal_approximation_cdf(k: u64, n: u64, p: f64) -> Result<f64, OracleError> {
    let dist = binomial(n, p)?;
    let sigma = dist.variance().sqrt();
    if sigma <= 0.0 {
        return Err(OracleError::invalid(
            "p",
            "normal approximation needs 0 < p < 1 and n > 0",
        ));
    }
    Ok(standard_normal_cdf((k as f64 + 0.5 - dist.mean()) / sigma))
}

/// Probability of "none of the listed mutually exclusive events": `1 - Σ p`.
pub fn complement_sum(probabilities: &[f64]) -> Result<f64, OracleError> {
    let mut total = 0.0;
    for p in probabilities {
        total += require_unit("probabilities", *p)?;
    }
    if total > 1.0 + 1e-12 {
        return Err(OracleError::invalid(
            "probabilities",
            format!("exclusive events sum to {total} > 1"),
        ));
    }
    Ok((1.0 - total).max(0.0))
}

/// Wilson score interval for a binomial proportion.
pub fn wilson_interval(successes: u64, n: u64, confidence: f64) -> Result<(f64, f64), OracleError> {
    if n == 0 {
        return Err(OracleError::invalid("n", "must be > 0"));
    }
    if successes > n {
        return Err(OracleError::invalid("successes", "exceeds sample size"));
    }
    require_open_unit("confidence", confidence)?;
    let z = standard_normal_ppf(0.5 * (1.0 + confidence))
        .map_err(|err: StatsError| OracleError::from_stats("confidence", &err))?;

    let n_f = n as f64;
    let p_hat = successes as f64 / n_f;
    let z2 = z * z;
    let denominator = 1.0 + z2 / n_f;
    let center = (p_hat + z2 / (2.0 * n_f)) / denominator;
    let spread =
        z * (p_hat * (1.0 - p_hat) / n_f + z2 / (4.0 * n_f * n_f)).sqrt() / denominator;
    Ok(((center - spread).max(0.0), (center + spread).min(1.0)))
}
