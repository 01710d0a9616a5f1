//! Reducers applied to a reply's sample sequence.
//!
//! Bins the service could not fill arrive as `NaN` and are skipped. A
//! sequence with no finite samples has no aggregate; [`aggregate`] maps
//! that case to [`EMPTY_AGGREGATE`] so callers never see `NaN`.

use giot_vis_query_models::Aggregate;

/// Value reported for a sequence without any finite samples.
pub const EMPTY_AGGREGATE: f64 = 0.0;

/// Applies `operation` to the finite values of `data`, or
/// [`EMPTY_AGGREGATE`] if there are none.
#[must_use]
pub fn aggregate(data: &[f64], operation: Aggregate) -> f64 {
    try_aggregate(data, operation).unwrap_or(EMPTY_AGGREGATE)
}

/// Applies `operation` to the finite values of `data`. Returns `None` when
/// there are no finite values.
#[must_use]
pub fn try_aggregate(data: &[f64], operation: Aggregate) -> Option<f64> {
    match operation {
        Aggregate::Mean => mean(data),
        Aggregate::StdDev => std_dev(data),
        Aggregate::Max => finite(data).reduce(f64::max),
        Aggregate::Min => finite(data).reduce(f64::min),
    }
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(data: &[f64]) -> Option<f64> {
    let (count, sum) = finite(data).fold((0_usize, 0.0), |(n, s), x| (n + 1, s + x));
    (count > 0).then(|| sum / count as f64)
}

/// Sample standard deviation (`n - 1` denominator). A single sample has a
/// deviation of zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let avg = mean(data)?;
    let (count, squares) = finite(data).fold((0_usize, 0.0), |(n, s), x| {
        let d = x - avg;
        (n + 1, d.mul_add(d, s))
    });

    if count < 2 {
        return Some(0.0);
    }

    Some((squares / (count - 1) as f64).sqrt())
}

fn finite(data: &[f64]) -> impl Iterator<Item = f64> + '_ {
    data.iter().copied().filter(|x| x.is_finite())
}
