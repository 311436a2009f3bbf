//! Summary statistics over call arguments. NaN values are ignored and an
//! all-NaN sample yields NaN.

fn sample(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

fn sorted_sample(values: &[f64]) -> Vec<f64> {
    let mut data = sample(values);
    data.sort_by(f64::total_cmp);
    data
}

pub fn max(values: &[f64]) -> f64 {
    sample(values).into_iter().reduce(f64::max).unwrap_or(f64::NAN)
}

pub fn min(values: &[f64]) -> f64 {
    sample(values).into_iter().reduce(f64::min).unwrap_or(f64::NAN)
}

pub fn sum(values: &[f64]) -> f64 {
    let data = sample(values);
    if data.is_empty() {
        f64::NAN
    } else {
        data.iter().sum()
    }
}

pub fn mean(values: &[f64]) -> f64 {
    let data = sample(values);
    if data.is_empty() {
        f64::NAN
    } else {
        data.iter().sum::<f64>() / data.len() as f64
    }
}

pub fn range(values: &[f64]) -> f64 {
    max(values) - min(values)
}

pub fn median(values: &[f64]) -> f64 {
    let data = sorted_sample(values);
    let n = data.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        data[n / 2]
    } else {
        (data[n / 2 - 1] + data[n / 2]) / 2.0
    }
}

/// Highest-frequency value. Ties resolve to the median of the tied values,
/// taking the lower middle one for an even count, so the result always
/// occurs in the sample.
pub fn mode(values: &[f64]) -> f64 {
    let data = sorted_sample(values);
    let Some(&first) = data.first() else {
        return f64::NAN;
    };

    let mut runs: Vec<(f64, usize)> = vec![(first, 0)];
    for value in data {
        match runs.last_mut() {
            Some((current, count)) if *current == value => *count += 1,
            _ => runs.push((value, 1)),
        }
    }

    let max_freq = runs.iter().map(|(_, count)| *count).max().unwrap_or(0);
    let tied: Vec<f64> = runs
        .iter()
        .filter(|(_, count)| *count == max_freq)
        .map(|(value, _)| *value)
        .collect();
    let mut index = tied.len() / 2;
    if tied.len() % 2 == 0 {
        index -= 1;
    }
    tied[index]
}

/// Sample variance (n - 1 denominator), two-pass to limit round-off.
pub fn variance(values: &[f64]) -> f64 {
    let data = sample(values);
    let n = data.len();
    if n < 2 {
        return f64::NAN;
    }
    let mu = data.iter().sum::<f64>() / n as f64;
    let (ss, ep) = data.iter().fold((0.0, 0.0), |(ss, ep), v| {
        let d = v - mu;
        (ss + d * d, ep + d)
    });
    (ss - ep * ep / n as f64) / (n - 1) as f64
}

pub fn sdev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}
