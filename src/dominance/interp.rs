// Grid construction and linear interpolation helpers

/// `count` equally spaced values from `start` to `end`, both inclusive.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| {
                    if i == count - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

/// Linearly interpolate `(xs, ys)` at every target.
///
/// `xs` must be non-decreasing and the same length as `ys`. Targets outside
/// `[xs[0], xs[last]]` take the first/last value. Repeated `xs` values never
/// divide by zero: the bracketing pair always has `xs[left] < xs[right]`.
pub fn interp(targets: &[f64], xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let len = xs.len().min(ys.len());
    if len == 0 {
        return vec![0.; targets.len()];
    }
    let (xs, ys) = (&xs[..len], &ys[..len]);

    targets
        .iter()
        .map(|&target| {
            // number of samples at or before the target
            let right = xs.partition_point(|&x| x <= target);
            if right == 0 {
                return ys[0];
            }
            if right == len {
                return ys[len - 1];
            }
            let left = right - 1;
            let frac = (target - xs[left]) / (xs[right] - xs[left]);
            ys[left] + (ys[right] - ys[left]) * frac
        })
        .collect()
}

/// Right-pad with zeros or right-truncate to exactly `len` values.
pub fn pad_or_truncate(values: &[f64], len: usize) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().copied().take(len).collect();
    out.resize(len, 0.);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_linspace_endpoints() {
        let grid = linspace(0., 4800., 200);
        assert_eq!(grid.len(), 200);
        assert_eq!(grid[0], 0.);
        assert_eq!(grid[199], 4800.);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));

        assert_eq!(linspace(0., 10., 1), vec![0.]);
        assert!(linspace(0., 10., 0).is_empty());
    }

    #[test]
    fn test_interp_midpoints() {
        let out = interp(&[0., 5., 10., 15.], &[0., 10., 20.], &[0., 100., 300.]);
        assert_eq!(out, vec![0., 50., 100., 200.]);
    }

    #[test]
    fn test_interp_clamps_outside_range() {
        let out = interp(&[-5., 0., 25., 30.], &[2., 10., 20.], &[1., 2., 3.]);
        assert_eq!(out, vec![1., 1., 3., 3.]);
    }

    #[test]
    fn test_interp_with_repeated_distances() {
        let xs = [0., 10., 10., 20.];
        let ys = [0., 5., 7., 17.];
        let out = interp(&[5., 10., 15.], &xs, &ys);
        assert_eq!(out[0], 2.5);
        // exactly on the repeated sample: the segment starting at its last copy
        assert_eq!(out[1], 7.);
        assert_eq!(out[2], 12.);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_pad_or_truncate() {
        assert_eq!(pad_or_truncate(&[1., 2.], 4), vec![1., 2., 0., 0.]);
        assert_eq!(pad_or_truncate(&[1., 2., 3.], 2), vec![1., 2.]);
        assert_eq!(pad_or_truncate(&[], 3), vec![0., 0., 0.]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_interp_stays_within_sample_bounds(
            steps in prop::collection::vec(0.0f64..50.0, 2..60),
            values in prop::collection::vec(-100.0f64..100.0, 60),
            targets in prop::collection::vec(-10.0f64..3000.0, 1..50),
        ) {
            let xs: Vec<f64> = steps
                .iter()
                .scan(0., |acc, step| {
                    *acc += step;
                    Some(*acc)
                })
                .collect();
            let ys = &values[..xs.len()];
            let lo = ys.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            for value in interp(&targets, &xs, ys) {
                prop_assert!(value.is_finite());
                prop_assert!(value >= lo - 1e-9 && value <= hi + 1e-9);
            }
        }
    }
}
