use serde::Serialize;

/// Ordinary least-squares line `y = slope·x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub min_x: f64,
    pub max_x: f64,
    /// Number of points the fit used.
    pub n: usize,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Line endpoints across the fitted x-range.
    pub fn endpoints(&self) -> [[f64; 2]; 2] {
        [
            [self.min_x, self.at(self.min_x)],
            [self.max_x, self.at(self.max_x)],
        ]
    }
}

/// Fit a line through the finite points.
///
/// Points with a NaN or infinite coordinate are ignored. Returns `None` with
/// fewer than two usable points or when x has no variance.
pub fn fit<I>(points: I) -> Option<LinearFit>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut n = 0usize;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);

    for (x, y) in points {
        if !x.is_finite() || !y.is_finite() {
            continue;
        }
        n += 1;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
        min_x = min_x.min(x);
        max_x = max_x.max(x);
    }

    if n < 2 || min_x == max_x {
        return None;
    }
    let nf = n as f64;
    let denom = nf * sum_xx - sum_x * sum_x;
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    let slope = (nf * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / nf;
    Some(LinearFit {
        slope,
        intercept,
        min_x,
        max_x,
        n,
    })
}
