//! 1D Kalman trend filter: state `[price, velocity]`.
//!
//! Transition matrix `[[1,1],[0,1]]`, observation `[1,0]` — a constant-velocity
//! model where each step's predicted price is the prior price plus the prior
//! velocity, and velocity itself is a random walk. Process and measurement
//! variances are configurable; initial covariance is pinned large (the filter
//! trusts the first few observations almost entirely), since the spec leaves
//! the initial-covariance choice open and it must be pinned and documented
//! rather than guessed per run.

/// Tunable noise parameters for [`kalman_trend`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KalmanConfig {
    /// Process noise variance (how much we trust the constant-velocity model).
    pub process_var: f64,
    /// Measurement noise variance (how much we trust a single observed close).
    pub measurement_var: f64,
    /// Initial state covariance (diagonal). Large values mean "no prior belief".
    pub initial_covariance: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            process_var: 1e-5,
            measurement_var: 1e-2,
            initial_covariance: 1.0,
        }
    }
}

/// Per-bar Kalman output: the smoothed price and trend velocity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KalmanTrend {
    pub price: f64,
    pub velocity: f64,
}

/// Run the 2-state Kalman filter over `closes`, returning one [`KalmanTrend`]
/// per input close (empty if `closes` is empty).
///
/// State vector `x = [price, velocity]`, transition `F = [[1,1],[0,1]]`,
/// observation `H = [1,0]`. Initialized with `price = closes[0]`,
/// `velocity = 0`, and covariance `diag(initial_covariance, initial_covariance)`.
pub fn kalman_trend(closes: &[f64], cfg: KalmanConfig) -> Vec<KalmanTrend> {
    if closes.is_empty() {
        return Vec::new();
    }

    // State: [price, velocity]
    let mut x = [closes[0], 0.0];
    // Covariance matrix, row-major 2x2.
    let mut p = [
        [cfg.initial_covariance, 0.0],
        [0.0, cfg.initial_covariance],
    ];

    let q = cfg.process_var;
    let r = cfg.measurement_var;

    let mut out = Vec::with_capacity(closes.len());
    out.push(KalmanTrend {
        price: x[0],
        velocity: x[1],
    });

    for &z in &closes[1..] {
        // Predict: x' = F x
        let predicted_price = x[0] + x[1];
        let predicted_velocity = x[1];

        // Predict: P' = F P F^T + Q  (Q is diag(q, q))
        // F = [[1,1],[0,1]]
        let p00 = p[0][0] + p[0][1] + p[1][0] + p[1][1] + q;
        let p01 = p[0][1] + p[1][1];
        let p10 = p[1][0] + p[1][1];
        let p11 = p[1][1] + q;

        // Update: innovation y = z - H x' = z - predicted_price
        let y = z - predicted_price;
        // Innovation covariance S = H P' H^T + R = p00 + R
        let s = p00 + r;
        // Kalman gain K = P' H^T / S = [p00, p10] / s
        let k0 = p00 / s;
        let k1 = p10 / s;

        let new_price = predicted_price + k0 * y;
        let new_velocity = predicted_velocity + k1 * y;

        // P = (I - K H) P'
        let new_p00 = (1.0 - k0) * p00;
        let new_p01 = (1.0 - k0) * p01;
        let new_p10 = p10 - k1 * p00;
        let new_p11 = p11 - k1 * p01;

        x = [new_price, new_velocity];
        p = [[new_p00, new_p01], [new_p10, new_p11]];

        out.push(KalmanTrend {
            price: x[0],
            velocity: x[1],
        });
    }

    out
}

/// Normalize a Kalman velocity into `T_norm ∈ [-1, 1]` by dividing by
/// `t_max` and clipping.
pub fn normalize_trend(velocity: f64, t_max: f64) -> f64 {
    if t_max <= 0.0 {
        return 0.0;
    }
    (velocity / t_max).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_series_has_zero_velocity() {
        let closes = vec![100.0; 50];
        let out = kalman_trend(&closes, KalmanConfig::default());
        let last = out.last().unwrap();
        assert!((last.price - 100.0).abs() < 1e-6);
        assert!(last.velocity.abs() < 1e-6);
    }

    #[test]
    fn monotone_uptrend_has_positive_velocity() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64 * 0.5).collect();
        let out = kalman_trend(&closes, KalmanConfig::default());
        let last = out.last().unwrap();
        assert!(last.velocity > 0.0);
    }

    #[test]
    fn normalize_clips_to_unit_range() {
        assert_eq!(normalize_trend(10.0, 1.0), 1.0);
        assert_eq!(normalize_trend(-10.0, 1.0), -1.0);
        assert_eq!(normalize_trend(0.5, 1.0), 0.5);
        assert_eq!(normalize_trend(1.0, 0.0), 0.0);
    }
}
