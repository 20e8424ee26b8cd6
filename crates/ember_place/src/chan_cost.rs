//! Precomputed channel-capacity cost factors.
//!
//! The wiring cost of a net divides its bounding-box span by the average
//! number of routing tracks the box crosses in that direction. Storing the
//! inverse (raised to `place_cost_exp`) turns that division into a
//! multiplication in the inner loop. Access the factors as
//! `chanx(high, low)` / `chany(high, low)` with `high >= low`; only the
//! lower triangle is stored.

use ember_device::DeviceGrid;
use ember_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

/// Lower-triangular matrices of inverse average channel capacities.
#[derive(Clone, Debug)]
pub struct ChanCostFactors {
    /// `x[high][low]` covers horizontal channels in rows `low..=high`.
    x: Vec<Vec<f64>>,
    /// `y[high][low]` covers vertical channels in columns `low..=high`.
    y: Vec<Vec<f64>>,
}

impl ChanCostFactors {
    /// Precomputes both factor matrices for the device.
    ///
    /// Zero-width channel ranges would produce an infinite normalization
    /// factor and wreck the optimizer, so they are replaced by a single
    /// track (with a warning) before inversion.
    pub fn new(grid: &DeviceGrid, place_cost_exp: f32, sink: &DiagnosticSink) -> Self {
        let chan = grid.chan();
        let x = build_factors(&chan.x_list, grid.height(), place_cost_exp, "CHANX", sink);
        let y = build_factors(&chan.y_list, grid.width(), place_cost_exp, "CHANY", sink);
        Self { x, y }
    }

    /// Factor for horizontal channels between rows `low` and `high`.
    pub fn chanx(&self, high: usize, low: usize) -> f64 {
        self.x[high][low]
    }

    /// Factor for vertical channels between columns `low` and `high`.
    pub fn chany(&self, high: usize, low: usize) -> f64 {
        self.y[high][low]
    }
}

fn build_factors(
    widths: &[u32],
    dim: usize,
    place_cost_exp: f32,
    which: &str,
    sink: &DiagnosticSink,
) -> Vec<Vec<f64>> {
    let mut fac: Vec<Vec<f64>> = (0..dim).map(|high| vec![0.0; high + 1]).collect();

    // Running sums: fac[high][low] = total tracks in channels low..=high.
    fac[0][0] = widths[0] as f64;
    for high in 1..dim {
        fac[high][high] = widths[high] as f64;
        for low in 0..high {
            fac[high][low] = fac[high - 1][low] + widths[high] as f64;
        }
    }

    // Invert the average track count and raise to the cost exponent.
    for high in 0..dim {
        for low in 0..=high {
            if fac[high][low] == 0.0 {
                sink.emit(Diagnostic::warning(
                    DiagnosticCode::new(Category::Warning, 104),
                    format!("{which} place cost fac is 0 at {high} {low}"),
                ));
                fac[high][low] = 1.0;
            }
            fac[high][low] = ((high - low + 1) as f64 / fac[high][low])
                .powf(place_cost_exp as f64);
        }
    }

    fac
}
