//! "Nice" tick placement for the color legend.

const STEPS: [f64; 5] = [1.0, 2.0, 2.5, 5.0, 10.0];

/// Ticks at multiples of 1, 2, 2.5 or 5 times a power of ten, using at most
/// `nbins` intervals to cover `[vmin, vmax]`. Only ticks inside the range are
/// returned.
pub fn max_n_ticks(vmin: f64, vmax: f64, nbins: usize) -> Vec<f64> {
    let (vmin, vmax) = if vmin <= vmax { (vmin, vmax) } else { (vmax, vmin) };
    if !vmin.is_finite() || !vmax.is_finite() {
        return Vec::new();
    }
    if vmax == vmin || nbins == 0 {
        return vec![vmin];
    }
    let step = nice_step(vmin, vmax, nbins);
    let eps = step * 1e-9;
    let first = (vmin / step - 1e-9).ceil();
    let mut ticks = Vec::new();
    let mut k = first;
    loop {
        let t = k * step;
        if t > vmax + eps {
            break;
        }
        // snap -0.0 and float noise around zero
        ticks.push(if t.abs() < eps { 0.0 } else { t });
        k += 1.0;
    }
    ticks
}

fn nice_step(vmin: f64, vmax: f64, nbins: usize) -> f64 {
    let raw = (vmax - vmin) / nbins as f64;
    let scale = 10f64.powf(raw.log10().floor());
    for s in STEPS {
        let step = s * scale;
        let lo = (vmin / step + 1e-9).floor();
        let hi = (vmax / step - 1e-9).ceil();
        if hi - lo <= nbins as f64 {
            return step;
        }
    }
    10.0 * scale
}

/// Formats ticks with the fewest decimals that keep them distinct.
pub fn format_ticks(ticks: &[f64]) -> Vec<String> {
    let step = ticks
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .fold(f64::INFINITY, f64::min);
    let decimals = if step.is_finite() && step > 0.0 {
        let mut d = (-step.log10().floor()).max(0.0) as usize;
        let scaled = step * 10f64.powi(d as i32);
        if (scaled - scaled.round()).abs() > 1e-6 {
            d += 1;
        }
        d
    } else {
        0
    };
    ticks.iter().map(|t| format!("{:.*}", decimals, t)).collect()
}
