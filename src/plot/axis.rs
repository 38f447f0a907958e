//! Axis tick placement.
//!
//! Major ticks sit on "nice" steps (`1`, `2`, `5` × 10^k). Minor ticks split
//! each major step into 5 parts when its mantissa is 1 or 5, otherwise into 4
//! (so a step of 20 gets minors every 5, a step of 0.5 every 0.1).
//!
//! Majors and minors come from one integer grid of minor steps, so a minor tick
//! never lands on a major one.

#[derive(Debug, Clone, PartialEq)]
pub struct Ticks {
    pub major: Vec<f64>,
    pub minor: Vec<f64>,
    pub step: f64,
}

impl Ticks {
    /// Decimal places needed to print major tick labels.
    pub fn decimals(&self) -> usize {
        let exp = self.step.log10().floor();
        if exp < 0.0 { (-exp) as usize } else { 0 }
    }

    pub fn format(&self, v: f64) -> String {
        format!("{:.*}", self.decimals(), v)
    }
}

/// Roughly `target` major steps over `span`, rounded to 1/2/5 × 10^k.
pub fn nice_step(span: f64, target: usize) -> f64 {
    let target = target.max(1) as f64;
    if !(span.is_finite() && span > 0.0) {
        return 1.0;
    }
    let raw = span / target;
    let mag = 10f64.powf(raw.log10().floor());
    let norm = raw / mag;
    let nice = if norm <= 1.0 {
        1.0
    } else if norm <= 2.0 {
        2.0
    } else if norm <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * mag
}

/// Minor subdivisions per major step.
pub fn minor_divisions(step: f64) -> usize {
    let mantissa = step / 10f64.powf(step.log10().floor());
    let close = |x: f64| (mantissa - x).abs() < 1e-9;
    if close(1.0) || close(5.0) || close(10.0) { 5 } else { 4 }
}

/// Major and minor ticks inside `[min, max]`.
pub fn ticks(min: f64, max: f64, target: usize) -> Ticks {
    let step = nice_step(max - min, target);
    let ndiv = minor_divisions(step) as i64;
    let minor_step = step / ndiv as f64;

    let mut major = Vec::new();
    let mut minor = Vec::new();
    if !(min.is_finite() && max.is_finite()) || max < min {
        return Ticks { major, minor, step };
    }

    let first = (min / minor_step - 1e-9).ceil() as i64;
    let last = (max / minor_step + 1e-9).floor() as i64;
    for k in first..=last {
        let v = clean_zero(k as f64 * minor_step);
        if k.rem_euclid(ndiv) == 0 {
            major.push(v);
        } else {
            minor.push(v);
        }
    }

    Ticks { major, minor, step }
}

fn clean_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn temperature_axis_gets_major_and_minor_ticks() {
        let t = ticks(10.0, 80.0, 5);
        assert_eq!(t.step, 20.0);
        assert!(approx(&t.major, &[20.0, 40.0, 60.0, 80.0]), "{:?}", t.major);
        assert!(approx(&t.minor[..3], &[10.0, 15.0, 25.0]), "{:?}", t.minor);
        assert_eq!(t.minor.len(), 11);
        assert_eq!(t.format(40.0), "40");
    }

    #[test]
    fn fraction_axis_uses_fifths() {
        let t = ticks(0.0, 1.0, 4);
        assert!((t.step - 0.5).abs() < 1e-12);
        assert_eq!(minor_divisions(t.step), 5);
        assert!(approx(&t.major, &[0.0, 0.5, 1.0]), "{:?}", t.major);
        assert_eq!(t.minor.len(), 8);
        assert_eq!(t.format(0.5), "0.5");
    }

    #[test]
    fn negative_ranges_are_handled() {
        let t = ticks(-12.0, 3.0, 3);
        assert_eq!(t.step, 5.0);
        assert!(approx(&t.major, &[-10.0, -5.0, 0.0]), "{:?}", t.major);
        assert!(t.major.iter().all(|v| !(v.is_sign_negative() && *v == 0.0)));
    }

    #[test]
    fn degenerate_span_falls_back_to_unit_step() {
        assert_eq!(nice_step(0.0, 5), 1.0);
        assert_eq!(nice_step(f64::NAN, 5), 1.0);
    }
}
