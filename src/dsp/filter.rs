//! Second-order resonator sections for the cascade and parallel banks.
//!
//! # Formulas
//! ## Variables:
//! ```text
//!    x = input samples
//!    y = output samples
//!    a/b/c = filter coefficients
//!    f0 = resonance frequency in Hz
//!    w0 = 2 * PI * f0 / sampleRate
//!    bw = bandwidth in Hz
//!    r = exp(-PI * bw / sampleRate)
//! ```
//! ## Resonator filter function:
//! ```text
//!    y[n] = a * x[n] + b * y[n-1] + c * y[n-2]
//!    c = -r^2
//!    b = 2 * r * cos(w0)
//!    a = 1 - b - c
//! ```
//! With `a = 1 - b - c` the DC gain is exactly 1, so a chain of resonators
//! does not drift in level as formants move.
//!
//! The anti-resonator is the FIR mirror image: it runs the inverted
//! coefficients over the *input* history, producing a spectral notch with
//! unity DC gain.

use std::f64::consts::PI;

/// A two-pole IIR resonator.
///
/// `set_parameters` is cheap to call every sample: coefficients are only
/// recomputed when (frequency, bandwidth) actually changed. A bandwidth of
/// zero or a frequency at/above Nyquist turns the section into a wire.
#[derive(Debug, Clone)]
pub struct Resonator {
    sample_rate: f64,
    a: f64,
    b: f64,
    c: f64,
    /// y[n-1]
    y1: f64,
    /// y[n-2]
    y2: f64,
    frequency: f64,
    bandwidth: f64,
    configured: bool,
    passthrough: bool,
}

impl Resonator {
    pub fn new(sample_rate: usize) -> Self {
        Resonator {
            sample_rate: sample_rate as f64,
            a: 0.0,
            b: 0.0,
            c: 0.0,
            y1: 0.0,
            y2: 0.0,
            frequency: 0.0,
            bandwidth: 0.0,
            configured: false,
            passthrough: true,
        }
    }

    /// Adjusts frequency and bandwidth without resetting the delay line.
    pub fn set_parameters(&mut self, frequency: f64, bandwidth: f64) {
        if self.configured && frequency == self.frequency && bandwidth == self.bandwidth {
            return;
        }
        self.frequency = frequency;
        self.bandwidth = bandwidth;
        self.configured = true;

        if !frequency.is_finite()
            || !bandwidth.is_finite()
            || bandwidth <= 0.0
            || frequency < 0.0
            || frequency >= self.sample_rate / 2.0
        {
            self.passthrough = true;
            return;
        }

        let r = (-PI * bandwidth / self.sample_rate).exp();
        let w0 = 2.0 * PI * frequency / self.sample_rate;
        self.c = -(r * r);
        self.b = 2.0 * r * w0.cos();
        self.a = 1.0 - self.b - self.c;
        self.passthrough = false;
    }

    /// Performs one filter step.
    pub fn step(&mut self, x: f64) -> f64 {
        if self.passthrough {
            return x;
        }
        let y = self.a * x + self.b * self.y1 + self.c * self.y2;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    /// Zeroes the delay line. Parameters are kept.
    pub fn reset(&mut self) {
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// A two-zero FIR anti-resonator (spectral notch), used for the nasal zero
/// in the cascade branch.
#[derive(Debug, Clone)]
pub struct AntiResonator {
    sample_rate: f64,
    a: f64,
    b: f64,
    c: f64,
    /// x[n-1]
    x1: f64,
    /// x[n-2]
    x2: f64,
    frequency: f64,
    bandwidth: f64,
    configured: bool,
    passthrough: bool,
}

impl AntiResonator {
    pub fn new(sample_rate: usize) -> Self {
        AntiResonator {
            sample_rate: sample_rate as f64,
            a: 0.0,
            b: 0.0,
            c: 0.0,
            x1: 0.0,
            x2: 0.0,
            frequency: 0.0,
            bandwidth: 0.0,
            configured: false,
            passthrough: true,
        }
    }

    /// Adjusts frequency and bandwidth without resetting the delay line.
    pub fn set_parameters(&mut self, frequency: f64, bandwidth: f64) {
        if self.configured && frequency == self.frequency && bandwidth == self.bandwidth {
            return;
        }
        self.frequency = frequency;
        self.bandwidth = bandwidth;
        self.configured = true;

        if !frequency.is_finite()
            || !bandwidth.is_finite()
            || bandwidth <= 0.0
            || frequency <= 0.0
            || frequency >= self.sample_rate / 2.0
        {
            self.passthrough = true;
            return;
        }

        let r = (-PI * bandwidth / self.sample_rate).exp();
        let w0 = 2.0 * PI * frequency / self.sample_rate;
        let c0 = -(r * r);
        let b0 = 2.0 * r * w0.cos();
        let a0 = 1.0 - b0 - c0;
        if a0 == 0.0 {
            self.a = 0.0;
            self.b = 0.0;
            self.c = 0.0;
            self.passthrough = false;
            return;
        }
        self.a = 1.0 / a0;
        self.b = -b0 / a0;
        self.c = -c0 / a0;
        self.passthrough = false;
    }

    /// Performs one filter step.
    pub fn step(&mut self, x: f64) -> f64 {
        if self.passthrough {
            return x;
        }
        let y = self.a * x + self.b * self.x1 + self.c * self.x2;
        self.x2 = self.x1;
        self.x1 = x;
        y
    }

    /// Zeroes the delay line. Parameters are kept.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bandwidth_is_passthrough() {
        let mut r = Resonator::new(22050);
        r.set_parameters(1000.0, 0.0);
        assert_eq!(r.step(0.5), 0.5);
        assert_eq!(r.step(-1.25), -1.25);
    }

    #[test]
    fn frequency_above_nyquist_is_passthrough() {
        let mut r = Resonator::new(22050);
        r.set_parameters(12000.0, 80.0);
        assert_eq!(r.step(1.0), 1.0);
    }

    #[test]
    fn dc_gain_is_unity() {
        let mut r = Resonator::new(22050);
        r.set_parameters(500.0, 60.0);
        // Feed a DC input until the output settles; it must converge on 1.0.
        let mut y = 0.0;
        for _ in 0..20000 {
            y = r.step(1.0);
        }
        assert!((y - 1.0).abs() < 1e-6, "settled at {y}");
    }

    #[test]
    fn impulse_response_is_bounded_near_nyquist() {
        let mut r = Resonator::new(22050);
        r.set_parameters(11000.0, 100.0);
        let mut peak: f64 = 0.0;
        let mut y = r.step(1.0);
        peak = peak.max(y.abs());
        for _ in 0..22050 {
            y = r.step(0.0);
            peak = peak.max(y.abs());
        }
        assert!(y.abs() < 1e-3, "impulse response did not decay: {y}");
        assert!(peak.is_finite());
    }

    #[test]
    fn anti_resonator_notches_its_center_frequency() {
        let sr = 22050usize;
        let f = 1000.0;
        let mut ar = AntiResonator::new(sr);
        ar.set_parameters(f, 100.0);
        // Drive with a sine at the notch frequency; steady-state output must
        // be well below the input level. The zeros sit slightly inside the
        // unit circle, so attenuation is strong but not total.
        let mut peak_tail: f64 = 0.0;
        for n in 0..(sr * 2) {
            let x = (2.0 * PI * f * n as f64 / sr as f64).sin();
            let y = ar.step(x);
            if n > sr {
                peak_tail = peak_tail.max(y.abs());
            }
        }
        assert!(peak_tail < 0.2, "notch leaked: {peak_tail}");
    }

    #[test]
    fn reconfigure_is_a_no_op_for_identical_parameters() {
        let mut a = Resonator::new(22050);
        let mut b = Resonator::new(22050);
        a.set_parameters(700.0, 90.0);
        b.set_parameters(700.0, 90.0);
        for n in 0..64 {
            let x = if n == 0 { 1.0 } else { 0.0 };
            // Re-setting identical parameters every sample must not disturb
            // the filter state.
            a.set_parameters(700.0, 90.0);
            assert_eq!(a.step(x), b.step(x));
        }
    }
}
