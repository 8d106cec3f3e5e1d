//! Homogeneous background cosmology.
//!
//! Distances are in Mpc, `H` in km/s/Mpc. Dark energy follows the
//! CPL form `w(a) = w0 + wa (1 - a)`.

/// Speed of light in km/s.
pub const C_KM_S: f64 = 299_792.458;

/// Photon density today, `Ω_γ h²`.
pub const OMEGA_GAMMA_H2: f64 = 2.469e-5;

/// Photon plus massless neutrino density today, `Ω_r h²` (N_eff = 3.046).
pub const OMEGA_RAD_H2: f64 = OMEGA_GAMMA_H2 * (1.0 + 0.2271 * 3.046);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cosmology {
    /// `H0 / (100 km/s/Mpc)`.
    pub h0: f64,
    pub omega_m: f64,
    pub omega_k: f64,
    pub omega_de: f64,
    pub omega_r: f64,
    pub w0: f64,
    pub wa: f64,
}

impl Cosmology {
    /// Hubble distance `c / H0`.
    #[must_use]
    pub fn hubble_distance(&self) -> f64 {
        C_KM_S / (100.0 * self.h0)
    }

    /// `E²(a) = H²(a) / H0²`.
    #[must_use]
    pub fn e2_of_a(&self, a: f64) -> f64 {
        let de = a.powf(-3.0 * (1.0 + self.w0 + self.wa)) * (-3.0 * self.wa * (1.0 - a)).exp();
        self.omega_r / a.powi(4) + self.omega_m / a.powi(3) + self.omega_k / a.powi(2) + self.omega_de * de
    }

    #[must_use]
    pub fn e2_of_z(&self, z: f64) -> f64 {
        self.e2_of_a(1.0 / (1.0 + z))
    }

    /// `H(z)` in km/s/Mpc.
    #[must_use]
    pub fn hubble(&self, z: f64) -> f64 {
        100.0 * self.h0 * self.e2_of_z(z).sqrt()
    }

    /// Transverse comoving distance from a line-of-sight comoving distance.
    #[must_use]
    pub fn transverse(&self, d_c: f64) -> f64 {
        let dh = self.hubble_distance();
        if self.omega_k > 1e-12 {
            let sk = self.omega_k.sqrt();
            dh / sk * (sk * d_c / dh).sinh()
        } else if self.omega_k < -1e-12 {
            let sk = (-self.omega_k).sqrt();
            dh / sk * (sk * d_c / dh).sin()
        } else {
            d_c
        }
    }
}

/// Composite Simpson integral of `f` over `[a, b]` with `n` (even) intervals.
pub fn simpson(f: impl Fn(f64) -> f64, a: f64, b: f64, n: usize) -> f64 {
    let n = n.max(2) + n % 2;
    let h = (b - a) / n as f64;
    let mut sum = f(a) + f(b);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(a + i as f64 * h);
    }
    sum * h / 3.0
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
#[must_use]
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + i as f64 * step })
                .collect()
        }
    }
}

/// Redshift of last scattering (Hu & Sugiyama 1996 fit).
#[must_use]
pub fn z_star(ombh2: f64, ommh2: f64) -> f64 {
    let g1 = 0.0783 * ombh2.powf(-0.238) / (1.0 + 39.5 * ombh2.powf(0.763));
    let g2 = 0.560 / (1.0 + 21.1 * ombh2.powf(1.81));
    1048.0 * (1.0 + 0.001_24 * ombh2.powf(-0.738)) * (1.0 + g1 * ommh2.powf(g2))
}

/// Angular size of the sound horizon at last scattering, `θ_*`.
///
/// Physical densities are fixed; `h0` sets the split between matter and
/// dark energy through `Ω_de = 1 - Ω_m - Ω_k - Ω_r`.
#[must_use]
pub fn theta_star(h0: f64, ombh2: f64, omch2: f64, omnuh2: f64, omega_k: f64, w0: f64, wa: f64) -> f64 {
    let h2 = h0 * h0;
    let ommh2 = ombh2 + omch2 + omnuh2;
    let omega_m = ommh2 / h2;
    let omega_r = OMEGA_RAD_H2 / h2;
    let cosmo = Cosmology {
        h0,
        omega_m,
        omega_k,
        omega_de: 1.0 - omega_m - omega_k - omega_r,
        omega_r,
        w0,
        wa,
    };

    let zs = z_star(ombh2, ommh2);
    let a_star = 1.0 / (1.0 + zs);
    let h100 = 100.0 * h0;
    let baryon_photon = 3.0 * ombh2 / (4.0 * OMEGA_GAMMA_H2);

    // Both integrals in the scale factor.
    let sound = |a: f64| {
        let cs = C_KM_S / (3.0 * (1.0 + baryon_photon * a)).sqrt();
        cs / (a * a * h100 * cosmo.e2_of_a(a).sqrt())
    };
    let light = |a: f64| C_KM_S / (a * a * h100 * cosmo.e2_of_a(a).sqrt());

    let r_s = simpson(sound, 1e-8, a_star, 2000);
    let d_c = simpson(light, a_star, 1.0, 4000);
    r_s / cosmo.transverse(d_c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(h0: f64, omega_m: f64) -> Cosmology {
        Cosmology {
            h0,
            omega_m,
            omega_k: 0.0,
            omega_de: 1.0 - omega_m,
            omega_r: 0.0,
            w0: -1.0,
            wa: 0.0,
        }
    }

    #[test]
    fn simpson_is_exact_for_cubics() {
        let v = simpson(|x| x * x * x + 2.0 * x, 0.0, 2.0, 4);
        assert!((v - 8.0).abs() < 1e-12);
    }

    #[test]
    fn linspace_endpoints() {
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn hubble_rate() {
        let c = flat(0.7, 0.3);
        assert!((c.hubble(0.0) - 70.0).abs() < 1e-12);
        assert!((c.hubble(1.0) - 70.0 * 3.1_f64.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn einstein_de_sitter_distance() {
        // Ω_m = 1: d_c = 2 D_H (1 - 1/√(1+z)).
        let c = flat(0.7, 1.0);
        let d = simpson(|z| 1.0 / c.e2_of_z(z).sqrt(), 0.0, 3.0, 2000) * c.hubble_distance();
        let exact = 2.0 * c.hubble_distance() * 0.5;
        assert!((d - exact).abs() / exact < 1e-8);
    }

    #[test]
    fn theta_star_is_near_planck() {
        let theta = 100.0 * theta_star(0.6736, 0.02237, 0.1200, 0.0, 0.0, -1.0, 0.0);
        assert!((theta - 1.041).abs() < 0.01, "100θ = {theta}");

        // θ grows with h at fixed physical densities.
        let lo = theta_star(0.6, 0.02237, 0.12, 0.0, 0.0, -1.0, 0.0);
        let hi = theta_star(0.8, 0.02237, 0.12, 0.0, 0.0, -1.0, 0.0);
        assert!(hi > lo);
    }
}
