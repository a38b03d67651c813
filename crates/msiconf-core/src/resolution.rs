use serde::Serialize;

use crate::metadata::Analyzer;

/// m/z at which resolving power is compared across instruments.
pub const REFERENCE_MZ: f64 = 200.0;

const SIGMA_DECIMALS: i32 = 6;

/// Peak-shape parameters for one resolving-power tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolutionParams {
    pub tier: &'static str,
    pub sigma: f64,
    pub fwhm: f64,
    pub pts_per_mz: u32,
}

impl ResolutionParams {
    /// Sigma rounded to six decimal places, as handed to isotope generation.
    pub fn rounded_sigma(&self) -> f64 {
        let scale = 10f64.powi(SIGMA_DECIMALS);
        (self.sigma * scale).round() / scale
    }
}

pub const RP_70K: ResolutionParams = ResolutionParams {
    tier: "70K",
    sigma: 0.00247585727028,
    fwhm: 0.00583019832869,
    pts_per_mz: 2019,
};

pub const RP_100K: ResolutionParams = ResolutionParams {
    tier: "100K",
    sigma: 0.0017331000892,
    fwhm: 0.00408113883008,
    pts_per_mz: 2885,
};

pub const RP_140K: ResolutionParams = ResolutionParams {
    tier: "140K",
    sigma: 0.00123792863514,
    fwhm: 0.00291509916435,
    pts_per_mz: 4039,
};

// Not reachable from threshold selection; available by name only.
pub const RP_200K: ResolutionParams = ResolutionParams {
    tier: "200K",
    sigma: 0.000866550044598,
    fwhm: 0.00204056941504,
    pts_per_mz: 5770,
};

pub const RP_250K: ResolutionParams = ResolutionParams {
    tier: "250K",
    sigma: 0.000693240035678,
    fwhm: 0.00163245553203,
    pts_per_mz: 7212,
};

pub const RP_280K: ResolutionParams = ResolutionParams {
    tier: "280K",
    sigma: 0.00061896431757,
    fwhm: 0.00145754958217,
    pts_per_mz: 8078,
};

pub const RP_500K: ResolutionParams = ResolutionParams {
    tier: "500K",
    sigma: 0.000346620017839,
    fwhm: 0.000816227766017,
    pts_per_mz: 14425,
};

pub const RP_750K: ResolutionParams = ResolutionParams {
    tier: "750K",
    sigma: 0.000231080011893,
    fwhm: 0.000544151844011,
    pts_per_mz: 21637,
};

pub const RP_1000K: ResolutionParams = ResolutionParams {
    tier: "1000K",
    sigma: 0.00017331000892,
    fwhm: 0.000408113883008,
    pts_per_mz: 28850,
};

pub const RESOLUTION_TABLE: [ResolutionParams; 9] = [
    RP_70K, RP_100K, RP_140K, RP_200K, RP_250K, RP_280K, RP_500K, RP_750K, RP_1000K,
];

/// Exclusive upper bounds on RP200, ascending. Anything past the last bound is 1000K.
pub const TIER_THRESHOLDS: [(f64, ResolutionParams); 7] = [
    (85_000.0, RP_70K),
    (120_000.0, RP_100K),
    (195_000.0, RP_140K),
    (265_000.0, RP_250K),
    (390_000.0, RP_280K),
    (625_000.0, RP_500K),
    (875_000.0, RP_750K),
];

/// Normalizes a reported resolving power to its equivalent at m/z 200.
///
/// FTICR resolving power scales linearly with m/z and Orbitrap with its square
/// root; other analyzers are taken at face value.
pub fn rp_at_reference(analyzer: &Analyzer, mz: f64, resolving_power: f64) -> f64 {
    match analyzer {
        Analyzer::Fticr => resolving_power * mz / REFERENCE_MZ,
        Analyzer::Orbitrap => resolving_power * (mz / REFERENCE_MZ).sqrt(),
        Analyzer::Other(_) => resolving_power,
    }
}

pub fn select_resolution_params(rp200: f64) -> ResolutionParams {
    TIER_THRESHOLDS
        .iter()
        .find(|(limit, _)| rp200 < *limit)
        .map(|(_, params)| *params)
        .unwrap_or(RP_1000K)
}

pub fn lookup_tier(name: &str) -> Option<ResolutionParams> {
    RESOLUTION_TABLE
        .iter()
        .find(|params| params.tier == name)
        .copied()
}
