use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aqi::breakpoints::{self, Breakpoint};

/// An indexed pollutant.
///
/// The declaration order is the fixed priority order used to break ties
/// when two sub-indices are equal, so `Ord` on this enum is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "CO2")]
    Co2,
    #[serde(rename = "CO")]
    Co,
    #[serde(rename = "NO2")]
    No2,
}

impl Pollutant {
    /// All indexed pollutants, in tie-break priority order.
    pub const ALL: [Pollutant; 3] = [Pollutant::Co2, Pollutant::Co, Pollutant::No2];

    fn table(self) -> &'static [Breakpoint; 6] {
        match self {
            Pollutant::Co2 => &breakpoints::CO2,
            Pollutant::Co => &breakpoints::CO,
            Pollutant::No2 => &breakpoints::NO2,
        }
    }
}

/// Health-risk category for an overall AQI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Good,
    Satisfactory,
    Moderate,
    Poor,
    VeryPoor,
    Severe,
}

impl Category {
    pub fn for_aqi(aqi: u16) -> Self {
        match aqi {
            0..=50 => Category::Good,
            51..=100 => Category::Satisfactory,
            101..=200 => Category::Moderate,
            201..=300 => Category::Poor,
            301..=400 => Category::VeryPoor,
            _ => Category::Severe,
        }
    }
}

/// The raw concentrations an AQI is computed from.
#[derive(Debug, Clone, Copy)]
pub struct Concentrations {
    /// CO₂ in ppm.
    pub co2: f64,
    /// CO in ppm.
    pub co: f64,
    /// NO₂ in µg/m³.
    pub no2: f64,
}

/// The result of scoring one set of concentrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AqiResult {
    pub aqi: u16,
    pub category: Category,
    pub sub_indices: BTreeMap<Pollutant, u16>,
    pub dominant: Pollutant,
}

/// Sub-index for one pollutant, unrounded.
///
/// Inputs below the table floor clamp to the first band's AQI minimum and
/// inputs above the table ceiling clamp to the last band's AQI maximum;
/// anything in between is linearly interpolated within its band. Total for
/// finite non-negative input.
fn sub_index(concentration: f64, table: &[Breakpoint; 6]) -> f64 {
    if concentration <= table[0].conc_lo {
        return table[0].aqi_lo;
    }
    for band in table {
        if concentration <= band.conc_hi {
            let span = band.conc_hi - band.conc_lo;
            let fraction = (concentration - band.conc_lo) / span;
            return band.aqi_lo + fraction * (band.aqi_hi - band.aqi_lo);
        }
    }
    table[5].aqi_hi
}

/// Compute the overall AQI, per-pollutant sub-indices, category, and
/// dominant pollutant for one set of concentrations.
///
/// The overall index is the maximum sub-index; rounding happens once, after
/// the maximum is taken, so band edges come out exact. The dominant
/// pollutant is the first in [`Pollutant::ALL`] whose unrounded sub-index
/// achieves the maximum.
pub fn compute_aqi(concentrations: &Concentrations) -> AqiResult {
    let raw: [(Pollutant, f64); 3] = [
        (Pollutant::Co2, sub_index(concentrations.co2, Pollutant::Co2.table())),
        (Pollutant::Co, sub_index(concentrations.co, Pollutant::Co.table())),
        (Pollutant::No2, sub_index(concentrations.no2, Pollutant::No2.table())),
    ];

    let mut overall = raw[0].1;
    let mut dominant = raw[0].0;
    for &(pollutant, value) in &raw[1..] {
        if value > overall {
            overall = value;
            dominant = pollutant;
        }
    }

    let sub_indices = raw
        .iter()
        .map(|&(pollutant, value)| (pollutant, value.round() as u16))
        .collect();

    let aqi = overall.round() as u16;
    AqiResult {
        aqi,
        category: Category::for_aqi(aqi),
        sub_indices,
        dominant,
    }
}
