//! Per-pollutant breakpoint tables.
//!
//! Each table has exactly six bands. Bands share edges (the concentration
//! max of band k is the concentration min of band k+1, same for the AQI
//! side), so the tables are gapless and an input landing exactly on an
//! edge interpolates to the edge AQI with zero error. The clamp logic in
//! the engine relies on this: below the first band floors to AQI 0, above
//! the last band ceilings to AQI 500.

/// One band: a concentration range mapped onto an AQI range.
#[derive(Debug, Clone, Copy)]
pub struct Breakpoint {
    pub conc_lo: f64,
    pub conc_hi: f64,
    pub aqi_lo: f64,
    pub aqi_hi: f64,
}

const fn bp(conc_lo: f64, conc_hi: f64, aqi_lo: f64, aqi_hi: f64) -> Breakpoint {
    Breakpoint {
        conc_lo,
        conc_hi,
        aqi_lo,
        aqi_hi,
    }
}

/// CO₂ bands, in ppm.
pub const CO2: [Breakpoint; 6] = [
    bp(0.0, 350.0, 0.0, 50.0),
    bp(350.0, 600.0, 50.0, 100.0),
    bp(600.0, 1000.0, 100.0, 200.0),
    bp(1000.0, 1800.0, 200.0, 300.0),
    bp(1800.0, 2800.0, 300.0, 400.0),
    bp(2800.0, 5000.0, 400.0, 500.0),
];

/// CO bands, in ppm.
pub const CO: [Breakpoint; 6] = [
    bp(0.0, 1.0, 0.0, 50.0),
    bp(1.0, 2.0, 50.0, 100.0),
    bp(2.0, 10.0, 100.0, 200.0),
    bp(10.0, 17.0, 200.0, 300.0),
    bp(17.0, 34.0, 300.0, 400.0),
    bp(34.0, 50.0, 400.0, 500.0),
];

/// NO₂ bands, in µg/m³.
pub const NO2: [Breakpoint; 6] = [
    bp(0.0, 40.0, 0.0, 50.0),
    bp(40.0, 80.0, 50.0, 100.0),
    bp(80.0, 180.0, 100.0, 200.0),
    bp(180.0, 280.0, 200.0, 300.0),
    bp(280.0, 400.0, 300.0, 400.0),
    bp(400.0, 1000.0, 400.0, 500.0),
];
