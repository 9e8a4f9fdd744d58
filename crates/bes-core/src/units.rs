// bes-core/src/units.rs
//
// Values in the arena are always stored in base SI units; these helpers convert the
// display units used in project files.

use uom::si::f64::{
    ThermodynamicTemperature as UomThermodynamicTemperature, Time as UomTime,
    Volume as UomVolume,
};

pub type Temperature = UomThermodynamicTemperature;
pub type Time = UomTime;
pub type Volume = UomVolume;

#[inline]
pub fn degc(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::degree_celsius;
    Temperature::new::<degree_celsius>(v)
}

#[inline]
pub fn to_kelvin(t: Temperature) -> f64 {
    use uom::si::thermodynamic_temperature::kelvin;
    t.get::<kelvin>()
}

/// Converts a rate given in 1/h (air change rates) to 1/s.
#[inline]
pub fn per_hour_to_per_second(v: f64) -> f64 {
    v / to_seconds(hours(1.0))
}

#[inline]
pub fn hours(v: f64) -> Time {
    use uom::si::time::hour;
    Time::new::<hour>(v)
}

#[inline]
pub fn to_seconds(t: Time) -> f64 {
    use uom::si::time::second;
    t.get::<second>()
}

#[inline]
pub fn m3(v: f64) -> Volume {
    use uom::si::volume::cubic_meter;
    Volume::new::<cubic_meter>(v)
}

#[inline]
pub fn to_m3(v: Volume) -> f64 {
    use uom::si::volume::cubic_meter;
    v.get::<cubic_meter>()
}

pub mod constants {
    /// Density of air [kg/m3].
    pub const RHO_AIR: f64 = 1.205;
    /// Specific heat capacity of air [J/kgK].
    pub const C_AIR: f64 = 1006.0;
}
