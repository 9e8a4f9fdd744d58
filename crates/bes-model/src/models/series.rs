//! Sampled time series used by climate loads, schedules and external inputs.

use bes_core::{CoreError, CoreResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Linear,
    /// Value holds until the next sample.
    Step,
}

/// Values at strictly increasing time points (seconds).
///
/// Outside the sampled interval the first/last value is held, unless a `period` is set,
/// in which case time wraps (e.g. daily schedules with a period of 86400 s).
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeries {
    times: Vec<f64>,
    values: Vec<f64>,
    interpolation: Interpolation,
    period: Option<f64>,
}

impl TimeSeries {
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> CoreResult<Self> {
        if times.is_empty() || times.len() != values.len() {
            return Err(CoreError::InvalidArg {
                what: "time series needs equally many (at least one) times and values",
            });
        }
        if times.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(CoreError::InvalidArg {
                what: "time series times must be strictly increasing",
            });
        }
        for v in times.iter().chain(&values) {
            bes_core::ensure_finite(*v, "time series sample")?;
        }
        Ok(Self {
            times,
            values,
            interpolation: Interpolation::Linear,
            period: None,
        })
    }

    pub fn constant(value: f64) -> Self {
        Self {
            times: vec![0.0],
            values: vec![value],
            interpolation: Interpolation::Step,
            period: None,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_period(mut self, period: f64) -> CoreResult<Self> {
        let last = self.times.last().copied().unwrap_or(0.0);
        if !(period > last) {
            return Err(CoreError::InvalidArg {
                what: "series period must exceed the last sample time",
            });
        }
        self.period = Some(period);
        Ok(self)
    }

    /// Convert every value, e.g. from degrees Celsius to Kelvin.
    pub fn map_values(mut self, f: impl Fn(f64) -> f64) -> Self {
        for v in &mut self.values {
            *v = f(*v);
        }
        self
    }

    pub fn value_at(&self, t: f64) -> f64 {
        let t = match self.period {
            Some(p) => t.rem_euclid(p),
            None => t,
        };
        let n = self.times.len();
        // index of the first sample strictly after t
        let after = self.times.partition_point(|x| *x <= t);
        if after == 0 || after == n {
            return match self.period {
                // segment from the last sample to the first one of the next period
                Some(p) if n > 1 => {
                    let (t0, v0) = (self.times[n - 1], self.values[n - 1]);
                    let (t1, v1) = (p + self.times[0], self.values[0]);
                    let t = if after == 0 { t + p } else { t };
                    match self.interpolation {
                        Interpolation::Step => v0,
                        Interpolation::Linear => v0 + (v1 - v0) * (t - t0) / (t1 - t0),
                    }
                }
                _ if after == 0 => self.values[0],
                _ => self.values[n - 1],
            };
        }
        let (t0, v0) = (self.times[after - 1], self.values[after - 1]);
        match self.interpolation {
            Interpolation::Step => v0,
            Interpolation::Linear => {
                let (t1, v1) = (self.times[after], self.values[after]);
                v0 + (v1 - v0) * (t - t0) / (t1 - t0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_interpolation_and_clamping() {
        let s = TimeSeries::new(vec![0.0, 10.0], vec![1.0, 3.0]).unwrap();
        assert_eq!(s.value_at(5.0), 2.0);
        assert_eq!(s.value_at(-1.0), 1.0);
        assert_eq!(s.value_at(20.0), 3.0);
    }

    #[test]
    fn step_holds_previous_sample() {
        let s = TimeSeries::new(vec![0.0, 10.0], vec![1.0, 3.0])
            .unwrap()
            .with_interpolation(Interpolation::Step);
        assert_eq!(s.value_at(9.9), 1.0);
        assert_eq!(s.value_at(10.0), 3.0);
    }

    #[test]
    fn periodic_series_wraps() {
        let day = 86_400.0;
        let s = TimeSeries::new(vec![0.0, 43_200.0], vec![0.0, 10.0])
            .unwrap()
            .with_period(day)
            .unwrap();
        assert_eq!(s.value_at(day + 21_600.0), 5.0);
        // halfway between the last sample and the wrapped first one
        assert_eq!(s.value_at(64_800.0), 5.0);
    }

    #[test]
    fn periodic_series_wraps_before_first_sample() {
        let day = 86_400.0;
        let s = TimeSeries::new(vec![21_600.0, 64_800.0], vec![0.0, 10.0])
            .unwrap()
            .with_period(day)
            .unwrap();
        // midnight lies halfway between 18:00 and 06:00 of the next day
        assert_eq!(s.value_at(0.0), 5.0);
        assert_eq!(s.value_at(day), 5.0);
        assert_eq!(s.value_at(10_800.0), 2.5);
        assert_eq!(s.value_at(21_600.0), 0.0);

        let step = s.with_interpolation(Interpolation::Step);
        assert_eq!(step.value_at(0.0), 10.0);
        assert_eq!(step.value_at(21_600.0), 0.0);
    }

    #[test]
    fn rejects_unsorted_times() {
        assert!(TimeSeries::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(TimeSeries::new(vec![], vec![]).is_err());
    }
}
