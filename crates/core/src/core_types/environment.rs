//! Environmental forcing: wind, current/tide and ambient weather
//!
//! Weather (wind, temperature, humidity, pressure) and currents (speed,
//! direction, water level) arrive from independent upstream sources, so they
//! are carried as two separate time series. The engine asks the
//! [`EnvironmentalSeries`] for one merged [`EnvironmentalSample`] per time step.
//!
//! # Conventions
//!
//! - Wind direction is meteorological: the compass direction the wind blows *from*.
//! - Current direction is oceanographic: the direction the water flows *toward*.
//! - Sample times are offsets in seconds from the spill time.

use crate::core_types::units::{Celsius, Degrees, MetersPerSecond};
use crate::core_types::vec2::Vec2;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Standard sea-level pressure (Pa)
pub const STANDARD_PRESSURE_PA: f64 = 101_325.0;

/// A single weather reading or forecast point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    /// Seconds since the spill
    pub offset_seconds: f64,
    /// Wind speed at 10 m (m/s)
    pub wind_speed: MetersPerSecond,
    /// Direction the wind blows from
    pub wind_direction: Degrees,
    /// Air temperature
    pub temperature: Celsius,
    /// Relative humidity (%), carried through but unused by the physics
    pub humidity: Option<f64>,
    /// Surface pressure (Pa), carried through but unused by the physics
    pub pressure: Option<f64>,
}

impl WeatherSample {
    fn is_finite(&self) -> bool {
        self.offset_seconds.is_finite()
            && self.wind_speed.is_finite()
            && self.wind_direction.is_finite()
            && self.temperature.is_finite()
            && self.humidity.is_none_or(f64::is_finite)
            && self.pressure.is_none_or(f64::is_finite)
    }
}

/// A single current/tide reading or prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentSample {
    /// Seconds since the spill
    pub offset_seconds: f64,
    /// Surface current speed (m/s)
    pub current_speed: MetersPerSecond,
    /// Direction the current flows toward
    pub current_direction: Degrees,
    /// Water level relative to datum (m)
    pub water_level: Option<f64>,
}

impl CurrentSample {
    fn is_finite(&self) -> bool {
        self.offset_seconds.is_finite()
            && self.current_speed.is_finite()
            && self.current_direction.is_finite()
            && self.water_level.is_none_or(f64::is_finite)
    }
}

/// Environmental conditions at one instant: everything the transport physics reads
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalSample {
    /// Seconds since the spill
    pub offset_seconds: f64,
    /// Wind speed at 10 m (m/s)
    pub wind_speed: MetersPerSecond,
    /// Direction the wind blows from
    pub wind_direction: Degrees,
    /// Surface current speed (m/s)
    pub current_speed: MetersPerSecond,
    /// Direction the current flows toward
    pub current_direction: Degrees,
    /// Air temperature
    pub temperature: Celsius,
    /// Relative humidity (%)
    pub humidity: Option<f64>,
    /// Surface pressure (Pa)
    pub pressure: Option<f64>,
    /// Water level relative to datum (m)
    pub water_level: Option<f64>,
}

impl Default for EnvironmentalSample {
    fn default() -> Self {
        Self::default_conditions()
    }
}

impl EnvironmentalSample {
    /// Conditions substituted when upstream weather and current data are missing
    ///
    /// 15 °C, 4 m/s westerly wind, standard pressure, 0.5 m/s current toward the south.
    pub fn default_conditions() -> Self {
        EnvironmentalSample {
            offset_seconds: 0.0,
            wind_speed: MetersPerSecond::new(4.0),
            wind_direction: Degrees::new(270.0),
            current_speed: MetersPerSecond::new(0.5),
            current_direction: Degrees::new(180.0),
            temperature: Celsius::new(15.0),
            humidity: Some(70.0),
            pressure: Some(STANDARD_PRESSURE_PA),
            water_level: Some(0.0),
        }
    }

    /// Still air and still water at the given temperature
    pub fn calm(temperature: Celsius) -> Self {
        EnvironmentalSample {
            wind_speed: MetersPerSecond::new(0.0),
            current_speed: MetersPerSecond::new(0.0),
            temperature,
            ..Self::default_conditions()
        }
    }

    /// Copy of `self` with the weather fields replaced by `weather`
    pub fn with_weather(mut self, weather: &WeatherSample) -> Self {
        self.wind_speed = weather.wind_speed;
        self.wind_direction = weather.wind_direction;
        self.temperature = weather.temperature;
        self.humidity = weather.humidity;
        self.pressure = weather.pressure;
        self
    }

    /// Copy of `self` with the current fields replaced by `current`
    pub fn with_current(mut self, current: &CurrentSample) -> Self {
        self.current_speed = current.current_speed;
        self.current_direction = current.current_direction;
        self.water_level = current.water_level;
        self
    }

    /// Unit vector pointing where the wind blows toward (opposite the "from" direction)
    pub fn wind_heading(&self) -> Vec2 {
        let rad = self.wind_direction.to_radians();
        Vec2::new(-rad.sin(), -rad.cos())
    }

    /// Full wind vector (m/s), pointing downwind
    pub fn wind_vector(&self) -> Vec2 {
        self.wind_heading() * *self.wind_speed
    }

    /// Ambient current vector (m/s)
    pub fn current_vector(&self) -> Vec2 {
        let rad = self.current_direction.to_radians();
        Vec2::new(rad.sin(), rad.cos()) * *self.current_speed
    }

    /// Combined surface transport velocity (m/s)
    ///
    /// Wind-driven surface drift (`drift_factor` × wind speed, downwind) plus the
    /// ambient current.
    pub fn transport_velocity(&self, drift_factor: f64) -> Vec2 {
        self.wind_vector() * drift_factor + self.current_vector()
    }
}

/// Time series of weather and current samples for one spill
///
/// Both sequences are kept sorted by time. Either may be empty when its
/// upstream source failed; [`EnvironmentalSeries::sample_at`] then falls back to
/// the supplied defaults for the missing half.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalSeries {
    weather: Vec<WeatherSample>,
    currents: Vec<CurrentSample>,
}

impl EnvironmentalSeries {
    /// Build a series, discarding samples with non-finite values and sorting by time
    pub fn new(weather: Vec<WeatherSample>, currents: Vec<CurrentSample>) -> Self {
        let weather_in = weather.len();
        let currents_in = currents.len();

        let mut weather: Vec<_> = weather.into_iter().filter(WeatherSample::is_finite).collect();
        let mut currents: Vec<_> = currents.into_iter().filter(CurrentSample::is_finite).collect();

        let dropped = (weather_in - weather.len()) + (currents_in - currents.len());
        if dropped > 0 {
            warn!("Discarded {} environmental samples with non-finite values", dropped);
        }

        weather.sort_by(|a, b| a.offset_seconds.total_cmp(&b.offset_seconds));
        currents.sort_by(|a, b| a.offset_seconds.total_cmp(&b.offset_seconds));

        Self { weather, currents }
    }

    /// A series with no data at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// A single-instant series holding both halves of `sample`
    pub fn constant(sample: &EnvironmentalSample) -> Self {
        Self::new(
            vec![WeatherSample {
                offset_seconds: 0.0,
                wind_speed: sample.wind_speed,
                wind_direction: sample.wind_direction,
                temperature: sample.temperature,
                humidity: sample.humidity,
                pressure: sample.pressure,
            }],
            vec![CurrentSample {
                offset_seconds: 0.0,
                current_speed: sample.current_speed,
                current_direction: sample.current_direction,
                water_level: sample.water_level,
            }],
        )
    }

    /// Weather samples, sorted by time
    pub fn weather(&self) -> &[WeatherSample] {
        &self.weather
    }

    /// Current samples, sorted by time
    pub fn currents(&self) -> &[CurrentSample] {
        &self.currents
    }

    /// Whether any weather data is present
    pub fn has_weather(&self) -> bool {
        !self.weather.is_empty()
    }

    /// Whether any current data is present
    pub fn has_currents(&self) -> bool {
        !self.currents.is_empty()
    }

    /// Water level of the earliest current sample, if any
    pub fn first_water_level(&self) -> Option<f64> {
        self.currents.first().and_then(|c| c.water_level)
    }

    /// Conditions at `offset_seconds`, linearly interpolated
    ///
    /// Outside the span of a sequence the nearest end sample is used. Directions
    /// interpolate along the shortest arc. A missing sequence takes its fields
    /// from `defaults`.
    pub fn sample_at(
        &self,
        offset_seconds: f64,
        defaults: &EnvironmentalSample,
    ) -> EnvironmentalSample {
        let mut sample = EnvironmentalSample {
            offset_seconds,
            ..*defaults
        };

        if let Some((a, b, t)) = bracket(&self.weather, offset_seconds, |w| w.offset_seconds) {
            sample = sample.with_weather(&WeatherSample {
                offset_seconds,
                wind_speed: MetersPerSecond::new(lerp(*a.wind_speed, *b.wind_speed, t)),
                wind_direction: a.wind_direction.lerp_shortest(b.wind_direction, t),
                temperature: Celsius::new(lerp(*a.temperature, *b.temperature, t)),
                humidity: lerp_option(a.humidity, b.humidity, t),
                pressure: lerp_option(a.pressure, b.pressure, t),
            });
        }

        if let Some((a, b, t)) = bracket(&self.currents, offset_seconds, |c| c.offset_seconds) {
            sample = sample.with_current(&CurrentSample {
                offset_seconds,
                current_speed: MetersPerSecond::new(lerp(*a.current_speed, *b.current_speed, t)),
                current_direction: a.current_direction.lerp_shortest(b.current_direction, t),
                water_level: lerp_option(a.water_level, b.water_level, t),
            });
        }

        sample
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_option(a: Option<f64>, b: Option<f64>, t: f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(lerp(a, b, t)),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

/// Find the pair of samples around `time` and the interpolation weight between them
///
/// Clamps to the first/last sample outside the covered span.
fn bracket<T>(samples: &[T], time: f64, offset: impl Fn(&T) -> f64) -> Option<(&T, &T, f64)> {
    let first = samples.first()?;
    let last = samples.last()?;

    if time <= offset(first) {
        return Some((first, first, 0.0));
    }
    if time >= offset(last) {
        return Some((last, last, 0.0));
    }

    // First sample strictly after `time`; guaranteed to exist and be > 0 here
    let upper = samples.partition_point(|s| offset(s) <= time);
    let a = &samples[upper - 1];
    let b = &samples[upper];
    let span = offset(b) - offset(a);
    let t = if span > 0.0 {
        (time - offset(a)) / span
    } else {
        0.0
    };
    Some((a, b, t))
}
