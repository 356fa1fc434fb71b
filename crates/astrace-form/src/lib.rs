//! Birth details collected before minting a natal chart.
//!
//! Field parsing mirrors the form inputs (`MM / DD / YY`, `HH : MM`,
//! `LAT,LON`). A complete form yields a `ChartRequest`, the two query
//! parameters the chart renderer takes.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("invalid date {0:?}; expected MM/DD/YYYY")]
    Date(String),
    #[error("invalid time {0:?}; expected HH:MM")]
    Time(String),
    #[error("invalid location {0:?}; expected LAT,LON")]
    Location(String),
    #[error("latitude {0} is outside -90..=90")]
    Latitude(f64),
    #[error("longitude {0} is outside -180..=180")]
    Longitude(f64),
    #[error("{0} is required")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, FormError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(FormError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(FormError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl FromStr for Coordinates {
    type Err = FormError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || FormError::Location(raw.to_owned());
        let (lat, lon) = raw.split_once(',').ok_or_else(invalid)?;
        let latitude: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let longitude: f64 = lon.trim().parse().map_err(|_| invalid())?;
        Self::new(latitude, longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirthPlace {
    pub description: String,
    pub coordinates: Option<Coordinates>,
}

/// Accepts `MM/DD/YYYY`, `MM/DD/YY` (spaces around separators allowed) and
/// ISO `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Result<NaiveDate, FormError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let format = match compact.rsplit_once('/') {
        Some((_, year)) if year.len() == 2 => "%m/%d/%y",
        Some(_) => "%m/%d/%Y",
        None => "%Y-%m-%d",
    };
    NaiveDate::parse_from_str(&compact, format).map_err(|_| FormError::Date(raw.to_owned()))
}

/// Accepts 24-hour `HH:MM` or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Result<NaiveTime, FormError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    NaiveTime::parse_from_str(&compact, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&compact, "%H:%M:%S"))
        .map_err(|_| FormError::Time(raw.to_owned()))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BirthForm {
    place: Option<BirthPlace>,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
}

impl BirthForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank description clears the field. Coordinates are optional until
    /// a chart request is built.
    pub fn set_place(
        &mut self,
        description: &str,
        coordinates: Option<&str>,
    ) -> Result<(), FormError> {
        let description = description.trim();
        if description.is_empty() {
            self.place = None;
            return Ok(());
        }
        let coordinates = match coordinates.map(str::trim).filter(|c| !c.is_empty()) {
            Some(raw) => match raw.parse() {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    self.place = None;
                    return Err(err);
                }
            },
            None => None,
        };
        self.place = Some(BirthPlace {
            description: description.to_owned(),
            coordinates,
        });
        Ok(())
    }

    /// Blank input clears the field; so does invalid input, which also
    /// returns the error.
    pub fn set_date(&mut self, raw: &str) -> Result<(), FormError> {
        self.date = None;
        if raw.trim().is_empty() {
            return Ok(());
        }
        self.date = Some(parse_date(raw)?);
        Ok(())
    }

    pub fn set_time(&mut self, raw: &str) -> Result<(), FormError> {
        self.time = None;
        if raw.trim().is_empty() {
            return Ok(());
        }
        self.time = Some(parse_time(raw)?);
        Ok(())
    }

    pub fn place(&self) -> Option<&BirthPlace> {
        self.place.as_ref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    pub fn is_complete(&self) -> bool {
        self.place.is_some() && self.date.is_some() && self.time.is_some()
    }

    pub fn details(&self) -> Result<BirthDetails, FormError> {
        let place = self.place.clone().ok_or(FormError::Missing("place of birth"))?;
        let date = self.date.ok_or(FormError::Missing("date of birth"))?;
        let time = self.time.ok_or(FormError::Missing("time of birth"))?;
        Ok(BirthDetails {
            place,
            local: date.and_time(time),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BirthDetails {
    pub place: BirthPlace,
    /// Wall-clock time at the birth place.
    pub local: NaiveDateTime,
}

impl BirthDetails {
    pub fn chart_request(&self) -> Result<ChartRequest, FormError> {
        let coordinates = self
            .place
            .coordinates
            .ok_or(FormError::Missing("birth place coordinates"))?;
        Ok(ChartRequest {
            local_time: self.local.format("%Y-%m-%dT%H:%M:%S").to_string(),
            location: coordinates.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub local_time: String,
    pub location: String,
}

impl ChartRequest {
    /// Both values only contain digits, `-`, `.`, `:`, `,` and `T`, all
    /// legal in a query component.
    pub fn query_string(&self) -> String {
        format!("local_time={}&location={}", self.local_time, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_form_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(1990, 4, 12).unwrap();
        assert_eq!(parse_date("04/12/1990").unwrap(), expected);
        assert_eq!(parse_date("04 / 12 / 90").unwrap(), expected);
        assert_eq!(parse_date("1990-04-12").unwrap(), expected);
        assert_eq!(
            parse_date("02/30/1990").unwrap_err(),
            FormError::Date("02/30/1990".to_owned())
        );
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn parses_times() {
        assert_eq!(parse_time("08 : 30").unwrap(), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(parse_time("23:59:59").unwrap(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
        assert!(parse_time("24:00").is_err());
        assert!(parse_time("8pm").is_err());
    }

    #[test]
    fn coordinates_are_range_checked() {
        let nyc: Coordinates = "40.7128, -74.0060".parse().unwrap();
        assert_eq!(nyc.latitude, 40.7128);
        assert_eq!(nyc.longitude, -74.006);
        assert_eq!("91,0".parse::<Coordinates>().unwrap_err(), FormError::Latitude(91.0));
        assert_eq!("0,-181".parse::<Coordinates>().unwrap_err(), FormError::Longitude(-181.0));
        assert!(matches!("40.7".parse::<Coordinates>(), Err(FormError::Location(_))));
    }

    #[test]
    fn completeness_needs_all_three_fields() {
        let mut form = BirthForm::new();
        assert!(!form.is_complete());

        form.set_place("New York, NY, USA", None).unwrap();
        form.set_date("04/12/1990").unwrap();
        assert!(!form.is_complete());

        form.set_time("08:30").unwrap();
        assert!(form.is_complete());

        form.set_time("").unwrap();
        assert!(!form.is_complete());
    }

    #[test]
    fn invalid_input_clears_the_field() {
        let mut form = BirthForm::new();
        form.set_date("04/12/1990").unwrap();
        assert!(form.set_date("13/45/1990").is_err());
        assert_eq!(form.date(), None);

        form.set_place("Somewhere", Some("1,2")).unwrap();
        assert!(form.set_place("Somewhere", Some("north")).is_err());
        assert_eq!(form.place(), None);
    }

    #[test]
    fn complete_form_builds_chart_request() {
        let mut form = BirthForm::new();
        form.set_place("New York, NY, USA", Some("40.7128,-74.006")).unwrap();
        form.set_date("04/12/1990").unwrap();
        form.set_time("08:30").unwrap();

        let request = form.details().unwrap().chart_request().unwrap();
        assert_eq!(request.local_time, "1990-04-12T08:30:00");
        assert_eq!(request.location, "40.7128,-74.006");
        assert_eq!(
            request.query_string(),
            "local_time=1990-04-12T08:30:00&location=40.7128,-74.006"
        );
    }

    #[test]
    fn chart_request_needs_coordinates() {
        let mut form = BirthForm::new();
        form.set_place("Paris", None).unwrap();
        form.set_date("1990-04-12").unwrap();
        form.set_time("08:30").unwrap();

        let err = form.details().unwrap().chart_request().unwrap_err();
        assert_eq!(err, FormError::Missing("birth place coordinates"));
        assert_eq!(BirthForm::new().details().unwrap_err(), FormError::Missing("place of birth"));
    }
}
