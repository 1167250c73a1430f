use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use weather_archive::{AvailableLayers, ExistRecords};

use crate::app::catalog::{Location, LocationCatalog};

/// Measurement fields the archive can export
pub const MEASUREMENT_FIELDS: [&str; 20] = [
    "temp_kelvin",
    "temp_celsius",
    "temp_fahrenheit",
    "feels_like_kelvin",
    "feels_like_celsius",
    "feels_like_fahrenheit",
    "temp_min_kelvin",
    "temp_min_celsius",
    "temp_min_fahrenheit",
    "temp_max_kelvin",
    "temp_max_celsius",
    "temp_max_fahrenheit",
    "pressure",
    "humidity",
    "visibility",
    "wind_speed",
    "wind_deg",
    "clouds",
    "sunrise_time",
    "sunset_time",
];

/// Data category to download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Unset,
    Images,
    Measurements,
    ImagesWithData,
}

impl Mode {
    /// Modes a user can pick, in display order
    pub const SELECTABLE: [Mode; 3] = [Mode::Measurements, Mode::Images, Mode::ImagesWithData];

    /// Human-readable name for this mode
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Unset => "Not selected",
            Mode::Images => "Weather images",
            Mode::Measurements => "Weather data",
            Mode::ImagesWithData => "Images with data",
        }
    }

    /// Whether the mode needs an image layer
    pub fn uses_layer(&self) -> bool {
        matches!(self, Mode::Images | Mode::ImagesWithData)
    }

    /// Whether the mode needs measurement fields
    pub fn uses_fields(&self) -> bool {
        matches!(self, Mode::Measurements | Mode::ImagesWithData)
    }
}

/// Which record kinds exist for the current location
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExistenceFlags {
    pub images_exist: bool,
    pub measurements_exist: bool,
    pub images_with_data_exist: bool,
}

impl From<ExistRecords> for ExistenceFlags {
    fn from(records: ExistRecords) -> Self {
        Self {
            images_exist: records.exist_weather_images,
            measurements_exist: records.exist_weather_data,
            images_with_data_exist: records.exist_weather_images_with_data,
        }
    }
}

impl ExistenceFlags {
    /// Whether `mode` can be selected
    pub fn allows(&self, mode: Mode) -> bool {
        match mode {
            Mode::Unset => false,
            Mode::Images => self.images_exist,
            Mode::Measurements => self.measurements_exist,
            Mode::ImagesWithData => self.images_with_data_exist,
        }
    }
}

/// Raw layer listing for a location; the visible subset depends on mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerCatalog {
    pub all_layers: Vec<String>,
    pub layers_with_measurements: Vec<String>,
}

impl From<AvailableLayers> for LayerCatalog {
    fn from(layers: AvailableLayers) -> Self {
        Self {
            all_layers: layers.layers,
            layers_with_measurements: layers.layers_with_data,
        }
    }
}

impl LayerCatalog {
    /// Layers offered under `mode`
    pub fn view(&self, mode: Mode) -> &[String] {
        match mode {
            Mode::Images => &self.all_layers,
            Mode::ImagesWithData => &self.layers_with_measurements,
            Mode::Measurements | Mode::Unset => &[],
        }
    }
}

/// Inclusive `[min, max]` range of selectable dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl DateBounds {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.min <= date && date <= self.max
    }
}

/// A single user mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetLocation(Location),
    SetMode(Mode),
    SetLayer(String),
    SetFields(Vec<String>),
    SetStartDate(NaiveDate),
    SetEndDate(NaiveDate),
}

/// Discovery results a transition is checked against
#[derive(Debug, Clone, Copy)]
pub struct Gates<'a> {
    pub catalog: &'a LocationCatalog,
    pub flags: &'a ExistenceFlags,
    pub layers: Option<&'a LayerCatalog>,
}

/// The chain location -> mode -> layer/fields -> date bounds -> dates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub location: Option<Location>,
    pub mode: Mode,
    pub layer: Option<String>,
    pub fields: Vec<String>,
    pub date_bounds: Option<DateBounds>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Selection {
    /// Compute the state after `action`.
    ///
    /// Everything downstream of the changed field is reset in the returned
    /// value. Re-setting a field to its current value returns an identical
    /// selection. A rejected action returns `Err` and `self` is untouched.
    pub fn transition(&self, action: Action, gates: &Gates) -> Result<Selection> {
        match action {
            Action::SetLocation(location) => {
                if !gates.catalog.contains(&location) {
                    bail!("{} '{}' is not available", location.kind(), location.name());
                }
                if self.location.as_ref() == Some(&location) {
                    return Ok(self.clone());
                }
                Ok(Selection {
                    location: Some(location),
                    ..Selection::default()
                })
            }

            Action::SetMode(mode) => {
                if self.location.is_none() {
                    bail!("select a location before choosing a mode");
                }
                if !gates.flags.allows(mode) {
                    bail!("mode '{}' is not available for this location", mode.label());
                }
                if self.mode == mode {
                    return Ok(self.clone());
                }
                Ok(Selection {
                    location: self.location.clone(),
                    mode,
                    ..Selection::default()
                })
            }

            Action::SetLayer(layer) => {
                let layer = layer.trim().to_string();
                if !self.mode.uses_layer() {
                    bail!("mode '{}' does not use layers", self.mode.label());
                }
                let view = gates.layers.map(|layers| layers.view(self.mode)).unwrap_or_default();
                if !view.iter().any(|candidate| candidate.trim() == layer) {
                    bail!("layer '{}' is not available", layer);
                }
                if self.layer.as_deref() == Some(layer.as_str()) {
                    return Ok(self.clone());
                }
                Ok(Selection {
                    layer: Some(layer),
                    ..self.without_dates()
                })
            }

            Action::SetFields(fields) => {
                if !self.mode.uses_fields() {
                    bail!("mode '{}' does not use measurement fields", self.mode.label());
                }
                let fields = dedup_fields(fields)?;
                if self.fields == fields {
                    return Ok(self.clone());
                }
                Ok(Selection {
                    fields,
                    ..self.without_dates()
                })
            }

            Action::SetStartDate(date) => {
                self.check_in_bounds(date)?;
                Ok(Selection {
                    start_date: Some(date),
                    ..self.clone()
                })
            }

            Action::SetEndDate(date) => {
                self.check_in_bounds(date)?;
                Ok(Selection {
                    end_date: Some(date),
                    ..self.clone()
                })
            }
        }
    }

    /// Replace date bounds with a fresh discovery result; concrete dates are cleared
    pub fn with_date_bounds(&self, bounds: DateBounds) -> Selection {
        Selection {
            date_bounds: Some(bounds),
            ..self.without_dates()
        }
    }

    /// Whether the layer/field prerequisites for a date bounds query are met
    pub fn date_bounds_ready(&self) -> bool {
        if self.location.is_none() {
            return false;
        }
        match self.mode {
            Mode::Unset => false,
            Mode::Images => self.layer.is_some(),
            Mode::Measurements => !self.fields.is_empty(),
            Mode::ImagesWithData => self.layer.is_some() && !self.fields.is_empty(),
        }
    }

    /// Check every download precondition
    pub fn download_ready(&self) -> Result<()> {
        if self.location.is_none() {
            bail!("no location selected");
        }
        if self.mode == Mode::Unset {
            bail!("no mode selected");
        }
        if self.mode.uses_layer() && self.layer.is_none() {
            bail!("no layer selected");
        }
        if self.mode.uses_fields() && self.fields.is_empty() {
            bail!("no measurement fields selected");
        }

        let bounds = self.date_bounds.ok_or_else(|| anyhow!("available dates are not known yet"))?;
        let start = self.start_date.ok_or_else(|| anyhow!("no start date selected"))?;
        let end = self.end_date.ok_or_else(|| anyhow!("no end date selected"))?;

        if !bounds.contains(start) || !bounds.contains(end) {
            bail!("dates must lie between {} and {}", bounds.min, bounds.max);
        }
        if start > end {
            bail!("start date {} is after end date {}", start, end);
        }
        Ok(())
    }

    pub fn is_download_enabled(&self) -> bool {
        self.download_ready().is_ok()
    }

    fn without_dates(&self) -> Selection {
        Selection {
            date_bounds: None,
            start_date: None,
            end_date: None,
            ..self.clone()
        }
    }

    fn check_in_bounds(&self, date: NaiveDate) -> Result<()> {
        match self.date_bounds {
            None => bail!("available dates are not known yet"),
            Some(bounds) if !bounds.contains(date) => {
                bail!("{} is outside {} .. {}", date, bounds.min, bounds.max)
            }
            Some(_) => Ok(()),
        }
    }
}

/// Validate against the field catalog, dropping repeats but keeping order
fn dedup_fields(fields: Vec<String>) -> Result<Vec<String>> {
    let mut unique: Vec<String> = Vec::with_capacity(fields.len());
    for field in fields {
        let field = field.trim().to_string();
        if !MEASUREMENT_FIELDS.contains(&field.as_str()) {
            bail!("unknown measurement field '{}'", field);
        }
        if !unique.contains(&field) {
            unique.push(field);
        }
    }
    Ok(unique)
}
