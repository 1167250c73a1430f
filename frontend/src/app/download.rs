use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use weather_archive::WeatherArchiveAPI;

use crate::app::dates::normalize;
use crate::app::selection::{Mode, Selection};

/// Fields every measurement export starts with
pub const FIELD_PREAMBLE: [&str; 4] = ["latitude", "longitude", "weather", "description"];

/// Separator `weather_data` expects between fields
pub const MEASUREMENT_SEPARATOR: &str = ", ";
/// Separator `weather_images_and_data` expects between fields
pub const IMAGES_WITH_DATA_SEPARATOR: &str = ",";

/// Join the preamble and the user's fields into the request token
pub fn field_token(fields: &[String], separator: &str) -> String {
    FIELD_PREAMBLE
        .iter()
        .map(|field| field.to_string())
        .chain(fields.iter().cloned())
        .collect::<Vec<_>>()
        .join(separator)
}

/// A finalized download, one shape per mode
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadRequest {
    Images {
        location: String,
        layer: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    Measurements {
        location: String,
        fields: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    ImagesWithData {
        location: String,
        layer: String,
        fields: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl DownloadRequest {
    /// Build the request for a complete selection; the date range is normalized
    pub fn from_selection(selection: &Selection) -> Result<Self> {
        selection.download_ready()?;

        let location = selection
            .location
            .as_ref()
            .map(|location| location.name().trim().to_string())
            .ok_or_else(|| anyhow!("no location selected"))?;
        let (start, end) = match (selection.start_date, selection.end_date) {
            (Some(start), Some(end)) => normalize(start, end),
            _ => return Err(anyhow!("date range incomplete")),
        };
        let layer = || selection.layer.clone().ok_or_else(|| anyhow!("no layer selected"));

        match selection.mode {
            Mode::Images => Ok(DownloadRequest::Images {
                location,
                layer: layer()?,
                start,
                end,
            }),
            Mode::Measurements => Ok(DownloadRequest::Measurements {
                location,
                fields: field_token(&selection.fields, MEASUREMENT_SEPARATOR),
                start,
                end,
            }),
            Mode::ImagesWithData => Ok(DownloadRequest::ImagesWithData {
                location,
                layer: layer()?,
                fields: field_token(&selection.fields, IMAGES_WITH_DATA_SEPARATOR),
                start,
                end,
            }),
            Mode::Unset => Err(anyhow!("no mode selected")),
        }
    }

    /// Archive kind, used in the file name
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadRequest::Images { .. } => "weather_images",
            DownloadRequest::Measurements { .. } => "weather_data",
            DownloadRequest::ImagesWithData { .. } => "weather_images_and_data",
        }
    }

    pub fn location(&self) -> &str {
        match self {
            DownloadRequest::Images { location, .. }
            | DownloadRequest::Measurements { location, .. }
            | DownloadRequest::ImagesWithData { location, .. } => location,
        }
    }

    /// Range sent to the archive
    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        match self {
            DownloadRequest::Images { start, end, .. }
            | DownloadRequest::Measurements { start, end, .. }
            | DownloadRequest::ImagesWithData { start, end, .. } => (*start, *end),
        }
    }

    pub fn filename(&self) -> String {
        format!("{}_{}.zip", self.kind(), self.location())
    }

    /// Issue the request and return the zip payload
    pub async fn fetch(&self, api: &WeatherArchiveAPI) -> Result<Vec<u8>> {
        match self {
            DownloadRequest::Images { location, layer, start, end } => {
                api.fetch_weather_images(location, layer, *start, *end).await
            }
            DownloadRequest::Measurements { location, fields, start, end } => {
                api.fetch_weather_data(location, fields, *start, *end).await
            }
            DownloadRequest::ImagesWithData { location, layer, fields, start, end } => {
                api.fetch_weather_images_and_data(location, layer, fields, *start, *end).await
            }
        }
    }
}

/// "Save as file" collaborator for downloaded payloads
#[allow(async_fn_in_trait)]
pub trait FileSink {
    async fn save(&self, filename: &str, data: &[u8]) -> Result<PathBuf>;
}

/// Saves payloads into a directory, creating it on first use
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl FileSink for DirectorySink {
    async fn save(&self, filename: &str, data: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        // Location names come from the archive; keep them from escaping the directory
        let path = self.dir.join(filename.replace(['/', '\\'], "_"));
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }
}

/// Fetch a download and hand it to the sink. Failures are logged and absorbed.
pub async fn dispatch<S: FileSink>(api: &WeatherArchiveAPI, request: &DownloadRequest, sink: &S) -> Option<PathBuf> {
    let payload = match request.fetch(api).await {
        Ok(payload) => payload,
        Err(e) => {
            error!("Error fetching {}: {}", request.kind(), e);
            return None;
        }
    };

    match sink.save(&request.filename(), &payload).await {
        Ok(path) => {
            info!("Saved {} bytes to {}", payload.len(), path.display());
            Some(path)
        }
        Err(e) => {
            error!("Failed to save {}: {}", request.filename(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::catalog::Location;
    use crate::app::selection::DateBounds;
    use std::cell::RefCell;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn selection(mode: Mode) -> Selection {
        Selection {
            location: Some(Location::City("Zilina".into())),
            mode,
            layer: mode.uses_layer().then(|| "clouds_new".to_string()),
            fields: if mode.uses_fields() { vec!["humidity".to_string()] } else { vec![] },
            date_bounds: Some(DateBounds { min: d(2023, 1, 1), max: d(2023, 1, 31) }),
            start_date: Some(d(2023, 1, 1)),
            end_date: Some(d(2023, 1, 10)),
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        saved: RefCell<Vec<String>>,
    }

    impl FileSink for RecordingSink {
        async fn save(&self, filename: &str, _data: &[u8]) -> Result<PathBuf> {
            self.saved.borrow_mut().push(filename.to_string());
            Ok(PathBuf::from(filename))
        }
    }

    #[test]
    fn test_field_token() {
        let fields = ["humidity".to_string()];
        assert_eq!(
            field_token(&fields, MEASUREMENT_SEPARATOR),
            "latitude, longitude, weather, description, humidity"
        );
        assert_eq!(
            field_token(&fields, IMAGES_WITH_DATA_SEPARATOR),
            "latitude,longitude,weather,description,humidity"
        );
        assert_eq!(field_token(&[], MEASUREMENT_SEPARATOR), "latitude, longitude, weather, description");
    }

    #[test]
    fn test_request_per_mode() {
        assert_eq!(
            DownloadRequest::from_selection(&selection(Mode::Images)).unwrap(),
            DownloadRequest::Images {
                location: "Zilina".into(),
                layer: "clouds_new".into(),
                start: d(2023, 1, 1),
                end: d(2023, 1, 10),
            }
        );
        assert_eq!(
            DownloadRequest::from_selection(&selection(Mode::Measurements)).unwrap(),
            DownloadRequest::Measurements {
                location: "Zilina".into(),
                fields: "latitude, longitude, weather, description, humidity".into(),
                start: d(2023, 1, 1),
                end: d(2023, 1, 10),
            }
        );
        assert_eq!(
            DownloadRequest::from_selection(&selection(Mode::ImagesWithData)).unwrap(),
            DownloadRequest::ImagesWithData {
                location: "Zilina".into(),
                layer: "clouds_new".into(),
                fields: "latitude,longitude,weather,description,humidity".into(),
                start: d(2023, 1, 1),
                end: d(2023, 1, 10),
            }
        );
    }

    #[test]
    fn test_single_day_is_normalized() {
        let single = Selection {
            start_date: Some(d(2023, 1, 5)),
            end_date: Some(d(2023, 1, 5)),
            ..selection(Mode::Images)
        };
        let request = DownloadRequest::from_selection(&single).unwrap();
        assert_eq!(request.range(), (d(2023, 1, 4), d(2023, 1, 6)));
    }

    #[test]
    fn test_incomplete_selection_rejected() {
        assert!(DownloadRequest::from_selection(&Selection::default()).is_err());
        assert!(DownloadRequest::from_selection(&Selection { end_date: None, ..selection(Mode::Images) }).is_err());
        assert!(DownloadRequest::from_selection(&Selection { fields: vec![], ..selection(Mode::Measurements) }).is_err());
        assert!(DownloadRequest::from_selection(&Selection { layer: None, ..selection(Mode::ImagesWithData) }).is_err());
    }

    #[test]
    fn test_filenames() {
        let images = DownloadRequest::from_selection(&selection(Mode::Images)).unwrap();
        assert_eq!(images.filename(), "weather_images_Zilina.zip");
        let data = DownloadRequest::from_selection(&selection(Mode::Measurements)).unwrap();
        assert_eq!(data.filename(), "weather_data_Zilina.zip");
        let both = DownloadRequest::from_selection(&selection(Mode::ImagesWithData)).unwrap();
        assert_eq!(both.filename(), "weather_images_and_data_Zilina.zip");
    }

    #[tokio::test]
    async fn test_directory_sink_writes_payload() {
        let dir = std::env::temp_dir().join(format!("archive-frontend-sink-{}", std::process::id()));
        let sink = DirectorySink::new(&dir);

        let path = sink.save("weather_data_Zilina.zip", b"PK\x03\x04").await.unwrap();
        assert_eq!(path, dir.join("weather_data_Zilina.zip"));
        assert_eq!(std::fs::read(&path).unwrap(), b"PK\x03\x04");

        let escaped = sink.save("weather_data_a/b.zip", b"x").await.unwrap();
        assert_eq!(escaped, dir.join("weather_data_a_b.zip"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_failed_download_is_absorbed() {
        let api = WeatherArchiveAPI::new("http://127.0.0.1:9").unwrap();
        let sink = RecordingSink::default();
        let request = DownloadRequest::from_selection(&selection(Mode::Images)).unwrap();

        assert_eq!(dispatch(&api, &request, &sink).await, None);
        assert!(sink.saved.borrow().is_empty());
    }
}
