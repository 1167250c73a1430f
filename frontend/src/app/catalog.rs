use weather_archive::{AvailableLocations, WeatherArchiveAPI};

/// A selectable location: an area or a city, never both
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Area(String),
    City(String),
}

impl Location {
    pub fn name(&self) -> &str {
        match self {
            Location::Area(name) | Location::City(name) => name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Location::Area(_) => "area",
            Location::City(_) => "city",
        }
    }
}

/// Areas and cities offered for selection, loaded once at startup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationCatalog {
    pub areas: Vec<String>,
    pub cities: Vec<String>,
}

impl From<AvailableLocations> for LocationCatalog {
    fn from(locations: AvailableLocations) -> Self {
        Self {
            areas: locations.areas,
            cities: locations.cities,
        }
    }
}

impl LocationCatalog {
    /// Whether the location belongs to its own pool
    pub fn contains(&self, location: &Location) -> bool {
        let pool = match location {
            Location::Area(_) => &self.areas,
            Location::City(_) => &self.cities,
        };
        pool.iter().any(|entry| entry.trim() == location.name().trim())
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty() && self.cities.is_empty()
    }
}

/// Fetch the location catalog. A failed load leaves both pools empty.
pub async fn load_location_catalog(api: &WeatherArchiveAPI) -> LocationCatalog {
    match api.fetch_available_locations().await {
        Ok(locations) => {
            info!("Loaded {} areas and {} cities", locations.areas.len(), locations.cities.len());
            locations.into()
        }
        Err(e) => {
            error!("Error fetching locations: {}", e);
            LocationCatalog::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> LocationCatalog {
        LocationCatalog {
            areas: vec!["Slovakia".to_string()],
            cities: vec!["Zilina".to_string(), "Kosice ".to_string()],
        }
    }

    #[test]
    fn test_pools_are_separate() {
        let catalog = catalog();
        assert!(catalog.contains(&Location::Area("Slovakia".into())));
        assert!(catalog.contains(&Location::City("Zilina".into())));
        assert!(!catalog.contains(&Location::City("Slovakia".into())));
        assert!(!catalog.contains(&Location::Area("Zilina".into())));
    }

    #[test]
    fn test_names_compare_trimmed() {
        assert!(catalog().contains(&Location::City("Kosice".into())));
    }

    #[test]
    fn test_location_accessors() {
        let city = Location::City("Zilina".into());
        assert_eq!(city.name(), "Zilina");
        assert_eq!(city.kind(), "city");
        assert_eq!(Location::Area("Slovakia".into()).kind(), "area");
    }

    #[tokio::test]
    async fn test_failed_load_yields_empty_catalog() {
        // Nothing listens on port 9 locally
        let api = WeatherArchiveAPI::new("http://127.0.0.1:9").unwrap();
        let catalog = load_location_catalog(&api).await;
        assert!(catalog.is_empty());
    }
}
