use anyhow::{anyhow, bail, Result};
use weather_archive::{parse_server_date, AvailableDates, WeatherArchiveAPI};

use crate::app::catalog::Location;
use crate::app::selection::{DateBounds, ExistenceFlags, LayerCatalog, Mode, Selection};

/// Layer token sent to `available_dates` when the selection has no layer.
///
/// The endpoint rejects an empty layer segment even for measurement-only
/// requests, which ignore the layer. Only query construction uses this value;
/// it never enters `Selection`.
///
/// Images modes never send it. Their queries wait for a chosen layer (see
/// [`Selection::date_bounds_ready`]), so in practice only measurements
/// queries carry the placeholder.
pub const PLACEHOLDER_LAYER: &str = "randomLayer";

/// Selection snapshot a date bounds query was issued for
#[derive(Debug, Clone, PartialEq)]
pub struct DateBoundsQuery {
    pub location: Location,
    pub mode: Mode,
    pub layer: Option<String>,
    pub fields: Vec<String>,
}

impl DateBoundsQuery {
    /// Build a query if the selection meets the prerequisites of its mode
    pub fn from_selection(selection: &Selection) -> Option<Self> {
        if !selection.date_bounds_ready() {
            return None;
        }
        Some(Self {
            location: selection.location.clone()?,
            mode: selection.mode,
            layer: selection.layer.clone(),
            fields: selection.fields.clone(),
        })
    }

    /// Layer segment for the request path
    pub fn layer_token(&self) -> &str {
        match self.layer.as_deref() {
            Some(layer) if !layer.trim().is_empty() => layer,
            _ => PLACEHOLDER_LAYER,
        }
    }

    /// Whether the selection still matches this snapshot
    pub fn matches(&self, selection: &Selection) -> bool {
        selection.location.as_ref() == Some(&self.location)
            && selection.mode == self.mode
            && selection.layer == self.layer
            && selection.fields == self.fields
    }
}

/// A read-only archive query, tagged with what it was issued for
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryQuery {
    ExistenceFlags { location: Location },
    Layers { location: Location },
    DateBounds(DateBoundsQuery),
}

/// Result of a finished query, still tagged with its snapshot
#[derive(Debug)]
pub enum DiscoveryOutcome {
    ExistenceFlags { location: Location, result: Result<ExistenceFlags> },
    Layers { location: Location, result: Result<LayerCatalog> },
    DateBounds { query: DateBoundsQuery, result: Result<DateBounds> },
}

impl DiscoveryQuery {
    pub fn describe(&self) -> String {
        match self {
            DiscoveryQuery::ExistenceFlags { location } => format!("existence flags for {}", location.name()),
            DiscoveryQuery::Layers { location } => format!("layers for {}", location.name()),
            DiscoveryQuery::DateBounds(query) => format!(
                "date bounds for {} / {} ({})",
                query.location.name(),
                query.layer_token(),
                query.mode.label()
            ),
        }
    }
}

/// Queries to issue after the selection moved from `previous` to `next`
pub fn queries_for(previous: &Selection, next: &Selection) -> Vec<DiscoveryQuery> {
    let mut queries = Vec::new();

    if next.location != previous.location {
        if let Some(location) = &next.location {
            queries.push(DiscoveryQuery::ExistenceFlags { location: location.clone() });
            queries.push(DiscoveryQuery::Layers { location: location.clone() });
        }
        return queries;
    }

    if let Some(location) = &next.location {
        if next.mode != previous.mode && next.mode.uses_layer() {
            queries.push(DiscoveryQuery::Layers { location: location.clone() });
        }
    }

    if next.layer != previous.layer || next.fields != previous.fields {
        if let Some(query) = DateBoundsQuery::from_selection(next) {
            queries.push(DiscoveryQuery::DateBounds(query));
        }
    }

    queries
}

/// Pick the date list matching `mode` and reduce it to `[first, last]`.
///
/// The archive returns dates in ascending order, so no sorting happens here.
pub fn bounds_for_mode(dates: &AvailableDates, mode: Mode) -> Result<DateBounds> {
    let list = match mode {
        Mode::Images => &dates.range_data_weather_data_id_null,
        Mode::Measurements => &dates.range_data_weather_data,
        Mode::ImagesWithData => &dates.range_data_weather_data_id_not_null,
        Mode::Unset => bail!("no mode selected"),
    };

    let parsed = list
        .iter()
        .map(|date| parse_server_date(date))
        .collect::<Result<Vec<_>>>()?;

    match (parsed.first(), parsed.last()) {
        (Some(&min), Some(&max)) => Ok(DateBounds { min, max }),
        _ => Err(anyhow!("no dates available for mode '{}'", mode.label())),
    }
}

/// Run one query against the archive
pub async fn run_query(api: &WeatherArchiveAPI, query: DiscoveryQuery) -> DiscoveryOutcome {
    match query {
        DiscoveryQuery::ExistenceFlags { location } => {
            let result = api.fetch_exist_records(location.name()).await.map(ExistenceFlags::from);
            DiscoveryOutcome::ExistenceFlags { location, result }
        }
        DiscoveryQuery::Layers { location } => {
            let result = api.fetch_available_layers(location.name()).await.map(LayerCatalog::from);
            DiscoveryOutcome::Layers { location, result }
        }
        DiscoveryQuery::DateBounds(query) => {
            let result = api
                .fetch_available_dates(query.location.name(), query.layer_token())
                .await
                .and_then(|dates| bounds_for_mode(&dates, query.mode));
            DiscoveryOutcome::DateBounds { query, result }
        }
    }
}
