use anyhow::Result;
use chrono::NaiveDate;

use crate::app::catalog::{Location, LocationCatalog};
use crate::app::discovery::{queries_for, DiscoveryOutcome, DiscoveryQuery};
use crate::app::download::DownloadRequest;
use crate::app::selection::{Action, ExistenceFlags, Gates, LayerCatalog, Mode, Selection};

/// Owns the selection and the discovery results it depends on.
///
/// Every mutation goes through [`Coordinator::apply`], which computes the
/// next selection in one step and returns the queries the change requires.
/// Query results come back through [`Coordinator::apply_outcome`] and are
/// dropped if the selection has moved on since they were issued.
#[derive(Debug, Default)]
pub struct Coordinator {
    catalog: LocationCatalog,
    flags: ExistenceFlags,
    layers: Option<LayerCatalog>,
    selection: Selection,
    /// Range of the last prepared download, after normalization
    sent_range: Option<(NaiveDate, NaiveDate)>,
}

impl Coordinator {
    pub fn new(catalog: LocationCatalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn catalog(&self) -> &LocationCatalog {
        &self.catalog
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn sent_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.sent_range
    }

    /// Modes the current location offers
    pub fn selectable_modes(&self) -> Vec<Mode> {
        if self.selection.location.is_none() {
            return Vec::new();
        }
        Mode::SELECTABLE
            .into_iter()
            .filter(|mode| self.flags.allows(*mode))
            .collect()
    }

    /// Layers offered under the current mode
    pub fn layer_view(&self) -> &[String] {
        self.layers
            .as_ref()
            .map(|layers| layers.view(self.selection.mode))
            .unwrap_or_default()
    }

    pub fn set_location(&mut self, location: Location) -> Result<Vec<DiscoveryQuery>> {
        self.apply(Action::SetLocation(location))
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<Vec<DiscoveryQuery>> {
        self.apply(Action::SetMode(mode))
    }

    pub fn set_layer(&mut self, layer: &str) -> Result<Vec<DiscoveryQuery>> {
        self.apply(Action::SetLayer(layer.to_string()))
    }

    pub fn set_fields(&mut self, fields: Vec<String>) -> Result<Vec<DiscoveryQuery>> {
        self.apply(Action::SetFields(fields))
    }

    pub fn set_start_date(&mut self, date: NaiveDate) -> Result<Vec<DiscoveryQuery>> {
        self.apply(Action::SetStartDate(date))
    }

    pub fn set_end_date(&mut self, date: NaiveDate) -> Result<Vec<DiscoveryQuery>> {
        self.apply(Action::SetEndDate(date))
    }

    /// Apply one user action and return the queries to issue
    pub fn apply(&mut self, action: Action) -> Result<Vec<DiscoveryQuery>> {
        let gates = Gates {
            catalog: &self.catalog,
            flags: &self.flags,
            layers: self.layers.as_ref(),
        };
        let next = self.selection.transition(action, &gates)?;
        let queries = queries_for(&self.selection, &next);

        if next.location != self.selection.location {
            self.flags = ExistenceFlags::default();
            self.layers = None;
        }
        if next != self.selection {
            self.sent_range = None;
        }
        self.selection = next;

        for query in &queries {
            info!("Issuing query: {}", query.describe());
        }
        Ok(queries)
    }

    /// Store a finished query's result if it still matches the selection.
    /// Returns whether state changed.
    pub fn apply_outcome(&mut self, outcome: DiscoveryOutcome) -> bool {
        match outcome {
            DiscoveryOutcome::ExistenceFlags { location, result } => {
                if self.selection.location.as_ref() != Some(&location) {
                    debug!("Discarding existence flags for {}", location.name());
                    return false;
                }
                match result {
                    Ok(flags) => {
                        self.flags = flags;
                        true
                    }
                    Err(e) => {
                        error!("Error fetching existence flags for {}: {}", location.name(), e);
                        false
                    }
                }
            }

            DiscoveryOutcome::Layers { location, result } => {
                if self.selection.location.as_ref() != Some(&location) {
                    debug!("Discarding layers for {}", location.name());
                    return false;
                }
                match result {
                    Ok(layers) => {
                        self.layers = Some(layers);
                        true
                    }
                    Err(e) => {
                        error!("Error fetching layers for {}: {}", location.name(), e);
                        false
                    }
                }
            }

            DiscoveryOutcome::DateBounds { query, result } => {
                if !query.matches(&self.selection) {
                    debug!("Discarding date bounds for {}", query.location.name());
                    return false;
                }
                match result {
                    Ok(bounds) => {
                        self.selection = self.selection.with_date_bounds(bounds);
                        true
                    }
                    Err(e) => {
                        error!("Error fetching dates for {}: {}", query.location.name(), e);
                        false
                    }
                }
            }
        }
    }

    pub fn is_download_enabled(&self) -> bool {
        self.selection.is_download_enabled()
    }

    /// Finalize a download request.
    ///
    /// The selected dates stay as picked so a retry passes the same bounds
    /// check. The normalized range is kept in [`Coordinator::sent_range`].
    pub fn prepare_download(&mut self) -> Result<DownloadRequest> {
        let request = DownloadRequest::from_selection(&self.selection)?;
        self.sent_range = Some(request.range());
        Ok(request)
    }
}
