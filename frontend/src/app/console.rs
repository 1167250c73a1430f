use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use std::fmt::Write;

use crate::app::catalog::Location;
use crate::app::dates::parse_user_date;
use crate::app::selection::{Mode, MEASUREMENT_FIELDS};
use crate::app::session::Coordinator;

pub const HELP: &str = "\
Commands:
  status                     Show the current selection
  area <name>                Select an area
  city <name>                Select a city
  mode <images|data|images-data>
  layer <name>               Select an image layer
  fields <a,b,...>           Select measurement fields
  start <YYYY-MM-DD>         Set the start date
  end <YYYY-MM-DD>           Set the end date
  download                   Download the selection
  help                       Show this help
  quit                       Exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Status,
    Location(Location),
    Mode(Mode),
    Layer(String),
    Fields(Vec<String>),
    Start(NaiveDate),
    End(NaiveDate),
    Download,
    Quit,
}

fn parse_mode(value: &str) -> Result<Mode> {
    match value {
        "images" => Ok(Mode::Images),
        "data" => Ok(Mode::Measurements),
        "images-data" => Ok(Mode::ImagesWithData),
        _ => Err(anyhow!("unknown mode '{}' (use images, data or images-data)", value)),
    }
}

/// Parse one input line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let needs_arg = |what: &str| -> Result<()> {
        if rest.is_empty() {
            bail!("'{}' needs {}", word, what);
        }
        Ok(())
    };

    let command = match word {
        "help" => Command::Help,
        "status" => Command::Status,
        "download" => Command::Download,
        "quit" | "exit" => Command::Quit,
        "area" => {
            needs_arg("a name")?;
            Command::Location(Location::Area(rest.to_string()))
        }
        "city" => {
            needs_arg("a name")?;
            Command::Location(Location::City(rest.to_string()))
        }
        "mode" => {
            needs_arg("a mode")?;
            Command::Mode(parse_mode(rest)?)
        }
        "layer" => {
            needs_arg("a layer name")?;
            Command::Layer(rest.to_string())
        }
        // An empty list deselects every field
        "fields" => Command::Fields(
            rest.split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        "start" => {
            needs_arg("a date")?;
            Command::Start(parse_user_date(rest)?)
        }
        "end" => {
            needs_arg("a date")?;
            Command::End(parse_user_date(rest)?)
        }
        _ => bail!("unknown command '{}', try 'help'", word),
    };

    Ok(Some(command))
}

fn pool(entries: &[String]) -> String {
    if entries.is_empty() {
        "Not available".to_string()
    } else {
        entries.join(", ")
    }
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

/// Plain-text view of the coordinator state
pub fn render_status(coordinator: &Coordinator) -> String {
    let catalog = coordinator.catalog();
    let selection = coordinator.selection();
    let mut out = String::new();

    let _ = writeln!(out, "Areas:     {}", pool(&catalog.areas));
    let _ = writeln!(out, "Cities:    {}", pool(&catalog.cities));
    let _ = writeln!(
        out,
        "Location:  {}",
        or_dash(selection.location.as_ref().map(|l| format!("{} ({})", l.name(), l.kind())))
    );

    if selection.location.is_some() {
        let modes: Vec<&str> = coordinator.selectable_modes().iter().map(|m| m.label()).collect();
        let _ = writeln!(out, "Modes:     {}", if modes.is_empty() { "none".to_string() } else { modes.join(", ") });
        let _ = writeln!(out, "Mode:      {}", selection.mode.label());
    }

    if selection.mode.uses_layer() {
        let _ = writeln!(out, "Layers:    {}", pool(coordinator.layer_view()));
        let _ = writeln!(out, "Layer:     {}", or_dash(selection.layer.clone()));
    }

    if selection.mode.uses_fields() {
        let _ = writeln!(out, "Catalog:   {}", MEASUREMENT_FIELDS.join(", "));
        let _ = writeln!(out, "Fields:    {} selected", selection.fields.len());
    }

    if let Some(bounds) = selection.date_bounds {
        let _ = writeln!(out, "Min date: {} Max date: {}", bounds.min, bounds.max);
        let _ = writeln!(out, "Start:     {}", or_dash(selection.start_date.map(|d| d.to_string())));
        let _ = writeln!(out, "End:       {}", or_dash(selection.end_date.map(|d| d.to_string())));
    }

    if let Some((start, end)) = coordinator.sent_range() {
        let _ = writeln!(out, "Sent:      {} .. {}", start, end);
    }

    let _ = write!(
        out,
        "Download:  {}",
        if coordinator.is_download_enabled() { "ready" } else { "not available" }
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::catalog::LocationCatalog;
    use crate::app::discovery::{DiscoveryOutcome, DiscoveryQuery};
    use crate::app::selection::{DateBounds, ExistenceFlags};

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(parse_command("status").unwrap(), Some(Command::Status));
        assert_eq!(
            parse_command("city  Banska Bystrica ").unwrap(),
            Some(Command::Location(Location::City("Banska Bystrica".into())))
        );
        assert_eq!(
            parse_command("area Slovakia").unwrap(),
            Some(Command::Location(Location::Area("Slovakia".into())))
        );
        assert_eq!(parse_command("mode images-data").unwrap(), Some(Command::Mode(Mode::ImagesWithData)));
        assert_eq!(
            parse_command("fields humidity, pressure,,").unwrap(),
            Some(Command::Fields(vec!["humidity".into(), "pressure".into()]))
        );
        assert_eq!(parse_command("fields").unwrap(), Some(Command::Fields(vec![])));
        assert_eq!(
            parse_command("start 2023-01-05").unwrap(),
            Some(Command::Start(NaiveDate::from_ymd_opt(2023, 1, 5).unwrap()))
        );
        assert_eq!(parse_command("exit").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("city").is_err());
        assert!(parse_command("mode both").is_err());
        assert!(parse_command("end 05.01.2023").is_err());
        assert!(parse_command("teleport Zilina").is_err());
    }

    #[test]
    fn test_status_rendering() {
        let mut coordinator = Coordinator::new(LocationCatalog {
            areas: vec![],
            cities: vec!["Zilina".into()],
        });

        let status = render_status(&coordinator);
        assert!(status.contains("Areas:     Not available"));
        assert!(status.contains("Cities:    Zilina"));
        assert!(status.ends_with("Download:  not available"));

        coordinator.set_location(Location::City("Zilina".into())).unwrap();
        let status = render_status(&coordinator);
        assert!(status.contains("Location:  Zilina (city)"));
        assert!(status.contains("Modes:     none"));
    }

    #[test]
    fn test_status_shows_sent_range() {
        let mut coordinator = Coordinator::new(LocationCatalog {
            areas: vec![],
            cities: vec!["Zilina".into()],
        });
        let zilina = Location::City("Zilina".into());
        coordinator.set_location(zilina.clone()).unwrap();
        coordinator.apply_outcome(DiscoveryOutcome::ExistenceFlags {
            location: zilina.clone(),
            result: Ok(ExistenceFlags {
                images_exist: false,
                measurements_exist: true,
                images_with_data_exist: false,
            }),
        });
        coordinator.set_mode(Mode::Measurements).unwrap();
        let query = coordinator
            .set_fields(vec!["humidity".into()])
            .unwrap()
            .into_iter()
            .find_map(|query| match query {
                DiscoveryQuery::DateBounds(query) => Some(query),
                _ => None,
            })
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap();
        coordinator.apply_outcome(DiscoveryOutcome::DateBounds {
            query,
            result: Ok(DateBounds { min: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), max: day }),
        });
        coordinator.set_start_date(day).unwrap();
        coordinator.set_end_date(day).unwrap();
        coordinator.prepare_download().unwrap();

        let status = render_status(&coordinator);
        assert!(status.contains("Start:     2023-01-31"));
        assert!(status.contains("Sent:      2023-01-30 .. 2023-02-01"));
        assert!(status.ends_with("Download:  ready"));
    }
}
