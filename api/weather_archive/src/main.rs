extern crate pretty_env_logger;
#[macro_use] extern crate log;

use chrono::NaiveDate;
use std::env;
use weather_archive::{to_sortable, WeatherArchiveAPI, DEFAULT_BASE_URL};

fn parse_date(value: &str) -> Result<NaiveDate, anyhow::Error> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("Invalid date '{}' (expected YYYY-MM-DD): {}", value, e))
}

fn save(kind: &str, location: &str, data: &[u8]) -> Result<(), anyhow::Error> {
    let filename = format!("{}_{}.zip", kind, location.trim());
    std::fs::write(&filename, data)?;
    println!("Saved {} bytes to: {}", data.len(), filename);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    pretty_env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <command> [args...]", args[0]);
        eprintln!("Commands:");
        eprintln!("  locations                                          - List areas and cities");
        eprintln!("  exists <location>                                  - Show which record kinds exist");
        eprintln!("  layers <location>                                  - List image layers");
        eprintln!("  dates <location> <layer>                           - Show available date ranges");
        eprintln!("  images <location> <layer> <start> <end>            - Download images");
        eprintln!("  data <location> <fields> <start> <end>             - Download measurements");
        eprintln!("  images-data <location> <layer> <fields> <start> <end> - Download images with measurements");
        eprintln!("");
        eprintln!("Archive address: $WEATHER_ARCHIVE_API or {}", DEFAULT_BASE_URL);
        eprintln!("");
        eprintln!("Examples:");
        eprintln!("  {} exists Zilina", args[0]);
        eprintln!("  {} images Zilina clouds_new 2023-01-01 2023-01-10", args[0]);
        eprintln!("  {} data Zilina \"latitude, longitude, humidity\" 2023-01-01 2023-01-10", args[0]);
        std::process::exit(1);
    }

    let base_url = env::var("WEATHER_ARCHIVE_API").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let api = WeatherArchiveAPI::new(&base_url)?;
    info!("Using archive at {}", api.base_url());

    let command = &args[1];

    match command.as_str() {
        "locations" => {
            let locations = api.fetch_available_locations().await?;
            println!("Areas ({}):", locations.areas.len());
            for area in &locations.areas {
                println!("  {}", area);
            }
            println!("Cities ({}):", locations.cities.len());
            for city in &locations.cities {
                println!("  {}", city);
            }
        }

        "exists" => {
            if args.len() < 3 {
                eprintln!("Not enough arguments for exists command");
                std::process::exit(1);
            }

            let records = api.fetch_exist_records(&args[2]).await?;
            println!("Weather images:   {}", records.exist_weather_images);
            println!("Weather data:     {}", records.exist_weather_data);
            println!("Images with data: {}", records.exist_weather_images_with_data);
        }

        "layers" => {
            if args.len() < 3 {
                eprintln!("Not enough arguments for layers command");
                std::process::exit(1);
            }

            let layers = api.fetch_available_layers(&args[2]).await?;
            println!("Layers: {}", layers.layers.join(", "));
            println!("Layers with data: {}", layers.layers_with_data.join(", "));
        }

        "dates" => {
            if args.len() < 4 {
                eprintln!("Not enough arguments for dates command");
                std::process::exit(1);
            }

            let dates = api.fetch_available_dates(&args[2], &args[3]).await?;
            let ranges = [
                ("Images only", &dates.range_data_weather_data_id_null),
                ("Weather data", &dates.range_data_weather_data),
                ("Images with data", &dates.range_data_weather_data_id_not_null),
            ];
            for (label, list) in ranges {
                match (list.first(), list.last()) {
                    (Some(first), Some(last)) => {
                        println!("{}: {} .. {}", label, to_sortable(first)?, to_sortable(last)?)
                    }
                    _ => println!("{}: none", label),
                }
            }
        }

        "images" => {
            if args.len() < 6 {
                eprintln!("Not enough arguments for images command");
                std::process::exit(1);
            }

            let data = api
                .fetch_weather_images(&args[2], &args[3], parse_date(&args[4])?, parse_date(&args[5])?)
                .await?;
            save("weather_images", &args[2], &data)?;
        }

        "data" => {
            if args.len() < 6 {
                eprintln!("Not enough arguments for data command");
                std::process::exit(1);
            }

            let data = api
                .fetch_weather_data(&args[2], &args[3], parse_date(&args[4])?, parse_date(&args[5])?)
                .await?;
            save("weather_data", &args[2], &data)?;
        }

        "images-data" => {
            if args.len() < 7 {
                eprintln!("Not enough arguments for images-data command");
                std::process::exit(1);
            }

            let data = api
                .fetch_weather_images_and_data(
                    &args[2],
                    &args[3],
                    &args[4],
                    parse_date(&args[5])?,
                    parse_date(&args[6])?,
                )
                .await?;
            save("weather_images_and_data", &args[2], &data)?;
        }

        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }

    Ok(())
}
