mod app;

extern crate pretty_env_logger;
#[macro_use] extern crate log;

use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use weather_archive::WeatherArchiveAPI;

use app::catalog::load_location_catalog;
use app::console::{parse_command, render_status, Command, HELP};
use app::discovery::{run_query, DiscoveryOutcome, DiscoveryQuery};
use app::download::{dispatch, DirectorySink};
use app::session::Coordinator;

/// Work finished in the background
enum Completion {
    Discovery(DiscoveryOutcome),
    Download,
}

type Pending = FuturesUnordered<LocalBoxFuture<'static, Completion>>;

fn schedule_queries(api: &WeatherArchiveAPI, pending: &mut Pending, queries: Vec<DiscoveryQuery>) {
    for query in queries {
        let api = api.clone();
        pending.push(async move { Completion::Discovery(run_query(&api, query).await) }.boxed_local());
    }
}

/// Returns false when the user asked to quit
fn handle_command(
    command: Command,
    coordinator: &mut Coordinator,
    api: &WeatherArchiveAPI,
    sink: &DirectorySink,
    pending: &mut Pending,
) -> bool {
    let queries = match command {
        Command::Quit => return false,
        Command::Help => {
            println!("{}", HELP);
            return true;
        }
        Command::Status => {
            println!("{}", render_status(coordinator));
            return true;
        }
        Command::Download => {
            match coordinator.prepare_download() {
                Ok(request) => {
                    let (start, end) = request.range();
                    println!("Downloading {} ({} .. {})", request.filename(), start, end);
                    let api = api.clone();
                    let sink = sink.clone();
                    pending.push(
                        async move {
                            if let Some(path) = dispatch(&api, &request, &sink).await {
                                println!("Saved {}", path.display());
                            }
                            Completion::Download
                        }
                        .boxed_local(),
                    );
                }
                Err(e) => println!("Download not available: {}", e),
            }
            return true;
        }
        Command::Location(location) => coordinator.set_location(location),
        Command::Mode(mode) => coordinator.set_mode(mode),
        Command::Layer(layer) => coordinator.set_layer(&layer),
        Command::Fields(fields) => coordinator.set_fields(fields),
        Command::Start(date) => coordinator.set_start_date(date),
        Command::End(date) => coordinator.set_end_date(date),
    };

    match queries {
        Ok(queries) => schedule_queries(api, pending, queries),
        Err(e) => println!("Rejected: {}", e),
    }
    true
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    pretty_env_logger::init();

    info!("Starting weather archive front end...");

    let settings = app::settings::load_settings()?;
    let api = WeatherArchiveAPI::new(&settings.api_address)?;
    let sink = DirectorySink::new(&settings.output_dir);
    info!("Archive: {}, saving to {}", api.base_url(), settings.output_dir.display());

    let catalog = load_location_catalog(&api).await;
    if catalog.is_empty() {
        warn!("No locations available, nothing can be selected");
    }
    let mut coordinator = Coordinator::new(catalog);

    println!("{}", HELP);
    println!("{}", render_status(&coordinator));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Pending = FuturesUnordered::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        if !handle_command(command, &mut coordinator, &api, &sink, &mut pending) {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{}", e),
                }
            }
            Some(done) = pending.next(), if !pending.is_empty() => {
                if let Completion::Discovery(outcome) = done {
                    if coordinator.apply_outcome(outcome) {
                        println!("{}", render_status(&coordinator));
                    }
                }
            }
        }
    }

    // Let running downloads finish; discovery results no longer matter
    while pending.next().await.is_some() {}

    info!("Weather archive front end stopped");
    Ok(())
}
