use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use railyard::{
    Catalog, MemoryStore, Record, RowKey, SimulationResult, Station, Train,
    run_simulation_for_selector,
};

/// The train row the isolation simulation targets.
const SUBJECT_TRAIN_ID: u64 = 100;

/// Railway reference data console.
#[derive(Parser)]
#[command(name = "railyard", version, about)]
struct App {
    /// Bound, in seconds, on the wait for a simulation run.
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,

    /// Print simulation results as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = App::parse();
    let timeout = Duration::from_secs(app.timeout_secs);

    let store = Arc::new(MemoryStore::new());
    seed_demo(&store);
    let catalog = Catalog::new(Arc::clone(&store));

    println!("Welcome to the Railways Database!");
    println!("for help, type 'h'");

    loop {
        let Some(input) = read_line(">> ") else { break };
        match input.as_str() {
            "h" => help(),
            "e" | "q" => break,
            "cs" => create_station(&catalog),
            "gss" => list_stations(&catalog),
            "gs" => get_station(&catalog),
            "us" => update_station(&catalog),
            "ds" => delete_station(&catalog),
            "ct" => create_train(&catalog),
            "gts" => list_trains(&catalog),
            "gt" => get_train(&catalog),
            "ut" => update_train(&catalog),
            "dt" => delete_train(&catalog),
            "cp" => call_procedure(&catalog),
            "snrr" => simulate(&store, timeout, app.json),
            "" => {}
            _ => println!("Invalid command"),
        }
    }
}

fn help() {
    println!("h: help");
    println!("e: exit");
    println!("q: quit (same as exit)");
    println!("cs: create station");
    println!("gss: get all stations");
    println!("gs: get station");
    println!("us: update station");
    println!("ds: delete station");
    println!("ct: create train");
    println!("gts: get all trains");
    println!("gt: get train");
    println!("ut: update train");
    println!("dt: delete train");
    println!("cp: call procedure");
    println!("snrr: simulate non-repeatable read");
}

fn seed_demo(store: &MemoryStore) {
    store.seed([
        (
            RowKey::train(SUBJECT_TRAIN_ID),
            Record::Train(Train {
                id: SUBJECT_TRAIN_ID,
                code: "EXP-100".to_string(),
                capacity: 50,
            }),
        ),
        (
            RowKey::station(1),
            Record::Station(Station {
                id: 1,
                city: "Milan".to_string(),
                name: "Milano Centrale".to_string(),
            }),
        ),
        (
            RowKey::station(2),
            Record::Station(Station {
                id: 2,
                city: "Rome".to_string(),
                name: "Roma Termini".to_string(),
            }),
        ),
    ]);
}

fn create_station(catalog: &Catalog) {
    let Some(city) = read_line("city: ") else { return };
    let Some(name) = read_line("name: ") else { return };
    match catalog.create_station(city, name) {
        Ok(station) => {
            println!("Station created:");
            print_stations(&[station]);
        }
        Err(err) => println!("Error creating station: {err}"),
    }
}

fn list_stations(catalog: &Catalog) {
    println!("Stations:");
    print_stations(&catalog.stations());
}

fn get_station(catalog: &Catalog) {
    let Some(id) = read_u64("Enter station id: ") else { return };
    match catalog.station(id) {
        Ok(station) => {
            println!("Station:");
            print_stations(&[station]);
        }
        Err(err) => println!("Error getting station: {err}"),
    }
}

fn update_station(catalog: &Catalog) {
    let Some(id) = read_u64("id: ") else { return };
    let Some(city) = read_line("city: ") else { return };
    let Some(name) = read_line("name: ") else { return };
    match catalog.update_station(Station { id, city, name }) {
        Ok(station) => {
            println!("Station updated:");
            print_stations(&[station]);
        }
        Err(err) => println!("Error updating station: {err}"),
    }
}

fn delete_station(catalog: &Catalog) {
    let Some(id) = read_u64("Enter station id: ") else { return };
    match catalog.delete_station(id) {
        Ok(true) => println!("Station deleted"),
        Ok(false) => println!("No rows affected"),
        Err(err) => println!("Error deleting station: {err}"),
    }
}

fn create_train(catalog: &Catalog) {
    let Some(code) = read_line("code: ") else { return };
    let Some(capacity) = read_i64("capacity: ") else { return };
    match catalog.create_train(code, capacity) {
        Ok(train) => {
            println!("Train created:");
            print_trains(&[train]);
        }
        Err(err) => println!("Error creating train: {err}"),
    }
}

fn list_trains(catalog: &Catalog) {
    println!("Trains:");
    print_trains(&catalog.trains());
}

fn get_train(catalog: &Catalog) {
    let Some(id) = read_u64("Enter train id: ") else { return };
    match catalog.train(id) {
        Ok(train) => {
            println!("Train:");
            print_trains(&[train]);
        }
        Err(err) => println!("Error getting train: {err}"),
    }
}

fn update_train(catalog: &Catalog) {
    let Some(id) = read_u64("id: ") else { return };
    let Some(code) = read_line("code: ") else { return };
    let Some(capacity) = read_i64("capacity: ") else { return };
    match catalog.update_train(Train { id, code, capacity }) {
        Ok(train) => {
            println!("Train updated:");
            print_trains(&[train]);
        }
        Err(err) => println!("Error updating train: {err}"),
    }
}

fn delete_train(catalog: &Catalog) {
    let Some(id) = read_u64("Enter train id: ") else { return };
    match catalog.delete_train(id) {
        Ok(true) => println!("Train deleted"),
        Ok(false) => println!("No rows affected"),
        Err(err) => println!("Error deleting train: {err}"),
    }
}

fn call_procedure(catalog: &Catalog) {
    let Some(amount) = read_u64("Enter amount of seats: ") else { return };
    println!("Amount of rows before call procedure: {}", catalog.count_seats());
    match catalog.generate_seats(amount) {
        Ok(_) => println!("Procedure called"),
        Err(err) => println!("Error calling procedure: {err}"),
    }
    println!("Amount of rows after call procedure: {}", catalog.count_seats());
}

fn simulate(store: &Arc<MemoryStore>, timeout: Duration, json: bool) {
    let prompt = "Enter isolation level (1: Read Uncommitted, 2: Read Committed, \
                  3: Repeatable Read, 4: Serializable): ";
    let Some(selector) = read_u64(prompt) else { return };
    let selector = u8::try_from(selector).unwrap_or(u8::MAX);
    match run_simulation_for_selector(store, selector, RowKey::train(SUBJECT_TRAIN_ID), timeout) {
        Ok(result) => print_simulation(&result, json),
        Err(err) => println!("Error simulating non-repeatable read: {err}"),
    }
}

fn print_simulation(result: &SimulationResult, json: bool) {
    if json {
        let payload = serde_json::json!({
            "level": result.level,
            "first_read": result.first_read.as_ref().map(|o| o.value),
            "second_read": result.second_read.as_ref().map(|o| o.value),
            "writer_committed_at_ms": result.writer_committed_at.map(|d| d.as_millis()),
            "anomaly_detected": result.anomaly_detected,
            "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{payload}");
        return;
    }

    println!("Isolation level: {}", result.level);
    match &result.first_read {
        Some(observation) => println!(
            "First read: capacity {} ({} ms)",
            observation.value,
            observation.at.as_millis()
        ),
        None => println!("First read: missing"),
    }
    match &result.second_read {
        Some(observation) => println!(
            "Second read: capacity {} ({} ms)",
            observation.value,
            observation.at.as_millis()
        ),
        None => println!("Second read: missing"),
    }
    if let Some(committed) = result.writer_committed_at {
        println!("Writer committed at {} ms", committed.as_millis());
    }
    if result.anomaly_detected {
        println!("Non-repeatable read observed: the capacity changed between the two reads.");
    } else if result.is_conclusive() {
        println!("No anomaly observed: both reads returned the same capacity.");
    } else {
        println!("Inconclusive run.");
    }
    for error in &result.errors {
        println!("error: {error}");
    }
}

fn print_stations(stations: &[Station]) {
    println!("Id City Name");
    for station in stations {
        println!("{} {} {}", station.id, station.city, station.name);
    }
}

fn print_trains(trains: &[Train]) {
    println!("Id Code Capacity");
    for train in trains {
        println!("{} {} {}", train.id, train.code, train.capacity);
    }
}

fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

fn read_u64(prompt: &str) -> Option<u64> {
    let line = read_line(prompt)?;
    match line.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            println!("Invalid input");
            None
        }
    }
}

fn read_i64(prompt: &str) -> Option<i64> {
    let line = read_line(prompt)?;
    match line.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            println!("Invalid input");
            None
        }
    }
}
