// Entry point and high-level CLI flow.
//
// The binary drives the dashboard's data pipeline end to end:
// - Options [1]/[2] fetch the sheet and normalize it (two named mapping
//   strategies, see normalize.rs).
// - Option [3] generates the report tables and the metrics summary.
// - Option [4] resolves map coordinates for the current record set.
// - Option [5] edits the record filters.
// - Option [6] keeps refreshing on a timer until Ctrl-C.
mod classify;
mod config;
mod fetch;
mod geocode;
mod metrics;
mod mock;
mod normalize;
mod output;
mod reports;
mod store;
mod types;
mod util;

use anyhow::Result;
use config::AppConfig;
use fetch::SheetClient;
use geocode::GeoResolver;
use normalize::MapStrategy;
use std::io::{self, Write};
use std::time::Duration;
use store::AppState;
use tokio::{signal, time};
use tracing::warn;
use types::{DataSource, Filters};

/// Print a prompt and read one trimmed line of input.
fn read_value(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    read_value("Enter choice: ")
}

/// Ask the user whether to go back to the menu after generating reports.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to menu (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// One load cycle: fetch, filter, normalize, commit. On failure the two
/// strategies diverge on purpose: the script path clears the record set and
/// flags the error, the legacy path substitutes the mock dataset.
async fn run_load(
    state: &mut AppState,
    client: &SheetClient,
    strategy: MapStrategy,
    fallback_year: i32,
) {
    let ticket = state.begin_load();
    match client.fetch_rows().await {
        Ok(rows) => {
            let (records, report) = normalize::normalize_rows(&rows, strategy, fallback_year);
            println!(
                "Processing dataset... ({} rows received, {} kept after the fill filter)",
                util::format_int(report.total_rows as i64),
                util::format_int(report.kept_rows as i64)
            );
            if report.skipped_rows > 0 {
                println!(
                    "Note: {} rows skipped as blank or header artifacts.",
                    util::format_int(report.skipped_rows as i64)
                );
            }
            let source = match strategy {
                MapStrategy::Script => DataSource::Script,
                MapStrategy::SheetsApi => DataSource::SheetsApi,
            };
            if !state.commit(ticket, records, source) {
                warn!("a newer load finished first, discarding this one");
            }
            println!();
        }
        Err(err) => {
            if err.is_empty_result() {
                eprintln!("No data found in the spreadsheet.\n");
            } else {
                eprintln!("Failed to load data: {}\n", err);
            }
            match strategy {
                MapStrategy::Script => {
                    state.fail(ticket);
                }
                MapStrategy::SheetsApi => {
                    println!("Falling back to the mock dataset.\n");
                    state.commit(ticket, mock::mock_obras(), DataSource::Mock);
                }
            }
        }
    }
}

fn print_status(state: &AppState) {
    let badge = match state.source() {
        DataSource::Script | DataSource::SheetsApi => "Conectado",
        DataSource::Mock => "Dados de exemplo",
        DataSource::Error => "Erro de Conexão",
        DataSource::Loading => "Conectando...",
    };
    let m = state.metrics();
    println!(
        "[{}] {} obras | andamento {} ({}) | contratação {} ({}) | planejamento LOA {} | concluídas 2017-2025 {} | orçamento {}",
        badge,
        util::format_int(m.total_obras as i64),
        m.obras_andamento,
        util::format_brl_compact(m.valor_obras_andamento),
        m.obras_contratacao,
        util::format_brl_compact(m.valor_obras_contratacao),
        m.obras_planejamento_loa,
        m.obras_concluidas,
        util::format_brl_compact(m.orcamento_total)
    );
    if let Some(ts) = state.last_update() {
        println!("Última atualização: {}", ts.format("%H:%M:%S"));
    }
}

/// Interactive filter editing, mirroring the dashboard's filter bar.
fn handle_filters(state: &mut AppState) {
    let f = state.filters();
    println!(
        "Filters: força={:?} status={:?} ano={:?} município={:?}",
        f.force, f.status, f.year, f.municipality
    );
    println!("[1] Força  [2] Status  [3] Ano  [4] Município  [5] Clear all");
    match read_choice().as_str() {
        "1" => {
            let v = read_value("Força: ");
            if !v.is_empty() {
                state.set_filters(Filters {
                    force: Some(v),
                    ..Filters::default()
                });
            }
        }
        "2" => {
            let v = read_value("Status contains: ");
            if !v.is_empty() {
                state.set_filters(Filters {
                    status: Some(v),
                    ..Filters::default()
                });
            }
        }
        "3" => {
            let v = read_value("Ano: ");
            match v.parse::<i32>() {
                Ok(y) => state.set_filters(Filters {
                    year: Some(y),
                    ..Filters::default()
                }),
                Err(_) => println!("Invalid year."),
            }
        }
        "4" => {
            let v = read_value("Município contains: ");
            if !v.is_empty() {
                state.set_filters(Filters {
                    municipality: Some(v),
                    ..Filters::default()
                });
            }
        }
        "5" => state.clear_filters(),
        _ => {}
    }
    println!("{} obras match the current filters.\n", state.filtered().len());
}

/// Generate every report table, export them, and preview the first rows.
fn handle_generate_reports(state: &AppState) {
    if state.records().is_empty() {
        println!("Error: No data loaded. Please load the data first (option 1).\n");
        return;
    }
    let data = state.filtered();

    println!("Generating reports...");
    println!("Outputs saved to individual files...\n");

    let active = reports::active_rows(data);
    let file1 = "report_obras_andamento.csv";
    if let Err(e) = output::write_csv(file1, &active) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 1: Obras em Andamento ({} obras)\n", active.len());
    output::preview_table_rows(&active, 3);
    println!("(Full table exported to {})\n", file1);

    let procurement = reports::procurement_rows(data);
    let file2 = "report_obras_contratacao.csv";
    if let Err(e) = output::write_csv(file2, &procurement) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 2: Obras em Contratação ({} obras)\n", procurement.len());
    output::preview_table_rows(&procurement, 3);
    println!("(Full table exported to {})\n", file2);

    let by_force = reports::force_summary(data);
    let file3 = "report_por_forca.csv";
    if let Err(e) = output::write_csv(file3, &by_force) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 3: Obras em Andamento por Força\n");
    output::preview_table_rows(&by_force, 5);
    println!("(Full table exported to {})\n", file3);

    let by_year = reports::completed_by_year(data);
    let file4 = "report_concluidas_ano.csv";
    if let Err(e) = output::write_csv(file4, &by_year) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 4: Obras Concluídas por Ano\n");
    output::preview_table_rows(&by_year, 6);
    println!("(Full table exported to {})\n", file4);

    let by_status = reports::status_breakdown(data);
    let file5 = "report_status.csv";
    if let Err(e) = output::write_csv(file5, &by_status) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 5: Distribuição por Status\n");
    output::preview_table_rows(&by_status, 5);
    println!("(Full table exported to {})\n", file5);

    if let Err(e) = output::write_json("metrics.json", state.metrics()) {
        eprintln!("Write error: {}", e);
    }
    println!("Metrics summary (metrics.json):");
    print_status(state);
    println!();
}

/// Resolve coordinates for the current record set and export the map feed.
async fn handle_geocode(state: &AppState, resolver: &mut GeoResolver) {
    if state.records().is_empty() {
        println!("Error: No data loaded. Please load the data first (option 1).\n");
        return;
    }
    let data = state.filtered();

    let localities: Vec<String> = data.iter().map(|o| o.locality.clone()).collect();
    println!("Resolving coordinates for {} obras...", localities.len());
    let geocoded = resolver.resolve_batch(&localities).await;
    let feed = reports::map_feed(data, &geocoded);

    println!(
        "{} map points, {} obras without coordinates ({} external lookups this cycle).",
        feed.points.len(),
        feed.without_coordinates,
        geocoded.external_calls
    );
    if !geocoded.unresolved.is_empty() {
        println!("Unresolved localities: {}", geocoded.unresolved.join(", "));
    }
    if let Err(e) = output::write_json("map_points.json", &feed) {
        eprintln!("Write error: {}", e);
    }
    println!("(Map feed exported to map_points.json)\n");
}

/// Timer-driven auto-refresh: the same load operation re-invoked every
/// interval, until Ctrl-C. The store's generation guard keeps a slow
/// response from overwriting a newer one.
async fn watch(state: &mut AppState, client: &SheetClient, cfg: &AppConfig) {
    println!(
        "Auto-refresh every {} minutes. Press Ctrl-C to stop.\n",
        cfg.refresh_minutes
    );
    let mut ticker = time::interval(Duration::from_secs(cfg.refresh_minutes * 60));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_load(state, client, MapStrategy::Script, cfg.fallback_year).await;
                print_status(state);
            }
            _ = signal::ctrl_c() => {
                println!("\nAuto-refresh stopped.\n");
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cfg = AppConfig::from_env();
    let client = SheetClient::new(cfg.endpoint_url.clone());
    let mut resolver =
        GeoResolver::new(cfg.geocoder_url.clone(), cfg.geocode_delay_ms, cfg.geocode_batch)?;
    let mut state = AppState::new();

    loop {
        println!("Dashboard de Obras - CEA/SESP");
        println!("[1] Load data from the spreadsheet endpoint");
        println!("[2] Load via the legacy Sheets API mapping");
        println!("[3] Generate dashboard reports");
        println!("[4] Resolve map coordinates");
        println!("[5] Edit filters");
        println!("[6] Auto-refresh");
        println!("[7] Exit\n");
        match read_choice().as_str() {
            "1" => {
                run_load(&mut state, &client, MapStrategy::Script, cfg.fallback_year).await;
                print_status(&state);
                println!();
            }
            "2" => {
                run_load(&mut state, &client, MapStrategy::SheetsApi, cfg.fallback_year).await;
                print_status(&state);
                println!();
            }
            "3" => {
                println!();
                handle_generate_reports(&state);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "4" => {
                handle_geocode(&state, &mut resolver).await;
            }
            "5" => {
                handle_filters(&mut state);
            }
            "6" => {
                watch(&mut state, &client, &cfg).await;
            }
            "7" => {
                println!("Exiting the program.");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 1-7.\n");
            }
        }
    }

    Ok(())
}
