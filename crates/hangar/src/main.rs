//! `hangar` - CLI for aircraft maintenance tracking
//!
//! This binary provides the command-line interface for the fleet, its
//! maintenance sheets and history, and the parts catalog.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use tracing::debug;

use hangar::catalog::{NewProduct, NewVendor};
use hangar::cli::{
    AircraftCommand, Cli, Command, ConfigCommand, HistoryCommand, ItemCommand, OutputFormat,
    PartCommand, SheetCommand, StatusCommand, VendorCommand,
};
use hangar::tracker::{AircraftUpdate, Completion, NewAircraft, NewItem};
use hangar::{init_logging, Catalog, Config, Product, Storage, Tracker};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        command => {
            let db_path = config.database_path();
            let storage = Storage::open(&db_path)
                .with_context(|| format!("failed to open database at {}", db_path.display()))?;
            let tracker = Tracker::new(&storage, config.status_policy()?);
            let catalog = Catalog::new(&storage, config.catalog.search_limit);
            let now = Utc::now();
            debug!("Evaluating against {}", now);

            match command {
                Command::Aircraft(cmd) => handle_aircraft(&tracker, cmd, now),
                Command::Sheet(cmd) => handle_sheet(&tracker, cmd, now),
                Command::Item(cmd) => handle_item(&tracker, cmd, now),
                Command::Status(cmd) => handle_status(&tracker, &storage, &cmd, now),
                Command::History(cmd) => handle_history(&tracker, &cmd),
                Command::Vendor(cmd) => handle_vendor(&catalog, cmd),
                Command::Part(cmd) => handle_part(&catalog, cmd, now),
                Command::Config(cmd) => handle_config(&config, cmd),
            }
        }
    }
}

fn handle_aircraft(tracker: &Tracker<'_>, cmd: AircraftCommand, now: DateTime<Utc>) -> Result<()> {
    match cmd {
        AircraftCommand::Add {
            registration,
            manufacturer,
            model,
            serial,
            hours,
            last_inspection,
            next_inspection,
        } => {
            let aircraft = tracker
                .register_aircraft(
                    NewAircraft {
                        registration,
                        manufacturer,
                        model,
                        serial_number: serial,
                        total_hours: hours,
                        last_inspection,
                        next_inspection,
                    },
                    now,
                )
                .context("failed to register aircraft")?;
            println!("Registered {} ({})", aircraft.registration, aircraft.id);
        }
        AircraftCommand::List { format } => {
            let fleet = tracker.fleet()?;
            if format == OutputFormat::Json {
                return print_json(&fleet);
            }
            let rows = fleet
                .iter()
                .map(|a| {
                    vec![
                        a.id.to_string(),
                        a.registration.clone(),
                        a.type_designation(),
                        format!("{:.1}", a.total_hours),
                        opt_date(a.next_inspection),
                    ]
                })
                .collect();
            print_rows(
                format,
                &["ID", "REGISTRATION", "TYPE", "HOURS", "NEXT INSPECTION"],
                rows,
            );
        }
        AircraftCommand::Show { id, json } => {
            let view = tracker.aircraft_view(id, now)?;
            if json {
                return print_json(&view);
            }
            let aircraft = &view.aircraft;
            println!("{} ({})", aircraft.registration, aircraft.type_designation());
            println!("---------------");
            println!("ID:              {}", aircraft.id);
            println!(
                "Serial number:   {}",
                aircraft.serial_number.as_deref().unwrap_or("-")
            );
            println!("Total hours:     {:.1}", aircraft.total_hours);
            println!("Last inspection: {}", opt_date(aircraft.last_inspection));
            match &view.inspection {
                Some(outlook) => println!(
                    "Next inspection: {} ({outlook})",
                    date(&outlook.next_inspection)
                ),
                None => println!("Next inspection: Not scheduled"),
            }
            println!("Status:          {}", view.summary.headline());

            if !view.sheets.is_empty() {
                println!();
                let rows = view
                    .sheets
                    .iter()
                    .map(|s| {
                        vec![
                            s.id.to_string(),
                            s.title.clone(),
                            s.item_count.to_string(),
                            s.summary.headline(),
                        ]
                    })
                    .collect();
                print_rows(
                    OutputFormat::Table,
                    &["SHEET", "TITLE", "ITEMS", "STATUS"],
                    rows,
                );
            }
        }
        AircraftCommand::Update {
            id,
            serial,
            hours,
            last_inspection,
            next_inspection,
        } => {
            let aircraft = tracker.update_aircraft(
                id,
                AircraftUpdate {
                    serial_number: serial,
                    total_hours: hours,
                    last_inspection,
                    next_inspection,
                },
            )?;
            println!("Updated {}", aircraft.registration);
        }
        AircraftCommand::Delete { id } => {
            tracker.remove_aircraft(id)?;
            println!("Deleted aircraft {id}");
        }
    }
    Ok(())
}

fn handle_sheet(tracker: &Tracker<'_>, cmd: SheetCommand, now: DateTime<Utc>) -> Result<()> {
    match cmd {
        SheetCommand::Create { aircraft, title } => {
            let sheet = tracker.create_sheet(aircraft, &title, now)?;
            println!("Created sheet '{}' ({})", sheet.title, sheet.id);
        }
        SheetCommand::List { aircraft, format } => {
            let sheets = tracker.sheets(aircraft)?;
            if format == OutputFormat::Json {
                return print_json(&sheets);
            }
            let mut rows = Vec::with_capacity(sheets.len());
            for sheet in &sheets {
                let summary = sheet.summary(tracker.policy(), now)?;
                rows.push(vec![
                    sheet.id.to_string(),
                    sheet.title.clone(),
                    sheet.items.len().to_string(),
                    date(&sheet.updated_at),
                    summary.headline(),
                ]);
            }
            print_rows(
                format,
                &["ID", "TITLE", "ITEMS", "UPDATED", "STATUS"],
                rows,
            );
        }
        SheetCommand::Show { id, format } => {
            let view = tracker.sheet_view(id, now)?;
            if format == OutputFormat::Json {
                return print_json(&view);
            }
            println!("{} [{}]", view.title, view.summary.headline());
            println!("Last updated: {}", date(&view.updated_at));
            println!();
            let rows = view
                .items
                .iter()
                .map(|v| {
                    vec![
                        v.item.id.to_string(),
                        v.item.description.clone(),
                        v.item.interval.to_string(),
                        opt_date(v.item.last_completed_at),
                        opt_date(v.next_due_at),
                        v.status.to_string(),
                    ]
                })
                .collect();
            print_rows(
                format,
                &["ID", "DESCRIPTION", "INTERVAL", "LAST DONE", "NEXT DUE", "STATUS"],
                rows,
            );
        }
        SheetCommand::Delete { id } => {
            tracker.remove_sheet(id)?;
            println!("Deleted sheet {id}");
        }
    }
    Ok(())
}

fn handle_item(tracker: &Tracker<'_>, cmd: ItemCommand, now: DateTime<Utc>) -> Result<()> {
    match cmd {
        ItemCommand::Add {
            sheet,
            description,
            interval,
            last_completed,
            notes,
        } => {
            let item = tracker.add_item(
                sheet,
                NewItem {
                    description,
                    interval_days: interval,
                    last_completed_at: last_completed,
                    notes,
                },
                now,
            )?;
            println!(
                "Added '{}' every {} ({})",
                item.description, item.interval, item.id
            );
        }
        ItemCommand::Complete {
            id,
            technician,
            hours,
            notes,
        } => {
            let record = tracker.complete_item(
                id,
                Completion {
                    technician,
                    notes,
                    hours_at_completion: hours,
                },
                now,
            )?;
            println!(
                "Completed '{}'; next due {}",
                record.description,
                date(&record.next_due_at)
            );
        }
        ItemCommand::Delete { id } => {
            let item = tracker.remove_item(id, now)?;
            println!("Removed '{}'", item.description);
        }
    }
    Ok(())
}

fn handle_status(
    tracker: &Tracker<'_>,
    storage: &Storage,
    cmd: &StatusCommand,
    now: DateTime<Utc>,
) -> Result<()> {
    if let Some(id) = cmd.aircraft {
        let view = tracker.aircraft_view(id, now)?;
        if cmd.json {
            return print_json(&view);
        }
        println!(
            "{}: {}",
            view.aircraft.registration,
            view.summary.headline()
        );
        print_counts(&view.summary);
        return Ok(());
    }

    let view = tracker.fleet_view(now)?;
    if cmd.json {
        return print_json(&view);
    }

    let rows = view
        .aircraft
        .iter()
        .map(|entry| {
            vec![
                entry.registration.clone(),
                entry.type_designation.clone(),
                entry
                    .inspection
                    .map_or_else(|| "Not scheduled".to_string(), |o| o.to_string()),
                entry.summary.headline(),
            ]
        })
        .collect();
    print_rows(
        OutputFormat::Table,
        &["REGISTRATION", "TYPE", "INSPECTION", "STATUS"],
        rows,
    );

    let stats = storage.stats()?;
    println!();
    println!("Fleet: {}", view.summary.headline());
    println!("Database: {stats}");
    print_counts(&view.summary);
    Ok(())
}

fn handle_history(tracker: &Tracker<'_>, cmd: &HistoryCommand) -> Result<()> {
    let records = tracker.history(cmd.aircraft, cmd.limit)?;
    if cmd.format == OutputFormat::Json {
        return print_json(&records);
    }
    let rows = records
        .iter()
        .map(|r| {
            vec![
                date(&r.completed_at),
                r.description.clone(),
                r.hours_at_completion
                    .map_or_else(|| "-".to_string(), |h| format!("{h:.1}")),
                r.technician.clone().unwrap_or_else(|| "-".to_string()),
                date(&r.next_due_at),
            ]
        })
        .collect();
    print_rows(
        cmd.format,
        &["COMPLETED", "DESCRIPTION", "HOURS", "TECHNICIAN", "NEXT DUE"],
        rows,
    );
    Ok(())
}

fn handle_vendor(catalog: &Catalog<'_>, cmd: VendorCommand) -> Result<()> {
    match cmd {
        VendorCommand::Add { name, email, phone } => {
            let vendor = catalog.add_vendor(NewVendor {
                name,
                contact_email: email,
                phone,
            })?;
            println!("Added vendor {} ({})", vendor.name, vendor.id);
        }
        VendorCommand::List { format } => {
            let vendors = catalog.vendors()?;
            if format == OutputFormat::Json {
                return print_json(&vendors);
            }
            let rows = vendors
                .iter()
                .map(|v| {
                    vec![
                        v.id.to_string(),
                        v.name.clone(),
                        v.contact_email.clone().unwrap_or_else(|| "-".to_string()),
                        v.phone.clone().unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect();
            print_rows(format, &["ID", "NAME", "EMAIL", "PHONE"], rows);
        }
    }
    Ok(())
}

fn handle_part(catalog: &Catalog<'_>, cmd: PartCommand, now: DateTime<Utc>) -> Result<()> {
    match cmd {
        PartCommand::Add {
            part_number,
            name,
            description,
            price,
            image_url,
            category,
            vendor,
        } => {
            let product = catalog.add_product(
                NewProduct {
                    part_number,
                    name,
                    description,
                    price,
                    image_url,
                    category,
                    vendor_id: vendor,
                },
                now,
            )?;
            println!("Added part {} ({})", product.part_number, product.id);
        }
        PartCommand::List { format } => print_products(&catalog.products()?, format)?,
        PartCommand::Search { query, format } => {
            print_products(&catalog.search(&query)?, format)?;
        }
    }
    Ok(())
}

fn print_products(products: &[Product], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(&products);
    }
    let rows = products
        .iter()
        .map(|p| {
            vec![
                p.part_number.clone(),
                p.name.clone(),
                p.category.clone().unwrap_or_else(|| "-".to_string()),
                p.price.map_or_else(|| "-".to_string(), |v| format!("{v:.2}")),
            ]
        })
        .collect();
    print_rows(format, &["PART NUMBER", "NAME", "CATEGORY", "PRICE"], rows);
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Status]");
                println!("  Due window (days):  {}", config.status.due_window_days);
                println!();
                println!("[Catalog]");
                println!("  Search limit:       {}", config.catalog.search_limit);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path)).context("configuration is invalid")?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}

fn print_counts(summary: &hangar::StatusSummary) {
    for status in hangar::MaintenanceStatus::ALL {
        println!("  {:<8} {}", status.as_str(), summary.count(status));
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Tab-separated rows for `Plain`, aligned columns under a header for `Table`.
fn print_rows(format: OutputFormat, headers: &[&str], rows: Vec<Vec<String>>) {
    if format == OutputFormat::Plain {
        for row in rows {
            println!("{}", row.join("\t"));
        }
        return;
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!(
        "{}",
        render(headers.iter().map(ToString::to_string).collect())
    );
    for row in rows {
        println!("{}", render(row));
    }
}

fn date(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

fn opt_date(at: Option<DateTime<Utc>>) -> String {
    at.as_ref().map_or_else(|| "-".to_string(), date)
}
