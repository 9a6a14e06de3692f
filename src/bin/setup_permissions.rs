//! Inspect and request Calendar/Reminders access from a terminal.
//!
//! Run this once from the app that will host the MCP server so the consent
//! prompts appear against the right TCC client.

use eventkit_mcp::config::ServerConfig;
use eventkit_mcp::error::EventKitError;
use eventkit_mcp::permissions::{EntityCategory, PermissionGate, PermissionReport};
use eventkit_mcp::platform;

fn main() {
    if let Err(e) = run() {
        eprintln!("eventkit-setup failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> eventkit_mcp::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let gate = PermissionGate::new(platform::create_authorization_backend());
    match args[1].as_str() {
        "status" => {
            print_report(&gate.report());
            Ok(())
        }
        "request" => request_missing(&gate),
        "repair-calendar" => {
            if args.len() != 3 {
                return Err(EventKitError::Config(
                    "repair-calendar requires a TCC client identifier".to_owned(),
                ));
            }
            repair_calendar(&args[2])
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => Err(EventKitError::Config(format!(
            "unknown subcommand `{other}` (use status|request|repair-calendar)"
        ))),
    }
}

fn request_missing(gate: &PermissionGate) -> eventkit_mcp::Result<()> {
    let config = ServerConfig::load_or_default(&ServerConfig::default_config_path())?;
    let timeout = config.permissions.request_timeout();

    for &category in EntityCategory::all() {
        let check = gate.check(category);
        if check.authorized {
            println!("{category}: already authorized");
            continue;
        }
        if !check.can_request {
            println!(
                "{category}: {} (cannot prompt again, change it in System Settings)",
                check.status
            );
            continue;
        }
        println!(
            "{category}: requesting access, waiting up to {}s...",
            timeout.as_secs()
        );
        let status = gate.request_and_wait(category, timeout);
        println!("{category}: {status}");
    }

    println!();
    print_report(&gate.report());
    Ok(())
}

#[cfg(feature = "tcc-repair")]
fn repair_calendar(client: &str) -> eventkit_mcp::Result<()> {
    let config = ServerConfig::load_or_default(&ServerConfig::default_config_path())?;
    let database = config
        .permissions
        .tcc_database
        .or_else(eventkit_mcp::app_dirs::user_tcc_database)
        .ok_or_else(|| EventKitError::Tcc("cannot locate the user TCC database".to_owned()))?;

    let outcome = eventkit_mcp::permissions::tcc::repair_calendar_grant(&database, client)
        .map_err(|e| EventKitError::Tcc(e.to_string()))?;
    println!("{client}: {outcome:?}");
    Ok(())
}

#[cfg(not(feature = "tcc-repair"))]
fn repair_calendar(_client: &str) -> eventkit_mcp::Result<()> {
    Err(EventKitError::Config(
        "this build was compiled without the `tcc-repair` feature".to_owned(),
    ))
}

fn print_report(report: &PermissionReport) {
    println!(
        "calendar\t{}\tauthorized={}\tcan_request={}",
        report.calendar.status, report.calendar.authorized, report.calendar.can_request
    );
    println!(
        "reminders\t{}\tauthorized={}\tcan_request={}",
        report.reminders.status, report.reminders.authorized, report.reminders.can_request
    );
    for line in report.instructions.iter().flatten() {
        println!("  {line}");
    }
}

fn print_usage() {
    println!("usage: eventkit-setup <status|request|repair-calendar <client>>");
}
