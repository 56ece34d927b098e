use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use university_allocation::api;
use university_allocation::config::Config;
use university_allocation::{AllocationManager, ModuleFilter, StaffId};

#[derive(Parser)]
#[command(name = "unialloc")]
#[command(about = "Allocate students and teaching staff to university modules")]
struct Cli {
    /// Snapshot file to load from and save to (overrides UNIALLOC_DATA)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Port for HTTP API (overrides UNIALLOC_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Add a student and print their record
    AddStudent {
        forename: String,
        surname: String,
        stage: u8,
    },
    /// Add a member of staff and print their record
    AddStaff { forename: String, surname: String },
    /// Add a module and print its record
    AddModule {
        name: String,
        credits: u8,
        stage: u8,
        capacity: u32,
        /// Staff ID of a member who teaches the module (repeatable)
        #[arg(long = "staff")]
        staff: Vec<String>,
    },
    /// Enrol a student on a module
    Enrol {
        student_id: String,
        module_code: String,
    },
    /// Remove a student from a module
    UnEnrol {
        student_id: String,
        module_code: String,
    },
    /// Permanently close a module
    Discontinue { module_code: String },
    RemoveStudent { student_id: String },
    /// Remove a member of staff and list the modules left without staff
    RemoveStaff { staff_id: String },
    AssignStaff {
        module_code: String,
        staff_id: String,
    },
    UnassignStaff {
        module_code: String,
        staff_id: String,
    },
    /// Print part of the store as JSON
    Show {
        #[arg(value_enum)]
        what: ShowTarget,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShowTarget {
    Students,
    Staff,
    Modules,
    Running,
    Available,
    Stats,
}

/// Initialize tracing with output to stderr (for store commands) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "university_allocation=info,tower_http=info".into()),
    );

    if use_stderr {
        // Store commands print JSON on stdout
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let serving = matches!(cli.command, None | Some(Commands::Serve { .. }));
    init_tracing(!serving);

    let port = match &cli.command {
        Some(Commands::Serve { port }) => *port,
        _ => None,
    };
    let config = Config::from_env()?.with_overrides(cli.data, port);

    match cli.command {
        None | Some(Commands::Serve { .. }) => serve(&config).await,
        Some(command) => run_command(&config.data_path, command),
    }
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let manager = api::shared(load_store(&config.data_path)?);
    let app = api::create_router(manager.clone());

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.port)).await?;
    tracing::info!(
        "Allocation server listening on http://127.0.0.1:{}",
        config.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down, saving snapshot");
    manager
        .lock()
        .expect("allocation store lock poisoned")
        .save(&config.data_path)?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

fn load_store(path: &Path) -> anyhow::Result<AllocationManager> {
    let mut manager = AllocationManager::new();
    if path.exists() {
        manager.load(path)?;
    } else {
        tracing::info!("No snapshot at {}, starting empty", path.display());
    }
    Ok(manager)
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Apply one store command, saving the snapshot if it changed anything.
fn run_command(data_path: &Path, command: Commands) -> anyhow::Result<()> {
    let mut manager = load_store(data_path)?;

    let changed = match command {
        Commands::Serve { .. } => unreachable!("serve is handled by the caller"),
        Commands::AddStudent {
            forename,
            surname,
            stage,
        } => {
            let id = manager.add_student(forename, surname, stage)?;
            print_json(&manager.student(id.as_str())?)?;
            true
        }
        Commands::AddStaff { forename, surname } => {
            let id = manager.add_staff(forename, surname)?;
            print_json(&manager.staff_member(id.as_str())?)?;
            true
        }
        Commands::AddModule {
            name,
            credits,
            stage,
            capacity,
            staff,
        } => {
            let staff_ids = staff
                .iter()
                .map(|id| StaffId::parse(id))
                .collect::<Result<Vec<_>, _>>()?;
            let code = manager.add_module_taught_by(name, credits, stage, capacity, &staff_ids)?;
            print_json(&manager.module(code.as_str())?)?;
            true
        }
        Commands::Enrol {
            student_id,
            module_code,
        } => {
            manager.enrol(&student_id, &module_code)?;
            print_json(&manager.student(&student_id)?)?;
            true
        }
        Commands::UnEnrol {
            student_id,
            module_code,
        } => {
            let removed = manager.un_enrol(&student_id, &module_code)?;
            print_json(&serde_json::json!({ "removed": removed }))?;
            removed
        }
        Commands::Discontinue { module_code } => {
            let was_running = !manager.module(&module_code)?.is_discontinued();
            manager.discontinue(&module_code)?;
            print_json(&manager.module(&module_code)?)?;
            was_running
        }
        Commands::RemoveStudent { student_id } => {
            let student = manager.student(&student_id)?;
            manager.remove_student(&student)?;
            print_json(&student)?;
            true
        }
        Commands::RemoveStaff { staff_id } => {
            let staff = manager.staff_member(&staff_id)?;
            let unstaffed = manager.remove_staff(&staff)?;
            print_json(&unstaffed)?;
            true
        }
        Commands::AssignStaff {
            module_code,
            staff_id,
        } => {
            manager.assign_staff(&module_code, &staff_id)?;
            print_json(&manager.module(&module_code)?)?;
            true
        }
        Commands::UnassignStaff {
            module_code,
            staff_id,
        } => {
            manager.unassign_staff(&module_code, &staff_id)?;
            print_json(&manager.module(&module_code)?)?;
            true
        }
        Commands::Show { what } => {
            match what {
                ShowTarget::Students => print_json(&manager.students())?,
                ShowTarget::Staff => print_json(&manager.staff())?,
                ShowTarget::Modules => print_json(&manager.filtered_modules(ModuleFilter::All))?,
                ShowTarget::Running => {
                    print_json(&manager.filtered_modules(ModuleFilter::Running))?
                }
                ShowTarget::Available => {
                    print_json(&manager.filtered_modules(ModuleFilter::Available))?
                }
                ShowTarget::Stats => print_json(&manager.stats())?,
            }
            false
        }
    };

    if changed {
        manager.save(data_path)?;
    }
    Ok(())
}
