mod snapshot;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console_core::config::{execution_mode_from_env_value, id_strategy_from_env_value};
use console_core::constants::{ID_STRATEGY_ENV, MAX_WORKERS_ENV};
use console_core::{
    CopyType, CoreConfig, DoctorDirectory, DoctorFilter, DoctorId, InMemoryDirectory,
    NewSummarizer, SummarizerId, SummarizerStore, TransferError, TransferProgress,
    TransferReport, TransferRequest, TransferService,
};
use snapshot::Snapshot;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "summarizer-console")]
#[command(about = "Summarizer configuration console")]
struct Cli {
    /// YAML snapshot holding doctors and summarizers
    #[arg(long, global = true, env = "CONSOLE_DATA_FILE", default_value = "console-data.yaml")]
    data: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List doctors, optionally narrowed by practice or search text
    Doctors {
        #[arg(long)]
        practice: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// List a doctor's summarizers
    List {
        #[arg(long)]
        doctor: DoctorId,
    },
    /// Add a summarizer for a doctor
    Add {
        #[arg(long)]
        doctor: DoctorId,
        #[arg(long)]
        name: String,
        /// Resource handle within the doctor's EHR
        #[arg(long)]
        resource: Option<String>,
        /// Create the summarizer disabled
        #[arg(long)]
        inactive: bool,
    },
    /// Delete a summarizer
    Delete { id: SummarizerId },
    /// Enable or disable a summarizer
    Toggle { id: SummarizerId },
    /// Copy summarizer configurations from one doctor to others
    Transfer {
        /// Source doctor
        #[arg(long)]
        from: DoctorId,
        /// Target doctors (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        to: Vec<DoctorId>,
        /// summarizers, full or templates
        #[arg(long, default_value = "summarizers")]
        copy_type: CopyType,
        /// Summarizers to copy (comma-separated)
        #[arg(long, value_delimiter = ',')]
        select: Vec<SummarizerId>,
        /// Show the planned tasks without copying
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("console_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let execution_mode = execution_mode_from_env_value(std::env::var(MAX_WORKERS_ENV).ok())?;
    let id_strategy = id_strategy_from_env_value(std::env::var(ID_STRATEGY_ENV).ok())?;
    let cfg = Arc::new(CoreConfig::new(execution_mode, id_strategy)?);

    match cli.command {
        Some(command) => run(command, &cli.data, cfg),
        None => {
            println!("Use 'summarizer-console --help' for commands");
            Ok(())
        }
    }
}

fn run(command: Commands, data: &Path, cfg: Arc<CoreConfig>) -> anyhow::Result<()> {
    let snapshot = Snapshot::load(data)
        .with_context(|| format!("loading {}", data.display()))?;
    let directory = InMemoryDirectory::new(snapshot.doctors.clone())?;
    let mut store = SummarizerStore::from_records(snapshot.summarizers, cfg.id_generator())?;

    match command {
        Commands::Doctors { practice, search } => {
            let doctors = DoctorFilter { practice, search }.apply(&directory.doctors());
            if doctors.is_empty() {
                println!("No doctors found.");
            }
            for doctor in doctors {
                println!(
                    "ID: {}, Name: {}, EHR: {}, Practice: {}",
                    doctor.id,
                    doctor.name,
                    doctor.ehr,
                    doctor.practice.as_deref().unwrap_or("-")
                );
            }
            return Ok(());
        }
        Commands::List { doctor } => {
            let summarizers = store.list_by_doctor(&doctor);
            if summarizers.is_empty() {
                println!("No summarizers found for {doctor}.");
            }
            for s in summarizers {
                println!(
                    "ID: {}, Name: {}, EHR: {}, Resource: {}, Active: {}",
                    s.id,
                    s.name,
                    s.ehr,
                    s.selected_resource.as_deref().unwrap_or("-"),
                    s.active
                );
            }
            return Ok(());
        }
        Commands::Add {
            doctor,
            name,
            resource,
            inactive,
        } => {
            let owner = directory
                .doctor(&doctor)
                .with_context(|| format!("unknown doctor {doctor}"))?;
            let mut new = NewSummarizer::new(owner.id, owner.name, owner.ehr)
                .with_name(name)
                .with_active(!inactive);
            if let Some(resource) = resource {
                new = new.with_resource(resource);
            }
            let id = store.add(new)?;
            println!("Added summarizer with ID: {id}");
        }
        Commands::Delete { id } => {
            if store.delete(&id) {
                println!("Deleted summarizer {id}");
            } else {
                println!("Summarizer {id} not found, nothing to delete");
            }
        }
        Commands::Toggle { id } => match store.toggle_active(&id) {
            Some(active) => println!("Summarizer {id} is now {}", if active { "active" } else { "inactive" }),
            None => println!("Summarizer {id} not found"),
        },
        Commands::Transfer {
            from,
            to,
            copy_type,
            select,
            dry_run,
        } => {
            let request = TransferRequest {
                source_doctor_id: from,
                selected_summarizer_ids: select,
                target_doctor_ids: to,
                copy_type,
            };
            let service = TransferService::new(cfg);

            if dry_run {
                let plan = service
                    .preview(&store, &directory, &request)
                    .map_err(transfer_failure)?;
                println!("{} task(s) planned", plan.len());
                for task in plan.tasks() {
                    println!(
                        "  {} -> {} ({})",
                        task.source_summarizer_id(),
                        task.target_doctor_id(),
                        task.target_ehr()
                    );
                }
                return Ok(());
            }

            let show_progress = |p: TransferProgress| {
                println!("[{:>3}%] {}/{}", p.percentage(), p.current, p.total);
            };
            let report = service
                .transfer(&mut store, &directory, &request, Some(&show_progress), None)
                .map_err(transfer_failure)?;
            print_report(&report);
        }
    }

    let snapshot = Snapshot {
        doctors: snapshot.doctors,
        summarizers: store.into_records(),
    };
    snapshot
        .save(data)
        .with_context(|| format!("saving {}", data.display()))?;

    Ok(())
}

/// Points the user at the listing commands when a transfer names something unknown.
fn transfer_failure(err: TransferError) -> anyhow::Error {
    let hint = match &err {
        TransferError::DoctorNotFound(_) => Some("run `summarizer-console doctors` to see known doctors"),
        e if e.is_not_found() => Some("run `summarizer-console list --doctor <ID>` to see summarizers"),
        _ => None,
    };
    match hint {
        Some(hint) => anyhow::Error::new(err).context(hint),
        None => err.into(),
    }
}

fn print_report(report: &TransferReport) {
    println!(
        "Copied {} of {} ({} failed)",
        report.succeeded,
        report.total,
        report.failed_count()
    );
    if report.was_cancelled() {
        println!("Cancelled after {} task(s)", report.processed);
    }
    for failure in &report.failed {
        println!(
            "  #{} {} -> {}: {}",
            failure.index + 1,
            failure.task.source_summarizer_id(),
            failure.task.target_doctor_id(),
            failure.reason
        );
    }
}
