use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod analytics;
mod cell;
mod columns;
mod config;
mod error;
mod export;
mod ingest;
mod models;
mod report;
mod risk;
mod store;
mod teachers;
mod tracking;

use models::PeriodScope;
use store::Store;

#[derive(Parser)]
#[command(name = "gradebook-completion")]
#[command(about = "Grade entry completion tracker for school gradebook exports", long_about = None)]
struct Cli {
    /// Directory holding the saved summary, teacher assignments and snapshot
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the state directory
    Init,
    /// Merge gradebook exports into the saved summary
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Replace the teacher assignments from a workbook or CSV file
    Teachers { file: PathBuf },
    /// Completion totals across classes
    Stats {
        #[arg(long, value_enum, default_value_t = PeriodScope::Both)]
        period: PeriodScope,
    },
    /// Class by subject completion matrix with trend since the baseline
    Heatmap {
        #[arg(long, value_enum, default_value_t = PeriodScope::Both)]
        period: PeriodScope,
    },
    /// Make the current summary the new trend baseline
    SnapshotReset,
    /// Students missing grades in three or more subjects
    Lost {
        #[arg(long, value_enum, default_value_t = PeriodScope::Both)]
        period: PeriodScope,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Per-class student tracking sheets
    Tracking {
        #[arg(long, value_enum, default_value_t = PeriodScope::Both)]
        period: PeriodScope,
        #[arg(long)]
        per_page: Option<usize>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, value_enum, default_value_t = PeriodScope::Both)]
        period: PeriodScope,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write the rollup and lost-student tables as CSV
    Export {
        #[arg(long, default_value = "export")]
        out_dir: PathBuf,
    },
    /// Clear the saved summary
    Reset,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = config::Config::from_env()?;
    let store = Store::new(cli.state_dir.unwrap_or(config.state_dir));

    match cli.command {
        Commands::Init => {
            store.init()?;
            println!("State directory ready at {}.", store.dir().display());
        }
        Commands::Ingest { files } => {
            let mut summary = store.load_summary()?;
            let outcome = ingest::ingest_files(&files, &mut summary).await;
            store.save_summary(&summary)?;

            for file in &outcome.files {
                match &file.result {
                    Ok(sheet) => println!(
                        "- {}: {} / {} ({} subjects, {} rows)",
                        file.path.display(),
                        sheet.grade,
                        sheet.section,
                        sheet.subjects,
                        sheet.stats.rows_used
                    ),
                    Err(err) => println!("- {}: skipped, {err}", file.path.display()),
                }
            }
            println!(
                "Merged {} of {} files ({} skipped).",
                outcome.succeeded(),
                outcome.files.len(),
                outcome.failed()
            );
        }
        Commands::Teachers { file } => {
            let mapping = teachers::load_assignment(&file)?;
            store.save_teachers(&mapping)?;
            println!("Loaded teacher assignments for {} grades.", mapping.grades.len());
        }
        Commands::Stats { period } => {
            let summary = store.load_summary()?;
            let teachers = store.load_teachers()?;
            let stats = analytics::rollup_stats(&summary, &teachers, period);

            println!("Completion for {}:", period.label());
            println!(
                "- {}% recorded ({} recorded, {} not recorded)",
                stats.percentage, stats.recorded, stats.not_recorded
            );
            println!("- {} students", stats.student_count);
            println!("- {} subjects", stats.subject_count);
            println!("- {} teachers", stats.teacher_count);
            println!("- {} classes", stats.class_count);
        }
        Commands::Heatmap { period } => {
            let summary = store.load_summary()?;
            let snapshot = store.observe_snapshot(&summary)?;

            let heatmap = analytics::heatmap(&summary, snapshot.as_ref(), period);
            if heatmap.rows.is_empty() {
                println!("No gradebooks ingested yet.");
                return Ok(());
            }
            for row in &heatmap.rows {
                println!("{} / {}", row.grade, row.section);
                for subject in &heatmap.subjects {
                    let Some(cell) = row.cells.get(subject) else {
                        continue;
                    };
                    let trend = cell
                        .trend()
                        .map(|delta| format!(" ({delta:+})"))
                        .unwrap_or_default();
                    println!(
                        "  {subject}: {}% [{}]{trend}",
                        cell.current,
                        cell.band().label()
                    );
                }
            }
        }
        Commands::SnapshotReset => {
            let summary = store.load_summary()?;
            let mut snapshot = store.load_snapshot()?;
            analytics::reset_snapshot(&mut snapshot, &summary);
            if let Some(snapshot) = &snapshot {
                store.save_snapshot(snapshot)?;
            }
            println!("Trend baseline reset.");
        }
        Commands::Lost { period, limit } => {
            let summary = store.load_summary()?;
            let lost = risk::lost_students(&summary, period);

            if lost.is_empty() {
                println!(
                    "No students missing grades in {} or more subjects.",
                    risk::LOST_THRESHOLD
                );
                return Ok(());
            }

            println!("Students missing grades ({}):", lost.len());
            for student in lost.iter().take(limit) {
                println!(
                    "- {} ({} / {}) missing {}: {}",
                    student.name,
                    student.grade,
                    student.section,
                    student.missing_count,
                    student.missing_subjects.join(", ")
                );
            }
        }
        Commands::Tracking { period, per_page } => {
            let summary = store.load_summary()?;
            let per_page = per_page.unwrap_or(config.students_per_page);
            let pages = tracking::tracking_pages(&summary, period, per_page);

            for page in &pages {
                println!(
                    "{} / {} - {} period - page {} of {}",
                    page.grade, page.section, page.period, page.page, page.total_pages
                );
                println!("  #, student, {}", page.subjects.join(", "));
                for (offset, student) in page.students.iter().enumerate() {
                    let marks: Vec<&str> = page
                        .subjects
                        .iter()
                        .map(|subject| match tracking::status(&summary, page, subject, student) {
                            Some(true) => "yes",
                            Some(false) => "no",
                            None => "-",
                        })
                        .collect();
                    println!(
                        "  {}, {}, {}",
                        page.start_index + offset + 1,
                        student,
                        marks.join(", ")
                    );
                }
            }
        }
        Commands::Report { period, out } => {
            let summary = store.load_summary()?;
            let teachers = store.load_teachers()?;
            let snapshot = store.observe_snapshot(&summary)?;
            let report = report::build_report(
                &summary,
                &teachers,
                snapshot.as_ref(),
                period,
                chrono::Utc::now(),
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { out_dir } => {
            let summary = store.load_summary()?;
            let teachers = store.load_teachers()?;
            let rollup = report::rollup_rows(&summary, &teachers);
            let lost = risk::lost_students(&summary, PeriodScope::Both);
            let (rollup_path, lost_path) = export::export_all(&out_dir, &rollup, &lost)?;
            println!(
                "Exported {} rollup rows to {} and {} students to {}.",
                rollup.len(),
                rollup_path.display(),
                lost.len(),
                lost_path.display()
            );
        }
        Commands::Reset => {
            store.save_summary(&models::Summary::default())?;
            println!("Summary cleared.");
        }
    }

    Ok(())
}
