use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod db;
mod enrollment;
mod error;
mod fields;
mod gpa;
mod grades;
mod models;
mod report;
mod store;

use auth::{AuthContext, Role};
use store::Stores;

#[derive(Parser)]
#[command(name = "campus-registrar")]
#[command(about = "Grade reporting and course registration for the campus registrar", long_about = None)]
struct Cli {
    /// Identity the command runs as
    #[arg(long, global = true, default_value = "registrar")]
    actor: String,

    #[arg(long, global = true, value_enum, default_value_t = Role::Registrar)]
    role: Role,

    /// Students a parent actor may see
    #[arg(long = "linked-student", global = true)]
    linked_students: Vec<String>,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample students, courses and graded work
    Seed,
    /// Import submissions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show per-subject grades for a student
    Grades {
        #[arg(long)]
        student: String,
    },
    /// Show the credit-weighted GPA for a student
    Gpa {
        #[arg(long)]
        student: String,
    },
    /// Register a student for a course
    Register {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
    },
    /// Remove a student from a course
    Unregister {
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
    },
    /// Write a markdown grade report
    Report {
        #[arg(long)]
        student: String,
        #[arg(long, default_value = "grade-report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = config::Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let auth = AuthContext::new(cli.actor.clone(), cli.role)
        .with_linked_students(cli.linked_students.clone());
    let stores = Stores::postgres(pool.clone());

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_submissions_csv(&pool, &csv).await?;
            println!("Inserted {inserted} submissions from {}.", csv.display());
        }
        Commands::Grades { student } => {
            let grades = grades::compute_grades(&stores, &auth, &student).await?;

            if grades.is_empty() {
                println!("No graded work found for {student}.");
                return Ok(());
            }

            println!("Subject grades for {student}:");
            for grade in &grades {
                println!(
                    "- {} ({}) {} [final {:.2}, quiz {:.2}, assign {:.2}] {:.1} credits",
                    grade.subject_name,
                    grade.subject_key,
                    grade.grade_value,
                    grade.breakdown.final_points,
                    grade.breakdown.quiz_points,
                    grade.breakdown.assign_points,
                    grade.credits
                );
            }
        }
        Commands::Gpa { student } => {
            let grades = grades::compute_grades(&stores, &auth, &student).await?;
            let gpa = gpa::compute_gpa(&grades);
            println!("GPA for {student}: {gpa:.2} across {} subjects", grades.len());
        }
        Commands::Register { student, course } => {
            let record =
                enrollment::register_student_to_course(&stores, &auth, &student, &course).await?;
            println!(
                "Registered {} for {} at {}.",
                record.student_id, record.course_code, record.registered_at
            );
        }
        Commands::Unregister { student, course } => {
            if enrollment::unregister_student_from_course(&stores, &auth, &student, &course).await? {
                println!("Removed {student} from {course}.");
            } else {
                println!("{student} was not registered for {course}.");
            }
        }
        Commands::Report { student, out } => {
            let grades = grades::compute_grades(&stores, &auth, &student).await?;
            enrollment::require_student(&stores, &student).await?;
            let gpa = gpa::compute_gpa(&grades);
            let status = enrollment::enrollment_status(&stores, &auth, &student).await?;
            let courses = stores.enrollments.list_by_student(&status.student_id).await?;

            let mut report = report::build_report(Utc::now().date_naive(), &grades, gpa, &status);
            report.push_str(&report::registered_courses_section(&courses));
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
