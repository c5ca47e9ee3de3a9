use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use student_records::{
    logging, Grades, LogConfig, NewStudent, RecordStore, Student, StoreConfig,
};

/// Admin CLI for the student records database
#[derive(Debug, Parser)]
#[command(name = "student-records", version)]
struct Cli {
    #[command(flatten)]
    store: StoreConfig,

    #[command(flatten)]
    log: LogConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database and schema if missing
    Init,
    /// Drop every record and recreate the schema
    Reset,
    /// Load the five sample students
    Demo,
    /// List all students by name
    List,
    /// List admitted students, best average first
    Admitted,
    /// Show totals
    Stats,
    /// Show one student
    Show { identity: String },
    /// Register a student
    Add {
        identity: String,
        last_name: String,
        first_name: String,
        age: u32,
        track: String,
        #[arg(long)]
        math: Option<f64>,
        #[arg(long)]
        physics: Option<f64>,
        #[arg(long)]
        info: Option<f64>,
    },
    /// Replace a student's grades
    Grades {
        identity: String,
        #[arg(long)]
        math: Option<f64>,
        #[arg(long)]
        physics: Option<f64>,
        #[arg(long)]
        info: Option<f64>,
    },
    /// Delete a student
    Remove { identity: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _logger = logging::init_logging(&cli.log)?;

    let store = RecordStore::open(&cli.store.database)
        .with_context(|| format!("failed to open {}", cli.store.database.display()))?;

    run(&store, cli.command)
}

fn run(store: &RecordStore, command: Command) -> Result<()> {
    match command {
        Command::Init => {
            println!("✓ Database ready ({} students)", store.count_all()?);
        }
        Command::Reset => {
            store.reset()?;
            println!("✓ Database reset");
        }
        Command::Demo => {
            let report = store.load_demo_data()?;
            for id in &report.inserted {
                println!("✓ Added {}", id);
            }
            for id in &report.skipped {
                println!("⚠️  {} already exists, skipped", id);
            }
        }
        Command::List => print_students(&store.list_all()?),
        Command::Admitted => print_students(&store.list_admitted()?),
        Command::Stats => {
            let stats = store.stats()?;
            println!("Total:    {}", stats.total);
            println!("Admitted: {}", stats.admitted);
        }
        Command::Show { identity } => match store.find_student(&identity)? {
            Some(student) => println!("{}", serde_json::to_string_pretty(&student)?),
            None => anyhow::bail!("no student with identity {}", identity),
        },
        Command::Add {
            identity,
            last_name,
            first_name,
            age,
            track,
            math,
            physics,
            info,
        } => {
            let new = NewStudent::new(&identity, &last_name, &first_name, age, &track)
                .with_grades(Grades::new(math, physics, info));
            let student = store.add_student(&new)?;
            println!(
                "✓ Added {} ({}), average: {}",
                student.full_name(),
                student.identity,
                format_average(student.average)
            );
        }
        Command::Grades {
            identity,
            math,
            physics,
            info,
        } => {
            let student = store.update_grades(&identity, Grades::new(math, physics, info))?;
            println!(
                "✓ Grades updated for {}, average: {}",
                student.identity,
                format_average(student.average)
            );
        }
        Command::Remove { identity } => {
            let removed = store.remove_student(&identity)?;
            println!("✓ Removed {} {} ({})", removed.first_name, removed.last_name, identity);
        }
    }

    Ok(())
}

fn print_students(students: &[Student]) {
    println!(
        "{:<10} {:<16} {:<16} {:>4} {:<16} {:>7}",
        "CIN", "Last name", "First name", "Age", "Track", "Average"
    );
    for s in students {
        println!(
            "{:<10} {:<16} {:<16} {:>4} {:<16} {:>7}",
            s.identity,
            s.last_name,
            s.first_name,
            s.age,
            s.track,
            format_average(s.average)
        );
    }
    println!("({} students)", students.len());
}

fn format_average(average: Option<f64>) -> String {
    average.map_or_else(|| "-".to_string(), |avg| format!("{:.2}", avg))
}
