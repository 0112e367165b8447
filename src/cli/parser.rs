use clap::{Parser, Subcommand};

/// Command-line interface definition for optracker
/// CLI application to punch time against shop-floor operations with SQLite
#[derive(Parser)]
#[command(
    name = "optracker",
    version = env!("CARGO_PKG_VERSION"),
    about = "Operation time tracking: punch in/out on work units, follow progress and cost using SQLite",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Run in test mode (no config file update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Manage the configuration file (view or edit)
    Config {
        #[arg(long = "print", help = "Print the current configuration file")]
        print_config: bool,

        #[arg(long = "check", help = "Check configuration file for missing fields")]
        check: bool,

        #[arg(long = "migrate", help = "Run configuration file migrations if needed")]
        migrate: bool,

        #[arg(
            long = "edit",
            help = "Edit the configuration file (default editor: $EDITOR, or nano/notepad)"
        )]
        edit_config: bool,

        #[arg(
            long = "editor",
            help = "Specify the editor to use (vim, nano, or custom path)"
        )]
        editor: Option<String>,
    },

    /// Manage the database (migrations, integrity checks, etc.)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity")]
        check: bool,

        #[arg(long = "vacuum", help = "Optimize the database using VACUUM")]
        vacuum: bool,

        #[arg(long = "info", help = "Show database information")]
        info: bool,
    },

    /// Print or manage the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },

    /// Browse the catalogue of punchable units
    Units {
        #[arg(long = "show", value_name = "UNIT", help = "Show one unit (op:<id>, task:<id> or legacy id)")]
        show: Option<String>,

        #[arg(long = "json", help = "Print as JSON")]
        json: bool,
    },

    /// List active employees, or open projects with --projects
    Directory {
        #[arg(long = "projects", help = "List open projects instead of employees")]
        projects: bool,
    },

    /// Open, close or inspect a punch
    Punch {
        #[command(subcommand)]
        action: PunchAction,
    },

    /// Punch history, newest first
    History {
        #[arg(long = "employee", short = 'e', help = "Only this employee")]
        employee: Option<i64>,

        #[arg(long = "days", short = 'd', default_value_t = 7, help = "Look-back window in days")]
        days: i64,

        #[arg(long = "json", help = "Print as JSON")]
        json: bool,
    },

    /// Aggregated reports
    Report {
        #[command(subcommand)]
        kind: ReportKind,

        #[arg(long = "json", global = true, help = "Print as JSON")]
        json: bool,
    },

    /// Delete punch history (asks for confirmation unless --yes)
    Purge {
        #[command(subcommand)]
        scope: PurgeScope,

        #[arg(long = "backup", global = true, help = "Write a backup of the deleted rows first")]
        backup: bool,

        #[arg(long = "yes", short = 'y', global = true, help = "Do not ask for confirmation")]
        yes: bool,
    },

    /// Check tracker data for problems and optionally repair them
    Diag {
        #[arg(long = "fix-orphans", help = "Detach entries from deleted work orders")]
        fix_orphans: bool,

        #[arg(long = "promote-tasks", help = "Create operations for task lines that have none")]
        promote_tasks: bool,

        #[arg(long = "json", help = "Print as JSON")]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum PunchAction {
    /// Open a session
    In {
        employee: i64,

        #[arg(long = "unit", short = 'u', help = "Unit to punch on (op:<id>, task:<id> or legacy id)")]
        unit: Option<String>,

        #[arg(
            long = "project",
            short = 'p',
            conflicts_with = "unit",
            help = "Project of a general (unit-less) punch"
        )]
        project: Option<i64>,

        #[arg(long = "notes", short = 'n', default_value = "")]
        notes: String,

        #[arg(long = "at", help = "Punch time (YYYY-MM-DD HH:MM[:SS]), default now")]
        at: Option<String>,
    },

    /// Close the open session
    Out {
        employee: i64,

        #[arg(long = "notes", short = 'n')]
        notes: Option<String>,

        #[arg(long = "at", help = "Punch time (YYYY-MM-DD HH:MM[:SS]), default now")]
        at: Option<String>,
    },

    /// Show the open session, if any
    Status { employee: i64 },
}

#[derive(Subcommand)]
pub enum ReportKind {
    /// Totals of one day
    Daily {
        #[arg(long = "date", help = "Day (YYYY-MM-DD), default today")]
        date: Option<String>,
    },

    /// Statistics of one employee
    Employee {
        id: i64,

        #[arg(long = "days", short = 'd', default_value_t = 30)]
        days: i64,
    },

    /// Totals of one project
    Project { id: i64 },

    /// Time booked on one unit against its estimate
    Unit { unit: String },

    /// Tracker-wide counters
    Stats,

    /// Work centers per department and the time booked on them
    WorkCenters,

    /// Everyone currently punched in
    Active,
}

#[derive(Subcommand)]
pub enum PurgeScope {
    /// Every session
    All,

    /// Sessions punched in within a date range
    Range {
        #[arg(value_name = "FROM:TO", help = "YYYY-MM-DD:YYYY-MM-DD or a single day")]
        range: String,
    },

    /// Every session of one employee
    Employee { id: i64 },

    /// Closed sessions older than N days (open ones are never touched)
    OlderThan { days: i64 },

    /// Sessions pointing at deleted employees, projects, operations or work orders
    Orphans,

    /// Re-import a backup written by a previous purge
    Restore {
        #[arg(value_name = "FILE")]
        file: String,
    },
}
