mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Inspect and refactor form documents stored as JSON fixtures.
#[derive(Parser)]
#[command(name = "formdoc", version, about = "Form document inspection and refactoring")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log processing steps to stderr
    #[arg(long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Configuration file with global `Funktionen(...)` sections
    #[arg(long, global = true)]
    functions: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a configuration file and print it back
    Parse {
        /// Path to the configuration file
        file: PathBuf,
        /// Indent nested sections
        #[arg(long)]
        pretty: bool,
    },

    /// List the commands embedded in a document
    Commands {
        /// Path to the document fixture
        doc: PathBuf,
    },

    /// List field ids and where they are shown
    Fields {
        /// Path to the document fixture
        doc: PathBuf,
        /// Comma-separated schema ids; lists only ids outside the schema
        #[arg(long)]
        schema: Option<String>,
    },

    /// Reconcile stored values with what the document shows
    Preset {
        /// Path to the document fixture
        doc: PathBuf,
    },

    /// Set (or, without --value, remove) a field value and re-render
    Set {
        /// Path to the document fixture
        doc: PathBuf,
        #[arg(long)]
        id: String,
        #[arg(long)]
        value: Option<String>,
        /// Write the changed document back
        #[arg(long)]
        write: bool,
    },

    /// Replace a field by a pattern such as "<Vorname> <Nachname>"
    Substitute {
        /// Path to the document fixture
        doc: PathBuf,
        #[arg(long)]
        id: String,
        #[arg(long = "with")]
        pattern: String,
        /// Write the changed document back
        #[arg(long)]
        write: bool,
    },

    /// Remove generated transformations no field uses
    Gc {
        /// Path to the document fixture
        doc: PathBuf,
        /// Write the changed document back
        #[arg(long)]
        write: bool,
    },

    /// Evaluate a global function
    Eval {
        /// Function name
        #[arg(long)]
        name: String,
        /// Known value as id=value; repeatable
        #[arg(long = "value", value_name = "ID=VALUE")]
        values: Vec<String>,
        /// Feed this one value to every parameter instead
        #[arg(long, conflicts_with = "values")]
        broadcast: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let ctx = commands::Context::new(cli.functions.as_deref(), cli.output, cli.quiet);
    match cli.command {
        Commands::Parse { file, pretty } => commands::parse::cmd_parse(&ctx, &file, pretty),
        Commands::Commands { doc } => commands::inspect::cmd_commands(&ctx, &doc),
        Commands::Fields { doc, schema } => {
            commands::inspect::cmd_fields(&ctx, &doc, schema.as_deref())
        }
        Commands::Preset { doc } => commands::inspect::cmd_preset(&ctx, &doc),
        Commands::Set {
            doc,
            id,
            value,
            write,
        } => commands::edit::cmd_set(&ctx, &doc, &id, value.as_deref(), write),
        Commands::Substitute {
            doc,
            id,
            pattern,
            write,
        } => commands::edit::cmd_substitute(&ctx, &doc, &id, &pattern, write),
        Commands::Gc { doc, write } => commands::edit::cmd_gc(&ctx, &doc, write),
        Commands::Eval {
            name,
            values,
            broadcast,
        } => commands::eval::cmd_eval(&ctx, &name, &values, broadcast.as_deref()),
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else if quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::WARN
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: logging is already initialized");
    }
}

/// Print an error message (honouring --quiet and --output) and exit 1.
pub(crate) fn fail(msg: &str, output: OutputFormat, quiet: bool) -> ! {
    report_error(msg, output, quiet);
    process::exit(1);
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
