use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Tessera geospatial API command-line tool
#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API host as host:port (port 443 selects HTTPS)
    #[arg(long, env = "TESSERA_HOST", global = true)]
    host: Option<String>,

    /// API key identifier
    #[arg(long, env = "TESSERA_KEY_ID", global = true)]
    key_id: Option<String>,

    /// API secret key
    #[arg(long, env = "TESSERA_SECRET_KEY", global = true)]
    secret_key: Option<String>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "TESSERA_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List layers
    Layers {
        /// Only show layers with this exact name
        #[arg(long)]
        name: Option<String>,

        /// Stop after this many layers
        #[arg(long)]
        limit: Option<u64>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Create a layer
    CreateLayer {
        /// Layer name
        #[arg(long)]
        name: String,

        /// Spatial reference system identifier
        #[arg(long)]
        srid: Option<u32>,

        /// Geometry dimensions (2 or 3)
        #[arg(long)]
        dims: Option<u8>,

        /// User field as name:type or name:type:size (repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,
    },

    /// Delete one layer, or every layer with --all
    DeleteLayer {
        /// Layer uuid
        #[arg(conflicts_with = "all")]
        uuid: Option<String>,

        /// Delete every layer on the account
        #[arg(long)]
        all: bool,
    },

    /// List a layer's features as GeoJSON
    Features {
        /// Layer uuid
        #[arg(short, long)]
        layer: String,

        /// Stop after this many features
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Add features to a layer from a GeoJSON file
    AddFeatures {
        /// Layer uuid
        #[arg(short, long)]
        layer: String,

        /// GeoJSON file containing a FeatureCollection
        input: PathBuf,
    },

    /// Submit a task and wait for its results
    Run {
        /// Task operation name
        #[arg(short, long)]
        operation: String,

        /// Restrict the task to one layer
        #[arg(short, long)]
        layer: Option<String>,

        /// Extra task parameters as a JSON object
        #[arg(long)]
        extras: Option<String>,

        /// Poll interval in seconds
        #[arg(long, default_value = "5")]
        interval: u64,

        /// Fail on the first API error instead of keeping partial results
        #[arg(long)]
        strict: bool,
    },

    /// Import a geospatial data archive
    Import {
        /// Archive file (e.g. zipped shapefiles)
        path: PathBuf,

        /// Spatial reference system for the imported layers
        #[arg(long)]
        srid: Option<u32>,

        /// Source attribute to carry over as a user field (repeatable)
        #[arg(long = "dat-field")]
        dat_fields: Vec<String>,

        /// Poll interval in seconds
        #[arg(long, default_value = "5")]
        interval: u64,
    },
}

fn main() -> Result<()> {
    // Library diagnostics go to stderr so stdout stays parseable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tessera=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Layers { name, limit, json } => commands::layers::run(
            cli.host, cli.key_id, cli.secret_key, cli.config, name, limit, json,
        ),
        Commands::CreateLayer {
            name,
            srid,
            dims,
            fields,
        } => commands::create_layer::run(
            cli.host, cli.key_id, cli.secret_key, cli.config, name, srid, dims, fields,
        ),
        Commands::DeleteLayer { uuid, all } => commands::delete_layer::run(
            cli.host, cli.key_id, cli.secret_key, cli.config, uuid, all,
        ),
        Commands::Features { layer, limit } => commands::features::run(
            cli.host, cli.key_id, cli.secret_key, cli.config, layer, limit,
        ),
        Commands::AddFeatures { layer, input } => commands::add_features::run(
            cli.host, cli.key_id, cli.secret_key, cli.config, layer, input,
        ),
        Commands::Run {
            operation,
            layer,
            extras,
            interval,
            strict,
        } => commands::tasks::run(
            cli.host, cli.key_id, cli.secret_key, cli.config, operation, layer, extras, interval,
            strict,
        ),
        Commands::Import {
            path,
            srid,
            dat_fields,
            interval,
        } => commands::import::run(
            cli.host, cli.key_id, cli.secret_key, cli.config, path, srid, dat_fields, interval,
        ),
    }
}
