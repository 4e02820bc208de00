//! ontap-perf
//!
//! Command-line front end for the ONTAP adapter: probes an array, lists its
//! inventory and countable objects, and collects performance counters,
//! printing JSON on stdout.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ontap_perf::{
    ArrayConfig, CollectionPlan, Error, FieldFilter, InstanceId, MultiArrayCollector, Result,
    Scheme, Session,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Inventory and performance counters from ONTAP arrays
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    array: ArrayArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct ArrayArgs {
    /// YAML file with the array configuration (overrides the flags below)
    #[arg(long, env = "ONTAP_CONFIG")]
    config: Option<PathBuf>,

    /// Device address
    #[arg(long, env = "ONTAP_DEVICE")]
    device: Option<String>,

    /// Admin user
    #[arg(long, env = "ONTAP_USER", default_value = "admin")]
    user: String,

    /// Password
    #[arg(long, env = "ONTAP_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Per-call timeout in seconds
    #[arg(long, env = "ONTAP_TIMEOUT")]
    timeout: Option<u64>,

    /// Namespace (vserver) selector
    #[arg(long, env = "ONTAP_VSERVER")]
    vserver: Option<String>,

    /// Records requested per page
    #[arg(long, env = "ONTAP_MAX_RECORDS", default_value_t = ontap_perf::DEFAULT_MAX_RECORDS)]
    max_records: u32,

    /// Use plain HTTP instead of HTTPS
    #[arg(long)]
    http: bool,

    /// Port override
    #[arg(long)]
    port: Option<u16>,

    /// Accept self-signed certificates
    #[arg(long)]
    insecure: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show dialect and version
    Version,
    /// List countable objects
    Objects,
    /// List the counters of an object
    Counters { object: String },
    /// Enumerate the instances of an object
    Instances {
        object: String,
        /// Server-side filter (clustered arrays only)
        #[arg(long)]
        filter: Option<String>,
    },
    /// Collect counters of an object
    Collect {
        object: String,
        /// Counter to collect (repeatable; all when omitted)
        #[arg(short = 'c', long = "counter")]
        counters: Vec<String>,
        /// Instance to collect (repeatable; all enumerated instances when omitted)
        #[arg(short = 'i', long = "instance")]
        instances: Vec<String>,
    },
    /// Collect counters from every array listed in a YAML file
    Fleet {
        /// YAML list of array configurations
        arrays: PathBuf,
        object: String,
        #[arg(short = 'c', long = "counter")]
        counters: Vec<String>,
    },
    /// List LUNs
    Luns {
        #[arg(long = "field")]
        fields: Vec<String>,
    },
    /// List volumes
    Volumes {
        #[arg(long = "field")]
        fields: Vec<String>,
    },
    /// List aggregates
    Aggregates {
        #[arg(long = "field")]
        fields: Vec<String>,
    },
}

impl ArrayArgs {
    fn to_config(&self) -> Result<ArrayConfig> {
        if let Some(path) = &self.config {
            return ArrayConfig::from_yaml_file(path);
        }
        let device = self
            .device
            .clone()
            .ok_or_else(|| Error::Configuration("--device or --config is required".into()))?;

        let mut config = ArrayConfig::new(device, self.user.clone(), self.password.clone());
        config.timeout_secs = self.timeout;
        config.vserver = self.vserver.clone();
        config.max_records = self.max_records;
        config.transport.port = self.port;
        config.transport.accept_invalid_certs = self.insecure;
        if self.http {
            config.transport.scheme = Scheme::Http;
        }
        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    info!("Starting ontap-perf {}", ontap_perf::VERSION);

    match &args.command {
        Command::Version => {
            let session = open_session(&args.array).await?;
            print_json(session.version())
        }
        Command::Objects => {
            let session = open_session(&args.array).await?;
            print_json(&session.list_objects().await?)
        }
        Command::Counters { object } => {
            let session = open_session(&args.array).await?;
            print_json(&session.list_counters(object).await?)
        }
        Command::Instances { object, filter } => {
            let session = open_session(&args.array).await?;
            let outcome = session.enumerate_instances(object, filter.as_deref()).await?;
            report_release(&outcome.release_error);
            print_json(&outcome.value)
        }
        Command::Collect {
            object,
            counters,
            instances,
        } => {
            let session = open_session(&args.array).await?;
            let instances: Vec<InstanceId> = if instances.is_empty() {
                let outcome = session.enumerate_instances(object, None).await?;
                report_release(&outcome.release_error);
                outcome.value
            } else {
                instances.iter().map(|i| InstanceId::from(i.as_str())).collect()
            };
            let outcome = session.collect_counters(object, &instances, counters).await?;
            report_release(&outcome.release_error);
            print_json(&outcome.value)
        }
        Command::Fleet {
            arrays,
            object,
            counters,
        } => run_fleet(arrays, object, counters).await,
        Command::Luns { fields } => {
            let session = open_session(&args.array).await?;
            print_json(&session.list_luns(field_filter(fields).as_ref()).await?)
        }
        Command::Volumes { fields } => {
            let session = open_session(&args.array).await?;
            print_json(&session.list_volumes(field_filter(fields).as_ref()).await?)
        }
        Command::Aggregates { fields } => {
            let session = open_session(&args.array).await?;
            print_json(&session.list_aggregates(field_filter(fields).as_ref()).await?)
        }
    }
}

async fn open_session(array: &ArrayArgs) -> Result<Session> {
    let config = array.to_config()?;
    Session::connect(&config).await
}

/// Collect one object's counters from every array in `arrays`, keyed by device
async fn run_fleet(arrays: &Path, object: &str, counters: &[String]) -> Result<()> {
    let configs = ArrayConfig::list_from_yaml_file(arrays)?;
    info!("Collecting {} from {} arrays", object, configs.len());
    let collector = MultiArrayCollector::new(CollectionPlan {
        object: object.to_string(),
        counters: counters.to_vec(),
        instance_filter: None,
    });

    let mut output = serde_json::Map::new();
    for report in collector.collect_from_configs(configs).await {
        let value = match report.outcome {
            Ok(collection) => serde_json::to_value(&collection)?,
            Err(e) => {
                warn!("{}: {}", report.device, e);
                serde_json::json!({ "error": e.to_string() })
            }
        };
        output.insert(report.device, value);
    }
    print_json(&serde_json::Value::Object(output))
}

fn field_filter(fields: &[String]) -> Option<FieldFilter> {
    if fields.is_empty() {
        None
    } else {
        Some(FieldFilter::new(fields.iter().cloned()))
    }
}

fn report_release(release_error: &Option<Error>) {
    if let Some(e) = release_error {
        warn!("Iterator was not released cleanly: {}", e);
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    // logs go to stderr so stdout stays valid JSON
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
