//! postman: read and modify the resources of a BigPostman device.
//!
//! # Usage
//!
//! ```bash
//! postman --address 127.0.0.1:9000                  # list the root resource
//! postman get sensors/0
//! postman put config '{"name": "node-7"}'
//! postman put config settings.json                  # content from a file
//! postman post schedules '{"every": 60}'
//! postman delete schedules/3
//! ```

mod error;
mod json;
mod resource;

use bigpacks::Value;
use bigpostman::{ClientConfig, Method, PostmanClient};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use error::{CliError, CliResult};
use json::{sort_keys, value_to_json};
use resource::{load_content, parse_resource};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "postman")]
#[command(about = "Read and modify the resources of a BigPostman device", long_about = None)]
struct Args {
    /// Address of the serial-over-TCP bridge
    #[arg(short, long, default_value = "127.0.0.1:9000")]
    address: String,

    /// Seconds to wait for a response
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    /// Milliseconds to wait after connecting before the first request
    #[arg(long, default_value = "0")]
    settle_ms: u64,

    /// Pack request floats as doubles
    #[arg(long)]
    double: bool,

    /// Log raw frames
    #[arg(long)]
    debug: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a resource
    Get {
        /// Resource path, e.g. `sensors/0`
        resource: Option<String>,
        /// Query as inline JSON or a JSON file
        content: Option<String>,
    },
    /// Create a resource
    Post {
        resource: String,
        /// Inline JSON or a JSON file
        content: String,
    },
    /// Update a resource
    Put {
        resource: String,
        /// Inline JSON or a JSON file
        content: String,
    },
    /// Delete a resource
    Delete {
        resource: String,
        /// Query as inline JSON or a JSON file
        content: Option<String>,
    },
}

impl Command {
    fn into_parts(self) -> (Method, String, Option<String>) {
        match self {
            Command::Get { resource, content } => {
                (Method::Get, resource.unwrap_or_default(), content)
            }
            Command::Post { resource, content } => (Method::Post, resource, Some(content)),
            Command::Put { resource, content } => (Method::Put, resource, Some(content)),
            Command::Delete { resource, content } => (Method::Delete, resource, content),
        }
    }
}

fn action(method: Method) -> &'static str {
    match method {
        Method::Get => "read",
        Method::Post => "create",
        Method::Put => "update",
        Method::Delete => "delete",
    }
}

fn init_tracing(args: &Args) {
    let default = if args.verbose {
        "debug"
    } else if args.debug {
        "warn,bigpostman=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> CliResult<()> {
    let config = ClientConfig::default()
        .with_timeout(Duration::from_secs(args.timeout))
        .with_debug(args.debug)
        .with_double(args.double);

    let (method, resource, content, index) = match args.command {
        Some(command) => {
            let (method, resource, content) = command.into_parts();
            (method, resource, content, false)
        }
        None => (Method::Get, String::new(), None, true),
    };
    let path = parse_resource(&resource);
    let payload = content.as_deref().map(load_content).transpose()?;

    let mut client = PostmanClient::connect(args.address.as_str(), config)?;
    tracing::debug!(address = %args.address, "connected");
    if args.settle_ms > 0 {
        thread::sleep(Duration::from_millis(args.settle_ms));
    }

    let response = client
        .request(method, &path, payload.as_ref())
        .map_err(|source| CliError::Request {
            action: action(method),
            resource: resource.clone(),
            source,
        })?;
    let status = response.status();
    tracing::debug!(%method, %path, %status, "response");
    if status != method.expected_status() {
        return Err(CliError::UnexpectedStatus {
            action: action(method),
            resource,
            status,
        });
    }

    if method == Method::Get {
        let payload = response.payload.unwrap_or(Value::Null);
        if index {
            println!("{}", format_index(&payload)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&value_to_json(&payload))?);
        }
    }
    Ok(())
}

/// Render the root resource as JSON with every object's keys sorted.
fn format_index(payload: &Value) -> CliResult<String> {
    let json = sort_keys(&value_to_json(payload));
    Ok(format!(
        "Resource index:\n{}",
        serde_json::to_string_pretty(&json)?
    ))
}
