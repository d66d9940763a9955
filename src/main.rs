use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand, ValueEnum};
use scim_sql::{
    config::{CompilerConfig, ConfigError, LoggingConfig},
    observability,
    scim::ScimErrorResponse,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(version, about = "Compile SCIM filters into parameterized SQL", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to the resource configuration file
    #[arg(short, long, global = true, default_value = "scim-sql.toml")]
    config: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a filter for one resource and print the SQL and parameters
    Compile {
        /// Resource name from the config file (e.g. "users")
        #[arg(short, long)]
        resource: String,
        /// SCIM filter expression; omit for an unconditional query
        #[arg(short, long, default_value = "")]
        filter: String,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
    /// Validate the configuration file and list its resources
    CheckConfig,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct CompiledOutput<'a> {
    resource: &'a str,
    sql: String,
    params: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match CompilerConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            // Logging is configured by the file we failed to load
            let _ = observability::init_tracing(&LoggingConfig::default());
            tracing::error!(path = %args.config.display(), error = %e, "Failed to load config");
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = observability::init_tracing(&config.observability.logging) {
        eprintln!("{}", e);
    }

    let result = match args.command {
        Command::Compile {
            resource,
            filter,
            output,
        } => run_compile(&config, &resource, &filter, output),
        Command::CheckConfig => {
            check_config(&config);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn run_compile(
    config: &CompilerConfig,
    name: &str,
    filter: &str,
    output: OutputFormat,
) -> Result<(), String> {
    let resource = config.resource(name).map_err(|e: ConfigError| e.to_string())?;

    let (sql, params) = resource.render(filter).map_err(|e| {
        let response = ScimErrorResponse::from(e);
        match output {
            OutputFormat::Json => serde_json::to_string_pretty(&response)
                .unwrap_or_else(|_| response.detail.clone()),
            OutputFormat::Text if response.detail.is_empty() => {
                format!("Internal error (status {})", response.status)
            }
            OutputFormat::Text => response.detail,
        }
    })?;

    match output {
        OutputFormat::Text => {
            println!("{}", sql);
            for (i, param) in params.iter().enumerate() {
                println!("  [{}] {:?}", i + 1, param);
            }
        }
        OutputFormat::Json => {
            let compiled = CompiledOutput {
                resource: name,
                sql,
                params,
            };
            let json = serde_json::to_string_pretty(&compiled).map_err(|e| e.to_string())?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn check_config(config: &CompilerConfig) {
    for (name, resource) in &config.resources {
        println!(
            "{}: table={} joins={} attributes={}",
            name,
            resource.table,
            resource.joins.len(),
            resource.attributes.len()
        );
    }
    tracing::info!(resources = config.resources.len(), "Configuration is valid");
}
