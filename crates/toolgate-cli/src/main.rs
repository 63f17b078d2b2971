// crates/toolgate-cli/src/main.rs
// ============================================================================
// Module: Toolgate CLI Entry Point
// Description: Command dispatcher for the Toolgate MCP gateway.
// Purpose: Provide config validation, tool inspection, and server startup.
// Dependencies: clap, serde_json, tokio, toolgate-mcp
// ============================================================================

//! ## Overview
//! The Toolgate CLI loads the gateway configuration and either validates
//! it, prints the compiled tool listing, or serves the MCP endpoint. All
//! user-facing strings are routed through the i18n catalog to prepare for
//! future localization.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use toolgate_cli::t;
use toolgate_mcp::McpGateway;
use toolgate_mcp::StderrAuditSink;
use toolgate_mcp::ToolRegistry;
use toolgate_mcp::ToolgateConfig;

// ============================================================================
// SECTION: Command Line
// ============================================================================

/// Toolgate MCP gateway command line.
#[derive(Debug, Parser)]
#[command(name = "toolgate", version, about = "Signed MCP gateway for internal OpenAPI backends")]
struct Cli {
    /// Selected subcommand.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the gateway configuration and exit.
    Validate(ConfigArgs),
    /// Print the compiled tool listing as JSON.
    Tools(ConfigArgs),
    /// Serve the MCP gateway.
    Serve(ConfigArgs),
}

/// Arguments shared by config-driven subcommands.
#[derive(Debug, clap::Args)]
struct ConfigArgs {
    /// Path to the gateway configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Binary entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            emit_error(&message);
            ExitCode::FAILURE
        }
    }
}

/// Dispatches the selected subcommand.
fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Validate(args) => run_validate(&args),
        Command::Tools(args) => run_tools(&args),
        Command::Serve(args) => run_serve(&args),
    }
}

// ============================================================================
// SECTION: Subcommands
// ============================================================================

/// Validates the configuration file.
fn run_validate(args: &ConfigArgs) -> Result<(), String> {
    let _ = load_config(args)?;
    emit(&t!("config.validate.ok"));
    Ok(())
}

/// Prints the compiled tool listing.
fn run_tools(args: &ConfigArgs) -> Result<(), String> {
    let config = load_config(args)?;
    let resolver = config.message_resolver();
    let registry = ToolRegistry::build(&config.operations(), &resolver)
        .map_err(|err| t!("tools.registry_failed", error = err))?;
    let listing = serde_json::to_string_pretty(&registry.snapshot().tools_payload)
        .map_err(|err| t!("tools.serialize_failed", error = err))?;
    emit(&listing);
    Ok(())
}

/// Serves the MCP gateway until failure.
fn run_serve(args: &ConfigArgs) -> Result<(), String> {
    let config = load_config(args)?;
    let identities = Arc::new(config.identity_provider());
    let gateway = McpGateway::from_config(&config, identities, Arc::new(StderrAuditSink))
        .map_err(|err| t!("serve.init_failed", error = err))?;
    emit(&t!(
        "serve.listening",
        bind = config.server.bind,
        path = config.gateway.mcp_path
    ));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| t!("serve.runtime_failed", error = err))?;
    runtime.block_on(gateway.serve()).map_err(|err| t!("serve.failed", error = err))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates the configuration.
fn load_config(args: &ConfigArgs) -> Result<ToolgateConfig, String> {
    ToolgateConfig::load(args.config.as_deref())
        .map_err(|err| t!("config.load_failed", error = err))
}

/// Writes one line to stdout.
fn emit(line: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{line}");
}

/// Writes one line to stderr.
fn emit_error(line: &str) {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{line}");
}

// ============================================================================
// SECTION: Tests
// ============================================================================
