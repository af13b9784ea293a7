//! jetschema CLI
//!
//! Command-line interface for validating JSON documents against JSON
//! Schemas and for checking that schema documents compile.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jetschema::{compile, load_json, load_json_auto, ValidationReport};

#[derive(Parser)]
#[command(name = "jetschema")]
#[command(about = "Validate JSON documents against JSON Schemas, streaming")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an instance document against a schema
    Validate {
        /// Instance file to validate
        instance: PathBuf,

        /// Schema source: file path or URL (http:// or https://)
        #[arg(long, short)]
        schema: String,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,

        /// Suppress problem listing, only report the verdict
        #[arg(long, short)]
        quiet: bool,
    },

    /// Check that a schema document compiles
    Check {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate {
            instance,
            schema,
            json,
            quiet,
        } => run_validate(&instance, &schema, json, quiet),
        Commands::Check { schema } => run_check(&schema),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_validate(
    instance_path: &PathBuf,
    schema_source: &str,
    json_output: bool,
    quiet: bool,
) -> Result<(), u8> {
    let schema_doc = load_json_auto(schema_source).map_err(|e| {
        report_error(json_output, &format!("loading schema: {}", e));
        e.exit_code() as u8
    })?;

    let schema = compile(&schema_doc).map_err(|e| {
        report_error(json_output, &e.to_string());
        e.exit_code() as u8
    })?;

    let instance = load_json(instance_path).map_err(|e| {
        report_error(json_output, &format!("loading instance: {}", e));
        e.exit_code() as u8
    })?;

    let report = schema.validate(&instance).map_err(|e| {
        report_error(json_output, &e.to_string());
        e.exit_code() as u8
    })?;

    print_report(&report, json_output, quiet);
    if report.is_valid() {
        Ok(())
    } else {
        Err(1)
    }
}

fn print_report(report: &ValidationReport, json_output: bool, quiet: bool) {
    if json_output {
        match serde_json::to_string(report) {
            Ok(out) => println!("{}", out),
            Err(e) => eprintln!("Error serializing report: {}", e),
        }
        return;
    }
    if report.is_valid() {
        println!("Valid");
        return;
    }
    eprintln!("Validation failed:");
    if !quiet {
        for problem in &report.problems {
            eprintln!("  {}", problem);
        }
    }
}

fn run_check(schema_source: &str) -> Result<(), u8> {
    let schema_doc = load_json_auto(schema_source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    match compile(&schema_doc) {
        Ok(_) => {
            println!("Schema OK");
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Err(e.exit_code() as u8)
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        let body = serde_json::json!({ "valid": false, "error": msg });
        println!("{}", body);
    } else {
        eprintln!("Error: {}", msg);
    }
}
