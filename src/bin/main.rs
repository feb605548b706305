use clap::{Parser, Subcommand};
use compass_pm::{logging, mva, validate, Config, Params, Runner, Session};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "compass-pm")]
#[command(about = "Complete or create PM work items in Compass for a list of vehicles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process every MVA in a list
    Run {
        /// Config file (JSON or YAML)
        #[arg(long)]
        config: PathBuf,

        /// MVA list, one per line
        #[arg(long)]
        mvas: PathBuf,

        /// Run in headless mode (overrides config)
        #[arg(long)]
        headless: bool,

        /// Set a parameter (can be used multiple times)
        #[arg(short = 'P', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Verbose output (-v for debug, -vv for full detail)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,

        /// Quiet mode (only errors)
        #[arg(short, long)]
        quiet: bool,

        /// Validate config and MVA list without running
        #[arg(long)]
        check: bool,

        /// Write the run ledger as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Check that a log shows every MVA in a list as processed
    Validate {
        /// MVA list, one per line
        #[arg(long)]
        mvas: PathBuf,

        /// Log file to analyze
        #[arg(long, default_value = "automation.log")]
        log_file: PathBuf,

        /// Fail if any MVA is missing
        #[arg(long)]
        require_all: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> compass_pm::Result<()> {
    match Cli::parse().command {
        Command::Run {
            config,
            mvas,
            headless,
            params,
            verbose,
            quiet,
            check,
            report,
        } => {
            let params = Params::from_args(&params)?;
            let mut config = Config::load_with_params(&config, &params)?;
            logging::init(&config.logging, logging::Overrides::from_flags(verbose, quiet))?;
            let mvas = mva::load(&mvas)?;

            if check {
                println!("Config valid: {}", config.username);
                println!("  Login: {}", config.urls.login);
                println!("  Opcode: {}", config.flow.opcode);
                println!("  MVAs: {}", mvas.len());
                if !config.params.is_empty() {
                    println!("  Parameters: {}", config.params.len());
                    for (name, def) in &config.params {
                        let req = if def.required { " (required)" } else { "" };
                        let desc = def.description.as_deref().unwrap_or("");
                        println!("    - {}{}: {}", name, req, desc);
                    }
                }
                return Ok(());
            }

            if headless {
                config.browser.headless = true;
            }

            let session = Session::launch(&config.browser).await?;
            let execution = Runner::new(&session, &config).run(&mvas).await;
            session.close().await?;

            println!();
            if execution.success {
                println!("✓ Success");
            } else {
                println!("✗ Failed");
                for step in execution.failed_steps() {
                    if let Some(ref error) = step.error_message {
                        println!("  {}: {}", step.name, error);
                    }
                }
            }
            println!("  {}", execution.summary());

            if let Some(path) = report {
                execution.write_report(&path)?;
                println!("  Report: {}", path.display());
            }

            if !execution.success {
                std::process::exit(1);
            }
        }

        Command::Validate {
            mvas,
            log_file,
            require_all,
        } => {
            let expected = mva::load(&mvas)?;
            let report = validate::validate_file(&expected, &log_file)?;
            println!("{}", report.to_markdown());

            if require_all {
                if let Err(e) = report.require_all() {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
