use std::process::ExitCode;

use xcresults_cli::logging::init_tracing;
use xcresults_cli::{CliError, Command, HELP, format_summary, parse_args, run_export};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match parse_args(&args) {
        Ok(Command::Export(config)) => config,
        Ok(Command::Help) => {
            print!("{HELP}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("ERROR {err}\n");
            eprint!("{HELP}");
            return err.to_exit_code();
        }
    };

    init_tracing(config.log_json);

    match run_export(&config) {
        Ok(summary) => {
            if config.json_summary {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{json}"),
                    Err(source) => {
                        let err = CliError::Serialize {
                            what: "export summary".to_owned(),
                            source,
                        };
                        eprintln!("ERROR {err}");
                        return err.to_exit_code();
                    }
                }
            } else {
                print!("{}", format_summary(&summary));
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("ERROR xcresults export failed: {err}");
            err.to_exit_code()
        }
    }
}
