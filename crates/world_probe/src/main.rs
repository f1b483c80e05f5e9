use std::process::ExitCode;

use tracing::error;

mod app;

fn main() -> ExitCode {
    let wiring = match app::bootstrap::build_probe(std::env::args().skip(1)) {
        Ok(Some(wiring)) => wiring,
        Ok(None) => return ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    match app::probe::run_probe(&wiring) {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!(error = %err, "report_serialize_failed");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            error!(error = %err, "probe_failed");
            ExitCode::FAILURE
        }
    }
}
