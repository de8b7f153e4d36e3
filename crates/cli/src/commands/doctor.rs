use serde::Serialize;

use banter_core::config::{AppConfig, LoadOptions};
use banter_db::{connect_with_settings, ping};

use super::{runtime, CommandResult};

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckLine,
    database: CheckLine,
    classifier_mode: String,
}

#[derive(Debug, Serialize)]
struct CheckLine {
    status: String,
    detail: String,
}

pub fn run(json: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("doctor", "config", error.to_string(), 2),
    };

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure("doctor", "runtime", error.to_string(), 2),
    };

    let database = runtime.block_on(async {
        match connect_with_settings(&config.database.url, 1, 5).await {
            Ok(pool) => {
                let check = match ping(&pool).await {
                    Ok(()) => CheckLine { status: "ok".to_string(), detail: "reachable".to_string() },
                    Err(error) => {
                        CheckLine { status: "error".to_string(), detail: error.to_string() }
                    }
                };
                pool.close().await;
                check
            }
            Err(error) => CheckLine { status: "error".to_string(), detail: error.to_string() },
        }
    });

    let classifier_mode = if config.llm.api_key.is_some() {
        "remote+fallback".to_string()
    } else {
        "fallback-only".to_string()
    };

    let report = DoctorReport {
        config: CheckLine { status: "ok".to_string(), detail: "validated".to_string() },
        database,
        classifier_mode,
    };

    let healthy = report.database.status == "ok";
    let output = if json {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| error.to_string())
    } else {
        format!(
            "config:     {} ({})\ndatabase:   {} ({})\nclassifier: {}",
            report.config.status,
            report.config.detail,
            report.database.status,
            report.database.detail,
            report.classifier_mode,
        )
    };

    CommandResult { exit_code: u8::from(!healthy), output }
}
