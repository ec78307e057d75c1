use std::process::ExitCode;

use dial::DialBackend;
use dial_pppd::{PppdBackend, check_prerequisites};

use super::ConfigArgs;
use crate::config;
use crate::error::ActivatorResult;
use crate::netconf;

/// Report host and network configuration problems without serving.
pub async fn run_check(args: ConfigArgs) -> ActivatorResult<ExitCode> {
    let config = config::load(&args.config).await?;
    let pppd = config.pppd_config();

    let mut problems = Vec::new();
    if let Err(e) = check_prerequisites(&pppd, &config.lock_dir).await {
        problems.extend(e.problems);
    }

    let backend = PppdBackend::new(pppd);
    match netconf::load(&config.network_config)
        .await
        .and_then(|network| network.candidates())
    {
        Ok(candidates) => {
            let total = candidates.len();
            match backend.verify_interfaces(candidates).await {
                Ok(usable) if usable.is_empty() => {
                    problems.push(format!("none of {total} candidate interfaces has carrier"));
                }
                Ok(usable) => {
                    for iface in &usable {
                        println!("interface ready: {}", iface.name);
                    }
                }
                Err(e) => problems.push(e.to_string()),
            }
        }
        Err(e) => problems.push(e.to_string()),
    }

    if problems.is_empty() {
        println!("all checks passed");
        return Ok(ExitCode::SUCCESS);
    }
    for problem in &problems {
        eprintln!("problem: {problem}");
    }
    Ok(ExitCode::FAILURE)
}
