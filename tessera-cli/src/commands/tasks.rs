use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use tessera::{PollPolicy, Task, TaskFilter, TaskOutcome};

#[allow(clippy::too_many_arguments)]
pub fn run(
    host: Option<String>,
    key_id: Option<String>,
    secret_key: Option<String>,
    config: Option<PathBuf>,
    operation: String,
    layer: Option<String>,
    extras: Option<String>,
    interval: u64,
    strict: bool,
) -> Result<()> {
    let mut task = Task::new(operation);
    if let Some(layer) = layer {
        task = task.with_filter(TaskFilter::layer(layer));
    }
    if let Some(extras) = extras {
        let extras: Map<String, Value> =
            serde_json::from_str(&extras).context("--extras must be a JSON object")?;
        for (key, value) in extras {
            task = task.with_extra(key, value);
        }
    }

    let client = super::connect(host, key_id, secret_key, config)?;
    let policy = if strict {
        PollPolicy::Strict
    } else {
        PollPolicy::BestEffort
    };

    let pb = super::spinner("Waiting for the task to finish...");
    let outcomes =
        client.execute_tasks_with_policy(&[task], policy, Duration::from_secs(interval));
    pb.finish_and_clear();

    let mut outcomes = outcomes.context("Task execution failed")?;
    match outcomes.pop().flatten() {
        Some(TaskOutcome::Completed(payloads)) => {
            for payload in payloads {
                println!("{}", payload);
            }
            Ok(())
        }
        Some(TaskOutcome::Failed { error }) => bail!("Task failed: {}", error),
        None => bail!("Task did not resolve"),
    }
}
