//! Run a server-side task over one layer and print its result payloads.
//!
//! Run with: cargo run --example run_task -- <operation> <layer-uuid>

use std::env;
use std::time::Duration;

use tessera::{Client, Config, Task, TaskFilter, TaskOutcome, TesseraError};

fn main() -> Result<(), TesseraError> {
    let mut args = env::args().skip(1);
    let (operation, layer_uuid) = match (args.next(), args.next()) {
        (Some(operation), Some(uuid)) => (operation, uuid),
        _ => {
            eprintln!("Usage: cargo run --example run_task -- <operation> <layer-uuid>");
            std::process::exit(1);
        }
    };

    let client = Client::new(Config::load()?)?;
    let task = Task::new(operation).with_filter(TaskFilter::layer(layer_uuid));

    for outcome in client.execute_tasks(&[task], Duration::from_secs(5))? {
        match outcome {
            Some(TaskOutcome::Completed(payloads)) => {
                println!("task completed with {} payloads:", payloads.len());
                for payload in payloads {
                    println!("{}", payload);
                }
            }
            Some(TaskOutcome::Failed { error }) => {
                eprintln!("task failed: {}", error);
            }
            None => {
                eprintln!("task did not resolve");
            }
        }
    }

    Ok(())
}
