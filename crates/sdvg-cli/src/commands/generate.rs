use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use sdvg_core::error::SdvgError;
use sdvg_core::task::{TaskConfig, TaskRegistry};

use crate::args::GenerateArgs;

pub async fn run(args: &GenerateArgs) -> Result<()> {
    let mut config = sdvg_core::config::read_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(workers) = args.workers {
        config.workers_count = workers.max(1);
    }

    let confirm: sdvg_core::output::ConfirmFn = if args.yes {
        Arc::new(|_prompt: &str| true)
    } else {
        Arc::new(prompt_on_stdin)
    };

    let registry = TaskRegistry::new();
    let task = registry
        .create_task(TaskConfig {
            config,
            continue_generation: args.continue_generation,
            force: args.force,
            confirm: Some(confirm),
            devnull_handler: None,
        })
        .await?;

    let bar = ProgressBar::new(task.get_progress().total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} rows ({per_sec})")
            .expect("static template"),
    );

    let bar_task = {
        let bar = bar.clone();
        let task = Arc::clone(&task);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(200));
            loop {
                ticker.tick().await;
                bar.set_position(task.get_progress().generated);
            }
        })
    };

    // First signal cancels gracefully; a second one force-exits.
    let mut interrupted = false;
    let result = loop {
        tokio::select! {
            result = task.wait_result() => break result,
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for ctrl-c")?;
                if interrupted {
                    eprintln!("forced exit");
                    std::process::exit(1);
                }
                interrupted = true;
                eprintln!("interrupt received, finishing the current batches (press again to force-exit)");
                task.cancel(SdvgError::Signal);
            }
        }
    };

    bar_task.abort();
    match result {
        Ok(()) => {
            bar.finish_with_message("done");
            println!("Generated {} rows", task.get_progress().generated);
            Ok(())
        }
        Err(e) => {
            bar.abandon();
            Err(e.into())
        }
    }
}

/// Interactive y/n prompt for the partition-files-limit decision.
fn prompt_on_stdin(prompt: &str) -> bool {
    eprint!("{} [y/N] ", prompt);
    let _ = std::io::stderr().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}
