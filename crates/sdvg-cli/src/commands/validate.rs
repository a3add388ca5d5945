use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use serde::Serialize;

use sdvg_core::config::{GenerationConfig, SinkConfig};

use crate::args::{ValidateArgs, ValidateFormat};

#[derive(Serialize)]
struct ModelSummary {
    name: String,
    rows: u64,
    columns: usize,
    partitioned_by: Vec<String>,
    ignored: bool,
}

#[derive(Serialize)]
struct ConfigSummary {
    sink: &'static str,
    output_dir: String,
    models: Vec<ModelSummary>,
}

pub fn run(args: &ValidateArgs) -> Result<()> {
    let config = sdvg_core::config::read_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let summary = summarize(&config);
    match args.format {
        ValidateFormat::Table => print_table(&summary),
        ValidateFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

fn summarize(config: &GenerationConfig) -> ConfigSummary {
    let sink = match &config.output.sink {
        SinkConfig::Csv(_) => "csv",
        SinkConfig::Parquet(_) => "parquet",
        SinkConfig::Http(_) => "http",
        SinkConfig::Tcs(_) => "tcs",
        SinkConfig::DevNull => "devnull",
    };
    ConfigSummary {
        sink,
        output_dir: config.output.dir.display().to_string(),
        models: config
            .models
            .values()
            .map(|model| ModelSummary {
                name: model.name.clone(),
                rows: model.rows_count,
                columns: model.columns.len(),
                partitioned_by: model
                    .partition_columns
                    .iter()
                    .map(|pc| pc.name.clone())
                    .collect(),
                ignored: config.models_to_ignore.contains(&model.name),
            })
            .collect(),
    }
}

fn print_table(summary: &ConfigSummary) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Model", "Rows", "Columns", "Partitioned by", "Ignored"]);

    for model in &summary.models {
        let partitions = if model.partitioned_by.is_empty() {
            "-".to_string()
        } else {
            model.partitioned_by.join(", ")
        };
        table.add_row(vec![
            Cell::new(&model.name),
            Cell::new(model.rows),
            Cell::new(model.columns),
            Cell::new(partitions),
            Cell::new(if model.ignored { "yes" } else { "" }),
        ]);
    }

    println!("{}", table);
    println!(
        "Config OK: {} model(s), sink {} -> {}",
        summary.models.len(),
        summary.sink,
        summary.output_dir
    );
}
