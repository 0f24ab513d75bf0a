//! vp: CLI for the roster prediction pipeline.
//!
//! Subcommands:
//! - dataset: build train/test tensors + encoder state from a feed
//! - search:  run the hyperparameter search loop
//! - embed:   export latent embeddings for a saved model

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;

use vp_core::Config;
use vp_data::artifacts::{self, EncoderState};
use vp_data::dataset::{leave_one_out, DatasetPipeline};
use vp_data::loader::load_feed_lenient;
use vp_logging::{
    hash_config_bytes, now_ms, write_manifest_atomic, NdjsonWriter, RunManifestV1,
    RUN_MANIFEST_VERSION,
};
use vp_train::mlp::{reference_search_space, ContextualFactory, ContextualModel};
use vp_train::{
    CheckpointSelector, FitOptions, SearchLoop, SearchOptions, TrainableModel,
};

fn print_help() {
    eprintln!(
        r#"vp - roster prediction pipeline

USAGE:
    vp <COMMAND> [OPTIONS]

COMMANDS:
    dataset     Build train/test tensors and encoder state from a feed
    search      Run the hyperparameter search loop
    embed       Export latent embeddings for a saved model

OPTIONS:
    -h, --help          Print this help message
    -V, --version       Print version

Run `vp <COMMAND> --help` for command options.
"#
    );
}

fn print_version() {
    println!("vp {}", env!("CARGO_PKG_VERSION"));
}

fn load_config(path: &Option<String>) -> (Config, Option<String>) {
    match path {
        Some(p) => {
            let bytes = std::fs::read(p).unwrap_or_else(|e| {
                eprintln!("Failed to read config {p}: {e}");
                process::exit(1);
            });
            let cfg = Config::load(p).unwrap_or_else(|e| {
                eprintln!("Failed to load config {p}: {e}");
                process::exit(1);
            });
            (cfg, Some(hash_config_bytes(&bytes)))
        }
        None => (Config::default(), None),
    }
}

fn flag_value<'a>(args: &'a [String], i: usize, name: &str) -> &'a str {
    if i + 1 >= args.len() {
        eprintln!("Missing value for {name}");
        process::exit(1);
    }
    &args[i + 1]
}

fn cmd_dataset(args: &[String]) {
    let mut config_path: Option<String> = None;
    let mut feed: Option<String> = None;
    let mut out: Option<String> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"vp dataset

USAGE:
    vp dataset [--config F] [--feed F] [--out DIR]

OPTIONS:
    --config F   YAML config file (defaults apply without it)
    --feed F     Line-delimited match feed (default from config)
    --out DIR    Output directory (default from config)
"#
                );
                return;
            }
            "--config" => {
                config_path = Some(flag_value(args, i, "--config").to_string());
                i += 2;
            }
            "--feed" => {
                feed = Some(flag_value(args, i, "--feed").to_string());
                i += 2;
            }
            "--out" => {
                out = Some(flag_value(args, i, "--out").to_string());
                i += 2;
            }
            other => {
                eprintln!("Unknown option for `vp dataset`: {other}");
                eprintln!("Run `vp dataset --help` for usage.");
                process::exit(1);
            }
        }
    }

    let (cfg, _) = load_config(&config_path);
    let feed = feed.unwrap_or_else(|| cfg.data.feed_path.clone());
    let out = PathBuf::from(out.unwrap_or_else(|| cfg.data.out_dir.clone()));

    let report = load_feed_lenient(&feed).unwrap_or_else(|e| {
        eprintln!("Failed to load feed {feed}: {e}");
        process::exit(1);
    });
    if !report.skipped.is_empty() {
        eprintln!(
            "Skipped {} of {} feed lines (first: line {}: {})",
            report.skipped.len(),
            report.lines_read,
            report.skipped[0].line,
            report.skipped[0].reason
        );
    }

    let pipe = DatasetPipeline::fit(&report.batch).unwrap_or_else(|e| {
        eprintln!("Failed to fit encoders: {e}");
        process::exit(1);
    });
    let split = pipe
        .generate(&report.batch, cfg.data.test_fraction, cfg.data.split_seed)
        .unwrap_or_else(|e| {
            eprintln!("Failed to build dataset: {e}");
            process::exit(1);
        });

    let run = || -> Result<(), Box<dyn std::error::Error>> {
        std::fs::create_dir_all(&out)?;
        artifacts::cleanup_tmp_files(&out)?;
        artifacts::write_encoder_state_atomic(
            out.join("encoders.json"),
            &EncoderState::from_pipeline(&pipe),
        )?;
        artifacts::write_dataset(&out, "train", &split.train)?;
        artifacts::write_dataset(&out, "test", &split.test)?;
        Ok(())
    };
    if let Err(e) = run() {
        eprintln!("Failed to write dataset artifacts: {e}");
        process::exit(1);
    }

    println!("Dataset written to {}", out.display());
    println!(
        "  - Rosters: {} ({} train / {} test)",
        report.batch.len(),
        split.train_rosters.len(),
        split.test_rosters.len()
    );
    println!(
        "  - Examples: {} train, {} test",
        split.train.len(),
        split.test.len()
    );
    println!(
        "  - Dims: agents={}, maps={}, stats={}",
        pipe.agent_encoder.len(),
        pipe.map_encoder.len(),
        pipe.scaler.dim()
    );
}

fn cmd_search(args: &[String]) {
    let mut config_path: Option<String> = None;
    let mut feed: Option<String> = None;
    let mut out: Option<String> = None;
    let mut iterations: Option<u32> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"vp search

USAGE:
    vp search [--config F] [--feed F] [--out DIR] [--iterations N]

OPTIONS:
    --config F       YAML config file (defaults apply without it)
    --feed F         Line-delimited match feed (default from config)
    --out DIR        Run directory (default: runs/search)
    --iterations N   Stop after N iterations (default from config;
                     unset = run until terminated)
"#
                );
                return;
            }
            "--config" => {
                config_path = Some(flag_value(args, i, "--config").to_string());
                i += 2;
            }
            "--feed" => {
                feed = Some(flag_value(args, i, "--feed").to_string());
                i += 2;
            }
            "--out" => {
                out = Some(flag_value(args, i, "--out").to_string());
                i += 2;
            }
            "--iterations" => {
                iterations = Some(flag_value(args, i, "--iterations").parse().unwrap_or_else(
                    |_| {
                        eprintln!("Invalid --iterations value: {}", args[i + 1]);
                        process::exit(1);
                    },
                ));
                i += 2;
            }
            other => {
                eprintln!("Unknown option for `vp search`: {other}");
                eprintln!("Run `vp search --help` for usage.");
                process::exit(1);
            }
        }
    }

    let (cfg, config_hash) = load_config(&config_path);
    let feed = feed.unwrap_or_else(|| cfg.data.feed_path.clone());
    let run_dir = PathBuf::from(out.unwrap_or_else(|| "runs/search".to_string()));
    let total_iterations = iterations.or(cfg.search.total_iterations);

    let report = load_feed_lenient(&feed).unwrap_or_else(|e| {
        eprintln!("Failed to load feed {feed}: {e}");
        process::exit(1);
    });
    let pipe = DatasetPipeline::fit(&report.batch).unwrap_or_else(|e| {
        eprintln!("Failed to fit encoders: {e}");
        process::exit(1);
    });
    let split = pipe
        .generate(&report.batch, cfg.data.test_fraction, cfg.data.split_seed)
        .unwrap_or_else(|e| {
            eprintln!("Failed to build dataset: {e}");
            process::exit(1);
        });

    let logs_dir = run_dir.join("logs");
    let models_dir = run_dir.join(&cfg.retention.model_out_dir);
    let encoders_path = run_dir.join("encoders.json");
    let setup = || -> Result<NdjsonWriter, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(&logs_dir)?;
        std::fs::create_dir_all(&models_dir)?;
        artifacts::write_encoder_state_atomic(&encoders_path, &EncoderState::from_pipeline(&pipe))?;
        Ok(NdjsonWriter::open_append_with_flush(
            logs_dir.join("events.ndjson"),
            100,
        )?)
    };
    let events = setup().unwrap_or_else(|e| {
        eprintln!("Failed to prepare run directory: {e}");
        process::exit(1);
    });

    let run_id = run_dir
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("search")
        .to_string();
    let mut manifest = RunManifestV1 {
        run_manifest_version: RUN_MANIFEST_VERSION,
        run_id: run_id.clone(),
        created_ts_ms: now_ms(),
        config_hash,
        feed_path: feed.clone(),
        models_dir: models_dir.to_string_lossy().to_string(),
        logs_dir: logs_dir.to_string_lossy().to_string(),
        encoders_path: Some(encoders_path.to_string_lossy().to_string()),
        rosters_loaded: report.batch.len() as u64,
        lines_skipped: report.skipped.len() as u64,
        iterations_completed: 0,
        best_checkpoint: None,
        best_score: None,
    };
    if let Err(e) = write_manifest_atomic(run_dir.join("run.json"), &manifest) {
        eprintln!("Failed to write run manifest: {e}");
        process::exit(1);
    }

    let factory = ContextualFactory {
        agent_vocab: pipe.agent_encoder.len(),
        map_vocab: pipe.map_encoder.len(),
        stat_dim: pipe.scaler.dim(),
        batch_size: cfg.training.batch_size as usize,
        seed: cfg.search.seed,
    };
    let selector = CheckpointSelector::new(
        cfg.retention.n_models as usize,
        cfg.search.monitor.as_str(),
        cfg.search.direction,
        &models_dir,
        "model",
    )
    .unwrap_or_else(|e| {
        eprintln!("Failed to set up checkpoint retention: {e}");
        process::exit(1);
    });
    let space = reference_search_space(i64::from(cfg.model.latent_size));
    let opts = SearchOptions {
        run_id: run_id.clone(),
        seed: cfg.search.seed,
        fit: FitOptions::from_config(&cfg.training, &cfg.search),
    };
    let mut search = SearchLoop::new(&factory, space, opts, selector)
        .unwrap_or_else(|e| {
            eprintln!("Failed to start search: {e}");
            process::exit(1);
        })
        .with_events(events);

    println!(
        "Searching: {} train / {} test examples, monitor {} ({:?})",
        split.train.len(),
        split.test.len(),
        cfg.search.monitor,
        cfg.search.direction
    );
    match total_iterations {
        Some(n) => println!("Running {n} iterations"),
        None => println!("Running until terminated"),
    }

    let summary = search.run(&split.train, &split.test, total_iterations);

    manifest.iterations_completed = summary.completed;
    if let Some(best) = search.selector().best() {
        manifest.best_checkpoint = Some(best.path.to_string_lossy().to_string());
        manifest.best_score = Some(best.score);
    }
    if let Err(e) = write_manifest_atomic(run_dir.join("run.json"), &manifest) {
        eprintln!("Failed to update run manifest: {e}");
    }

    println!();
    println!("Search finished:");
    println!("  - Iterations: {} ok, {} failed", summary.completed, summary.failed);
    println!("  - Retained checkpoints:");
    for e in search.selector().entries() {
        println!("      {:.4}  {}", e.score, e.path.display());
    }
}

fn cmd_embed(args: &[String]) {
    let mut model_path: Option<String> = None;
    let mut encoders: Option<String> = None;
    let mut feed: Option<String> = None;
    let mut out: Option<String> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"vp embed

USAGE:
    vp embed --model F --encoders F --feed F [--out F]

OPTIONS:
    --model F      Saved model (.safetensors with meta sidecar)
    --encoders F   Encoder state JSON saved at dataset/search time
    --feed F       Feed to embed (apply mode; unknown categories fail)
    --out F        Output path (default: embeddings.safetensors)
"#
                );
                return;
            }
            "--model" => {
                model_path = Some(flag_value(args, i, "--model").to_string());
                i += 2;
            }
            "--encoders" => {
                encoders = Some(flag_value(args, i, "--encoders").to_string());
                i += 2;
            }
            "--feed" => {
                feed = Some(flag_value(args, i, "--feed").to_string());
                i += 2;
            }
            "--out" => {
                out = Some(flag_value(args, i, "--out").to_string());
                i += 2;
            }
            other => {
                eprintln!("Unknown option for `vp embed`: {other}");
                eprintln!("Run `vp embed --help` for usage.");
                process::exit(1);
            }
        }
    }

    let require = |v: Option<String>, name: &str| -> String {
        v.unwrap_or_else(|| {
            eprintln!("Missing required option {name}");
            process::exit(1);
        })
    };
    let model_path = require(model_path, "--model");
    let encoders = require(encoders, "--encoders");
    let feed = require(feed, "--feed");
    let out = PathBuf::from(out.unwrap_or_else(|| "embeddings.safetensors".to_string()));

    let pipe = artifacts::read_encoder_state(&encoders)
        .and_then(|s| s.into_pipeline())
        .unwrap_or_else(|e| {
            eprintln!("Failed to load encoder state {encoders}: {e}");
            process::exit(1);
        });
    let model = ContextualModel::load(Path::new(&model_path)).unwrap_or_else(|e| {
        eprintln!("Failed to load model {model_path}: {e}");
        process::exit(1);
    });

    let report = load_feed_lenient(&feed).unwrap_or_else(|e| {
        eprintln!("Failed to load feed {feed}: {e}");
        process::exit(1);
    });
    // Apply mode reuses the fitted state; it is never refit here.
    let ds = pipe
        .encode(&report.batch)
        .and_then(|enc| leave_one_out(&enc))
        .unwrap_or_else(|e| {
            eprintln!("Failed to encode feed: {e}");
            process::exit(1);
        });

    let latent = model.latent(&ds).unwrap_or_else(|e| {
        eprintln!("Failed to compute embeddings: {e}");
        process::exit(1);
    });

    let write = || -> Result<(), Box<dyn std::error::Error>> {
        let mut tensors = BTreeMap::new();
        tensors.insert(
            "latent".to_string(),
            safetensors::tensor::TensorView::new(
                safetensors::tensor::Dtype::F32,
                latent.shape().to_vec(),
                bytemuck::cast_slice(latent.data()),
            )?,
        );
        std::fs::write(&out, safetensors::serialize(&tensors, &None)?)?;

        // Per-example metadata for the visualization side.
        let meta_path = out.with_extension("meta.jsonl");
        let _ = std::fs::remove_file(&meta_path);
        let mut w = NdjsonWriter::open_append(&meta_path)?;
        for (i, m) in ds.meta.iter().enumerate() {
            let map = pipe.map_encoder.decode(ds.x_maps.row(i))?;
            let agent = pipe.agent_encoder.decode(ds.y_agents.row(i))?;
            w.write_event(&serde_json::json!({
                "match_id": m.match_id,
                "team": m.team,
                "score": m.score,
                "map": map,
                "agent": agent,
            }))?;
        }
        w.flush()?;
        Ok(())
    };
    if let Err(e) = write() {
        eprintln!("Failed to write embeddings: {e}");
        process::exit(1);
    }

    println!(
        "Wrote {} embeddings ({} dims) to {}",
        latent.rows(),
        latent.cols(),
        out.display()
    );
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("dataset") => cmd_dataset(&args[1..]),
        Some("search") => cmd_search(&args[1..]),
        Some("embed") => cmd_embed(&args[1..]),
        Some("-h") | Some("--help") => print_help(),
        Some("-V") | Some("--version") => print_version(),
        Some(other) => {
            eprintln!("Unknown command: {other}");
            print_help();
            process::exit(1);
        }
        None => {
            print_help();
            process::exit(1);
        }
    }
}
