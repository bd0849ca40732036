use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use findex_core::index::{DocId, InvertedIndex};
use findex_core::persist::save_snapshot;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

/// One input record. IDs are optional: records without one get the next
/// service-assigned ID in file order.
#[derive(Debug, Deserialize)]
struct InputDoc {
    #[serde(default)]
    id: Option<DocId>,
    text: String,
}

#[derive(Parser)]
#[command(name = "findex-indexer")]
#[command(about = "Build an index snapshot from JSON/JSONL document files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a snapshot from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output snapshot file
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output } => build_snapshot(&input, &output),
    }
}

fn build_snapshot(input: &str, output: &Path) -> Result<()> {
    let input_path = Path::new(input);
    let mut index = InvertedIndex::new();

    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        files.sort();
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }

    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            ingest_jsonl(&file, &mut index)?;
        } else {
            ingest_json(&file, &mut index)?;
        }
    }

    tracing::info!(
        num_docs = index.num_docs(),
        num_terms = index.num_terms(),
        "ingested documents"
    );

    save_snapshot(output, &index)?;
    tracing::info!(output = %output.display(), "snapshot written");
    Ok(())
}

fn ingest_jsonl(file: &Path, index: &mut InvertedIndex) -> Result<()> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: InputDoc = serde_json::from_str(&line)?;
        ingest_doc(doc, index)?;
    }
    Ok(())
}

fn ingest_json(file: &Path, index: &mut InvertedIndex) -> Result<()> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let doc: InputDoc = serde_json::from_value(v)?;
                ingest_doc(doc, index)?;
            }
        }
        serde_json::Value::Object(_) => {
            let doc: InputDoc = serde_json::from_value(json)?;
            ingest_doc(doc, index)?;
        }
        _ => {}
    }
    Ok(())
}

fn ingest_doc(doc: InputDoc, index: &mut InvertedIndex) -> Result<()> {
    match doc.id {
        Some(id) => index.add_document(id, &doc.text)?,
        None => {
            index.insert_document(&doc.text)?;
        }
    }
    Ok(())
}
