mod glyph_tsv;

use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Build glyph metadata files from `codepoint radical radical_stroke total_stroke` rows.
#[derive(Parser)]
#[command(name = "build-glyph-table")]
struct Args {
    /// Input TSV files. Later files override earlier ones.
    #[arg(long, num_args = 1.., required = true)]
    inputs: Vec<PathBuf>,

    /// In-memory table (bincode)
    #[arg(long)]
    out_bin: Option<PathBuf>,

    /// Persistent table (redb)
    #[arg(long, default_value = "glyphs.redb")]
    out_redb: PathBuf,

    /// Also write an fst whitelist of every char in the inputs
    #[arg(long)]
    out_whitelist: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "build_glyph_table=info".into()),
        )
        .init();

    let args = Args::parse();
    let outputs = glyph_tsv::Outputs {
        bincode: args.out_bin.as_deref(),
        redb: Some(&args.out_redb),
        whitelist: args.out_whitelist.as_deref(),
    };

    let count = glyph_tsv::run(&args.inputs, &outputs)?;
    if count == 0 {
        bail!("no glyph rows found in {} input(s)", args.inputs.len());
    }

    println!("Wrote {} glyphs to {}", count, args.out_redb.display());
    if let Some(path) = &args.out_bin {
        println!("Wrote {}", path.display());
    }
    if let Some(path) = &args.out_whitelist {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
