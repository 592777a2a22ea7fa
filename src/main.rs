use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use seqindex::alphabet::Alphabet;
use seqindex::index::firstcodes::{FirstCodes, FirstCodesConfig};
use seqindex::index::fmindex::{FmIndex, FmIndexConfig, FmIndexWriter};
use seqindex::index::stats::show_info;
use seqindex::index::suffix_array::{BuildConfig, SuffixArray, SuffixArrayBuilder, SuffixArrayWriter};
use seqindex::index::{Demand, IntegerWidth, LoaderConfig};
use seqindex::utils::progress;
use seqindex::utils::read_fasta;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "seqindex")]
#[command(about = "Suffix array and FM-index tables for encoded sequences")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Integer width of the tables (32 or 64, default: native)
    #[arg(long, global = true)]
    width: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlphabetKind {
    Dna,
    Protein,
    /// Pick from the first sequence
    Guess,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a suffix array index from FASTA files
    Build {
        /// Index name (path prefix of the table files)
        index: PathBuf,

        /// FASTA input files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long, value_enum, default_value = "guess")]
        alphabet: AlphabetKind,

        /// Also write an FM-index under this name
        #[arg(long)]
        fm: Option<PathBuf>,

        /// log2 of the FM-index block size
        #[arg(long, default_value_t = 7)]
        block: u32,

        /// log2 of the distance between stored positions
        #[arg(long, default_value_t = 4)]
        mark: u32,

        /// Do not store sampled positions in the FM-index
        #[arg(long)]
        no_positions: bool,

        /// Prefix length of the precomputed FM-index ranges
        #[arg(long, default_value_t = 3)]
        suffix_length: u32,
    },
    /// Show index statistics
    Info {
        index: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find the occurrences of a pattern
    Search {
        index: PathBuf,

        pattern: String,

        /// The index is an FM-index
        #[arg(long)]
        fm: bool,

        /// Maximum number of positions to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Count the k-mers equal to the first k-mer of some sequence
    Firstcodes {
        index: PathBuf,

        #[arg(short, long, default_value_t = 32)]
        kmer_size: usize,

        /// Symbols in each prefix/suffix filter
        #[arg(long, default_value_t = 14)]
        mark_units: usize,

        #[arg(long, default_value_t = 15)]
        cache_depth: u32,

        /// k-mers buffered between merges
        #[arg(long, default_value_t = 3_000_000)]
        buffer: usize,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("seqindex=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let width = match cli.width {
        Some(bits) => IntegerWidth::from_bits(bits).context("--width must be 32 or 64")?,
        None => IntegerWidth::native(),
    };
    let loader = LoaderConfig {
        integer_width: width,
        ..Default::default()
    };

    match cli.command {
        Commands::Build {
            index,
            files,
            alphabet,
            fm,
            block,
            mark,
            no_positions,
            suffix_length,
        } => {
            let fm_config = fm.map(|name| {
                (
                    name,
                    FmIndexConfig {
                        log2_block_size: block,
                        log2_mark_dist: mark,
                        store_index_pos: !no_positions,
                        suffix_length,
                    },
                )
            });
            build(&index, &files, alphabet, width, fm_config)?;
        }
        Commands::Info { index, json } => {
            show_info(&index, &loader, json)?;
        }
        Commands::Search {
            index,
            pattern,
            fm,
            limit,
        } => {
            search(&index, pattern.as_bytes(), fm, limit, &loader)?;
        }
        Commands::Firstcodes {
            index,
            kmer_size,
            mark_units,
            cache_depth,
            buffer,
            json,
        } => {
            let config = FirstCodesConfig {
                kmer_size,
                mark_units,
                cache_depth,
                buffer_capacity: buffer,
            };
            first_codes(&index, config, json, &loader)?;
        }
    }

    Ok(())
}

fn build(
    index: &Path,
    files: &[PathBuf],
    alphabet: AlphabetKind,
    width: IntegerWidth,
    fm: Option<(PathBuf, FmIndexConfig)>,
) -> Result<()> {
    let mut inputs = Vec::with_capacity(files.len());
    let pb = progress::file_bar(files.len() as u64);
    for path in files {
        pb.set_message(path.display().to_string());
        let records = read_fasta(path).with_context(|| format!("failed to read {}", path.display()))?;
        inputs.push((path, records));
        pb.inc(1);
    }
    pb.finish_and_clear();

    let alphabet = match alphabet {
        AlphabetKind::Dna => Alphabet::dna(),
        AlphabetKind::Protein => Alphabet::protein(),
        AlphabetKind::Guess => {
            let sample = inputs
                .iter()
                .flat_map(|(_, records)| records.first())
                .map(|r| r.sequence.as_slice())
                .next()
                .unwrap_or_default();
            Alphabet::guess(sample)
        }
    };

    let config = BuildConfig {
        integer_width: width,
        ..Default::default()
    };
    let mut builder = SuffixArrayBuilder::new(alphabet, config);
    for (path, records) in &inputs {
        let name = path.display().to_string();
        builder
            .add_file(&name, records.iter().map(|r| &r.sequence))
            .with_context(|| format!("failed to encode {}", name))?;
    }
    drop(inputs);

    let pb = progress::spinner("sorting suffixes");
    let built = builder.build().context("failed to build suffix array")?;
    pb.finish_and_clear();

    SuffixArrayWriter::write(index, &built)
        .with_context(|| format!("failed to write index {}", index.display()))?;
    info!(
        index = %index.display(),
        total_length = built.project.total_length,
        sequences = built.project.num_of_sequences,
        "wrote suffix array"
    );

    if let Some((name, config)) = fm {
        if name == index {
            bail!("the FM-index needs a name different from the suffix array");
        }
        FmIndexWriter::write(&name, &built, &config)
            .with_context(|| format!("failed to write FM-index {}", name.display()))?;
        info!(index = %name.display(), "wrote fm index");
    }

    Ok(())
}

fn search(index: &Path, pattern: &[u8], fm: bool, limit: usize, loader: &LoaderConfig) -> Result<()> {
    if fm {
        let fm = FmIndex::map(index, loader)
            .with_context(|| format!("failed to open FM-index {}", index.display()))?;
        let range = fm.search_symbols(pattern)?;
        println!("{} occurrences", range.end - range.start);
        for row in range.take(limit) {
            match fm.locate(row) {
                Some(pos) => println!("  row {:<10} position {}", row, pos),
                None => println!("  row {:<10}", row),
            }
        }
        return Ok(());
    }

    let sa = SuffixArray::map(index, Demand::ESQTAB | Demand::SUFTAB, loader)
        .with_context(|| format!("failed to open index {}", index.display()))?;
    let range = sa.search_symbols(pattern)?;
    println!("{} occurrences", range.end - range.start);
    for row in range.take(limit) {
        let Some(pos) = sa.suffix(row) else { continue };
        match sa.sequence_number(pos) {
            Some(seqnum) => println!("  position {:<10} sequence {}", pos, seqnum),
            None => println!("  position {}", pos),
        }
    }
    Ok(())
}

fn first_codes(index: &Path, config: FirstCodesConfig, json: bool, loader: &LoaderConfig) -> Result<()> {
    let sa = SuffixArray::map(index, Demand::ESQTAB, loader)
        .with_context(|| format!("failed to open index {}", index.display()))?;
    let encseq = sa.encseq().context("encoded sequence not loaded")?;

    let engine = FirstCodes::new(sa.alphabet().num_of_chars(), config)?;
    let pb = progress::spinner("counting first codes");
    let codes = engine.run(encseq)?;
    pb.finish_and_clear();

    let stats = codes.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }

    let ratio = if stats.sequences == 0 {
        0.0
    } else {
        stats.distinct_codes as f64 / stats.sequences as f64
    };
    println!("Sequences:          {}", stats.sequences);
    println!("Skipped:            {}", stats.skipped_sequences);
    println!("Distinct codes:     {} ({:.2})", stats.distinct_codes, ratio);
    println!("First code hits:    {}", stats.first_code_hits);
    println!("Buffered k-mers:    {}", stats.buffered_total);
    println!("Flushes:            {}", stats.flushes);
    println!("Cache entries:      {}", stats.cache_entries);
    if stats.cache_entries > 0 {
        println!("Avg uncached width: {:.2}", stats.average_uncached_width);
    }
    if let Some(&total) = codes.counts().last() {
        println!("Total count:        {}", total);
    }
    Ok(())
}
