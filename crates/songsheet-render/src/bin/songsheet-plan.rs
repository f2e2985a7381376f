use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use songsheet::{IndexPosition, Song, SongParser, Songbook};
use songsheet_render::{LayoutConfig, LayoutEngine, LayoutPlan};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "songsheet-plan", version, about = "Parse and lay out chord-sheet songs")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse one song file and print it as JSON.
    Parse(ParseArgs),
    /// Lay out songs and print the draw plan.
    Layout(LayoutArgs),
}

#[derive(clap::Args, Debug)]
struct ParseArgs {
    #[arg(value_name = "SONG")]
    file: PathBuf,

    /// Shift every chord by this many semitones.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    transpose: i32,

    /// Print the plain-text dump instead of JSON.
    #[arg(long)]
    dump: bool,
}

#[derive(clap::Args, Debug)]
struct LayoutArgs {
    #[arg(value_name = "SONG", required = true)]
    files: Vec<PathBuf>,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    transpose: i32,

    /// Lay the files out as a songbook with this title.
    #[arg(long)]
    title: Option<String>,

    /// Songbook index placement.
    #[arg(long, value_enum)]
    index: Option<IndexArg>,

    /// Index choruses by their first line.
    #[arg(long)]
    index_chorus: bool,

    /// Group the index by song section.
    #[arg(long)]
    sections: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[arg(long, default_value_t = 210.0)]
    page_width: f32,

    #[arg(long, default_value_t = 297.0)]
    page_height: f32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum IndexArg {
    Start,
    End,
}

impl From<IndexArg> for IndexPosition {
    fn from(value: IndexArg) -> Self {
        match value {
            IndexArg::Start => IndexPosition::Start,
            IndexArg::End => IndexPosition::End,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Parse(args) => cmd_parse(args),
        Command::Layout(args) => cmd_layout(args),
    }
}

fn read_song(parser: &SongParser, path: &Path) -> anyhow::Result<Song> {
    let parsed = parser
        .parse_file(path)
        .with_context(|| format!("read song '{}'", path.display()))?;
    Ok(parsed.song)
}

fn cmd_parse(args: ParseArgs) -> anyhow::Result<()> {
    let parser = SongParser::new().with_transpose(args.transpose);
    let song = read_song(&parser, &args.file)?;
    if args.dump {
        print!("{song}");
    } else {
        println!("{}", serde_json::to_string_pretty(&song)?);
    }
    Ok(())
}

fn cmd_layout(args: LayoutArgs) -> anyhow::Result<()> {
    let engine = LayoutEngine::try_new(LayoutConfig::for_page(args.page_width, args.page_height))
        .context("invalid page geometry")?;
    let parser = SongParser::new().with_transpose(args.transpose);

    let plan = match (&args.title, args.files.as_slice()) {
        (None, [file]) => engine.layout_song(&read_song(&parser, file)?),
        (title, files) => {
            let mut book = Songbook::new(title.clone().unwrap_or_default());
            book.index_position = args.index.map(IndexPosition::from).unwrap_or_default();
            book.index_chorus = args.index_chorus;
            book.use_sections = args.sections;
            for file in files {
                book.add_song(read_song(&parser, file)?, None);
            }
            engine.layout_songbook(&book)
        }
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Text => print_placements(&plan),
    }
    Ok(())
}

fn print_placements(plan: &LayoutPlan) {
    println!(
        "{} page(s), {:.1} x {:.1}",
        plan.page_count, plan.page_width, plan.page_height
    );
    for placed in plan.placements() {
        println!("{placed}");
    }
}
