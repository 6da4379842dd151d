use anyhow::Result;
use clap::Parser;
use movierec::{init_tracing, Config, Outcome, Recommender};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Recommend movies similar to a title", long_about = None)]
struct Args {
    /// Title to find similar movies for.
    title: String,

    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Overrides `corpus.path` from the config file.
    #[arg(long)]
    corpus: Option<std::path::PathBuf>,

    /// Number of recommendations (defaults to `recommendation.default_count`).
    #[arg(short, long)]
    num: Option<usize>,

    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Discard the model snapshot for this corpus and refit.
    #[arg(long)]
    rebuild: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let mut config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };
    if let Some(corpus) = args.corpus {
        config.corpus.path = corpus;
    }
    config.validate()?;

    let num = args.num.unwrap_or(config.recommendation.default_count);
    let config = Arc::new(config);
    let recommender = if args.rebuild {
        Recommender::rebuild_from_config(config)?
    } else {
        Recommender::from_config(config)?
    };

    match recommender.try_recommend(&args.title, num)? {
        Outcome::NotFound => println!("No movie titled {:?} in the corpus.", args.title),
        Outcome::Found {
            source, neighbors, ..
        } => {
            let matched = recommender.item(source).map(|item| item.title.as_str()).unwrap_or("?");
            if neighbors.is_empty() {
                println!("Found {:?} but no similar movies.", matched);
            } else {
                println!("Movies similar to {:?}:", matched);
                for (rank, scored) in neighbors.iter().enumerate() {
                    println!("{:>2}. {} ({:.3})", rank + 1, scored.item.title, scored.score);
                    if !scored.item.overview.is_empty() {
                        println!("    {}", scored.item.overview);
                    }
                }
            }
        }
    }

    Ok(())
}
