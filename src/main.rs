use std::{path::PathBuf, process};

use clap::{Parser, Subcommand};
use layered::{
    config::TrainConfig,
    data::{DataLoader, Dataset},
    encoding::OneHotEncoder,
    loss::{CrossEntropy, MeanSquaredError},
    metrics::accuracy,
    train::train,
    Activation, Network,
};
use ndarray_rand::rand::{rngs::StdRng, SeedableRng};

#[derive(Parser)]
#[command(name = "layered")]
#[command(about = "Train a stack of dense layers with momentum SGD", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a network on a CSV dataset
    Train {
        /// JSON file with the network layout and hyperparameters
        #[arg(short, long)]
        config: PathBuf,

        /// Training data; the last column holds the label
        #[arg(short, long)]
        data: PathBuf,

        /// Held-out data evaluated after training
        #[arg(short, long)]
        test: Option<PathBuf>,

        /// Class labels in output order
        #[arg(long, value_delimiter = ',', required = true)]
        labels: Vec<String>,

        /// Weights to start from
        #[arg(long)]
        load: Option<PathBuf>,

        /// Where to write the trained weights
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn run(cli: Cli) -> layered::Result<()> {
    match cli.command {
        Commands::Train {
            config,
            data,
            test,
            labels,
            load,
            save,
        } => {
            let config = TrainConfig::from_file(&config)?;
            let encoder = OneHotEncoder::new(&labels);
            let train_set = Dataset::from_csv(&data, &encoder)?;

            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mut net = Network::from_config_using(&config.network, &mut rng);
            if let Some(path) = &load {
                net.load(path)?;
            }

            let softmax_output = config
                .network
                .layers
                .last()
                .map_or(false, |l| l.activation == Activation::Softmax);
            let mut loader = DataLoader::new(train_set.clone()).shuffle(config.seed);
            if softmax_output {
                train::<CrossEntropy>(&mut net, &mut loader, &config);
            } else {
                train::<MeanSquaredError>(&mut net, &mut loader, &config);
            }

            log::info!("training accuracy: {:.4}", accuracy(&mut net, &train_set));
            if let Some(path) = &test {
                let test_set = Dataset::from_csv(path, &encoder)?;
                log::info!("test accuracy: {:.4}", accuracy(&mut net, &test_set));
            }

            if let Some(path) = &save {
                net.save(path)?;
            }
            net.teardown();
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    if let Err(e) = run(cli) {
        log::error!("{}", e);
        process::exit(1);
    }
}
