//! `petreg` entry point: runs the registry server or talks to one.

mod images;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use petreg_core::{default_log_level, init_logging};
use petreg_rpc::config::DEFAULT_LISTEN_ADDR;
use petreg_rpc::{
    resolve_db_path, RegisterNewPetParams, RegistryClient, SearchDetail, Server, ServerConfig,
    StoreConfig,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "petreg", version, about = "Pet record registry")]
struct Cli {
    /// trace|debug|info|warn|error
    #[arg(long, global = true, env = "PETREG_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; stderr when unset.
    #[arg(long, global = true, env = "PETREG_LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the registry server in the foreground.
    Serve {
        #[arg(long, env = "PETREG_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
        listen: SocketAddr,

        /// SQLite database file. Defaults to `PETREG_DB_PATH` or the temp dir.
        #[arg(long, conflicts_with = "in_memory")]
        db: Option<PathBuf>,

        /// Keep records in process memory only.
        #[arg(long)]
        in_memory: bool,

        /// Refuse registrations once the in-memory store holds this many pets.
        #[arg(long, requires = "in_memory")]
        max_records: Option<usize>,
    },
    /// Register one pet.
    Register {
        #[command(flatten)]
        target: Target,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        gender: String,
        #[arg(long, default_value_t = 0)]
        age: u32,
        #[arg(long, default_value = "")]
        breed: String,
        /// Image file sent as the pet's picture.
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Search pets by exactly one field.
    Search {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        by: SearchBy,
        /// Directory to write returned pictures into.
        #[arg(long)]
        save_images: Option<PathBuf>,
    },
    /// Check that a server is reachable.
    Ping {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Debug, Args)]
struct Target {
    /// Server address.
    #[arg(long, env = "PETREG_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    addr: String,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct SearchBy {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long)]
    age: Option<u32>,
    #[arg(long)]
    breed: Option<String>,
}

impl SearchBy {
    fn into_detail(self) -> Option<SearchDetail> {
        if let Some(name) = self.name {
            Some(SearchDetail::Name(name))
        } else if let Some(gender) = self.gender {
            Some(SearchDetail::Gender(gender))
        } else if let Some(age) = self.age {
            Some(SearchDetail::Age(age))
        } else {
            self.breed.map(SearchDetail::Breed)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    init_logging(&level, cli.log_dir.as_deref()).map_err(|err| anyhow!(err))?;

    match cli.command {
        Command::Serve {
            listen,
            db,
            in_memory,
            max_records,
        } => {
            let store = if in_memory {
                StoreConfig::Memory { max_records }
            } else {
                StoreConfig::Sqlite {
                    path: resolve_db_path(db),
                }
            };
            serve(ServerConfig {
                listen_addr: listen,
                store,
            })
            .await
        }
        Command::Register {
            target,
            name,
            gender,
            age,
            breed,
            image,
        } => {
            let picture = images::load_image(image.as_deref()).await?;
            let mut client = connect(&target).await?;
            let call = client
                .register_new_pet(RegisterNewPetParams {
                    name,
                    gender,
                    age,
                    breed,
                    picture,
                })
                .await?;

            if let Some(error) = &call.storage_error {
                warn!(
                    "event=register module=cli status=error code={} error={}",
                    error.code, error.message
                );
            }
            if !call.result.is_success() {
                bail!("{} (code {})", call.result.msg, call.result.code);
            }
            match call.result.pet_id {
                Some(id) => println!("{} (id {id})", call.result.msg),
                None => println!("{}", call.result.msg),
            }
            Ok(())
        }
        Command::Search {
            target,
            by,
            save_images,
        } => {
            let mut client = connect(&target).await?;
            let pets = client.search_pet(by.into_detail()).await?;

            println!("found {} pet(s)", pets.len());
            for pet in &pets {
                println!(
                    "name: {}, gender: {}, age: {}, breed: {}, picture: {} bytes",
                    pet.name,
                    pet.gender,
                    pet.age,
                    pet.breed,
                    pet.picture.len()
                );
                if let Some(dir) = &save_images {
                    if let Some(path) = images::save_image(dir, pet).await? {
                        println!("saved picture: {}", path.display());
                    }
                }
            }
            Ok(())
        }
        Command::Ping { target } => {
            let mut client = connect(&target).await?;
            let ping = client.ping().await?;
            println!("{} (server {})", ping.message, ping.version);
            Ok(())
        }
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    let store = config.store.clone();
    let service = tokio::task::spawn_blocking(move || store.open_service())
        .await
        .context("store bootstrap worker failed")?
        .with_context(|| format!("failed to open store {}", config.store.describe()))?;
    info!(
        "event=serve module=cli status=start addr={} store={}",
        config.listen_addr,
        config.store.describe()
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("event=serve module=cli status=stopping reason=ctrl_c");
        }
        shutdown.cancel();
    });

    Server::new(Arc::new(service))
        .serve(config.listen_addr, cancel)
        .await
        .context("server failed")
}

async fn connect(target: &Target) -> Result<RegistryClient> {
    RegistryClient::connect(target.addr.as_str())
        .await
        .with_context(|| format!("failed to connect to {}", target.addr))
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::{CommandFactory, Parser};
    use petreg_rpc::SearchDetail;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_requires_exactly_one_field() {
        assert!(Cli::try_parse_from(["petreg", "search"]).is_err());
        assert!(
            Cli::try_parse_from(["petreg", "search", "--name", "Buddy", "--age", "3"]).is_err()
        );

        let cli = Cli::try_parse_from(["petreg", "search", "--age", "3"]).unwrap();
        match cli.command {
            Command::Search { by, .. } => assert_eq!(by.into_detail(), Some(SearchDetail::Age(3))),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn max_records_needs_in_memory_store() {
        assert!(Cli::try_parse_from(["petreg", "serve", "--max-records", "10"]).is_err());

        let args = ["petreg", "serve", "--in-memory", "--max-records", "10"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Serve { max_records, .. } => assert_eq!(max_records, Some(10)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn serve_rejects_db_with_in_memory() {
        assert!(
            Cli::try_parse_from(["petreg", "serve", "--db", "/tmp/x.db", "--in-memory"]).is_err()
        );
    }
}
