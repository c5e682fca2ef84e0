use std::path::PathBuf;

use anyhow::Result;
use argh::FromArgs;

use crate::config::Config;
use crate::observability;
use crate::workflow::{self, DeleteRequest};

/// Deletes a named resource through the management API.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Delete(DeleteCommand),
    List(ListCommand),
    Version(VersionCommand),
}

/// delete the configured resource by its exact name (default)
#[derive(Debug, Default, FromArgs)]
#[argh(subcommand, name = "delete")]
struct DeleteCommand {
    /// name of the resource, overrides the configured target name
    #[argh(option)]
    name: Option<String>,
}

/// print the names of all resources in the configured collection
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "list")]
struct ListCommand {}

/// print the alertctl version
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();
    let command = args
        .command
        .unwrap_or_else(|| Command::Delete(DeleteCommand::default()));

    // Special switch to just print the version and exit.
    if let Command::Version(_) = command {
        println!("{}", observability::RELEASE);
        return Ok(());
    }

    let config = Config::load(args.config.as_deref())?;

    // Sentry should be initialized before creating the async runtime.
    let _sentry_guard = observability::init_sentry(&config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing(&config);
    tracing::debug!(?config);

    runtime.block_on(async move {
        let session = workflow::session(&config)?;

        match command {
            Command::Delete(DeleteCommand { name }) => {
                let mut request = DeleteRequest::from_config(&config);
                if let Some(name) = name {
                    request.name = name;
                }

                let outcome = workflow::run(session, &request).await?;
                println!("{outcome}");
            }
            Command::List(ListCommand {}) => {
                let target = &config.target;
                let collection =
                    workflow::list(session, target.collection.clone(), target.namespace()).await?;
                for name in collection.names() {
                    println!("{name}");
                }
            }
            Command::Version(VersionCommand {}) => unreachable!(),
        }

        Ok(())
    })
}
