mod cli;

use quarry::config::GroupPool;
use quarry::inventory::Inventory;
use quarry::resolver::Resolver;
use quarry::store::{ApiSession, Auth};

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("QUARRY_LOG"))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

fn run(cli: cli::Cli) -> anyhow::Result<()> {
    // Configuration errors are reported before any session is opened.
    let pool = GroupPool::load_file(&cli.config)?;
    let auth = auth_from_args(&cli.connection)?;

    let mut session = ApiSession::connect(&cli.connection.url, &cli.connection.app_token, &auth)?;

    let mut inventory = Inventory::default();
    let result = Resolver::new(pool, &mut session, &mut inventory).run();
    session.close();
    result?;

    match cli.command {
        cli::Command::List(list) => output(&list.output, &inventory)?,
        cli::Command::Host(host) => {
            let vars = inventory
                .host_vars(&host.name)
                .ok_or_else(|| anyhow::anyhow!("host '{}' not found in inventory", host.name))?;
            output(&host.output, vars)?;
        }
    }

    Ok(())
}

fn auth_from_args(connection: &cli::ConnectionArgs) -> anyhow::Result<Auth> {
    if let Some(token) = &connection.user_token {
        return Ok(Auth::UserToken(token.clone()));
    }

    match (&connection.username, &connection.password) {
        (Some(username), Some(password)) => Ok(Auth::Basic {
            username: username.clone(),
            password: password.clone(),
        }),
        _ => anyhow::bail!("either --user-token or --username and --password are required"),
    }
}

fn output<T: serde::Serialize>(output: &cli::OutputArgs, value: &T) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
    };

    Ok(())
}
