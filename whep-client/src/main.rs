mod command;
mod tracing_helper;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use tokio::{
    io::{stdin, AsyncBufReadExt, BufReader},
    runtime::Handle,
};
use tracing::{error, info};
use whep_lib::{
    peer_connection::event_channel, rtc_peer_connection::RtcPeerConnection,
    transport::HttpTransport, WhepConfig, WhepSignaler,
};

use crate::command::{Command, ServerTarget};

/// Receives a WebRTC stream from a WHEP endpoint.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "WHEP_CONFIG")]
    config: Option<PathBuf>,
    /// WHEP endpoint, overrides the config file
    #[arg(short, long, env = "WHEP_SERVER")]
    server: Option<String>,
    #[arg(long)]
    peer_id: Option<String>,
    /// Also write warnings to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<WhepConfig> {
    let mut config = match &args.config {
        Some(path) => WhepConfig::load(path)?,
        None => WhepConfig::default(),
    };
    if let Some(server) = &args.server {
        config.server_address = Some(server.clone());
    }
    if let Some(peer_id) = &args.peer_id {
        config.local_peer_id = Some(peer_id.clone());
    }
    Ok(config)
}

fn run_command(signaler: &WhepSignaler, command: Command) -> Result<()> {
    match command {
        Command::Restart => signaler.restart_connection()?,
        Command::Server(ServerTarget::Preset(index)) => {
            let Some(url) = signaler.config().server_preset(index) else {
                anyhow::bail!("no server preset {}", index + 1);
            };
            signaler.switch_server(url.to_owned())?;
        }
        Command::Server(ServerTarget::Url(url)) => signaler.switch_server(url)?,
        Command::Status => {
            let state = signaler.state();
            match signaler.session() {
                Some(session) => println!(
                    "{:?} server={} local={} remote={}",
                    state,
                    session.server_address(),
                    session.local_peer_id(),
                    session.remote_peer_id().unwrap_or("-"),
                ),
                None => println!("{:?}", state),
            }
        }
        Command::Quit => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_helper::init_tracing(args.log_file.as_deref());
    let config = load_config(&args)?;

    let (events, event_stream) = event_channel();
    let peer_connection = RtcPeerConnection::new(&config.ice_servers, events).await?;
    let transport = HttpTransport::new(config.request_timeout())?;
    let signaler = WhepSignaler::new(
        config,
        Arc::new(transport),
        peer_connection.clone(),
        Arc::new(Handle::current()),
    );
    signaler.start(event_stream)?;
    info!("commands: restart | server <n|url> | status | quit");

    let mut lines = BufReader::new(stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(err) => {
                error!("{}", err);
                continue;
            }
        };
        if let Err(err) = run_command(&signaler, command) {
            error!("{}", err);
        }
    }

    peer_connection.close().await?;
    Ok(())
}
