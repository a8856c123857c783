mod auth;
mod config;
mod debug;
mod error;
mod fleet;
mod server_stats;
mod service;

use std::sync::Arc;

use clap::Parser;
use snic_proto::sn_cfg::v2::smartnic_config_server::SmartnicConfigServer;
use snic_stats::StatsTree;
use tonic::transport::{Identity, Server, ServerTlsConfig};

use auth::BearerAuth;
use config::Args;
use fleet::Fleet;
use server_stats::ServerClock;
use service::CfgService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let resolved = args.resolve_server_config();

    let fleet = Fleet::open(&args.bus_ids).unwrap_or_else(|e| {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    });
    log::info!("managing {} device(s)", fleet.devices.len());

    let stats = StatsTree::new();
    let clock = Arc::new(ServerClock::now());
    server_stats::register(&stats, "cfg", clock.clone());

    let service = CfgService { fleet, clock, debug: debug::DebugFlags::new(), stats };

    let cert_chain = std::fs::read(&resolved.tls_cert_chain)?;
    let key = std::fs::read(&resolved.tls_key)?;
    let identity = Identity::from_pem(cert_chain, key);
    let tls = ServerTlsConfig::new().identity(identity);

    let auth = BearerAuth::new(resolved.auth_tokens);
    let grpc_service = SmartnicConfigServer::with_interceptor(service, auth);

    let addr = format!("{}:{}", args.address, args.port).parse()?;
    log::info!("serving sn_cfg.v2.SmartnicConfig on {addr}");

    Server::builder()
        .tls_config(tls)?
        .add_service(grpc_service)
        .serve(addr)
        .await?;

    Ok(())
}
