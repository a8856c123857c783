mod auth;
mod config;
mod debug;
mod error;
mod fleet;
mod pipelines;
mod server_stats;
mod service;
mod vendor_ffi;

use std::sync::Arc;

use clap::Parser;
use snic_proto::sn_p4::v2::smartnic_p4_server::SmartnicP4Server;
use snic_stats::StatsTree;
use tonic::transport::{Identity, Server, ServerTlsConfig};

use auth::BearerAuth;
use config::Args;
use fleet::Fleet;
use server_stats::ServerClock;
use service::P4Service;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let resolved = args.resolve_server_config();

    let pipeline_defs = pipelines::load(&args.pipeline_config_file);
    let fleet = Fleet::open(&args.bus_ids, &pipeline_defs).unwrap_or_else(|e| {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    });
    log::info!("managing {} device(s), {} pipeline(s) each", fleet.devices.len(), pipeline_defs.len());

    let stats = StatsTree::new();
    let clock = Arc::new(ServerClock::now());
    server_stats::register(&stats, "server", clock.clone());
    fleet.register_stats(&stats);

    let service = P4Service { fleet, clock, debug: debug::DebugFlags::new(), stats };

    let cert_chain = std::fs::read(&resolved.tls_cert_chain)?;
    let key = std::fs::read(&resolved.tls_key)?;
    let identity = Identity::from_pem(cert_chain, key);
    let tls = ServerTlsConfig::new().identity(identity);

    let auth = BearerAuth::new(resolved.auth_tokens);
    let grpc_service = SmartnicP4Server::with_interceptor(service, auth);

    let addr = format!("{}:{}", args.address, args.port).parse()?;
    log::info!("serving sn_p4.v2.SmartnicP4 on {addr}");

    Server::builder()
        .tls_config(tls)?
        .add_service(grpc_service)
        .serve(addr)
        .await?;

    Ok(())
}
