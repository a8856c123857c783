use std::fs;
use std::path::Path;

use clap::Parser;
use serde::Deserialize;

/// `sn-cfg.json`: `{"server":{"tls":{"cert-chain":...,"key":...},"auth":{"tokens":[...]}}}`.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    server: ConfigFileServer,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFileServer {
    #[serde(default)]
    tls: ConfigFileTls,
    #[serde(default)]
    auth: ConfigFileAuth,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFileTls {
    #[serde(rename = "cert-chain")]
    cert_chain: Option<String>,
    key: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFileAuth {
    #[serde(default)]
    tokens: Vec<String>,
}

#[derive(Debug, Parser)]
#[command(name = "sn-cfg-agent", about = "SmartNIC configuration agent")]
pub struct Args {
    /// PCI bus IDs of the devices to be managed, DDDD:BB:DD.F form.
    #[arg(required = true)]
    pub bus_ids: Vec<String>,

    #[arg(long, env = "SN_CFG_SERVER_ADDRESS", default_value = "[::]")]
    pub address: String,

    #[arg(long, env = "SN_CFG_SERVER_PORT", default_value_t = 50100)]
    pub port: u16,

    #[arg(long, env = "SN_CFG_SERVER_TLS_CERT_CHAIN")]
    pub tls_cert_chain: Option<String>,

    #[arg(long, env = "SN_CFG_SERVER_TLS_KEY")]
    pub tls_key: Option<String>,

    #[arg(long = "auth-token", env = "SN_CFG_SERVER_AUTH_TOKENS", value_delimiter = ' ')]
    pub auth_tokens: Vec<String>,

    #[arg(long)]
    pub no_config_file: bool,

    #[arg(long, default_value = "sn-cfg.json")]
    pub config_file: String,
}

pub struct ResolvedServerConfig {
    pub tls_cert_chain: String,
    pub tls_key: String,
    pub auth_tokens: Vec<String>,
}

impl Args {
    /// Applies the `--auth-token`/`--tls-*` CLI options, falling back to the
    /// JSON config file for whichever of them were left unset. Exits the
    /// process with a descriptive error if neither source supplies a
    /// required value, matching the agent's historical `EXIT_FAILURE` path.
    pub fn resolve_server_config(&self) -> ResolvedServerConfig {
        let config = if self.no_config_file {
            ConfigFile::default()
        } else {
            load_config_file(&self.config_file)
        };

        let auth_tokens = if !self.auth_tokens.is_empty() {
            self.auth_tokens.clone()
        } else if !config.server.auth.tokens.is_empty() {
            config.server.auth.tokens.clone()
        } else {
            eprintln!(
                "ERROR: missing tokens needed for authenticating clients. Specify one or more \
                 --auth-token options or add {{\"server\":{{\"auth\":{{\"tokens\":[...]}}}}}} to \
                 the config file."
            );
            std::process::exit(1);
        };

        let tls_cert_chain = self
            .tls_cert_chain
            .clone()
            .or_else(|| config.server.tls.cert_chain.clone())
            .unwrap_or_else(|| {
                eprintln!(
                    "ERROR: missing server certificate chain. Specify --tls-cert-chain or add \
                     {{\"server\":{{\"tls\":{{\"cert-chain\":\"<PATH>\"}}}}}} to the config file."
                );
                std::process::exit(1);
            });

        let tls_key = self
            .tls_key
            .clone()
            .or_else(|| config.server.tls.key.clone())
            .unwrap_or_else(|| {
                eprintln!(
                    "ERROR: missing server private key. Specify --tls-key or add \
                     {{\"server\":{{\"tls\":{{\"key\":\"<PATH>\"}}}}}} to the config file."
                );
                std::process::exit(1);
            });

        ResolvedServerConfig { tls_cert_chain, tls_key, auth_tokens }
    }
}

fn load_config_file(path: &str) -> ConfigFile {
    if !Path::new(path).exists() {
        return ConfigFile::default();
    }
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("ERROR: failed to read config file '{path}': {e}");
        std::process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("ERROR: failed to parse config file '{path}': {e}");
        std::process::exit(1);
    })
}
