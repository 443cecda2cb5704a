use clap::{Parser, Subcommand};

pub mod config;
pub mod run;
pub mod sandbox;
pub mod version;

#[derive(Parser)]
#[command(name = "escrowgate")]
#[command(author = "escrowgate contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-party approval service for treasury escrow releases", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the approval service
    Run {
        /// Path to config file (default: <config dir>/escrowgate/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Listen address, overrides `server.bind`
        #[arg(long)]
        bind: Option<String>,
    },

    /// Write a commented default config file
    InitConfig {
        /// Treasury address to put in the file
        #[arg(long)]
        treasury: String,

        /// Output path (default: <config dir>/escrowgate/config.toml)
        #[arg(long)]
        path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Sandbox wallet helpers for exercising the API by hand
    #[command(subcommand)]
    Sandbox(SandboxCommand),

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum SandboxCommand {
    /// Generate a wallet and print its seed and address
    Wallet,

    /// Sign a login challenge, printing the proof to send to /auth/verify
    SignChallenge {
        /// Wallet seed, 64 hex characters
        #[arg(long)]
        seed: String,

        /// Challenge string returned by /auth/login
        #[arg(long)]
        challenge: String,
    },

    /// Partially sign the release of an escrow, printing the tx_blob
    SignRelease {
        /// Wallet seed, 64 hex characters
        #[arg(long)]
        seed: String,

        /// Treasury address that owns the escrow
        #[arg(long)]
        treasury: String,

        /// Escrow offer sequence
        #[arg(long)]
        sequence: u32,
    },
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run { config, bind } => run::execute(config, bind).await,
        Commands::InitConfig {
            treasury,
            path,
            force,
        } => run::init_config(treasury, path, force),
        Commands::Sandbox(command) => sandbox::execute(command),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["escrowgate", "run"]);

        match cli.command {
            Commands::Run { config, bind } => {
                assert_eq!(config, None);
                assert_eq!(bind, None);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_with_all_options() {
        let cli = Cli::parse_from([
            "escrowgate",
            "run",
            "--config",
            "/etc/escrowgate.toml",
            "--bind",
            "0.0.0.0:8080",
        ]);

        match cli.command {
            Commands::Run { config, bind } => {
                assert_eq!(config, Some("/etc/escrowgate.toml".to_string()));
                assert_eq!(bind, Some("0.0.0.0:8080".to_string()));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_init_config() {
        let cli = Cli::parse_from([
            "escrowgate",
            "init-config",
            "--treasury",
            "rTreasury",
            "--force",
        ]);

        match cli.command {
            Commands::InitConfig {
                treasury,
                path,
                force,
            } => {
                assert_eq!(treasury, "rTreasury");
                assert_eq!(path, None);
                assert!(force);
            }
            _ => panic!("Expected InitConfig command"),
        }
    }

    #[test]
    fn test_cli_init_config_requires_treasury() {
        let result = Cli::try_parse_from(["escrowgate", "init-config"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_sandbox_wallet() {
        let cli = Cli::parse_from(["escrowgate", "sandbox", "wallet"]);
        assert!(matches!(
            cli.command,
            Commands::Sandbox(SandboxCommand::Wallet)
        ));
    }

    #[test]
    fn test_cli_parse_sandbox_sign_release() {
        let cli = Cli::parse_from([
            "escrowgate",
            "sandbox",
            "sign-release",
            "--seed",
            "00",
            "--treasury",
            "rTreasury",
            "--sequence",
            "7",
        ]);

        match cli.command {
            Commands::Sandbox(SandboxCommand::SignRelease {
                seed,
                treasury,
                sequence,
            }) => {
                assert_eq!(seed, "00");
                assert_eq!(treasury, "rTreasury");
                assert_eq!(sequence, 7);
            }
            _ => panic!("Expected SignRelease command"),
        }
    }

    #[test]
    fn test_cli_sign_release_rejects_bad_sequence() {
        let result = Cli::try_parse_from([
            "escrowgate",
            "sandbox",
            "sign-release",
            "--seed",
            "00",
            "--treasury",
            "rTreasury",
            "--sequence",
            "-1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_version() {
        let cli = Cli::parse_from(["escrowgate", "version"]);
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_cli_unknown_command() {
        let result = Cli::try_parse_from(["escrowgate", "register"]);
        assert!(result.is_err());
    }
}
