use super::SandboxCommand;
use escrowgate::identity::Identity;
use escrowgate::ledger::{is_valid_classic_address, ReleaseAction, SandboxWallet};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Sandbox wallet helpers
///
/// These produce the login proofs and release authorizations the sandbox
/// ledger accepts, so the API can be driven with curl.
pub fn execute(command: SandboxCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        SandboxCommand::Wallet => {
            let (seed_hex, wallet) = generate_wallet()?;
            println!("seed:       {}", seed_hex.as_str());
            println!("address:    {}", wallet.address());
            println!("public key: {}", wallet.public_key_hex());
            println!();
            println!("⚠️  The seed controls this wallet. Keep it out of shell history.");
        }
        SandboxCommand::SignChallenge { seed, challenge } => {
            let wallet = SandboxWallet::from_seed_hex(&seed)?;
            println!("{}", wallet.sign_challenge(&challenge));
        }
        SandboxCommand::SignRelease {
            seed,
            treasury,
            sequence,
        } => {
            println!("{}", sign_release(&seed, &treasury, sequence)?);
        }
    }
    Ok(())
}

fn generate_wallet() -> Result<(Zeroizing<String>, SandboxWallet), Box<dyn std::error::Error>> {
    let mut seed = Zeroizing::new([0u8; 32]);
    SystemRandom::new()
        .fill(&mut *seed)
        .map_err(|_| "system randomness unavailable")?;
    let wallet = SandboxWallet::from_seed(&seed)?;
    Ok((Zeroizing::new(hex::encode(&*seed)), wallet))
}

fn sign_release(
    seed: &str,
    treasury: &str,
    sequence: u32,
) -> Result<String, Box<dyn std::error::Error>> {
    if !is_valid_classic_address(treasury) {
        return Err(format!("invalid treasury address: {}", treasury).into());
    }
    let wallet = SandboxWallet::from_seed_hex(seed)?;
    let action = ReleaseAction::escrow_finish(&Identity::new(treasury), sequence);
    Ok(wallet.sign_release(&action))
}
