use anyhow::Context;
use clap::Subcommand;
use sealbid_core::{
    public_key_for, Amount, Commitment, HashCommitment, Identity, Phase, SealedNumber, Variant,
};

use super::{parse_game_id, Session};

#[derive(Subcommand)]
pub enum BidCommands {
    /// Compute a hash commitment for a decentralized game
    Hash {
        /// Number to bid
        number: u16,
        /// Secret used to reveal later
        secret: String,
        /// Identity placing the bid
        participant: String,
    },
    /// Seal a number to a manager public key for a managed game
    Seal {
        /// Manager public key (hex)
        public_key: String,
        /// Number to bid
        number: u16,
    },
    /// Derive the public key for a manager private key
    Pubkey {
        /// Private key (hex)
        private_key: String,
    },
    /// Place a bid
    Commit {
        /// Game ID
        game_id: String,
        /// Identity placing the bid
        participant: String,
        /// Hash (hex) or sealed number (base64), as produced by `hash`/`seal`
        commitment: String,
        /// Attached stake in satoshis (defaults to the game stake)
        #[arg(short, long)]
        stake: Option<u64>,
    },
    /// Reveal a hash-committed number
    Reveal {
        /// Game ID
        game_id: String,
        /// Identity that placed the bid
        participant: String,
        /// Committed number
        number: u16,
        /// Committed secret
        secret: String,
    },
}

pub async fn handle_bid_command(cmd: BidCommands, session: &Session) -> anyhow::Result<()> {
    let registry = session.registry();

    match cmd {
        BidCommands::Hash {
            number,
            secret,
            participant,
        } => {
            let commitment = HashCommitment::new(number, &secret, &Identity::new(participant));
            println!("{}", commitment);
        }

        BidCommands::Seal { public_key, number } => {
            let public_key =
                hex::decode(public_key.trim_start_matches("0x")).context("Key must be hex")?;
            let sealed = SealedNumber::seal(&public_key, number)?;
            println!("{}", sealed.to_base64());
        }

        BidCommands::Pubkey { private_key } => {
            let private_key =
                hex::decode(private_key.trim_start_matches("0x")).context("Key must be hex")?;
            println!("{}", hex::encode(public_key_for(&private_key)?));
        }

        BidCommands::Commit {
            game_id,
            participant,
            commitment,
            stake,
        } => {
            let game_id = parse_game_id(&game_id)?;
            let info = registry.game_info(game_id)?;

            let commitment: Commitment = match info.variant {
                Variant::Decentralized => HashCommitment::from_hex(&commitment)?.into(),
                Variant::Managed => SealedNumber::from_base64(&commitment)?.into(),
            };
            let stake = stake.map(Amount::from_sat).unwrap_or(info.stake);

            registry.commit(game_id, Identity::new(participant), commitment, stake)?;
            session.persist(game_id).await?;

            println!("Bid placed with {} sats", stake.to_sat());
        }

        BidCommands::Reveal {
            game_id,
            participant,
            number,
            secret,
        } => {
            let game_id = parse_game_id(&game_id)?;
            registry.reveal(game_id, &Identity::new(participant), number, &secret)?;
            session.persist(game_id).await?;

            println!("Bid verified");
            if registry.phase(game_id)? == Phase::Evaluation {
                println!("All bids verified. Game is in evaluation.");
            }
        }
    }

    Ok(())
}
