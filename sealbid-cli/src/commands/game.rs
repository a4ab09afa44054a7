use anyhow::{bail, Context};
use clap::Subcommand;
use sealbid_core::{
    Amount, AttestationPolicy, GameConfig, Identity, SettlementInput, Variant, WinnerRule,
};

use super::{parse_game_id, Session};

#[derive(Subcommand)]
pub enum GameCommands {
    /// Create a new game
    Create {
        /// Game variant (decentralized, managed)
        variant: String,
        /// Manager identity
        manager: String,
        /// Manager public key (hex), managed games only
        #[arg(short, long)]
        public_key: Option<String>,
        /// Stake per bid in satoshis
        #[arg(short, long)]
        stake: Option<u64>,
        /// Winner rule (lowest-unique, highest-unique, closest:<target>)
        #[arg(short, long)]
        rule: Option<String>,
        /// Manager fee in basis points
        #[arg(long)]
        fee_bps: Option<u16>,
        /// Check reported values against the sealed bids
        #[arg(long)]
        verify: bool,
        /// Message published with the game
        #[arg(short, long, default_value = "")]
        message: String,
    },
    /// List games of a variant
    List {
        /// Game variant (decentralized, managed); all when omitted
        variant: Option<String>,
    },
    /// Show game status
    Status {
        /// Game ID
        game_id: String,
    },
    /// Show the bids of a game
    Bids {
        /// Game ID
        game_id: String,
    },
    /// Show the event log of a game
    Events {
        /// Game ID
        game_id: String,
    },
    /// Close betting and start reveals (decentralized)
    BeginVerification {
        /// Game ID
        game_id: String,
        /// Caller identity
        caller: String,
        /// Message to participants
        #[arg(short, long, default_value = "")]
        message: String,
    },
    /// Disclose the decryption key and start evaluation (managed)
    Disclose {
        /// Game ID
        game_id: String,
        /// Caller identity
        caller: String,
        /// Manager private key (hex)
        private_key: String,
        /// Message to participants
        #[arg(short, long, default_value = "")]
        message: String,
    },
    /// Settle the game and pay the winner
    End {
        /// Game ID
        game_id: String,
        /// Caller identity
        caller: String,
        /// Reported values as identity=number, managed games only
        values: Vec<String>,
    },
}

pub async fn handle_game_command(cmd: GameCommands, session: &Session) -> anyhow::Result<()> {
    let registry = session.registry();

    match cmd {
        GameCommands::Create {
            variant,
            manager,
            public_key,
            stake,
            rule,
            fee_bps,
            verify,
            message,
        } => {
            let variant: Variant = variant.parse()?;
            let mut config = registry.config().defaults.clone();
            if let Some(stake) = stake {
                config.stake = Amount::from_sat(stake);
            }
            if let Some(rule) = rule {
                config = config.with_winner_rule(parse_rule(&rule)?);
            }
            if let Some(bps) = fee_bps {
                config = config.with_manager_fee_bps(bps);
            }
            if verify {
                config = config.with_attestation(AttestationPolicy::VerifyCiphertexts);
            }

            let public_key = public_key
                .map(|k| hex::decode(k.trim_start_matches("0x")))
                .transpose()
                .context("Public key must be hex")?;

            let game_id = registry.create_game(
                variant,
                Identity::new(manager),
                public_key,
                Some(config.clone()),
                message,
            )?;
            session.persist(game_id).await?;

            println!("Game created successfully!");
            println!("  ID: {}", game_id);
            println!("  Variant: {}", variant);
            print_config(&config, variant);
        }

        GameCommands::List { variant } => {
            let variant = variant.map(|v| v.parse::<Variant>()).transpose()?;
            let records = session.store().list_games(variant).await?;

            if records.is_empty() {
                println!("No games found");
                return Ok(());
            }

            for record in records {
                println!(
                    "{}  {:<13}  {:<12}  manager {}",
                    record.id,
                    record.variant.as_str(),
                    record.phase,
                    record.manager
                );
            }
        }

        GameCommands::Status { game_id } => {
            let game_id = parse_game_id(&game_id)?;
            let info = registry.game_info(game_id)?;
            let config = registry.snapshot(game_id)?.config().clone();

            println!("Game {}", info.id);
            println!("  Variant: {}", info.variant);
            println!("  Manager: {}", info.manager);
            println!("  Phase: {}", info.phase);
            println!("  Bids: {}", info.bid_count);
            println!("  Escrow: {} sats", info.balance.to_sat());
            println!("  Created: {}", info.created_at.format("%Y-%m-%d %H:%M:%S"));
            print_config(&config, info.variant);

            if let Some(key) = registry.manager_public_key(game_id)? {
                println!("  Manager public key: {}", hex::encode(key));
            }
            if let Some(disclosure) = registry.disclosure(game_id)? {
                println!("  Disclosed key: {}", hex::encode(&disclosure.private_key));
                println!("  Manager message: {}", disclosure.message);
            }
            if let (Some(winner), Some(prize)) = (info.winner, info.winner_prize) {
                println!("  Winner: {} ({} sats)", winner, prize.to_sat());
                let candidates = registry.possible_winners(game_id)?;
                if candidates.len() > 1 {
                    let names: Vec<_> = candidates.iter().map(|c| c.to_string()).collect();
                    println!("  Tied with: {}", names.join(", "));
                }
            }
            if let Some(fee) = info.manager_fee {
                println!("  Manager fee: {} sats", fee.to_sat());
            }
        }

        GameCommands::Bids { game_id } => {
            let game_id = parse_game_id(&game_id)?;
            let bids = registry.bids(game_id)?;

            if bids.is_empty() {
                println!("No bids yet");
                return Ok(());
            }

            for (i, bid) in bids.iter().enumerate() {
                let value = bid
                    .revealed_value()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "hidden".to_string());
                println!(
                    "{}. {}  {} sats  value {}{}",
                    i + 1,
                    bid.participant(),
                    bid.stake().to_sat(),
                    value,
                    if bid.is_verified() { " (verified)" } else { "" }
                );
            }
        }

        GameCommands::Events { game_id } => {
            let game_id = parse_game_id(&game_id)?;
            for record in session.store().events_for(game_id).await? {
                println!(
                    "{}  {}",
                    record.published_at.format("%Y-%m-%d %H:%M:%S"),
                    serde_json::to_string(&record.event)?
                );
            }
        }

        GameCommands::BeginVerification {
            game_id,
            caller,
            message,
        } => {
            let game_id = parse_game_id(&game_id)?;
            registry.begin_verification(game_id, &Identity::new(caller), message)?;
            session.persist(game_id).await?;
            println!("Verification started. Participants can now reveal.");
        }

        GameCommands::Disclose {
            game_id,
            caller,
            private_key,
            message,
        } => {
            let game_id = parse_game_id(&game_id)?;
            let private_key =
                hex::decode(private_key.trim_start_matches("0x")).context("Key must be hex")?;
            registry.disclose_key(game_id, &Identity::new(caller), private_key, message)?;
            session.persist(game_id).await?;
            println!("Key disclosed. Game is in evaluation.");
        }

        GameCommands::End {
            game_id,
            caller,
            values,
        } => {
            let game_id = parse_game_id(&game_id)?;
            let input = if values.is_empty() {
                None
            } else {
                Some(parse_values(&values)?)
            };

            registry.end_game(game_id, &Identity::new(caller), input.as_ref())?;
            session.persist(game_id).await?;

            let info = registry.game_info(game_id)?;
            if let (Some(winner), Some(prize)) = (info.winner, info.winner_prize) {
                println!("Game ended. Winner: {} ({} sats)", winner, prize.to_sat());
            }
        }
    }

    Ok(())
}

fn print_config(config: &GameConfig, variant: Variant) {
    println!("  Stake: {} sats", config.stake.to_sat());
    println!("  Winner rule: {}", describe_rule(config.winner_rule));
    if variant == Variant::Managed {
        println!("  Manager fee: {} bps", config.manager_fee_bps);
        println!("  Attestation: {:?}", config.attestation);
    }
}

fn describe_rule(rule: WinnerRule) -> String {
    match rule {
        WinnerRule::LowestUnique => "lowest-unique".to_string(),
        WinnerRule::HighestUnique => "highest-unique".to_string(),
        WinnerRule::ClosestTo { target } => format!("closest:{}", target),
    }
}

fn parse_rule(rule: &str) -> anyhow::Result<WinnerRule> {
    match rule {
        "lowest-unique" => Ok(WinnerRule::LowestUnique),
        "highest-unique" => Ok(WinnerRule::HighestUnique),
        other => match other.strip_prefix("closest:") {
            Some(target) => Ok(WinnerRule::ClosestTo {
                target: target
                    .parse()
                    .with_context(|| format!("Invalid target: {}", target))?,
            }),
            None => bail!("Unknown winner rule: {}", other),
        },
    }
}

fn parse_values(values: &[String]) -> anyhow::Result<SettlementInput> {
    let mut entries = Vec::with_capacity(values.len());
    for value in values {
        let (who, number) = value
            .split_once('=')
            .with_context(|| format!("Expected identity=number, got {}", value))?;
        let number: u16 = number
            .parse()
            .with_context(|| format!("Invalid number for {}: {}", who, number))?;
        entries.push((Identity::new(who), number));
    }
    Ok(SettlementInput::new(entries))
}
