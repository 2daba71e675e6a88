use aldrin_sdk::{
    constants::{POOLS_PROGRAM_ADDRESS, POOLS_V2_PROGRAM_ADDRESS},
    instructions::{InstructionData, SwapInstruction},
    layout::{from_bytes, Layout},
    math::{quote_exact_in, quote_exact_out, spot_price},
    rewards::compute_reward,
    state::{
        FarmingCalc, FarmingSnapshotQueue, FarmingState, FarmingTicket, Mint, OrderArray,
        PairSettings, PoolState, PoolStateV2, SnapshotQueue, TokenAccount,
    },
    CurveKind, Keyed, PoolReserves, RewardSummary, Side,
};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use log::{debug, info};
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ─── CLI definition ───────────────────────────────────────────────────────────

/// aldrin: offline inspector for Aldrin AMM accounts.
///
/// Global options can also be set via environment variables:
///   ALDRIN_ENCODING  how account files are stored (raw | base64)
///   ALDRIN_JSON      emit JSON instead of text
#[derive(Parser)]
#[command(
    name        = "aldrin",
    version     = env!("CARGO_PKG_VERSION"),
    long_version = concat!(
        env!("CARGO_PKG_VERSION"), "\n",
        "Pools program:    AMM55ShdkoGRB5jVYPjWziwk8m5MpwyDgsMWHaMSQWH6\n",
        "Pools v2 program: RinFPaym3xbnndu4SfQPAt1NzQWTfqL34cvf9eafakk\n",
        "Stable curve:     A = 85, 2 coins\n",
        "License:          MIT",
    ),
    about   = "Decode Aldrin pool, farming and TWAMM accounts; quote swaps; compute farming rewards.",
    after_help = "\
ENVIRONMENT:
  ALDRIN_ENCODING  Account file encoding  [default: raw]
  ALDRIN_JSON      Emit JSON output       [default: false]
  RUST_LOG         Log filter             [default: info]

QUICK START:
  solana account <POOL> --output-file pool.bin
  aldrin decode pool-v2 pool.bin
  aldrin quote --curve stable --side bid --base-reserve 1000000000 --quote-reserve 1000000000 --amount 1000000
  aldrin rewards --ticket ticket.bin --state state.bin --state-address <STATE> \\
                 --queue snapshots.bin --queue-address <QUEUE>"
)]
struct Cli {
    /// Encoding of account files passed to subcommands
    #[arg(
        long,
        global     = true,
        value_enum,
        value_name = "ENCODING",
        default_value_t = Encoding::Raw,
        env = "ALDRIN_ENCODING"
    )]
    encoding: Encoding,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false, env = "ALDRIN_JSON")]
    json: bool,

    /// Log debug output (Newton iterations, reward windows)
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an account dump and print its fields
    #[command(
        after_help = "\
EXAMPLES:
  aldrin decode pool pool.bin
  aldrin decode farming-ticket ticket.b64 --encoding base64
  aldrin --json decode token-account vault.bin"
    )]
    Decode {
        /// Account type stored in FILE
        #[arg(value_enum)]
        kind: AccountKind,

        /// Path to the account data
        file: PathBuf,
    },

    /// Quote a swap from pool reserves
    ///
    /// Bid spends quote tokens for base tokens; ask spends base for quote.
    /// Amounts are atomic units. No fees are applied.
    #[command(
        after_help = "\
EXAMPLES:
  # Spend 5 quote tokens
  aldrin quote --curve product --side bid --base-reserve 1000000 --quote-reserve 2000000000 --amount 5000000

  # How much quote is needed to receive exactly 2493 base
  aldrin quote --curve product --side bid --base-reserve 1000000 --quote-reserve 2000000000 --amount 2493 --exact-out"
    )]
    Quote {
        #[arg(long, value_enum)]
        curve: CurveArg,

        #[arg(long, value_enum)]
        side: SideArg,

        #[arg(long, value_name = "AMOUNT")]
        base_reserve: u64,

        #[arg(long, value_name = "AMOUNT")]
        quote_reserve: u64,

        /// Input amount, or the desired output with --exact-out
        #[arg(long, value_name = "AMOUNT")]
        amount: u64,

        #[arg(long, default_value_t = false)]
        exact_out: bool,
    },

    /// Price of one base token in quote tokens
    Price {
        #[arg(long, value_enum)]
        curve: CurveArg,

        #[arg(long, value_name = "AMOUNT")]
        base_reserve: u64,

        #[arg(long, value_name = "AMOUNT")]
        quote_reserve: u64,

        #[arg(long, value_name = "N", default_value_t = 0)]
        base_decimals: u8,

        #[arg(long, value_name = "N", default_value_t = 0)]
        quote_decimals: u8,
    },

    /// Claimable farming rewards of a ticket
    #[command(
        after_help = "\
NOTES:
  --now defaults to the current system time. It only decides which deferred
  tranches have finished vesting; the window end is the farming state's
  current_time."
    )]
    Rewards {
        /// Farming (or staking) ticket account file
        #[arg(long, value_name = "FILE")]
        ticket: PathBuf,

        /// Farming state account file
        #[arg(long, value_name = "FILE")]
        state: PathBuf,

        /// Address of the farming state
        #[arg(long, value_name = "PUBKEY")]
        state_address: String,

        /// Snapshot queue account file
        #[arg(long, value_name = "FILE")]
        queue: PathBuf,

        /// Address of the snapshot queue
        #[arg(long, value_name = "PUBKEY")]
        queue_address: String,

        /// Unix timestamp used for vesting maturity
        #[arg(long, value_name = "TS")]
        now: Option<i64>,

        /// Queue uses the 1500-entry legacy layout
        #[arg(long, default_value_t = false)]
        legacy_queue: bool,
    },

    /// Encode swap instruction data
    SwapData {
        #[arg(long, value_name = "AMOUNT")]
        tokens: u64,

        #[arg(long, value_name = "AMOUNT")]
        min_tokens: u64,

        #[arg(long, value_enum)]
        side: SideArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Encoding {
    Raw,
    Base64,
}

#[derive(Clone, Copy, ValueEnum)]
enum AccountKind {
    Pool,
    PoolV2,
    FarmingState,
    FarmingTicket,
    FarmingCalc,
    SnapshotQueue,
    LegacySnapshotQueue,
    OrderArray,
    PairSettings,
    TokenAccount,
    Mint,
}

#[derive(Clone, Copy, ValueEnum)]
enum CurveArg {
    Product,
    Stable,
}

impl From<CurveArg> for CurveKind {
    fn from(c: CurveArg) -> Self {
        match c {
            CurveArg::Product => CurveKind::ConstantProduct,
            CurveArg::Stable  => CurveKind::StableSwap,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Bid,
    Ask,
}

impl From<SideArg> for Side {
    fn from(s: SideArg) -> Self {
        match s {
            SideArg::Bid => Side::Bid,
            SideArg::Ask => Side::Ask,
        }
    }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    if std::env::args().len() == 1 {
        Cli::command().print_long_help().ok();
        println!();
        return Ok(());
    }

    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    match &cli.command {
        Commands::Decode { kind, file } => {
            cmd_decode(*kind, file, cli.encoding, cli.json)?;
        }
        Commands::Quote { curve, side, base_reserve, quote_reserve, amount, exact_out } => {
            let pool = PoolReserves::new(*base_reserve, *quote_reserve, (*curve).into());
            cmd_quote(&pool, (*side).into(), *amount, *exact_out, cli.json)?;
        }
        Commands::Price { curve, base_reserve, quote_reserve, base_decimals, quote_decimals } => {
            let pool = PoolReserves::new(*base_reserve, *quote_reserve, (*curve).into());
            cmd_price(&pool, *base_decimals, *quote_decimals, cli.json)?;
        }
        Commands::Rewards { ticket, state, state_address, queue, queue_address, now, legacy_queue } => {
            cmd_rewards(
                ticket, state, state_address, queue, queue_address,
                *now, *legacy_queue,
                cli.encoding, cli.json,
            )?;
        }
        Commands::SwapData { tokens, min_tokens, side } => {
            cmd_swap_data(*tokens, *min_tokens, (*side).into(), cli.json)?;
        }
    }

    Ok(())
}

// ─── Input helpers ────────────────────────────────────────────────────────────

fn read_account(path: &Path, encoding: Encoding) -> Result<Vec<u8>> {
    let raw = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let data = match encoding {
        Encoding::Raw => raw,
        Encoding::Base64 => {
            let text = String::from_utf8(raw).with_context(|| format!("{} is not base64 text", path.display()))?;
            STANDARD
                .decode(text.trim())
                .with_context(|| format!("decode base64 in {}", path.display()))?
        }
    };
    debug!("read {} bytes from {}", data.len(), path.display());
    Ok(data)
}

fn decode_file<T: Layout>(path: &Path, encoding: Encoding) -> Result<T> {
    let data = read_account(path, encoding)?;
    from_bytes(&data).with_context(|| format!("decode {}", path.display()))
}

fn parse_pubkey(value: &str, flag: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).map_err(|_| anyhow!("{flag}: '{value}' is not a base-58 public key"))
}

fn print_fields(title: &str, fields: &Value) {
    println!("─── {title} ─────────────────────────────────────────────────");
    if let Value::Object(map) = fields {
        for (key, value) in map {
            match value {
                Value::String(s) => println!("  {key:<26} {s}"),
                other => println!("  {key:<26} {other}"),
            }
        }
    }
}

// ─── decode ───────────────────────────────────────────────────────────────────

fn cmd_decode(kind: AccountKind, file: &Path, encoding: Encoding, json_output: bool) -> Result<()> {
    let (title, fields) = match kind {
        AccountKind::Pool => ("Pool (v1)", pool_fields(&decode_file::<PoolState>(file, encoding)?)),
        AccountKind::PoolV2 => {
            let pool: PoolStateV2 = decode_file(file, encoding)?;
            let mut fields = pool_fields(&pool);
            fields["curve_type"] = json!(pool.curve_type);
            fields["curve"] = json!(pool.curve.to_string());
            ("Pool (v2)", fields)
        }
        AccountKind::FarmingState => {
            let s: FarmingState = decode_file(file, encoding)?;
            ("Farming State", json!({
                "tokens_unlocked":     s.tokens_unlocked,
                "tokens_per_period":   s.tokens_per_period,
                "tokens_total":        s.tokens_total,
                "period_length":       s.period_length,
                "no_withdrawal_time":  s.no_withdrawal_time,
                "vesting_type":        s.vesting_type,
                "vesting_period":      s.vesting_period,
                "start_time":          s.start_time,
                "current_time":        s.current_time,
                "pool":                s.pool.to_string(),
                "farming_token_vault": s.farming_token_vault.to_string(),
                "farming_snapshots":   s.farming_snapshots.to_string(),
            }))
        }
        AccountKind::FarmingTicket => {
            let t: FarmingTicket = decode_file(file, encoding)?;
            let attached: Vec<Value> = t
                .states_attached
                .iter()
                .filter(|a| a.farming_state != Pubkey::default())
                .map(|a| json!({
                    "farming_state":             a.farming_state.to_string(),
                    "last_withdraw_time":        a.last_withdraw_time,
                    "last_vested_withdraw_time": a.last_vested_withdraw_time,
                }))
                .collect();
            ("Farming Ticket", json!({
                "tokens_frozen":   t.tokens_frozen,
                "start_time":      t.start_time,
                "end_time":        t.closed_at(),
                "user_key":        t.user_key.to_string(),
                "pool":            t.pool.to_string(),
                "next_attached":   t.next_attached,
                "states_attached": attached,
            }))
        }
        AccountKind::FarmingCalc => {
            let c: FarmingCalc = decode_file(file, encoding)?;
            ("Farming Calc", json!({
                "farming_state": c.farming_state.to_string(),
                "user_key":      c.user_key.to_string(),
                "initializer":   c.initializer.to_string(),
                "token_amount":  c.token_amount,
            }))
        }
        AccountKind::SnapshotQueue => {
            ("Snapshot Queue", queue_fields(&decode_file::<SnapshotQueue>(file, encoding)?))
        }
        AccountKind::LegacySnapshotQueue => {
            ("Snapshot Queue (legacy)", queue_fields(&decode_file::<FarmingSnapshotQueue>(file, encoding)?))
        }
        AccountKind::OrderArray => {
            let o: OrderArray = decode_file(file, encoding)?;
            let orders: Vec<Value> = o
                .active_orders()
                .map(|order| json!({
                    "authority":      order.authority.to_string(),
                    "amount":         order.amount,
                    "start_time":     order.start_time,
                    "end_time":       order.end_time,
                    "amount_filled":  order.amount_filled,
                    "remaining":      order.remaining(),
                    "tokens_swapped": order.tokens_swapped,
                }))
                .collect();
            ("TWAMM Order Array", json!({
                "side":                   o.side,
                "pair_settings":          o.pair_settings.to_string(),
                "twamm_from_token_vault": o.twamm_from_token_vault.to_string(),
                "twamm_to_token_vault":   o.twamm_to_token_vault.to_string(),
                "fee_account":            o.fee_account.to_string(),
                "active_orders":          orders,
            }))
        }
        AccountKind::PairSettings => {
            let p: PairSettings = decode_file(file, encoding)?;
            ("TWAMM Pair Settings", json!({
                "base_token_mint":     p.base_token_mint.to_string(),
                "quote_token_mint":    p.quote_token_mint.to_string(),
                "pyth":                p.pyth.to_string(),
                "discount":            format!("{}/{}", p.discount_numerator, p.discount_denominator),
                "placing_fee":         format!("{}/{}", p.fees.placing_fee_numerator, p.fees.placing_fee_denominator),
                "cancelling_fee":      format!("{}/{}", p.fees.cancelling_fee_numerator, p.fees.cancelling_fee_denominator),
                "minimum_tokens":      p.minimum_tokens,
                "base_mint_decimals":  p.base_mint_decimals,
                "quote_mint_decimals": p.quote_mint_decimals,
            }))
        }
        AccountKind::TokenAccount => {
            let a: TokenAccount = decode_file(file, encoding)?;
            ("Token Account", json!({
                "mint":   a.mint.to_string(),
                "owner":  a.owner.to_string(),
                "amount": a.amount,
                "state":  a.state,
            }))
        }
        AccountKind::Mint => {
            let m: Mint = decode_file(file, encoding)?;
            ("Mint", json!({
                "supply":         m.supply,
                "decimals":       m.decimals,
                "is_initialized": m.is_initialized,
                "mint_authority": (m.mint_authority_option != 0).then(|| m.mint_authority.to_string()),
            }))
        }
    };

    if json_output {
        println!("{}", json!({ "status": "ok", "command": "decode", "account": fields }));
    } else {
        print_fields(title, &fields);
    }
    Ok(())
}

fn pool_fields(pool: &PoolState) -> Value {
    json!({
        "pool_mint":              pool.pool_mint.to_string(),
        "base_token_mint":        pool.base_token_mint.to_string(),
        "base_token_vault":       pool.base_token_vault.to_string(),
        "quote_token_mint":       pool.quote_token_mint.to_string(),
        "quote_token_vault":      pool.quote_token_vault.to_string(),
        "pool_signer":            pool.pool_signer.to_string(),
        "lp_token_freeze_vault":  pool.lp_token_freeze_vault.to_string(),
        "authority":              pool.authority.to_string(),
        "fee_pool_token_account": pool.fee_pool_token_account.to_string(),
        "trade_fee":              format!("{}/{}", pool.fees.trade_fee_numerator, pool.fees.trade_fee_denominator),
        "owner_trade_fee":        format!("{}/{}", pool.fees.owner_trade_fee_numerator, pool.fees.owner_trade_fee_denominator),
        "owner_withdraw_fee":     format!("{}/{}", pool.fees.owner_withdraw_fee_numerator, pool.fees.owner_withdraw_fee_denominator),
    })
}

fn queue_fields<const N: usize>(queue: &SnapshotQueue<N>) -> Value {
    let latest = queue.latest();
    json!({
        "capacity":          N,
        "next_index":        queue.next_index,
        "cursor":            queue.cursor(),
        "snapshots":         queue.chronological().count(),
        "latest_time":       latest.map(|s| s.time),
        "latest_staked":     latest.map(|s| s.tokens_frozen),
    })
}

// ─── quote ────────────────────────────────────────────────────────────────────

fn cmd_quote(pool: &PoolReserves, side: Side, amount: u64, exact_out: bool, json_output: bool) -> Result<()> {
    let quote = if exact_out {
        quote_exact_out(pool, side, amount)
    } else {
        quote_exact_in(pool, side, amount)
    };
    let quote = quote.context("quote")?;

    if !quote.converged {
        info!("stable-swap solve hit its iteration cap; amounts are best-effort");
    }

    if json_output {
        println!("{}", json!({
            "status":    "ok",
            "command":   "quote",
            "exact_out": exact_out,
            "reserves":  pool,
            "quote":     quote,
        }));
    } else {
        let (pay, receive) = match side {
            Side::Bid => ("quote", "base"),
            Side::Ask => ("base", "quote"),
        };
        println!("─── Swap Quote ───────────────────────────────────────────────────");
        println!("  Curve            {:>20}", format!("{:?}", pool.curve));
        println!("  Base reserve     {:>20}", pool.base_reserve);
        println!("  Quote reserve    {:>20}", pool.quote_reserve);
        println!();
        println!("  Pay              {:>20}  {pay}", quote.amount_in);
        println!("  Receive          {:>20}  {receive}", quote.amount_out);
        if !quote.converged {
            println!("  (solver did not converge; best-effort amounts)");
        }
        println!();
        println!("  Fees are not included.");
    }
    Ok(())
}

// ─── price ────────────────────────────────────────────────────────────────────

fn cmd_price(pool: &PoolReserves, base_decimals: u8, quote_decimals: u8, json_output: bool) -> Result<()> {
    let price = spot_price(pool, base_decimals, quote_decimals).context("price")?;

    if json_output {
        println!("{}", json!({
            "status":   "ok",
            "command":  "price",
            "reserves": pool,
            "price":    price,
        }));
    } else {
        println!("─── Pool Price ───────────────────────────────────────────────────");
        println!("  Curve            {:>20}", format!("{:?}", pool.curve));
        println!("  Price            {:>20.6}  quote per base", price);
    }
    Ok(())
}

// ─── rewards ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn cmd_rewards(
    ticket_file:   &Path,
    state_file:    &Path,
    state_address: &str,
    queue_file:    &Path,
    queue_address: &str,
    now:           Option<i64>,
    legacy_queue:  bool,
    encoding:      Encoding,
    json_output:   bool,
) -> Result<()> {
    let ticket: FarmingTicket = decode_file(ticket_file, encoding)?;
    let state = Keyed::new(
        parse_pubkey(state_address, "--state-address")?,
        decode_file::<FarmingState>(state_file, encoding)?,
    );
    let queue_key = parse_pubkey(queue_address, "--queue-address")?;
    if queue_key != state.account.farming_snapshots {
        info!(
            "farming state references snapshot queue {}, not {queue_key}; nothing accrues",
            state.account.farming_snapshots
        );
    }

    let now = match now {
        Some(ts) => ts,
        None => unix_now()?,
    };

    let summary = if legacy_queue {
        let queue = Keyed::new(queue_key, decode_file::<FarmingSnapshotQueue>(queue_file, encoding)?);
        compute_reward(&ticket, &state, &[queue], now)
    } else {
        let queue = Keyed::new(queue_key, decode_file::<SnapshotQueue>(queue_file, encoding)?);
        compute_reward(&ticket, &state, &[queue], now)
    };

    print_rewards(&ticket, &state, &summary, now, json_output);
    Ok(())
}

fn unix_now() -> Result<i64> {
    let elapsed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .context("system clock is before 1970")?;
    i64::try_from(elapsed.as_secs()).context("system clock out of range")
}

fn print_rewards(
    ticket:      &FarmingTicket,
    state:       &Keyed<FarmingState>,
    summary:     &RewardSummary,
    now:         i64,
    json_output: bool,
) {
    if json_output {
        println!("{}", json!({
            "status":        "ok",
            "command":       "rewards",
            "farming_state": state.address.to_string(),
            "now":           now,
            "rewards":       summary,
        }));
        return;
    }

    let end = ticket.closed_at().map_or_else(|| "open".to_string(), |t| t.to_string());
    println!("─── Farming Rewards ──────────────────────────────────────────────");
    println!("  Farming state    {}", state.address);
    println!("  Staked           {:>20}", ticket.tokens_frozen);
    println!("  Ticket start     {:>20}", ticket.start_time);
    println!("  Ticket end       {:>20}", end);
    println!("  State time       {:>20}", state.account.current_time);
    println!();
    println!("  Immediate        {:>20}", summary.immediate_tokens);
    println!("  Vested           {:>20}", summary.vested_tokens);
    println!("  Unclaimed        {:>20}  over {} snapshots", summary.unclaimed_tokens, summary.unclaimed_snapshots);
}

// ─── swap-data ────────────────────────────────────────────────────────────────

fn cmd_swap_data(tokens: u64, min_tokens: u64, side: Side, json_output: bool) -> Result<()> {
    let data = SwapInstruction::new(tokens, min_tokens, side).data().context("encode swap")?;
    let encoded = STANDARD.encode(&data);

    if json_output {
        println!("{}", json!({
            "status":   "ok",
            "command":  "swap-data",
            "programs": [POOLS_PROGRAM_ADDRESS, POOLS_V2_PROGRAM_ADDRESS],
            "data":     encoded,
            "len":      data.len(),
        }));
    } else {
        println!("─── Swap Instruction Data ────────────────────────────────────────");
        println!("  Side             {:>20}", format!("{side:?}"));
        println!("  Tokens           {:>20}", tokens);
        println!("  Min tokens       {:>20}", min_tokens);
        println!("  Base64           {encoded}");
    }
    Ok(())
}
