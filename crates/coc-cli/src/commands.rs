use std::future::Future;
use std::io;
use std::sync::Arc;

use anyhow::{bail, Context};
use coc_crypto::{EncryptedKey, SigningKey};
use coc_gateway::{GatewayConfig, GatewayServer};
use coc_ledger::{AddressCheck, AddressCodec};
use coc_sdk::{
    CancellationToken, ClientConfig, CustodyClient, CustodyEvent, CustodyStatus, DeviceType,
    HttpLedgerClient, LedgerAddress, LedgerState, Session, Submission,
};
use colored::Colorize;
use serde_json::json;

use crate::cli::*;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let ctx = Settings::new(&cli)?;
    match cli.command {
        Command::Keygen(args) => cmd_keygen(&ctx, args),
        Command::Pubkey(args) => cmd_pubkey(&ctx, args),
        Command::Address(args) => cmd_address(&ctx, args),
        Command::Register(args) => cmd_register(&ctx, args).await,
        Command::Update(args) => cmd_update(&ctx, args).await,
        Command::Search(args) => cmd_search(&ctx, args).await,
        Command::History(args) => cmd_history(&ctx, args).await,
        Command::Serve(args) => cmd_serve(args).await,
    }
}

/// Settings shared by every subcommand.
struct Settings {
    json: bool,
    client: ClientConfig,
}

impl Settings {
    fn new(cli: &Cli) -> anyhow::Result<Self> {
        let mut client = ClientConfig::from_env().context("reading COC_* environment")?;
        if let Some(url) = &cli.gateway {
            client = client.with_gateway(url)?;
        }
        if let Some(secs) = cli.timeout {
            client.request_timeout_secs = secs;
        }
        Ok(Self {
            json: matches!(cli.format, OutputFormat::Json),
            client,
        })
    }

    fn custody(&self, wait: Option<&WaitArgs>) -> anyhow::Result<CustodyClient<HttpLedgerClient>> {
        let gateway = HttpLedgerClient::new(&self.client)?;
        let mut poller = self.client.poller.clone();
        if let Some(attempts) = wait.and_then(|w| w.max_attempts) {
            poller.max_attempts = attempts;
        }
        Ok(CustodyClient::new(Arc::new(gateway), poller))
    }
}

fn passphrase(args: &KeyArgs) -> anyhow::Result<&str> {
    match args.passphrase.as_deref() {
        Some(p) if !p.is_empty() => Ok(p),
        _ => bail!("a passphrase is required (--passphrase or COC_PASSPHRASE)"),
    }
}

fn session(user_id: &str, args: &KeyArgs) -> anyhow::Result<Session> {
    let pass = passphrase(args)?;
    Session::from_key_file(user_id, &args.key, pass)
        .with_context(|| format!("unlocking {}", args.key.display()))
}

fn short_id(id: &str) -> &str {
    id.get(..16).unwrap_or(id)
}

fn now() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}

fn cmd_keygen(ctx: &Settings, args: KeygenArgs) -> anyhow::Result<()> {
    let path = &args.key.key;
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let pass = passphrase(&args.key)?;
    let key = SigningKey::generate();
    let file = EncryptedKey::encrypt(&key, pass)?;
    file.save(path)
        .with_context(|| format!("writing {}", path.display()))?;

    if ctx.json {
        println!("{}", json!({ "public_key": file.public_key, "path": path }));
    } else {
        println!("{} Key written to {}", "✓".green().bold(), path.display().to_string().bold());
        println!("  Public key: {}", file.public_key.cyan());
    }
    Ok(())
}

fn cmd_pubkey(ctx: &Settings, args: PubkeyArgs) -> anyhow::Result<()> {
    let file = EncryptedKey::load(&args.key)
        .with_context(|| format!("reading {}", args.key.display()))?;
    if ctx.json {
        println!("{}", json!({ "public_key": file.public_key }));
    } else {
        println!("{}", file.public_key);
    }
    Ok(())
}

fn evidence_address(args: &EvidenceArgs) -> LedgerAddress {
    AddressCodec::custody(&args.case_num, &args.image_hash)
}

fn cmd_address(ctx: &Settings, args: EvidenceArgs) -> anyhow::Result<()> {
    let address = evidence_address(&args);
    if ctx.json {
        println!("{}", json!({ "address": address.as_str() }));
    } else {
        println!("{address}");
    }
    Ok(())
}

async fn cmd_register(ctx: &Settings, args: RegisterArgs) -> anyhow::Result<()> {
    let session = session(&args.user_id, &args.key)?;
    let event = CustodyEvent {
        registration_time: args.time.unwrap_or_else(now),
        status: CustodyStatus::from(args.status),
        case_num: args.evidence.case_num,
        location: args.location,
        checker_name: args.checker_name,
        device_type: DeviceType::from(args.device_type),
        image_type: args.image_type,
        image_file_name: args.image_file_name,
        image_hash: args.evidence.image_hash,
    };
    let client = ctx.custody(Some(&args.wait))?;
    let submission = client.register(&session, event).await?;
    finish(ctx, &client, submission, &args.wait).await
}

async fn cmd_update(ctx: &Settings, args: UpdateArgs) -> anyhow::Result<()> {
    let session = session(&args.user_id, &args.key)?;
    let client = ctx.custody(Some(&args.wait))?;
    let address = evidence_address(&args.evidence);

    let mut event = client
        .prepare_update(
            &address,
            CustodyStatus::from(args.status),
            args.time.unwrap_or_else(now),
        )
        .await
        .context("loading the latest record")?;
    if let Some(location) = args.location {
        event.location = location;
    }
    if let Some(checker) = args.checker_name {
        event.checker_name = checker;
    }

    let submission = client.register(&session, event).await?;
    finish(ctx, &client, submission, &args.wait).await
}

/// Report a submission and, unless told not to, wait for it to commit.
async fn finish(
    ctx: &Settings,
    client: &CustodyClient<HttpLedgerClient>,
    submission: Submission,
    wait: &WaitArgs,
) -> anyhow::Result<()> {
    if !ctx.json {
        println!("{} Submitted {}", "✓".green().bold(), short_id(&submission.transaction_id).yellow());
        println!("  Address: {}", submission.address.as_str().cyan());
    }
    if wait.no_wait {
        if ctx.json {
            println!(
                "{}",
                json!({
                    "address": submission.address.as_str(),
                    "transaction_id": submission.transaction_id,
                    "batch_id": submission.batch_id,
                    "link": submission.receipt.link,
                })
            );
        }
        return Ok(());
    }

    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let confirmed = client.confirm(&submission.address, &token).await?;
    if ctx.json {
        println!(
            "{}",
            json!({
                "address": submission.address.as_str(),
                "transaction_id": submission.transaction_id,
                "batch_id": submission.batch_id,
                "entries": confirmed.state.len(),
                "latest": confirmed.latest,
            })
        );
    } else {
        println!(
            "{} Committed ({} record{} at this address)",
            "✓".green().bold(),
            confirmed.state.len(),
            if confirmed.state.len() == 1 { "" } else { "s" }
        );
    }
    Ok(())
}

async fn cmd_search(ctx: &Settings, args: EvidenceArgs) -> anyhow::Result<()> {
    let address = evidence_address(&args);
    let state = ctx.custody(None)?.search(&address).await?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print_state(&address, &state);
    }
    Ok(())
}

fn dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

fn print_state(address: &LedgerAddress, state: &LedgerState) {
    println!("Address {}", address.as_str().cyan());
    for (i, record) in state.entries.iter().enumerate() {
        let status = record.status.as_ref().map(|s| s.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "{:>3}. {}  {}  {} @ {}",
            i + 1,
            dash(&record.registration_time).dimmed(),
            status.green(),
            dash(&record.checker_name),
            dash(&record.location),
        );
        println!("     user {}  owner {}", dash(&record.user_id), dash(&record.owner).dimmed());
    }
}

async fn cmd_history(ctx: &Settings, args: HistoryArgs) -> anyhow::Result<()> {
    let public_key = match args.public_key {
        Some(key) => key,
        None => {
            EncryptedKey::load(&args.key)
                .with_context(|| format!("reading {}", args.key.display()))?
                .public_key
        }
    };
    let client = ctx.custody(None)?;

    if ctx.json {
        let rows = client.my_transactions(&public_key).await?;
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let cases = client.history(&public_key).await?;
    if cases.is_empty() {
        println!("No records signed by {}.", public_key.cyan());
        return Ok(());
    }
    for case in &cases {
        println!("Case {}", case.case_num.yellow().bold());
        for signed in &case.records {
            let r = &signed.record;
            let status = r.status.as_ref().map(|s| s.to_string()).unwrap_or_else(|| "-".into());
            println!(
                "  {}  {}  {}  {}",
                dash(&r.registration_time).dimmed(),
                status.green(),
                dash(&r.image_file_name),
                short_id(&signed.transaction_id).dimmed(),
            );
        }
    }
    Ok(())
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => GatewayConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(delay) = args.commit_delay_ms {
        config.commit_delay_ms = delay;
    }
    if args.legacy_addresses {
        config.handler.address_check = AddressCheck::Legacy;
    }

    println!("{} Gateway on {}", "✓".green().bold(), config.bind_addr.to_string().bold());
    GatewayServer::new(config)
        .serve_with_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await?;
    Ok(())
}

/// Resolve once `signal` fires. If the signal handler cannot be installed
/// the error is logged and the gateway keeps running.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(error) => {
            tracing::error!(%error, "cannot listen for ctrl-c, gateway will run until killed");
            std::future::pending::<()>().await;
        }
    }
}
