use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use tracing::debug;

use ldcas_canon::Sealer;
use ldcas_crypto::SigningKey;
use ldcas_sdk::{Engine, EngineConfig, IntegrityReport};
use ldcas_types::{Cid, Owner, Slug};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.root)?;
    let open = || Engine::open(config.clone());
    match cli.command {
        // Sealing touches no store, so it never opens one.
        Command::Seal(args) => cmd_seal(&Sealer::new(config.seal_config()), args),
        Command::Put(args) => cmd_put(&open()?, args),
        Command::Get(args) => cmd_get(&open()?, args),
        Command::Resolve(args) => cmd_resolve(&open()?, args),
        Command::History(args) => cmd_history(&open()?, args),
        Command::Ls(args) => cmd_ls(&open()?, args),
        Command::Sign(args) => cmd_sign(&open()?, args),
        Command::Keygen => cmd_keygen(),
        Command::Rm(args) => cmd_rm(&open()?, args),
        Command::Verify(args) => cmd_verify(&open()?, args),
        Command::Config => cmd_config(&config),
    }
}

/// Configuration file first, then `--root` on top.
fn load_config(path: Option<&Path>, root: Option<PathBuf>) -> anyhow::Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(root) = root {
        config.root = root;
    }
    config.validate()?;
    debug!(root = %config.root.display(), hash = %config.hash, "configuration loaded");
    Ok(config)
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).context("reading stdin")?;
        return Ok(buf);
    }
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn parse_cid(s: &str) -> anyhow::Result<Cid> {
    Cid::parse(s).with_context(|| format!("invalid CID {s:?}"))
}

fn parse_pointer(owner: &str, slug: &str) -> anyhow::Result<(Owner, Slug)> {
    let owner = Owner::parse(owner).with_context(|| format!("invalid owner {owner:?}"))?;
    let slug = Slug::parse(slug).with_context(|| format!("invalid slug {slug:?}"))?;
    Ok((owner, slug))
}

fn cmd_seal(sealer: &Sealer, args: SealArgs) -> anyhow::Result<()> {
    let raw = read_input(&args.file)?;
    let sealed = sealer.seal(&raw)?;
    println!("{}", sealed.cid.as_str().yellow());
    if args.canonical {
        println!("{}", String::from_utf8_lossy(&sealed.canonical));
    }
    println!("  Form: {}", sealed.form.to_string().cyan());
    Ok(())
}

fn cmd_put(engine: &Engine, args: PutArgs) -> anyhow::Result<()> {
    let (owner, slug) = parse_pointer(&args.owner, &args.slug)?;
    let raw = read_input(&args.file)?;
    let saved = engine.save_document(&owner, &slug, &raw)?;
    let status = if saved.outcome.is_created() {
        "stored".green()
    } else {
        "already present".dimmed()
    };
    println!("{} {}/{} -> {}", "✓".green().bold(), owner, slug.as_str().bold(), saved.cid.as_str().yellow());
    println!("  Object: {status}");
    println!("  Form: {}", saved.form.to_string().cyan());
    Ok(())
}

fn cmd_get(engine: &Engine, args: GetArgs) -> anyhow::Result<()> {
    let cid = parse_cid(&args.cid)?;
    let record = engine.read_document(&cid)?;
    let bytes = if args.canonical { &record.canonical } else { &record.raw };
    let mut stdout = io::stdout().lock();
    stdout.write_all(bytes)?;
    if !bytes.ends_with(b"\n") {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

fn cmd_resolve(engine: &Engine, args: PointerArgs) -> anyhow::Result<()> {
    let (owner, slug) = parse_pointer(&args.owner, &args.slug)?;
    println!("{}", engine.resolve_cid(&owner, &slug)?);
    Ok(())
}

fn cmd_history(engine: &Engine, args: PointerArgs) -> anyhow::Result<()> {
    let (owner, slug) = parse_pointer(&args.owner, &args.slug)?;
    let history = engine.history(&owner, &slug)?;
    let mut count = 0usize;
    for entry in history.iter()? {
        let entry = entry?;
        count += 1;
        println!("{}  {}", entry.timestamp.to_string().dimmed(), entry.cid.as_str().yellow());
    }
    if count == 0 {
        println!("No history for {owner}/{slug}.");
    }
    Ok(())
}

fn cmd_ls(engine: &Engine, args: LsArgs) -> anyhow::Result<()> {
    match args.owner {
        Some(owner) => {
            let owner = Owner::parse(owner.as_str()).with_context(|| format!("invalid owner {owner:?}"))?;
            for slug in engine.list_slugs(&owner)? {
                let cid = engine.resolve_cid(&owner, &slug)?;
                println!("{}  {}", slug.as_str().bold(), cid.short().dimmed());
            }
        }
        None => {
            for cid in engine.list_objects()? {
                println!("{cid}");
            }
        }
    }
    Ok(())
}

fn cmd_sign(engine: &Engine, args: SignArgs) -> anyhow::Result<()> {
    let cid = parse_cid(&args.cid)?;
    let key = SigningKey::from_hex(&args.key).context("invalid signing key")?;
    let record = engine.sign_object(&cid, &key)?;
    println!("{} Signed {}", "✓".green().bold(), cid.as_str().yellow());
    println!("  Signer: {}", record.signer.cyan());
    Ok(())
}

fn cmd_keygen() -> anyhow::Result<()> {
    let key = SigningKey::generate();
    println!("Secret:  {}", hex::encode(key.as_bytes()));
    println!("Address: {}", key.verifying_key().address().cyan());
    Ok(())
}

fn cmd_rm(engine: &Engine, args: RmArgs) -> anyhow::Result<()> {
    let cid = parse_cid(&args.cid)?;
    let requester =
        Owner::parse(args.requester.as_str()).with_context(|| format!("invalid owner {:?}", args.requester))?;
    engine.delete_object(&cid, &requester)?;
    println!("{} Deleted {}", "✓".green().bold(), cid.as_str().yellow());
    Ok(())
}

fn cmd_verify(engine: &Engine, args: VerifyArgs) -> anyhow::Result<()> {
    let reports = match args.cid {
        Some(cid) => vec![engine.verify_object(&parse_cid(&cid)?)?],
        None => engine.verify_all()?,
    };
    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    for report in &reports {
        print_report(report);
    }
    if failed > 0 {
        bail!("{failed} of {} objects failed verification", reports.len());
    }
    println!("{} {} objects verified", "✓".green().bold(), reports.len());
    Ok(())
}

fn print_report(report: &IntegrityReport) {
    if report.is_ok() {
        println!("  {} {}", "ok".green(), report.cid.short());
        return;
    }
    println!("  {} {}", "FAIL".red().bold(), report.cid);
    if !report.canonical_matches {
        println!("    canonical bytes do not hash to the CID");
    }
    if !report.reseal_matches {
        println!("    original bytes do not re-seal to the CID");
    }
    if report.signature_valid == Some(false) {
        println!("    signature does not verify");
    }
}

fn cmd_config(config: &EngineConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
