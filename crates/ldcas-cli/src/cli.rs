use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ldcas",
    about = "Content-addressed JSON-LD document store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store root; overrides the configuration file
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compute a document's CID without storing it
    Seal(SealArgs),
    /// Store a document and point owner/slug at it
    Put(PutArgs),
    /// Print a stored document
    Get(GetArgs),
    /// Print the CID a named pointer refers to
    Resolve(PointerArgs),
    /// Show every CID a named pointer has referred to
    History(PointerArgs),
    /// List an owner's slugs, or every stored object
    Ls(LsArgs),
    /// Sign a stored object with an Ed25519 key
    Sign(SignArgs),
    /// Generate an Ed25519 signing key
    Keygen,
    /// Delete a stored object
    Rm(RmArgs),
    /// Re-check stored objects against their CIDs
    Verify(VerifyArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct SealArgs {
    /// Document path, or `-` for stdin
    pub file: PathBuf,
    /// Also print the canonical form
    #[arg(long)]
    pub canonical: bool,
}

#[derive(Args)]
pub struct PutArgs {
    pub owner: String,
    pub slug: String,
    /// Document path, or `-` for stdin
    pub file: PathBuf,
}

#[derive(Args)]
pub struct GetArgs {
    pub cid: String,
    /// Print the canonical bytes instead of the original
    #[arg(long)]
    pub canonical: bool,
}

#[derive(Args)]
pub struct PointerArgs {
    pub owner: String,
    pub slug: String,
}

#[derive(Args)]
pub struct LsArgs {
    pub owner: Option<String>,
}

#[derive(Args)]
pub struct SignArgs {
    pub cid: String,
    /// Hex-encoded 32-byte secret key
    #[arg(long)]
    pub key: String,
}

#[derive(Args)]
pub struct RmArgs {
    pub cid: String,
    /// Owner requesting the deletion
    #[arg(long = "as", value_name = "OWNER")]
    pub requester: String,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Check one object instead of the whole store
    pub cid: Option<String>,
}
