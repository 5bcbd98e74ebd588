#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Timbertrace command-line entrypoint.
//! Builds, stages, proves and re-verifies evidence batches. Logs go to stderr, results
//! to stdout as JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{debug, info};

use timbertrace::core::config::PipelineConfig;
use timbertrace::core::evidence::batch::{select_unit, ForestUnit};
use timbertrace::core::hash::{parse_hash32, to_hex_prefixed};
use timbertrace::core::ricardian::{
    ricardian_hash, signing_digest, verify_ricardian_document, Eip712Domain,
    RicardianForestMessage,
};
use timbertrace::core::service::{proof_in_batch, CommitmentService, UnitCommitment};
use timbertrace::core::state::merkle::audit_proofs;
use timbertrace::core::state::persistent_state::{KvStore, MemoryStore, SledStore};
use timbertrace::core::types::{encode_batch_json, CommitmentStatus};
use timbertrace::core::verify::{verify_batch_integrity, verify_flight_integrity, IntegrityStatus};
use timbertrace::monitoring::{logging, metrics::Metrics};

/// Exit code for a root mismatch.
const EXIT_MISMATCH: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "timbertrace", version, about = "Forest evidence batches and Merkle commitments")]
struct Cli {
    /// TOML config file (default: $TIMBERTRACE_CONFIG, else built-in defaults).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a batch and its root from a forest unit.
    Build {
        /// Unit JSON, or an API response with a `forestUnits` map.
        #[arg(long)]
        unit: PathBuf,
        /// Unit to pick from `forestUnits` (default: the last one).
        #[arg(long)]
        unit_key: Option<String>,
        /// Container id stamped on every record (default: the unit key).
        #[arg(long)]
        container_id: Option<String>,
        /// Write the persisted batch here.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Stage batch and pending commitment in the store.
        #[arg(long)]
        stage: bool,
    },
    /// Inclusion proof for one record of a persisted batch.
    Proof {
        /// Persisted batch file.
        #[arg(long, required_unless_present = "container_id")]
        batch: Option<PathBuf>,
        /// Staged container instead of a file.
        #[arg(long, conflicts_with = "batch")]
        container_id: Option<String>,
        /// Record identity.
        #[arg(long)]
        identity: String,
    },
    /// Re-verify a persisted batch against a committed root.
    Verify {
        /// Persisted batch file.
        #[arg(long, required_unless_present = "container_id")]
        batch: Option<PathBuf>,
        /// Staged container instead of a file.
        #[arg(long, conflicts_with = "batch")]
        container_id: Option<String>,
        /// Committed root (`0x` hex). Omit for a staged container to use its confirmed root.
        #[arg(long)]
        root: Option<String>,
    },
    /// Root of a drone flight-data file.
    Flight {
        /// JSON array of flight points.
        #[arg(long)]
        records: PathBuf,
        /// Device id for points that carry none.
        #[arg(long)]
        device_id: String,
        /// Committed root to check against.
        #[arg(long)]
        root: Option<String>,
    },
    /// Record that the ledger accepted a staged root.
    Confirm {
        /// Container id.
        #[arg(long)]
        container_id: String,
        /// Root accepted by the ledger.
        #[arg(long)]
        root: String,
        /// Ledger reference, e.g. transaction hash.
        #[arg(long)]
        ledger_ref: Option<String>,
    },
    /// Ricardian hash and EIP-712 signing digest of a contract document.
    RicardianDigest {
        /// Contract document (JSON, without runtime fields).
        #[arg(long)]
        document: PathBuf,
        /// Chain id of the domain.
        #[arg(long)]
        chain_id: u64,
        /// Verifying contract address.
        #[arg(long)]
        verifying_contract: String,
        /// Batch root (default: `technical.merkleRootUnified`).
        #[arg(long)]
        merkle_root: Option<String>,
    },
    /// Check a stored contract document against its expected hash.
    RicardianVerify {
        /// Stored document.
        #[arg(long)]
        document: PathBuf,
        /// Expected Ricardian hash.
        #[arg(long)]
        expected: String,
    },
    /// List staged containers.
    List,
}

fn read_json(path: &Path) -> Result<Value> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

fn print_json(v: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

fn open_store(cfg: &PipelineConfig) -> Result<SledStore> {
    let dir = &cfg.store.data_dir;
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    SledStore::open(dir).with_context(|| format!("open store at {}", dir.display()))
}

fn service<S: KvStore>(store: S, cfg: &PipelineConfig, metrics: &Arc<Metrics>) -> CommitmentService<S> {
    CommitmentService::new(store, cfg.clone()).with_metrics(Arc::clone(metrics))
}

fn nested_str<'a>(v: &'a Value, a: &str, b: &str) -> Option<&'a str> {
    v.get(a)?.get(b)?.as_str()
}

fn run(cli: Cli) -> Result<ExitCode> {
    let cfg = PipelineConfig::load(cli.config.as_deref()).context("load config")?;
    logging::init(&cfg.logging);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        built = option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
        target = option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown"),
        rustc = option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown"),
        "timbertrace starting"
    );
    let metrics = Arc::new(Metrics::new().map_err(|e| anyhow!("metrics init: {e}"))?);

    let code = match cli.command {
        Command::Build {
            unit,
            unit_key,
            container_id,
            out,
            stage,
        } => {
            let input = read_json(&unit)?;
            let (key, unit_value) = if input.get("forestUnits").is_some() {
                let (k, v) = select_unit(&input, unit_key.as_deref())
                    .ok_or_else(|| anyhow!("forest unit not found"))?;
                (Some(k), v)
            } else {
                (unit_key, &input)
            };
            let Some(container_id) = container_id.or(key) else {
                bail!("--container-id is required when the unit has no key");
            };
            let forest_unit = ForestUnit::from_value(unit_value);

            let report = if stage {
                let svc = service(open_store(&cfg)?, &cfg, &metrics);
                let built = svc.build_unit(&container_id, &forest_unit)?;
                let record = svc.stage(&built)?;
                svc.store().flush()?;
                build_summary(&built, out.as_deref(), Some(record.status))?
            } else {
                let svc = service(MemoryStore::new(), &cfg, &metrics);
                let built = svc.build_unit(&container_id, &forest_unit)?;
                build_summary(&built, out.as_deref(), None)?
            };
            print_json(&report)?;
            ExitCode::SUCCESS
        }
        Command::Proof {
            batch,
            container_id,
            identity,
        } => {
            let bundle = match (batch, container_id) {
                (Some(path), _) => proof_in_batch(&read_json(&path)?, &identity)?,
                (None, Some(id)) => service(open_store(&cfg)?, &cfg, &metrics).proof_for(&id, &identity)?,
                (None, None) => bail!("--batch or --container-id is required"),
            };
            print_json(&bundle)?;
            ExitCode::SUCCESS
        }
        Command::Verify {
            batch,
            container_id,
            root,
        } => {
            let report = match (batch, container_id) {
                (Some(path), _) => {
                    let r = verify_batch_integrity(root.as_deref(), &read_json(&path)?)?;
                    metrics.observe_integrity(r.status);
                    r
                }
                (None, Some(id)) => {
                    service(open_store(&cfg)?, &cfg, &metrics).verify_stored(&id, root.as_deref())?
                }
                (None, None) => bail!("--batch or --container-id is required"),
            };
            print_json(&report)?;
            if report.status == IntegrityStatus::Mismatch {
                ExitCode::from(EXIT_MISMATCH)
            } else {
                ExitCode::SUCCESS
            }
        }
        Command::Flight {
            records,
            device_id,
            root,
        } => {
            let points = read_json(&records)?;
            let report = verify_flight_integrity(root.as_deref(), &points, &device_id)?;
            let status = root.as_ref().map(|_| report.status);
            if let Some(s) = status {
                metrics.observe_integrity(s);
            }
            print_json(&json!({
                "deviceId": device_id,
                "root": report.computed_root,
                "records": report.leaf_count,
                "committedRoot": report.committed_root,
                "status": status,
            }))?;
            if status == Some(IntegrityStatus::Mismatch) {
                ExitCode::from(EXIT_MISMATCH)
            } else {
                ExitCode::SUCCESS
            }
        }
        Command::Confirm {
            container_id,
            root,
            ledger_ref,
        } => {
            let svc = service(open_store(&cfg)?, &cfg, &metrics);
            let record = svc.record_confirmation(&container_id, &root, ledger_ref.as_deref())?;
            svc.store().flush()?;
            print_json(&record)?;
            ExitCode::SUCCESS
        }
        Command::RicardianDigest {
            document,
            chain_id,
            verifying_contract,
            merkle_root,
        } => {
            let doc = read_json(&document)?;
            let root_text = merkle_root
                .as_deref()
                .or_else(|| nested_str(&doc, "technical", "merkleRootUnified"))
                .ok_or_else(|| anyhow!("no merkle root given or in document"))?;
            let message = RicardianForestMessage {
                forest_unit_key: nested_str(&doc, "scope", "forestUnitKey")
                    .unwrap_or_default()
                    .to_string(),
                ricardian_hash: ricardian_hash(&doc),
                merkle_root: parse_hash32(root_text).context("parse merkle root")?,
                created_at: nested_str(&doc, "timestamps", "createdAt")
                    .unwrap_or_default()
                    .to_string(),
            };
            let domain = Eip712Domain::ricardian_forest(chain_id, &verifying_contract)?;
            print_json(&json!({
                "ricardianHash": to_hex_prefixed(&message.ricardian_hash),
                "domainSeparator": to_hex_prefixed(&domain.separator()),
                "digest": to_hex_prefixed(&signing_digest(&domain, &message)),
            }))?;
            ExitCode::SUCCESS
        }
        Command::RicardianVerify { document, expected } => {
            let bytes = fs::read(&document).with_context(|| format!("read {}", document.display()))?;
            let check = verify_ricardian_document(&bytes, &expected)?;
            print_json(&check)?;
            if check.ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_MISMATCH)
            }
        }
        Command::List => {
            let svc = service(open_store(&cfg)?, &cfg, &metrics);
            let mut rows = Vec::new();
            for id in svc.containers()? {
                if let Some(rec) = svc.commitment(&id)? {
                    rows.push(rec);
                }
            }
            print_json(&rows)?;
            ExitCode::SUCCESS
        }
    };

    if let Ok(text) = metrics.render() {
        debug!(metrics = %text, "run metrics");
    }
    Ok(code)
}

fn build_summary(
    built: &UnitCommitment,
    out: Option<&Path>,
    staged: Option<CommitmentStatus>,
) -> Result<Value> {
    if let Some(path) = out {
        let bytes = encode_batch_json(&built.batch.records)?;
        fs::write(path, bytes).with_context(|| format!("write {}", path.display()))?;
    }
    let audit = audit_proofs(&built.tree);
    Ok(json!({
        "containerId": built.container_id,
        "root": built.tree.hex_root(),
        "records": built.batch.len(),
        "duplicatesSkipped": built.batch.duplicates_skipped,
        "unidentifiedSkipped": built.batch.unidentified_skipped,
        "proofAudit": { "total": audit.total, "valid": audit.valid, "invalid": audit.invalid },
        "staged": staged,
    }))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
