//! Evidence export
//!
//! Packages a snapshot and everything needed to verify it offline into a
//! court-presentable bundle:
//!
//! - `snapshot_payload.json` — the payload
//! - `snapshot_metadata.json` — hash, signature, chain link
//! - `integrity_report.json` — tamper detection result at export time
//! - `verification_instructions.txt` — how to re-verify with standard tools
//! - `incident_timeline.txt` — optional
//! - `chain_proof.json` — optional, genesis-to-snapshot path
//! - `manifest.json` — bundle contents and export timestamp
//!
//! Formats: tar archive, single JSON document, or metadata-only CSV.
//! Multi-snapshot bundles nest per-snapshot directories; a snapshot that
//! fails to export leaves a sentinel error file instead of sinking the
//! whole bundle. Archives are committed by tmp + rename, so a cancelled
//! export never leaves a partial bundle behind.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tar::{Builder, Header};

use crate::integrity::TamperDetector;
use crate::snapshot::{chain_proof, SnapshotStore};

use super::errors::{ForensicError, ForensicResult};
use super::timeline::{build_incident_timeline, render_timeline_text};

/// Evidence output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Tar archive with the full file set
    Archive,
    /// One JSON document with every section inline
    Json,
    /// Metadata-only CSV row
    Csv,
}

/// One file inside an evidence bundle
struct BundleFile {
    /// Path inside the archive
    name: String,
    /// Contents
    bytes: Vec<u8>,
}

/// Exports snapshots as evidence bundles
pub struct EvidenceExporter {
    store: Arc<SnapshotStore>,
    detector: TamperDetector,
}

impl EvidenceExporter {
    /// Bind to a snapshot store.
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        let detector = TamperDetector::new(Arc::clone(&store));
        Self { store, detector }
    }

    /// Export one snapshot to `out_dir`. Returns the written path.
    pub fn export(
        &self,
        snapshot_name: &str,
        format: ExportFormat,
        include_timeline: bool,
        out_dir: &Path,
    ) -> ForensicResult<PathBuf> {
        fs::create_dir_all(out_dir)?;
        match format {
            ExportFormat::Archive => {
                let files = self.bundle_files(snapshot_name, include_timeline)?;
                let target = out_dir.join(format!("{}_evidence.tar", snapshot_name));
                write_tar(&target, &files)?;
                Ok(target)
            }
            ExportFormat::Json => {
                let document = self.json_document(snapshot_name, include_timeline)?;
                let target = out_dir.join(format!("{}_evidence.json", snapshot_name));
                atomic_write(&target, serde_json::to_string_pretty(&document)?.as_bytes())?;
                Ok(target)
            }
            ExportFormat::Csv => {
                let csv = self.metadata_csv(snapshot_name)?;
                let target = out_dir.join(format!("{}_metadata.csv", snapshot_name));
                atomic_write(&target, csv.as_bytes())?;
                Ok(target)
            }
        }
    }

    /// Export several snapshots into one archive with per-snapshot
    /// directories. Individual failures become sentinel error files.
    pub fn export_many(
        &self,
        snapshot_names: &[&str],
        include_timeline: bool,
        out_dir: &Path,
    ) -> ForensicResult<PathBuf> {
        fs::create_dir_all(out_dir)?;
        let mut files = Vec::new();

        for name in snapshot_names {
            match self.bundle_files(name, include_timeline) {
                Ok(bundle) => files.extend(bundle),
                Err(e) => files.push(BundleFile {
                    name: format!("{}/export_error.txt", name),
                    bytes: format!("Export failed for snapshot '{}': {}\n", name, e)
                        .into_bytes(),
                }),
            }
        }

        let target = out_dir.join("evidence_bundle.tar");
        write_tar(&target, &files)?;
        Ok(target)
    }

    /// Assemble the full file set for one snapshot.
    fn bundle_files(
        &self,
        snapshot_name: &str,
        include_timeline: bool,
    ) -> ForensicResult<Vec<BundleFile>> {
        let payload = self
            .store
            .read(snapshot_name)?
            .ok_or_else(|| ForensicError::SnapshotMissing(snapshot_name.to_string()))?;
        let metadata = self
            .store
            .metadata(snapshot_name)?
            .ok_or_else(|| ForensicError::SnapshotMissing(snapshot_name.to_string()))?;
        let integrity = self.detector.detect(snapshot_name);

        let mut files = Vec::new();
        let dir = snapshot_name;

        files.push(BundleFile {
            name: format!("{}/snapshot_payload.json", dir),
            bytes: serde_json::to_vec_pretty(&payload)?,
        });
        files.push(BundleFile {
            name: format!("{}/snapshot_metadata.json", dir),
            bytes: serde_json::to_vec_pretty(&metadata)?,
        });
        files.push(BundleFile {
            name: format!("{}/integrity_report.json", dir),
            bytes: serde_json::to_vec_pretty(&integrity)?,
        });
        files.push(BundleFile {
            name: format!("{}/verification_instructions.txt", dir),
            bytes: verification_instructions(snapshot_name).into_bytes(),
        });

        if include_timeline {
            let timeline = build_incident_timeline(&self.store, &self.detector, snapshot_name);
            files.push(BundleFile {
                name: format!("{}/incident_timeline.txt", dir),
                bytes: render_timeline_text(&timeline).into_bytes(),
            });
        }

        let chain = self.store.load_chain()?;
        if let Some(proof) = chain_proof(&chain, &metadata.content_hash) {
            files.push(BundleFile {
                name: format!("{}/chain_proof.json", dir),
                bytes: serde_json::to_vec_pretty(proof)?,
            });
        }

        let manifest = json!({
            "snapshot_name": snapshot_name,
            "exported_at": Utc::now().to_rfc3339(),
            "contents": files.iter().map(|f| f.name.clone()).collect::<Vec<_>>(),
            "integrity_status": integrity.status.as_str(),
        });
        files.push(BundleFile {
            name: format!("{}/manifest.json", dir),
            bytes: serde_json::to_vec_pretty(&manifest)?,
        });

        Ok(files)
    }

    /// One JSON document holding every section inline.
    fn json_document(
        &self,
        snapshot_name: &str,
        include_timeline: bool,
    ) -> ForensicResult<Value> {
        let payload = self
            .store
            .read(snapshot_name)?
            .ok_or_else(|| ForensicError::SnapshotMissing(snapshot_name.to_string()))?;
        let metadata = self
            .store
            .metadata(snapshot_name)?
            .ok_or_else(|| ForensicError::SnapshotMissing(snapshot_name.to_string()))?;
        let integrity = self.detector.detect(snapshot_name);

        let mut document = json!({
            "snapshot_name": snapshot_name,
            "exported_at": Utc::now().to_rfc3339(),
            "payload": payload,
            "metadata": metadata,
            "integrity_report": integrity,
            "verification_instructions": verification_instructions(snapshot_name),
        });

        if include_timeline {
            let timeline = build_incident_timeline(&self.store, &self.detector, snapshot_name);
            document["incident_timeline"] = serde_json::to_value(timeline)?;
        }

        let chain = self.store.load_chain()?;
        if let Some(proof) = chain_proof(&chain, &metadata.content_hash) {
            document["chain_proof"] = serde_json::to_value(proof)?;
        }

        Ok(document)
    }

    /// Metadata-only CSV (header + one row).
    fn metadata_csv(&self, snapshot_name: &str) -> ForensicResult<String> {
        let metadata = self
            .store
            .metadata(snapshot_name)?
            .ok_or_else(|| ForensicError::SnapshotMissing(snapshot_name.to_string()))?;
        let integrity = self.detector.detect(snapshot_name);

        Ok(format!(
            "snapshot_name,content_hash,signature,prev_hash,sequence,timestamp,size_bytes,integrity_status\n{},{},{},{},{},{},{},{}\n",
            metadata.snapshot_name,
            metadata.content_hash,
            metadata.signature,
            metadata.prev_hash,
            metadata.sequence,
            metadata.timestamp,
            metadata.size_bytes,
            integrity.status.as_str(),
        ))
    }
}

/// Human-readable offline verification steps.
fn verification_instructions(snapshot_name: &str) -> String {
    format!(
        "VERIFICATION INSTRUCTIONS — snapshot '{name}'\n\
         =============================================\n\
         \n\
         1. CONTENT HASH\n\
            Compute SHA-256 over the exact bytes of snapshot_payload.json as\n\
            persisted by the control tower (canonical form: sorted keys, no\n\
            insignificant whitespace, ASCII escapes):\n\
            \n\
                sha256sum snapshot_payload.json\n\
            \n\
            The digest must equal `content_hash` in snapshot_metadata.json.\n\
         \n\
         2. SIGNATURE\n\
            Compute HMAC-SHA256 over the ASCII hex of `content_hash`, keyed\n\
            with the snapshot signing key held by the operator:\n\
            \n\
                printf '%s' \"<content_hash>\" | openssl dgst -sha256 -hmac \"<signing_key>\"\n\
            \n\
            The result must equal `signature`. Compare with a constant-time\n\
            routine when scripting.\n\
         \n\
         3. CHAIN LINKAGE\n\
            `prev_hash` in snapshot_metadata.json must equal the\n\
            `content_hash` of the previous snapshot in chain_proof.json;\n\
            the first chain entry references the genesis value\n\
            (64 ASCII zeros).\n\
         \n\
         Any mismatch means the artifact must not be trusted.\n",
        name = snapshot_name
    )
}

/// Write a tar archive atomically with deterministic entry ordering.
fn write_tar(target: &Path, files: &[BundleFile]) -> ForensicResult<()> {
    let tmp = target.with_extension("tar.tmp");

    {
        let file = File::create(&tmp)?;
        let mut builder = Builder::new(file);

        let mut ordered: Vec<&BundleFile> = files.iter().collect();
        ordered.sort_by(|a, b| a.name.cmp(&b.name));

        for entry in ordered {
            let mut header = Header::new_gnu();
            header.set_size(entry.bytes.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, &entry.name, entry.bytes.as_slice())?;
        }

        let file = builder.into_inner()?;
        file.sync_all()?;
    }

    fs::rename(&tmp, target)?;
    Ok(())
}

/// tmp + rename for single-file outputs
fn atomic_write(target: &Path, bytes: &[u8]) -> ForensicResult<()> {
    let tmp = target.with_extension("tmp");
    let mut file = File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, target)?;
    Ok(())
}
