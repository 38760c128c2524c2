//! CLI command implementations
//!
//! Commands assemble the subsystems explicitly (config first, then the log,
//! then everything derived from it) and print one JSON document per
//! invocation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Local;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::access::audit::AuditDenialStore;
use crate::config::TowerConfig;
use crate::emitter::{EventEmitter, EventSubscriber};
use crate::eventlog::{EventLog, ShipmentIdGenerator};
use crate::forensics::{EvidenceExporter, ExportFormat, ReplayEngine};
use crate::geo::StaticGeoResolver;
use crate::integrity::TamperDetector;
use crate::lifecycle::{ActorRole, EventType, LifecycleState};
use crate::notify::{NotificationDispatcher, NotificationStore};
use crate::observability::Logger;
use crate::projection::Projector;
use crate::snapshot::{SnapshotStore, SnapshotWorker};

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Parse a SCREAMING_SNAKE token into one of the closed enums
fn parse_token<T: DeserializeOwned>(kind: &str, token: &str) -> CliResult<T> {
    serde_json::from_value(Value::String(token.to_ascii_uppercase()))
        .map_err(|_| CliError::InvalidArgument(format!("Unknown {}: {}", kind, token)))
}

/// Assembled subsystems for one CLI invocation
struct Runtime {
    config: TowerConfig,
    log: Arc<EventLog>,
    projector: Arc<Projector>,
    snapshots: Arc<SnapshotStore>,
    notifications: Arc<NotificationStore>,
    audit: Arc<AuditDenialStore>,
}

impl Runtime {
    fn boot(data_dir: &Path) -> CliResult<Self> {
        let config = TowerConfig::from_env(data_dir)?;
        let log = Arc::new(EventLog::open(&config.log_dir())?);
        let projector = Arc::new(Projector::new(Arc::clone(&log)));
        let snapshots = Arc::new(SnapshotStore::open(
            &config.snapshot_dir(),
            config.signing_key.clone(),
        )?);
        let notifications = Arc::new(NotificationStore::open(&config.notification_dir())?);
        let audit = Arc::new(AuditDenialStore::open(&config.audit_dir())?);
        Ok(Self {
            config,
            log,
            projector,
            snapshots,
            notifications,
            audit,
        })
    }

    /// The emitter with the notification dispatcher subscribed
    fn emitter(&self) -> EventEmitter {
        let mut emitter = EventEmitter::new(Arc::clone(&self.log), Arc::new(StaticGeoResolver));
        let dispatcher = NotificationDispatcher::new(
            Arc::clone(&self.notifications),
            Arc::clone(&self.projector),
        );
        emitter.subscribe(Arc::new(dispatcher) as Arc<dyn EventSubscriber>);
        emitter
    }

    fn worker(&self) -> CliResult<SnapshotWorker> {
        Ok(SnapshotWorker::new(
            Arc::clone(&self.projector),
            Arc::clone(&self.snapshots),
            Arc::clone(&self.audit),
            &self.config,
        )?)
    }
}

fn print_json(value: &Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Dispatch one parsed command
pub fn run_command(data_dir: PathBuf, command: Command) -> CliResult<()> {
    let runtime = Runtime::boot(&data_dir)?;

    match command {
        Command::Create {
            source,
            destination,
            role,
        } => {
            let role: ActorRole = parse_token("role", &role)?;
            let ids = ShipmentIdGenerator::open(&runtime.config.log_dir())?;
            let shipment_id = ids.next_id()?;

            let metadata: BTreeMap<String, Value> = [
                ("source".to_string(), Value::String(source)),
                ("destination".to_string(), Value::String(destination)),
            ]
            .into_iter()
            .collect();

            let event = runtime.emitter().emit(
                &shipment_id,
                LifecycleState::None,
                LifecycleState::Created,
                EventType::ShipmentCreated,
                role,
                metadata,
            )?;
            print_json(&serde_json::to_value(&event)?)
        }

        Command::Transition {
            shipment_id,
            to,
            event_type,
            role,
        } => {
            let to: LifecycleState = parse_token("state", &to)?;
            let role: ActorRole = parse_token("role", &role)?;
            let event_type: EventType = match event_type {
                Some(token) => parse_token("event type", &token)?,
                None => parse_token("event type", to.as_str())?,
            };

            let row = runtime
                .projector
                .shipment(&shipment_id)?
                .ok_or_else(|| {
                    CliError::InvalidArgument(format!("Unknown shipment: {}", shipment_id))
                })?;

            let event = runtime.emitter().emit(
                &shipment_id,
                row.current_state,
                to,
                event_type,
                role,
                BTreeMap::new(),
            )?;
            print_json(&serde_json::to_value(&event)?)
        }

        Command::AssessRisk { shipment_id } => {
            use crate::analytics::{compute_corridor_sla_health, compute_risk_fusion, RiskLevel, RiskSignals};
            use crate::external::{
                HeuristicRoutingProvider, NeutralWeatherProvider, OrsRoutingProvider,
                OpenWeatherProvider, RoutingProvider, WeatherAssessment, WeatherProvider,
            };
            use crate::geo::state_centroid;

            let rows = runtime.projector.state()?;
            let row = rows.get(&shipment_id).ok_or_else(|| {
                CliError::InvalidArgument(format!("Unknown shipment: {}", shipment_id))
            })?;

            let weather_provider: Box<dyn WeatherProvider> =
                match runtime.config.weather_api_key.clone() {
                    Some(key) => Box::new(OpenWeatherProvider::new(key)?),
                    None => Box::new(NeutralWeatherProvider),
                };
            let routing_provider: Box<dyn RoutingProvider> =
                match runtime.config.routing_api_key.clone() {
                    Some(key) => Box::new(OrsRoutingProvider::new(key)?),
                    None => Box::new(HeuristicRoutingProvider),
                };

            let source = row.source_state.as_deref().and_then(state_centroid);
            let destination = row.destination_state.as_deref().and_then(state_centroid);

            let weather = match source {
                Some((lat, lon)) => weather_provider.assess(lat, lon),
                None => WeatherAssessment::neutral(),
            };
            let eta_uncertainty = match (source, destination) {
                (Some(from), Some(to)) => routing_provider.estimate(from, to).eta_uncertainty,
                _ => 50.0,
            };

            // Corridor history from the live SLA health of this corridor
            let health = compute_corridor_sla_health(rows.values());
            let corridor_history = row
                .corridor
                .as_ref()
                .and_then(|c| health.get(c))
                .map(|h| h.final_breach_probability * 100.0)
                .unwrap_or(30.0);

            let fusion = compute_risk_fusion(RiskSignals {
                weather: weather.risk_score,
                corridor_history,
                eta_uncertainty,
            });

            if fusion.risk_level >= RiskLevel::High {
                let dispatcher = NotificationDispatcher::new(
                    Arc::clone(&runtime.notifications),
                    Arc::clone(&runtime.projector),
                );
                dispatcher.emit(
                    "HIGH_RISK_ALERT",
                    &shipment_id,
                    [
                        ("shipment_id".to_string(), shipment_id.clone()),
                        ("weather_risk".to_string(), format!("{:.0}", weather.risk_score)),
                        ("corridor_risk".to_string(), format!("{:.0}", corridor_history)),
                        ("eta_risk".to_string(), format!("{:.0}", eta_uncertainty)),
                    ]
                    .into_iter()
                    .collect(),
                    BTreeMap::new(),
                )?;
            }

            let mut output = serde_json::to_value(&fusion)?;
            output["api_available"] = json!(weather.api_available);
            print_json(&output)
        }

        Command::VerifyLog => {
            let report = runtime.log.verify_integrity()?;
            print_json(&json!({
                "valid": report.valid,
                "errors": report.errors,
            }))
        }

        Command::Report => {
            let report = runtime.log.audit_report()?;
            print_json(&json!({
                "total_events": report.total_events,
                "total_shipments": report.total_shipments,
                "event_type_distribution": report.event_type_distribution,
                "actor_distribution": report.actor_distribution,
                "current_state_distribution": report.state_distribution,
                "log_integrity": if report.integrity.valid { "VALID" } else { "CORRUPTED" },
                "integrity_errors": report.integrity.errors,
                "first_event_time": report.first_event_time.map(|t| t.to_rfc3339()),
                "last_event_time": report.last_event_time.map(|t| t.to_rfc3339()),
            }))
        }

        Command::Snapshot => {
            let worker = runtime.worker()?;
            let written = worker.refresh_all();
            print_json(&serde_json::to_value(&written)?)
        }

        Command::VerifySnapshot { name, chain } => {
            let detector = TamperDetector::new(Arc::clone(&runtime.snapshots));
            let report = detector.detect(&name);
            let mut output = serde_json::to_value(&report)?;
            if let Some(chain_names) = chain {
                let names: Vec<&str> = chain_names.iter().map(String::as_str).collect();
                output["chain"] = serde_json::to_value(detector.verify_chain(&names))?;
            }
            print_json(&output)
        }

        Command::Replay { name, at } => {
            let engine = ReplayEngine::new(Arc::clone(&runtime.snapshots));
            let result = engine.replay(&name, at)?;
            print_json(&serde_json::to_value(&result)?)
        }

        Command::ExportEvidence { name, format, out } => {
            let exporter = EvidenceExporter::new(Arc::clone(&runtime.snapshots));
            let format = match format.as_str() {
                "tar" => ExportFormat::Archive,
                "json" => ExportFormat::Json,
                "csv" => ExportFormat::Csv,
                other => {
                    return Err(CliError::InvalidArgument(format!(
                        "Unknown export format: {}",
                        other
                    )))
                }
            };

            let written = if name.len() == 1 {
                exporter.export(&name[0], format, true, &out)?
            } else {
                if format != ExportFormat::Archive {
                    return Err(CliError::InvalidArgument(
                        "Multi-snapshot exports are archive-only".to_string(),
                    ));
                }
                let names: Vec<&str> = name.iter().map(String::as_str).collect();
                exporter.export_many(&names, true, &out)?
            };
            print_json(&json!({"written": written}))
        }

        Command::Notifications { role, unread } => {
            let role: ActorRole = parse_token("role", &role)?;
            let notifications = runtime.notifications.for_role(role, unread)?;
            let counts = runtime.notifications.counts_by_severity(role)?;
            print_json(&json!({
                "notifications": notifications,
                "unread_counts": counts,
            }))
        }

        Command::Worker => {
            let mut worker = runtime.worker()?;
            Logger::info(
                "WORKER_STARTED",
                &[
                    ("cadence", &runtime.config.snapshot_cron),
                    ("rollup", &runtime.config.rollup_cron),
                ],
            );
            loop {
                let written = worker.poll(Local::now());
                if !written.is_empty() {
                    Logger::info("WORKER_POLL", &[("written", &written.len().to_string())]);
                }
                thread::sleep(Duration::from_secs(30));
            }
        }
    }
}
