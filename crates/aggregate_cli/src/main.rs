//! Demo entry point.
//!
//! # Responsibility
//! - Open a store from `StoreConfig` (JSON file argument or environment).
//! - Run the "Star Destroyer" aggregate scenario end to end.
//! - Print a deterministic JSON report of what was persisted and observed.

use aggregate_core::{
    init_from_config, open_with_config, with_transaction, AggregateTemplate, Entity, EntityType,
    Identifier, LoggingSink, MappingResult, Migration, OneToOne, Record, RecordedEvent,
    RecordingSink, SqliteDataAccessStrategy, StoreConfig,
};
use log::info;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::process::ExitCode;

const DEMO_SCHEMA: &[Migration] = &[Migration::new(
    1,
    "CREATE TABLE IF NOT EXISTS lego_set (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS manual (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        content TEXT,
        lego_set INTEGER REFERENCES lego_set(id)
    );",
)];

#[derive(Debug, Clone, Serialize)]
struct LegoSet {
    id: Option<Identifier>,
    name: String,
    manual: Option<Manual>,
}

#[derive(Debug, Clone, Serialize)]
struct Manual {
    id: Option<Identifier>,
    content: String,
}

impl Entity for LegoSet {
    fn entity_type() -> &'static EntityType<Self> {
        static TYPE: Lazy<EntityType<LegoSet>> = Lazy::new(|| {
            EntityType::builder("lego_set", "id")
                .column("name")
                .relation(OneToOne::new("manual", "lego_set", |set: &mut LegoSet| {
                    &mut set.manual
                }))
                .build()
        });
        &TYPE
    }

    fn id(&self) -> Option<Identifier> {
        self.id
    }

    fn set_id(&mut self, id: Identifier) {
        self.id = Some(id);
    }

    fn write_columns(&self, record: &mut Record) {
        record.set("name", self.name.clone());
    }

    fn read_columns(record: &Record) -> MappingResult<Self> {
        Ok(Self {
            id: None,
            name: record.get("name")?,
            manual: None,
        })
    }
}

impl Entity for Manual {
    fn entity_type() -> &'static EntityType<Self> {
        static TYPE: Lazy<EntityType<Manual>> =
            Lazy::new(|| EntityType::builder("manual", "id").column("content").build());
        &TYPE
    }

    fn id(&self) -> Option<Identifier> {
        self.id
    }

    fn set_id(&mut self, id: Identifier) {
        self.id = Some(id);
    }

    fn write_columns(&self, record: &mut Record) {
        record.set("content", self.content.clone());
    }

    fn read_columns(record: &Record) -> MappingResult<Self> {
        Ok(Self {
            id: None,
            content: record.get("content")?,
        })
    }
}

#[derive(Debug, Serialize)]
struct Report {
    core_version: &'static str,
    saved: LegoSet,
    reloaded: Option<LegoSet>,
    manuals_after_clearing: u64,
    events: Vec<RecordedEvent>,
}

fn main() -> ExitCode {
    match run() {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("aggregate_cli error: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("aggregate_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<Report, Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => StoreConfig::from_json_file(path)?,
        None => StoreConfig::from_env()?,
    };
    init_from_config(&config)?;

    let mut conn = open_with_config(&config, DEMO_SCHEMA)?;
    let recording = RecordingSink::new();
    let report = star_destroyer_scenario(&mut conn, &recording)?;
    info!(
        "event=cli_scenario module=cli status=ok events={}",
        report.events.len()
    );
    Ok(report)
}

fn star_destroyer_scenario(
    conn: &mut Connection,
    recording: &RecordingSink,
) -> Result<Report, Box<dyn Error>> {
    let sink = (LoggingSink, recording);
    let mut lego_set = LegoSet {
        id: None,
        name: "Star Destroyer".to_string(),
        manual: Some(Manual {
            id: None,
            content: "Accelerates to 99% of light speed. Destroys almost everything.".to_string(),
        }),
    };

    let id = with_transaction(conn, |access| {
        AggregateTemplate::new(access, &sink).save(&mut lego_set)
    })?;
    let saved = lego_set.clone();

    let template = AggregateTemplate::new(SqliteDataAccessStrategy::new(conn), &sink);
    let reloaded = template.find_by_id::<LegoSet>(id)?;

    lego_set.manual = None;
    template.save(&mut lego_set)?;
    let manuals_after_clearing = template.count::<Manual>()?;

    Ok(Report {
        core_version: aggregate_core::core_version(),
        saved,
        reloaded,
        manuals_after_clearing,
        events: recording.events(),
    })
}
