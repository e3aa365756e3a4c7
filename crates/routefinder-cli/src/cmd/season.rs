use crate::output::{print_fields, print_json};
use anyhow::Context;
use clap::Subcommand;
use routefinder_core::guide::{GuideDb, GuideStore, Season, SeasonStatus};
use std::path::Path;

#[derive(Subcommand, Debug)]
pub enum SeasonSubcommand {
    /// Show the most recent season record
    Show,
    /// Record a new season status (on or off)
    Set { status: SeasonStatus },
}

pub fn run(db_path: &Path, subcommand: SeasonSubcommand, json: bool) -> anyhow::Result<()> {
    let db = GuideDb::open(db_path)
        .with_context(|| format!("failed to open guide database {}", db_path.display()))?;
    match subcommand {
        SeasonSubcommand::Show => show(&db, json),
        SeasonSubcommand::Set { status } => {
            let season = Season::new(status);
            db.record_season(&season)?;
            if json {
                print_json(&season)
            } else {
                println!("Season set to {status}.");
                Ok(())
            }
        }
    }
}

fn show(db: &GuideDb, json: bool) -> anyhow::Result<()> {
    let season = db.load_season()?;
    if json {
        return print_json(&season);
    }
    match season {
        None => println!("No season recorded; recompute is enabled."),
        Some(season) => print_fields(&[
            ("status", season.status.to_string()),
            ("recorded_at", season.recorded_at.to_rfc3339()),
        ]),
    }
    Ok(())
}
