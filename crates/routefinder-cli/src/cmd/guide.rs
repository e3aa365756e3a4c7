use crate::output::{print_fields, print_json};
use anyhow::Context;
use clap::Subcommand;
use routefinder_core::guide::{GuideDb, GuideStore};
use std::path::Path;

#[derive(Subcommand, Debug)]
pub enum GuideSubcommand {
    /// Show the persisted guide
    Show,
    /// Ask the scheduler to recompute on its next pass
    MarkDirty,
}

pub fn run(db_path: &Path, subcommand: GuideSubcommand, json: bool) -> anyhow::Result<()> {
    let db = GuideDb::open(db_path)
        .with_context(|| format!("failed to open guide database {}", db_path.display()))?;
    match subcommand {
        GuideSubcommand::Show => show(&db, json),
        GuideSubcommand::MarkDirty => mark_dirty(&db, json),
    }
}

fn show(db: &GuideDb, json: bool) -> anyhow::Result<()> {
    let guide = db.load_guide()?;
    if json {
        return print_json(&guide);
    }
    match guide {
        None => println!("No guide persisted yet; the next pass bootstraps one."),
        Some(guide) => print_fields(&[
            (
                "id",
                guide.id.map(|id| id.to_string()).unwrap_or_default(),
            ),
            (
                "saved",
                guide
                    .saved
                    .map(|ts| ts.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string()),
            ),
            ("dirty", guide.dirty.to_string()),
        ]),
    }
    Ok(())
}

fn mark_dirty(db: &GuideDb, json: bool) -> anyhow::Result<()> {
    let updated = db.set_dirty(true)?;
    if json {
        return print_json(&serde_json::json!({ "updated": updated }));
    }
    if updated {
        println!("Guide marked dirty; the next pass recomputes.");
    } else {
        println!("No guide persisted yet; the next pass recomputes anyway.");
    }
    Ok(())
}
