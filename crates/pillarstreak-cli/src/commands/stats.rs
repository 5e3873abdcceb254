use clap::Subcommand;
use pillarstreak_core::Pillar;

use super::{print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Show stored pillar stats
    Show,
    /// Set one pillar's stat (nominally 0-100)
    Set {
        pillar: Pillar,
        value: f64,
    },
}

pub fn run(at: Option<&str>, action: StatsAction) -> CliResult {
    let session = Session::open(at)?;

    match action {
        StatsAction::Show => print_json(&session.state.stats),
        StatsAction::Set { pillar, value } => {
            let next = session.engine.set_stat(&session.state, pillar, value);
            session.save(&next)?;
            print_json(&next.stats)
        }
    }
}
