use pillarstreak_core::Event;

use super::{print_json, CliResult, Session};

pub fn rotate(at: Option<&str>) -> CliResult {
    let mut session = Session::open(at)?;
    let (next, event) = session.engine.check_rotation(&session.state);
    session.save(&next)?;
    print_json(&event)
}

pub fn select(at: Option<&str>, pillar: &str) -> CliResult {
    let mut session = Session::open(at)?;
    let (next, event) = session.engine.select_pillar(&session.state, pillar);
    session.save(&next)?;
    print_json(&event)
}

pub fn progress(at: Option<&str>, value: f64) -> CliResult {
    let session = Session::open(at)?;
    let (next, event) = session.engine.record_progress(&session.state, value)?;
    session.save(&next)?;
    print_json(&event)
}

pub fn complete(at: Option<&str>, pillar: &str) -> CliResult {
    let session = Session::open(at)?;
    let (next, event) = session.engine.complete_pillar(&session.state, pillar);
    print_json(&event)?;
    if let Event::CompletionRejected { reason, .. } = event {
        return Err(format!("completion rejected: {reason:?}").into());
    }
    session.save(&next)
}

pub fn status(at: Option<&str>) -> CliResult {
    let session = Session::open(at)?;
    print_json(&session.engine.status(&session.state))
}
