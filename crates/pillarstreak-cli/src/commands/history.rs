use super::{print_json, CliResult, Session};

pub fn history(at: Option<&str>, days: u32) -> CliResult {
    let session = Session::open(at)?;
    print_json(&session.engine.calendar_view(&session.state, days))
}

pub fn summary(at: Option<&str>) -> CliResult {
    let session = Session::open(at)?;
    print_json(&session.engine.summary(&session.state))
}
