pub mod config;
pub mod history;
pub mod pillar;
pub mod stats;

use pillarstreak_core::calendar::{parse_timestamp, FixedClock, SystemClock};
use pillarstreak_core::{Clock, Config, Database, PillarEngine, PillarState};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Config, database and engine for one command invocation.
pub struct Session {
    pub db: Database,
    pub engine: PillarEngine,
    pub state: PillarState,
}

impl Session {
    pub fn open(at: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let clock: Box<dyn Clock> = match at {
            Some(raw) => {
                let ts = parse_timestamp(raw)
                    .ok_or_else(|| format!("invalid --at timestamp: {raw}"))?;
                Box::new(FixedClock(ts))
            }
            None => Box::new(SystemClock),
        };
        let config = Config::load()?;
        let db = Database::open()?;
        let state = db.load_state()?;
        Ok(Self {
            db,
            engine: PillarEngine::with_clock(config, clock),
            state,
        })
    }

    /// Persist `state` under the configured retention window.
    pub fn save(&self, state: &PillarState) -> CliResult {
        self.db.save_state(
            state,
            self.engine.config().history.retention_days,
            self.engine.now(),
            self.engine.calendar(),
        )?;
        Ok(())
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
