pub mod config;
pub mod dial;
pub mod history;
pub mod simulate;
pub mod timer;

use dialtimer_core::{Clock, Config, Database, Event, Session, SystemClock, TimerStore};

pub(crate) type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Config, store and a session restored from whatever was saved last.
pub(crate) struct Workspace {
    pub store: TimerStore<Database>,
    pub session: Session<SystemClock>,
}

impl Workspace {
    pub fn open() -> CliResult<Self> {
        let config = Config::load()?;
        let store = TimerStore::new(Database::open()?);
        let session = Session::restore(&config, SystemClock, store.load_timer());
        Ok(Self { store, session })
    }

    /// Write out every pending event and return them for printing.
    pub fn persist(&mut self) -> CliResult<Vec<Event>> {
        persist(&mut self.session, &self.store)
    }
}

pub(crate) fn persist<C: Clock>(
    session: &mut Session<C>,
    store: &TimerStore<Database>,
) -> CliResult<Vec<Event>> {
    let events = session.drain_events();
    for event in &events {
        store.record(event, session.timer())?;
    }
    Ok(events)
}

pub(crate) fn print_events(events: &[Event]) -> CliResult {
    for event in events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}
