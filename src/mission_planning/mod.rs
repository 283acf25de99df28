// Mission planning: stop ordering and route annotation

pub mod route_sequencer;
pub mod path_enricher;

pub use route_sequencer::*;
pub use path_enricher::*;
