pub mod sexp;
pub mod pcb;
pub mod pcb_schema;
pub mod pcb_writer;

// Re-export for convenience
pub use sexp::{SExp, SExpParser, ParseError};
pub use pcb::{PcbParser, PcbParseError};
pub use pcb_schema::*;
pub use pcb_writer::PcbWriter;
