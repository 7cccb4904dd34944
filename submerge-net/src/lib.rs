mod chunked;
mod config;
mod conn;
mod dispatch;
mod item;
mod tuple;

pub use chunked::{read_chunked_item, write_chunked};
pub use config::CodecConfig;
pub use conn::{Cancellation, Connection, NeverCancel};
pub use dispatch::{handle_commands, read_cmd_response, write_cmd, write_cmd_failure, write_cmd_response, CmdEntry};
pub use item::Item;
pub use tuple::{OptionalTupleWriter, TupleReader, TupleWriter};
