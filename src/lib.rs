pub mod radio;

pub use radio::{
    catalog, config, error, handlers, logging, registry, relay, rotation, socket, station,
    types, validation,
};
