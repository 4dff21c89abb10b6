// framestack-core/src/persist.rs

//! Saving and restoring transform configuration.
//!
//! Configurations are serde structs written with bincode's default options:
//! fields in declaration order, each integer as a little-endian `u64`.

use crate::error::FrameStackError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

pub(crate) fn save_config<W, C>(writer: &mut W, config: &C) -> Result<(), FrameStackError>
where
    W: Write + ?Sized,
    C: Serialize,
{
    bincode::serialize_into(writer, config).map_err(config_error)
}

pub(crate) fn load_config<R, C>(reader: &mut R) -> Result<C, FrameStackError>
where
    R: Read + ?Sized,
    C: DeserializeOwned,
{
    bincode::deserialize_from(reader).map_err(config_error)
}

fn config_error(err: bincode::Error) -> FrameStackError {
    FrameStackError::Io(format!("transform configuration: {}", err))
}
