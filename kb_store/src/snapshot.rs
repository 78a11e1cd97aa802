//! Whole-store snapshots.
//!
//! Layout: 8-byte magic, little-endian `u32` format version, then a bincode
//! payload of the serde representation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{info, instrument};

use crate::{KbError, KnowledgeBase, Result};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Magic header of a [`KnowledgeBase`] snapshot.
pub const KB_MAGIC: [u8; 8] = *b"KBSNAP\0\0";

/// Write `value` behind a magic header and version.
pub fn write_snapshot<T: Serialize, W: Write>(mut writer: W, magic: &[u8; 8], value: &T) -> Result<()> {
    writer.write_all(magic)?;
    writer.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;
    bincode::serialize_into(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Read a value written by [`write_snapshot`] with the same magic.
pub fn read_snapshot<T: DeserializeOwned, R: Read>(mut reader: R, magic: &[u8; 8]) -> Result<T> {
    let mut header = [0u8; 8];
    reader.read_exact(&mut header)?;
    if &header != magic {
        return Err(KbError::InvalidSnapshot("bad magic header".to_string()));
    }
    let mut version = [0u8; 4];
    reader.read_exact(&mut version)?;
    let version = u32::from_le_bytes(version);
    if version != SNAPSHOT_VERSION {
        return Err(KbError::UnsupportedSnapshotVersion {
            found: version,
            expected: SNAPSHOT_VERSION,
        });
    }
    // payloads whose parts disagree with each other fail in `TryFrom` as custom errors
    bincode::deserialize_from(reader).map_err(|err| match *err {
        bincode::ErrorKind::Custom(reason) => KbError::InvalidSnapshot(reason),
        other => KbError::Encoding(Box::new(other)),
    })
}

impl KnowledgeBase {
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        write_snapshot(writer, &KB_MAGIC, self)
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        read_snapshot(reader, &KB_MAGIC)
    }

    /// Save the whole store to `path`, replacing any existing file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_to(BufWriter::new(file))?;
        info!(vocab_size = self.vocab().len(), "saved knowledge base");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let kb = Self::read_from(BufReader::new(file))?;
        info!(
            vocab_size = kb.vocab().len(),
            datasets = kb.datasets().count(),
            "loaded knowledge base"
        );
        Ok(kb)
    }
}
