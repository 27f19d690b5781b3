//! Renderer state snapshots: a short header followed by a zstd-compressed bincode stream

use anyhow::{Context, anyhow};
use retrogfx_core::RenderState;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const FILE_PREFIX: &[u8] = b"rgfxstate";

// Bump whenever the encoded layout of RenderState changes
const SNAPSHOT_VERSION: u16 = 1;

macro_rules! bincode_config {
    () => {
        bincode::config::standard()
            .with_little_endian()
            .with_fixed_int_encoding()
            .with_limit::<{ 100 * 1024 * 1024 }>()
    };
}

pub fn save(state: &RenderState, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create snapshot file '{}'", path.display()))?;

    let mut writer = BufWriter::new(file);
    writer.write_all(FILE_PREFIX)?;
    writer.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;

    let mut encoder = zstd::stream::Encoder::new(writer, 0)?;
    bincode::encode_into_std_write(state, &mut encoder, bincode_config!())
        .context("Failed to encode renderer state")?;
    encoder.finish()?.flush()?;

    log::info!("Saved renderer snapshot to '{}'", path.display());

    Ok(())
}

pub fn load(path: &Path) -> anyhow::Result<RenderState> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open snapshot file '{}'", path.display()))?;

    let mut reader = BufReader::new(file);
    let mut header = [0_u8; FILE_PREFIX.len() + 2];
    reader.read_exact(&mut header).context("Snapshot file is truncated")?;

    if &header[..FILE_PREFIX.len()] != FILE_PREFIX {
        return Err(anyhow!("'{}' is not a renderer snapshot", path.display()));
    }

    let version = u16::from_le_bytes([header[FILE_PREFIX.len()], header[FILE_PREFIX.len() + 1]]);
    if version != SNAPSHOT_VERSION {
        return Err(anyhow!(
            "Snapshot version mismatch; expected {SNAPSHOT_VERSION}, was {version}"
        ));
    }

    let mut decoder = zstd::stream::Decoder::new(reader)?;
    let state: RenderState = bincode::decode_from_std_read(&mut decoder, bincode_config!())
        .context("Failed to decode renderer state")?;
    state.validate().context("Snapshot holds an inconsistent renderer state")?;

    log::info!("Loaded renderer snapshot from '{}'", path.display());

    Ok(state)
}
