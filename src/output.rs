use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::config::Configuration;
use crate::error::{Error, Result};

/// Write `payload` to `path`, truncating any existing file.
pub fn write_file(path: &Path, payload: &[u8]) -> Result<()> {
    fs::write(path, payload).map_err(|source| Error::Output {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), len = payload.len(), "wrote payload");
    Ok(())
}

/// Classic 16-bytes-per-row dump: offset, hex bytes, ASCII gutter.
pub fn hex_dump(payload: &[u8]) -> String {
    let mut s = String::with_capacity(payload.len() * 4 + 16);
    for (row, chunk) in payload.chunks(16).enumerate() {
        let _ = write!(s, "{:08x}  ", row * 16);
        for i in 0..16 {
            match chunk.get(i) {
                Some(b) => {
                    let _ = write!(s, "{:02x} ", b);
                }
                None => s.push_str("   "),
            }
            if i == 7 {
                s.push(' ');
            }
        }
        s.push_str(" |");
        s.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        s.push_str("|\n");
    }
    s
}

/// Render one decoded reply according to the dump flags.
pub fn render<W: Write>(payload: &[u8], config: &Configuration, out: &mut W) -> Result<()> {
    if let Some(path) = &config.dump_file {
        write_file(path, payload)?;
        writeln!(out, "Saved response to {}", path.display()).map_err(Error::stdout)?;
    }
    if config.dump_hex {
        out.write_all(hex_dump(payload).as_bytes())
            .map_err(Error::stdout)?;
    } else if config.dump_file.is_none() {
        out.write_all(payload).map_err(Error::stdout)?;
        if !payload.ends_with(b"\n") {
            out.write_all(b"\n").map_err(Error::stdout)?;
        }
    }
    out.flush().map_err(Error::stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Command;
    use std::path::PathBuf;

    fn config() -> Configuration {
        Configuration {
            command: Command::SendCommand,
            timeout_secs: 1,
            target_address: "10.0.0.1".into(),
            scpi_command: "*IDN?".into(),
            dump_hex: false,
            dump_file: None,
            interactive: false,
            script: None,
            debug: false,
        }
    }

    #[test]
    fn text_gets_trailing_newline() {
        let mut out = Vec::new();
        render(b"RIGOL,DS1054Z", &config(), &mut out).unwrap();
        assert_eq!(out, b"RIGOL,DS1054Z\n");
    }

    #[test]
    fn hex_rows() {
        let dump = hex_dump(b"HELLO, world!\x00\x01\x02\xff");
        assert_eq!(
            dump,
            "00000000  48 45 4c 4c 4f 2c 20 77  6f 72 6c 64 21 00 01 02  |HELLO, world!...|\n\
             00000010  ff                                                |.|\n"
        );
        assert_eq!(hex_dump(b""), "");
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screen.bmp");
        fs::write(&path, b"stale contents that are longer").unwrap();

        let payload: Vec<u8> = (0..=255u8).rev().collect();
        let mut cfg = config();
        cfg.dump_file = Some(path.clone());
        let mut out = Vec::new();
        render(&payload, &cfg, &mut out).unwrap();

        assert_eq!(fs::read(&path).unwrap(), payload);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("Saved response to {}\n", path.display())
        );
    }

    #[test]
    fn file_and_hex_together() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.bin");
        let mut cfg = config();
        cfg.dump_file = Some(path.clone());
        cfg.dump_hex = true;
        let mut out = Vec::new();
        render(b"AB", &cfg, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Saved response to"));
        assert!(out.contains("41 42"));
        assert_eq!(fs::read(&path).unwrap(), b"AB");
    }

    #[test]
    fn unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("missing").join("r.bin");
        let err = write_file(&path, b"x").unwrap_err();
        assert!(matches!(err, Error::Output { .. }));
    }
}
