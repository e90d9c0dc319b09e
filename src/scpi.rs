use std::fs;
use std::io::{BufRead, Write};

use tracing::{debug, info};

use crate::config::{Configuration, UsageError};
use crate::error::{Error, Result};
use crate::output;
use crate::tmc;
use crate::transport::{Connection, Transport};

const PROMPT: &str = "lxi> ";

/// A message containing `?` expects a reply.
pub fn is_query(command: &str) -> bool {
    command.contains('?')
}

/// Send one command and, for queries, render the decoded reply.
pub fn dispatch<W: Write>(
    conn: &mut dyn Connection,
    command: &str,
    config: &Configuration,
    out: &mut W,
) -> Result<()> {
    let mut msg = Vec::with_capacity(command.len() + 1);
    msg.extend_from_slice(command.as_bytes());
    msg.push(b'\n');

    debug!(command, "sending");
    conn.send(&msg, config.timeout())?;
    if !is_query(command) {
        return Ok(());
    }

    let raw = conn.receive(config.timeout())?;
    debug!(len = raw.len(), "reply");
    let payload = tmc::extract_payload(&raw)?;
    output::render(payload.as_bytes(), config, out)
}

/// Run the `scpi` command: inline command, then script, then interactive input.
pub fn run<T, R, W>(config: &Configuration, transport: &T, input: R, out: &mut W) -> Result<()>
where
    T: Transport + ?Sized,
    R: BufRead,
    W: Write,
{
    if config.target_address.is_empty() {
        return Err(UsageError::AddressRequired.into());
    }
    let mut conn = transport.connect(&config.target_address, config.timeout())?;
    info!(address = %config.target_address, "connected");

    if config.has_inline_command() {
        dispatch(conn.as_mut(), &config.scpi_command, config, out)?;
    }

    if let Some(path) = &config.script {
        let script = fs::read_to_string(path).map_err(|source| Error::Script {
            path: path.clone(),
            source,
        })?;
        for command in script_commands(&script) {
            dispatch(conn.as_mut(), command, config, out)?;
        }
    }

    if config.interactive {
        interact(conn.as_mut(), config, input, out)?;
    }
    Ok(())
}

/// Non-blank lines that are not `#` comments.
fn script_commands(script: &str) -> impl Iterator<Item = &str> {
    script
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
}

fn interact<R: BufRead, W: Write>(
    conn: &mut dyn Connection,
    config: &Configuration,
    mut input: R,
    out: &mut W,
) -> Result<()> {
    let mut line = String::new();
    loop {
        write!(out, "{PROMPT}")
            .and_then(|_| out.flush())
            .map_err(Error::stdout)?;

        line.clear();
        let n = input.read_line(&mut line).map_err(Error::Input)?;
        if n == 0 {
            // EOF
            writeln!(out).map_err(Error::stdout)?;
            return Ok(());
        }
        match line.trim() {
            "" => continue,
            "exit" | "quit" => return Ok(()),
            command => dispatch(conn, command, config, out)?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Command;
    use crate::transport::TransportError;
    use crate::transport::mock::MockTransport;
    use std::io::Cursor;

    fn config(cmd: &str) -> Configuration {
        Configuration {
            command: Command::SendCommand,
            timeout_secs: 1,
            target_address: "192.0.2.5".into(),
            scpi_command: cmd.into(),
            dump_hex: false,
            dump_file: None,
            interactive: false,
            script: None,
            debug: false,
        }
    }

    #[test]
    fn query_detection() {
        assert!(is_query("*IDN?"));
        assert!(is_query(":MEAS:VPP? CHAN1"));
        assert!(!is_query("*RST"));
    }

    #[test]
    fn inline_query_prints_text_reply() {
        let t = MockTransport::with_replies(&[
            b"RIGOL TECHNOLOGIES,DS1054Z,DS1ZA0000,00.04.04\n",
        ]);
        let mut out = Vec::new();
        run(&config("*IDN?"), &t, Cursor::new(""), &mut out).unwrap();

        assert_eq!(t.connected.borrow().as_slice(), ["192.0.2.5"]);
        assert_eq!(t.sent_text(), ["*IDN?\n"]);
        assert_eq!(out, b"RIGOL TECHNOLOGIES,DS1054Z,DS1ZA0000,00.04.04\n");
    }

    #[test]
    fn block_reply_is_stripped() {
        let t = MockTransport::with_replies(&[b"#15HELLO\n"]);
        let mut out = Vec::new();
        run(&config(":DISP:DATA?"), &t, Cursor::new(""), &mut out).unwrap();
        assert_eq!(out, b"HELLO\n");
    }

    #[test]
    fn malformed_block_is_not_a_transport_error() {
        let t = MockTransport::with_replies(&[b"#95HELLO\n"]);
        let err = run(&config(":DISP:DATA?"), &t, Cursor::new(""), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn silent_instrument_is_a_timeout() {
        let t = MockTransport::default();
        let err = run(&config("*IDN?"), &t, Cursor::new(""), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::Timeout(_))));
    }

    #[test]
    fn commands_do_not_wait_for_reply() {
        let t = MockTransport::default();
        let mut out = Vec::new();
        run(&config("*RST"), &t, Cursor::new(""), &mut out).unwrap();
        assert_eq!(t.sent_text(), ["*RST\n"]);
        assert!(out.is_empty());
    }

    #[test]
    fn session_without_address_fails_before_connecting() {
        let t = MockTransport::default();
        let mut cfg = config("");
        cfg.target_address.clear();
        cfg.interactive = true;
        let err = run(&cfg, &t, Cursor::new("*IDN?\n"), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Usage(UsageError::AddressRequired)));
        assert!(t.connected.borrow().is_empty());
    }

    #[test]
    fn inline_command_is_sent_verbatim() {
        let t = MockTransport::default();
        run(&config(" :CHAN1:SCAL 0.5 "), &t, Cursor::new(""), &mut Vec::new()).unwrap();
        assert_eq!(t.sent_text(), [" :CHAN1:SCAL 0.5 \n"]);
    }

    #[test]
    fn script_skips_blanks_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.scpi");
        fs::write(&path, "# reset first\n*RST\n\n  :CHAN1:SCAL 0.5  \n*OPC?\n").unwrap();

        let t = MockTransport::with_replies(&[b"1\n"]);
        let mut cfg = config("");
        cfg.script = Some(path);
        let mut out = Vec::new();
        run(&cfg, &t, Cursor::new(""), &mut out).unwrap();

        assert_eq!(t.sent_text(), ["*RST\n", ":CHAN1:SCAL 0.5\n", "*OPC?\n"]);
        assert_eq!(out, b"1\n");
    }

    #[test]
    fn missing_script_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config("");
        cfg.script = Some(dir.path().join("nope.scpi"));
        let err = run(&cfg, &MockTransport::default(), Cursor::new(""), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, Error::Script { .. }));
    }

    #[test]
    fn interactive_session_until_quit() {
        let t = MockTransport::with_replies(&[b"ID\n", b"2.5\n"]);
        let mut cfg = config("");
        cfg.interactive = true;
        let mut out = Vec::new();
        run(
            &cfg,
            &t,
            Cursor::new("*IDN?\n\n:TIM:SCAL?\nquit\n*RST\n"),
            &mut out,
        )
        .unwrap();

        assert_eq!(t.sent_text(), ["*IDN?\n", ":TIM:SCAL?\n"]);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "lxi> ID\nlxi> lxi> 2.5\nlxi> "
        );
    }

    #[test]
    fn inline_command_runs_before_interactive_input() {
        let t = MockTransport::with_replies(&[b"A\n", b"B\n"]);
        let mut cfg = config("*IDN?");
        cfg.interactive = true;
        let mut out = Vec::new();
        run(&cfg, &t, Cursor::new("*OPC?\n"), &mut out).unwrap();
        assert_eq!(t.sent_text(), ["*IDN?\n", "*OPC?\n"]);
        assert_eq!(String::from_utf8(out).unwrap(), "A\nlxi> B\nlxi> \n");
    }
}
