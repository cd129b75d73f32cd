//! The client side of `git-receive-pack`: a list of ref update commands followed by
//! a pack of the objects those updates need, then the server's per-ref report.
use std::io::{BufRead, Write};

use git_hash::ObjectId;

use crate::capabilities::Capabilities;
use crate::pktline;
use crate::Error;

/// A single `<old> <new> <ref>` line. `old` is the zero id for a new ref, `new` is
/// the zero id for a deletion.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Command {
    pub name: String,
    pub old: Option<ObjectId>,
    pub new: Option<ObjectId>,
}

impl Command {
    fn to_line(&self) -> String {
        format!(
            "{} {} {}",
            self.old.map(|id| id.to_hex()).unwrap_or_else(zero_id),
            self.new.map(|id| id.to_hex()).unwrap_or_else(zero_id),
            self.name
        )
    }
}

fn zero_id() -> String {
    "0".repeat(40)
}

/// Send the command list (capabilities riding on the first line) followed by the
/// flush that terminates it. The caller is responsible for writing the pack payload
/// right after, if `commands` contains anything but deletions.
pub fn send_commands<W: Write>(mut writer: W, commands: &[Command], capabilities: &Capabilities) -> Result<(), Error> {
    let mut commands = commands.iter();
    if let Some(first) = commands.next() {
        let mut line = first.to_line();
        let wanted = capabilities.negotiate();
        if !wanted.is_empty() {
            line.push('\0');
            line.push_str(&wanted.join(" "));
        }
        pktline::write_text(&mut writer, &line)?;
    }
    for command in commands {
        pktline::write_text(&mut writer, &command.to_line())?;
    }
    pktline::write_flush(&mut writer)?;
    Ok(())
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Report {
    pub unpack_ok: bool,
    pub unpack_error: Option<String>,
    pub rejected: Vec<(String, String)>,
    pub accepted: Vec<String>,
}

/// Parse the `report-status`/`report-status-v2` reply: an `unpack` line followed by
/// one `ok <ref>`/`ng <ref> <reason>` line per command, terminated by a flush.
pub fn parse_report<R: BufRead>(reader: R) -> Result<Report, Error> {
    let lines = pktline::read_lines_until_flush(reader)?;
    let mut lines = lines.into_iter();

    let unpack_line = lines.next().ok_or_else(|| Error::InvalidRefLine("push report is missing an unpack line".into()))?;
    let unpack_line = pktline::trim_newline(unpack_line);
    let unpack_text = String::from_utf8_lossy(&unpack_line);
    let (unpack_ok, unpack_error) = match unpack_text.strip_prefix("unpack ") {
        Some("ok") => (true, None),
        Some(reason) => (false, Some(reason.to_owned())),
        None => return Err(Error::InvalidRefLine(format!("expected an unpack line, found {:?}", unpack_text))),
    };

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for line in lines {
        let line = pktline::trim_newline(line);
        let text = String::from_utf8_lossy(&line);
        if let Some(name) = text.strip_prefix("ok ") {
            accepted.push(name.to_owned());
        } else if let Some(rest) = text.strip_prefix("ng ") {
            let (name, reason) = rest.split_once(' ').unwrap_or((rest, "unknown reason"));
            rejected.push((name.to_owned(), reason.to_owned()));
        } else {
            return Err(Error::InvalidRefLine(format!("expected an ok/ng line, found {:?}", text)));
        }
    }

    Ok(Report { unpack_ok, unpack_error, rejected, accepted })
}

/// Turn a push report into a result, surfacing the first rejection (or the unpack
/// failure, which dooms every command) as an error.
pub fn check_report(report: &Report) -> Result<(), Error> {
    if !report.unpack_ok {
        return Err(Error::Remote(report.unpack_error.clone().unwrap_or_else(|| "unpack failed".into())));
    }
    if let Some((name, reason)) = report.rejected.first() {
        return Err(Error::RefUpdateRejected { name: name.clone(), reason: reason.clone() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn oid(byte: u8) -> ObjectId {
        ObjectId::from_hex(hex::encode([byte; 20]).as_bytes()).unwrap()
    }

    #[test]
    fn send_commands_puts_capabilities_on_the_first_line_only() {
        let caps = Capabilities::parse("report-status side-band-64k");
        let commands = vec![
            Command { name: "refs/heads/main".into(), old: Some(oid(1)), new: Some(oid(2)) },
            Command { name: "refs/heads/dev".into(), old: None, new: Some(oid(3)) },
        ];
        let mut out = Vec::new();
        send_commands(&mut out, &commands, &caps).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("side-band-64k"));
        assert_eq!(text.matches("side-band-64k").count(), 1);
        assert!(text.contains(&zero_id()));
    }

    #[test]
    fn parse_report_reads_unpack_and_per_ref_status() {
        let mut wire = Vec::new();
        pktline::write_text(&mut wire, "unpack ok").unwrap();
        pktline::write_text(&mut wire, "ok refs/heads/main").unwrap();
        pktline::write_text(&mut wire, "ng refs/heads/dev non-fast-forward").unwrap();
        pktline::write_flush(&mut wire).unwrap();

        let report = parse_report(Cursor::new(wire)).unwrap();
        assert!(report.unpack_ok);
        assert_eq!(report.accepted, vec!["refs/heads/main".to_string()]);
        assert_eq!(report.rejected, vec![("refs/heads/dev".to_string(), "non-fast-forward".to_string())]);
    }

    #[test]
    fn check_report_surfaces_the_first_rejection() {
        let report = Report {
            unpack_ok: true,
            unpack_error: None,
            rejected: vec![("refs/heads/dev".into(), "non-fast-forward".into())],
            accepted: vec![],
        };
        assert!(matches!(check_report(&report), Err(Error::RefUpdateRejected { .. })));
    }

    #[test]
    fn check_report_surfaces_a_failed_unpack_before_any_ref_rejection() {
        let report = Report { unpack_ok: false, unpack_error: Some("index-pack failed".into()), rejected: vec![], accepted: vec![] };
        assert!(matches!(check_report(&report), Err(Error::Remote(_))));
    }
}
