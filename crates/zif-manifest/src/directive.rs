//! Manifest directive vocabulary and line parser: `repo`, `package`,
//! `install`/`remove`/`update`/`downgrade`, `run`, `expect-state`, plus a
//! `config` line and indented `requires`/`provides`/`conflicts`/
//! `obsoletes` resource lines attached to the preceding `package`.

use crate::error::{Error, Result};

/// One parsed line of a manifest file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `disable` as the manifest's very first directive: skip the whole file.
    Disable,
    /// `config key=value`.
    Config { key: String, value: String },
    /// `repo <id>`: declare a remote store.
    Repo { id: String },
    /// `package <store> <name> <epoch> <version> <release> <arch>`, where
    /// `<store>` is `installed` or a previously declared repo id.
    Package {
        store: String,
        name: String,
        epoch: u32,
        version: String,
        release: String,
        arch: String,
    },
    /// An indented resource line attached to the most recent `Package`.
    Resource { kind: ResourceKind, description: String },
    /// `install <name>`.
    Install { name: String },
    /// `remove <name>`.
    Remove { name: String },
    /// `update <name>`.
    Update { name: String },
    /// `downgrade <name>`.
    Downgrade { name: String },
    /// `run`: resolve, prepare, and commit everything queued so far.
    Run,
    /// `expect-state <name> <version> <release> <arch>`: after `run`, the
    /// local store must contain exactly this package.
    ExpectState {
        name: String,
        version: String,
        release: String,
        arch: String,
    },
    /// `expect-absent <name>`: after `run`, the local store must not
    /// contain a package with this name.
    ExpectAbsent { name: String },
}

/// The four relation kinds a `package` directive's indented lines can add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Requires,
    Provides,
    Conflicts,
    Obsoletes,
}

/// Parse a whole manifest file into directives, in line order.
pub fn parse(text: &str) -> Result<Vec<Directive>> {
    let mut directives = Vec::new();
    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if raw_line.trim().is_empty() || raw_line.trim_start().starts_with('#') {
            continue;
        }
        if raw_line.starts_with(char::is_whitespace) {
            directives.push(parse_resource_line(line_no, raw_line.trim())?);
            continue;
        }
        directives.push(parse_top_level_line(line_no, raw_line.trim())?);
    }
    Ok(directives)
}

fn parse_resource_line(line_no: usize, body: &str) -> Result<Directive> {
    let (keyword, rest) = split_first_word(body).ok_or_else(|| parse_err(line_no, "empty resource line"))?;
    let kind = match keyword {
        "requires" => ResourceKind::Requires,
        "provides" => ResourceKind::Provides,
        "conflicts" => ResourceKind::Conflicts,
        "obsoletes" => ResourceKind::Obsoletes,
        other => return Err(parse_err(line_no, format!("unknown resource kind '{other}'"))),
    };
    if rest.is_empty() {
        return Err(parse_err(line_no, format!("'{keyword}' needs a depend description")));
    }
    Ok(Directive::Resource { kind, description: rest.to_string() })
}

fn parse_top_level_line(line_no: usize, body: &str) -> Result<Directive> {
    let (keyword, rest) = split_first_word(body).ok_or_else(|| parse_err(line_no, "empty line"))?;
    match keyword {
        "disable" => Ok(Directive::Disable),
        "config" => {
            let (key, value) = rest.split_once('=').ok_or_else(|| parse_err(line_no, "config needs key=value"))?;
            Ok(Directive::Config { key: key.trim().to_string(), value: value.trim().to_string() })
        }
        "repo" => Ok(Directive::Repo { id: require_single_word(line_no, rest)? }),
        "package" => parse_package_line(line_no, rest),
        "install" => Ok(Directive::Install { name: require_single_word(line_no, rest)? }),
        "remove" => Ok(Directive::Remove { name: require_single_word(line_no, rest)? }),
        "update" => Ok(Directive::Update { name: require_single_word(line_no, rest)? }),
        "downgrade" => Ok(Directive::Downgrade { name: require_single_word(line_no, rest)? }),
        "run" => Ok(Directive::Run),
        "expect-state" => parse_expect_state_line(line_no, rest),
        "expect-absent" => Ok(Directive::ExpectAbsent { name: require_single_word(line_no, rest)? }),
        other => Err(parse_err(line_no, format!("unknown directive '{other}'"))),
    }
}

fn parse_package_line(line_no: usize, rest: &str) -> Result<Directive> {
    let words: Vec<&str> = rest.split_whitespace().collect();
    let [store, name, epoch, version, release, arch] = words[..] else {
        return Err(parse_err(line_no, "package needs: <store> <name> <epoch> <version> <release> <arch>"));
    };
    let epoch: u32 = epoch.parse().map_err(|_| parse_err(line_no, format!("bad epoch '{epoch}'")))?;
    Ok(Directive::Package {
        store: store.to_string(),
        name: name.to_string(),
        epoch,
        version: version.to_string(),
        release: release.to_string(),
        arch: arch.to_string(),
    })
}

fn parse_expect_state_line(line_no: usize, rest: &str) -> Result<Directive> {
    let words: Vec<&str> = rest.split_whitespace().collect();
    let [name, version, release, arch] = words[..] else {
        return Err(parse_err(line_no, "expect-state needs: <name> <version> <release> <arch>"));
    };
    Ok(Directive::ExpectState {
        name: name.to_string(),
        version: version.to_string(),
        release: release.to_string(),
        arch: arch.to_string(),
    })
}

fn require_single_word(line_no: usize, rest: &str) -> Result<String> {
    let mut words = rest.split_whitespace();
    let word = words.next().ok_or_else(|| parse_err(line_no, "missing argument"))?;
    if words.next().is_some() {
        return Err(parse_err(line_no, "too many arguments"));
    }
    Ok(word.to_string())
}

fn split_first_word(s: &str) -> Option<(&str, &str)> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(idx) => Some((&s[..idx], s[idx..].trim())),
        None => Some((s, "")),
    }
}

fn parse_err(line: usize, message: impl Into<String>) -> Error {
    Error::Parse { line, message: message.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_small_manifest() {
        let text = "\
repo updates
package installed hal 0 0.0.1 1 x86_64
package updates hal 0 0.0.2 1 x86_64
  requires glibc >= 2.5
update hal
run
expect-state hal 0.0.2 1 x86_64
";
        let directives = parse(text).unwrap();
        assert_eq!(directives.len(), 7);
        assert_eq!(directives[0], Directive::Repo { id: "updates".to_string() });
        assert!(matches!(directives[3], Directive::Resource { kind: ResourceKind::Requires, .. }));
        assert_eq!(directives[5], Directive::Run);
    }

    #[test]
    fn rejects_unknown_directive() {
        assert!(parse("frobnicate hal").is_err());
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "# a comment\n\nrun\n";
        assert_eq!(parse(text).unwrap(), vec![Directive::Run]);
    }
}
