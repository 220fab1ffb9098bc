//! Built-in command implementations.
//!
//! Each handler is a total function from `(args, filesystem, stdin)` to a
//! `(stdout, stderr)` pair: failures become human-readable stderr text,
//! never a panic or a propagated error. Mutating handlers operate directly
//! on the working copy they are given; copy-on-write is the pipeline
//! executor's job, not theirs.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;

use crate::error::VfsError;
use crate::fs::{ListOptions, Vfs, HOME};
use crate::glob;

// ────────────────────────── Result type ──────────────────────────

/// What one command invocation produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        CommandOutput {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn ok_empty() -> Self {
        CommandOutput::default()
    }

    pub fn err(stderr: impl Into<String>) -> Self {
        CommandOutput {
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Signature every built-in shares.
pub type Handler = fn(&[String], &mut Vfs, &str) -> CommandOutput;

// ────────────────────────── Registry ──────────────────────────

/// All built-in commands, sorted by name.
const BUILTINS: &[(&str, Handler)] = &[
    ("cal", cmd_cal as Handler),
    ("cat", cmd_cat),
    ("cd", cmd_cd),
    ("chmod", cmd_chmod),
    ("cp", cmd_cp),
    ("date", cmd_date),
    ("diff", cmd_diff),
    ("echo", cmd_echo),
    ("grep", cmd_grep),
    ("head", cmd_head),
    ("help", cmd_help),
    ("ls", cmd_ls),
    ("mkdir", cmd_mkdir),
    ("mv", cmd_mv),
    ("pwd", cmd_pwd),
    ("rm", cmd_rm),
    ("rmdir", cmd_rmdir),
    ("sort", cmd_sort),
    ("sudo", cmd_sudo),
    ("tail", cmd_tail),
    ("touch", cmd_touch),
    ("uniq", cmd_uniq),
    ("wc", cmd_wc),
    ("who", cmd_who),
];

/// An explicit name-to-handler table, constructed once and passed by
/// reference into the pipeline executor. Tests can register substitute
/// commands without touching any global state.
pub struct CommandRegistry {
    table: BTreeMap<&'static str, Handler>,
}

impl CommandRegistry {
    /// The full built-in command set.
    pub fn builtin() -> Self {
        let mut table = BTreeMap::new();
        for (name, handler) in BUILTINS {
            table.insert(*name, *handler);
        }
        CommandRegistry { table }
    }

    /// An empty table, for tests that want full control.
    pub fn empty() -> Self {
        CommandRegistry {
            table: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Handler> {
        self.table.get(name).copied()
    }

    pub fn register(&mut self, name: &'static str, handler: Handler) {
        self.table.insert(name, handler);
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.table.keys().copied().collect()
    }
}

// ────────────────────────── Helpers ──────────────────────────

/// Content for a filter command: a named file when given, stdin otherwise.
fn read_input(cmd: &str, path: Option<&String>, vfs: &Vfs, stdin: &str) -> Result<String, String> {
    match path {
        Some(p) => vfs
            .read_file(p)
            .map_err(|e| format!("{}: {}: {}", cmd, p, e)),
        None => Ok(String::from(stdin)),
    }
}

/// Join a line stream back into newline-terminated text. Line-producing
/// filters use this so their output pipes cleanly into line counters;
/// empty output stays empty.
fn join_lines(lines: &[&str]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

/// Parse `-N` / `-n N` style line-count flags for head and tail.
fn parse_count_args(args: &[String]) -> (usize, Vec<String>) {
    let mut n = 10usize;
    let mut paths = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "-n" && i + 1 < args.len() {
            n = args[i + 1].parse().unwrap_or(10);
            i += 2;
        } else if let Some(num) = args[i]
            .strip_prefix('-')
            .and_then(|s| s.parse::<usize>().ok())
        {
            n = num;
            i += 1;
        } else {
            paths.push(args[i].clone());
            i += 1;
        }
    }
    (n, paths)
}

// ════════════════════════════════════════════════════════════
//  Filesystem commands
// ════════════════════════════════════════════════════════════

fn cmd_pwd(_args: &[String], vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    CommandOutput::ok(vfs.cwd.clone())
}

fn cmd_cd(args: &[String], vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    let target = args.first().map(String::as_str).unwrap_or(HOME);
    match vfs.change_dir(target) {
        Ok(()) => CommandOutput::ok_empty(),
        Err(e) => CommandOutput::err(format!("cd: {}: {}", target, e)),
    }
}

fn cmd_ls(args: &[String], vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    let mut include_hidden = false;
    let mut long = false;
    let mut target: Option<String> = None;

    for arg in args {
        if let Some(flags) = arg.strip_prefix('-') {
            for c in flags.chars() {
                match c {
                    'a' => include_hidden = true,
                    'l' => long = true,
                    _ => {}
                }
            }
        } else {
            target = Some(arg.clone());
        }
    }
    let target = target.unwrap_or_else(|| String::from("."));

    // A glob in the final segment filters within its parent directory.
    let (dir, pattern) = if glob::has_wildcards(&target) {
        match target.rsplit_once('/') {
            Some((dir, pat)) => {
                let dir = if dir.is_empty() { "/" } else { dir };
                (String::from(dir), Some(String::from(pat)))
            }
            None => (String::from("."), Some(target.clone())),
        }
    } else {
        (target.clone(), None)
    };

    let opts = ListOptions {
        include_hidden,
        pattern,
    };
    match vfs.list(&dir, &opts) {
        Ok(entries) => {
            if long {
                let lines: Vec<String> = entries.iter().map(|e| e.render_long()).collect();
                CommandOutput::ok(lines.join("\n"))
            } else {
                let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
                CommandOutput::ok(names.join("  "))
            }
        }
        Err(e) => CommandOutput::err(format!("ls: cannot access '{}': {}", target, e)),
    }
}

fn cmd_mkdir(args: &[String], vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    let path = match args.first() {
        Some(p) => p,
        None => return CommandOutput::err("mkdir: missing operand"),
    };
    match vfs.make_dir(path) {
        Ok(()) => CommandOutput::ok_empty(),
        Err(e) => CommandOutput::err(format!("mkdir: cannot create directory '{}': {}", path, e)),
    }
}

fn cmd_rmdir(args: &[String], vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    let path = match args.first() {
        Some(p) => p,
        None => return CommandOutput::err("rmdir: missing operand"),
    };
    match vfs.remove_dir(path) {
        Ok(()) => CommandOutput::ok_empty(),
        Err(e) => CommandOutput::err(format!("rmdir: failed to remove '{}': {}", path, e)),
    }
}

fn cmd_touch(args: &[String], vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    let path = match args.first() {
        Some(p) => p,
        None => return CommandOutput::err("touch: missing file operand"),
    };
    match vfs.touch(path) {
        Ok(()) => CommandOutput::ok_empty(),
        Err(e) => CommandOutput::err(format!("touch: cannot touch '{}': {}", path, e)),
    }
}

fn cmd_rm(args: &[String], vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    let path = match args.first() {
        Some(p) => p,
        None => return CommandOutput::err("rm: missing operand"),
    };
    match vfs.remove(path) {
        Ok(()) => CommandOutput::ok_empty(),
        Err(e) => CommandOutput::err(format!("rm: cannot remove '{}': {}", path, e)),
    }
}

fn cmd_cp(args: &[String], vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    let (src, dst) = match (args.first(), args.get(1)) {
        (Some(s), Some(d)) => (s, d),
        (Some(s), None) => {
            return CommandOutput::err(format!(
                "cp: missing destination file operand after '{}'",
                s
            ))
        }
        _ => return CommandOutput::err("cp: missing file operand"),
    };
    match vfs.copy(src, dst) {
        Ok(()) => CommandOutput::ok_empty(),
        Err(VfsError::NotAFile) => {
            CommandOutput::err(format!("cp: omitting directory '{}'", src))
        }
        Err(e) => CommandOutput::err(format!("cp: cannot copy '{}' to '{}': {}", src, dst, e)),
    }
}

fn cmd_mv(args: &[String], vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    let (src, dst) = match (args.first(), args.get(1)) {
        (Some(s), Some(d)) => (s, d),
        (Some(s), None) => {
            return CommandOutput::err(format!(
                "mv: missing destination file operand after '{}'",
                s
            ))
        }
        _ => return CommandOutput::err("mv: missing file operand"),
    };
    match vfs.rename(src, dst) {
        Ok(()) => CommandOutput::ok_empty(),
        Err(VfsError::NotAFile) => {
            CommandOutput::err(format!("mv: cannot move directory '{}'", src))
        }
        Err(e) => CommandOutput::err(format!("mv: cannot move '{}' to '{}': {}", src, dst, e)),
    }
}

fn cmd_chmod(args: &[String], vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    let (mode, path) = match (args.first(), args.get(1)) {
        (Some(m), Some(p)) => (m, p),
        _ => return CommandOutput::err("chmod: missing operand"),
    };
    match vfs.set_permissions(path, mode) {
        Ok(()) => CommandOutput::ok_empty(),
        Err(e @ VfsError::InvalidMode(_)) => CommandOutput::err(format!("chmod: {}", e)),
        Err(e) => CommandOutput::err(format!("chmod: cannot access '{}': {}", path, e)),
    }
}

fn cmd_cat(args: &[String], vfs: &mut Vfs, stdin: &str) -> CommandOutput {
    if args.is_empty() {
        return CommandOutput::ok(stdin);
    }
    let mut out = String::new();
    for path in args {
        match vfs.read_file(path) {
            Ok(content) => out.push_str(&content),
            Err(e) => {
                return CommandOutput {
                    stdout: out,
                    stderr: format!("cat: {}: {}", path, e),
                }
            }
        }
    }
    CommandOutput::ok(out)
}

// ════════════════════════════════════════════════════════════
//  Text filters
// ════════════════════════════════════════════════════════════

fn cmd_echo(args: &[String], _vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    let mut out = args.join(" ");
    out.push('\n');
    CommandOutput::ok(out)
}

fn cmd_head(args: &[String], vfs: &mut Vfs, stdin: &str) -> CommandOutput {
    let (n, paths) = parse_count_args(args);
    let content = match read_input("head", paths.first(), vfs, stdin) {
        Ok(c) => c,
        Err(msg) => return CommandOutput::err(msg),
    };
    let lines: Vec<&str> = content.lines().take(n).collect();
    CommandOutput::ok(join_lines(&lines))
}

fn cmd_tail(args: &[String], vfs: &mut Vfs, stdin: &str) -> CommandOutput {
    let (n, paths) = parse_count_args(args);
    let content = match read_input("tail", paths.first(), vfs, stdin) {
        Ok(c) => c,
        Err(msg) => return CommandOutput::err(msg),
    };
    let all: Vec<&str> = content.lines().collect();
    let skip = all.len().saturating_sub(n);
    CommandOutput::ok(join_lines(&all[skip..]))
}

fn cmd_wc(args: &[String], vfs: &mut Vfs, stdin: &str) -> CommandOutput {
    let mut count_lines = false;
    let mut count_words = false;
    let mut count_chars = false;
    let mut paths = Vec::new();

    for arg in args {
        match arg.as_str() {
            "-l" => count_lines = true,
            "-w" => count_words = true,
            "-c" => count_chars = true,
            _ => paths.push(arg.clone()),
        }
    }
    if !count_lines && !count_words && !count_chars {
        count_lines = true;
        count_words = true;
        count_chars = true;
    }

    let content = match read_input("wc", paths.first(), vfs, stdin) {
        Ok(c) => c,
        Err(msg) => return CommandOutput::err(msg),
    };

    // Line count is the number of newline bytes: three newline-terminated
    // lines count as 3.
    let lines = content.matches('\n').count();
    let words = content.split_whitespace().count();
    let chars = content.len();

    let mut parts = Vec::new();
    if count_lines {
        parts.push(lines.to_string());
    }
    if count_words {
        parts.push(words.to_string());
    }
    if count_chars {
        parts.push(chars.to_string());
    }
    CommandOutput::ok(parts.join(" "))
}

fn cmd_grep(args: &[String], vfs: &mut Vfs, stdin: &str) -> CommandOutput {
    let pattern = match args.first() {
        Some(p) => p,
        None => return CommandOutput::err("grep: missing pattern"),
    };
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(_) => return CommandOutput::err(format!("grep: invalid pattern: '{}'", pattern)),
    };
    let content = match read_input("grep", args.get(1), vfs, stdin) {
        Ok(c) => c,
        Err(msg) => return CommandOutput::err(msg),
    };
    let matched: Vec<&str> = content.lines().filter(|l| re.is_match(l)).collect();
    CommandOutput::ok(join_lines(&matched))
}

fn cmd_sort(args: &[String], vfs: &mut Vfs, stdin: &str) -> CommandOutput {
    let content = match read_input("sort", args.first(), vfs, stdin) {
        Ok(c) => c,
        Err(msg) => return CommandOutput::err(msg),
    };
    let mut lines: Vec<&str> = content.lines().collect();
    lines.sort_unstable();
    CommandOutput::ok(join_lines(&lines))
}

fn cmd_uniq(args: &[String], vfs: &mut Vfs, stdin: &str) -> CommandOutput {
    let content = match read_input("uniq", args.first(), vfs, stdin) {
        Ok(c) => c,
        Err(msg) => return CommandOutput::err(msg),
    };
    let mut out: Vec<&str> = Vec::new();
    for line in content.lines() {
        if out.last() != Some(&line) {
            out.push(line);
        }
    }
    CommandOutput::ok(join_lines(&out))
}

fn cmd_diff(args: &[String], vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    let (left, right) = match (args.first(), args.get(1)) {
        (Some(a), Some(b)) => (a, b),
        _ => return CommandOutput::err("diff: missing operand"),
    };
    let read = |path: &String| {
        vfs.read_file(path)
            .map_err(|e| format!("diff: {}: {}", path, e))
    };
    let a = match read(left) {
        Ok(c) => c,
        Err(msg) => return CommandOutput::err(msg),
    };
    let b = match read(right) {
        Ok(c) => c,
        Err(msg) => return CommandOutput::err(msg),
    };

    let lines_a: Vec<&str> = a.lines().collect();
    let lines_b: Vec<&str> = b.lines().collect();
    if lines_a == lines_b {
        return CommandOutput::ok_empty();
    }

    let mut out = Vec::new();
    let max = lines_a.len().max(lines_b.len());
    for i in 0..max {
        match (lines_a.get(i), lines_b.get(i)) {
            (Some(l), Some(r)) if l != r => {
                out.push(format!("{}c{}", i + 1, i + 1));
                out.push(format!("< {}", l));
                out.push(String::from("---"));
                out.push(format!("> {}", r));
            }
            (Some(l), None) => {
                out.push(format!("{}d{}", i + 1, lines_b.len()));
                out.push(format!("< {}", l));
            }
            (None, Some(r)) => {
                out.push(format!("{}a{}", lines_a.len(), i + 1));
                out.push(format!("> {}", r));
            }
            _ => {}
        }
    }
    CommandOutput::ok(out.join("\n"))
}

// ════════════════════════════════════════════════════════════
//  Utilities
// ════════════════════════════════════════════════════════════

fn cmd_date(_args: &[String], _vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    CommandOutput::ok(Utc::now().format("%a %b %e %H:%M:%S UTC %Y").to_string())
}

fn cmd_cal(args: &[String], _vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    let today = Utc::now().date_naive();
    match args.len() {
        0 => match render_month(today.year(), today.month()) {
            Some(lines) => CommandOutput::ok(lines.join("\n")),
            None => CommandOutput::err("cal: invalid date"),
        },
        1 => {
            let year: i32 = match args[0].parse() {
                Ok(y) => y,
                Err(_) => {
                    return CommandOutput::err(format!("cal: invalid year '{}'", args[0]))
                }
            };
            let mut blocks = Vec::new();
            for month in 1..=12 {
                match render_month(year, month) {
                    Some(lines) => blocks.push(lines.join("\n")),
                    None => return CommandOutput::err(format!("cal: invalid year '{}'", args[0])),
                }
            }
            CommandOutput::ok(blocks.join("\n\n"))
        }
        _ => {
            let month: u32 = match args[0].parse() {
                Ok(m) if (1..=12).contains(&m) => m,
                _ => {
                    return CommandOutput::err(format!(
                        "cal: {} is not a month number (1..12)",
                        args[0]
                    ))
                }
            };
            let year: i32 = match args[1].parse() {
                Ok(y) => y,
                Err(_) => {
                    return CommandOutput::err(format!("cal: invalid year '{}'", args[1]))
                }
            };
            match render_month(year, month) {
                Some(lines) => CommandOutput::ok(lines.join("\n")),
                None => CommandOutput::err(format!("cal: invalid year '{}'", args[1])),
            }
        }
    }
}

/// One month as `cal` prints it: centered header, weekday row, day grid.
fn render_month(year: i32, month: u32) -> Option<Vec<String>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let days = next_month.pred_opt()?.day();

    let mut lines = Vec::new();
    let title = first.format("%B %Y").to_string();
    let header = format!("{:^20}", title);
    lines.push(String::from(header.trim_end()));
    lines.push(String::from("Su Mo Tu We Th Fr Sa"));

    let lead = first.weekday().num_days_from_sunday() as usize;
    let mut week = "   ".repeat(lead);
    for day in 1..=days {
        week.push_str(&format!("{:>2} ", day));
        if (lead + day as usize) % 7 == 0 {
            lines.push(String::from(week.trim_end()));
            week.clear();
        }
    }
    if !week.trim().is_empty() {
        lines.push(String::from(week.trim_end()));
    }
    Some(lines)
}

fn cmd_who(_args: &[String], _vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    CommandOutput::ok(format!(
        "student  tty1         {}",
        Utc::now().format("%Y-%m-%d %H:%M")
    ))
}

fn cmd_help(_args: &[String], _vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    let names: Vec<&str> = BUILTINS.iter().map(|(name, _)| *name).collect();
    CommandOutput::ok(format!(
        "vshell - virtual shell\navailable commands: {}",
        names.join(", ")
    ))
}

// ════════════════════════════════════════════════════════════
//  Simulated administrative commands
// ════════════════════════════════════════════════════════════

/// Elevated-privilege wrapper. Every subcommand is a no-op that only
/// returns confirmation text: these exist to demonstrate administrative
/// command syntax, not to manage anything.
fn cmd_sudo(args: &[String], _vfs: &mut Vfs, _stdin: &str) -> CommandOutput {
    let sub = match args.first() {
        Some(s) => s,
        None => return CommandOutput::err("sudo: missing operand"),
    };
    match sub.as_str() {
        "apt" | "apt-get" => sudo_apt(&args[1..]),
        "useradd" => sudo_user_op("useradd", "created", args.get(1)),
        "userdel" => sudo_user_op("userdel", "removed", args.get(1)),
        "usermod" => sudo_user_op("usermod", "modified", last_non_flag(&args[1..])),
        "groupadd" => sudo_group_op("groupadd", "created", args.get(1)),
        "groupdel" => sudo_group_op("groupdel", "removed", args.get(1)),
        "passwd" => {
            let user = args.get(1).map(String::as_str).unwrap_or("student");
            CommandOutput::ok(format!(
                "passwd: password for '{}' updated successfully (simulated)",
                user
            ))
        }
        other => CommandOutput::err(format!("sudo: {}: command not found", other)),
    }
}

fn sudo_apt(args: &[String]) -> CommandOutput {
    let action = args.first().map(String::as_str).unwrap_or("");
    match action {
        "install" => match args.get(1) {
            Some(pkg) => CommandOutput::ok(format!(
                "Reading package lists... Done\nBuilding dependency tree... Done\nSetting up {} ... done (simulated, nothing was installed)",
                pkg
            )),
            None => CommandOutput::err("apt: missing package name"),
        },
        "remove" => match args.get(1) {
            Some(pkg) => CommandOutput::ok(format!(
                "Reading package lists... Done\nRemoving {} ... done (simulated, nothing was removed)",
                pkg
            )),
            None => CommandOutput::err("apt: missing package name"),
        },
        "update" => CommandOutput::ok(
            "Hit:1 http://archive.example.org/ubuntu stable InRelease\nReading package lists... Done (simulated)",
        ),
        other => CommandOutput::err(format!("apt: invalid operation: '{}'", other)),
    }
}

fn sudo_user_op(cmd: &str, verb: &str, name: Option<&String>) -> CommandOutput {
    match name {
        Some(user) => {
            CommandOutput::ok(format!("{}: user '{}' {} (simulated)", cmd, user, verb))
        }
        None => CommandOutput::err(format!("{}: missing operand", cmd)),
    }
}

fn sudo_group_op(cmd: &str, verb: &str, name: Option<&String>) -> CommandOutput {
    match name {
        Some(group) => {
            CommandOutput::ok(format!("{}: group '{}' {} (simulated)", cmd, group, verb))
        }
        None => CommandOutput::err(format!("{}: missing operand", cmd)),
    }
}

/// `usermod` takes flags before the user name; the name is the last
/// non-flag argument.
fn last_non_flag(args: &[String]) -> Option<&String> {
    args.iter().rev().find(|a| !a.starts_with('-'))
}
