//! Command-line parsing and pipeline execution.
//!
//! A raw line is split on `|` into stages; each stage may carry one input
//! redirection (`<`) and the final stage one output redirection (`>` or
//! `>>`). Stages run strictly left to right, each receiving the previous
//! stage's stdout as stdin. The executor deep-copies the caller's snapshot
//! before running and the whole command line is atomic: any stage failure
//! returns the pre-command snapshot untouched.

use log::debug;

use crate::commands::CommandRegistry;
use crate::fs::Vfs;

/// What one command line produced: the final stdout (unless redirected),
/// the stderr of the failing stage (if any), and the snapshot the caller
/// should re-bind to.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    pub vfs: Vfs,
}

/// One stage of a pipeline: a command, its arguments, and any
/// redirections that were attached to it.
#[derive(Debug, Clone, PartialEq)]
struct Stage {
    command: String,
    args: Vec<String>,
    stdin_from: Option<String>,
    stdout_to: Option<(String, bool)>, // (target, append)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Pipe,
    RedirIn,
    RedirOut,
    RedirAppend,
}

// ────────────────────────── Tokenizer ──────────────────────────

/// Split a line into words and operators. Single- and double-quoted runs
/// are atomic words; operators inside quotes are plain text.
fn tokenize(input: &str) -> Vec<Token> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '>' => {
                if chars.get(i + 1) == Some(&'>') {
                    tokens.push(Token::RedirAppend);
                    i += 2;
                } else {
                    tokens.push(Token::RedirOut);
                    i += 1;
                }
                continue;
            }
            '<' => {
                tokens.push(Token::RedirIn);
                i += 1;
                continue;
            }
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
                continue;
            }
            '"' | '\'' => {
                let quote = c;
                i += 1;
                let mut word = String::new();
                while i < chars.len() && chars[i] != quote {
                    word.push(chars[i]);
                    i += 1;
                }
                if i < chars.len() {
                    i += 1; // closing quote
                }
                tokens.push(Token::Word(word));
                continue;
            }
            _ => {}
        }

        let mut word = String::new();
        while i < chars.len()
            && !chars[i].is_whitespace()
            && !matches!(chars[i], '|' | '>' | '<' | '"' | '\'')
        {
            word.push(chars[i]);
            i += 1;
        }
        tokens.push(Token::Word(word));
    }

    tokens
}

// ────────────────────────── Parser ──────────────────────────

fn parse_pipeline(line: &str) -> Result<Vec<Stage>, String> {
    let mut stages = Vec::new();
    let mut words: Vec<String> = Vec::new();
    let mut stdin_from: Option<String> = None;
    let mut stdout_to: Option<(String, bool)> = None;

    let mut it = tokenize(line).into_iter();
    while let Some(token) = it.next() {
        match token {
            Token::Word(w) => words.push(w),
            Token::Pipe => {
                stages.push(finish_stage(&mut words, &mut stdin_from, &mut stdout_to)?);
            }
            Token::RedirIn => {
                stdin_from = Some(redirection_target(&mut it)?);
            }
            Token::RedirOut => {
                stdout_to = Some((redirection_target(&mut it)?, false));
            }
            Token::RedirAppend => {
                stdout_to = Some((redirection_target(&mut it)?, true));
            }
        }
    }
    stages.push(finish_stage(&mut words, &mut stdin_from, &mut stdout_to)?);

    Ok(stages)
}

/// Close out the stage accumulated so far. A stage with no command at all
/// (an empty pipe segment) is a syntax error.
fn finish_stage(
    words: &mut Vec<String>,
    stdin_from: &mut Option<String>,
    stdout_to: &mut Option<(String, bool)>,
) -> Result<Stage, String> {
    if words.is_empty() {
        return Err(String::from("syntax error near unexpected token '|'"));
    }
    let command = words.remove(0);
    Ok(Stage {
        command,
        args: std::mem::take(words),
        stdin_from: stdin_from.take(),
        stdout_to: stdout_to.take(),
    })
}

fn redirection_target(it: &mut impl Iterator<Item = Token>) -> Result<String, String> {
    match it.next() {
        Some(Token::Word(w)) => Ok(w),
        _ => Err(String::from("syntax error: missing redirection target")),
    }
}

// ────────────────────────── Executor ──────────────────────────

/// Run one command line against a snapshot.
///
/// The snapshot is deep-copied first; the caller replaces its held value
/// with the returned one (copy-on-write at call granularity). On any stage
/// failure the returned snapshot is the original, so a failed command line
/// never commits partial mutations.
pub fn execute(line: &str, snapshot: &Vfs, registry: &CommandRegistry) -> ExecOutcome {
    if line.trim().is_empty() {
        return ExecOutcome {
            stdout: String::new(),
            stderr: String::new(),
            vfs: snapshot.clone(),
        };
    }

    let stages = match parse_pipeline(line) {
        Ok(stages) => stages,
        Err(msg) => return failed(msg, snapshot),
    };

    let mut vfs = snapshot.clone();
    let mut piped = String::new();

    for (i, stage) in stages.iter().enumerate() {
        let handler = match registry.get(&stage.command) {
            Some(h) => h,
            None => {
                debug!("stage {}: unknown command {:?}", i, stage.command);
                return failed(format!("command not found: {}", stage.command), snapshot);
            }
        };

        let stdin_text = match &stage.stdin_from {
            Some(path) => match vfs.read_file(path) {
                Ok(content) => content,
                Err(e) => return failed(format!("{}: {}", path, e), snapshot),
            },
            None => std::mem::take(&mut piped),
        };

        debug!("stage {}: {} {:?}", i, stage.command, stage.args);
        let out = handler(&stage.args, &mut vfs, &stdin_text);
        if !out.stderr.is_empty() {
            debug!("stage {} failed, discarding mutations", i);
            return failed(out.stderr, snapshot);
        }
        piped = out.stdout;
    }

    if let Some(stage) = stages.last() {
        if let Some((path, append)) = &stage.stdout_to {
            return match vfs.write_file(path, &piped, *append) {
                Ok(()) => ExecOutcome {
                    stdout: String::new(),
                    stderr: String::new(),
                    vfs,
                },
                Err(e) => {
                    debug!("redirection write to {:?} failed, discarding mutations", path);
                    failed(format!("{}: {}", path, e), snapshot)
                }
            };
        }
    }

    ExecOutcome {
        stdout: piped,
        stderr: String::new(),
        vfs,
    }
}

fn failed(stderr: String, snapshot: &Vfs) -> ExecOutcome {
    ExecOutcome {
        stdout: String::new(),
        stderr,
        vfs: snapshot.clone(),
    }
}
