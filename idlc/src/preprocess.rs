//! Line-oriented IDL preprocessor.
//!
//! Resolves `#include`, `#define`/`#undef` and the `#ifdef`/`#ifndef`/
//! `#else`/`#endif` conditionals, strips comments and joins continued lines.
//! Symbols only drive conditionals; there is no macro substitution in IDL
//! text. The pragmas understood by the compiler (`prefix`, `ID`, `version`)
//! are passed through, every other pragma is dropped with a warning.
//!
//! Lines consumed by directives or skipped by a false conditional are
//! replaced by empty lines, so line numbers of the top-level file stay
//! aligned with the preprocessed text up to the first `#include`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::span::Span;

/// Errors raised while preprocessing.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("{file}:{line}: illegal directive `{directive}`: {reason}")]
    IllegalDirective {
        file: String,
        line: usize,
        directive: String,
        reason: &'static str,
    },

    #[error("{file}:{line}: unknown directive `{directive}`")]
    UnknownDirective {
        file: String,
        line: usize,
        directive: String,
    },

    #[error("{file}:{line}: redefinition of preprocessor symbol `{name}`")]
    SymbolRedefined {
        file: String,
        line: usize,
        name: String,
    },

    #[error("{file}:{line}: `#{directive}` without matching `#ifdef`/`#ifndef`")]
    UnmatchedConditional {
        file: String,
        line: usize,
        directive: &'static str,
    },

    #[error("{file}: {count} missing `#endif`")]
    MissingEndif { file: String, count: usize },

    #[error("{file}:{line}: unterminated block comment")]
    UnterminatedComment { file: String, line: usize },

    #[error("{file}:{line}: backslash can not be the last character in a file")]
    DanglingContinuation { file: String, line: usize },

    #[error("{file}:{line}: included file `{name}` not found")]
    IncludeNotFound {
        file: String,
        line: usize,
        name: String,
    },

    #[error("{file}:{line}: `{name}` is included recursively")]
    IncludeCycle {
        file: String,
        line: usize,
        name: String,
    },

    #[error("failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PreprocessError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PreprocessError::IllegalDirective { .. } => ErrorCode::IllegalDirective,
            PreprocessError::UnknownDirective { .. } => ErrorCode::UnknownDirective,
            PreprocessError::SymbolRedefined { .. } => ErrorCode::SymbolRedefined,
            PreprocessError::UnmatchedConditional { .. } | PreprocessError::MissingEndif { .. } => {
                ErrorCode::UnbalancedConditional
            }
            PreprocessError::UnterminatedComment { .. } => ErrorCode::UnclosedBlockComment,
            PreprocessError::DanglingContinuation { .. } => ErrorCode::IllegalDirective,
            PreprocessError::IncludeNotFound { .. } | PreprocessError::Io { .. } => {
                ErrorCode::IncludeNotFound
            }
            PreprocessError::IncludeCycle { .. } => ErrorCode::IncludeCycle,
        }
    }

    /// Preprocessing happens before there is text to point into, so the
    /// diagnostic carries the location in its message only.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string(), Span::dummy()).with_error_code(self.code())
    }
}

/// Decode Latin-1 bytes; IDL sources are not required to be UTF-8.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentState {
    Normal,
    InString,
    AfterSlash,
    InBlock,
    AfterStar,
}

/// Reads logical lines: continuations joined, comments removed, trimmed.
struct LineReader<'t> {
    lines: std::str::Lines<'t>,
    line_no: usize,
    state: CommentState,
    file: String,
}

impl<'t> LineReader<'t> {
    fn new(text: &'t str, file: &str) -> Self {
        Self {
            lines: text.lines(),
            line_no: 0,
            state: CommentState::Normal,
            file: file.to_string(),
        }
    }

    /// Returns the 1-based number of the first physical line, the logical
    /// line and how many physical lines were consumed.
    fn next_line(&mut self) -> Result<Option<(usize, String, usize)>, PreprocessError> {
        let Some(first) = self.lines.next() else {
            if matches!(self.state, CommentState::InBlock | CommentState::AfterStar) {
                return Err(PreprocessError::UnterminatedComment {
                    file: self.file.clone(),
                    line: self.line_no,
                });
            }
            return Ok(None);
        };
        self.line_no += 1;
        let start = self.line_no;
        let mut consumed = 1;
        let mut raw = first.to_string();
        while raw.ends_with('\\') {
            raw.pop();
            match self.lines.next() {
                Some(next) => {
                    self.line_no += 1;
                    consumed += 1;
                    raw.push(' ');
                    raw.push_str(next);
                }
                None => {
                    return Err(PreprocessError::DanglingContinuation {
                        file: self.file.clone(),
                        line: self.line_no,
                    })
                }
            }
        }
        Ok(Some((start, self.strip_comments(&raw), consumed)))
    }

    fn strip_comments(&mut self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        for c in line.chars() {
            self.state = match self.state {
                CommentState::Normal => match c {
                    '/' => CommentState::AfterSlash,
                    '"' => {
                        out.push(c);
                        CommentState::InString
                    }
                    _ => {
                        out.push(c);
                        CommentState::Normal
                    }
                },
                CommentState::InString => {
                    out.push(c);
                    if c == '"' {
                        CommentState::Normal
                    } else {
                        CommentState::InString
                    }
                }
                CommentState::AfterSlash => match c {
                    '/' => {
                        // line comment: drop the rest of the line
                        self.state = CommentState::Normal;
                        return out.trim().to_string();
                    }
                    '*' => CommentState::InBlock,
                    '"' => {
                        out.push('/');
                        out.push(c);
                        CommentState::InString
                    }
                    _ => {
                        out.push('/');
                        out.push(c);
                        CommentState::Normal
                    }
                },
                CommentState::InBlock => {
                    if c == '*' {
                        CommentState::AfterStar
                    } else {
                        CommentState::InBlock
                    }
                }
                CommentState::AfterStar => match c {
                    '/' => {
                        out.push(' ');
                        CommentState::Normal
                    }
                    '*' => CommentState::AfterStar,
                    _ => CommentState::InBlock,
                },
            };
        }
        // end of line
        match self.state {
            CommentState::AfterSlash => {
                out.push('/');
                self.state = CommentState::Normal;
            }
            CommentState::InString => self.state = CommentState::Normal,
            _ => {}
        }
        out.trim().to_string()
    }
}

/// One open `#ifdef`/`#ifndef` block.
#[derive(Debug, Clone, Copy)]
struct Conditional {
    enclosing_active: bool,
    condition: bool,
    in_else: bool,
}

impl Conditional {
    fn is_active(&self) -> bool {
        self.enclosing_active && (self.condition != self.in_else)
    }
}

/// The IDL preprocessor.
///
/// Symbols defined while processing one top-level file (including everything
/// it includes) are forgotten before the next top-level file; symbols passed
/// to [`Preprocessor::new`] are predefined for every file.
pub struct Preprocessor {
    include_dirs: Vec<PathBuf>,
    predefined: HashMap<String, String>,
    defined: HashMap<String, String>,
    include_stack: Vec<PathBuf>,
}

impl Preprocessor {
    pub fn new(include_dirs: Vec<PathBuf>, predefined: &[String]) -> Self {
        let predefined: HashMap<String, String> = predefined
            .iter()
            .map(|name| (name.clone(), String::new()))
            .collect();
        Self {
            include_dirs,
            defined: predefined.clone(),
            predefined,
            include_stack: Vec::new(),
        }
    }

    /// Preprocess a file from disk.
    pub fn process_file(&mut self, path: &Path) -> Result<String, PreprocessError> {
        let text = read_source(path)?;
        self.defined = self.predefined.clone();
        self.include_stack.clear();
        self.include_stack.push(identity_of(path));
        let display = path.display().to_string();
        let result = self.process_text(&text, &display, path.parent());
        self.include_stack.clear();
        result
    }

    /// Preprocess in-memory text; quoted includes are searched relative to
    /// `base_dir` when given.
    pub fn process_str(
        &mut self,
        name: &str,
        text: &str,
        base_dir: Option<&Path>,
    ) -> Result<String, PreprocessError> {
        self.defined = self.predefined.clone();
        self.include_stack.clear();
        self.process_text(text, name, base_dir)
    }

    /// Whether a preprocessor symbol is currently defined.
    pub fn is_defined(&self, name: &str) -> bool {
        self.defined.contains_key(name)
    }

    fn process_text(
        &mut self,
        text: &str,
        file: &str,
        dir: Option<&Path>,
    ) -> Result<String, PreprocessError> {
        let mut reader = LineReader::new(text, file);
        let mut conditionals: Vec<Conditional> = Vec::new();
        let mut out = String::with_capacity(text.len());

        while let Some((line_no, line, consumed)) = reader.next_line()? {
            let active = conditionals.last().map_or(true, Conditional::is_active);
            let Some(directive) = line.strip_prefix('#') else {
                if active {
                    out.push_str(&line);
                }
                push_newlines(&mut out, consumed);
                continue;
            };

            let directive = directive.trim_start();
            let (keyword, rest) = split_keyword(directive);
            let args: Vec<&str> = rest.split_whitespace().collect();
            let err_illegal = |reason: &'static str| PreprocessError::IllegalDirective {
                file: file.to_string(),
                line: line_no,
                directive: line.clone(),
                reason,
            };

            match keyword {
                "ifdef" | "ifndef" => {
                    if active && args.len() != 1 {
                        return Err(err_illegal("exactly one symbol expected"));
                    }
                    let defined = args.first().map_or(false, |s| self.defined.contains_key(*s));
                    conditionals.push(Conditional {
                        enclosing_active: active,
                        condition: if keyword == "ifdef" { defined } else { !defined },
                        in_else: false,
                    });
                }
                "if" if !active => {
                    // only nesting matters inside a skipped block
                    conditionals.push(Conditional {
                        enclosing_active: false,
                        condition: false,
                        in_else: false,
                    });
                }
                "else" => match conditionals.last_mut() {
                    Some(cond) if !cond.in_else => cond.in_else = true,
                    _ => {
                        return Err(PreprocessError::UnmatchedConditional {
                            file: file.to_string(),
                            line: line_no,
                            directive: "else",
                        })
                    }
                },
                "endif" => {
                    if conditionals.pop().is_none() {
                        return Err(PreprocessError::UnmatchedConditional {
                            file: file.to_string(),
                            line: line_no,
                            directive: "endif",
                        });
                    }
                }
                _ if !active => {}
                "include" => {
                    if args.len() != 1 {
                        return Err(err_illegal("exactly one file argument expected"));
                    }
                    let included = self.include(args[0], file, line_no, dir, &line)?;
                    out.push_str(&included);
                    if !included.ends_with('\n') {
                        out.push('\n');
                    }
                    // the included text replaces this line
                    push_newlines(&mut out, consumed - 1);
                    continue;
                }
                "define" => {
                    if args.is_empty() {
                        return Err(err_illegal("define missing argument"));
                    }
                    if args.len() > 2 {
                        return Err(err_illegal("too many tokens in define directive"));
                    }
                    if self.defined.contains_key(args[0]) {
                        return Err(PreprocessError::SymbolRedefined {
                            file: file.to_string(),
                            line: line_no,
                            name: args[0].to_string(),
                        });
                    }
                    debug!("defined preprocessor symbol `{}`", args[0]);
                    self.defined
                        .insert(args[0].to_string(), args.get(1).unwrap_or(&"").to_string());
                }
                "undef" => {
                    if args.len() != 1 {
                        return Err(err_illegal("exactly one symbol expected"));
                    }
                    self.defined.remove(args[0]);
                }
                "pragma" => {
                    let kind = args.first().map(|k| k.to_ascii_lowercase());
                    match kind.as_deref() {
                        Some("prefix") | Some("id") | Some("version") => out.push_str(&line),
                        _ => warn!("{}:{}: unknown pragma ignored: {}", file, line_no, line),
                    }
                }
                _ => {
                    return Err(PreprocessError::UnknownDirective {
                        file: file.to_string(),
                        line: line_no,
                        directive: line.clone(),
                    })
                }
            }
            push_newlines(&mut out, consumed);
        }

        if !conditionals.is_empty() {
            return Err(PreprocessError::MissingEndif {
                file: file.to_string(),
                count: conditionals.len(),
            });
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }

    fn include(
        &mut self,
        arg: &str,
        file: &str,
        line_no: usize,
        dir: Option<&Path>,
        line: &str,
    ) -> Result<String, PreprocessError> {
        let (name, quoted) = if let Some(inner) = arg.strip_prefix('"').and_then(|a| a.strip_suffix('"')) {
            (inner, true)
        } else if let Some(inner) = arg.strip_prefix('<').and_then(|a| a.strip_suffix('>')) {
            (inner, false)
        } else {
            return Err(PreprocessError::IllegalDirective {
                file: file.to_string(),
                line: line_no,
                directive: line.to_string(),
                reason: "file name must be enclosed in \"\" or <>",
            });
        };

        let path = self.find_include(name, quoted, dir).ok_or_else(|| {
            PreprocessError::IncludeNotFound {
                file: file.to_string(),
                line: line_no,
                name: name.to_string(),
            }
        })?;

        let identity = identity_of(&path);
        if self.include_stack.contains(&identity) {
            return Err(PreprocessError::IncludeCycle {
                file: file.to_string(),
                line: line_no,
                name: name.to_string(),
            });
        }

        debug!("including `{}`", path.display());
        let text = read_source(&path)?;
        self.include_stack.push(identity);
        let result = self.process_text(&text, &path.display().to_string(), path.parent());
        self.include_stack.pop();
        result
    }

    fn find_include(&self, name: &str, quoted: bool, dir: Option<&Path>) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if quoted {
            if let Some(dir) = dir {
                candidates.push(dir.join(name));
            }
        }
        candidates.extend(self.include_dirs.iter().map(|d| d.join(name)));
        if !quoted {
            if let Some(dir) = dir {
                candidates.push(dir.join(name));
            }
        }
        candidates.push(PathBuf::from(name));
        candidates.into_iter().find(|c| c.is_file())
    }
}

fn read_source(path: &Path) -> Result<String, PreprocessError> {
    fs::read(path)
        .map(|bytes| decode_latin1(&bytes))
        .map_err(|source| PreprocessError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn identity_of(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn split_keyword(directive: &str) -> (&str, &str) {
    let end = directive
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(directive.len());
    (&directive[..end], &directive[end..])
}

fn push_newlines(out: &mut String, count: usize) {
    for _ in 0..count {
        out.push('\n');
    }
}
