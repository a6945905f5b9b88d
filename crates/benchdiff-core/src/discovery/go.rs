//! Source-level loader for Go codebases.
//!
//! Reads `.go` files without invoking the Go toolchain: comments and
//! string/rune literals are blanked out, then the package clause and the
//! top-level `func` headers are extracted.

use super::{DeclarationSource, FuncDecl, PackageDecls, SourceFile};
use crate::error::DiscoveryError;
use regex_lite::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::{DirEntry, WalkDir};

/// Directory names never descended into. Files and directories whose names
/// start with `.` or `_` are skipped as well.
const SKIPPED_DIRS: &[&str] = &["vendor", "testdata"];

/// Loads every package below a root directory, one package per
/// (directory, package clause) pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoSourceLoader;

impl GoSourceLoader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DeclarationSource for GoSourceLoader {
    fn load(&self, root: &Path) -> Result<Vec<PackageDecls>, DiscoveryError> {
        if !root.is_dir() {
            return Err(DiscoveryError::RootNotFound(root.to_path_buf()));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped(e));
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                DiscoveryError::Read {
                    path,
                    source: e.into(),
                }
            })?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "go")
            {
                files.push(entry.into_path());
            }
        }

        let mut packages: BTreeMap<(PathBuf, String), Vec<SourceFile>> = BTreeMap::new();
        for path in files {
            let bytes = fs::read(&path).map_err(|source| DiscoveryError::Read {
                path: path.clone(),
                source,
            })?;
            let source = String::from_utf8_lossy(&bytes);
            let parsed = parse_go_file(&source).map_err(|message| DiscoveryError::Parse {
                path: path.clone(),
                message,
            })?;

            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            packages
                .entry((dir, parsed.package))
                .or_default()
                .push(SourceFile {
                    path,
                    functions: parsed.functions,
                });
        }

        Ok(packages
            .into_iter()
            .map(|((dir, name), files)| PackageDecls { name, dir, files })
            .collect())
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') || name.starts_with('_') {
        return true;
    }
    entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref())
}

#[derive(Debug)]
struct ParsedFile {
    package: String,
    functions: Vec<FuncDecl>,
}

fn package_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*package\s+([A-Za-z_][A-Za-z0-9_]*)").expect("valid package regex")
    })
}

fn func_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)^func\s*(?:\(([^)]*)\)\s*)?([A-Za-z_][A-Za-z0-9_]*)\s*(?:\[[^\]]*\])?\s*\(([^)]*)\)(.*)$",
        )
        .expect("valid func header regex")
    })
}

fn parse_go_file(source: &str) -> Result<ParsedFile, String> {
    let clean = strip_comments_and_literals(source)?;

    let package = package_re()
        .captures(&clean)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| "missing package clause".to_string())?;

    let functions = top_level_headers(&clean)?
        .into_iter()
        .filter_map(parse_func_header)
        .collect();

    Ok(ParsedFile { package, functions })
}

fn parse_func_header(header: &str) -> Option<FuncDecl> {
    let caps = func_header_re().captures(header.trim())?;
    Some(FuncDecl {
        name: caps[2].to_string(),
        receiver: caps.get(1).map(|m| m.as_str().trim().to_string()),
        params: caps[3].trim().trim_end_matches(',').trim_end().to_string(),
        results: caps[4].trim().to_string(),
    })
}

/// Replace comments and literal contents with blanks, keeping newlines so
/// brace structure and line layout survive.
fn strip_comments_and_literals(source: &str) -> Result<String, String> {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                for d in chars.by_ref() {
                    if d == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut closed = false;
                let mut prev = '\0';
                for d in chars.by_ref() {
                    if d == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && d == '/' {
                        closed = true;
                        break;
                    }
                    prev = d;
                }
                if !closed {
                    return Err("unterminated block comment".to_string());
                }
                out.push(' ');
            }
            '"' | '\'' => {
                out.push(c);
                let mut closed = false;
                let mut escaped = false;
                for d in chars.by_ref() {
                    if escaped {
                        escaped = false;
                        continue;
                    }
                    match d {
                        '\\' => escaped = true,
                        '\n' => return Err("newline in literal".to_string()),
                        _ if d == c => {
                            closed = true;
                            break;
                        }
                        _ => {}
                    }
                }
                if !closed {
                    return Err("unterminated literal".to_string());
                }
                out.push(c);
            }
            '`' => {
                out.push('`');
                let mut closed = false;
                for d in chars.by_ref() {
                    if d == '`' {
                        closed = true;
                        break;
                    }
                    if d == '\n' {
                        out.push('\n');
                    }
                }
                if !closed {
                    return Err("unterminated raw string".to_string());
                }
                out.push('`');
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Collect the headers (`func ...` up to the body brace) of declarations
/// that start a line at brace depth zero. Fails on unbalanced braces.
fn top_level_headers(clean: &str) -> Result<Vec<&str>, String> {
    let bytes = clean.as_bytes();
    let mut headers = Vec::new();
    let mut depth: i64 = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth < 0 {
                    return Err("unbalanced braces".to_string());
                }
            }
            b'f' if depth == 0 && (i == 0 || bytes[i - 1] == b'\n') && is_func_keyword(bytes, i) => {
                let start = i;
                let mut parens = 0i64;
                while i < bytes.len() {
                    match bytes[i] {
                        b'(' => parens += 1,
                        b')' => parens -= 1,
                        b'{' | b'\n' if parens <= 0 => break,
                        _ => {}
                    }
                    i += 1;
                }
                headers.push(&clean[start..i]);
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    if depth != 0 {
        return Err("unbalanced braces".to_string());
    }
    Ok(headers)
}

fn is_func_keyword(bytes: &[u8], i: usize) -> bool {
    bytes[i..].starts_with(b"func")
        && bytes
            .get(i + 4)
            .is_some_and(|&b| b == b'(' || b.is_ascii_whitespace())
}
