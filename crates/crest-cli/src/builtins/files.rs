//! Built-ins that wrap filesystem operations. Handlers report their own
//! errors and always let the dispatcher loop continue.

use anyhow::Result;
use std::env;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::repl::{Flow, Shell};

fn arg_path(argv: &[String]) -> PathBuf {
    argv.get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

pub(crate) fn run_ls(_shell: &mut Shell, argv: &[String]) -> Result<Flow> {
    let path = arg_path(argv);
    match fs::read_dir(&path) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if !is_hidden(&name) {
                    println!("{name}");
                }
            }
        }
        Err(err) => eprintln!("crest: ls: {err}"),
    }
    Ok(Flow::Continue)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct DirCounts {
    pub total: usize,
    pub dirs: usize,
    pub files: usize,
}

pub(crate) fn count_entries(path: &Path) -> io::Result<DirCounts> {
    let mut counts = DirCounts::default();
    for entry in fs::read_dir(path)?.flatten() {
        counts.total += 1;
        let is_dir = fs::metadata(entry.path())
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if is_dir {
            counts.dirs += 1;
        } else {
            counts.files += 1;
        }
    }
    Ok(counts)
}

pub(crate) fn run_count(_shell: &mut Shell, argv: &[String]) -> Result<Flow> {
    let path = arg_path(argv);
    match count_entries(&path) {
        Ok(counts) => println!(
            "Total: {} items ({} directories, {} files)",
            counts.total, counts.dirs, counts.files
        ),
        Err(err) => eprintln!("crest: count: {err}"),
    }
    Ok(Flow::Continue)
}

/// Walk everything under `root` and collect paths whose file name matches
/// the pattern. Directories match too; unreadable entries are skipped.
pub(crate) fn find_matches(root: &Path, pattern: &glob::Pattern) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| pattern.matches(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.into_path())
        .collect()
}

pub(crate) fn run_find(_shell: &mut Shell, argv: &[String]) -> Result<Flow> {
    let Some(raw_pattern) = argv.get(1) else {
        println!("Usage: find <pattern>");
        println!("Example: find \"*.rs\" to find all Rust files");
        return Ok(Flow::Continue);
    };
    let pattern = match glob::Pattern::new(raw_pattern) {
        Ok(pattern) => pattern,
        Err(err) => {
            eprintln!("crest: find: {err}");
            return Ok(Flow::Continue);
        }
    };
    let root = match env::current_dir() {
        Ok(cwd) => cwd,
        Err(err) => {
            eprintln!("crest: find: {err}");
            return Ok(Flow::Continue);
        }
    };

    println!("Searching for files matching '{raw_pattern}'...");
    let matches = find_matches(&root, &pattern);
    for path in &matches {
        println!("{}", path.display());
    }
    println!("Found {} matching items", matches.len());
    Ok(Flow::Continue)
}

pub(crate) fn run_cat(_shell: &mut Shell, argv: &[String]) -> Result<Flow> {
    let Some(path) = argv.get(1) else {
        println!("Usage: cat <filename>");
        return Ok(Flow::Continue);
    };
    match fs::read_to_string(path) {
        Ok(contents) => print!("{contents}"),
        Err(err) => eprintln!("crest: cat: {err}"),
    }
    Ok(Flow::Continue)
}

/// Render a directory tree with box-drawing connectors. Hidden entries
/// are skipped; entries sort by name so output is stable.
pub(crate) fn render_tree(root: &Path) -> io::Result<String> {
    let mut out = format!("{}\n", root.display());
    render_tree_level(root, "", &mut out)?;
    Ok(out)
}

fn render_tree_level(dir: &Path, prefix: &str, out: &mut String) -> io::Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .flatten()
        .filter(|entry| !is_hidden(&entry.file_name().to_string_lossy()))
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    let count = entries.len();
    for (idx, entry) in entries.iter().enumerate() {
        let is_last = idx + 1 == count;
        let connector = if is_last { "└── " } else { "├── " };
        let name = entry.file_name().to_string_lossy().into_owned();
        out.push_str(&format!("{prefix}{connector}{name}\n"));

        let path = entry.path();
        let is_dir = fs::metadata(&path)
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if is_dir {
            let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
            // Unreadable subdirectories are skipped, not fatal.
            let _ = render_tree_level(&path, &child_prefix, out);
        }
    }
    Ok(())
}

pub(crate) fn run_tree(_shell: &mut Shell, argv: &[String]) -> Result<Flow> {
    let path = arg_path(argv);
    match render_tree(&path) {
        Ok(rendered) => print!("{rendered}"),
        Err(err) => eprintln!("crest: tree: {err}"),
    }
    Ok(Flow::Continue)
}

pub(crate) fn run_mkdir(_shell: &mut Shell, argv: &[String]) -> Result<Flow> {
    let Some(name) = argv.get(1) else {
        println!("Usage: mkdir <directory_name>");
        return Ok(Flow::Continue);
    };
    match fs::create_dir(name) {
        Ok(()) => println!("Directory created: {name}"),
        Err(err) => eprintln!("crest: mkdir: {err}"),
    }
    Ok(Flow::Continue)
}

pub(crate) fn run_touch(_shell: &mut Shell, argv: &[String]) -> Result<Flow> {
    let Some(path) = argv.get(1) else {
        println!("Usage: touch <filename>");
        return Ok(Flow::Continue);
    };
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(_) => println!("File created/updated: {path}"),
        Err(err) => eprintln!("crest: touch: {err}"),
    }
    Ok(Flow::Continue)
}

pub(crate) fn run_rm(_shell: &mut Shell, argv: &[String]) -> Result<Flow> {
    let Some(path) = argv.get(1) else {
        println!("Usage: rm <filename>");
        return Ok(Flow::Continue);
    };
    match fs::remove_file(path) {
        Ok(()) => println!("Removed: {path}"),
        Err(err) => eprintln!("crest: rm: {err}"),
    }
    Ok(Flow::Continue)
}
