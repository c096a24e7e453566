//! The built-in command table and the handlers that are not filesystem
//! wrappers. One ordered table maps each name to its handler; lookup is
//! exact string match.

use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use std::env;
use std::io;
use std::path::PathBuf;

use crate::repl::{Flow, Shell};
use crest_tools::launch_background;

mod files;

pub type BuiltinFn = fn(&mut Shell, &[String]) -> Result<Flow>;

pub struct Builtin {
    pub name: &'static str,
    pub summary: &'static str,
    pub run: BuiltinFn,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "cd",
        summary: "change the working directory (no argument: go home)",
        run: run_cd,
    },
    Builtin {
        name: "help",
        summary: "list built-in commands",
        run: run_help,
    },
    Builtin {
        name: "exit",
        summary: "leave the shell",
        run: run_exit,
    },
    Builtin {
        name: "bg",
        summary: "run a command in the background",
        run: run_bg,
    },
    Builtin {
        name: "history",
        summary: "show commands dispatched this session",
        run: run_history,
    },
    Builtin {
        name: "clear",
        summary: "clear the screen",
        run: run_clear,
    },
    Builtin {
        name: "echo",
        summary: "print the arguments",
        run: run_echo,
    },
    Builtin {
        name: "pwd",
        summary: "print the working directory",
        run: run_pwd,
    },
    Builtin {
        name: "ls",
        summary: "list directory entries",
        run: files::run_ls,
    },
    Builtin {
        name: "version",
        summary: "print the shell version",
        run: run_version,
    },
    Builtin {
        name: "calc",
        summary: "evaluate a binary arithmetic expression",
        run: run_calc,
    },
    Builtin {
        name: "datetime",
        summary: "print the local date and time",
        run: run_datetime,
    },
    Builtin {
        name: "count",
        summary: "count entries in a directory",
        run: files::run_count,
    },
    Builtin {
        name: "find",
        summary: "find files matching a glob pattern",
        run: files::run_find,
    },
    Builtin {
        name: "cat",
        summary: "print file contents",
        run: files::run_cat,
    },
    Builtin {
        name: "tree",
        summary: "print a directory tree",
        run: files::run_tree,
    },
    Builtin {
        name: "mkdir",
        summary: "create a directory",
        run: files::run_mkdir,
    },
    Builtin {
        name: "touch",
        summary: "create or update an empty file",
        run: files::run_touch,
    },
    Builtin {
        name: "rm",
        summary: "remove a file",
        run: files::run_rm,
    },
    Builtin {
        name: "whoami",
        summary: "print the current user name",
        run: run_whoami,
    },
];

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

fn run_cd(_shell: &mut Shell, argv: &[String]) -> Result<Flow> {
    let target = match argv.get(1) {
        Some(path) => PathBuf::from(path),
        None => match env::var("HOME") {
            Ok(home) => PathBuf::from(home),
            Err(_) => {
                eprintln!("crest: HOME environment variable not set");
                return Ok(Flow::Continue);
            }
        },
    };
    if let Err(err) = env::set_current_dir(&target) {
        eprintln!("crest: cd: {err}");
        return Ok(Flow::Continue);
    }
    if let Ok(cwd) = env::current_dir() {
        println!("Current directory: {}", cwd.display());
    }
    Ok(Flow::Continue)
}

fn run_help(_shell: &mut Shell, _argv: &[String]) -> Result<Flow> {
    println!("Crest shell");
    println!("Type program names and arguments, then press Enter.");
    println!("Press Tab for AI command suggestions.");
    println!("The following are built in:");
    for builtin in BUILTINS {
        println!("  {:<10} {}", builtin.name, builtin.summary);
    }
    Ok(Flow::Continue)
}

fn run_exit(_shell: &mut Shell, _argv: &[String]) -> Result<Flow> {
    Ok(Flow::Exit)
}

fn run_bg(shell: &mut Shell, argv: &[String]) -> Result<Flow> {
    if argv.len() < 2 {
        println!("Usage: bg <command> [args...]");
        return Ok(Flow::Continue);
    }
    match launch_background(&argv[1..]) {
        Ok(child) => shell.background.track(child),
        Err(err) => {
            eprintln!("crest: bg: {err}");
            shell.observer.record_failure(&err.to_string());
        }
    }
    Ok(Flow::Continue)
}

fn run_history(shell: &mut Shell, _argv: &[String]) -> Result<Flow> {
    for (idx, entry) in shell.history.entries() {
        println!(" {idx} {entry}");
    }
    Ok(Flow::Continue)
}

fn run_clear(_shell: &mut Shell, _argv: &[String]) -> Result<Flow> {
    execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
    Ok(Flow::Continue)
}

fn run_echo(_shell: &mut Shell, argv: &[String]) -> Result<Flow> {
    println!("{}", argv[1..].join(" "));
    Ok(Flow::Continue)
}

fn run_pwd(_shell: &mut Shell, _argv: &[String]) -> Result<Flow> {
    match env::current_dir() {
        Ok(cwd) => println!("{}", cwd.display()),
        Err(err) => eprintln!("crest: pwd: {err}"),
    }
    Ok(Flow::Continue)
}

fn run_version(_shell: &mut Shell, _argv: &[String]) -> Result<Flow> {
    println!("Crest Shell version {}", env!("CARGO_PKG_VERSION"));
    Ok(Flow::Continue)
}

#[derive(Debug, PartialEq)]
enum CalcError {
    DivisionByZero,
    UnknownOperator(char),
}

fn eval_calc(a: f64, op: char, b: f64) -> Result<f64, CalcError> {
    match op {
        '+' => Ok(a + b),
        '-' => Ok(a - b),
        '*' => Ok(a * b),
        '/' => {
            if b == 0.0 {
                Err(CalcError::DivisionByZero)
            } else {
                Ok(a / b)
            }
        }
        '%' => {
            if b == 0.0 {
                Err(CalcError::DivisionByZero)
            } else {
                Ok(a % b)
            }
        }
        '^' => Ok(a.powf(b)),
        other => Err(CalcError::UnknownOperator(other)),
    }
}

/// Integral results print without a decimal point; everything else is
/// rounded to six decimal places with trailing zeros trimmed.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let formatted = format!("{value:.6}");
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

fn run_calc(_shell: &mut Shell, argv: &[String]) -> Result<Flow> {
    let (Some(lhs), Some(op), Some(rhs)) = (argv.get(1), argv.get(2), argv.get(3)) else {
        println!("Usage: calc <number> <operator> <number>");
        println!("Operators: + - * / % ^");
        return Ok(Flow::Continue);
    };
    let (Ok(a), Ok(b)) = (lhs.parse::<f64>(), rhs.parse::<f64>()) else {
        println!("Error: operands must be numbers");
        return Ok(Flow::Continue);
    };
    let op = op.chars().next().unwrap_or(' ');
    match eval_calc(a, op, b) {
        Ok(value) => println!("{}", format_number(value)),
        Err(CalcError::DivisionByZero) => println!("Error: Division by zero"),
        Err(CalcError::UnknownOperator(ch)) => println!("Error: Unknown operator {ch}"),
    }
    Ok(Flow::Continue)
}

fn run_datetime(_shell: &mut Shell, _argv: &[String]) -> Result<Flow> {
    let now = chrono::Local::now();
    println!("{}", now.format("%A, %B %d, %Y - %I:%M:%S %p"));
    Ok(Flow::Continue)
}

fn run_whoami(_shell: &mut Shell, _argv: &[String]) -> Result<Flow> {
    match env::var("USER") {
        Ok(user) => println!("{user}"),
        Err(_) => println!("Unknown user"),
    }
    Ok(Flow::Continue)
}
