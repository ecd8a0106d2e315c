//! コマンドラインで選ばれたモードを実行する。
use crate::{
    config::{Config, TableKind},
    engine::{self, ParseOptions},
    helper::DynError,
    table::{self, MINIMIZED_DFA_CAPTION},
};
use colorful::Colorful;
use log::{debug, info};
use std::{fmt::Write as _, io};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Optimize,
    Compat,
    Table(TableKind),
    Parse { loc: bool },
}

impl Mode {
    /// optimize、compat、table、parse の優先順でモードをひとつ選ぶ。
    pub fn resolve(config: &Config) -> Self {
        if config.optimize {
            Mode::Optimize
        } else if config.compat {
            Mode::Compat
        } else if let Some(kind) = config.table {
            Mode::Table(kind)
        } else {
            Mode::Parse { loc: config.loc }
        }
    }
}

/// 選ばれたモードを実行し、結果を `out` に書き出す。
///
/// # 返り値
///
/// 正規表現にエラーがある場合は何も書き出さずに Err を返す。
pub fn run<W: io::Write>(config: Config, out: &mut W) -> Result<(), DynError> {
    let mode = Mode::resolve(&config);
    info!("mode = {mode:?}, expression = {:?}", config.expression);
    let output = render(mode, &config.expression, config.color)?;
    out.write_all(output.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn heading(text: &str, color: bool) -> String {
    match color {
        true => text.bold().to_string(),
        false => text.to_string(),
    }
}

/// `expr` に対する `mode` の出力。`color` が true なら ANSI カラーを使う。
pub fn render(mode: Mode, expr: &str, color: bool) -> Result<String, DynError> {
    let mut output = String::new();
    match mode {
        Mode::Optimize => {
            let optimized = engine::optimize(expr)?;
            writeln!(output, "{} {optimized}", heading("Optimized:", color))?;
        }
        Mode::Compat => {
            let compat = engine::compat_transpile(expr)?;
            writeln!(output, "{} {compat}", heading("Compat:", color))?;
        }
        Mode::Table(kind) => {
            if kind.includes_nfa() {
                let nfa = engine::to_nfa(expr)?;
                writeln!(output, "{}", table::nfa_table(&nfa).render(color))?;
            }
            if kind.includes_dfa() {
                let mut dfa = engine::to_dfa(expr)?;
                writeln!(output, "{}", table::dfa_table(&dfa, None).render(color))?;
                dfa.minimize();
                debug!("minimized DFA has {} states", dfa.num_states());
                let minimized = table::dfa_table(&dfa, Some(MINIMIZED_DFA_CAPTION));
                writeln!(output, "{}", minimized.render(color))?;
            }
        }
        Mode::Parse { loc } => {
            let options = ParseOptions {
                capture_locations: loc,
            };
            let re = engine::parse(expr, options)?;
            writeln!(output, "{}", serde_json::to_string_pretty(&re)?)?;
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{parser::MAX_NESTING, FaError, ParseError};

    fn config(expression: &str) -> Config {
        Config {
            expression: expression.to_string(),
            loc: false,
            optimize: false,
            compat: false,
            table: None,
            color: false,
        }
    }

    fn run_to_string(config: Config) -> Result<String, DynError> {
        let mut out = Vec::new();
        run(config, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_mode_priority() {
        let mut c = config("a");
        assert_eq!(Mode::resolve(&c), Mode::Parse { loc: false });
        c.table = Some(TableKind::All);
        assert_eq!(Mode::resolve(&c), Mode::Table(TableKind::All));
        c.compat = true;
        assert_eq!(Mode::resolve(&c), Mode::Compat);
        c.optimize = true;
        assert_eq!(Mode::resolve(&c), Mode::Optimize);
    }

    #[test]
    fn test_optimize_beats_table() {
        let c = Config {
            optimize: true,
            table: Some(TableKind::All),
            ..config("/a{1,}/")
        };
        let text = run_to_string(c).unwrap();
        assert_eq!(text, "Optimized: /a+/\n");
        assert!(!text.contains("transition table"));
    }

    #[test]
    fn test_compat() {
        let c = Config {
            compat: true,
            ..config("/a.b/s")
        };
        assert_eq!(run_to_string(c).unwrap(), "Compat: /a[\\0-\\uFFFF]b/\n");
    }

    #[test]
    fn test_table_order() {
        let c = Config {
            table: Some(TableKind::All),
            ..config("a*")
        };
        let text = run_to_string(c).unwrap();
        let nfa = text.find("NFA transition table:").unwrap();
        let original = text.find("DFA: Original transition table:").unwrap();
        let minimized = text.find("DFA: Minimized transition table:").unwrap();
        assert!(nfa < original && original < minimized);
        assert_eq!(text.matches("> - starting").count(), 3);
        assert_eq!(text.matches("✓ - accepting").count(), 3);
    }

    #[test]
    fn test_dfa_tables_reflect_minimization() {
        let text = render(Mode::Table(TableKind::Dfa), "a*", false).unwrap();
        assert!(!text.contains("NFA"));
        let (original, minimized) = text.split_at(text.find("DFA: Minimized").unwrap());
        // どちらも状態 1 が開始かつ受理
        assert!(original.contains("1 ✓ >") && minimized.contains("1 ✓ >"));
        assert!(original.contains("2 ✓"));
        assert!(!minimized.contains("2 ✓"));
    }

    #[test]
    fn test_nfa_table_columns() {
        let nfa = engine::to_nfa("a|b").unwrap();
        let table = table::nfa_table(&nfa);
        assert_eq!(table.columns(), ["a", "b", table::EPSILON_CLOSURE]);
        let branching: Vec<_> = table
            .rows()
            .iter()
            .filter(|row| !row.cells[2].is_empty())
            .map(|row| row.label.as_str())
            .collect();
        assert_eq!(branching, ["1 >"]);
    }

    #[test]
    fn test_parse_json() {
        let text = run_to_string(config("/a/i")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["type"], "RegExp");
        assert_eq!(json["flags"], "i");
        assert_eq!(json["body"]["type"], "Char");
        assert_eq!(json["body"]["value"], "a");
        assert!(json.get("loc").is_none());
        assert!(!text.contains("\"loc\""));

        let c = Config {
            loc: true,
            ..config("/a/i")
        };
        let json: serde_json::Value = serde_json::from_str(&run_to_string(c).unwrap()).unwrap();
        assert_eq!(json["body"]["loc"]["start"]["offset"], 1);
        assert_eq!(json["body"]["loc"]["source"], "a");
    }

    #[test]
    fn test_errors_leave_no_output() {
        let mut out = Vec::new();
        let e = run(config("a("), &mut out).unwrap_err();
        assert_eq!(
            e.downcast_ref::<ParseError>(),
            Some(&ParseError::NoRightParen(1))
        );
        assert!(out.is_empty());

        let c = Config {
            table: Some(TableKind::All),
            ..config("[ab]")
        };
        let e = run(c, &mut out).unwrap_err();
        assert_eq!(
            e.downcast_ref::<FaError>(),
            Some(&FaError::Unsupported("CharacterClass"))
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let expr = format!("{}a{}", "(".repeat(1000), ")".repeat(1000));
        let modes = [
            config(&expr),
            Config {
                optimize: true,
                ..config(&expr)
            },
            Config {
                compat: true,
                ..config(&expr)
            },
        ];
        for c in modes {
            let mut out = Vec::new();
            let e = run(c, &mut out).unwrap_err();
            assert_eq!(
                e.downcast_ref::<ParseError>(),
                Some(&ParseError::NestingTooDeep(MAX_NESTING))
            );
            assert!(out.is_empty());
        }

        let c = Config {
            table: Some(TableKind::All),
            ..config(&expr)
        };
        let mut out = Vec::new();
        let e = run(c, &mut out).unwrap_err();
        assert_eq!(
            e.downcast_ref::<FaError>(),
            Some(&FaError::Parse(ParseError::NestingTooDeep(MAX_NESTING)))
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_error_messages() {
        let e = run(config("a("), &mut Vec::new()).unwrap_err();
        assert_eq!(e.to_string(), "ParseError: no right parenthesis for group at pos = 1");
        let c = Config {
            table: Some(TableKind::Nfa),
            ..config("a(")
        };
        let e = run(c, &mut Vec::new()).unwrap_err();
        assert_eq!(e.to_string(), "ParseError: no right parenthesis for group at pos = 1");
    }

    #[test]
    fn test_color() {
        let c = Config {
            optimize: true,
            color: true,
            ..config("/a{1,}/")
        };
        let text = run_to_string(c).unwrap();
        assert!(text.starts_with('\u{1b}'));
        assert!(text.ends_with(" /a+/\n"));

        let colored = render(Mode::Table(TableKind::All), "a|b", true).unwrap();
        let plain = render(Mode::Table(TableKind::All), "a|b", false).unwrap();
        assert!(colored.contains('\u{1b}'));
        assert!(!plain.contains('\u{1b}'));
    }
}
